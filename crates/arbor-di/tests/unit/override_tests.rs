//! Unit tests for resolver overrides supplied with a resolve call

use arbor_di::{
	Container, DependencyOverride, FieldOverride, Import, Injectable, InjectionValue, MatchRank,
	ParameterOverride, Recipe, RegistrationOptions, overrides,
};
use rstest::*;
use std::sync::Arc;

struct Endpoint {
	host: Arc<String>,
	port: Arc<u16>,
}

impl Injectable for Endpoint {
	fn recipe() -> Recipe<Self> {
		Recipe::new().constructor(
			[Import::of::<String>("host"), Import::of::<u16>("port")],
			|args| {
				Ok(Endpoint {
					host: args.get(0)?,
					port: args.get(1)?,
				})
			},
		)
	}
}

struct Client {
	endpoint: Arc<Endpoint>,
	fallback: Option<Arc<String>>,
}

impl Injectable for Client {
	fn recipe() -> Recipe<Self> {
		Recipe::new()
			.constructor([Import::of::<Endpoint>("endpoint")], |args| {
				Ok(Client {
					endpoint: args.get(0)?,
					fallback: None,
				})
			})
			.field(
				Import::of::<String>("fallback").named("fallback"),
				|client: &mut Client, host| client.fallback = Some(host),
			)
	}
}

#[fixture]
fn container() -> Container {
	let container = Container::new();
	container.register_instance("db.internal".to_string());
	container.register_instance_with(
		RegistrationOptions::new().named("fallback"),
		Arc::new("db.backup".to_string()),
	);
	container.register_instance(5432_u16);
	container.describe::<Endpoint>();
	container.describe::<Client>();
	container
}

fn port(value: u16) -> InjectionValue {
	InjectionValue::value(value)
}

#[rstest]
fn parameter_override_replaces_constructor_argument(container: Container) {
	// Act
	let endpoint = container
		.resolve_with::<Endpoint>(None, overrides![ParameterOverride::new("port", port(9090))])
		.unwrap();

	// Assert
	assert_eq!(*endpoint.port, 9090);
	assert_eq!(*endpoint.host, "db.internal");
}

#[rstest]
fn override_reaches_nested_dependencies(container: Container) {
	// Act
	let client = container
		.resolve_with::<Client>(None, overrides![ParameterOverride::new("port", port(9090))])
		.unwrap();
	let plain = container.resolve::<Client>().unwrap();

	// Assert
	assert_eq!(*client.endpoint.port, 9090);
	assert_eq!(*plain.endpoint.port, 5432);
}

#[rstest]
#[case(true)]
#[case(false)]
fn exact_match_wins_regardless_of_order(container: Container, #[case] exact_first: bool) {
	// Arrange
	let exact = ParameterOverride::new("port", port(1)).on_type::<Endpoint>();
	let partial = ParameterOverride::new("port", port(2));
	let list = if exact_first {
		overrides![exact, partial]
	} else {
		overrides![partial, exact]
	};

	// Act
	let endpoint = container.resolve_with::<Endpoint>(None, list).unwrap();

	// Assert
	assert_eq!(*endpoint.port, 1);
}

#[rstest]
fn later_partial_match_wins(container: Container) {
	// Act
	let endpoint = container
		.resolve_with::<Endpoint>(
			None,
			overrides![
				ParameterOverride::new("port", port(1)),
				ParameterOverride::new("port", port(2)),
			],
		)
		.unwrap();

	// Assert
	assert_eq!(*endpoint.port, 2);
}

#[rstest]
fn restricted_override_ignores_other_declaring_types(container: Container) {
	// Act
	let endpoint = container
		.resolve_with::<Endpoint>(
			None,
			overrides![ParameterOverride::new("port", port(1)).on_type::<Client>()],
		)
		.unwrap();

	// Assert
	assert_eq!(*endpoint.port, 5432);
}

#[rstest]
fn dependency_override_replaces_every_matching_site(container: Container) {
	// Act
	let client = container
		.resolve_with::<Client>(
			None,
			overrides![DependencyOverride::of::<String>(InjectionValue::value(
				"db.test".to_string()
			))],
		)
		.unwrap();

	// Assert
	assert_eq!(*client.endpoint.host, "db.test");
	assert_eq!(client.fallback.as_deref().map(String::as_str), Some("db.test"));
}

#[rstest]
fn required_exact_match_skips_partially_matching_sites(container: Container) {
	// Act
	let client = container
		.resolve_with::<Client>(
			None,
			overrides![
				DependencyOverride::of::<String>(InjectionValue::value("db.test".to_string()))
					.require(MatchRank::ExactMatch)
			],
		)
		.unwrap();

	// Assert
	assert_eq!(*client.endpoint.host, "db.test");
	assert_eq!(client.fallback.as_deref().map(String::as_str), Some("db.backup"));
}

#[rstest]
fn field_override_targets_fields_only(container: Container) {
	// Act
	let client = container
		.resolve_with::<Client>(
			None,
			overrides![FieldOverride::new(
				"fallback",
				InjectionValue::value("db.replica".to_string())
			)],
		)
		.unwrap();

	// Assert
	assert_eq!(client.fallback.as_deref().map(String::as_str), Some("db.replica"));
	assert_eq!(*client.endpoint.host, "db.internal");
}

#[rstest]
fn override_can_resolve_another_registration(container: Container) {
	// Act
	let endpoint = container
		.resolve_with::<Endpoint>(
			None,
			overrides![ParameterOverride::new(
				"host",
				InjectionValue::named::<String>("fallback")
			)],
		)
		.unwrap();

	// Assert
	assert_eq!(*endpoint.host, "db.backup");
}
