//! Unit tests for injection members attached to registrations

use crate::fixtures::{Config, container};
use arbor_di::{
	Container, Contract, DiError, Import, Injectable, InjectionMember, InjectionValue, Recipe,
	RegistrationOptions, Value,
};
use rstest::*;
use std::sync::Arc;

trait Transport: Send + Sync {
	fn describe(&self) -> String;
}

#[derive(Default)]
struct Mailer {
	host: Option<Arc<String>>,
	port: Option<Arc<u16>>,
	config: Option<Arc<Config>>,
	retries: usize,
	calls: Vec<&'static str>,
}

impl Injectable for Mailer {
	fn recipe() -> Recipe<Self> {
		Recipe::new()
			.constructor(
				[Import::of::<String>("host"), Import::of::<u16>("port")],
				|args| {
					Ok(Mailer {
						host: Some(args.get(0)?),
						port: Some(args.get(1)?),
						..Mailer::default()
					})
				},
			)
			.field(Import::of::<Config>("config"), |mailer: &mut Mailer, config| {
				mailer.config = Some(config)
			})
			.method(
				"configure",
				[Import::of::<usize>("retries").default_value(1_usize)],
				|mailer: &mut Mailer, args| {
					mailer.retries = *args.get::<usize>(0)?;
					mailer.calls.push("configure");
					Ok(())
				},
			)
	}
}

impl Transport for Mailer {
	fn describe(&self) -> String {
		format!(
			"{}:{} x{}",
			self.host.as_deref().map_or("?", String::as_str),
			self.port.as_deref().copied().unwrap_or_default(),
			self.retries
		)
	}
}

fn mailer_options() -> RegistrationOptions {
	RegistrationOptions::new().member(InjectionMember::constructor([
		InjectionValue::value("smtp.local".to_string()),
		InjectionValue::value(25_u16),
	]))
}

#[rstest]
fn constructor_member_replaces_declared_imports(container: Container) {
	// Arrange
	container.register_self::<Mailer>(mailer_options());

	// Act
	let mailer = container.resolve::<Mailer>().unwrap();

	// Assert
	assert_eq!(mailer.host.as_deref().map(String::as_str), Some("smtp.local"));
	assert_eq!(mailer.port.as_deref().copied(), Some(25));
	assert_eq!(mailer.config.as_ref().unwrap().url, "sqlite::memory:");
	assert_eq!(mailer.retries, 1);
}

#[rstest]
fn method_member_supplies_arguments(container: Container) {
	// Arrange
	container.register_self::<Mailer>(mailer_options().member(InjectionMember::method(
		"configure",
		[InjectionValue::value(5_usize)],
	)));

	// Act
	let mailer = container.resolve::<Mailer>().unwrap();

	// Assert
	assert_eq!(mailer.retries, 5);
	assert_eq!(mailer.calls, ["configure"]);
}

#[rstest]
fn field_member_resolves_named_registration(container: Container) {
	// Arrange
	container.register_instance_with(
		RegistrationOptions::new().named("replica"),
		Arc::new(Config {
			url: "postgres://replica".to_string(),
		}),
	);
	container.register_self::<Mailer>(mailer_options().member(InjectionMember::field(
		"config",
		InjectionValue::named::<Config>("replica"),
	)));

	// Act
	let mailer = container.resolve::<Mailer>().unwrap();

	// Assert
	assert_eq!(mailer.config.as_ref().unwrap().url, "postgres://replica");
}

#[rstest]
fn optional_value_falls_back_to_default(container: Container) {
	// Arrange
	container.register_self::<Mailer>(RegistrationOptions::new().member(
		InjectionMember::constructor([
			InjectionValue::Optional {
				contract: Contract::named::<String>("missing"),
				default: Some(Value::from_value("fallback.local".to_string())),
			},
			InjectionValue::factory(|_| Ok(Value::from_value(2525_u16))),
		]),
	));

	// Act
	let mailer = container.resolve::<Mailer>().unwrap();

	// Assert
	assert_eq!(mailer.host.as_deref().map(String::as_str), Some("fallback.local"));
	assert_eq!(mailer.port.as_deref().copied(), Some(2525));
}

#[rstest]
fn members_on_a_mapping_force_a_full_build(container: Container) {
	// Arrange
	container.describe::<Mailer>();
	container.register_type::<dyn Transport, Mailer>(
		mailer_options().member(InjectionMember::method(
			"configure",
			[InjectionValue::value(3_usize)],
		)),
		|mailer| mailer,
	);

	// Act
	let transport = container.resolve::<dyn Transport>().unwrap();

	// Assert
	assert_eq!(transport.describe(), "smtp.local:25 x3");
}

#[rstest]
#[case(InjectionMember::field("timeout", InjectionValue::value(1_u8)))]
#[case(InjectionMember::constructor([InjectionValue::value(1_u16)]))]
#[case(InjectionMember::method("shutdown", []))]
fn invalid_member_fails_every_resolution(container: Container, #[case] member: InjectionMember) {
	// Arrange
	container.register_self::<Mailer>(RegistrationOptions::new().member(member));
	let builder = container.pipeline_builder();

	// Act
	let first = container.resolve::<Mailer>();
	let builds = builder.build_count();
	let second = container.resolve::<Mailer>();

	// Assert
	for result in [first, second] {
		assert!(matches!(
			result.err().unwrap().root_cause(),
			DiError::NotConstructible { .. }
		));
	}
	assert_eq!(builder.build_count(), builds);
}
