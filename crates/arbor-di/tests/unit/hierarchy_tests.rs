//! Unit tests for parent/child container lookups

use crate::fixtures::{AlphaPlugin, BetaPlugin, Config, Database, Plugin, container};
use arbor_di::{
	Container, Contract, DiError, Import, Injectable, InjectionMember, InjectionValue, Lifetime,
	Recipe, RegistrationOptions,
};
use rstest::*;
use std::sync::Arc;

#[rstest]
fn child_registration_shadows_parent(container: Container) {
	// Arrange
	let child = container.create_child();
	child.register_instance(Config {
		url: "postgres://child".to_string(),
	});

	// Act
	let from_child = child.resolve::<Config>().unwrap();
	let from_parent = container.resolve::<Config>().unwrap();

	// Assert
	assert_eq!(from_child.url, "postgres://child");
	assert_eq!(from_parent.url, "sqlite::memory:");
}

#[rstest]
fn child_falls_back_to_parent_registration(container: Container) {
	// Arrange
	let child = container.create_child().create_child();

	// Act
	let config = child.resolve::<Config>().unwrap();

	// Assert
	assert!(Arc::ptr_eq(&config, &container.resolve::<Config>().unwrap()));
}

#[rstest]
fn parent_registration_resolves_dependencies_in_parent(container: Container) {
	// Arrange
	container.register_self::<Database>(RegistrationOptions::new().lifetime(Lifetime::Singleton));
	let child = container.create_child();
	child.register_instance(Config {
		url: "postgres://child".to_string(),
	});

	// Act
	let database = child.resolve::<Database>().unwrap();

	// Assert
	assert_eq!(database.config.url, "sqlite::memory:");
}

#[rstest]
fn unregistered_type_resolves_dependencies_in_requesting_container(container: Container) {
	// Arrange
	let child = container.create_child();
	child.register_instance(Config {
		url: "postgres://child".to_string(),
	});

	// Act
	let database = child.resolve::<Database>().unwrap();

	// Assert
	assert_eq!(database.config.url, "postgres://child");
}

#[rstest]
fn re_registration_replaces_in_place(container: Container) {
	// Arrange
	container.register_type::<dyn Plugin, AlphaPlugin>(RegistrationOptions::new(), |p| p);

	// Act
	container.register_type::<dyn Plugin, BetaPlugin>(RegistrationOptions::new(), |p| p);

	// Assert
	assert_eq!(container.resolve::<dyn Plugin>().unwrap().name(), "beta");
	assert_eq!(container.local_registrations().len(), 2);
}

#[rstest]
fn named_registrations_are_distinct_contracts(container: Container) {
	// Arrange
	container.register_type::<dyn Plugin, AlphaPlugin>(RegistrationOptions::new().named("a"), |p| p);
	container.register_type::<dyn Plugin, BetaPlugin>(RegistrationOptions::new().named("b"), |p| p);

	// Act
	let a = container.resolve_named::<dyn Plugin>("a").unwrap();
	let b = container.resolve_named::<dyn Plugin>("b").unwrap();
	let unnamed = container.resolve::<dyn Plugin>();

	// Assert
	assert_eq!(a.name(), "alpha");
	assert_eq!(b.name(), "beta");
	assert!(unnamed.is_err());
	assert!(container.is_registered(&Contract::named::<dyn Plugin>("a")));
	assert!(!container.is_registered(&Contract::of::<dyn Plugin>()));
}

#[rstest]
fn registrations_lists_visible_contracts_nearest_first(container: Container) {
	// Arrange
	let child = container.create_child();
	child.register_instance(Config {
		url: "postgres://child".to_string(),
	});
	child.register_instance(7_u16);

	// Act
	let visible: Vec<Contract> = child
		.registrations()
		.iter()
		.map(|registration| registration.contract().clone())
		.collect();

	// Assert
	assert_eq!(visible, vec![Contract::of::<Config>(), Contract::of::<u16>()]);
}

#[rstest]
fn clone_registration_reuses_source_under_new_name(container: Container) {
	// Arrange
	container.register_self::<Database>(RegistrationOptions::new());

	// Act
	let clone = container
		.register_clone(
			&Contract::of::<Database>(),
			RegistrationOptions::new()
				.named("replica")
				.lifetime(Lifetime::Singleton),
		)
		.unwrap();
	let first = container.resolve_named::<Database>("replica").unwrap();
	let second = container.resolve_named::<Database>("replica").unwrap();

	// Assert
	assert_eq!(clone.contract(), &Contract::named::<Database>("replica"));
	assert!(Arc::ptr_eq(&first, &second));
	assert!(matches!(
		container.register_clone(&Contract::of::<u64>(), RegistrationOptions::new()),
		Err(DiError::NotConstructible { .. })
	));
}

#[derive(Default)]
struct Greeter {
	greeting: Option<Arc<String>>,
}

impl Injectable for Greeter {
	fn recipe() -> Recipe<Self> {
		Recipe::new()
			.constructor([], |_| Ok(Greeter::default()))
			.field(Import::of::<String>("greeting"), |greeter: &mut Greeter, greeting| {
				greeter.greeting = Some(greeting)
			})
	}
}

fn greeting_member(text: &str) -> InjectionMember {
	InjectionMember::field("greeting", InjectionValue::value(text.to_string()))
}

#[rstest]
fn clone_members_apply_on_top_of_inherited_members(container: Container) {
	// Arrange
	container.register_self::<Greeter>(RegistrationOptions::new().member(greeting_member("hello")));
	container
		.register_clone(
			&Contract::of::<Greeter>(),
			RegistrationOptions::new()
				.named("french")
				.member(greeting_member("bonjour")),
		)
		.unwrap();

	// Act
	let original = container.resolve::<Greeter>().unwrap();
	let french = container.resolve_named::<Greeter>("french").unwrap();

	// Assert
	assert_eq!(original.greeting.as_deref().map(String::as_str), Some("hello"));
	assert_eq!(french.greeting.as_deref().map(String::as_str), Some("bonjour"));
}

#[rstest]
fn clone_without_members_shares_the_source_pipeline(container: Container) {
	// Arrange
	container.register_self::<Greeter>(RegistrationOptions::new().member(greeting_member("hello")));
	container
		.register_clone(&Contract::of::<Greeter>(), RegistrationOptions::new().named("copy"))
		.unwrap();
	let builder = container.pipeline_builder();

	// Act
	let copy = container.resolve_named::<Greeter>("copy").unwrap();
	let builds = builder.build_count();
	let original = container.resolve::<Greeter>().unwrap();

	// Assert
	assert_eq!(copy.greeting.as_deref().map(String::as_str), Some("hello"));
	assert_eq!(original.greeting.as_deref().map(String::as_str), Some("hello"));
	assert_eq!(builder.build_count(), builds);
}
