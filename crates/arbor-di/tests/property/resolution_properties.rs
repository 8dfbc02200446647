//! Property-based tests for container resolution
//!
//! Uses proptest to verify invariants of the resolution engine:
//! 1. Collection order - most recent registration first, child before parent
//! 2. Shadowing - a child's name hides the same name in its ancestors
//! 3. Singleton identity - every container in the hierarchy sees one value
//! 4. Depth limit - a chain resolves exactly when it fits within the limit
//! 5. Override selection - among equal matches the last override wins

use arbor_di::{
	Container, ContainerSettings, Import, Injectable, InjectionValue, Lifetime, ParameterOverride,
	Recipe, RegistrationOptions,
};
use proptest::collection::{hash_set, vec};
use proptest::prelude::*;
use std::sync::Arc;

trait Handler: Send + Sync {
	fn label(&self) -> &str;
}

struct Named(String);

impl Handler for Named {
	fn label(&self) -> &str {
		&self.0
	}
}

fn register_handler(container: &Container, name: &str, label: &str) {
	let handler: Arc<dyn Handler> = Arc::new(Named(label.to_string()));
	container.register_instance_with(RegistrationOptions::new().named(name), handler);
}

fn labels(container: &Container) -> Vec<String> {
	container
		.resolve_all::<dyn Handler>()
		.unwrap()
		.iter()
		.map(|handler| handler.label().to_string())
		.collect()
}

struct Shared;

impl Injectable for Shared {
	fn recipe() -> Recipe<Self> {
		Recipe::new().constructor([], |_| Ok(Shared))
	}
}

struct Listener {
	port: Arc<u16>,
}

impl Injectable for Listener {
	fn recipe() -> Recipe<Self> {
		Recipe::new().constructor([Import::of::<u16>("port")], |args| {
			Ok(Listener {
				port: args.get(0)?,
			})
		})
	}
}

fn names() -> impl Strategy<Value = Vec<String>> {
	hash_set("[a-z]{1,6}", 0..12).prop_map(|set| set.into_iter().collect())
}

// Property 1: Collection order
// Resolving every registration returns them newest first, one per name
proptest! {
	#[test]
	fn prop_collection_is_newest_first(names in names()) {
		let container = Container::new();
		for name in &names {
			register_handler(&container, name, name);
		}

		let expected: Vec<String> = names.iter().rev().cloned().collect();
		prop_assert_eq!(labels(&container), expected);
	}
}

// Property 1b: Re-registration keeps position
// Replacing a registration changes its value but not the collection's shape
proptest! {
	#[test]
	fn prop_reregistration_keeps_position(names in names().prop_filter("non-empty", |n| !n.is_empty()), pick in any::<prop::sample::Index>()) {
		let container = Container::new();
		for name in &names {
			register_handler(&container, name, name);
		}
		let replaced = pick.get(&names).clone();

		register_handler(&container, &replaced, "replaced");

		let expected: Vec<String> = names
			.iter()
			.rev()
			.map(|name| if *name == replaced { "replaced".to_string() } else { name.clone() })
			.collect();
		prop_assert_eq!(labels(&container), expected);
	}
}

// Property 2: Shadowing
// The child's registrations come first and hide parent registrations with the same name
proptest! {
	#[test]
	fn prop_child_hides_parent_names(parent_names in names(), child_names in names()) {
		let root = Container::new();
		for name in &parent_names {
			register_handler(&root, name, &format!("root:{name}"));
		}
		let child = root.create_child();
		for name in &child_names {
			register_handler(&child, name, &format!("child:{name}"));
		}

		let mut expected: Vec<String> = child_names
			.iter()
			.rev()
			.map(|name| format!("child:{name}"))
			.collect();
		expected.extend(
			parent_names
				.iter()
				.rev()
				.filter(|name| !child_names.contains(name))
				.map(|name| format!("root:{name}")),
		);
		prop_assert_eq!(labels(&child), expected);
		prop_assert_eq!(labels(&root).len(), parent_names.len());
	}
}

// Property 3: Singleton identity
// Every container in a hierarchy of any depth resolves the same singleton value
proptest! {
	#[test]
	fn prop_singleton_identity_across_hierarchy(depth in 0usize..6, resolves in 1usize..5) {
		let root = Container::new();
		root.register_self::<Shared>(RegistrationOptions::new().lifetime(Lifetime::Singleton));
		let mut levels = vec![root.clone()];
		for _ in 0..depth {
			let next = levels[levels.len() - 1].create_child();
			levels.push(next);
		}

		let first = root.resolve::<Shared>().unwrap();
		for level in &levels {
			for _ in 0..resolves {
				prop_assert!(Arc::ptr_eq(&first, &level.resolve::<Shared>().unwrap()));
			}
		}
	}
}

// Property 4: Depth limit
// A chain of factories resolves exactly when its length fits within the limit
proptest! {
	#[test]
	fn prop_depth_limit_is_exact(length in 0u32..12, max_depth in 0usize..12) {
		let container = Container::with_settings(ContainerSettings {
			max_resolution_depth: max_depth,
			..Default::default()
		});
		container.register_instance_with(
			RegistrationOptions::new().named(length.to_string()),
			Arc::new(length),
		);
		for position in 0..length {
			let next = (position + 1).to_string();
			container.register_factory::<u32, _>(
				RegistrationOptions::new().named(position.to_string()),
				move |ctx| ctx.get_named::<u32>(next.as_str()),
			);
		}

		let result = container.resolve_named::<u32>("0");

		prop_assert_eq!(result.is_ok(), length as usize <= max_depth);
		if let Ok(value) = result {
			prop_assert_eq!(*value, length);
		}
	}
}

// Property 5: Override selection
// Among overrides matching equally well, the one supplied last is applied
proptest! {
	#[test]
	fn prop_last_equal_override_wins(ports in vec(any::<u16>(), 1..8)) {
		let container = Container::new();
		container.register_instance(80_u16);
		container.describe::<Listener>();
		let overrides = ports
			.iter()
			.map(|port| arbor_di::IntoOverride::into_override(
				ParameterOverride::new("port", InjectionValue::value(*port)),
			))
			.collect();

		let listener = container.resolve_with::<Listener>(None, overrides).unwrap();

		prop_assert_eq!(*listener.port, ports[ports.len() - 1]);
	}
}
