//! Unit tests for open generic bindings

use arbor_di::{
	Container, Contract, DiError, GenericBinding, GenericKey, Import, Injectable, Lifetime,
	Recipe, RegistrationOptions, ResolutionContext, TypeKey, TypeMapping, Value,
};
use rstest::*;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Repo<T> {
	serial: usize,
	_marker: PhantomData<T>,
}

struct RepoDef;

fn repo_definition() -> GenericKey {
	GenericKey::of::<RepoDef>("Repo")
}

fn repo_key<T: 'static>() -> TypeKey {
	TypeKey::generic::<Repo<T>>(repo_definition(), [TypeKey::of::<T>()])
}

/// Binds `Repo<u32>` and `Repo<String>`; every other argument is rejected.
fn bind_repos(container: &Container, options: RegistrationOptions) -> Arc<AtomicUsize> {
	let serial = Arc::new(AtomicUsize::new(0));
	let counter = serial.clone();
	container.register_generic(repo_definition(), options, move |key: &TypeKey| {
		let serial = counter.clone();
		let argument = key.arguments().first()?.clone();
		if argument == TypeKey::of::<u32>() {
			Some(GenericBinding::Factory(Arc::new(move |_: &ResolutionContext<'_>| {
				Ok(Value::from_value(Repo::<u32> {
					serial: serial.fetch_add(1, Ordering::SeqCst),
					_marker: PhantomData,
				}))
			})))
		} else if argument == TypeKey::of::<String>() {
			Some(GenericBinding::Factory(Arc::new(move |_: &ResolutionContext<'_>| {
				Ok(Value::from_value(Repo::<String> {
					serial: serial.fetch_add(1, Ordering::SeqCst),
					_marker: PhantomData,
				}))
			})))
		} else {
			None
		}
	});
	container.declare(repo_key::<u32>());
	container.declare(repo_key::<String>());
	container.declare(repo_key::<u8>());
	serial
}

#[fixture]
fn container() -> Container {
	Container::new()
}

#[rstest]
fn closed_generic_pipeline_is_compiled_once(container: Container) {
	// Arrange
	bind_repos(&container, RegistrationOptions::new());
	let builder = container.pipeline_builder();
	let before = builder.build_count();

	// Act
	let first = container.resolve::<Repo<u32>>().unwrap();
	let after_first = builder.build_count();
	let second = container.resolve::<Repo<u32>>().unwrap();
	let after_second = builder.build_count();

	// Assert
	assert_eq!(after_first - before, 1);
	assert_eq!(after_second, after_first);
	assert_ne!(first.serial, second.serial);
}

#[rstest]
fn each_closed_type_gets_its_own_registration(container: Container) {
	// Arrange
	bind_repos(&container, RegistrationOptions::new().lifetime(Lifetime::Singleton));

	// Act
	let numbers = container.resolve::<Repo<u32>>().unwrap();
	let numbers_again = container.resolve::<Repo<u32>>().unwrap();
	let strings = container.resolve::<Repo<String>>().unwrap();

	// Assert
	assert!(Arc::ptr_eq(&numbers, &numbers_again));
	assert_ne!(numbers.serial, strings.serial);
}

#[rstest]
fn rebinding_the_definition_discards_closed_registrations(container: Container) {
	// Arrange
	bind_repos(&container, RegistrationOptions::new().lifetime(Lifetime::Singleton));
	let first = container.resolve::<Repo<u32>>().unwrap();

	// Act
	bind_repos(&container, RegistrationOptions::new().lifetime(Lifetime::Singleton));
	let rebound = container.resolve::<Repo<u32>>().unwrap();

	// Assert
	assert!(!Arc::ptr_eq(&first, &rebound));
}

#[rstest]
fn unsupported_arguments_fail_to_load(container: Container) {
	// Arrange
	bind_repos(&container, RegistrationOptions::new());

	// Act
	let result = container.resolve::<Repo<u8>>();

	// Assert
	let error = result.err().unwrap();
	assert!(matches!(error.root_cause(), DiError::TypeLoad { .. }));
	assert!(error.is_skippable());
}

#[rstest]
fn exact_registration_wins_over_generic_binding(container: Container) {
	// Arrange
	bind_repos(&container, RegistrationOptions::new());
	container.register_instance(Repo::<u32> {
		serial: 99,
		_marker: PhantomData,
	});

	// Act
	let resolved = container.resolve::<Repo<u32>>().unwrap();

	// Assert
	assert_eq!(resolved.serial, 99);
}

#[rstest]
fn nearest_generic_binding_wins_over_parent_exact_registration(container: Container) {
	// Arrange
	container.register_instance(Repo::<u32> {
		serial: 99,
		_marker: PhantomData,
	});
	let child = container.create_child();
	bind_repos(&child, RegistrationOptions::new());

	// Act
	let from_child = child.resolve::<Repo<u32>>().unwrap();
	let from_root = container.resolve::<Repo<u32>>().unwrap();

	// Assert
	assert_eq!(from_child.serial, 0);
	assert_eq!(from_root.serial, 99);
}

struct Ledger {
	repo: Arc<Repo<u32>>,
	all: Vec<Arc<Repo<u32>>>,
}

impl Injectable for Ledger {
	fn recipe() -> Recipe<Self> {
		Recipe::new().constructor(
			[Import::of::<Repo<u32>>("repo"), Import::all::<Repo<u32>>("all")],
			|args| {
				Ok(Ledger {
					repo: args.get(0)?,
					all: args.all(1)?,
				})
			},
		)
	}
}

#[rstest]
fn recipe_imports_of_closed_generics_use_the_binding(container: Container) {
	// Arrange
	bind_repos(&container, RegistrationOptions::new().lifetime(Lifetime::Singleton));
	container.describe::<Ledger>();

	// Act
	let ledger = container.resolve::<Ledger>().unwrap();

	// Assert
	assert_eq!(ledger.all.len(), 1);
	assert!(Arc::ptr_eq(&ledger.repo, &ledger.all[0]));
	assert!(Arc::ptr_eq(&ledger.repo, &container.resolve::<Repo<u32>>().unwrap()));
}

#[rstest]
fn context_lookup_with_a_plain_key_finds_the_binding(container: Container) {
	// Arrange
	bind_repos(&container, RegistrationOptions::new());
	container.register_factory::<usize, _>(RegistrationOptions::new(), |ctx| {
		let repo = ctx.resolve(&Contract::of::<Repo<u32>>())?;
		let repo = repo.downcast::<Repo<u32>>().ok_or_else(|| {
			DiError::fault(&Contract::of::<usize>(), "unexpected repository type")
		})?;
		Ok(Arc::new(repo.serial + 10))
	});

	// Act
	let serial = container.resolve::<usize>().unwrap();

	// Assert
	assert_eq!(*serial, 10);
}

trait Store<T>: Send + Sync {
	fn kind(&self) -> &'static str;
}

struct MemoryStore<T>(PhantomData<T>);

impl<T: Send + Sync + 'static> Store<T> for MemoryStore<T> {
	fn kind(&self) -> &'static str {
		"memory"
	}
}

impl<T: Send + Sync + 'static> Injectable for MemoryStore<T> {
	fn recipe() -> Recipe<Self> {
		Recipe::new().constructor([], |_| Ok(MemoryStore(PhantomData)))
	}
}

struct StoreDef;

#[rstest]
fn generic_binding_maps_to_closed_implementation(container: Container) {
	// Arrange
	let definition = GenericKey::of::<StoreDef>("Store");
	container.describe::<MemoryStore<u32>>();
	container.register_generic(definition.clone(), RegistrationOptions::new(), |key: &TypeKey| {
		(key.arguments() == [TypeKey::of::<u32>()]).then(|| {
			GenericBinding::MapTo(TypeMapping::to::<dyn Store<u32>, MemoryStore<u32>>(|store| store))
		})
	});
	let contract = Contract::new(
		TypeKey::generic::<dyn Store<u32>>(definition, [TypeKey::of::<u32>()]),
		None,
	);

	// Act
	let store = container
		.resolve_as::<dyn Store<u32>>(&contract, Vec::new())
		.unwrap();

	// Assert
	assert_eq!(store.kind(), "memory");
	assert!(container.is_registered(&contract));
}
