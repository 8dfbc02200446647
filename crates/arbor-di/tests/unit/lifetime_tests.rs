//! Unit tests for lifetime handling across resolutions and containers

use crate::fixtures::{Database, container};
use arbor_di::{Container, Import, Injectable, Lifetime, Recipe, RegistrationOptions};
use rstest::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

struct Session {
	id: usize,
}

struct UnitOfWork {
	reader: Arc<Session>,
	writer: Arc<Session>,
}

impl Injectable for UnitOfWork {
	fn recipe() -> Recipe<Self> {
		Recipe::new().constructor(
			[
				Import::of::<Session>("reader"),
				Import::of::<Session>("writer"),
			],
			|args| {
				Ok(UnitOfWork {
					reader: args.get(0)?,
					writer: args.get(1)?,
				})
			},
		)
	}
}

fn register_counted_session(container: &Container, lifetime: Lifetime) -> Arc<AtomicUsize> {
	let counter = Arc::new(AtomicUsize::new(0));
	let created = counter.clone();
	container.register_factory::<Session, _>(
		RegistrationOptions::new().lifetime(lifetime),
		move |_| {
			Ok(Arc::new(Session {
				id: created.fetch_add(1, Ordering::SeqCst),
			}))
		},
	);
	counter
}

#[rstest]
fn singleton_resolves_to_identical_instance(container: Container) {
	// Arrange
	container.register_self::<Database>(RegistrationOptions::new().lifetime(Lifetime::Singleton));

	// Act
	let first = container.resolve::<Database>().unwrap();
	let second = container.resolve::<Database>().unwrap();

	// Assert
	assert!(Arc::ptr_eq(&first, &second));
}

#[rstest]
fn singleton_is_shared_with_children(container: Container) {
	// Arrange
	container.register_self::<Database>(RegistrationOptions::new().lifetime(Lifetime::Singleton));
	let child = container.create_child();

	// Act
	let from_child = child.resolve::<Database>().unwrap();
	let from_root = container.resolve::<Database>().unwrap();

	// Assert
	assert!(Arc::ptr_eq(&from_child, &from_root));
}

#[rstest]
fn hierarchical_lifetime_gives_each_container_its_own_instance(container: Container) {
	// Arrange
	container
		.register_self::<Database>(RegistrationOptions::new().lifetime(Lifetime::Hierarchical));
	let child = container.create_child();

	// Act
	let root_first = container.resolve::<Database>().unwrap();
	let root_second = container.resolve::<Database>().unwrap();
	let child_first = child.resolve::<Database>().unwrap();
	let child_second = child.resolve::<Database>().unwrap();

	// Assert
	assert!(Arc::ptr_eq(&root_first, &root_second));
	assert!(Arc::ptr_eq(&child_first, &child_second));
	assert!(!Arc::ptr_eq(&root_first, &child_first));
	assert!(Arc::ptr_eq(&root_first.config, &child_first.config));
}

#[rstest]
fn transient_builds_new_instance_every_time(container: Container) {
	// Act
	let first = container.resolve::<Database>().unwrap();
	let second = container.resolve::<Database>().unwrap();

	// Assert
	assert!(!Arc::ptr_eq(&first, &second));
	assert!(Arc::ptr_eq(&first.config, &second.config));
}

#[rstest]
fn per_resolve_value_is_shared_within_one_call_only() {
	// Arrange
	let container = Container::new();
	container.describe::<UnitOfWork>();
	let counter = register_counted_session(&container, Lifetime::PerResolve);

	// Act
	let first = container.resolve::<UnitOfWork>().unwrap();
	let second = container.resolve::<UnitOfWork>().unwrap();

	// Assert
	assert!(Arc::ptr_eq(&first.reader, &first.writer));
	assert!(!Arc::ptr_eq(&first.reader, &second.reader));
	assert_eq!(counter.load(Ordering::SeqCst), 2);
	assert_eq!(second.writer.id, 1);
}

#[rstest]
#[case(Lifetime::Transient, 2)]
#[case(Lifetime::Singleton, 1)]
fn factory_runs_according_to_lifetime(#[case] lifetime: Lifetime, #[case] expected: usize) {
	// Arrange
	let container = Container::new();
	let counter = register_counted_session(&container, lifetime);

	// Act
	container.resolve::<Session>().unwrap();
	container.resolve::<Session>().unwrap();

	// Assert
	assert_eq!(counter.load(Ordering::SeqCst), expected);
}

#[rstest]
fn default_lifetime_comes_from_settings() {
	// Arrange
	let settings = arbor_di::ContainerSettings {
		default_lifetime: Lifetime::Singleton,
		..Default::default()
	};
	let container = Container::with_settings(settings);
	let counter = register_counted_session(&container, Lifetime::Singleton);
	container.describe::<UnitOfWork>();

	// Act
	let first = container.resolve::<UnitOfWork>().unwrap();
	let second = container.resolve::<UnitOfWork>().unwrap();

	// Assert
	assert!(Arc::ptr_eq(&first, &second));
	assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[rstest]
fn instance_registration_returns_the_registered_value() {
	// Arrange
	let container = Container::new();
	let shared = Arc::new(Session { id: 42 });
	container.register_instance_with(RegistrationOptions::new(), shared.clone());

	// Act
	let resolved = container.resolve::<Session>().unwrap();

	// Assert
	assert!(Arc::ptr_eq(&resolved, &shared));
	assert_eq!(resolved.id, 42);
}

#[rstest]
fn concurrent_first_resolution_builds_a_singleton_once(container: Container) {
	// Arrange
	let calls = Arc::new(AtomicUsize::new(0));
	let counter = calls.clone();
	container.register_factory::<Session, _>(
		RegistrationOptions::new().lifetime(Lifetime::Singleton),
		move |_| {
			thread::sleep(Duration::from_millis(20));
			Ok(Arc::new(Session {
				id: counter.fetch_add(1, Ordering::SeqCst),
			}))
		},
	);
	let builder = container.pipeline_builder();
	let before = builder.build_count();

	// Act
	let sessions: Vec<Arc<Session>> = thread::scope(|scope| {
		let handles: Vec<_> = (0..8)
			.map(|_| scope.spawn(|| container.resolve::<Session>().unwrap()))
			.collect();
		handles.into_iter().map(|handle| handle.join().unwrap()).collect()
	});

	// Assert
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert_eq!(builder.build_count() - before, 1);
	assert!(sessions.iter().all(|session| session.id == 0));
	assert!(sessions.iter().all(|session| Arc::ptr_eq(session, &sessions[0])));
}

#[rstest]
fn concurrent_first_resolution_compiles_each_pipeline_once(container: Container) {
	// Arrange
	let builder = container.pipeline_builder();
	let before = builder.build_count();

	// Act
	let databases: Vec<Arc<Database>> = thread::scope(|scope| {
		let handles: Vec<_> = (0..8)
			.map(|_| scope.spawn(|| container.resolve::<Database>().unwrap()))
			.collect();
		handles.into_iter().map(|handle| handle.join().unwrap()).collect()
	});

	// Assert
	assert_eq!(databases.len(), 8);
	// `Database` itself and its `Config` import.
	assert_eq!(builder.build_count() - before, 2);
}
