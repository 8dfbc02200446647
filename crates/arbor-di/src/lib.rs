//! # Arbor Dependency Injection
//!
//! Hierarchical dependency injection container.
//!
//! ## Features
//!
//! - **Hierarchical**: child containers inherit and shadow their parents' registrations
//! - **Lifetimes**: transient, singleton, per-container and per-resolve values
//! - **Compiled pipelines**: each registration compiles its resolution procedure once
//! - **Open generics**: one binding serves every closed form of a generic definition
//! - **Collections**: resolve every registration of a type, cached until registrations change
//! - **Overrides**: replace individual dependencies for a single resolve call
//! - **Cycle detection**: circular graphs fail with the offending path
//!
//! ## Example
//!
//! ```rust
//! use arbor_di::{Container, Import, Injectable, Lifetime, Recipe, RegistrationOptions};
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//! 	fn greet(&self) -> String;
//! }
//!
//! struct English {
//! 	name: Arc<String>,
//! }
//!
//! impl Greeter for English {
//! 	fn greet(&self) -> String {
//! 		format!("Hello, {}", self.name)
//! 	}
//! }
//!
//! impl Injectable for English {
//! 	fn recipe() -> Recipe<Self> {
//! 		Recipe::new().constructor([Import::of::<String>("name")], |args| {
//! 			Ok(English { name: args.get(0)? })
//! 		})
//! 	}
//! }
//!
//! let container = Container::new();
//! container.register_instance(String::from("world"));
//! container.register_type::<dyn Greeter, English>(
//! 	RegistrationOptions::new().lifetime(Lifetime::Singleton),
//! 	|english| english,
//! );
//!
//! let greeter = container.resolve::<dyn Greeter>().unwrap();
//! assert_eq!(greeter.greet(), "Hello, world");
//! assert!(Arc::ptr_eq(&greeter, &container.resolve::<dyn Greeter>().unwrap()));
//! ```
//!
//! ## Child containers
//!
//! ```rust
//! use arbor_di::Container;
//!
//! let root = Container::new();
//! root.register_instance(1_u32);
//!
//! let child = root.create_child();
//! child.register_instance(2_u32);
//!
//! assert_eq!(*child.resolve::<u32>().unwrap(), 2);
//! assert_eq!(*root.resolve::<u32>().unwrap(), 1);
//! ```

pub mod collection;
pub mod container;
pub mod context;
pub mod contract;
mod cycle_detection;
pub mod error;
pub mod import;
pub mod injection;
pub mod lifetime;
pub mod overrides;
pub mod pipeline;
pub mod policy;
pub mod recipe;
pub mod registration;
pub mod scope;
pub mod settings;
pub mod value;

pub use collection::{CollectionCache, CollectionEntry, CollectionMetadata};
pub use container::{CatalogResolver, Container, RegistrationOptions, UnregisteredResolver};
pub use context::{Request, ResolutionContext};
pub use contract::{Contract, GenericContract, GenericKey, TypeKey, TypeKind};
pub use error::{DiError, DiResult, SettingsError};
pub use import::{DefaultImportProvider, DescribeImport, ImportDescription};
pub use injection::{InjectionMember, InjectionMembers, InjectionValue};
pub use lifetime::{
	ContainerId, HierarchicalLifetime, Lifetime, LifetimeManager, LifetimeScope,
	PerResolveLifetime, SingletonLifetime, TransientLifetime,
};
pub use overrides::{
	DependencyOverride, DependencySite, FieldOverride, IntoOverride, MatchRank,
	ParameterOverride, PropertyOverride, ResolverOverride, select_override,
};
pub use pipeline::{BuildStage, Pipeline, PipelineBuilder, StagedChain, StepCompiler};
pub use policy::Policies;
pub use recipe::{Arguments, Import, ImportSite, Injectable, MemberKind, Recipe, TypeCatalog};
pub use registration::{
	GenericBinding, GenericRegistration, ImportSource, Registration, RegistrationCategory,
	RegistrationData, TypeMapping,
};
pub use scope::Scope;
pub use settings::{ContainerSettings, DEFAULT_MAX_RESOLUTION_DEPTH};
pub use value::{Collection, Value};
