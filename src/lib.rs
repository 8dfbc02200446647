//! # Arbor
//!
//! Hierarchical dependency injection for Rust applications.
//!
//! This crate is a facade over the Arbor member crates. Enable or disable parts of
//! the framework with feature flags:
//!
//! - `di` (default) - the dependency resolution engine, re-exported as [`di`]
//!
//! ## Quick Example
//!
//! ```rust
//! use arbor::prelude::*;
//! use std::sync::Arc;
//!
//! struct Clock;
//!
//! struct Scheduler {
//! 	clock: Arc<Clock>,
//! }
//!
//! impl Injectable for Scheduler {
//! 	fn recipe() -> Recipe<Self> {
//! 		Recipe::new().constructor([Import::of::<Clock>("clock")], |args| {
//! 			Ok(Scheduler { clock: args.get(0)? })
//! 		})
//! 	}
//! }
//!
//! let container = Container::new();
//! container.register_instance(Clock);
//! container.describe::<Scheduler>();
//!
//! let scheduler = container.resolve::<Scheduler>().unwrap();
//! assert!(Arc::ptr_eq(&scheduler.clock, &container.resolve::<Clock>().unwrap()));
//! ```

#[cfg(feature = "di")]
pub use arbor_di as di;

#[cfg(feature = "di")]
pub use arbor_di::{
	Container, ContainerSettings, Contract, DiError, DiResult, Injectable, Lifetime, Recipe,
	RegistrationOptions,
};

/// Commonly used types, for glob import.
pub mod prelude {
	#[cfg(feature = "di")]
	pub use arbor_di::{
		Container, ContainerSettings, Contract, DiError, DiResult, Import, Injectable,
		InjectionMember, InjectionValue, Lifetime, Recipe, RegistrationOptions, ResolutionContext,
		TypeKey, overrides,
	};
}
