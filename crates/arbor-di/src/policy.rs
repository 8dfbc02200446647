//! Policy store
//!
//! A small type-keyed registry holding the collaborators the engine delegates to.
//! Each container hierarchy owns one store, created with the defaults installed:
//!
//! | Key                         | Default                    |
//! |-----------------------------|----------------------------|
//! | `dyn DescribeImport`        | [`DefaultImportProvider`]  |
//! | `dyn StepCompiler`          | [`ClosureCompiler`]        |
//! | `dyn UnregisteredResolver`  | [`CatalogResolver`]        |
//!
//! Replacing an entry affects pipelines compiled afterwards; pipelines already cached
//! on a registration keep the collaborator they were built with.

use crate::container::{CatalogResolver, UnregisteredResolver};
use crate::import::{DefaultImportProvider, DescribeImport};
use crate::pipeline::{ClosureCompiler, StepCompiler};
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Default)]
pub struct Policies {
	store: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Policies {
	/// A store with the engine's default collaborators installed.
	pub fn with_defaults() -> Self {
		let policies = Self::default();
		policies.set::<dyn DescribeImport>(Arc::new(DefaultImportProvider));
		policies.set::<dyn StepCompiler>(Arc::new(ClosureCompiler));
		policies.set::<dyn UnregisteredResolver>(Arc::new(CatalogResolver));
		policies
	}

	pub fn get<P: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<P>> {
		self.store
			.read()
			.get(&TypeId::of::<P>())
			.and_then(|entry| entry.downcast_ref::<Arc<P>>())
			.cloned()
	}

	/// Installs `policy`, returning the one it replaced.
	pub fn set<P: ?Sized + Send + Sync + 'static>(&self, policy: Arc<P>) -> Option<Arc<P>> {
		let previous = self.store.write().insert(TypeId::of::<P>(), Arc::new(policy));
		previous.and_then(|entry| entry.downcast_ref::<Arc<P>>().cloned())
	}

	pub fn clear<P: ?Sized + 'static>(&self) -> bool {
		self.store.write().remove(&TypeId::of::<P>()).is_some()
	}

	pub fn contains<P: ?Sized + 'static>(&self) -> bool {
		self.store.read().contains_key(&TypeId::of::<P>())
	}
}

impl fmt::Debug for Policies {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Policies")
			.field("len", &self.store.read().len())
			.finish()
	}
}
