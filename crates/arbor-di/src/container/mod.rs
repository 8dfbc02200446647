//! Container hierarchy
//!
//! A [`Container`] is a cheap handle to one level of a parent-linked hierarchy. Each
//! level owns a [`Scope`] of registrations; everything else (settings, policies, the
//! type catalog, the pipeline builder) is shared by the whole hierarchy through one
//! `Core` created with the root container.
//!
//! Resolution walks from the requesting container towards the root and the nearest
//! level holding a matching registration wins. See [`Container::resolve_contract`].

mod register;
mod resolution;
mod unregistered;

pub use register::RegistrationOptions;
pub use unregistered::{CatalogResolver, UnregisteredResolver};

use crate::contract::{Contract, TypeKey};
use crate::error::DiResult;
use crate::injection::InjectionMembers;
use crate::lifetime::{ContainerId, Lifetime};
use crate::pipeline::{PipelineBuilder, StagedChain};
use crate::policy::Policies;
use crate::recipe::{Injectable, TypeCatalog};
use crate::registration::{Registration, RegistrationData, TypeMapping};
use crate::scope::Scope;
use crate::settings::ContainerSettings;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// State shared by every container of one hierarchy.
pub(crate) struct Core {
	settings: ContainerSettings,
	policies: Policies,
	catalog: TypeCatalog,
	builder: PipelineBuilder,
	/// Descriptors synthesized for contracts nobody registered.
	unregistered: RwLock<HashMap<Contract, Arc<Registration>>>,
	/// Descriptors used to build up instances whose registration cannot.
	build_ups: RwLock<HashMap<Contract, Arc<Registration>>>,
}

impl Core {
	fn new(settings: ContainerSettings, chain: StagedChain) -> Self {
		Self {
			settings,
			policies: Policies::with_defaults(),
			catalog: TypeCatalog::new(),
			builder: PipelineBuilder::new(chain),
			unregistered: RwLock::new(HashMap::new()),
			build_ups: RwLock::new(HashMap::new()),
		}
	}

	pub(crate) fn policies(&self) -> &Policies {
		&self.policies
	}

	pub(crate) fn catalog(&self) -> &TypeCatalog {
		&self.catalog
	}

	/// The descriptor for a contract with no registration in the hierarchy.
	fn unregistered(&self, contract: &Contract) -> DiResult<Arc<Registration>> {
		if let Some(existing) = self.unregistered.read().get(contract) {
			return Ok(existing.clone());
		}
		let resolver = self
			.policies
			.get::<dyn UnregisteredResolver>()
			.unwrap_or_else(|| Arc::new(CatalogResolver));
		let registration = Arc::new(resolver.describe(&self.catalog, &self.settings, contract)?);
		tracing::debug!(contract = %contract, "Synthesized registration for unregistered type");
		Ok(self
			.unregistered
			.write()
			.entry(contract.clone())
			.or_insert(registration)
			.clone())
	}

	/// A plain type descriptor for `contract`, used when build-up cannot go through
	/// the registered descriptor.
	fn build_up_registration(&self, contract: &Contract) -> Arc<Registration> {
		if let Some(existing) = self.build_ups.read().get(contract) {
			return existing.clone();
		}
		let registration = Arc::new(Registration::new(
			contract.clone(),
			RegistrationData::Type(TypeMapping::identity(contract.key().clone())),
			Lifetime::Transient.manager(),
			InjectionMembers::new(),
		));
		self.build_ups
			.write()
			.entry(contract.clone())
			.or_insert(registration)
			.clone()
	}

	fn registrations(&self) -> Vec<Arc<Registration>> {
		let mut all: Vec<_> = self.unregistered.read().values().cloned().collect();
		all.extend(self.build_ups.read().values().cloned());
		all
	}
}

/// One level of a container hierarchy.
pub(crate) struct ContainerInner {
	id: ContainerId,
	parent: Option<Arc<ContainerInner>>,
	depth: usize,
	scope: Scope,
	core: Arc<Core>,
}

impl ContainerInner {
	pub(crate) fn id(&self) -> ContainerId {
		self.id
	}

	pub(crate) fn scope(&self) -> &Scope {
		&self.scope
	}

	pub(crate) fn settings(&self) -> &ContainerSettings {
		&self.core.settings
	}

	/// This container followed by its ancestors, root last.
	pub(crate) fn ancestry(self: &Arc<Self>) -> impl Iterator<Item = &Arc<ContainerInner>> {
		std::iter::successors(Some(self), |level| level.parent.as_ref())
	}

	/// Sum of the scope versions from this container to the root.
	///
	/// Versions only grow, so any registration change anywhere in the chain changes
	/// the sum.
	pub(crate) fn hierarchy_version(self: &Arc<Self>) -> u64 {
		self.ancestry().map(|level| level.scope.version()).sum()
	}

	pub(crate) fn canonical_key(&self, key: TypeKey) -> TypeKey {
		self.core.catalog.canonical(key)
	}
}

impl Drop for ContainerInner {
	fn drop(&mut self) {
		let mut released = 0;
		let mut level: Option<&ContainerInner> = Some(self);
		while let Some(current) = level {
			for registration in current.scope.snapshot() {
				registration.lifetime().release(self.id);
				released += 1;
			}
			level = current.parent.as_deref();
		}
		for registration in self.core.registrations() {
			registration.lifetime().release(self.id);
		}
		tracing::debug!(container = %self.id, released, "Container disposed");
	}
}

/// Handle to a container.
///
/// Cloning the handle shares the container; a child keeps its ancestors alive.
#[derive(Clone)]
pub struct Container {
	inner: Arc<ContainerInner>,
}

impl Container {
	/// A root container with default settings.
	pub fn new() -> Self {
		Self::with_settings(ContainerSettings::default())
	}

	pub fn with_settings(settings: ContainerSettings) -> Self {
		Self::with_chain(settings, StagedChain::default())
	}

	/// A root container whose full builds run `chain` instead of the default stages.
	pub fn with_chain(settings: ContainerSettings, chain: StagedChain) -> Self {
		let inner = Arc::new(ContainerInner {
			id: ContainerId::next(),
			parent: None,
			depth: 0,
			scope: Scope::new(),
			core: Arc::new(Core::new(settings, chain)),
		});
		tracing::debug!(
			container = %inner.id,
			max_depth = inner.core.settings.max_resolution_depth,
			"Root container created"
		);
		Self { inner }
	}

	pub(crate) fn from_inner(inner: Arc<ContainerInner>) -> Self {
		Self { inner }
	}

	/// A child container whose lookups fall back to this one.
	pub fn create_child(&self) -> Container {
		let inner = Arc::new(ContainerInner {
			id: ContainerId::next(),
			parent: Some(Arc::clone(&self.inner)),
			depth: self.inner.depth + 1,
			scope: Scope::new(),
			core: Arc::clone(&self.inner.core),
		});
		tracing::debug!(
			container = %inner.id,
			parent = %self.inner.id,
			depth = inner.depth,
			"Child container created"
		);
		Self { inner }
	}

	pub fn parent(&self) -> Option<Container> {
		self.inner.parent.clone().map(Self::from_inner)
	}

	pub fn id(&self) -> ContainerId {
		self.inner.id
	}

	/// Distance from the root; the root is at depth 0.
	pub fn depth(&self) -> usize {
		self.inner.depth
	}

	pub fn is_root(&self) -> bool {
		self.inner.parent.is_none()
	}

	pub fn settings(&self) -> &ContainerSettings {
		self.inner.settings()
	}

	pub fn policies(&self) -> &Policies {
		&self.inner.core.policies
	}

	pub fn catalog(&self) -> &TypeCatalog {
		&self.inner.core.catalog
	}

	pub fn pipeline_builder(&self) -> &PipelineBuilder {
		&self.inner.core.builder
	}

	/// Adds the recipe of `T` to the hierarchy's type catalog.
	pub fn describe<T: Injectable>(&self) -> &Self {
		self.inner.core.catalog.describe::<T>();
		self
	}

	/// Records the full key of a type, e.g. to mark a trait object abstract.
	pub fn declare(&self, key: TypeKey) -> &Self {
		self.inner.core.catalog.declare(key);
		self
	}

	/// The registrations held by this container, in registration order.
	pub fn local_registrations(&self) -> Vec<Arc<Registration>> {
		self.inner
			.scope
			.contracts()
			.iter()
			.filter_map(|contract| self.inner.scope.get(contract))
			.collect()
	}
}

impl Default for Container {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Container {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Container")
			.field("id", &self.inner.id)
			.field("depth", &self.inner.depth)
			.field("scope", &self.inner.scope)
			.finish()
	}
}
