//! Per-container registration storage

use crate::collection::CollectionCache;
use crate::contract::{Contract, GenericContract, TypeKey};
use crate::error::DiResult;
use crate::injection::InjectionMembers;
use crate::lifetime::TransientLifetime;
use crate::registration::{GenericRegistration, Registration, RegistrationData};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// One container's registrations.
///
/// Registrations keep their insertion position: replacing a contract keeps its
/// slot, which fixes the order collections enumerate them in. The version counter
/// increases on every change to the registration set and never decreases.
#[derive(Default)]
pub struct Scope {
	registrations: RwLock<IndexMap<Contract, Arc<Registration>>>,
	generics: RwLock<IndexMap<GenericContract, Arc<GenericRegistration>>>,
	/// Registrations closed from `generics`, by closed contract.
	closed: RwLock<HashMap<Contract, Arc<Registration>>>,
	/// Synthetic collection descriptors for array and enumerable contracts.
	caches: RwLock<HashMap<Contract, Arc<Registration>>>,
	version: AtomicU64,
}

/// A registration visible to collection resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeEntry {
	pub position: usize,
	pub contract: Contract,
	/// Whether the entry comes from an open generic binding.
	pub generic: bool,
}

impl Scope {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn version(&self) -> u64 {
		self.version.load(Ordering::Acquire)
	}

	fn bump(&self) {
		self.version.fetch_add(1, Ordering::AcqRel);
	}

	pub fn get(&self, contract: &Contract) -> Option<Arc<Registration>> {
		self.registrations.read().get(contract).cloned()
	}

	pub fn contains(&self, contract: &Contract) -> bool {
		self.registrations.read().contains_key(contract)
	}

	/// Adds or replaces a registration, returning the one replaced.
	pub fn add(&self, registration: Arc<Registration>) -> Option<Arc<Registration>> {
		let contract = registration.contract().clone();
		let previous = self.registrations.write().insert(contract, registration);
		self.bump();
		previous
	}

	pub fn add_generic(&self, registration: Arc<GenericRegistration>) {
		let contract = registration.contract().clone();
		self.closed.write().retain(|closed, _| {
			closed.generic_definition().as_ref() != Some(&contract)
		});
		self.generics.write().insert(contract, registration);
		self.bump();
	}

	pub fn has_generic(&self, contract: &GenericContract) -> bool {
		self.generics.read().contains_key(contract)
	}

	/// The registration closed from an open generic binding for `contract`.
	///
	/// `None` when this scope has no binding for the contract's definition. Closed
	/// registrations are cached so their pipelines compile once.
	pub fn get_bound_generic(&self, contract: &Contract) -> Option<DiResult<Arc<Registration>>> {
		if let Some(closed) = self.closed.read().get(contract) {
			return Some(Ok(closed.clone()));
		}
		let definition = contract.generic_definition()?;
		let generic = self.generics.read().get(&definition).cloned()?;
		let registration = match generic.close(contract) {
			Ok(registration) => Arc::new(registration),
			Err(error) => return Some(Err(error)),
		};
		tracing::debug!(contract = %contract, "Closed generic registration");
		let mut closed = self.closed.write();
		Some(Ok(closed
			.entry(contract.clone())
			.or_insert(registration)
			.clone()))
	}

	/// The collection descriptor for `contract`, if it has been resolved here.
	pub(crate) fn existing_collection(&self, contract: &Contract) -> Option<Arc<Registration>> {
		self.caches.read().get(contract).cloned()
	}

	/// The synthetic collection descriptor for an array or enumerable contract.
	pub(crate) fn collection_registration(&self, contract: &Contract) -> Arc<Registration> {
		if let Some(existing) = self.caches.read().get(contract) {
			return existing.clone();
		}
		self.caches
			.write()
			.entry(contract.clone())
			.or_insert_with(|| {
				Arc::new(Registration::new(
					contract.clone(),
					RegistrationData::Cache(Arc::new(CollectionCache::new())),
					Arc::new(TransientLifetime),
					InjectionMembers::new(),
				))
			})
			.clone()
	}

	/// Registrations matching `element`, most recent first, followed by the open
	/// generic bindings that can close over it.
	pub fn entries_for(&self, element: &TypeKey) -> Vec<ScopeEntry> {
		let mut entries: Vec<ScopeEntry> = self
			.registrations
			.read()
			.iter()
			.enumerate()
			.rev()
			.filter(|(_, (contract, _))| contract.key() == element)
			.map(|(position, (contract, _))| ScopeEntry {
				position,
				contract: contract.clone(),
				generic: false,
			})
			.collect();

		if let Some(definition) = element.generic_definition() {
			let generics = self.generics.read();
			entries.extend(
				generics
					.iter()
					.enumerate()
					.rev()
					.filter(|(_, (contract, _))| contract.definition() == definition)
					.map(|(position, (contract, _))| ScopeEntry {
						position,
						contract: Contract::new(
							element.clone(),
							contract.name().map(Arc::from),
						),
						generic: true,
					}),
			);
		}
		entries
	}

	/// Every registration this scope holds, including closed and synthetic ones.
	pub fn snapshot(&self) -> Vec<Arc<Registration>> {
		let mut all: Vec<_> = self.registrations.read().values().cloned().collect();
		all.extend(self.closed.read().values().cloned());
		all.extend(self.caches.read().values().cloned());
		all
	}

	/// Registered contracts in registration order.
	pub fn contracts(&self) -> Vec<Contract> {
		self.registrations.read().keys().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.registrations.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl fmt::Debug for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scope")
			.field("registrations", &self.len())
			.field("generics", &self.generics.read().len())
			.field("version", &self.version())
			.finish()
	}
}
