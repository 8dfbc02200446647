//! Lifetime managers
//!
//! A lifetime manager is attached to each registration and decides whether a
//! resolved value is reused:
//!
//! - [`TransientLifetime`]: never caches, every resolution builds a new value
//! - [`SingletonLifetime`]: one value per registration, shared by every container
//!   that resolves through it
//! - [`HierarchicalLifetime`]: one value per resolving container, released when that
//!   container is dropped
//! - [`PerResolveLifetime`]: one value per top-level resolve call
//!
//! Managers are consulted twice per resolution: `get_value` before the pipeline runs
//! and `set_value` after a successful build.

use crate::contract::Contract;
use crate::registration::ImportSource;
use crate::value::Value;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique container identity used to key per-container values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(u64);

impl ContainerId {
	pub(crate) fn next() -> Self {
		Self(NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed))
	}
}

impl fmt::Display for ContainerId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Values cached for the duration of a single top-level resolve call.
pub type PerResolveStore = RefCell<HashMap<Contract, Value>>;

/// What a lifetime manager can see while looking up or storing a value.
pub struct LifetimeScope<'a> {
	/// Container executing the resolution.
	pub container: ContainerId,
	pub per_resolve: &'a PerResolveStore,
	pub contract: &'a Contract,
}

/// Named lifetime policies, used by settings and registration helpers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
	#[default]
	Transient,
	Singleton,
	Hierarchical,
	PerResolve,
}

impl Lifetime {
	/// Creates a fresh manager implementing this policy.
	pub fn manager(self) -> Arc<dyn LifetimeManager> {
		match self {
			Lifetime::Transient => Arc::new(TransientLifetime),
			Lifetime::Singleton => Arc::new(SingletonLifetime::default()),
			Lifetime::Hierarchical => Arc::new(HierarchicalLifetime::default()),
			Lifetime::PerResolve => Arc::new(PerResolveLifetime),
		}
	}
}

/// Value caching policy attached to a registration.
pub trait LifetimeManager: Send + Sync + fmt::Debug {
	/// Returns the cached value, or `None` when the pipeline must run.
	fn get_value(&self, scope: &LifetimeScope<'_>) -> Option<Value>;

	fn set_value(&self, value: Value, scope: &LifetimeScope<'_>);

	/// Which container executes the registration's pipeline.
	fn source(&self) -> ImportSource {
		ImportSource::Any
	}

	/// Whether first-time construction must be serialized on the registration lock.
	fn is_synchronized(&self) -> bool {
		false
	}

	/// An empty manager of the same policy, used for registrations synthesized from a
	/// template such as closed generics.
	fn fresh(&self) -> Arc<dyn LifetimeManager>;

	/// Drops any value held on behalf of `container`.
	fn release(&self, _container: ContainerId) {}

	fn lifetime(&self) -> Lifetime;
}

#[derive(Debug, Default)]
pub struct TransientLifetime;

impl LifetimeManager for TransientLifetime {
	fn get_value(&self, _scope: &LifetimeScope<'_>) -> Option<Value> {
		None
	}

	fn set_value(&self, _value: Value, _scope: &LifetimeScope<'_>) {}

	fn fresh(&self) -> Arc<dyn LifetimeManager> {
		Arc::new(TransientLifetime)
	}

	fn lifetime(&self) -> Lifetime {
		Lifetime::Transient
	}
}

#[derive(Debug, Default)]
pub struct SingletonLifetime {
	value: RwLock<Option<Value>>,
}

impl SingletonLifetime {
	/// A singleton already holding `value`.
	pub fn with_value(value: Value) -> Self {
		Self {
			value: RwLock::new(Some(value)),
		}
	}
}

impl LifetimeManager for SingletonLifetime {
	fn get_value(&self, _scope: &LifetimeScope<'_>) -> Option<Value> {
		self.value.read().clone()
	}

	fn set_value(&self, value: Value, _scope: &LifetimeScope<'_>) {
		self.value.write().get_or_insert(value);
	}

	fn is_synchronized(&self) -> bool {
		true
	}

	fn fresh(&self) -> Arc<dyn LifetimeManager> {
		Arc::new(SingletonLifetime::default())
	}

	fn lifetime(&self) -> Lifetime {
		Lifetime::Singleton
	}
}

#[derive(Debug, Default)]
pub struct HierarchicalLifetime {
	values: Mutex<HashMap<ContainerId, Value>>,
}

impl LifetimeManager for HierarchicalLifetime {
	fn get_value(&self, scope: &LifetimeScope<'_>) -> Option<Value> {
		self.values.lock().get(&scope.container).cloned()
	}

	fn set_value(&self, value: Value, scope: &LifetimeScope<'_>) {
		self.values.lock().entry(scope.container).or_insert(value);
	}

	fn source(&self) -> ImportSource {
		ImportSource::Local
	}

	fn is_synchronized(&self) -> bool {
		true
	}

	fn fresh(&self) -> Arc<dyn LifetimeManager> {
		Arc::new(HierarchicalLifetime::default())
	}

	fn release(&self, container: ContainerId) {
		self.values.lock().remove(&container);
	}

	fn lifetime(&self) -> Lifetime {
		Lifetime::Hierarchical
	}
}

#[derive(Debug, Default)]
pub struct PerResolveLifetime;

impl LifetimeManager for PerResolveLifetime {
	fn get_value(&self, scope: &LifetimeScope<'_>) -> Option<Value> {
		scope.per_resolve.borrow().get(scope.contract).cloned()
	}

	fn set_value(&self, value: Value, scope: &LifetimeScope<'_>) {
		scope
			.per_resolve
			.borrow_mut()
			.entry(scope.contract.clone())
			.or_insert(value);
	}

	fn fresh(&self) -> Arc<dyn LifetimeManager> {
		Arc::new(PerResolveLifetime)
	}

	fn lifetime(&self) -> Lifetime {
		Lifetime::PerResolve
	}
}
