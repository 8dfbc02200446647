//! Resolution context
//!
//! One [`ResolutionContext`] exists per resolution step. Contexts are borrowed, never
//! owned: each nested resolution receives a reference to its parent, forming the
//! call chain used for cycle detection and error reporting. State shared by the
//! whole top-level call (overrides, per-resolve values, the failure trail) lives in
//! the [`Request`] every context in the chain borrows.

use crate::container::{Container, ContainerInner};
use crate::contract::{Contract, TypeKey};
use crate::error::DiResult;
use crate::injection::InjectionValue;
use crate::lifetime::{ContainerId, LifetimeScope, PerResolveStore};
use crate::overrides::{DependencySite, ResolverOverride, select_override};
use crate::recipe::{ImportSite, downcast};
use crate::registration::Registration;
use crate::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

/// State shared by every step of one top-level resolve call.
#[derive(Default)]
pub struct Request {
	overrides: Vec<Arc<dyn ResolverOverride>>,
	per_resolve: PerResolveStore,
	/// Contracts that failed, innermost first. Cleared when a failure is absorbed.
	trail: RefCell<Vec<Contract>>,
}

impl Request {
	pub fn new(overrides: Vec<Arc<dyn ResolverOverride>>) -> Self {
		Self {
			overrides,
			..Self::default()
		}
	}

	pub fn overrides(&self) -> &[Arc<dyn ResolverOverride>] {
		&self.overrides
	}

	pub(crate) fn per_resolve(&self) -> &PerResolveStore {
		&self.per_resolve
	}

	pub(crate) fn record_failure(&self, contract: &Contract) {
		self.trail.borrow_mut().push(contract.clone());
	}

	pub(crate) fn clear_trail(&self) {
		self.trail.borrow_mut().clear();
	}

	/// The failed contracts, outermost first.
	pub(crate) fn take_chain(&self) -> Vec<Contract> {
		let mut chain = std::mem::take(&mut *self.trail.borrow_mut());
		chain.reverse();
		chain
	}
}

impl fmt::Debug for Request {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Request")
			.field("overrides", &self.overrides.len())
			.field("trail", &self.trail.borrow())
			.finish()
	}
}

pub struct ResolutionContext<'a> {
	container: &'a Arc<ContainerInner>,
	contract: &'a Contract,
	registration: Option<&'a Arc<Registration>>,
	request: &'a Request,
	parent: Option<&'a ResolutionContext<'a>>,
	depth: usize,
}

impl<'a> ResolutionContext<'a> {
	pub(crate) fn new(
		container: &'a Arc<ContainerInner>,
		contract: &'a Contract,
		registration: Option<&'a Arc<Registration>>,
		request: &'a Request,
		parent: Option<&'a ResolutionContext<'a>>,
		depth: usize,
	) -> Self {
		Self {
			container,
			contract,
			registration,
			request,
			parent,
			depth,
		}
	}

	/// Resolves a dependency of the value being built.
	pub fn resolve(&self, contract: &Contract) -> DiResult<Value> {
		self.container.resolve_in(contract, self.request, Some(self))
	}

	/// Resolves the unnamed registration of `T`.
	pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
		let contract = Contract::new(self.container.canonical_key(TypeKey::of::<T>()), None);
		self.resolve_as(&contract)
	}

	pub fn get_named<T: ?Sized + Send + Sync + 'static>(
		&self,
		name: impl Into<Arc<str>>,
	) -> DiResult<Arc<T>> {
		let contract = Contract::new(
			self.container.canonical_key(TypeKey::of::<T>()),
			Some(name.into()),
		);
		self.resolve_as(&contract)
	}

	pub fn resolve_as<T: ?Sized + Send + Sync + 'static>(
		&self,
		contract: &Contract,
	) -> DiResult<Arc<T>> {
		let value = self.resolve(contract)?;
		downcast(contract, &value)
	}

	/// The override selected for `site`, if any.
	pub fn get_override(&self, site: &ImportSite, contract: &Contract) -> Option<&'a InjectionValue> {
		let dependency = DependencySite { site, contract };
		select_override(self.request.overrides(), &dependency).map(|entry| entry.value())
	}

	/// Forgets failures recorded so far, after a caller absorbed them.
	pub fn clear_faults(&self) {
		self.request.clear_trail();
	}

	/// Contracts from the top-level call down to this context.
	pub fn chain(&self) -> Vec<Contract> {
		let mut chain: Vec<Contract> = self.ancestors().map(|ctx| ctx.contract.clone()).collect();
		chain.reverse();
		chain
	}

	/// This context followed by its parents, nearest first.
	pub fn ancestors(&self) -> impl Iterator<Item = &ResolutionContext<'a>> {
		std::iter::successors(Some(self), |ctx| ctx.parent)
	}

	pub fn contract(&self) -> &'a Contract {
		self.contract
	}

	pub fn name(&self) -> Option<&'a str> {
		self.contract.name()
	}

	pub fn registration(&self) -> Option<&'a Arc<Registration>> {
		self.registration
	}

	pub fn parent(&self) -> Option<&'a ResolutionContext<'a>> {
		self.parent
	}

	pub fn depth(&self) -> usize {
		self.depth
	}

	pub fn overrides(&self) -> &'a [Arc<dyn ResolverOverride>] {
		self.request.overrides()
	}

	/// A handle to the container executing this step.
	pub fn container(&self) -> Container {
		Container::from_inner(Arc::clone(self.container))
	}

	pub fn container_id(&self) -> ContainerId {
		self.container.id()
	}

	pub(crate) fn inner(&self) -> &'a Arc<ContainerInner> {
		self.container
	}

	pub(crate) fn request(&self) -> &'a Request {
		self.request
	}

	pub(crate) fn lifetime_scope(&self) -> LifetimeScope<'a> {
		LifetimeScope {
			container: self.container.id(),
			per_resolve: self.request.per_resolve(),
			contract: self.contract,
		}
	}
}

impl fmt::Debug for ResolutionContext<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResolutionContext")
			.field("contract", self.contract)
			.field("container", &self.container.id())
			.field("depth", &self.depth)
			.finish()
	}
}
