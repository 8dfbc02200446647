//! Resolution algorithm and resolve API

use super::{Container, ContainerInner};
use crate::collection::CollectionCache;
use crate::context::{Request, ResolutionContext};
use crate::contract::{Contract, TypeKey};
use crate::cycle_detection::begin_resolution;
use crate::error::{DiError, DiResult};
use crate::overrides::ResolverOverride;
use crate::pipeline::Pipeline;
use crate::recipe::downcast;
use crate::registration::{ImportSource, Registration, RegistrationData};
use crate::value::{BoxedInstance, Collection, Value};
use std::sync::Arc;

impl ContainerInner {
	/// Resolves `contract` as one step of `request`.
	///
	/// Failures are recorded on the request's trail before they are returned, so the
	/// top-level call can report the chain of contracts that failed.
	pub(crate) fn resolve_in(
		self: &Arc<Self>,
		contract: &Contract,
		request: &Request,
		parent: Option<&ResolutionContext<'_>>,
	) -> DiResult<Value> {
		let contract = &contract.with_key(self.canonical_key(contract.key().clone()));
		let result = self.resolve_step(contract, request, parent);
		if let Err(error) = &result {
			tracing::trace!(contract = %contract, error = %error, "Resolution step failed");
			request.record_failure(contract);
		}
		result
	}

	fn resolve_step(
		self: &Arc<Self>,
		contract: &Contract,
		request: &Request,
		parent: Option<&ResolutionContext<'_>>,
	) -> DiResult<Value> {
		let depth = parent.map_or(0, |parent| parent.depth() + 1);
		begin_resolution(
			contract,
			parent
				.into_iter()
				.flat_map(|parent| parent.ancestors())
				.map(|ctx| ctx.contract()),
			depth,
			self.settings().max_resolution_depth,
		)?;

		let (executor, registration) = self.locate(contract)?;
		tracing::trace!(
			contract = %contract,
			container = %executor.id,
			category = ?registration.category(),
			depth,
			"Resolving"
		);
		let ctx = ResolutionContext::new(executor, contract, Some(&registration), request, parent, depth);
		executor.run_registration(&registration, &ctx)
	}

	/// Finds the registration for `contract` and the container that executes it.
	///
	/// The nearest container with an exact registration or a generic binding wins.
	/// Collections and unregistered types are handled by the requesting container.
	fn locate<'s>(
		self: &'s Arc<Self>,
		contract: &Contract,
	) -> DiResult<(&'s Arc<ContainerInner>, Arc<Registration>)> {
		let generic = contract.key().is_generic();
		for level in self.ancestry() {
			let found = match level.scope.get(contract) {
				Some(registration) => Some(registration),
				None if generic => level.scope.get_bound_generic(contract).transpose()?,
				None => None,
			};
			if let Some(registration) = found {
				let executor = match registration.source() {
					ImportSource::Local => self,
					ImportSource::Any => level,
				};
				return Ok((executor, registration));
			}
		}

		let key = contract.key();
		if key.is_array() || key.is_enumerable() {
			return Ok((self, self.scope.collection_registration(contract)));
		}
		Ok((self, self.core.unregistered(contract)?))
	}

	fn pipeline<'r>(&self, registration: &'r Registration) -> &'r Pipeline {
		registration
			.pipeline
			.get_or_init(|| self.core.builder.build(&self.core, registration))
	}

	fn run_registration(
		&self,
		registration: &Registration,
		ctx: &ResolutionContext<'_>,
	) -> DiResult<Value> {
		let lifetime = registration.lifetime();
		if let Some(value) = lifetime.get_value(&ctx.lifetime_scope()) {
			tracing::trace!(contract = %ctx.contract(), "Lifetime hit");
			return Ok(value);
		}

		let pipeline = self.pipeline(registration);
		if !lifetime.is_synchronized() {
			return Self::build(pipeline, registration, ctx);
		}

		let _guard = registration.lock.lock();
		if let Some(value) = lifetime.get_value(&ctx.lifetime_scope()) {
			return Ok(value);
		}
		Self::build(pipeline, registration, ctx)
	}

	fn build(
		pipeline: &Pipeline,
		registration: &Registration,
		ctx: &ResolutionContext<'_>,
	) -> DiResult<Value> {
		let value = pipeline.resolve(ctx)?;
		if registration.caches_result() {
			registration
				.lifetime()
				.set_value(value.clone(), &ctx.lifetime_scope());
		}
		Ok(value)
	}

	/// Runs member injection over `instance` as the value of `contract`.
	fn build_up_in(
		self: &Arc<Self>,
		contract: &Contract,
		instance: BoxedInstance,
		request: &Request,
	) -> DiResult<Value> {
		let registration = match self.locate(contract) {
			Ok((_, registration)) if self.pipeline(&registration).supports_build_up() => registration,
			_ => self.core.build_up_registration(contract),
		};
		let pipeline = self.pipeline(&registration);
		let ctx = ResolutionContext::new(self, contract, Some(&registration), request, None, 0);
		tracing::trace!(contract = %contract, container = %self.id, "Building up instance");

		let result = match pipeline.build_up(&ctx, instance) {
			Some(result) => result,
			// Only a pipeline that failed to compile lacks build-up at this point.
			None => Err(pipeline.resolve(&ctx).err().unwrap_or_else(|| {
				DiError::not_constructible(contract, "registration does not support build-up")
			})),
		};
		if result.is_err() {
			request.record_failure(contract);
		}
		result
	}
}

impl Container {
	/// Resolves `contract` from this container.
	///
	/// `overrides` replace the values of matching dependency sites anywhere in the
	/// resolution; see [`select_override`](crate::overrides::select_override) for how
	/// one is picked. A failure is reported as [`DiError::ResolutionFailed`] carrying
	/// the chain of contracts that failed, outermost first.
	pub fn resolve_contract(
		&self,
		contract: &Contract,
		overrides: Vec<Arc<dyn ResolverOverride>>,
	) -> DiResult<Value> {
		let request = Request::new(overrides);
		self.inner
			.resolve_in(contract, &request, None)
			.map_err(|error| resolution_failed(contract, &request, error))
	}

	/// Resolves the unnamed registration of `T`.
	pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
		self.resolve_with::<T>(None, Vec::new())
	}

	/// Resolves the registration of `T` under `name`.
	pub fn resolve_named<T: ?Sized + Send + Sync + 'static>(
		&self,
		name: impl Into<Arc<str>>,
	) -> DiResult<Arc<T>> {
		self.resolve_with::<T>(Some(name.into()), Vec::new())
	}

	/// Resolves `T` under an optional name, applying `overrides` for this call only.
	pub fn resolve_with<T: ?Sized + Send + Sync + 'static>(
		&self,
		name: Option<Arc<str>>,
		overrides: Vec<Arc<dyn ResolverOverride>>,
	) -> DiResult<Arc<T>> {
		let contract = Contract::new(self.inner.canonical_key(TypeKey::of::<T>()), name);
		self.resolve_as(&contract, overrides)
	}

	/// Resolves an explicit `contract` and downcasts the result to `T`.
	pub fn resolve_as<T: ?Sized + Send + Sync + 'static>(
		&self,
		contract: &Contract,
		overrides: Vec<Arc<dyn ResolverOverride>>,
	) -> DiResult<Arc<T>> {
		let value = self.resolve_contract(contract, overrides)?;
		downcast(contract, &value)
	}

	/// Every registration of `T` visible from this container, named or not.
	///
	/// Elements that fail to load are skipped; any other element failure fails the
	/// whole call.
	pub fn resolve_all<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
		let element = self.inner.canonical_key(TypeKey::of::<T>());
		self.resolve_collection::<T>(Contract::new(TypeKey::array_of::<T>(element), None))
	}

	/// Like [`resolve_all`](Self::resolve_all), but when nothing is registered the bare
	/// `T` is resolved and returned as a single element if it succeeds.
	pub fn resolve_enumerable<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
		let element = self.inner.canonical_key(TypeKey::of::<T>());
		self.resolve_collection::<T>(Contract::new(TypeKey::enumerable_of::<T>(element), None))
	}

	/// The metadata cache behind [`resolve_all`](Self::resolve_all) in this container,
	/// once `T`'s array has been resolved here.
	pub fn collection_cache<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<CollectionCache>> {
		let element = self.inner.canonical_key(TypeKey::of::<T>());
		let contract = Contract::new(TypeKey::array_of::<T>(element), None);
		match self.inner.scope.existing_collection(&contract)?.data() {
			RegistrationData::Cache(cache) => Some(cache.clone()),
			_ => None,
		}
	}

	fn resolve_collection<T: ?Sized + Send + Sync + 'static>(
		&self,
		contract: Contract,
	) -> DiResult<Vec<Arc<T>>> {
		let collection = self.resolve_as::<Collection>(&contract, Vec::new())?;
		collection.typed::<T>().ok_or_else(|| DiError::TypeMismatch {
			contract,
			expected: std::any::type_name::<T>(),
			found: "mixed collection",
		})
	}

	/// Injects fields, properties and methods into an instance built elsewhere.
	///
	/// The registration of `(T, name)` supplies the injection members when it builds
	/// from a recipe; otherwise the recipe of `T` is used as declared.
	pub fn build_up<T: Send + Sync + 'static>(
		&self,
		instance: T,
		name: Option<Arc<str>>,
		overrides: Vec<Arc<dyn ResolverOverride>>,
	) -> DiResult<Arc<T>> {
		let contract = Contract::new(self.inner.canonical_key(TypeKey::of::<T>()), name);
		let request = Request::new(overrides);
		let value = self
			.inner
			.build_up_in(&contract, Box::new(instance), &request)
			.map_err(|error| resolution_failed(&contract, &request, error))?;
		downcast(&contract, &value)
	}

	/// Whether `contract` would be found without building anything: a registration,
	/// a collection contract, or a constructible type in the catalog.
	pub fn can_resolve(&self, contract: &Contract) -> bool {
		let key = contract.key();
		if self.is_registered(contract) || key.is_array() || key.is_enumerable() {
			return true;
		}
		let key = self.inner.canonical_key(key.clone());
		!key.is_abstract()
			&& self
				.catalog()
				.get(&key)
				.is_some_and(|recipe| recipe.is_constructible())
	}
}

fn resolution_failed(contract: &Contract, request: &Request, error: DiError) -> DiError {
	let chain = request.take_chain();
	tracing::debug!(contract = %contract, error = %error, "Resolution failed");
	DiError::ResolutionFailed {
		contract: contract.clone(),
		chain,
		source: Box::new(error),
	}
}
