//! Registration API

use super::Container;
use crate::context::ResolutionContext;
use crate::contract::{Contract, GenericContract, GenericKey, TypeKey};
use crate::error::{DiError, DiResult};
use crate::injection::{InjectionMember, InjectionMembers};
use crate::lifetime::{Lifetime, LifetimeManager, SingletonLifetime};
use crate::recipe::Injectable;
use crate::registration::{
	GenericBinding, GenericRegistration, Registration, RegistrationData, TypeMapping,
};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Name, lifetime and injection members of a registration.
///
/// ```
/// use arbor_di::{InjectionMember, InjectionValue, Lifetime, RegistrationOptions};
///
/// let options = RegistrationOptions::new()
/// 	.named("primary")
/// 	.lifetime(Lifetime::Singleton)
/// 	.member(InjectionMember::field("port", InjectionValue::value(5432_u16)));
/// assert_eq!(options.name(), Some("primary"));
/// ```
#[derive(Clone, Default)]
pub struct RegistrationOptions {
	name: Option<Arc<str>>,
	lifetime: Option<Lifetime>,
	manager: Option<Arc<dyn LifetimeManager>>,
	members: InjectionMembers,
}

impl RegistrationOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
		self.lifetime = Some(lifetime);
		self
	}

	/// Uses a custom lifetime manager; takes precedence over [`lifetime`](Self::lifetime).
	pub fn manager(mut self, manager: Arc<dyn LifetimeManager>) -> Self {
		self.manager = Some(manager);
		self
	}

	pub fn member(mut self, member: InjectionMember) -> Self {
		self.members.add(member);
		self
	}

	pub fn members(mut self, members: impl IntoIterator<Item = InjectionMember>) -> Self {
		for member in members {
			self.members.add(member);
		}
		self
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	fn into_parts(self, default: Lifetime) -> (Option<Arc<str>>, Arc<dyn LifetimeManager>, InjectionMembers) {
		let manager = self
			.manager
			.unwrap_or_else(|| self.lifetime.unwrap_or(default).manager());
		(self.name, manager, self.members)
	}
}

impl fmt::Debug for RegistrationOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RegistrationOptions")
			.field("name", &self.name)
			.field("lifetime", &self.lifetime)
			.field("manager", &self.manager)
			.field("members", &self.members.len())
			.finish()
	}
}

impl Container {
	/// Adds a registration to this container, replacing any registration of the same
	/// contract in place.
	///
	/// Registration is not synchronized with resolution of the same contract; finish
	/// registering before resolving concurrently.
	pub fn register(
		&self,
		contract: Contract,
		data: RegistrationData,
		lifetime: Arc<dyn LifetimeManager>,
		members: InjectionMembers,
	) -> Arc<Registration> {
		let core = &self.inner.core;
		core.catalog.declare(contract.key().clone());
		let registration = Arc::new(Registration::new(contract, data, lifetime, members));
		let replaced = self.inner.scope.add(Arc::clone(&registration));
		tracing::debug!(
			container = %self.inner.id,
			contract = %registration.contract(),
			category = ?registration.category(),
			lifetime = ?registration.lifetime().lifetime(),
			replaced = replaced.is_some(),
			"Registered"
		);
		registration
	}

	fn contract_for<T: ?Sized + 'static>(&self, name: Option<Arc<str>>) -> Contract {
		Contract::new(self.inner.canonical_key(TypeKey::of::<T>()), name)
	}

	/// Maps service `I` to implementation `C`.
	///
	/// Resolving `I` resolves `C` (registered or built from its recipe) and converts it
	/// with `upcast`. With injection members the registration builds `C` itself.
	pub fn register_type<I, C>(
		&self,
		options: RegistrationOptions,
		upcast: fn(Arc<C>) -> Arc<I>,
	) -> Arc<Registration>
	where
		I: ?Sized + Send + Sync + 'static,
		C: Injectable,
	{
		self.inner.core.catalog.describe::<C>();
		self.register_mapping(options, upcast)
	}

	/// Like [`register_type`](Self::register_type) for an implementation without a
	/// recipe, typically one registered elsewhere with a factory or instance.
	pub fn register_mapping<I, C>(
		&self,
		options: RegistrationOptions,
		upcast: fn(Arc<C>) -> Arc<I>,
	) -> Arc<Registration>
	where
		I: ?Sized + Send + Sync + 'static,
		C: Send + Sync + 'static,
	{
		let (name, lifetime, members) = options.into_parts(self.settings().default_lifetime);
		let mut mapping = TypeMapping::to::<I, C>(upcast);
		mapping.target = self.inner.canonical_key(mapping.target);
		self.register(self.contract_for::<I>(name), RegistrationData::Type(mapping), lifetime, members)
	}

	/// Registers `C` as its own service.
	pub fn register_self<C: Injectable>(&self, options: RegistrationOptions) -> Arc<Registration> {
		self.register_type::<C, C>(options, |c| c)
	}

	/// Registers an existing value as the unnamed `T`.
	pub fn register_instance<T: Send + Sync + 'static>(&self, value: T) -> Arc<Registration> {
		self.register_instance_with(RegistrationOptions::new(), Arc::new(value))
	}

	/// Registers an existing shared value; `T` may be a trait object.
	///
	/// The lifetime in `options` is ignored: instances are always held for the
	/// lifetime of the registration.
	pub fn register_instance_with<T>(
		&self,
		options: RegistrationOptions,
		value: Arc<T>,
	) -> Arc<Registration>
	where
		T: ?Sized + Send + Sync + 'static,
	{
		let value = Value::new(value);
		let (name, _, members) = options.into_parts(Lifetime::Singleton);
		self.register(
			self.contract_for::<T>(name),
			RegistrationData::Instance(value.clone()),
			Arc::new(SingletonLifetime::with_value(value)),
			members,
		)
	}

	/// Registers a factory producing `T`.
	///
	/// The factory resolves its own dependencies through the context, which keeps
	/// them in the same resolution chain.
	pub fn register_factory<T, F>(&self, options: RegistrationOptions, factory: F) -> Arc<Registration>
	where
		T: ?Sized + Send + Sync + 'static,
		F: Fn(&ResolutionContext<'_>) -> DiResult<Arc<T>> + Send + Sync + 'static,
	{
		let (name, lifetime, members) = options.into_parts(self.settings().default_lifetime);
		self.register(
			self.contract_for::<T>(name),
			RegistrationData::Factory(Arc::new(move |ctx: &ResolutionContext<'_>| {
				factory(ctx).map(Value::new)
			})),
			lifetime,
			members,
		)
	}

	/// Binds an open generic definition.
	///
	/// `binder` receives the closed key being resolved and returns how to produce it,
	/// or `None` when the arguments are not supported.
	pub fn register_generic<F>(
		&self,
		definition: GenericKey,
		options: RegistrationOptions,
		binder: F,
	) -> Arc<GenericRegistration>
	where
		F: Fn(&TypeKey) -> Option<GenericBinding> + Send + Sync + 'static,
	{
		let (name, lifetime, members) = options.into_parts(self.settings().default_lifetime);
		let contract = GenericContract::new(definition, name);
		let registration = Arc::new(GenericRegistration::new(
			contract,
			Arc::new(binder),
			lifetime,
			members,
		));
		self.inner.scope.add_generic(Arc::clone(&registration));
		tracing::debug!(
			container = %self.inner.id,
			contract = ?registration.contract(),
			"Registered generic binding"
		);
		registration
	}

	/// Registers a copy of the visible registration of `source` under the name in
	/// `options`. The copy shares the source's data, inherits its injection members,
	/// and reuses its pipeline unless `options` adds members.
	pub fn register_clone(
		&self,
		source: &Contract,
		options: RegistrationOptions,
	) -> DiResult<Arc<Registration>> {
		let original = self
			.inner
			.ancestry()
			.find_map(|level| level.scope.get(source))
			.ok_or_else(|| DiError::not_constructible(source, "no registration to clone"))?;
		let (name, lifetime, members) = options.into_parts(original.lifetime().lifetime());
		Ok(self.register(
			source.with_name(name),
			RegistrationData::Clone(original),
			lifetime,
			members,
		))
	}

	/// Whether `contract` has a registration (exact or through a generic binding)
	/// anywhere from this container to the root.
	pub fn is_registered(&self, contract: &Contract) -> bool {
		let definition = contract.generic_definition();
		self.inner.ancestry().any(|level| {
			level.scope.contains(contract)
				|| definition
					.as_ref()
					.is_some_and(|definition| level.scope.has_generic(definition))
		})
	}

	/// Every registration visible from this container, nearest first. Registrations
	/// hidden by a child registration of the same contract are left out.
	pub fn registrations(&self) -> Vec<Arc<Registration>> {
		let mut seen = std::collections::HashSet::new();
		let mut visible = Vec::new();
		for level in self.inner.ancestry() {
			for contract in level.scope.contracts() {
				if seen.insert(contract.clone())
					&& let Some(registration) = level.scope.get(&contract)
				{
					visible.push(registration);
				}
			}
		}
		visible
	}
}
