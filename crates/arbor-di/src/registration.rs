//! Registration descriptors
//!
//! A [`Registration`] is the per-contract record a scope owns: how the value is
//! produced, which lifetime manager caches it, the injection members supplied at
//! registration time, and the resolution pipeline compiled on first use.
//!
//! Everything except the pipeline is fixed once the registration is added to a
//! scope. The pipeline cell is written exactly once; readers never lock.

use crate::collection::CollectionCache;
use crate::context::ResolutionContext;
use crate::contract::{Contract, GenericContract, TypeKey};
use crate::error::{DiError, DiResult};
use crate::injection::InjectionMembers;
use crate::lifetime::LifetimeManager;
use crate::pipeline::Pipeline;
use crate::value::Value;
use once_cell::sync::OnceCell;
use parking_lot::ReentrantMutex;
use std::fmt;
use std::sync::Arc;

/// Which strategy produces a registration's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegistrationCategory {
	/// Build (or redirect to) a type.
	Type,
	/// Return a value supplied at registration.
	Instance,
	/// Call a user factory.
	Factory,
	/// Synthetic descriptor holding array or enumerable metadata.
	Cache,
	/// Reuse another registration's members and pipeline.
	Clone,
}

/// Which container executes a registration's pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImportSource {
	/// The container that owns the registration.
	Any,
	/// The container the resolve call started from.
	Local,
}

pub type FactoryFn = Arc<dyn Fn(&ResolutionContext<'_>) -> DiResult<Value> + Send + Sync>;
pub type CastFn = Arc<dyn Fn(Value) -> Option<Value> + Send + Sync>;

/// Mapping from a service contract to the concrete type that implements it.
#[derive(Clone)]
pub struct TypeMapping {
	pub target: TypeKey,
	/// Converts the target's value to the service type.
	pub cast: CastFn,
}

impl TypeMapping {
	/// Maps a type onto itself.
	pub fn identity(target: TypeKey) -> Self {
		Self {
			target,
			cast: Arc::new(Some::<Value>),
		}
	}

	/// Maps `I` to `C`, converting with `upcast` (typically an unsizing coercion).
	pub fn to<I, C>(upcast: fn(Arc<C>) -> Arc<I>) -> Self
	where
		I: ?Sized + Send + Sync + 'static,
		C: Send + Sync + 'static,
	{
		Self {
			target: TypeKey::of::<C>(),
			cast: Arc::new(move |value: Value| {
				value.downcast::<C>().map(|c| Value::new(upcast(c)))
			}),
		}
	}
}

#[derive(Clone)]
pub enum RegistrationData {
	Type(TypeMapping),
	Instance(Value),
	Factory(FactoryFn),
	Clone(Arc<Registration>),
	Cache(Arc<CollectionCache>),
}

impl RegistrationData {
	pub fn category(&self) -> RegistrationCategory {
		match self {
			Self::Type(_) => RegistrationCategory::Type,
			Self::Instance(_) => RegistrationCategory::Instance,
			Self::Factory(_) => RegistrationCategory::Factory,
			Self::Clone(_) => RegistrationCategory::Clone,
			Self::Cache(_) => RegistrationCategory::Cache,
		}
	}
}

pub struct Registration {
	contract: Contract,
	data: RegistrationData,
	lifetime: Arc<dyn LifetimeManager>,
	members: InjectionMembers,
	require_build: bool,
	inherits_pipeline: bool,
	pub(crate) pipeline: OnceCell<Pipeline>,
	pub(crate) lock: ReentrantMutex<()>,
}

impl Registration {
	pub fn new(
		contract: Contract,
		data: RegistrationData,
		lifetime: Arc<dyn LifetimeManager>,
		members: InjectionMembers,
	) -> Self {
		// A clone without members of its own runs its source's pipeline.
		let inherits_pipeline = matches!(data, RegistrationData::Clone(_)) && members.is_empty();
		// A clone inherits the members of its source, then applies its own on top.
		let members = match &data {
			RegistrationData::Clone(source) => {
				let mut inherited = source.members.clone();
				inherited.merge(&members);
				inherited
			}
			_ => members,
		};
		let require_build = members.require_build();
		Self {
			contract,
			data,
			lifetime,
			members,
			require_build,
			inherits_pipeline,
			pipeline: OnceCell::new(),
			lock: ReentrantMutex::new(()),
		}
	}

	pub fn contract(&self) -> &Contract {
		&self.contract
	}

	pub fn category(&self) -> RegistrationCategory {
		self.data.category()
	}

	pub fn data(&self) -> &RegistrationData {
		&self.data
	}

	pub fn lifetime(&self) -> &Arc<dyn LifetimeManager> {
		&self.lifetime
	}

	pub fn members(&self) -> &InjectionMembers {
		&self.members
	}

	pub fn require_build(&self) -> bool {
		self.require_build
	}

	/// Whether this clone reuses the compiled pipeline of the registration it copies.
	pub fn inherits_pipeline(&self) -> bool {
		self.inherits_pipeline
	}

	pub fn source(&self) -> ImportSource {
		self.lifetime.source()
	}

	/// Whether the resolution pipeline has been compiled.
	pub fn is_compiled(&self) -> bool {
		self.pipeline.get().is_some()
	}

	/// Whether a successful build is handed to the lifetime manager.
	pub(crate) fn caches_result(&self) -> bool {
		matches!(
			self.category(),
			RegistrationCategory::Type | RegistrationCategory::Factory | RegistrationCategory::Clone
		)
	}
}

impl fmt::Debug for Registration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Registration")
			.field("contract", &self.contract)
			.field("category", &self.category())
			.field("lifetime", &self.lifetime.lifetime())
			.field("members", &self.members.len())
			.field("compiled", &self.is_compiled())
			.finish()
	}
}

/// What a bound generic produces for one closed type.
#[derive(Clone)]
pub enum GenericBinding {
	/// Build the closed value with a factory.
	Factory(FactoryFn),
	/// Map the closed service type to another closed type.
	MapTo(TypeMapping),
}

pub type GenericBinder = Arc<dyn Fn(&TypeKey) -> Option<GenericBinding> + Send + Sync>;

/// An open generic binding such as `Repository<_> -> SqlRepository<_>`.
///
/// Closed registrations are produced on demand and cached by the owning scope.
pub struct GenericRegistration {
	contract: GenericContract,
	binder: GenericBinder,
	lifetime: Arc<dyn LifetimeManager>,
	members: InjectionMembers,
}

impl GenericRegistration {
	pub fn new(
		contract: GenericContract,
		binder: GenericBinder,
		lifetime: Arc<dyn LifetimeManager>,
		members: InjectionMembers,
	) -> Self {
		Self {
			contract,
			binder,
			lifetime,
			members,
		}
	}

	pub fn contract(&self) -> &GenericContract {
		&self.contract
	}

	/// Builds the registration for a closed contract of this definition.
	pub fn close(&self, contract: &Contract) -> DiResult<Registration> {
		let binding = (self.binder)(contract.key()).ok_or_else(|| DiError::TypeLoad {
			contract: contract.clone(),
			reason: format!(
				"generic binding {:?} does not accept these arguments",
				self.contract
			),
		})?;
		let data = match binding {
			GenericBinding::Factory(factory) => RegistrationData::Factory(factory),
			GenericBinding::MapTo(mapping) => RegistrationData::Type(mapping),
		};
		Ok(Registration::new(
			contract.clone(),
			data,
			self.lifetime.fresh(),
			self.members.clone(),
		))
	}
}

impl fmt::Debug for GenericRegistration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GenericRegistration")
			.field("contract", &self.contract)
			.field("lifetime", &self.lifetime.lifetime())
			.finish()
	}
}
