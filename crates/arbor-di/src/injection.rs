//! Injection members supplied at registration time
//!
//! Injection members let a registration choose what a type's declared constructor
//! parameters, fields, properties and methods receive, without changing the type's
//! recipe. Any member on a registration forces a full build, so a type mapping that
//! carries members is never shortcut into a redirect.

use crate::context::ResolutionContext;
use crate::contract::Contract;
use crate::error::DiResult;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

pub type ValueFactory = Arc<dyn Fn(&ResolutionContext<'_>) -> DiResult<Value> + Send + Sync>;

/// What an injected member receives.
#[derive(Clone)]
pub enum InjectionValue {
	/// A fixed value.
	Value(Value),
	/// Resolve a contract in the current context.
	Resolve(Contract),
	/// Resolve a contract, falling back to `default` (or nothing) if it fails.
	Optional {
		contract: Contract,
		default: Option<Value>,
	},
	/// Compute the value from the resolution context.
	Factory(ValueFactory),
}

impl InjectionValue {
	pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
		Self::Value(Value::from_value(value))
	}

	pub fn resolve<T: ?Sized + 'static>() -> Self {
		Self::Resolve(Contract::of::<T>())
	}

	pub fn named<T: ?Sized + 'static>(name: impl Into<Arc<str>>) -> Self {
		Self::Resolve(Contract::named::<T>(name))
	}

	pub fn factory<F>(factory: F) -> Self
	where
		F: Fn(&ResolutionContext<'_>) -> DiResult<Value> + Send + Sync + 'static,
	{
		Self::Factory(Arc::new(factory))
	}

	/// Produces the member value; `None` means an optional value was absent.
	pub fn evaluate(&self, ctx: &ResolutionContext<'_>) -> DiResult<Option<Value>> {
		match self {
			Self::Value(value) => Ok(Some(value.clone())),
			Self::Resolve(contract) => ctx.resolve(contract).map(Some),
			Self::Optional { contract, default } => match ctx.resolve(contract) {
				Ok(value) => Ok(Some(value)),
				Err(error) if error.is_circular() => Err(error),
				Err(_) => {
					ctx.clear_faults();
					Ok(default.clone())
				}
			},
			Self::Factory(factory) => factory(ctx).map(Some),
		}
	}
}

impl fmt::Debug for InjectionValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
			Self::Resolve(contract) => f.debug_tuple("Resolve").field(contract).finish(),
			Self::Optional { contract, default } => f
				.debug_struct("Optional")
				.field("contract", contract)
				.field("default", default)
				.finish(),
			Self::Factory(_) => f.write_str("Factory(..)"),
		}
	}
}

/// A single injection member.
#[derive(Clone, Debug)]
pub enum InjectionMember {
	/// Values for every constructor parameter, in declaration order.
	Constructor(Vec<InjectionValue>),
	Field {
		name: Arc<str>,
		value: InjectionValue,
	},
	Property {
		name: Arc<str>,
		value: InjectionValue,
	},
	/// Invoke a declared method. Empty `arguments` keeps the declared imports.
	Method {
		name: Arc<str>,
		arguments: Vec<InjectionValue>,
	},
}

impl InjectionMember {
	pub fn constructor(values: impl IntoIterator<Item = InjectionValue>) -> Self {
		Self::Constructor(values.into_iter().collect())
	}

	pub fn field(name: impl Into<Arc<str>>, value: InjectionValue) -> Self {
		Self::Field {
			name: name.into(),
			value,
		}
	}

	pub fn property(name: impl Into<Arc<str>>, value: InjectionValue) -> Self {
		Self::Property {
			name: name.into(),
			value,
		}
	}

	pub fn method(
		name: impl Into<Arc<str>>,
		arguments: impl IntoIterator<Item = InjectionValue>,
	) -> Self {
		Self::Method {
			name: name.into(),
			arguments: arguments.into_iter().collect(),
		}
	}
}

/// The members attached to one registration, grouped by kind.
#[derive(Clone, Debug, Default)]
pub struct InjectionMembers {
	constructor: Option<Vec<InjectionValue>>,
	fields: Vec<(Arc<str>, InjectionValue)>,
	properties: Vec<(Arc<str>, InjectionValue)>,
	methods: Vec<(Arc<str>, Vec<InjectionValue>)>,
}

impl InjectionMembers {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a member. A later constructor replaces an earlier one; a later field or
	/// property with the same name replaces the earlier value.
	pub fn add(&mut self, member: InjectionMember) {
		match member {
			InjectionMember::Constructor(values) => self.constructor = Some(values),
			InjectionMember::Field { name, value } => upsert(&mut self.fields, name, value),
			InjectionMember::Property { name, value } => {
				upsert(&mut self.properties, name, value)
			}
			InjectionMember::Method { name, arguments } => self.methods.push((name, arguments)),
		}
	}

	pub fn with(mut self, member: InjectionMember) -> Self {
		self.add(member);
		self
	}

	pub fn merge(&mut self, other: &InjectionMembers) {
		if let Some(values) = &other.constructor {
			self.constructor = Some(values.clone());
		}
		for (name, value) in &other.fields {
			upsert(&mut self.fields, name.clone(), value.clone());
		}
		for (name, value) in &other.properties {
			upsert(&mut self.properties, name.clone(), value.clone());
		}
		self.methods.extend(other.methods.iter().cloned());
	}

	pub fn len(&self) -> usize {
		usize::from(self.constructor.is_some())
			+ self.fields.len()
			+ self.properties.len()
			+ self.methods.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Whether these members force a full build instead of a redirect or cached value.
	pub fn require_build(&self) -> bool {
		!self.is_empty()
	}

	pub fn constructor(&self) -> Option<&[InjectionValue]> {
		self.constructor.as_deref()
	}

	pub fn fields(&self) -> &[(Arc<str>, InjectionValue)] {
		&self.fields
	}

	pub fn properties(&self) -> &[(Arc<str>, InjectionValue)] {
		&self.properties
	}

	pub fn methods(&self) -> &[(Arc<str>, Vec<InjectionValue>)] {
		&self.methods
	}
}

impl FromIterator<InjectionMember> for InjectionMembers {
	fn from_iter<I: IntoIterator<Item = InjectionMember>>(iter: I) -> Self {
		let mut members = Self::default();
		for member in iter {
			members.add(member);
		}
		members
	}
}

fn upsert(list: &mut Vec<(Arc<str>, InjectionValue)>, name: Arc<str>, value: InjectionValue) {
	match list.iter_mut().find(|(existing, _)| *existing == name) {
		Some(slot) => slot.1 = value,
		None => list.push((name, value)),
	}
}
