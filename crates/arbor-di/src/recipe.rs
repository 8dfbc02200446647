//! Construction recipes and the type catalog
//!
//! Rust has no runtime reflection, so a type declares how it is built: which
//! constructor parameters it imports, which fields and properties are injected after
//! construction, and which methods are invoked with resolved arguments. A
//! [`Recipe`] captures that declaration with typed closures; the container erases it
//! into a [`TypeRecipe`] stored in the [`TypeCatalog`].
//!
//! ```
//! use arbor_di::{Container, Import, Injectable, Recipe};
//! use std::sync::Arc;
//!
//! struct Config {
//! 	url: String,
//! }
//!
//! struct Database {
//! 	config: Arc<Config>,
//! }
//!
//! impl Injectable for Database {
//! 	fn recipe() -> Recipe<Self> {
//! 		Recipe::new().constructor([Import::of::<Config>("config")], |args| {
//! 			Ok(Database { config: args.get(0)? })
//! 		})
//! 	}
//! }
//!
//! let container = Container::new();
//! container.register_instance(Config { url: "sqlite://".into() });
//! container.describe::<Database>();
//!
//! let db = container.resolve::<Database>().unwrap();
//! assert_eq!(db.config.url, "sqlite://");
//! ```

use crate::contract::{Contract, GenericKey, TypeKey};
use crate::error::{DiError, DiResult};
use crate::injection::InjectionValue;
use crate::value::{BoxedInstance, Collection, Value};
use parking_lot::RwLock;
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A type the container can build from its declared recipe.
pub trait Injectable: Sized + Send + Sync + 'static {
	fn recipe() -> Recipe<Self>;
}

/// Where an import appears on the declaring type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
	/// A constructor or method parameter.
	Parameter,
	Field,
	Property,
}

/// Caller-declared details of an import.
#[derive(Clone, Debug, Default)]
pub struct ImportAnnotation {
	/// Registration name to resolve instead of the unnamed contract.
	pub name: Option<Arc<str>>,
	pub optional: bool,
	pub default_value: Option<Value>,
	/// A value to inject instead of resolving the member type.
	pub explicit: Option<InjectionValue>,
}

/// A single dependency site of a type.
#[derive(Clone, Debug)]
pub struct ImportSite {
	pub kind: MemberKind,
	/// The type declaring this member.
	pub declaring: TypeKey,
	/// Parameter, field, or property name.
	pub member: Arc<str>,
	/// Enclosing method for method parameters; `None` for constructor parameters.
	pub method: Option<Arc<str>>,
	pub position: usize,
	pub member_type: TypeKey,
	pub annotation: ImportAnnotation,
}

/// Builder for an import declaration.
#[derive(Clone, Debug)]
pub struct Import {
	member: Arc<str>,
	member_type: TypeKey,
	annotation: ImportAnnotation,
}

impl Import {
	/// Imports the unnamed registration of `D` into the member `member`.
	pub fn of<D: ?Sized + 'static>(member: impl Into<Arc<str>>) -> Self {
		Self::keyed(member, TypeKey::of::<D>())
	}

	/// Imports the array of every `D` registration.
	pub fn all<D: ?Sized + 'static>(member: impl Into<Arc<str>>) -> Self {
		Self::keyed(member, TypeKey::array::<D>())
	}

	/// Imports the enumerable of `D` registrations.
	pub fn many<D: ?Sized + 'static>(member: impl Into<Arc<str>>) -> Self {
		Self::keyed(member, TypeKey::enumerable::<D>())
	}

	/// Imports a member whose key carries more than a `TypeId`, such as a closed generic.
	pub fn keyed(member: impl Into<Arc<str>>, member_type: TypeKey) -> Self {
		Self {
			member: member.into(),
			member_type,
			annotation: ImportAnnotation::default(),
		}
	}

	pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
		self.annotation.name = Some(name.into());
		self
	}

	/// Tolerates resolution failure; the member receives nothing.
	pub fn optional(mut self) -> Self {
		self.annotation.optional = true;
		self
	}

	/// Tolerates resolution failure; the member receives `value`.
	pub fn default_value<T: Send + Sync + 'static>(mut self, value: T) -> Self {
		self.annotation.optional = true;
		self.annotation.default_value = Some(Value::from_value(value));
		self
	}

	pub fn inject(mut self, value: InjectionValue) -> Self {
		self.annotation.explicit = Some(value);
		self
	}

	fn into_site(
		self,
		kind: MemberKind,
		declaring: &TypeKey,
		method: Option<Arc<str>>,
		position: usize,
	) -> ImportSite {
		ImportSite {
			kind,
			declaring: declaring.clone(),
			member: self.member,
			method,
			position,
			member_type: self.member_type,
			annotation: self.annotation,
		}
	}
}

/// Resolved arguments handed to a constructor or injection method.
pub struct Arguments {
	slots: Vec<(Contract, Option<Value>)>,
}

impl Arguments {
	pub(crate) fn new(slots: Vec<(Contract, Option<Value>)>) -> Self {
		Self { slots }
	}

	pub fn len(&self) -> usize {
		self.slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.slots.is_empty()
	}

	/// The raw value at `index`, if one was produced.
	pub fn value(&self, index: usize) -> Option<&Value> {
		self.slots.get(index).and_then(|(_, value)| value.as_ref())
	}

	/// A required argument.
	pub fn get<D: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<D>> {
		let (contract, value) = self.slot(index)?;
		match value {
			Some(value) => downcast(contract, value),
			None => Err(DiError::fault(
				contract,
				format!("missing required argument at position {index}"),
			)),
		}
	}

	/// An optional argument; `None` when an optional import produced nothing.
	pub fn optional<D: ?Sized + Send + Sync + 'static>(
		&self,
		index: usize,
	) -> DiResult<Option<Arc<D>>> {
		let (contract, value) = self.slot(index)?;
		value.as_ref().map(|value| downcast(contract, value)).transpose()
	}

	/// An array or enumerable argument.
	pub fn all<D: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Vec<Arc<D>>> {
		let collection = self.get::<Collection>(index)?;
		let (contract, _) = self.slot(index)?;
		collection.typed::<D>().ok_or_else(|| DiError::TypeMismatch {
			contract: contract.clone(),
			expected: type_name::<D>(),
			found: "mixed collection",
		})
	}

	fn slot(&self, index: usize) -> DiResult<&(Contract, Option<Value>)> {
		self.slots.get(index).ok_or_else(|| DiError::Fault {
			contract: Contract::of::<Arguments>(),
			message: format!("argument index {index} out of range ({})", self.slots.len()),
		})
	}
}

pub(crate) fn downcast<D: ?Sized + Send + Sync + 'static>(
	contract: &Contract,
	value: &Value,
) -> DiResult<Arc<D>> {
	value.downcast::<D>().ok_or_else(|| DiError::TypeMismatch {
		contract: contract.clone(),
		expected: type_name::<D>(),
		found: value.type_name(),
	})
}

pub type ConstructFn = Arc<dyn Fn(&Arguments) -> DiResult<BoxedInstance> + Send + Sync>;
pub type AssignFn =
	Arc<dyn Fn(&mut BoxedInstance, &Contract, Value) -> DiResult<()> + Send + Sync>;
pub type InvokeFn =
	Arc<dyn Fn(&mut BoxedInstance, &Arguments) -> DiResult<()> + Send + Sync>;
pub type FreezeFn = fn(BoxedInstance, &Contract) -> DiResult<Value>;

/// Typed construction recipe for `T`.
pub struct Recipe<T> {
	key: TypeKey,
	constructor: Option<(Vec<Import>, ConstructFn)>,
	fields: Vec<(Import, AssignFn)>,
	properties: Vec<(Import, AssignFn)>,
	methods: Vec<(Arc<str>, Vec<Import>, InvokeFn)>,
	_marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Default for Recipe<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Send + Sync + 'static> Recipe<T> {
	pub fn new() -> Self {
		Self::with_key(TypeKey::of::<T>())
	}

	/// A recipe whose type key carries generic or abstract information.
	pub fn with_key(key: TypeKey) -> Self {
		Self {
			key,
			constructor: None,
			fields: Vec::new(),
			properties: Vec::new(),
			methods: Vec::new(),
			_marker: std::marker::PhantomData,
		}
	}

	pub fn constructor<F>(mut self, imports: impl IntoIterator<Item = Import>, construct: F) -> Self
	where
		F: Fn(&Arguments) -> DiResult<T> + Send + Sync + 'static,
	{
		let construct: ConstructFn = Arc::new(move |args: &Arguments| {
			construct(args).map(|value| Box::new(value) as BoxedInstance)
		});
		self.constructor = Some((imports.into_iter().collect(), construct));
		self
	}

	/// A field assigned after construction.
	pub fn field<D, F>(mut self, import: Import, assign: F) -> Self
	where
		D: ?Sized + Send + Sync + 'static,
		F: Fn(&mut T, Arc<D>) + Send + Sync + 'static,
	{
		self.fields.push((import, assigner::<T, D, F>(assign)));
		self
	}

	/// A property set after fields.
	pub fn property<D, F>(mut self, import: Import, assign: F) -> Self
	where
		D: ?Sized + Send + Sync + 'static,
		F: Fn(&mut T, Arc<D>) + Send + Sync + 'static,
	{
		self.properties.push((import, assigner::<T, D, F>(assign)));
		self
	}

	/// A method invoked after properties, in declaration order.
	pub fn method<F>(
		mut self,
		name: impl Into<Arc<str>>,
		imports: impl IntoIterator<Item = Import>,
		invoke: F,
	) -> Self
	where
		F: Fn(&mut T, &Arguments) -> DiResult<()> + Send + Sync + 'static,
	{
		let key = self.key.clone();
		let invoke: InvokeFn = Arc::new(move |instance: &mut BoxedInstance, args: &Arguments| {
			let target = instance
				.downcast_mut::<T>()
				.ok_or_else(|| instance_mismatch::<T>(&key))?;
			invoke(target, args)
		});
		self.methods
			.push((name.into(), imports.into_iter().collect(), invoke));
		self
	}

	/// Erases the recipe for storage in a catalog.
	pub fn erase(self) -> TypeRecipe {
		let key = self.key;
		let constructor = self.constructor.map(|(imports, construct)| ConstructorInfo {
			sites: sites(imports, MemberKind::Parameter, &key, None),
			construct,
		});
		let members = |list: Vec<(Import, AssignFn)>, kind: MemberKind| -> Vec<MemberInfo> {
			list.into_iter()
				.enumerate()
				.map(|(position, (import, assign))| MemberInfo {
					site: import.into_site(kind, &key, None, position),
					assign,
				})
				.collect()
		};
		let fields = members(self.fields, MemberKind::Field);
		let properties = members(self.properties, MemberKind::Property);
		let methods = self
			.methods
			.into_iter()
			.map(|(name, imports, invoke)| MethodInfo {
				sites: sites(imports, MemberKind::Parameter, &key, Some(name.clone())),
				name,
				invoke,
			})
			.collect();
		TypeRecipe {
			key,
			constructor,
			fields,
			properties,
			methods,
			freeze: freeze::<T>,
		}
	}
}

fn assigner<T, D, F>(assign: F) -> AssignFn
where
	T: Send + Sync + 'static,
	D: ?Sized + Send + Sync + 'static,
	F: Fn(&mut T, Arc<D>) + Send + Sync + 'static,
{
	Arc::new(move |instance: &mut BoxedInstance, contract: &Contract, value: Value| {
		let dependency = downcast::<D>(contract, &value)?;
		let target = instance
			.downcast_mut::<T>()
			.ok_or_else(|| instance_mismatch::<T>(&TypeKey::of::<T>()))?;
		assign(target, dependency);
		Ok(())
	})
}

fn sites(
	imports: Vec<Import>,
	kind: MemberKind,
	declaring: &TypeKey,
	method: Option<Arc<str>>,
) -> Vec<ImportSite> {
	imports
		.into_iter()
		.enumerate()
		.map(|(position, import)| import.into_site(kind, declaring, method.clone(), position))
		.collect()
}

fn instance_mismatch<T: 'static>(key: &TypeKey) -> DiError {
	DiError::TypeMismatch {
		contract: Contract::new(key.clone(), None),
		expected: type_name::<T>(),
		found: "foreign instance",
	}
}

fn freeze<T: Send + Sync + 'static>(instance: BoxedInstance, contract: &Contract) -> DiResult<Value> {
	instance
		.downcast::<T>()
		.map(|value| Value::new(Arc::new(*value)))
		.map_err(|_| DiError::TypeMismatch {
			contract: contract.clone(),
			expected: type_name::<T>(),
			found: "foreign instance",
		})
}

pub(crate) struct ConstructorInfo {
	pub(crate) sites: Vec<ImportSite>,
	pub(crate) construct: ConstructFn,
}

pub(crate) struct MemberInfo {
	pub(crate) site: ImportSite,
	pub(crate) assign: AssignFn,
}

pub(crate) struct MethodInfo {
	pub(crate) name: Arc<str>,
	pub(crate) sites: Vec<ImportSite>,
	pub(crate) invoke: InvokeFn,
}

/// A type-erased recipe.
pub struct TypeRecipe {
	pub(crate) key: TypeKey,
	pub(crate) constructor: Option<ConstructorInfo>,
	pub(crate) fields: Vec<MemberInfo>,
	pub(crate) properties: Vec<MemberInfo>,
	pub(crate) methods: Vec<MethodInfo>,
	pub(crate) freeze: FreezeFn,
}

impl TypeRecipe {
	pub fn key(&self) -> &TypeKey {
		&self.key
	}

	/// Whether the recipe declares a constructor.
	pub fn is_constructible(&self) -> bool {
		self.constructor.is_some()
	}

	pub fn constructor_sites(&self) -> &[ImportSite] {
		self.constructor
			.as_ref()
			.map(|info| info.sites.as_slice())
			.unwrap_or_default()
	}

	pub fn field_names(&self) -> impl Iterator<Item = &str> {
		self.fields.iter().map(|info| &*info.site.member)
	}

	pub fn property_names(&self) -> impl Iterator<Item = &str> {
		self.properties.iter().map(|info| &*info.site.member)
	}

	pub fn method_names(&self) -> impl Iterator<Item = &str> {
		self.methods.iter().map(|info| &*info.name)
	}
}

impl fmt::Debug for TypeRecipe {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TypeRecipe")
			.field("key", &self.key)
			.field("constructor", &self.constructor_sites().len())
			.field("fields", &self.fields.len())
			.field("properties", &self.properties.len())
			.field("methods", &self.methods.len())
			.finish()
	}
}

/// Produces a recipe for a closed generic key, or `None` if the arguments are unsupported.
pub type RecipeBinder = Arc<dyn Fn(&TypeKey) -> Option<TypeRecipe> + Send + Sync>;

/// Recipes known to one container hierarchy.
#[derive(Default)]
pub struct TypeCatalog {
	recipes: RwLock<HashMap<TypeId, Arc<TypeRecipe>>>,
	generics: RwLock<HashMap<GenericKey, RecipeBinder>>,
	keys: RwLock<HashMap<TypeId, TypeKey>>,
}

impl TypeCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds the recipe declared by `T`.
	pub fn describe<T: Injectable>(&self) {
		self.insert(T::recipe());
	}

	pub fn insert<T: Send + Sync + 'static>(&self, recipe: Recipe<T>) {
		let recipe = recipe.erase();
		self.declare(recipe.key.clone());
		tracing::debug!(key = %recipe.key, "Recipe added to catalog");
		self.recipes.write().insert(recipe.key.id(), Arc::new(recipe));
	}

	/// Recipes for every closed form of an open generic definition.
	pub fn describe_generic<F>(&self, definition: GenericKey, binder: F)
	where
		F: Fn(&TypeKey) -> Option<TypeRecipe> + Send + Sync + 'static,
	{
		self.generics.write().insert(definition, Arc::new(binder));
	}

	/// Records the full key of a type so typed lookups recover its kind.
	pub fn declare(&self, key: TypeKey) {
		if !matches!(key.kind(), crate::contract::TypeKind::Concrete) {
			self.keys.write().insert(key.id(), key);
		}
	}

	/// The declared key for `key`'s type, or `key` itself.
	///
	/// Array and enumerable keys that were not declared get their element key
	/// recovered instead.
	pub fn canonical(&self, key: TypeKey) -> TypeKey {
		let declared = self.keys.read().get(&key.id()).cloned();
		if let Some(declared) = declared {
			return declared;
		}
		match key.element() {
			Some(element) => key.with_element(self.canonical(element.clone())),
			None => key,
		}
	}

	pub fn get(&self, key: &TypeKey) -> Option<Arc<TypeRecipe>> {
		if let Some(recipe) = self.recipes.read().get(&key.id()) {
			return Some(recipe.clone());
		}
		let binder = self.generics.read().get(key.generic_definition()?).cloned()?;
		let recipe = Arc::new(binder(key)?);
		tracing::debug!(key = %key, "Closed generic recipe created");
		Some(
			self.recipes
				.write()
				.entry(key.id())
				.or_insert(recipe)
				.clone(),
		)
	}

	pub fn contains(&self, key: &TypeKey) -> bool {
		self.recipes.read().contains_key(&key.id())
	}
}

impl fmt::Debug for TypeCatalog {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TypeCatalog")
			.field("recipes", &self.recipes.read().len())
			.field("generics", &self.generics.read().len())
			.finish()
	}
}
