//! Type identity and resolution keys
//!
//! A [`Contract`] is the key every lookup in the container uses: the identity of a
//! declared type ([`TypeKey`]) paired with an optional registration name. Two
//! contracts with the same type and different names are unrelated entries.
//!
//! Rust has no runtime reflection over generic definitions, so a [`TypeKey`] carries
//! an explicit [`TypeKind`] describing how the type was declared: a plain concrete
//! type, an abstract service (usually a trait object), a closed generic over a
//! registered [`GenericKey`], or an array/enumerable collection of some element type.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Identity of an open generic definition such as `Repository<_>`.
///
/// Rust cannot name an unapplied generic type, so the definition is identified by a
/// marker type chosen by the caller.
#[derive(Clone)]
pub struct GenericKey {
	id: TypeId,
	name: &'static str,
}

impl GenericKey {
	/// Creates a generic definition key identified by the marker type `M`.
	pub fn of<M: ?Sized + 'static>(name: &'static str) -> Self {
		Self {
			id: TypeId::of::<M>(),
			name,
		}
	}

	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl PartialEq for GenericKey {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for GenericKey {}

impl Hash for GenericKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Debug for GenericKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}<>", self.name)
	}
}

/// How a type was declared.
#[derive(Clone, Debug)]
pub enum TypeKind {
	/// A concrete type that may be default-constructible through the type catalog.
	Concrete,
	/// A service type that is never constructed directly (trait objects, markers).
	Abstract,
	/// A closed generic type built from a registered definition.
	Generic {
		definition: GenericKey,
		arguments: Arc<[TypeKey]>,
	},
	/// Every registration of `element`, resolved eagerly.
	Array { element: Arc<TypeKey> },
	/// Every registration of `element`, falling back to the bare element when none exist.
	Enumerable { element: Arc<TypeKey> },
}

/// Runtime identity of a declared type.
///
/// Equality and hashing use the [`TypeId`] only; the name and kind are descriptive.
#[derive(Clone)]
pub struct TypeKey {
	id: TypeId,
	name: &'static str,
	kind: TypeKind,
}

struct EnumerableOf<T: ?Sized>(PhantomData<T>);

impl TypeKey {
	/// Key for a concrete type.
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: type_name::<T>(),
			kind: TypeKind::Concrete,
		}
	}

	/// Key for a service type that must be mapped or registered before it resolves.
	pub fn abstract_of<T: ?Sized + 'static>() -> Self {
		Self {
			kind: TypeKind::Abstract,
			..Self::of::<T>()
		}
	}

	/// Key for the closed generic `T`, an application of `definition` to `arguments`.
	pub fn generic<T: ?Sized + 'static>(
		definition: GenericKey,
		arguments: impl IntoIterator<Item = TypeKey>,
	) -> Self {
		Self {
			kind: TypeKind::Generic {
				definition,
				arguments: arguments.into_iter().collect(),
			},
			..Self::of::<T>()
		}
	}

	/// Key for the array of every `T` registration.
	pub fn array<T: ?Sized + 'static>() -> Self {
		Self::array_of::<T>(Self::of::<T>())
	}

	/// Array key over an explicit element key (used for generic or abstract elements).
	pub fn array_of<T: ?Sized + 'static>(element: TypeKey) -> Self {
		Self {
			id: TypeId::of::<Vec<Arc<T>>>(),
			name: type_name::<Vec<Arc<T>>>(),
			kind: TypeKind::Array {
				element: Arc::new(element),
			},
		}
	}

	/// Key for the enumerable sequence of `T` registrations.
	pub fn enumerable<T: ?Sized + 'static>() -> Self {
		Self::enumerable_of::<T>(Self::of::<T>())
	}

	pub fn enumerable_of<T: ?Sized + 'static>(element: TypeKey) -> Self {
		Self {
			id: TypeId::of::<EnumerableOf<T>>(),
			name: type_name::<EnumerableOf<T>>(),
			kind: TypeKind::Enumerable {
				element: Arc::new(element),
			},
		}
	}

	pub fn id(&self) -> TypeId {
		self.id
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn kind(&self) -> &TypeKind {
		&self.kind
	}

	/// Element key of an array or enumerable key.
	pub fn element(&self) -> Option<&TypeKey> {
		match &self.kind {
			TypeKind::Array { element } | TypeKind::Enumerable { element } => Some(element),
			_ => None,
		}
	}

	/// The same sequence key over a different element key.
	pub(crate) fn with_element(&self, element: TypeKey) -> Self {
		let kind = match &self.kind {
			TypeKind::Array { .. } => TypeKind::Array {
				element: Arc::new(element),
			},
			TypeKind::Enumerable { .. } => TypeKind::Enumerable {
				element: Arc::new(element),
			},
			kind => kind.clone(),
		};
		Self {
			kind,
			..self.clone()
		}
	}

	pub fn generic_definition(&self) -> Option<&GenericKey> {
		match &self.kind {
			TypeKind::Generic { definition, .. } => Some(definition),
			_ => None,
		}
	}

	/// Closed generic arguments, empty for non-generic keys.
	pub fn arguments(&self) -> &[TypeKey] {
		match &self.kind {
			TypeKind::Generic { arguments, .. } => arguments,
			_ => &[],
		}
	}

	pub fn is_generic(&self) -> bool {
		matches!(self.kind, TypeKind::Generic { .. })
	}

	pub fn is_array(&self) -> bool {
		matches!(self.kind, TypeKind::Array { .. })
	}

	pub fn is_enumerable(&self) -> bool {
		matches!(self.kind, TypeKind::Enumerable { .. })
	}

	pub fn is_abstract(&self) -> bool {
		matches!(self.kind, TypeKind::Abstract)
	}

	/// Short display name without module paths.
	pub fn short_name(&self) -> &'static str {
		short_type_name(self.name)
	}
}

impl PartialEq for TypeKey {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Debug for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TypeKey")
			.field("name", &self.name)
			.field("kind", &self.kind)
			.finish()
	}
}

impl fmt::Display for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.short_name())
	}
}

fn short_type_name(full: &'static str) -> &'static str {
	// Only strip the path of the outermost type; generic arguments keep theirs.
	let head = full.split('<').next().unwrap_or(full);
	match head.rfind("::") {
		Some(pos) => &full[pos + 2..],
		None => full,
	}
}

/// Resolution key: a type identity plus an optional registration name.
///
/// The hash is computed once at construction since contracts are hashed on every
/// scope lookup.
#[derive(Clone)]
pub struct Contract {
	key: TypeKey,
	name: Option<Arc<str>>,
	hash: u64,
}

impl Contract {
	pub fn new(key: TypeKey, name: Option<Arc<str>>) -> Self {
		let mut hasher = DefaultHasher::new();
		key.hash(&mut hasher);
		name.hash(&mut hasher);
		Self {
			key,
			name,
			hash: hasher.finish(),
		}
	}

	/// Unnamed contract for `T`.
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self::new(TypeKey::of::<T>(), None)
	}

	/// Named contract for `T`.
	pub fn named<T: ?Sized + 'static>(name: impl Into<Arc<str>>) -> Self {
		Self::new(TypeKey::of::<T>(), Some(name.into()))
	}

	/// Same name, different type.
	pub fn with_key(&self, key: TypeKey) -> Self {
		Self::new(key, self.name.clone())
	}

	/// Same type, different name.
	pub fn with_name(&self, name: Option<Arc<str>>) -> Self {
		Self::new(self.key.clone(), name)
	}

	pub fn key(&self) -> &TypeKey {
		&self.key
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	pub(crate) fn name_arc(&self) -> Option<&Arc<str>> {
		self.name.as_ref()
	}

	/// Contract of the open generic definition this closed generic contract belongs to.
	pub fn generic_definition(&self) -> Option<GenericContract> {
		self.key
			.generic_definition()
			.map(|definition| GenericContract::new(definition.clone(), self.name.clone()))
	}
}

impl PartialEq for Contract {
	fn eq(&self, other: &Self) -> bool {
		self.hash == other.hash && self.key == other.key && self.name == other.name
	}
}

impl Eq for Contract {}

impl Hash for Contract {
	fn hash<H: Hasher>(&self, state: &mut H) {
		state.write_u64(self.hash);
	}
}

impl fmt::Debug for Contract {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Contract({self})")
	}
}

impl fmt::Display for Contract {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.name {
			Some(name) => write!(f, "{}(\"{}\")", self.key, name),
			None => write!(f, "{}", self.key),
		}
	}
}

/// Key for an open generic binding: definition plus optional registration name.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct GenericContract {
	definition: GenericKey,
	name: Option<Arc<str>>,
}

impl GenericContract {
	pub fn new(definition: GenericKey, name: Option<Arc<str>>) -> Self {
		Self { definition, name }
	}

	pub fn definition(&self) -> &GenericKey {
		&self.definition
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}
}

impl fmt::Debug for GenericContract {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.name {
			Some(name) => write!(f, "{:?}(\"{}\")", self.definition, name),
			None => write!(f, "{:?}", self.definition),
		}
	}
}
