//! Type-erased resolved values

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

/// A partially built instance owned by a pipeline before it is frozen into a [`Value`].
pub type BoxedInstance = Box<dyn Any + Send + Sync>;

/// A resolved, shareable value.
///
/// Holds an `Arc<T>` behind `dyn Any`, so `T` may be unsized (`dyn Trait`). Cloning a
/// `Value` shares the same instance.
#[derive(Clone)]
pub struct Value {
	inner: Arc<dyn Any + Send + Sync>,
	type_name: &'static str,
}

impl Value {
	pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
		Self {
			inner: Arc::new(value),
			type_name: type_name::<T>(),
		}
	}

	/// Wraps an owned value.
	pub fn from_value<T: Send + Sync + 'static>(value: T) -> Self {
		Self::new(Arc::new(value))
	}

	/// Returns the shared instance if this value holds a `T`.
	pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
		self.inner.downcast_ref::<Arc<T>>().cloned()
	}

	pub fn is<T: ?Sized + Send + Sync + 'static>(&self) -> bool {
		self.inner.is::<Arc<T>>()
	}

	/// Whether both values share one stored instance.
	pub fn ptr_eq(&self, other: &Value) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	pub fn type_name(&self) -> &'static str {
		self.type_name
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Value<{}>", self.type_name)
	}
}

/// The value produced for array and enumerable contracts.
#[derive(Clone, Debug, Default)]
pub struct Collection(pub Vec<Value>);

impl Collection {
	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Value> {
		self.0.iter()
	}

	/// Downcasts every element, returning `None` if any element holds another type.
	pub fn typed<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Vec<Arc<T>>> {
		self.0.iter().map(Value::downcast::<T>).collect()
	}
}
