//! Array and enumerable resolution
//!
//! Resolving `array::<T>` or `enumerable::<T>` produces every registration of `T`
//! visible from the requesting container. Which registrations exist is computed once
//! into [`CollectionMetadata`] and reused until any scope in the hierarchy changes.
//!
//! Order: the requesting container first, then each ancestor. Within one container
//! the most recent registration comes first and open generic bindings follow exact
//! registrations. A name registered in a child hides the same name in its parents.

use crate::container::ContainerInner;
use crate::context::ResolutionContext;
use crate::contract::{Contract, TypeKey};
use crate::error::{DiError, DiResult};
use crate::lifetime::ContainerId;
use crate::value::{Collection, Value};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Where one collection element is registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionEntry {
	pub container: ContainerId,
	/// Position within that container's scope.
	pub position: usize,
	pub contract: Contract,
}

/// A version-stamped snapshot of the entries a collection resolves.
#[derive(Debug)]
pub struct CollectionMetadata {
	version: u64,
	entries: Vec<CollectionEntry>,
}

impl CollectionMetadata {
	fn collect(container: &Arc<ContainerInner>, element: &TypeKey, version: u64) -> Self {
		let mut seen = HashSet::new();
		let mut entries = Vec::new();
		for level in container.ancestry() {
			for entry in level.scope().entries_for(element) {
				if seen.insert(entry.contract.clone()) {
					entries.push(CollectionEntry {
						container: level.id(),
						position: entry.position,
						contract: entry.contract,
					});
				}
			}
		}
		Self { version, entries }
	}

	pub fn version(&self) -> u64 {
		self.version
	}

	pub fn entries(&self) -> &[CollectionEntry] {
		&self.entries
	}
}

/// Backing data of a synthetic collection registration.
#[derive(Default)]
pub struct CollectionCache {
	metadata: RwLock<Option<Arc<CollectionMetadata>>>,
	rebuild: Mutex<()>,
	rebuilds: AtomicUsize,
}

impl CollectionCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// How many times metadata has been computed.
	pub fn rebuild_count(&self) -> usize {
		self.rebuilds.load(Ordering::Relaxed)
	}

	fn current(&self, version: u64) -> Option<Arc<CollectionMetadata>> {
		self.metadata
			.read()
			.as_ref()
			.filter(|metadata| metadata.version == version)
			.cloned()
	}

	/// Metadata for the current hierarchy version, rebuilt if stale.
	pub(crate) fn metadata(
		&self,
		container: &Arc<ContainerInner>,
		element: &TypeKey,
	) -> Arc<CollectionMetadata> {
		let version = container.hierarchy_version();
		if let Some(metadata) = self.current(version) {
			return metadata;
		}

		let _guard = self.rebuild.lock();
		if let Some(metadata) = self.current(version) {
			return metadata;
		}

		let metadata = Arc::new(CollectionMetadata::collect(container, element, version));
		tracing::debug!(
			element = %element,
			version,
			entries = metadata.entries.len(),
			"Collection metadata rebuilt"
		);
		*self.metadata.write() = Some(metadata.clone());
		self.rebuilds.fetch_add(1, Ordering::Relaxed);
		metadata
	}
}

impl fmt::Debug for CollectionCache {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CollectionCache")
			.field("rebuilds", &self.rebuild_count())
			.finish()
	}
}

/// Resolves the collection contract of `ctx`.
///
/// Elements failing with a skippable error are left out; any other failure aborts
/// the whole collection.
pub(crate) fn resolve_collection(
	ctx: &ResolutionContext<'_>,
	cache: &CollectionCache,
) -> DiResult<Value> {
	let key = ctx.contract().key();
	let element = key
		.element()
		.ok_or_else(|| DiError::fault(ctx.contract(), "not a collection contract"))?;
	let metadata = cache.metadata(ctx.inner(), element);

	let mut values = Vec::with_capacity(metadata.entries.len());
	for entry in &metadata.entries {
		match ctx.resolve(&entry.contract) {
			Ok(value) => values.push(value),
			Err(error) if error.is_skippable() => {
				tracing::warn!(
					element = %entry.contract,
					error = %error,
					"Collection element skipped"
				);
				ctx.clear_faults();
			}
			Err(error) => return Err(error),
		}
	}

	if metadata.entries.is_empty()
		&& key.is_enumerable()
		&& ctx.inner().settings().enumerable_fallback
	{
		match ctx.resolve(&Contract::new(element.clone(), None)) {
			Ok(value) => values.push(value),
			Err(error) if error.is_circular() => return Err(error),
			Err(_) => ctx.clear_faults(),
		}
	}

	values.shrink_to_fit();
	Ok(Value::from_value(Collection(values)))
}
