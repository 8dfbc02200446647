//! Circular dependency detection
//!
//! Resolution contexts are linked to their parents, so the chain of contracts being
//! resolved is always available on the stack. Before a contract is resolved its
//! ancestors are searched; finding the same contract means the graph loops back
//! onto itself.
//!
//! ## Features
//!
//! - **Deterministic**: every step checks the full ancestor chain
//! - **Depth Limiting**: a configurable maximum depth (default
//!   [`DEFAULT_MAX_RESOLUTION_DEPTH`](crate::settings::DEFAULT_MAX_RESOLUTION_DEPTH))
//!   stops pathological chains before the stack does
//! - **No shared state**: detection needs no thread-local or global bookkeeping, so
//!   concurrent resolutions on different threads never interfere

use crate::contract::Contract;
use crate::error::{DiError, DiResult};

/// Rejects `contract` if it already appears among `ancestors` or if `depth` exceeds
/// `max_depth`.
///
/// `ancestors` yields the contracts being resolved, nearest first.
pub(crate) fn begin_resolution<'c>(
	contract: &Contract,
	ancestors: impl Iterator<Item = &'c Contract>,
	depth: usize,
	max_depth: usize,
) -> DiResult<()> {
	if depth > max_depth {
		return Err(DiError::MaxDepthExceeded(depth));
	}

	let mut path: Vec<&Contract> = Vec::new();
	for ancestor in ancestors {
		path.push(ancestor);
		if ancestor == contract {
			return Err(DiError::CircularDependency {
				contract: contract.clone(),
				path: build_cycle_path(&path, contract),
			});
		}
	}
	Ok(())
}

/// Formats `A -> B -> A` from a nearest-first path ending at the repeated contract.
fn build_cycle_path(path: &[&Contract], current: &Contract) -> String {
	let mut names: Vec<String> = path.iter().rev().map(|c| c.to_string()).collect();
	names.push(current.to_string());
	names.join(" -> ")
}
