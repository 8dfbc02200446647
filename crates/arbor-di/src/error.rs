//! Error types for dependency resolution

use crate::contract::Contract;
use std::fmt::Write as _;
use std::sync::Arc;

pub type DiResult<T> = Result<T, DiError>;

/// Resolution failure.
///
/// Errors are carried up the resolution chain as values so that callers (optional
/// imports, collection resolution) can decide to skip, substitute a default, or
/// propagate.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiError {
	/// The contract has no registration and cannot be built from the type catalog.
	#[error("{contract} is not constructible: {reason}")]
	NotConstructible { contract: Contract, reason: String },

	#[error(
		"Circular dependency detected: {contract}\n  Path: {path}\nThis forms a cycle that cannot be resolved."
	)]
	CircularDependency { contract: Contract, path: String },

	#[error("Maximum resolution depth exceeded: {0}")]
	MaxDepthExceeded(usize),

	/// A type could not be loaded or closed. Collection resolution skips these.
	#[error("Unable to load {contract}: {reason}")]
	TypeLoad { contract: Contract, reason: String },

	/// A pipeline step failed explicitly.
	#[error("Resolution of {contract} faulted: {message}")]
	Fault { contract: Contract, message: String },

	/// A user factory or construction closure returned an error.
	#[error("Factory for {contract} failed: {source}")]
	Factory {
		contract: Contract,
		source: Arc<dyn std::error::Error + Send + Sync>,
	},

	#[error("Type mismatch for {contract}: expected {expected}, found {found}")]
	TypeMismatch {
		contract: Contract,
		expected: &'static str,
		found: &'static str,
	},

	/// Terminal failure reported by the top-level resolve call.
	#[error("Resolution of {contract} failed: {source}\n  Chain: {}", format_chain(.chain))]
	ResolutionFailed {
		contract: Contract,
		chain: Vec<Contract>,
		source: Box<DiError>,
	},
}

impl DiError {
	pub fn fault(contract: &Contract, message: impl Into<String>) -> Self {
		Self::Fault {
			contract: contract.clone(),
			message: message.into(),
		}
	}

	pub fn not_constructible(contract: &Contract, reason: impl Into<String>) -> Self {
		Self::NotConstructible {
			contract: contract.clone(),
			reason: reason.into(),
		}
	}

	pub fn factory<E>(contract: &Contract, error: E) -> Self
	where
		E: std::error::Error + Send + Sync + 'static,
	{
		Self::Factory {
			contract: contract.clone(),
			source: Arc::new(error),
		}
	}

	/// Whether this error, or the error it wraps, is a circular dependency.
	pub fn is_circular(&self) -> bool {
		match self {
			Self::CircularDependency { .. } => true,
			Self::ResolutionFailed { source, .. } => source.is_circular(),
			_ => false,
		}
	}

	/// Whether collection resolution may skip an element failing with this error.
	pub fn is_skippable(&self) -> bool {
		match self {
			Self::TypeLoad { .. } => true,
			Self::ResolutionFailed { source, .. } => source.is_skippable(),
			_ => false,
		}
	}

	/// The innermost error, unwrapping `ResolutionFailed`.
	pub fn root_cause(&self) -> &DiError {
		match self {
			Self::ResolutionFailed { source, .. } => source.root_cause(),
			other => other,
		}
	}
}

fn format_chain(chain: &[Contract]) -> String {
	let mut out = String::new();
	for (i, contract) in chain.iter().enumerate() {
		if i > 0 {
			out.push_str(" -> ");
		}
		let _ = write!(out, "{contract}");
	}
	out
}

/// Errors raised while loading [`ContainerSettings`](crate::settings::ContainerSettings).
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("Invalid value for {key}: {value}")]
	InvalidValue { key: String, value: String },
}
