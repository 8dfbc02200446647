//! Container configuration
//!
//! Settings are plain data loaded once at startup and handed to
//! [`Container::with_settings`](crate::Container::with_settings). They can be read
//! from TOML and then adjusted from environment variables:
//!
//! ```toml
//! max_resolution_depth = 64
//! default_lifetime = "hierarchical"
//! enumerable_fallback = false
//! ```
//!
//! With the prefix `ARBOR`, the variables `ARBOR_MAX_RESOLUTION_DEPTH`,
//! `ARBOR_DEFAULT_LIFETIME` and `ARBOR_ENUMERABLE_FALLBACK` override the file.

use crate::error::SettingsError;
use crate::lifetime::Lifetime;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default limit on nested resolutions before a chain is rejected.
pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
	/// Nested resolutions allowed below one top-level call.
	pub max_resolution_depth: usize,
	/// Lifetime used by registrations that do not name one.
	pub default_lifetime: Lifetime,
	/// Whether an enumerable with no registrations falls back to the bare element.
	pub enumerable_fallback: bool,
}

impl Default for ContainerSettings {
	fn default() -> Self {
		Self {
			max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
			default_lifetime: Lifetime::Transient,
			enumerable_fallback: true,
		}
	}
}

impl ContainerSettings {
	pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
		Ok(toml::from_str(source)?)
	}

	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let content = std::fs::read_to_string(path)?;
		Self::from_toml_str(&content)
	}

	/// Applies `{prefix}_*` environment variables on top of these settings.
	pub fn with_env_overrides(self, prefix: &str) -> Result<Self, SettingsError> {
		self.apply_overrides(prefix, |key| std::env::var(key).ok())
	}

	fn apply_overrides(
		mut self,
		prefix: &str,
		lookup: impl Fn(&str) -> Option<String>,
	) -> Result<Self, SettingsError> {
		let key = format!("{prefix}_MAX_RESOLUTION_DEPTH");
		if let Some(value) = lookup(&key) {
			self.max_resolution_depth = value
				.trim()
				.parse()
				.map_err(|_| SettingsError::InvalidValue { key, value })?;
		}

		let key = format!("{prefix}_DEFAULT_LIFETIME");
		if let Some(value) = lookup(&key) {
			self.default_lifetime = parse_lifetime(&value)
				.ok_or(SettingsError::InvalidValue { key, value })?;
		}

		let key = format!("{prefix}_ENUMERABLE_FALLBACK");
		if let Some(value) = lookup(&key) {
			self.enumerable_fallback = match value.trim().to_ascii_lowercase().as_str() {
				"1" | "true" | "yes" | "on" => true,
				"0" | "false" | "no" | "off" => false,
				_ => return Err(SettingsError::InvalidValue { key, value }),
			};
		}

		Ok(self)
	}
}

fn parse_lifetime(value: &str) -> Option<Lifetime> {
	match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
		"transient" => Some(Lifetime::Transient),
		"singleton" => Some(Lifetime::Singleton),
		"hierarchical" => Some(Lifetime::Hierarchical),
		"per_resolve" => Some(Lifetime::PerResolve),
		_ => None,
	}
}
