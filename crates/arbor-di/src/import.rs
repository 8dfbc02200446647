//! Import description
//!
//! Turns a declared [`ImportSite`] into what the pipeline needs to satisfy it: the
//! contract to resolve, whether a failure may fall back to a default, and any value
//! injected in place of resolution.

use crate::contract::Contract;
use crate::injection::InjectionValue;
use crate::recipe::ImportSite;
use crate::value::Value;
use std::fmt;

#[derive(Clone, Debug)]
pub struct ImportDescription {
	pub contract: Contract,
	pub allow_default: bool,
	pub default_value: Option<Value>,
	/// Used instead of resolving `contract` when present.
	pub explicit: Option<InjectionValue>,
}

/// Describes how a dependency site is satisfied.
///
/// Installed in the container's [`Policies`](crate::Policies); replacing it changes
/// how newly compiled pipelines interpret import annotations.
pub trait DescribeImport: Send + Sync + fmt::Debug {
	fn describe_import(&self, site: &ImportSite) -> ImportDescription;
}

/// Reads the annotations recorded on the import.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultImportProvider;

impl DescribeImport for DefaultImportProvider {
	fn describe_import(&self, site: &ImportSite) -> ImportDescription {
		let annotation = &site.annotation;
		ImportDescription {
			contract: Contract::new(site.member_type.clone(), annotation.name.clone()),
			allow_default: annotation.optional,
			default_value: annotation.default_value.clone(),
			explicit: annotation.explicit.clone(),
		}
	}
}
