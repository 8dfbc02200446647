//! Resolution of contracts nobody registered

use crate::contract::Contract;
use crate::error::{DiError, DiResult};
use crate::injection::InjectionMembers;
use crate::recipe::TypeCatalog;
use crate::registration::{Registration, RegistrationData, TypeMapping};
use crate::settings::ContainerSettings;
use std::fmt;

/// Produces the registration used for a contract with no registration anywhere in
/// the hierarchy.
///
/// Installed in the container's [`Policies`](crate::policy::Policies). The result is
/// cached per hierarchy, so `describe` runs once per contract unless it fails.
pub trait UnregisteredResolver: Send + Sync + fmt::Debug {
	fn describe(
		&self,
		catalog: &TypeCatalog,
		settings: &ContainerSettings,
		contract: &Contract,
	) -> DiResult<Registration>;
}

/// Builds unregistered types from their catalog recipe, with the configured default
/// lifetime.
#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogResolver;

impl UnregisteredResolver for CatalogResolver {
	fn describe(
		&self,
		catalog: &TypeCatalog,
		settings: &ContainerSettings,
		contract: &Contract,
	) -> DiResult<Registration> {
		let key = catalog.canonical(contract.key().clone());
		if key.is_abstract() {
			return Err(DiError::not_constructible(
				contract,
				"abstract type has no registration",
			));
		}
		let recipe = catalog.get(&key).ok_or_else(|| {
			DiError::not_constructible(contract, "no registration and no recipe in the type catalog")
		})?;
		if !recipe.is_constructible() {
			return Err(DiError::not_constructible(
				contract,
				"recipe declares no constructor",
			));
		}
		Ok(Registration::new(
			contract.clone(),
			RegistrationData::Type(TypeMapping::identity(key)),
			settings.default_lifetime.manager(),
			InjectionMembers::new(),
		))
	}
}
