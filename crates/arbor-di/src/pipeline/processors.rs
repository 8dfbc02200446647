//! Build processors
//!
//! Each processor contributes one kind of step to a [`BuildPlan`], combining what the
//! type's recipe declares with the injection members of the registration being built.

use crate::contract::Contract;
use crate::error::{DiError, DiResult};
use crate::import::{DescribeImport, ImportDescription};
use crate::injection::{InjectionMembers, InjectionValue};
use crate::recipe::{AssignFn, ConstructFn, FreezeFn, ImportSite, InvokeFn, TypeRecipe};
use std::fmt;
use std::sync::Arc;

/// One dependency the plan resolves.
#[derive(Clone, Debug)]
pub struct ImportStep {
	pub site: ImportSite,
	pub description: ImportDescription,
}

#[derive(Clone)]
pub struct ConstructStep {
	pub imports: Vec<ImportStep>,
	pub construct: ConstructFn,
}

/// A step applied to an instance after construction.
#[derive(Clone)]
pub enum MemberStep {
	Assign {
		import: ImportStep,
		assign: AssignFn,
	},
	Invoke {
		name: Arc<str>,
		imports: Vec<ImportStep>,
		invoke: InvokeFn,
	},
}

/// Ordered steps that build one type.
#[derive(Clone)]
pub struct BuildPlan {
	/// Contract of the type being built.
	pub contract: Contract,
	pub construct: Option<ConstructStep>,
	pub members: Vec<MemberStep>,
	pub freeze: FreezeFn,
}

impl BuildPlan {
	pub(crate) fn new(contract: Contract, recipe: &TypeRecipe) -> Self {
		Self {
			contract,
			construct: None,
			members: Vec::new(),
			freeze: recipe.freeze,
		}
	}
}

impl fmt::Debug for BuildPlan {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BuildPlan")
			.field("contract", &self.contract)
			.field(
				"construct",
				&self.construct.as_ref().map(|step| step.imports.len()),
			)
			.field("members", &self.members.len())
			.finish()
	}
}

/// Contributes steps to a build plan during one stage.
pub trait BuildProcessor: Send + Sync + fmt::Debug {
	fn process(
		&self,
		recipe: &TypeRecipe,
		members: &InjectionMembers,
		describer: &dyn DescribeImport,
		plan: &mut BuildPlan,
	) -> DiResult<()>;
}

fn import_step(
	describer: &dyn DescribeImport,
	site: &ImportSite,
	explicit: Option<&InjectionValue>,
) -> ImportStep {
	let mut description = describer.describe_import(site);
	if let Some(value) = explicit {
		description.explicit = Some(value.clone());
	}
	ImportStep {
		site: site.clone(),
		description,
	}
}

fn arity_mismatch(plan: &BuildPlan, what: &str, expected: usize, found: usize) -> DiError {
	DiError::not_constructible(
		&plan.contract,
		format!("{what} takes {expected} arguments but {found} were supplied"),
	)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConstructorProcessor;

impl BuildProcessor for ConstructorProcessor {
	fn process(
		&self,
		recipe: &TypeRecipe,
		members: &InjectionMembers,
		describer: &dyn DescribeImport,
		plan: &mut BuildPlan,
	) -> DiResult<()> {
		let Some(constructor) = &recipe.constructor else {
			if members.constructor().is_some() {
				return Err(DiError::not_constructible(
					&plan.contract,
					"constructor injection on a type without a constructor",
				));
			}
			return Ok(());
		};

		let explicit = members.constructor();
		if let Some(values) = explicit
			&& values.len() != constructor.sites.len()
		{
			return Err(arity_mismatch(
				plan,
				"constructor",
				constructor.sites.len(),
				values.len(),
			));
		}

		let imports = constructor
			.sites
			.iter()
			.enumerate()
			.map(|(i, site)| import_step(describer, site, explicit.map(|values| &values[i])))
			.collect();
		plan.construct = Some(ConstructStep {
			imports,
			construct: constructor.construct.clone(),
		});
		Ok(())
	}
}

fn process_assignments(
	infos: &[crate::recipe::MemberInfo],
	overrides: &[(Arc<str>, InjectionValue)],
	what: &str,
	describer: &dyn DescribeImport,
	plan: &mut BuildPlan,
) -> DiResult<()> {
	if let Some((unknown, _)) = overrides
		.iter()
		.find(|(name, _)| !infos.iter().any(|info| info.site.member == *name))
	{
		return Err(DiError::not_constructible(
			&plan.contract,
			format!("no injectable {what} named `{unknown}`"),
		));
	}

	for info in infos {
		let explicit = overrides
			.iter()
			.find(|(name, _)| *name == info.site.member)
			.map(|(_, value)| value);
		plan.members.push(MemberStep::Assign {
			import: import_step(describer, &info.site, explicit),
			assign: info.assign.clone(),
		});
	}
	Ok(())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FieldProcessor;

impl BuildProcessor for FieldProcessor {
	fn process(
		&self,
		recipe: &TypeRecipe,
		members: &InjectionMembers,
		describer: &dyn DescribeImport,
		plan: &mut BuildPlan,
	) -> DiResult<()> {
		process_assignments(&recipe.fields, members.fields(), "field", describer, plan)
	}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PropertyProcessor;

impl BuildProcessor for PropertyProcessor {
	fn process(
		&self,
		recipe: &TypeRecipe,
		members: &InjectionMembers,
		describer: &dyn DescribeImport,
		plan: &mut BuildPlan,
	) -> DiResult<()> {
		process_assignments(
			&recipe.properties,
			members.properties(),
			"property",
			describer,
			plan,
		)
	}
}

/// Invokes every declared method in order. A method member with arguments replaces
/// the declared imports of the method it names.
#[derive(Debug, Default, Clone, Copy)]
pub struct MethodProcessor;

impl BuildProcessor for MethodProcessor {
	fn process(
		&self,
		recipe: &TypeRecipe,
		members: &InjectionMembers,
		describer: &dyn DescribeImport,
		plan: &mut BuildPlan,
	) -> DiResult<()> {
		for (name, _) in members.methods() {
			if !recipe.methods.iter().any(|info| info.name == *name) {
				return Err(DiError::not_constructible(
					&plan.contract,
					format!("no injection method named `{name}`"),
				));
			}
		}

		for info in &recipe.methods {
			let explicit = members
				.methods()
				.iter()
				.rev()
				.find(|(name, arguments)| *name == info.name && !arguments.is_empty())
				.map(|(_, arguments)| arguments);
			if let Some(arguments) = explicit
				&& arguments.len() != info.sites.len()
			{
				return Err(arity_mismatch(
					plan,
					&format!("method `{}`", info.name),
					info.sites.len(),
					arguments.len(),
				));
			}
			let imports = info
				.sites
				.iter()
				.enumerate()
				.map(|(i, site)| import_step(describer, site, explicit.map(|values| &values[i])))
				.collect();
			plan.members.push(MemberStep::Invoke {
				name: info.name.clone(),
				imports,
				invoke: info.invoke.clone(),
			});
		}
		Ok(())
	}
}
