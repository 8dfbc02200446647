//! Step compilation

use super::processors::{BuildPlan, ImportStep, MemberStep};
use super::{BuildUpDelegate, ResolveDelegate};
use crate::context::ResolutionContext;
use crate::error::{DiError, DiResult};
use crate::recipe::Arguments;
use crate::value::{BoxedInstance, Value};
use std::fmt;
use std::sync::Arc;

/// The callables produced from a build plan.
pub struct CompiledPlan {
	pub resolve: ResolveDelegate,
	pub build_up: BuildUpDelegate,
}

/// Turns a build plan into callable procedures.
pub trait StepCompiler: Send + Sync + fmt::Debug {
	fn compile(&self, plan: BuildPlan) -> DiResult<CompiledPlan>;
}

/// Compiles plans into closures that walk the steps in order.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClosureCompiler;

impl StepCompiler for ClosureCompiler {
	fn compile(&self, plan: BuildPlan) -> DiResult<CompiledPlan> {
		let plan = Arc::new(plan);

		let resolve_plan = Arc::clone(&plan);
		let resolve: ResolveDelegate = Arc::new(move |ctx: &ResolutionContext<'_>| {
			let construct = resolve_plan.construct.as_ref().ok_or_else(|| {
				DiError::not_constructible(ctx.contract(), "no constructor declared")
			})?;
			let args = evaluate_all(ctx, &construct.imports)?;
			let mut instance = (construct.construct)(&args)?;
			apply_members(ctx, &resolve_plan.members, &mut instance)?;
			(resolve_plan.freeze)(instance, &resolve_plan.contract)
		});

		let build_up: BuildUpDelegate =
			Arc::new(move |ctx: &ResolutionContext<'_>, mut instance: BoxedInstance| {
				apply_members(ctx, &plan.members, &mut instance)?;
				(plan.freeze)(instance, &plan.contract)
			});

		Ok(CompiledPlan { resolve, build_up })
	}
}

/// Produces the value for one import.
///
/// Order: a matching override, then the explicit value, then normal resolution. An
/// import that allows a default absorbs any failure except a circular dependency.
fn evaluate(ctx: &ResolutionContext<'_>, step: &ImportStep) -> DiResult<Option<Value>> {
	let description = &step.description;
	let result = match ctx.get_override(&step.site, &description.contract) {
		Some(value) => value.evaluate(ctx),
		None => match &description.explicit {
			Some(value) => value.evaluate(ctx),
			None => ctx.resolve(&description.contract).map(Some),
		},
	};

	match result {
		Err(error) if description.allow_default && !error.is_circular() => {
			tracing::trace!(
				member = %step.site.member,
				contract = %description.contract,
				"Optional import fell back to default"
			);
			ctx.clear_faults();
			Ok(description.default_value.clone())
		}
		other => other,
	}
}

fn evaluate_all(ctx: &ResolutionContext<'_>, imports: &[ImportStep]) -> DiResult<Arguments> {
	let slots = imports
		.iter()
		.map(|step| Ok((step.description.contract.clone(), evaluate(ctx, step)?)))
		.collect::<DiResult<Vec<_>>>()?;
	Ok(Arguments::new(slots))
}

fn apply_members(
	ctx: &ResolutionContext<'_>,
	members: &[MemberStep],
	instance: &mut BoxedInstance,
) -> DiResult<()> {
	for member in members {
		match member {
			MemberStep::Assign { import, assign } => {
				if let Some(value) = evaluate(ctx, import)? {
					assign(instance, &import.description.contract, value)?;
				}
			}
			MemberStep::Invoke {
				name,
				imports,
				invoke,
			} => {
				tracing::trace!(method = %name, "Invoking injection method");
				let args = evaluate_all(ctx, imports)?;
				invoke(instance, &args)?;
			}
		}
	}
	Ok(())
}
