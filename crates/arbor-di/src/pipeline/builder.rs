//! Pipeline construction

use super::compiler::{ClosureCompiler, StepCompiler};
use super::processors::BuildPlan;
use super::{Pipeline, StagedChain};
use crate::collection::resolve_collection;
use crate::container::Core;
use crate::context::ResolutionContext;
use crate::contract::{Contract, TypeKey};
use crate::error::{DiError, DiResult};
use crate::import::{DefaultImportProvider, DescribeImport};
use crate::injection::InjectionMembers;
use crate::registration::{CastFn, Registration, RegistrationData};
use crate::value::{BoxedInstance, Value};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Compiles the resolution pipeline of a registration.
///
/// The builder is invoked at most once per registration; the result is stored in the
/// registration's pipeline cell. Compilation failures are stored too, as a pipeline
/// that reports the failure on every call.
pub struct PipelineBuilder {
	chain: StagedChain,
	builds: AtomicUsize,
}

impl PipelineBuilder {
	pub fn new(chain: StagedChain) -> Self {
		Self {
			chain,
			builds: AtomicUsize::new(0),
		}
	}

	pub fn chain(&self) -> &StagedChain {
		&self.chain
	}

	/// Number of pipelines compiled so far.
	pub fn build_count(&self) -> usize {
		self.builds.load(Ordering::Relaxed)
	}

	pub(crate) fn build(&self, core: &Core, registration: &Registration) -> Pipeline {
		self.builds.fetch_add(1, Ordering::Relaxed);
		let contract = registration.contract();
		tracing::debug!(
			contract = %contract,
			category = ?registration.category(),
			"Compiling resolution pipeline"
		);
		if let RegistrationData::Clone(source) = registration.data()
			&& registration.inherits_pipeline()
		{
			return source.pipeline.get_or_init(|| self.build(core, source)).clone();
		}
		self.try_build(core, contract, registration.data(), registration.members())
			.unwrap_or_else(|error| {
				tracing::debug!(contract = %contract, error = %error, "Pipeline compilation failed");
				Pipeline::faulted(error)
			})
	}

	fn try_build(
		&self,
		core: &Core,
		contract: &Contract,
		data: &RegistrationData,
		members: &InjectionMembers,
	) -> DiResult<Pipeline> {
		match data {
			RegistrationData::Type(mapping) => {
				let target = core.catalog().canonical(mapping.target.clone());
				if !members.require_build() && target != *contract.key() {
					return Ok(redirect(contract, target, mapping.cast.clone()));
				}
				self.build_type(core, contract, &target, members, mapping.cast.clone())
			}
			RegistrationData::Factory(factory) => Ok(Pipeline::new(factory.clone())),
			RegistrationData::Instance(value) => {
				let value = value.clone();
				Ok(Pipeline::new(Arc::new(move |_: &ResolutionContext<'_>| {
					Ok(value.clone())
				})))
			}
			// `members` already holds the merged members of the whole clone chain.
			RegistrationData::Clone(source) => self.try_build(core, contract, source.data(), members),
			RegistrationData::Cache(cache) => {
				let cache = cache.clone();
				Ok(Pipeline::new(Arc::new(move |ctx: &ResolutionContext<'_>| {
					resolve_collection(ctx, &cache)
				})))
			}
		}
	}

	fn build_type(
		&self,
		core: &Core,
		contract: &Contract,
		target: &TypeKey,
		members: &InjectionMembers,
		cast: CastFn,
	) -> DiResult<Pipeline> {
		if target.is_abstract() {
			return Err(DiError::not_constructible(
				contract,
				format!("{target} is abstract and has no mapping"),
			));
		}
		let recipe = core.catalog().get(target).ok_or_else(|| {
			DiError::not_constructible(contract, format!("{target} has no registered recipe"))
		})?;

		let describer: Arc<dyn DescribeImport> = core
			.policies()
			.get::<dyn DescribeImport>()
			.unwrap_or_else(|| Arc::new(DefaultImportProvider));
		let compiler: Arc<dyn StepCompiler> = core
			.policies()
			.get::<dyn StepCompiler>()
			.unwrap_or_else(|| Arc::new(ClosureCompiler));

		let built = Contract::new(target.clone(), contract.name_arc().cloned());
		let mut plan = BuildPlan::new(built, &recipe);
		for (stage, processor) in self.chain.processors() {
			tracing::trace!(?stage, ?processor, "Running build processor");
			processor.process(&recipe, members, describer.as_ref(), &mut plan)?;
		}
		let compiled = compiler.compile(plan)?;

		let resolve = compiled.resolve;
		let resolve_cast = cast.clone();
		let build_up = compiled.build_up;
		Ok(Pipeline::new(Arc::new(move |ctx: &ResolutionContext<'_>| {
			let value = resolve(ctx)?;
			apply_cast(&resolve_cast, ctx.contract(), value)
		}))
		.with_build_up(Arc::new(
			move |ctx: &ResolutionContext<'_>, instance: BoxedInstance| {
				let value = build_up(ctx, instance)?;
				apply_cast(&cast, ctx.contract(), value)
			},
		)))
	}
}

impl Default for PipelineBuilder {
	fn default() -> Self {
		Self::new(StagedChain::default())
	}
}

impl fmt::Debug for PipelineBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PipelineBuilder")
			.field("chain", &self.chain)
			.field("builds", &self.build_count())
			.finish()
	}
}

/// Resolves the mapped contract and converts its value to the service type.
fn redirect(contract: &Contract, target: TypeKey, cast: CastFn) -> Pipeline {
	let mapped = contract.with_key(target);
	Pipeline::new(Arc::new(move |ctx: &ResolutionContext<'_>| {
		let value = ctx.resolve(&mapped)?;
		apply_cast(&cast, ctx.contract(), value)
	}))
}

fn apply_cast(cast: &CastFn, contract: &Contract, value: Value) -> DiResult<Value> {
	let found = value.type_name();
	cast(value).ok_or_else(|| DiError::TypeMismatch {
		contract: contract.clone(),
		expected: contract.key().name(),
		found,
	})
}
