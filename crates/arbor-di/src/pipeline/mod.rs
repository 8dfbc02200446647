//! Resolution pipelines
//!
//! A [`Pipeline`] is the compiled procedure that produces a registration's value. It
//! is built once per registration by the [`PipelineBuilder`], which dispatches on
//! the registration category:
//!
//! - **Type**: a redirect to the mapped contract, or a full build of the target
//!   type's recipe when the registration carries injection members
//! - **Factory**: the user factory
//! - **Instance**: the held value
//! - **Clone**: the pipeline of the cloned registration
//! - **Cache**: collection resolution
//!
//! Full builds run a [`StagedChain`] of [`BuildProcessor`]s that turn a recipe and
//! the registration's members into a [`BuildPlan`], then hand the plan to the
//! [`StepCompiler`] installed in the container's policies.

mod builder;
mod compiler;
mod processors;

pub use builder::PipelineBuilder;
pub use compiler::{ClosureCompiler, CompiledPlan, StepCompiler};
pub use processors::{
	BuildPlan, BuildProcessor, ConstructStep, ConstructorProcessor, FieldProcessor, ImportStep,
	MemberStep, MethodProcessor, PropertyProcessor,
};

use crate::context::ResolutionContext;
use crate::error::{DiError, DiResult};
use crate::value::{BoxedInstance, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub type ResolveDelegate = Arc<dyn Fn(&ResolutionContext<'_>) -> DiResult<Value> + Send + Sync>;
pub type BuildUpDelegate =
	Arc<dyn Fn(&ResolutionContext<'_>, BoxedInstance) -> DiResult<Value> + Send + Sync>;

/// A compiled resolution procedure.
#[derive(Clone)]
pub struct Pipeline {
	resolve: ResolveDelegate,
	build_up: Option<BuildUpDelegate>,
}

impl Pipeline {
	pub fn new(resolve: ResolveDelegate) -> Self {
		Self {
			resolve,
			build_up: None,
		}
	}

	pub fn with_build_up(mut self, build_up: BuildUpDelegate) -> Self {
		self.build_up = Some(build_up);
		self
	}

	/// A pipeline that always fails with `error`.
	pub fn faulted(error: DiError) -> Self {
		Self::new(Arc::new(move |_: &ResolutionContext<'_>| Err(error.clone())))
	}

	pub fn resolve(&self, ctx: &ResolutionContext<'_>) -> DiResult<Value> {
		(self.resolve)(ctx)
	}

	/// Runs member injection over an existing instance; `None` if the pipeline does
	/// not build from a recipe.
	pub fn build_up(
		&self,
		ctx: &ResolutionContext<'_>,
		instance: BoxedInstance,
	) -> Option<DiResult<Value>> {
		self.build_up.as_ref().map(|build_up| build_up(ctx, instance))
	}

	pub fn supports_build_up(&self) -> bool {
		self.build_up.is_some()
	}
}

impl fmt::Debug for Pipeline {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Pipeline")
			.field("build_up", &self.build_up.is_some())
			.finish()
	}
}

/// Ordered stages of a full build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildStage {
	Setup,
	PreCreation,
	Creation,
	Fields,
	Properties,
	Methods,
	PostInitialization,
}

/// Build processors grouped by stage, run in stage order then insertion order.
#[derive(Clone)]
pub struct StagedChain {
	stages: BTreeMap<BuildStage, Vec<Arc<dyn BuildProcessor>>>,
}

impl StagedChain {
	/// A chain with no processors.
	pub fn empty() -> Self {
		Self {
			stages: BTreeMap::new(),
		}
	}

	pub fn add(&mut self, stage: BuildStage, processor: Arc<dyn BuildProcessor>) -> &mut Self {
		self.stages.entry(stage).or_default().push(processor);
		self
	}

	pub fn with(mut self, stage: BuildStage, processor: Arc<dyn BuildProcessor>) -> Self {
		self.add(stage, processor);
		self
	}

	pub fn processors(&self) -> impl Iterator<Item = (BuildStage, &Arc<dyn BuildProcessor>)> {
		self.stages
			.iter()
			.flat_map(|(stage, processors)| processors.iter().map(move |p| (*stage, p)))
	}

	pub fn len(&self) -> usize {
		self.stages.values().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl Default for StagedChain {
	/// Constructor, field, property and method injection.
	fn default() -> Self {
		Self::empty()
			.with(BuildStage::Creation, Arc::new(ConstructorProcessor))
			.with(BuildStage::Fields, Arc::new(FieldProcessor))
			.with(BuildStage::Properties, Arc::new(PropertyProcessor))
			.with(BuildStage::Methods, Arc::new(MethodProcessor))
	}
}

impl fmt::Debug for StagedChain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map()
			.entries(self.stages.iter().map(|(stage, list)| (stage, list.len())))
			.finish()
	}
}
