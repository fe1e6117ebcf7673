//! The planning pipeline: validate, build, link, check, sort.

use crate::build::GraphBuilder;
use crate::cycle::CycleDetector;
use crate::definition::SystemInputs;
use crate::error::PlanResult;
use crate::graph::BuildPlan;
use crate::link::EdgeLinker;
use crate::options::PlanOptions;
use crate::orchestrate::{CompileAbort, CompileStrategy, CompiledSystem, Orchestrator};
use crate::topo::TopologicalSorter;
use trellis_core::CoreError;

/// Runs every planning stage in order and, optionally, compilation.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    options: PlanOptions,
}

impl Planner {
    /// Create a planner with the given options
    #[must_use]
    pub fn new(options: PlanOptions) -> Self {
        Self { options }
    }

    /// Options in effect
    #[must_use]
    pub fn options(&self) -> &PlanOptions {
        &self.options
    }

    /// Produce a build plan for `inputs`
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's error: a validation error, an
    /// unresolved dependency, or every cycle found. No partial plan is
    /// returned.
    pub fn plan(&self, inputs: &SystemInputs) -> PlanResult<BuildPlan> {
        let _span = tracing::debug_span!("plan", nodes = inputs.node_count()).entered();

        if self.options.validate_inputs {
            inputs.validate()?;
        }
        if self.options.max_nodes > 0 && inputs.node_count() > self.options.max_nodes {
            return Err(CoreError::Validation {
                field: "nodes".to_string(),
                reason: format!(
                    "{} nodes exceeds the limit of {}",
                    inputs.node_count(),
                    self.options.max_nodes
                ),
            }
            .into());
        }

        let nodes = GraphBuilder::new().build(inputs);
        let graph = EdgeLinker::new().link(nodes)?;
        let acyclic = CycleDetector::new().check(graph)?;
        let order = TopologicalSorter::new(self.options.tie_break).sort(&acyclic)?;
        let plan = BuildPlan::new(acyclic, order);

        tracing::info!(
            nodes = plan.order().len(),
            edges = plan.graph().edge_count(),
            tie_break = %self.options.tie_break,
            "build plan ready"
        );
        Ok(plan)
    }

    /// Plan `inputs` and compile every node with `strategy`
    ///
    /// # Errors
    ///
    /// A planning failure is returned with no plan and nothing compiled. A
    /// compile failure carries the plan and the partial registries.
    pub fn build_and_compile<S: CompileStrategy>(
        &self,
        inputs: &SystemInputs,
        strategy: &mut S,
    ) -> Result<CompiledSystem<S::Agent, S::Workflow>, CompileAbort<S::Agent, S::Workflow>> {
        let plan = self.plan(inputs).map_err(CompileAbort::planning)?;
        Orchestrator::new().run(plan, strategy)
    }
}
