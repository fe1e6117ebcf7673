//! Compilation orchestration.
//!
//! The orchestrator walks a [`BuildPlan`] once, strictly in order, and hands
//! each node to the caller's [`CompileStrategy`] together with the artifacts
//! of its dependencies. Because the order is topological those artifacts are
//! always present. The first failure stops the run; nodes after it are never
//! offered to the strategy.
//!
//! Per node: `Pending → Compiling → Compiled | Failed`.

use crate::error::{BoxError, PlanError};
use crate::graph::{ArtifactSlot, BuildPlan, NodeState};
use indexmap::IndexMap;
use std::fmt;
use std::marker::PhantomData;
use trellis_core::{EntityId, EntityKind};

/// Borrowed artifact of either kind
#[derive(Debug)]
pub enum ArtifactRef<'a, A, W> {
    /// A compiled agent
    Agent(&'a A),
    /// A compiled workflow
    Workflow(&'a W),
}

impl<A, W> Clone for ArtifactRef<'_, A, W> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A, W> Copy for ArtifactRef<'_, A, W> {}

impl<'a, A, W> ArtifactRef<'a, A, W> {
    /// Kind of the referenced artifact
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Agent(_) => EntityKind::Agent,
            Self::Workflow(_) => EntityKind::Workflow,
        }
    }

    /// The agent artifact, if this is one
    #[must_use]
    pub const fn as_agent(&self) -> Option<&'a A> {
        match self {
            Self::Agent(a) => Some(a),
            Self::Workflow(_) => None,
        }
    }

    /// The workflow artifact, if this is one
    #[must_use]
    pub const fn as_workflow(&self) -> Option<&'a W> {
        match self {
            Self::Workflow(w) => Some(w),
            Self::Agent(_) => None,
        }
    }
}

/// Read-only view of a node's already-compiled dependencies, keyed by ID in
/// declaration order
#[derive(Debug)]
pub struct Resolved<'a, A, W> {
    entries: IndexMap<&'a str, ArtifactRef<'a, A, W>>,
}

impl<'a, A, W> Resolved<'a, A, W> {
    /// Artifact of dependency `id`
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ArtifactRef<'a, A, W>> {
        self.entries.get(id).copied()
    }

    /// Agent artifact of dependency `id`
    #[must_use]
    pub fn agent(&self, id: &str) -> Option<&'a A> {
        self.get(id).and_then(|r| r.as_agent())
    }

    /// Workflow artifact of dependency `id`
    #[must_use]
    pub fn workflow(&self, id: &str) -> Option<&'a W> {
        self.get(id).and_then(|r| r.as_workflow())
    }

    /// Iterate dependencies in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, ArtifactRef<'a, A, W>)> + '_ {
        self.entries.iter().map(|(id, r)| (*id, *r))
    }

    /// Distinct dependency IDs, in declaration order
    pub fn ids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.keys().copied()
    }

    /// Number of distinct dependencies
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the node has no dependencies
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Caller-supplied compilation, one method per node kind.
///
/// Strategies run synchronously on the calling thread. Any timeout or
/// cancellation must be implemented inside the strategy.
pub trait CompileStrategy {
    /// Compiled agent artifact
    type Agent;
    /// Compiled workflow artifact
    type Workflow;
    /// Failure cause, wrapped into `PlanError::CompileFailure`
    type Error: Into<BoxError>;

    /// Compile agent `id`
    ///
    /// # Errors
    ///
    /// Any error aborts the whole run
    fn compile_agent(
        &mut self,
        id: &EntityId,
        deps: &Resolved<'_, Self::Agent, Self::Workflow>,
    ) -> Result<Self::Agent, Self::Error>;

    /// Compile workflow `id`
    ///
    /// # Errors
    ///
    /// Any error aborts the whole run
    fn compile_workflow(
        &mut self,
        id: &EntityId,
        deps: &Resolved<'_, Self::Agent, Self::Workflow>,
    ) -> Result<Self::Workflow, Self::Error>;
}

/// A [`CompileStrategy`] made from two closures
pub struct FnStrategy<A, W, E, FA, FW> {
    agent: FA,
    workflow: FW,
    _marker: PhantomData<fn() -> (A, W, E)>,
}

/// Build a strategy from an agent closure and a workflow closure
pub fn strategy_fn<A, W, E, FA, FW>(agent: FA, workflow: FW) -> FnStrategy<A, W, E, FA, FW>
where
    E: Into<BoxError>,
    FA: FnMut(&EntityId, &Resolved<'_, A, W>) -> Result<A, E>,
    FW: FnMut(&EntityId, &Resolved<'_, A, W>) -> Result<W, E>,
{
    FnStrategy {
        agent,
        workflow,
        _marker: PhantomData,
    }
}

impl<A, W, E, FA, FW> CompileStrategy for FnStrategy<A, W, E, FA, FW>
where
    E: Into<BoxError>,
    FA: FnMut(&EntityId, &Resolved<'_, A, W>) -> Result<A, E>,
    FW: FnMut(&EntityId, &Resolved<'_, A, W>) -> Result<W, E>,
{
    type Agent = A;
    type Workflow = W;
    type Error = E;

    fn compile_agent(&mut self, id: &EntityId, deps: &Resolved<'_, A, W>) -> Result<A, E> {
        (self.agent)(id, deps)
    }

    fn compile_workflow(&mut self, id: &EntityId, deps: &Resolved<'_, A, W>) -> Result<W, E> {
        (self.workflow)(id, deps)
    }
}

/// Compiled artifacts, partitioned by kind, each in compilation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registries<A, W> {
    agents: IndexMap<EntityId, A>,
    workflows: IndexMap<EntityId, W>,
}

impl<A, W> Registries<A, W> {
    /// Create empty registries
    #[must_use]
    pub fn new() -> Self {
        Self {
            agents: IndexMap::new(),
            workflows: IndexMap::new(),
        }
    }

    /// Compiled agents
    #[must_use]
    pub fn agents(&self) -> &IndexMap<EntityId, A> {
        &self.agents
    }

    /// Compiled workflows
    #[must_use]
    pub fn workflows(&self) -> &IndexMap<EntityId, W> {
        &self.workflows
    }

    /// Compiled agent by ID
    #[must_use]
    pub fn agent(&self, id: &str) -> Option<&A> {
        self.agents.get(id)
    }

    /// Compiled workflow by ID
    #[must_use]
    pub fn workflow(&self, id: &str) -> Option<&W> {
        self.workflows.get(id)
    }

    /// Artifact stored at `slot`
    #[must_use]
    pub fn get(&self, slot: ArtifactSlot) -> Option<ArtifactRef<'_, A, W>> {
        match slot.kind {
            EntityKind::Agent => self.agents.get_index(slot.index).map(|(_, a)| ArtifactRef::Agent(a)),
            EntityKind::Workflow => self
                .workflows
                .get_index(slot.index)
                .map(|(_, w)| ArtifactRef::Workflow(w)),
        }
    }

    /// Total artifacts
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len() + self.workflows.len()
    }

    /// True when nothing was compiled
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take ownership of both registries
    #[must_use]
    pub fn into_parts(self) -> (IndexMap<EntityId, A>, IndexMap<EntityId, W>) {
        (self.agents, self.workflows)
    }

    fn store(&mut self, id: EntityId, artifact: Artifact<A, W>) -> ArtifactSlot {
        match artifact {
            Artifact::Agent(a) => {
                let (index, _) = self.agents.insert_full(id, a);
                ArtifactSlot { kind: EntityKind::Agent, index }
            }
            Artifact::Workflow(w) => {
                let (index, _) = self.workflows.insert_full(id, w);
                ArtifactSlot { kind: EntityKind::Workflow, index }
            }
        }
    }
}

impl<A, W> Default for Registries<A, W> {
    fn default() -> Self {
        Self::new()
    }
}

enum Artifact<A, W> {
    Agent(A),
    Workflow(W),
}

/// A fully compiled system
#[derive(Debug)]
pub struct CompiledSystem<A, W> {
    /// The plan, every node in `Compiled` state
    pub plan: BuildPlan,
    /// Artifacts by kind
    pub registries: Registries<A, W>,
}

impl<A, W> CompiledSystem<A, W> {
    /// The compilation order that was followed
    #[must_use]
    pub fn order(&self) -> &[EntityId] {
        self.plan.order()
    }
}

/// An aborted run. The partial registries are for diagnostics only and must
/// not be used as a working system.
#[derive(Debug)]
pub struct CompileAbort<A, W> {
    /// Why the run stopped
    pub error: PlanError,
    /// The plan with node states as they were at abort, if planning got that
    /// far
    pub plan: Option<BuildPlan>,
    /// Artifacts compiled before the failure
    pub partial: Registries<A, W>,
}

impl<A, W> CompileAbort<A, W> {
    pub(crate) fn planning(error: PlanError) -> Self {
        Self {
            error,
            plan: None,
            partial: Registries::new(),
        }
    }

    /// Discard the partial state
    #[must_use]
    pub fn into_error(self) -> PlanError {
        self.error
    }
}

impl<A, W> fmt::Display for CompileAbort<A, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "compilation aborted after {} compiled node(s): {}",
            self.partial.len(),
            self.error
        )
    }
}

impl<A: fmt::Debug, W: fmt::Debug> std::error::Error for CompileAbort<A, W> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Drives per-node compilation along a plan's order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Orchestrator;

impl Orchestrator {
    /// Create a new orchestrator
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compile every node of `plan` in order
    ///
    /// # Errors
    ///
    /// Returns a [`CompileAbort`] carrying `CompileFailure` for the first
    /// node whose strategy fails, together with the plan and the artifacts
    /// compiled so far.
    pub fn run<S: CompileStrategy>(
        &self,
        mut plan: BuildPlan,
        strategy: &mut S,
    ) -> Result<CompiledSystem<S::Agent, S::Workflow>, CompileAbort<S::Agent, S::Workflow>> {
        let mut registries = Registries::new();
        let order = plan.order().to_vec();

        for node in plan.graph_mut().nodes.values_mut() {
            node.set_state(NodeState::Pending);
        }

        for id in &order {
            match compile_node(&mut plan, &mut registries, strategy, id) {
                Ok(slot) => {
                    if let Some(node) = plan.graph_mut().get_mut(id.as_str()) {
                        node.set_state(NodeState::Compiled(slot));
                    }
                    tracing::trace!(node = %id, kind = %slot.kind, "compiled node");
                }
                Err(error) => {
                    if let Some(node) = plan.graph_mut().get_mut(id.as_str()) {
                        node.set_state(NodeState::Failed);
                    }
                    tracing::warn!(node = %id, error = %error, "compilation aborted");
                    return Err(CompileAbort {
                        error,
                        plan: Some(plan),
                        partial: registries,
                    });
                }
            }
        }

        tracing::debug!(
            agents = registries.agents.len(),
            workflows = registries.workflows.len(),
            "compiled all nodes"
        );
        Ok(CompiledSystem { plan, registries })
    }
}

fn compile_node<S: CompileStrategy>(
    plan: &mut BuildPlan,
    registries: &mut Registries<S::Agent, S::Workflow>,
    strategy: &mut S,
    id: &EntityId,
) -> Result<ArtifactSlot, PlanError> {
    let (kind, dependencies) = {
        let node = plan.graph_mut().get_mut(id.as_str()).ok_or_else(|| PlanError::Internal {
            message: format!("ordered node '{id}' is missing from the graph"),
        })?;
        node.set_state(NodeState::Compiling);
        (node.kind, node.dependencies.clone())
    };

    let artifact = {
        let mut entries = IndexMap::with_capacity(dependencies.len());
        for dep in &dependencies {
            let artifact = plan
                .node(dep.as_str())
                .and_then(|n| n.artifact())
                .and_then(|slot| registries.get(slot))
                .ok_or_else(|| PlanError::Internal {
                    message: format!("dependency '{dep}' of '{id}' was not compiled first"),
                })?;
            entries.insert(dep.as_str(), artifact);
        }
        let resolved = Resolved { entries };

        let result = match kind {
            EntityKind::Agent => strategy.compile_agent(id, &resolved).map(Artifact::Agent),
            EntityKind::Workflow => strategy.compile_workflow(id, &resolved).map(Artifact::Workflow),
        };
        result.map_err(|err| PlanError::CompileFailure {
            id: id.clone(),
            kind,
            source: err.into(),
        })?
    };

    Ok(registries.store(id.clone(), artifact))
}
