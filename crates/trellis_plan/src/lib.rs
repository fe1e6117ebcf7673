//! Trellis Planner
//!
//! Turns agent and workflow definitions into a dependency graph, rejects
//! unresolved references and cycles, orders the graph topologically, and
//! drives caller-supplied compilation in that order.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod build;
pub mod cycle;
pub mod definition;
pub mod error;
pub mod graph;
pub mod link;
pub mod options;
pub mod orchestrate;
pub mod planner;
pub mod system;
pub mod topo;

pub use build::GraphBuilder;
pub use cycle::CycleDetector;
pub use definition::{AgentDef, SystemInputs, ToolDef, WorkflowDef, WorkflowStep};
pub use error::{BoxError, CyclePath, PlanError, PlanResult};
pub use graph::{AcyclicGraph, ArtifactSlot, BuildPlan, Graph, Node, NodeSet, NodeState};
pub use link::EdgeLinker;
pub use options::{PlanOptions, TieBreak};
pub use orchestrate::{
    strategy_fn, ArtifactRef, CompileAbort, CompileStrategy, CompiledSystem, FnStrategy,
    Orchestrator, Registries, Resolved,
};
pub use planner::Planner;
pub use system::{delegation_tool, SystemManager, USE_AGENT_TOOL};
pub use topo::TopologicalSorter;
