//! Graph building: definitions in, unlinked nodes out.

use crate::definition::{AgentDef, SystemInputs, WorkflowDef};
use crate::graph::{Node, NodeSet};
use indexmap::IndexSet;
use trellis_core::{EntityId, EntityKind};

/// Turns raw definitions into one node per agent and per workflow.
///
/// Building never fails. Unresolved references are left for the linker.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder;

impl GraphBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build the node set
    ///
    /// A repeated agent or workflow ID replaces the earlier definition while
    /// keeping its position.
    #[must_use]
    pub fn build(&self, inputs: &SystemInputs) -> NodeSet {
        let mut set = NodeSet::default();

        for tool in &inputs.tools {
            set.tools.insert(tool.uid.clone());
        }

        for agent in &inputs.agents {
            let node = Node::new(agent.uid.clone(), EntityKind::Agent, agent_dependencies(agent));
            set.nodes.insert(agent.uid.clone(), node);
        }

        for workflow in &inputs.workflows {
            let node = Node::new(
                workflow.uid.clone(),
                EntityKind::Workflow,
                workflow_dependencies(workflow),
            );
            set.nodes.insert(workflow.uid.clone(), node);
        }

        tracing::debug!(
            nodes = set.nodes.len(),
            tools = set.tools.len(),
            "built dependency nodes"
        );
        set
    }
}

/// Sub-agents then sub-workflows, duplicates kept. Tool references are not
/// dependencies.
#[must_use]
pub fn agent_dependencies(agent: &AgentDef) -> Vec<EntityId> {
    agent
        .sub_agents
        .iter()
        .chain(&agent.sub_workflows)
        .cloned()
        .collect()
}

/// Every step's lead agent and helper agents, first occurrence kept.
#[must_use]
pub fn workflow_dependencies(workflow: &WorkflowDef) -> Vec<EntityId> {
    let mut deps = IndexSet::new();
    for step in &workflow.steps {
        deps.insert(step.agent.clone());
        deps.extend(step.sub_agents.iter().cloned());
    }
    deps.into_iter().collect()
}
