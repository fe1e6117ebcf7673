//! Assembled systems.
//!
//! A [`SystemManager`] owns a planned system's definitions and its
//! [`BuildPlan`]. Assembly also gives every agent that has sub-agents a
//! delegation tool, so it can hand work to them at run time.

use crate::definition::{AgentDef, SystemInputs, ToolDef, WorkflowDef};
use crate::error::PlanResult;
use crate::graph::BuildPlan;
use crate::orchestrate::{CompileAbort, CompileStrategy, CompiledSystem, Orchestrator};
use crate::planner::Planner;
use indexmap::IndexMap;
use serde_json::json;
use trellis_core::{CoreError, CoreResult, EntityId};

/// Name shared by every synthesized delegation tool
pub const USE_AGENT_TOOL: &str = "use_agent_tool";

/// A planned system with lookups by ID
#[derive(Debug, Clone)]
pub struct SystemManager {
    tools: IndexMap<EntityId, ToolDef>,
    agents: IndexMap<EntityId, AgentDef>,
    workflows: IndexMap<EntityId, WorkflowDef>,
    plan: BuildPlan,
}

impl SystemManager {
    /// Plan `inputs` and assemble the system
    ///
    /// # Errors
    ///
    /// Any planning error, or `AlreadyExists` if a declared tool collides
    /// with a synthesized delegation tool ID
    pub fn assemble(inputs: &SystemInputs, planner: &Planner) -> PlanResult<Self> {
        let plan = planner.plan(inputs)?;

        let mut tools: IndexMap<EntityId, ToolDef> = inputs
            .tools
            .iter()
            .map(|t| (t.uid.clone(), t.clone()))
            .collect();
        let mut agents = IndexMap::with_capacity(inputs.agents.len());

        for agent in &inputs.agents {
            let mut agent = agent.clone();
            if let Some(tool) = delegation_tool(&agent) {
                if tools.contains_key(&tool.uid) {
                    return Err(CoreError::AlreadyExists {
                        kind: "Tool".to_string(),
                        id: tool.uid.to_string(),
                    }
                    .into());
                }
                if !agent.tools.iter().any(|t| t == USE_AGENT_TOOL) {
                    agent.tools.push(EntityId::new(USE_AGENT_TOOL));
                }
                tools.insert(tool.uid.clone(), tool);
            }
            agents.insert(agent.uid.clone(), agent);
        }

        let workflows: IndexMap<EntityId, WorkflowDef> = inputs
            .workflows
            .iter()
            .map(|w| (w.uid.clone(), w.clone()))
            .collect();

        tracing::debug!(
            agents = agents.len(),
            workflows = workflows.len(),
            tools = tools.len(),
            "assembled system"
        );
        Ok(Self {
            tools,
            agents,
            workflows,
            plan,
        })
    }

    /// Agent by ID
    ///
    /// # Errors
    ///
    /// `NotFound` if no agent has this ID
    pub fn agent(&self, id: &str) -> CoreResult<&AgentDef> {
        self.agents.get(id).ok_or_else(|| not_found("Agent", id))
    }

    /// Workflow by ID
    ///
    /// # Errors
    ///
    /// `NotFound` if no workflow has this ID
    pub fn workflow(&self, id: &str) -> CoreResult<&WorkflowDef> {
        self.workflows.get(id).ok_or_else(|| not_found("Workflow", id))
    }

    /// Tool by ID, falling back to the first tool with that name
    ///
    /// # Errors
    ///
    /// `NotFound` if neither matches
    pub fn tool(&self, id_or_name: &str) -> CoreResult<&ToolDef> {
        self.tools
            .get(id_or_name)
            .or_else(|| self.tools.values().find(|t| t.name == id_or_name))
            .ok_or_else(|| not_found("Tool", id_or_name))
    }

    /// All agents, declaration order
    #[must_use]
    pub fn agents(&self) -> &IndexMap<EntityId, AgentDef> {
        &self.agents
    }

    /// All workflows, declaration order
    #[must_use]
    pub fn workflows(&self) -> &IndexMap<EntityId, WorkflowDef> {
        &self.workflows
    }

    /// All tools, declared first then synthesized
    #[must_use]
    pub fn tools(&self) -> &IndexMap<EntityId, ToolDef> {
        &self.tools
    }

    /// The build plan
    #[must_use]
    pub fn plan(&self) -> &BuildPlan {
        &self.plan
    }

    /// Compile a fresh copy of the plan with `strategy`
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::run`]
    pub fn compile<S: CompileStrategy>(
        &self,
        strategy: &mut S,
    ) -> Result<CompiledSystem<S::Agent, S::Workflow>, CompileAbort<S::Agent, S::Workflow>> {
        Orchestrator::new().run(self.plan.clone(), strategy)
    }
}

/// The delegation tool for `agent`, or `None` when it has no sub-agents
#[must_use]
pub fn delegation_tool(agent: &AgentDef) -> Option<ToolDef> {
    if agent.sub_agents.is_empty() {
        return None;
    }

    let names: Vec<&str> = agent.sub_agents.iter().map(EntityId::as_str).collect();
    let schema = json!({
        "type": "object",
        "properties": {
            "agent": {
                "type": "string",
                "description": "ID of the sub-agent to invoke",
                "enum": names,
            },
            "input": {
                "type": "string",
                "description": "Input passed to the sub-agent",
            },
        },
        "required": ["agent", "input"],
    });

    let mut tool = ToolDef::new(format!("{USE_AGENT_TOOL}_{}", agent.uid))
        .with_name(USE_AGENT_TOOL)
        .with_description(format!(
            "Delegate work to one of the available sub-agents: {}",
            names.join(", ")
        ));
    tool.input_schema = Some(schema);
    Some(tool)
}

fn not_found(kind: &str, id: &str) -> CoreError {
    CoreError::NotFound {
        kind: kind.to_string(),
        id: id.to_string(),
    }
}
