//! Raw entity definitions consumed by the planner.
//!
//! These are the uncompiled shapes of tools, agents, and workflows. They
//! reference each other only by [`EntityId`]; resolving those references is
//! the job of the graph stages.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use trellis_core::{CoreError, CoreResult, EntityId};

/// An external tool. Tools have no dependency semantics of their own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDef {
    /// Unique tool ID
    pub uid: EntityId,
    /// Display name, also accepted by tool lookups
    #[serde(default)]
    pub name: String,
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// JSON schema for the tool input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}

impl ToolDef {
    /// Create a tool whose name equals its ID
    #[must_use]
    pub fn new(uid: impl Into<EntityId>) -> Self {
        let uid = uid.into();
        Self {
            name: uid.to_string(),
            uid,
            description: String::new(),
            input_schema: None,
        }
    }

    /// Set the display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// An agent definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDef {
    /// Unique agent ID
    pub uid: EntityId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Brief description used for delegation
    #[serde(default)]
    pub description: String,
    /// External tools the agent may call. Never graph dependencies.
    #[serde(default)]
    pub tools: Vec<EntityId>,
    /// Agents this agent may delegate to
    #[serde(default)]
    pub sub_agents: Vec<EntityId>,
    /// Workflows this agent may start
    #[serde(default)]
    pub sub_workflows: Vec<EntityId>,
}

impl AgentDef {
    /// Create an agent with no references
    #[must_use]
    pub fn new(uid: impl Into<EntityId>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }

    /// Set the tool references
    #[must_use]
    pub fn with_tools<I, T>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Set the sub-agent references
    #[must_use]
    pub fn with_sub_agents<I, T>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        self.sub_agents = agents.into_iter().map(Into::into).collect();
        self
    }

    /// Set the sub-workflow references
    #[must_use]
    pub fn with_sub_workflows<I, T>(mut self, workflows: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        self.sub_workflows = workflows.into_iter().map(Into::into).collect();
        self
    }
}

/// One step of a workflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    /// Step ID, unique within its workflow when set
    #[serde(default)]
    pub uid: String,
    /// Lead agent reference
    pub agent: EntityId,
    /// Helper agent references
    #[serde(default)]
    pub sub_agents: Vec<EntityId>,
}

impl WorkflowStep {
    /// Create a step led by `agent`
    #[must_use]
    pub fn new(agent: impl Into<EntityId>) -> Self {
        Self {
            uid: String::new(),
            agent: agent.into(),
            sub_agents: Vec::new(),
        }
    }

    /// Set the step ID
    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    /// Set the helper agent references
    #[must_use]
    pub fn with_sub_agents<I, T>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        self.sub_agents = agents.into_iter().map(Into::into).collect();
        self
    }
}

/// A workflow definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDef {
    /// Unique workflow ID
    pub uid: EntityId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// Ordered steps
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowDef {
    /// Create a workflow with no steps
    #[must_use]
    pub fn new(uid: impl Into<EntityId>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }

    /// Append a step
    #[must_use]
    pub fn with_step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }
}

/// The full set of definitions for one system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInputs {
    /// External tools
    #[serde(default)]
    pub tools: Vec<ToolDef>,
    /// Agents
    #[serde(default)]
    pub agents: Vec<AgentDef>,
    /// Workflows
    #[serde(default)]
    pub workflows: Vec<WorkflowDef>,
}

impl SystemInputs {
    /// Create an empty system
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool
    #[must_use]
    pub fn with_tool(mut self, tool: ToolDef) -> Self {
        self.tools.push(tool);
        self
    }

    /// Add an agent
    #[must_use]
    pub fn with_agent(mut self, agent: AgentDef) -> Self {
        self.agents.push(agent);
        self
    }

    /// Add a workflow
    #[must_use]
    pub fn with_workflow(mut self, workflow: WorkflowDef) -> Self {
        self.workflows.push(workflow);
        self
    }

    /// Number of agents plus workflows, i.e. the graph size
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.agents.len() + self.workflows.len()
    }

    /// Check definitions for structural problems before planning
    ///
    /// Agents and workflows share one ID namespace; tools have their own.
    ///
    /// # Errors
    ///
    /// Returns the first blank ID, duplicate ID, empty workflow, or
    /// duplicate step ID found
    pub fn validate(&self) -> CoreResult<()> {
        let mut tool_ids = IndexSet::new();
        for tool in &self.tools {
            require_id(&tool.uid, "tool")?;
            if !tool_ids.insert(tool.uid.as_str()) {
                return Err(CoreError::AlreadyExists {
                    kind: "Tool".to_string(),
                    id: tool.uid.to_string(),
                });
            }
        }

        let mut node_ids = IndexSet::new();
        for agent in &self.agents {
            require_id(&agent.uid, "agent")?;
            if !node_ids.insert(agent.uid.as_str()) {
                return Err(CoreError::AlreadyExists {
                    kind: "Agent".to_string(),
                    id: agent.uid.to_string(),
                });
            }
        }

        for workflow in &self.workflows {
            require_id(&workflow.uid, "workflow")?;
            if !node_ids.insert(workflow.uid.as_str()) {
                return Err(CoreError::AlreadyExists {
                    kind: "Workflow".to_string(),
                    id: workflow.uid.to_string(),
                });
            }
            if workflow.steps.is_empty() {
                return Err(CoreError::Validation {
                    field: format!("workflow {}", workflow.uid),
                    reason: "workflow must have at least one step".to_string(),
                });
            }

            let mut step_ids = IndexSet::new();
            for step in workflow.steps.iter().filter(|s| !s.uid.is_empty()) {
                if !step_ids.insert(step.uid.as_str()) {
                    return Err(CoreError::AlreadyExists {
                        kind: "Step".to_string(),
                        id: format!("{}/{}", workflow.uid, step.uid),
                    });
                }
            }
        }

        Ok(())
    }
}

fn require_id(id: &EntityId, kind: &str) -> CoreResult<()> {
    if id.is_blank() {
        return Err(CoreError::InvalidId {
            reason: format!("{kind} ID must not be empty"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_system() -> SystemInputs {
        SystemInputs::new()
            .with_tool(ToolDef::new("search"))
            .with_agent(AgentDef::new("a1").with_tools(["search"]))
            .with_agent(AgentDef::new("a2").with_sub_agents(["a1"]))
            .with_workflow(WorkflowDef::new("w1").with_step(WorkflowStep::new("a2").with_uid("s1")))
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_system().validate().is_ok());
        assert_eq!(valid_system().node_count(), 3);
    }

    #[test]
    fn test_validate_blank_id() {
        let inputs = valid_system().with_agent(AgentDef::new(" "));
        assert!(matches!(inputs.validate(), Err(CoreError::InvalidId { .. })));
    }

    #[test]
    fn test_validate_duplicate_tool() {
        let inputs = valid_system().with_tool(ToolDef::new("search"));
        assert_eq!(
            inputs.validate(),
            Err(CoreError::AlreadyExists {
                kind: "Tool".to_string(),
                id: "search".to_string(),
            })
        );
    }

    #[test]
    fn test_validate_agent_workflow_share_namespace() {
        let inputs = valid_system()
            .with_workflow(WorkflowDef::new("a1").with_step(WorkflowStep::new("a2")));
        assert_eq!(
            inputs.validate(),
            Err(CoreError::AlreadyExists {
                kind: "Workflow".to_string(),
                id: "a1".to_string(),
            })
        );
    }

    #[test]
    fn test_validate_tool_may_share_agent_id() {
        let inputs = valid_system().with_tool(ToolDef::new("a1"));
        assert!(inputs.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_workflow() {
        let inputs = valid_system().with_workflow(WorkflowDef::new("w2"));
        assert!(matches!(inputs.validate(), Err(CoreError::Validation { .. })));
    }

    #[test]
    fn test_validate_duplicate_step() {
        let inputs = valid_system().with_workflow(
            WorkflowDef::new("w2")
                .with_step(WorkflowStep::new("a1").with_uid("s"))
                .with_step(WorkflowStep::new("a2").with_uid("s")),
        );
        assert_eq!(
            inputs.validate(),
            Err(CoreError::AlreadyExists {
                kind: "Step".to_string(),
                id: "w2/s".to_string(),
            })
        );
    }

    #[test]
    fn test_anonymous_steps_are_not_duplicates() {
        let inputs = valid_system().with_workflow(
            WorkflowDef::new("w2")
                .with_step(WorkflowStep::new("a1"))
                .with_step(WorkflowStep::new("a2")),
        );
        assert!(inputs.validate().is_ok());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{
            "tools": [{"uid": "search"}],
            "agents": [{"uid": "a2", "subAgents": ["a1"], "subWorkflows": [], "tools": ["search"]}],
            "workflows": [{"uid": "w1", "steps": [{"uid": "s1", "agent": "a2", "subAgents": ["a1"]}]}]
        }"#;
        let inputs: SystemInputs = serde_json::from_str(json).unwrap();
        assert_eq!(inputs.agents[0].sub_agents, vec![EntityId::new("a1")]);
        assert_eq!(inputs.workflows[0].steps[0].sub_agents, vec![EntityId::new("a1")]);
        assert!(inputs.agents[0].name.is_empty());
    }
}
