//! Cycle detection over dependency edges.
//!
//! A depth-first search follows `dependencies` (not `dependents`) from every
//! unvisited root in declaration order. The visited set spans the whole pass;
//! the on-stack set is local to one root's search. The first loop found from
//! a root is reported and that root's search stops, so the result holds at
//! most one cycle per root. This detects cycles, it does not enumerate them.
//!
//! The search keeps an explicit stack, so very deep dependency chains do not
//! overflow the call stack.

use crate::error::{CyclePath, PlanError, PlanResult};
use crate::graph::{AcyclicGraph, Graph};

/// Finds dependency loops before anything is compiled.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleDetector;

impl CycleDetector {
    /// Create a new detector
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Collect one cycle per DFS root that reaches one
    #[must_use]
    pub fn detect(&self, graph: &Graph) -> Vec<CyclePath> {
        let mut visited = vec![false; graph.len()];
        let mut on_stack = vec![false; graph.len()];
        let mut cycles = Vec::new();

        for root in 0..graph.len() {
            if visited[root] {
                continue;
            }
            if let Some(cycle) = search(graph, root, &mut visited, &mut on_stack) {
                cycles.push(cycle);
            }
        }

        cycles
    }

    /// Detect cycles and, if there are none, certify the graph as acyclic
    ///
    /// # Errors
    ///
    /// Returns `CircularDependency` with every discovered cycle
    pub fn check(&self, graph: Graph) -> PlanResult<AcyclicGraph> {
        let cycles = self.detect(&graph);
        if !cycles.is_empty() {
            tracing::warn!(count = cycles.len(), "circular dependencies detected");
            return Err(PlanError::CircularDependency { cycles });
        }
        tracing::debug!(nodes = graph.len(), "dependency graph is acyclic");
        Ok(AcyclicGraph::new(graph))
    }
}

/// DFS from `root`. On return, `on_stack` is all false again.
fn search(
    graph: &Graph,
    root: usize,
    visited: &mut [bool],
    on_stack: &mut [bool],
) -> Option<CyclePath> {
    // path[i] is a node on the current branch, cursor[i] the next of its
    // dependencies to look at.
    let mut path = vec![root];
    let mut cursor = vec![0usize];
    visited[root] = true;
    on_stack[root] = true;

    let mut found = None;
    while let (Some(&current), Some(next)) = (path.last(), cursor.last_mut()) {
        let deps = graph
            .node_at(current)
            .map(|node| node.dependencies.as_slice())
            .unwrap_or_default();

        let Some(dep_id) = deps.get(*next) else {
            on_stack[current] = false;
            path.pop();
            cursor.pop();
            continue;
        };
        *next += 1;

        // The linker guarantees resolution; anything else is skipped.
        let Some(dep) = graph.index_of(dep_id.as_str()) else {
            continue;
        };

        if !visited[dep] {
            visited[dep] = true;
            on_stack[dep] = true;
            path.push(dep);
            cursor.push(0);
        } else if on_stack[dep] {
            if let Some(start) = path.iter().position(|&i| i == dep) {
                let mut ids: Vec<_> = path[start..]
                    .iter()
                    .filter_map(|&i| graph.node_at(i).map(|n| n.id.clone()))
                    .collect();
                ids.push(dep_id.clone());
                found = Some(CyclePath::new(ids));
                break;
            }
        }
    }

    for &i in &path {
        on_stack[i] = false;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::GraphBuilder;
    use crate::definition::{AgentDef, SystemInputs, WorkflowDef, WorkflowStep};
    use crate::link::EdgeLinker;
    use trellis_core::EntityId;

    fn linked(inputs: &SystemInputs) -> Graph {
        EdgeLinker::new().link(GraphBuilder::new().build(inputs)).unwrap()
    }

    fn ids(cycle: &CyclePath) -> Vec<&str> {
        cycle.ids().iter().map(EntityId::as_str).collect()
    }

    #[test]
    fn test_no_cycles() {
        let inputs = SystemInputs::new()
            .with_agent(AgentDef::new("a1"))
            .with_agent(AgentDef::new("a2").with_sub_agents(["a1"]))
            .with_workflow(WorkflowDef::new("w1").with_step(WorkflowStep::new("a2")));
        let graph = linked(&inputs);
        assert!(CycleDetector::new().detect(&graph).is_empty());
        assert!(CycleDetector::new().check(graph).is_ok());
    }

    #[test]
    fn test_two_node_cycle() {
        let inputs = SystemInputs::new()
            .with_agent(AgentDef::new("x").with_sub_agents(["y"]))
            .with_agent(AgentDef::new("y").with_sub_agents(["x"]));
        let cycles = CycleDetector::new().detect(&linked(&inputs));

        assert_eq!(cycles.len(), 1);
        assert_eq!(ids(&cycles[0]), vec!["x", "y", "x"]);
        let mut members: Vec<_> = cycles[0].members().iter().map(EntityId::as_str).collect();
        members.sort_unstable();
        assert_eq!(members, vec!["x", "y"]);
    }

    #[test]
    fn test_self_dependency() {
        let inputs = SystemInputs::new().with_agent(AgentDef::new("x").with_sub_agents(["x"]));
        let cycles = CycleDetector::new().detect(&linked(&inputs));

        assert_eq!(cycles.len(), 1);
        assert_eq!(ids(&cycles[0]), vec!["x", "x"]);
        assert_eq!(cycles[0].len(), 1);
    }

    #[test]
    fn test_cycle_path_is_suffix_of_branch() {
        // entry -> a -> b -> c -> a
        let inputs = SystemInputs::new()
            .with_agent(AgentDef::new("entry").with_sub_agents(["a"]))
            .with_agent(AgentDef::new("a").with_sub_agents(["b"]))
            .with_agent(AgentDef::new("b").with_sub_agents(["c"]))
            .with_agent(AgentDef::new("c").with_sub_agents(["a"]));
        let cycles = CycleDetector::new().detect(&linked(&inputs));

        assert_eq!(cycles.len(), 1);
        assert_eq!(ids(&cycles[0]), vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn test_one_cycle_per_root() {
        let inputs = SystemInputs::new()
            .with_agent(AgentDef::new("x").with_sub_agents(["y"]))
            .with_agent(AgentDef::new("y").with_sub_agents(["x"]))
            .with_agent(AgentDef::new("p").with_sub_agents(["p"]));
        let cycles = CycleDetector::new().detect(&linked(&inputs));

        assert_eq!(cycles.len(), 2);
        assert_eq!(ids(&cycles[1]), vec!["p", "p"]);
    }

    #[test]
    fn test_shared_descendant_is_not_a_cycle() {
        // Diamond: both branches reach d, which is visited but off-stack the
        // second time.
        let inputs = SystemInputs::new()
            .with_agent(AgentDef::new("a").with_sub_agents(["b", "c"]))
            .with_agent(AgentDef::new("b").with_sub_agents(["d"]))
            .with_agent(AgentDef::new("c").with_sub_agents(["d"]))
            .with_agent(AgentDef::new("d"));
        assert!(CycleDetector::new().detect(&linked(&inputs)).is_empty());
    }

    #[test]
    fn test_abandoned_branch_does_not_leak() {
        // Root x stops at its cycle with y still on its branch. Root z later
        // reaches y (visited) and must not report a cycle through it.
        let inputs = SystemInputs::new()
            .with_agent(AgentDef::new("x").with_sub_agents(["y"]))
            .with_agent(AgentDef::new("y").with_sub_agents(["x", "q"]))
            .with_agent(AgentDef::new("q"))
            .with_agent(AgentDef::new("z").with_sub_agents(["y"]));
        let cycles = CycleDetector::new().detect(&linked(&inputs));

        assert_eq!(cycles.len(), 1);
        assert_eq!(ids(&cycles[0]), vec!["x", "y", "x"]);
    }

    #[test]
    fn test_check_reports_all_cycles() {
        let inputs = SystemInputs::new()
            .with_agent(AgentDef::new("x").with_sub_agents(["y"]))
            .with_agent(AgentDef::new("y").with_sub_agents(["x"]));
        let err = CycleDetector::new().check(linked(&inputs)).unwrap_err();
        assert!(matches!(&err, PlanError::CircularDependency { cycles } if cycles.len() == 1));
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        // n0 -> n1 -> ... -> n49999, searched from n0 in one branch
        const DEPTH: usize = 50_000;
        let mut inputs = SystemInputs::new();
        for i in 0..DEPTH - 1 {
            inputs = inputs.with_agent(AgentDef::new(format!("n{i}")).with_sub_agents([format!("n{}", i + 1)]));
        }
        inputs = inputs.with_agent(AgentDef::new(format!("n{}", DEPTH - 1)));

        let graph = linked(&inputs);
        assert!(CycleDetector::new().detect(&graph).is_empty());
    }
}
