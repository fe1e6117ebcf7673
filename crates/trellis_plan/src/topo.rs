//! Topological ordering with Kahn's algorithm.
//!
//! The sorter works on a private copy of each node's in-degree and never
//! touches node state. Ready nodes are picked according to [`TieBreak`], so
//! the same graph always yields the same order.

use crate::error::{PlanError, PlanResult};
use crate::graph::{AcyclicGraph, Graph};
use crate::options::TieBreak;
use std::collections::{BTreeSet, VecDeque};
use trellis_core::EntityId;

/// Produces a compilation order consistent with every dependency edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologicalSorter {
    tie_break: TieBreak,
}

impl TopologicalSorter {
    /// Create a sorter with the given tie-break policy
    #[must_use]
    pub fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    /// Tie-break policy in use
    #[must_use]
    pub const fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Sort a cycle-checked graph
    ///
    /// # Errors
    ///
    /// Returns `TopologicalInconsistency` if fewer nodes were placed than the
    /// graph holds. That cannot happen for a graph that passed cycle
    /// detection and signals a broken invariant.
    pub fn sort(&self, graph: &AcyclicGraph) -> PlanResult<Vec<EntityId>> {
        self.sort_graph(graph.graph())
    }

    pub(crate) fn sort_graph(&self, graph: &Graph) -> PlanResult<Vec<EntityId>> {
        let mut in_degree: Vec<usize> = graph.nodes().values().map(|n| n.in_degree).collect();
        let mut ready = ReadyQueue::new(self.tie_break);

        for (index, (id, _)) in graph.nodes().iter().enumerate() {
            if in_degree[index] == 0 {
                ready.push(id, index);
            }
        }

        let mut order = Vec::with_capacity(graph.len());
        while let Some(current) = ready.pop() {
            let Some(node) = graph.node_at(current) else {
                continue;
            };
            order.push(node.id.clone());

            for dependent in &node.dependents {
                let Some(index) = graph.index_of(dependent.as_str()) else {
                    continue;
                };
                let degree = &mut in_degree[index];
                if *degree == 0 {
                    continue;
                }
                *degree -= 1;
                if *degree == 0 {
                    ready.push(dependent, index);
                }
            }
        }

        if order.len() != graph.len() {
            tracing::warn!(
                placed = order.len(),
                total = graph.len(),
                "topological sort did not place every node"
            );
            return Err(PlanError::TopologicalInconsistency {
                placed: order.len(),
                total: graph.len(),
            });
        }

        tracing::debug!(nodes = order.len(), tie_break = %self.tie_break, "computed compilation order");
        Ok(order)
    }
}

/// Nodes whose working in-degree reached zero
enum ReadyQueue<'g> {
    Lexical(BTreeSet<(&'g str, usize)>),
    Fifo(VecDeque<usize>),
}

impl<'g> ReadyQueue<'g> {
    fn new(tie_break: TieBreak) -> Self {
        match tie_break {
            TieBreak::Lexical => Self::Lexical(BTreeSet::new()),
            TieBreak::Declaration => Self::Fifo(VecDeque::new()),
        }
    }

    fn push(&mut self, id: &'g EntityId, index: usize) {
        match self {
            Self::Lexical(set) => {
                set.insert((id.as_str(), index));
            }
            Self::Fifo(queue) => queue.push_back(index),
        }
    }

    fn pop(&mut self) -> Option<usize> {
        match self {
            Self::Lexical(set) => set.pop_first().map(|(_, index)| index),
            Self::Fifo(queue) => queue.pop_front(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::GraphBuilder;
    use crate::cycle::CycleDetector;
    use crate::definition::{AgentDef, SystemInputs, WorkflowDef, WorkflowStep};
    use crate::link::EdgeLinker;

    fn linked(inputs: &SystemInputs) -> Graph {
        EdgeLinker::new().link(GraphBuilder::new().build(inputs)).unwrap()
    }

    fn sorted(inputs: &SystemInputs, tie_break: TieBreak) -> Vec<EntityId> {
        let graph = CycleDetector::new().check(linked(inputs)).unwrap();
        TopologicalSorter::new(tie_break).sort(&graph).unwrap()
    }

    fn position(order: &[EntityId], id: &str) -> usize {
        order.iter().position(|o| o == id).unwrap()
    }

    fn diamond() -> SystemInputs {
        SystemInputs::new()
            .with_agent(AgentDef::new("A").with_sub_agents(["B", "C"]))
            .with_agent(AgentDef::new("B").with_sub_agents(["D"]))
            .with_agent(AgentDef::new("C").with_sub_agents(["D"]))
            .with_agent(AgentDef::new("D"))
    }

    #[test]
    fn test_sort_empty() {
        assert!(sorted(&SystemInputs::new(), TieBreak::Lexical).is_empty());
    }

    #[test]
    fn test_sort_end_to_end_chain() {
        let inputs = SystemInputs::new()
            .with_agent(AgentDef::new("a1").with_tools(["search"]))
            .with_agent(AgentDef::new("a2").with_sub_agents(["a1"]))
            .with_workflow(WorkflowDef::new("w1").with_step(WorkflowStep::new("a2")));
        for tie_break in [TieBreak::Lexical, TieBreak::Declaration] {
            assert_eq!(sorted(&inputs, tie_break), vec!["a1", "a2", "w1"]);
        }
    }

    #[test]
    fn test_sort_diamond() {
        for tie_break in [TieBreak::Lexical, TieBreak::Declaration] {
            let order = sorted(&diamond(), tie_break);
            assert_eq!(order.len(), 4);
            assert!(position(&order, "D") < position(&order, "B"));
            assert!(position(&order, "D") < position(&order, "C"));
            assert!(position(&order, "B") < position(&order, "A"));
            assert!(position(&order, "C") < position(&order, "A"));
        }
        assert_eq!(sorted(&diamond(), TieBreak::Lexical), vec!["D", "B", "C", "A"]);
    }

    #[test]
    fn test_lexical_tie_break() {
        let inputs = SystemInputs::new()
            .with_agent(AgentDef::new("zeta"))
            .with_agent(AgentDef::new("beta"))
            .with_agent(AgentDef::new("alpha").with_sub_agents(["zeta"]))
            .with_agent(AgentDef::new("gamma"));
        assert_eq!(
            sorted(&inputs, TieBreak::Lexical),
            vec!["beta", "gamma", "zeta", "alpha"]
        );
    }

    #[test]
    fn test_declaration_tie_break() {
        let inputs = SystemInputs::new()
            .with_agent(AgentDef::new("zeta"))
            .with_agent(AgentDef::new("beta"))
            .with_agent(AgentDef::new("alpha").with_sub_agents(["zeta"]))
            .with_agent(AgentDef::new("gamma"));
        assert_eq!(
            sorted(&inputs, TieBreak::Declaration),
            vec!["zeta", "beta", "gamma", "alpha"]
        );
    }

    #[test]
    fn test_duplicate_dependencies_release_once() {
        let inputs = SystemInputs::new()
            .with_agent(AgentDef::new("b"))
            .with_agent(AgentDef::new("a").with_sub_agents(["b", "b"]));
        assert_eq!(sorted(&inputs, TieBreak::Lexical), vec!["b", "a"]);
    }

    #[test]
    fn test_sort_does_not_mutate_in_degree() {
        let graph = CycleDetector::new().check(linked(&diamond())).unwrap();
        TopologicalSorter::default().sort(&graph).unwrap();
        assert_eq!(graph.graph().get("A").unwrap().in_degree, 2);
        assert_eq!(graph.graph().get("B").unwrap().in_degree, 1);
    }

    #[test]
    fn test_unchecked_cycle_is_inconsistent() {
        let inputs = SystemInputs::new()
            .with_agent(AgentDef::new("free"))
            .with_agent(AgentDef::new("x").with_sub_agents(["y"]))
            .with_agent(AgentDef::new("y").with_sub_agents(["x"]));
        let err = TopologicalSorter::default()
            .sort_graph(&linked(&inputs))
            .unwrap_err();
        assert!(matches!(
            err,
            PlanError::TopologicalInconsistency { placed: 1, total: 3 }
        ));
    }
}
