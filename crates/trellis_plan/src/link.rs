//! Edge linking: resolve every dependency and fill in `dependents`.

use crate::error::{PlanError, PlanResult};
use crate::graph::{Graph, NodeSet};
use trellis_core::EntityId;

/// Resolves dependency IDs against the node set.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeLinker;

impl EdgeLinker {
    /// Create a new linker
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Link all edges
    ///
    /// `dependents` receives one entry per occurrence in `dependencies`, so
    /// it is the exact transpose. Nodes are visited in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedDependency` for the first dependency that names no
    /// agent or workflow. Tool IDs do not count as nodes.
    pub fn link(&self, set: NodeSet) -> PlanResult<Graph> {
        let NodeSet { mut nodes, tools } = set;

        let mut edges: Vec<(usize, EntityId)> = Vec::new();
        for (id, node) in &nodes {
            for dep in &node.dependencies {
                let Some(target) = nodes.get_index_of(dep.as_str()) else {
                    tracing::warn!(missing = %dep, node = %id, "unresolved dependency");
                    return Err(PlanError::UnresolvedDependency {
                        missing: dep.clone(),
                        referenced_by: id.clone(),
                    });
                };
                edges.push((target, id.clone()));
            }
        }

        let edge_count = edges.len();
        for (target, dependent) in edges {
            if let Some((_, node)) = nodes.get_index_mut(target) {
                node.dependents.push(dependent);
            }
        }

        tracing::debug!(nodes = nodes.len(), edges = edge_count, "linked dependency edges");
        Ok(Graph { nodes, tools })
    }
}
