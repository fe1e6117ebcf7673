//! Planner errors.
//!
//! Every stage aborts the whole pipeline on its first error. There is no
//! partial-success mode: any error means the system is not usable, even when
//! partial state is handed back for diagnostics.

use std::fmt;
use trellis_core::{CoreError, EntityId, EntityKind};

/// Boxed cause returned by a compile strategy
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Planner result type
pub type PlanResult<T> = Result<T, PlanError>;

/// A dependency loop. The first and last IDs are equal and denote the
/// closing edge, so a self-dependency is `[x, x]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CyclePath(Vec<EntityId>);

impl CyclePath {
    pub(crate) fn new(ids: Vec<EntityId>) -> Self {
        Self(ids)
    }

    /// IDs along the loop, closing ID included
    #[must_use]
    pub fn ids(&self) -> &[EntityId] {
        &self.0
    }

    /// Number of edges in the loop
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// True for a degenerate path with no edges
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct members of the loop, in path order
    #[must_use]
    pub fn members(&self) -> &[EntityId] {
        &self.0[..self.len()]
    }

    /// Check whether `id` is on the loop
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|member| member == id)
    }
}

impl fmt::Display for CyclePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

/// Planner error
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// A declared dependency matches no agent or workflow
    #[error("dependency '{missing}' not found for node '{referenced_by}'")]
    UnresolvedDependency {
        /// The ID that did not resolve
        missing: EntityId,
        /// The node declaring it
        referenced_by: EntityId,
    },

    /// One or more dependency loops
    #[error("circular dependencies detected: {}", join_cycles(.cycles))]
    CircularDependency {
        /// One loop per DFS root that found one
        cycles: Vec<CyclePath>,
    },

    /// The sorter placed fewer nodes than the graph holds
    #[error("topological sort placed {placed} of {total} nodes")]
    TopologicalInconsistency {
        /// Nodes placed in the order
        placed: usize,
        /// Nodes in the graph
        total: usize,
    },

    /// A compile strategy rejected a node
    #[error("failed to compile {kind} '{id}': {source}")]
    CompileFailure {
        /// Failing node
        id: EntityId,
        /// Its kind
        kind: EntityKind,
        /// The strategy's error
        #[source]
        source: BoxError,
    },

    /// Input validation failure
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Broken internal invariant
    #[error("internal planner error: {message}")]
    Internal {
        /// What went wrong
        message: String,
    },
}

impl PlanError {
    /// The cycles carried by a `CircularDependency`, empty otherwise
    #[must_use]
    pub fn cycles(&self) -> &[CyclePath] {
        match self {
            Self::CircularDependency { cycles } => cycles,
            _ => &[],
        }
    }
}

fn join_cycles(cycles: &[CyclePath]) -> String {
    cycles
        .iter()
        .map(|c| format!("[{c}]"))
        .collect::<Vec<_>>()
        .join(", ")
}
