//! Dependency graph types.
//!
//! Each pipeline stage produces a richer type than it consumes:
//! [`NodeSet`] (built, unlinked) → [`Graph`] (linked) → [`AcyclicGraph`]
//! (cycle-checked) → [`BuildPlan`] (ordered). Only the orchestrator mutates
//! node state after that, and only through a plan it owns.

use indexmap::{IndexMap, IndexSet};
use trellis_core::{EntityId, EntityKind, Hash};

/// Where a compiled node's artifact lives: an index into the registry for
/// its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactSlot {
    /// Registry the artifact is stored in
    pub kind: EntityKind,
    /// Position within that registry
    pub index: usize,
}

/// Per-node compilation state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// Not yet reached
    #[default]
    Pending,
    /// Strategy currently running
    Compiling,
    /// Compiled; artifact stored at the slot
    Compiled(ArtifactSlot),
    /// Strategy returned an error
    Failed,
}

/// One agent or workflow in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Unique node ID
    pub id: EntityId,
    /// Node kind
    pub kind: EntityKind,
    /// IDs this node requires, in declaration order. May repeat for agents.
    pub dependencies: Vec<EntityId>,
    /// IDs requiring this node, mirroring `dependencies` multiplicity
    pub dependents: Vec<EntityId>,
    /// `dependencies.len()` at build time
    pub in_degree: usize,
    state: NodeState,
}

impl Node {
    pub(crate) fn new(id: EntityId, kind: EntityKind, dependencies: Vec<EntityId>) -> Self {
        Self {
            id,
            kind,
            in_degree: dependencies.len(),
            dependencies,
            dependents: Vec::new(),
            state: NodeState::Pending,
        }
    }

    /// Current compilation state
    #[must_use]
    pub const fn state(&self) -> NodeState {
        self.state
    }

    /// True once the orchestrator stored this node's artifact
    #[must_use]
    pub const fn is_compiled(&self) -> bool {
        matches!(self.state, NodeState::Compiled(_))
    }

    /// Location of the compiled artifact, if any
    #[must_use]
    pub const fn artifact(&self) -> Option<ArtifactSlot> {
        match self.state {
            NodeState::Compiled(slot) => Some(slot),
            _ => None,
        }
    }

    pub(crate) fn set_state(&mut self, state: NodeState) {
        self.state = state;
    }
}

/// Built nodes before edge linking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    pub(crate) nodes: IndexMap<EntityId, Node>,
    pub(crate) tools: IndexSet<EntityId>,
}

impl NodeSet {
    /// Nodes in declaration order
    #[must_use]
    pub fn nodes(&self) -> &IndexMap<EntityId, Node> {
        &self.nodes
    }

    /// Known tool IDs. Existence only; tools are never nodes.
    #[must_use]
    pub fn tools(&self) -> &IndexSet<EntityId> {
        &self.tools
    }

    /// Get node by ID
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Node count
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if there are no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A linked graph: every dependency resolves and `dependents` is populated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    pub(crate) nodes: IndexMap<EntityId, Node>,
    pub(crate) tools: IndexSet<EntityId>,
}

impl Graph {
    /// Nodes in declaration order
    #[must_use]
    pub fn nodes(&self) -> &IndexMap<EntityId, Node> {
        &self.nodes
    }

    /// Known tool IDs
    #[must_use]
    pub fn tools(&self) -> &IndexSet<EntityId> {
        &self.tools
    }

    /// Get node by ID
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Check whether `id` names a tool
    #[must_use]
    pub fn is_tool(&self, id: &str) -> bool {
        self.tools.contains(id)
    }

    /// Node count
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if there are no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total dependency edges, duplicates included
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.dependencies.len()).sum()
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.get_index_of(id)
    }

    pub(crate) fn node_at(&self, index: usize) -> Option<&Node> {
        self.nodes.get_index(index).map(|(_, node)| node)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }
}

/// A linked graph proven free of cycles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcyclicGraph(Graph);

impl AcyclicGraph {
    pub(crate) fn new(graph: Graph) -> Self {
        Self(graph)
    }

    /// Borrow the graph
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.0
    }

    /// Unwrap the graph
    #[must_use]
    pub fn into_inner(self) -> Graph {
        self.0
    }
}

/// A validated graph plus its compilation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    graph: Graph,
    order: Vec<EntityId>,
}

impl BuildPlan {
    pub(crate) fn new(graph: AcyclicGraph, order: Vec<EntityId>) -> Self {
        Self {
            graph: graph.into_inner(),
            order,
        }
    }

    /// The linked graph
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Node IDs, every dependency before its dependents
    #[must_use]
    pub fn order(&self) -> &[EntityId] {
        &self.order
    }

    /// Get node by ID
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.graph.get(id)
    }

    /// True when every node reached `Compiled`
    #[must_use]
    pub fn is_fully_compiled(&self) -> bool {
        self.graph.nodes.values().all(Node::is_compiled)
    }

    /// Stable fingerprint over the order and each node's kind and
    /// dependencies. Identical inputs and options give identical
    /// fingerprints.
    #[must_use]
    pub fn fingerprint(&self) -> Hash {
        let mut hash = Hash::empty();
        for id in &self.order {
            hash = hash.absorb(id.as_str().as_bytes());
            let Some(node) = self.graph.get(id.as_str()) else {
                continue;
            };
            hash = hash
                .absorb(node.kind.as_str().as_bytes())
                .absorb(&(node.dependencies.len() as u64).to_le_bytes());
            for dep in &node.dependencies {
                hash = hash.absorb(dep.as_str().as_bytes());
            }
        }
        hash
    }
}
