//! Dependency graph for a single run.
//!
//! `TaskGraph` owns every node of a run, keyed by id, and validates the
//! dependency structure with petgraph (dangling references, cycles). The
//! resolver is pure: given the set of satisfied ids it reports which nodes
//! are ready, that the run is done, or that it is structurally stuck.

use std::collections::{HashMap, HashSet};

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::node::{NodeId, TaskNode};
use crate::error::{Error, Result};

/// Outcome of a ready-set query.
///
/// `Deadlocked` is distinct from `Done`: non-terminal nodes remain but no
/// dependency set can ever be satisfied, so the run cannot make progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Batch {
    /// Nodes ready to dispatch, sorted by descending priority; ties keep
    /// plan arrival order.
    Ready(Vec<NodeId>),
    /// Every subtask has reached a terminal state.
    Done,
    /// Non-terminal subtasks remain but none are ready.
    Deadlocked,
}

/// The dependency graph of one run: root node plus planner subtasks.
///
/// Nodes live as graph weights in insertion order; an id index gives O(1)
/// lookup. Edges point dependency -> dependent and are wired once by
/// [`TaskGraph::link_dependencies`] after all nodes are added.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    graph: DiGraph<TaskNode, ()>,
    index: HashMap<NodeId, NodeIndex>,
    root: NodeIndex,
}

impl TaskGraph {
    /// Create a graph containing only the root mission node.
    pub fn new(objective: &str) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        let root_node = TaskNode::root(objective);
        let root_id = root_node.id.clone();
        let root = graph.add_node(root_node);
        index.insert(root_id, root);
        Self { graph, index, root }
    }

    /// Add a subtask node.
    ///
    /// Rejects duplicate ids and ids colliding with the root.
    pub fn add_node(&mut self, node: TaskNode) -> Result<()> {
        if node.id.is_root() {
            return Err(Error::InvalidPlan(format!(
                "subtask id collides with the root id '{}'",
                node.id
            )));
        }
        if self.index.contains_key(&node.id) {
            return Err(Error::InvalidPlan(format!(
                "duplicate subtask id '{}'",
                node.id
            )));
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        Ok(())
    }

    /// Wire dependency edges and validate the structure.
    ///
    /// Call once after all nodes are added. Rejects references to unknown
    /// ids, dependencies on the root, and dependency cycles.
    pub fn link_dependencies(&mut self) -> Result<()> {
        let pairs: Vec<(NodeIndex, NodeId)> = self
            .graph
            .node_indices()
            .filter(|&idx| idx != self.root)
            .flat_map(|idx| {
                self.graph[idx]
                    .dependencies
                    .iter()
                    .cloned()
                    .map(move |dep| (idx, dep))
            })
            .collect();

        for (dependent, dep_id) in pairs {
            if dep_id.is_root() {
                return Err(Error::InvalidPlan(format!(
                    "node '{}' depends on the root node",
                    self.graph[dependent].id
                )));
            }
            let dep_idx = self.index.get(&dep_id).copied().ok_or_else(|| {
                Error::InvalidPlan(format!(
                    "node '{}' depends on unknown id '{}'",
                    self.graph[dependent].id, dep_id
                ))
            })?;
            self.graph.add_edge(dep_idx, dependent, ());
        }

        if is_cyclic_directed(&self.graph) {
            return Err(Error::InvalidPlan(
                "dependency cycle detected".to_string(),
            ));
        }
        Ok(())
    }

    /// Get a node by id.
    pub fn get(&self, id: &NodeId) -> Option<&TaskNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    /// Get a mutable node by id.
    pub fn get_mut(&mut self, id: &NodeId) -> Option<&mut TaskNode> {
        self.index.get(id).copied().map(move |idx| &mut self.graph[idx])
    }

    /// The root mission node.
    pub fn root(&self) -> &TaskNode {
        &self.graph[self.root]
    }

    /// The root mission node, mutable.
    pub fn root_mut(&mut self) -> &mut TaskNode {
        &mut self.graph[self.root]
    }

    /// Iterate all nodes (root included) in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.graph.node_weights()
    }

    /// Iterate subtask nodes (root excluded) in plan order.
    pub fn subtasks(&self) -> impl Iterator<Item = &TaskNode> {
        let root = self.root;
        self.graph
            .node_indices()
            .filter(move |&idx| idx != root)
            .map(|idx| &self.graph[idx])
    }

    /// Number of subtask nodes.
    pub fn subtask_count(&self) -> usize {
        self.graph.node_count() - 1
    }

    /// Number of subtasks not yet in a terminal state.
    pub fn pending_count(&self) -> usize {
        self.subtasks().filter(|n| !n.is_terminal()).count()
    }

    /// Whether every subtask has reached a terminal state.
    pub fn all_terminal(&self) -> bool {
        self.subtasks().all(|n| n.is_terminal())
    }

    /// Idle subtasks whose full dependency set is contained in `satisfied`,
    /// in plan order.
    pub fn ready_nodes(&self, satisfied: &HashSet<NodeId>) -> Vec<NodeId> {
        self.subtasks()
            .filter(|n| !n.is_terminal())
            .filter(|n| n.dependencies.iter().all(|d| satisfied.contains(d)))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Resolve the next dispatch batch for the given satisfied set.
    pub fn next_batch(&self, satisfied: &HashSet<NodeId>) -> Batch {
        if self.all_terminal() {
            return Batch::Done;
        }
        let mut ready = self.ready_nodes(satisfied);
        if ready.is_empty() {
            return Batch::Deadlocked;
        }
        // Stable sort: ties keep plan arrival order.
        ready.sort_by_key(|id| {
            std::cmp::Reverse(self.get(id).map(|n| n.priority).unwrap_or(0))
        });
        Batch::Ready(ready)
    }
}
