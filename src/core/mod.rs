//! Core data model: task nodes and the run dependency graph.

pub mod graph;
pub mod node;

pub use graph::{Batch, TaskGraph};
pub use node::{
    clamp_priority, AgentType, NodeId, NodeStatus, TaskNode, DEFAULT_PRIORITY, MAX_PRIORITY,
    MIN_PRIORITY, ROOT_NODE_ID,
};
