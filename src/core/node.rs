//! Task node data model for the execution graph.
//!
//! Nodes are the atomic units of work assigned to specialized agents.
//! Each node tracks its status, priority, dependency ids, and results.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed id of the root mission node.
///
/// The root represents the overall objective. It holds the decomposition
/// as its children and is never subject to dependency resolution; it only
/// transitions around the planning call.
pub const ROOT_NODE_ID: &str = "mission-root";

/// Unique identifier for a node within a run.
///
/// Ids are planner-assigned slugs (e.g. `init_codebase`), stable for the
/// lifetime of a run and used by dependency references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id of the root mission node.
    pub fn root() -> Self {
        Self(ROOT_NODE_ID.to_string())
    }

    /// Check whether this id refers to the root node.
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_NODE_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Specialization tag identifying which executor handles a node.
///
/// This is a closed set: a plan referencing an unknown agent type is
/// rejected at validation time rather than carried as an open string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentType {
    #[serde(rename = "IdeaAgent")]
    Idea,
    #[serde(rename = "PlannerAgent")]
    Planner,
    #[serde(rename = "CoderAgent")]
    Coder,
    #[serde(rename = "NotebookAgent")]
    Notebook,
    #[serde(rename = "DataScienceAgent")]
    DataScience,
    #[serde(rename = "DataAnalysisAgent")]
    DataAnalysis,
    #[serde(rename = "VisualizerAgent")]
    Visualizer,
    #[serde(rename = "MediaAgent")]
    Media,
    #[serde(rename = "FinetuningAgent")]
    Finetuning,
}

impl AgentType {
    /// The wire/display name of the agent type.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Idea => "IdeaAgent",
            AgentType::Planner => "PlannerAgent",
            AgentType::Coder => "CoderAgent",
            AgentType::Notebook => "NotebookAgent",
            AgentType::DataScience => "DataScienceAgent",
            AgentType::DataAnalysis => "DataAnalysisAgent",
            AgentType::Visualizer => "VisualizerAgent",
            AgentType::Media => "MediaAgent",
            AgentType::Finetuning => "FinetuningAgent",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lowest allowed node priority.
pub const MIN_PRIORITY: u8 = 1;
/// Highest allowed node priority.
pub const MAX_PRIORITY: u8 = 10;
/// Priority assigned when the planner omits one.
pub const DEFAULT_PRIORITY: u8 = 5;

/// Clamp a raw planner priority into the 1-10 range.
pub fn clamp_priority(raw: i64) -> u8 {
    raw.clamp(MIN_PRIORITY as i64, MAX_PRIORITY as i64) as u8
}

/// Node status in its lifecycle.
///
/// Ordinary subtasks progress `Idle -> [Waiting] -> Executing -> {Completed | Failed}`.
/// The root node alone uses `Thinking` while the planning call is in flight.
/// `Waiting` is the human-in-the-loop gate for critical-priority nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum NodeStatus {
    /// Node created but not yet dispatched.
    Idle,
    /// Node is gated on explicit external approval before it may execute.
    Waiting,
    /// Planning in progress (root node only).
    Thinking,
    /// Node is currently being executed by an agent.
    Executing,
    /// Node completed successfully.
    Completed,
    /// Node failed with an error.
    Failed {
        /// Error message describing the failure.
        error: String,
    },
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl NodeStatus {
    /// Check if this is a terminal state (no outgoing transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Failed { .. })
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Idle => write!(f, "idle"),
            NodeStatus::Waiting => write!(f, "waiting"),
            NodeStatus::Thinking => write!(f, "thinking"),
            NodeStatus::Executing => write!(f, "executing"),
            NodeStatus::Completed => write!(f, "completed"),
            NodeStatus::Failed { error } => write!(f, "failed: {}", error),
        }
    }
}

/// A single unit of work in the execution graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNode {
    /// Unique identifier for this node.
    pub id: NodeId,
    /// Which agent specialization handles this node.
    pub agent_type: AgentType,
    /// Short human-readable label.
    pub label: String,
    /// What the node should accomplish.
    pub description: String,
    /// Current lifecycle status.
    pub status: NodeStatus,
    /// Priority 1-10; higher runs first among ready nodes.
    pub priority: u8,
    /// Ids of nodes that must reach a terminal state before this one is ready.
    pub dependencies: Vec<NodeId>,
    /// Result payload, present only after completion.
    pub output: Option<String>,
    /// Token usage reported by the executor, if any.
    pub tokens: Option<u64>,
    /// Cost reported by the executor, if any.
    pub cost: Option<f64>,
    /// When the node was created.
    pub created_at: DateTime<Utc>,
    /// When the node started execution.
    pub started_at: Option<DateTime<Utc>>,
    /// When the node reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskNode {
    /// Create a new idle node.
    ///
    /// The label defaults to the agent type's display name; all result
    /// and timing fields start unset.
    pub fn new(
        id: impl Into<String>,
        agent_type: AgentType,
        description: impl Into<String>,
        priority: u8,
        dependencies: Vec<NodeId>,
    ) -> Self {
        Self {
            id: NodeId::new(id),
            agent_type,
            label: agent_type.as_str().to_string(),
            description: description.into(),
            status: NodeStatus::Idle,
            priority,
            dependencies,
            output: None,
            tokens: None,
            cost: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Create the root mission node for an objective.
    pub fn root(objective: &str) -> Self {
        let mut node = Self::new(
            ROOT_NODE_ID,
            AgentType::Planner,
            objective,
            MAX_PRIORITY,
            Vec::new(),
        );
        node.label = "Mission Orchestrator".to_string();
        node
    }

    /// Check if the node is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the node's priority meets the given critical threshold
    /// and therefore requires explicit approval before executing.
    pub fn requires_approval(&self, threshold: u8) -> bool {
        self.priority >= threshold
    }

    /// Transition to `Waiting` (approval gate).
    ///
    /// Only an idle node may enter the gate.
    pub fn await_approval(&mut self) -> Result<()> {
        self.transition(NodeStatus::Waiting)
    }

    /// Transition to `Thinking` (root node, during planning).
    pub fn think(&mut self) -> Result<()> {
        self.transition(NodeStatus::Thinking)
    }

    /// Start execution: transition to `Executing` and record the start time.
    pub fn start(&mut self) -> Result<()> {
        self.transition(NodeStatus::Executing)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Mark the node completed with its output and usage.
    pub fn complete(
        &mut self,
        output: impl Into<String>,
        tokens: Option<u64>,
        cost: Option<f64>,
    ) -> Result<()> {
        self.transition(NodeStatus::Completed)?;
        self.output = Some(output.into());
        self.tokens = tokens;
        self.cost = cost;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Mark the node failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        self.transition(NodeStatus::Failed {
            error: error.into(),
        })?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Apply a status transition, enforcing the state machine.
    ///
    /// Rules: terminal states have no outgoing transitions, nothing
    /// re-enters `Idle`, `Thinking` is reachable only from `Idle`,
    /// `Waiting` only from `Idle`, and `Executing` only from `Idle`,
    /// `Waiting` or `Thinking`.
    fn transition(&mut self, next: NodeStatus) -> Result<()> {
        use NodeStatus::*;

        let allowed = match (&self.status, &next) {
            (_, Idle) => false,
            (s, _) if s.is_terminal() => false,
            (Idle, Waiting) | (Idle, Thinking) => true,
            (Idle, Executing) | (Waiting, Executing) | (Thinking, Executing) => true,
            (Idle, Completed) | (Idle, Failed { .. }) => false,
            (_, Completed) | (_, Failed { .. }) => true,
            _ => false,
        };

        if !allowed {
            return Err(Error::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}
