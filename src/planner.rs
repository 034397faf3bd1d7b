//! Plan schema and the planning service seam.
//!
//! The planner is an external service (an LLM behind a trait object) that
//! decomposes an objective into subtasks. Its JSON output deserializes into
//! [`Plan`], which is validated once at acceptance and lowered into a
//! [`TaskGraph`]. Any structural problem is a planning failure; nothing is
//! retried or repaired.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::core::{clamp_priority, AgentType, NodeId, TaskGraph, TaskNode, DEFAULT_PRIORITY};
use crate::error::Result;

/// One subtask as emitted by the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTask {
    /// Planner-assigned slug, unique within the plan.
    pub id: String,
    /// Which agent specialization should execute the subtask.
    #[serde(rename = "agentType")]
    pub agent_type: AgentType,
    /// What the subtask should accomplish.
    pub description: String,
    /// Raw priority; clamped to 1-10 at acceptance, 5 when omitted.
    #[serde(default)]
    pub priority: Option<i64>,
    /// Ids of subtasks that must finish first.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// A full decomposition of an objective.
///
/// An empty subtask list is a valid plan; the run completes immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub objective: String,
    #[serde(default)]
    pub subtasks: Vec<PlannedTask>,
}

impl Plan {
    /// Parse a plan from the planner's JSON output.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate the plan and lower it into a run graph.
    ///
    /// Priorities are clamped here; duplicate ids, root-id collisions,
    /// dangling references and cycles all surface as
    /// [`Error::InvalidPlan`](crate::error::Error::InvalidPlan).
    pub fn into_graph(self, objective: &str) -> Result<TaskGraph> {
        let mut graph = TaskGraph::new(objective);
        for task in self.subtasks {
            let priority = task
                .priority
                .map(clamp_priority)
                .unwrap_or(DEFAULT_PRIORITY);
            let node = TaskNode::new(
                task.id,
                task.agent_type,
                task.description,
                priority,
                task.dependencies.into_iter().map(NodeId::new).collect(),
            );
            graph.add_node(node)?;
        }
        graph.link_dependencies()?;
        Ok(graph)
    }
}

/// Decomposes an objective into a [`Plan`].
///
/// Implementations wrap a concrete model backend. An error return is a
/// terminal planning failure for the run.
pub trait PlannerService: Send + Sync {
    fn plan_objective<'a>(&'a self, objective: &'a str) -> BoxFuture<'a, Result<Plan>>;
}
