//! Agent execution seam.
//!
//! The scheduler hands each ready node to an [`AgentExecutor`] together
//! with the run's cumulative context and the enabled tool names. The
//! concrete implementation (model calls, tool use) lives outside this
//! crate behind the trait object.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::core::AgentType;
use crate::error::Result;

/// Result of executing one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Result text, appended to the run's cumulative context.
    pub text: String,
    /// Tokens consumed, if the backend reports usage.
    pub tokens: Option<u64>,
    /// Cost incurred, if the backend reports it.
    pub cost: Option<f64>,
}

impl TaskOutput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tokens: None,
            cost: None,
        }
    }

    pub fn with_usage(mut self, tokens: u64, cost: f64) -> Self {
        self.tokens = Some(tokens);
        self.cost = Some(cost);
        self
    }
}

/// Executes a single node's work.
///
/// `context` is the cumulative context built from prior completions;
/// `tools` is the run's enabled tool names. An error return fails the
/// node but not the run.
pub trait AgentExecutor: Send + Sync {
    fn run<'a>(
        &'a self,
        agent_type: AgentType,
        description: &'a str,
        context: &'a str,
        tools: &'a [String],
    ) -> BoxFuture<'a, Result<TaskOutput>>;
}
