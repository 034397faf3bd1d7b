//! Scripted planner and executor fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;

use convoy::core::AgentType;
use convoy::executor::{AgentExecutor, TaskOutput};
use convoy::planner::{Plan, PlannedTask, PlannerService};
use convoy::{Error, Result, RunConfig, RunController, RunSnapshot};

/// Build a planned subtask with the fixture description convention
/// (`"<id> work"`), which the executor fakes key their behaviors on.
pub fn task(id: &str, agent: AgentType, priority: i64, deps: &[&str]) -> PlannedTask {
    PlannedTask {
        id: id.to_string(),
        agent_type: agent,
        description: format!("{} work", id),
        priority: Some(priority),
        dependencies: deps.iter().map(|d| d.to_string()).collect(),
    }
}

/// Planner that always returns the same canned plan.
pub struct ScriptedPlanner {
    plan: Plan,
}

impl ScriptedPlanner {
    pub fn new(objective: &str, subtasks: Vec<PlannedTask>) -> Self {
        Self {
            plan: Plan {
                objective: objective.to_string(),
                subtasks,
            },
        }
    }
}

impl PlannerService for ScriptedPlanner {
    fn plan_objective<'a>(&'a self, _objective: &'a str) -> BoxFuture<'a, Result<Plan>> {
        let plan = self.plan.clone();
        Box::pin(async move { Ok(plan) })
    }
}

/// Per-node behavior for the scripted executor.
#[derive(Clone)]
pub struct Behavior {
    pub text: String,
    pub tokens: u64,
    pub cost: f64,
    pub fail: Option<String>,
    pub delay: Duration,
}

impl Behavior {
    pub fn succeed(text: &str) -> Self {
        Self {
            text: text.to_string(),
            tokens: 0,
            cost: 0.0,
            fail: None,
            delay: Duration::ZERO,
        }
    }

    pub fn with_usage(mut self, tokens: u64, cost: f64) -> Self {
        self.tokens = tokens;
        self.cost = cost;
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail: Some(message.to_string()),
            ..Self::succeed("")
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// One recorded executor invocation.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub agent_type: AgentType,
    pub description: String,
    pub context: String,
    pub tools: Vec<String>,
}

/// Executor whose behavior is scripted per node description.
///
/// Unscripted descriptions echo `"<description> done"` with no usage.
/// Calls are recorded before any delay, so an aborted in-flight call is
/// still visible to assertions.
#[derive(Default)]
pub struct ScriptedExecutor {
    behaviors: Mutex<HashMap<String, Behavior>>,
    calls: Arc<Mutex<Vec<CallRecord>>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the behavior for the node with the given id (fixture
    /// description convention).
    pub fn script(&self, id: &str, behavior: Behavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(format!("{} work", id), behavior);
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<CallRecord>>> {
        Arc::clone(&self.calls)
    }

    /// Descriptions in dispatch order.
    pub fn dispatch_order(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.description.clone())
            .collect()
    }
}

impl AgentExecutor for ScriptedExecutor {
    fn run<'a>(
        &'a self,
        agent_type: AgentType,
        description: &'a str,
        context: &'a str,
        tools: &'a [String],
    ) -> BoxFuture<'a, Result<TaskOutput>> {
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(description)
            .cloned()
            .unwrap_or_else(|| Behavior::succeed(&format!("{} done", description)));
        self.calls.lock().unwrap().push(CallRecord {
            agent_type,
            description: description.to_string(),
            context: context.to_string(),
            tools: tools.to_vec(),
        });
        Box::pin(async move {
            if !behavior.delay.is_zero() {
                tokio::time::sleep(behavior.delay).await;
            }
            if let Some(message) = behavior.fail {
                return Err(Error::Execution(message));
            }
            Ok(TaskOutput {
                text: behavior.text,
                tokens: Some(behavior.tokens),
                cost: Some(behavior.cost),
            })
        })
    }
}

/// Config with pacing disabled so tests run at full speed.
pub fn fast_config() -> RunConfig {
    RunConfig {
        pacing_ms: 0,
        ..RunConfig::default()
    }
}

/// Poll `observe()` until the predicate holds.
pub async fn wait_until(controller: &RunController, f: impl Fn(&RunSnapshot) -> bool) {
    for _ in 0..500 {
        if f(&controller.observe().await) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}
