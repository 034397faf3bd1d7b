//! Run lifecycle control surface.
//!
//! `RunController` owns the shared [`RunState`] and the signalling
//! machinery (pause flag, approval wakeups, cancellation token) that the
//! spawned [`Scheduler`](crate::orchestration::scheduler::Scheduler) reacts
//! to. Consumers never see the live state; `observe()` hands out cloned
//! snapshots.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::clog;
use crate::config::RunConfig;
use crate::core::{NodeId, NodeStatus, TaskGraph, TaskNode};
use crate::error::{Error, Result};
use crate::events::{ExecutionLog, LogEntry, Severity};
use crate::executor::AgentExecutor;
use crate::orchestration::scheduler::Scheduler;
use crate::planner::PlannerService;

/// Overall phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// No run has been started.
    Idle,
    /// The planner call is in flight.
    Planning,
    /// Subtasks are being dispatched.
    Running,
    /// Every subtask reached a terminal status.
    Completed,
    /// Non-terminal subtasks remain but none can ever become ready.
    Blocked,
    /// Planning failed; no subtask was executed.
    Failed,
    /// The run was aborted.
    Cancelled,
}

impl RunPhase {
    /// Whether the phase is final for its run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunPhase::Completed | RunPhase::Blocked | RunPhase::Failed | RunPhase::Cancelled
        )
    }

    /// Whether a run is currently in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, RunPhase::Planning | RunPhase::Running)
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunPhase::Idle => "idle",
            RunPhase::Planning => "planning",
            RunPhase::Running => "running",
            RunPhase::Completed => "completed",
            RunPhase::Blocked => "blocked",
            RunPhase::Failed => "failed",
            RunPhase::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// The live state of a run.
///
/// Owned by the controller behind a lock; the scheduler mutates it only
/// through its generation-guarded entry point.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Identity of the run; regenerated on every `start()`.
    pub generation: Uuid,
    pub objective: String,
    pub phase: RunPhase,
    pub paused: bool,
    /// The node currently executing or awaiting approval. Returns to the
    /// root when a run finishes or blocks; cleared by `abort()`.
    pub active_node: Option<NodeId>,
    pub graph: TaskGraph,
    pub log: ExecutionLog,
    pub total_tokens: u64,
    pub total_cost: f64,
    /// Nodes whose approval gate has been released.
    pub approved: HashSet<NodeId>,
    pub enabled_tools: Vec<String>,
}

impl RunState {
    /// The state before any run has started.
    pub fn idle() -> Self {
        Self {
            generation: Uuid::new_v4(),
            objective: String::new(),
            phase: RunPhase::Idle,
            paused: false,
            active_node: None,
            graph: TaskGraph::new(""),
            log: ExecutionLog::new(),
            total_tokens: 0,
            total_cost: 0.0,
            approved: HashSet::new(),
            enabled_tools: Vec::new(),
        }
    }

    /// Reset wholesale for a new run.
    fn reset(&mut self, objective: &str, generation: Uuid, enabled_tools: Vec<String>) {
        self.generation = generation;
        self.objective = objective.to_string();
        self.phase = RunPhase::Planning;
        self.paused = false;
        self.active_node = None;
        self.graph = TaskGraph::new(objective);
        self.log = ExecutionLog::new();
        self.total_tokens = 0;
        self.total_cost = 0.0;
        self.approved.clear();
        self.enabled_tools = enabled_tools;
    }

    /// Clone the externally visible state.
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            generation: self.generation,
            objective: self.objective.clone(),
            phase: self.phase,
            paused: self.paused,
            active_node: self.active_node.clone(),
            nodes: self.graph.nodes().cloned().collect(),
            log: self.log.entries().to_vec(),
            total_tokens: self.total_tokens,
            total_cost: self.total_cost,
        }
    }
}

/// A consistent point-in-time view of a run.
///
/// `nodes` starts with the root and then follows plan order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub generation: Uuid,
    pub objective: String,
    pub phase: RunPhase,
    pub paused: bool,
    pub active_node: Option<NodeId>,
    pub nodes: Vec<TaskNode>,
    pub log: Vec<LogEntry>,
    pub total_tokens: u64,
    pub total_cost: f64,
}

impl RunSnapshot {
    /// Look up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&TaskNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// The root mission node.
    pub fn root(&self) -> Option<&TaskNode> {
        self.nodes.iter().find(|n| n.id.is_root())
    }

    /// Nodes currently parked at the approval gate.
    pub fn waiting(&self) -> Vec<&TaskNode> {
        self.nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Waiting)
            .collect()
    }
}

/// Owns run lifecycle: start, pause/resume, approve, abort, observe.
///
/// One controller manages at most one run at a time; `start()` on an
/// active run fails fast with [`Error::RunInProgress`].
pub struct RunController {
    state: Arc<RwLock<RunState>>,
    planner: Arc<dyn PlannerService>,
    executor: Arc<dyn AgentExecutor>,
    config: RunConfig,
    pause_tx: watch::Sender<bool>,
    approvals: Arc<Notify>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RunController {
    pub fn new(
        planner: Arc<dyn PlannerService>,
        executor: Arc<dyn AgentExecutor>,
        config: RunConfig,
    ) -> Self {
        let (pause_tx, _) = watch::channel(false);
        Self {
            state: Arc::new(RwLock::new(RunState::idle())),
            planner,
            executor,
            config,
            pause_tx,
            approvals: Arc::new(Notify::new()),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Start a run for the given objective.
    ///
    /// Fails fast if a run is active; a finished or cancelled run may be
    /// superseded freely. Resets the run state wholesale under a fresh
    /// generation, so any stale mutation from a previous run is discarded.
    pub async fn start(&mut self, objective: &str) -> Result<()> {
        let generation = Uuid::new_v4();
        {
            let mut state = self.state.write().await;
            if state.phase.is_active() {
                return Err(Error::RunInProgress);
            }
            state.reset(objective, generation, self.config.enabled_tools.clone());
            state.log.push(
                "System",
                format!("Mission accepted: {}", objective),
                Severity::Info,
            );
            state.log.push(
                "Mission Orchestrator",
                "Decomposing objective into a task plan",
                Severity::Thought,
            );
        }

        // Leftover token from a finished/aborted run; harmless to cancel.
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.pause_tx.send_replace(false);

        let scheduler = Scheduler::new(
            Arc::clone(&self.state),
            Arc::clone(&self.planner),
            Arc::clone(&self.executor),
            self.config.clone(),
            self.pause_tx.subscribe(),
            Arc::clone(&self.approvals),
            self.cancel.clone(),
            generation,
        );
        self.task = Some(tokio::spawn(scheduler.run()));
        clog!("Run {} started: {}", generation, objective);
        Ok(())
    }

    /// Halt dispatch after the in-flight node, if any, settles.
    pub async fn pause(&self) {
        self.pause_tx.send_replace(true);
        let mut state = self.state.write().await;
        if state.phase.is_active() && !state.paused {
            state.paused = true;
            state
                .log
                .push("System", "Execution paused", Severity::Warning);
        }
    }

    /// Resume dispatch.
    pub async fn resume(&self) {
        self.pause_tx.send_replace(false);
        let mut state = self.state.write().await;
        if state.paused {
            state.paused = false;
            state.log.push("System", "Execution resumed", Severity::Info);
        }
    }

    /// Release the approval gate for a waiting node.
    pub async fn approve(&self, id: &NodeId) -> Result<()> {
        {
            let mut state = self.state.write().await;
            let label = match state.graph.get(id) {
                None => return Err(Error::NodeNotFound(id.clone())),
                Some(node) if node.status != NodeStatus::Waiting => {
                    return Err(Error::NotAwaitingApproval(id.clone()))
                }
                Some(node) => node.label.clone(),
            };
            state.approved.insert(id.clone());
            state
                .log
                .push(label, "Approval granted", Severity::Info);
        }
        self.approvals.notify_waiters();
        clog!("Node '{}' approved", id);
        Ok(())
    }

    /// Cancel the current run. A no-op when no run is active.
    pub async fn abort(&self) {
        // Cancel first: the scheduler's guarded mutations are rejected
        // from this point on, so the phase written below sticks.
        self.cancel.cancel();
        {
            let mut state = self.state.write().await;
            if state.phase.is_active() {
                state.phase = RunPhase::Cancelled;
                state.paused = false;
                state.active_node = None;
                state
                    .log
                    .push("System", "Mission cancelled", Severity::Warning);
                clog!("Run {} cancelled", state.generation);
            }
        }
        self.pause_tx.send_replace(false);
        self.approvals.notify_waiters();
    }

    /// A consistent snapshot of the run, safe to call at any time.
    pub async fn observe(&self) -> RunSnapshot {
        let state = self.state.read().await;
        state.snapshot()
    }

    /// Wait for the in-flight run task to finish.
    pub async fn join(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| Error::Execution(format!("run task aborted: {}", e)))?;
        }
        Ok(())
    }
}
