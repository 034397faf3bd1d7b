//! The run loop: plans the objective, then drives subtasks to terminal
//! states one at a time.
//!
//! The scheduler owns no state of its own beyond the satisfied-id set and
//! the cumulative context; everything observable lives in the shared
//! [`RunState`] and is mutated only through a generation-guarded entry
//! point, so a scheduler that has been superseded or cancelled can never
//! touch a newer run's state.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{watch, Notify, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::RunConfig;
use crate::core::{Batch, NodeId};
use crate::error::{Error, Result};
use crate::events::Severity;
use crate::executor::{AgentExecutor, TaskOutput};
use crate::orchestration::controller::{RunPhase, RunState};
use crate::planner::PlannerService;
use crate::{clog_debug, clog_error};

/// Outcome of one executor call, separating cancellation from results.
enum ExecOutcome {
    Finished(Result<TaskOutput>),
    Cancelled,
}

/// Drives a single run to a terminal phase.
///
/// Constructed by [`RunController::start`](crate::orchestration::RunController::start)
/// and consumed by its spawned task.
pub struct Scheduler {
    state: Arc<RwLock<RunState>>,
    planner: Arc<dyn PlannerService>,
    executor: Arc<dyn AgentExecutor>,
    config: RunConfig,
    pause_rx: watch::Receiver<bool>,
    approvals: Arc<Notify>,
    cancel: CancellationToken,
    generation: Uuid,
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        state: Arc<RwLock<RunState>>,
        planner: Arc<dyn PlannerService>,
        executor: Arc<dyn AgentExecutor>,
        config: RunConfig,
        pause_rx: watch::Receiver<bool>,
        approvals: Arc<Notify>,
        cancel: CancellationToken,
        generation: Uuid,
    ) -> Self {
        Self {
            state,
            planner,
            executor,
            config,
            pause_rx,
            approvals,
            cancel,
            generation,
        }
    }

    /// Run planning then execution until the run reaches a terminal phase,
    /// is cancelled, or is superseded by a newer generation.
    pub async fn run(mut self) {
        clog_debug!("scheduler: run {} starting", self.generation);
        if !self.plan_phase().await {
            return;
        }
        self.execute_phase().await;
    }

    /// Apply a mutation to the run state.
    ///
    /// Returns `None` without mutating when the state belongs to a newer
    /// run or this run has been cancelled. Every scheduler-side write goes
    /// through here.
    async fn update<T>(&self, f: impl FnOnce(&mut RunState) -> T) -> Option<T> {
        let mut state = self.state.write().await;
        if state.generation != self.generation || self.cancel.is_cancelled() {
            return None;
        }
        Some(f(&mut state))
    }

    /// Block while the pause flag is set. Returns `false` on cancellation.
    async fn wait_while_paused(&mut self) -> bool {
        loop {
            if !*self.pause_rx.borrow() {
                return true;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                changed = self.pause_rx.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
    }

    /// Sleep the configured pacing delay. Returns `false` on cancellation.
    async fn pace(&self) -> bool {
        let pacing = self.config.pacing();
        if pacing.is_zero() {
            return true;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(pacing) => true,
        }
    }

    /// Planning: ask the planner for a decomposition and install the
    /// resulting graph. Returns `false` if the run should not proceed.
    async fn plan_phase(&mut self) -> bool {
        let objective = {
            let state = self.state.read().await;
            state.objective.clone()
        };

        let applied = self
            .update(|state| {
                if let Err(e) = state.graph.root_mut().think() {
                    clog_error!("scheduler: root transition failed: {}", e);
                }
            })
            .await;
        if applied.is_none() {
            return false;
        }

        let planned = tokio::select! {
            _ = self.cancel.cancelled() => return false,
            result = self.planner.plan_objective(&objective) => result,
        };

        let graph = planned.and_then(|plan| plan.into_graph(&objective));
        match graph {
            Ok(mut graph) => {
                let count = graph.subtask_count();
                clog_debug!(
                    "scheduler: plan accepted, {} subtasks for run {}",
                    count,
                    self.generation
                );
                self.update(move |state| {
                    // Carry the live root (already Thinking, with its
                    // timestamps) into the freshly built graph.
                    *graph.root_mut() = state.graph.root().clone();
                    state.graph = graph;
                    if let Err(e) = state.graph.root_mut().complete(
                        format!("Mission decomposed into {} subtasks", count),
                        None,
                        None,
                    ) {
                        clog_error!("scheduler: root completion failed: {}", e);
                    }
                    state.phase = RunPhase::Running;
                    state.log.push(
                        "System",
                        format!("Plan accepted with {} subtasks", count),
                        Severity::Success,
                    );
                })
                .await
                .is_some()
            }
            Err(e) => {
                let msg = e.to_string();
                clog_error!("scheduler: planning failed: {}", msg);
                self.update(|state| {
                    if let Err(e) = state.graph.root_mut().fail(&msg) {
                        clog_error!("scheduler: root failure transition failed: {}", e);
                    }
                    state.phase = RunPhase::Failed;
                    state.log.push(
                        "System",
                        format!("Mission planning failed: {}", msg),
                        Severity::Error,
                    );
                })
                .await;
                false
            }
        }
    }

    /// Execution: dispatch ready nodes one at a time until done, blocked,
    /// cancelled, or superseded.
    async fn execute_phase(&mut self) {
        let objective = {
            let state = self.state.read().await;
            state.objective.clone()
        };

        let mut satisfied: HashSet<NodeId> = HashSet::new();
        let mut context = format!("Project: {}\n", objective);

        loop {
            if !self.wait_while_paused().await {
                return;
            }

            let batch = {
                let state = self.state.read().await;
                state.graph.next_batch(&satisfied)
            };

            let id = match batch {
                Batch::Done => {
                    clog_debug!("scheduler: run {} complete", self.generation);
                    self.update(|state| {
                        state.phase = RunPhase::Completed;
                        state.active_node = Some(NodeId::root());
                        state
                            .log
                            .push("System", "Mission complete", Severity::Success);
                    })
                    .await;
                    return;
                }
                Batch::Deadlocked => {
                    clog_error!("scheduler: run {} deadlocked", self.generation);
                    self.update(|state| {
                        state.phase = RunPhase::Blocked;
                        state.active_node = Some(NodeId::root());
                        state.log.push(
                            "System",
                            "Execution stalled: remaining tasks can never become ready",
                            Severity::Error,
                        );
                    })
                    .await;
                    return;
                }
                Batch::Ready(ids) => match ids.into_iter().next() {
                    Some(id) => id,
                    None => continue,
                },
            };

            if !self.dispatch(&id, &mut satisfied, &mut context).await {
                return;
            }
            if !self.pace().await {
                return;
            }
        }
    }

    /// Drive one node from idle to a terminal status.
    ///
    /// Returns `false` when the run was cancelled or superseded.
    async fn dispatch(
        &mut self,
        id: &NodeId,
        satisfied: &mut HashSet<NodeId>,
        context: &mut String,
    ) -> bool {
        let (agent_type, label, description, approved) = {
            let state = self.state.read().await;
            let Some(node) = state.graph.get(id) else {
                clog_error!("scheduler: ready id '{}' missing from graph", id);
                return true;
            };
            (
                node.agent_type,
                node.label.clone(),
                node.description.clone(),
                state.approved.contains(id),
            )
        };

        let needs_approval = {
            let state = self.state.read().await;
            state
                .graph
                .get(id)
                .map(|n| n.requires_approval(self.config.approval_threshold))
                .unwrap_or(false)
        };

        if needs_approval && !approved {
            if !self.gate_on_approval(id, &label).await {
                return false;
            }
            if !self.wait_while_paused().await {
                return false;
            }
        }

        let started = self
            .update(|state| {
                if let Some(node) = state.graph.get_mut(id) {
                    if let Err(e) = node.start() {
                        clog_error!("scheduler: start transition failed for '{}': {}", id, e);
                    }
                }
                state.active_node = Some(id.clone());
                state.log.push(
                    label.clone(),
                    format!("Executing: {}", description),
                    Severity::Info,
                );
            })
            .await;
        if started.is_none() {
            return false;
        }

        let tools = {
            let state = self.state.read().await;
            state.enabled_tools.clone()
        };

        let outcome = self
            .run_executor(agent_type, &description, context, &tools)
            .await;

        let result = match outcome {
            ExecOutcome::Cancelled => return false,
            ExecOutcome::Finished(result) => result,
        };

        match result {
            Ok(output) => {
                context.push_str(&format!("\n[{} Result]: {}", agent_type, output.text));
                satisfied.insert(id.clone());
                let applied = self
                    .update(|state| {
                        if let Some(node) = state.graph.get_mut(id) {
                            if let Err(e) =
                                node.complete(output.text.clone(), output.tokens, output.cost)
                            {
                                clog_error!(
                                    "scheduler: completion transition failed for '{}': {}",
                                    id,
                                    e
                                );
                            }
                        }
                        state.total_tokens += output.tokens.unwrap_or(0);
                        state.total_cost += output.cost.unwrap_or(0.0);
                        state.active_node = None;
                        state.log.push(label.clone(), output.text.clone(), Severity::Success);
                    })
                    .await;
                applied.is_some()
            }
            Err(e) => {
                let msg = e.to_string();
                clog_error!("scheduler: node '{}' failed: {}", id, msg);
                if self.config.failed_unblocks_dependents {
                    satisfied.insert(id.clone());
                }
                let applied = self
                    .update(|state| {
                        if let Some(node) = state.graph.get_mut(id) {
                            if let Err(e) = node.fail(&msg) {
                                clog_error!(
                                    "scheduler: failure transition failed for '{}': {}",
                                    id,
                                    e
                                );
                            }
                        }
                        state.active_node = None;
                        state.log.push(
                            label.clone(),
                            format!("Task failed: {}", msg),
                            Severity::Error,
                        );
                    })
                    .await;
                applied.is_some()
            }
        }
    }

    /// Park the node in `Waiting` until it is approved.
    ///
    /// Returns `false` on cancellation or supersession. The whole run
    /// stalls here: dispatch is sequential and the gated node is the
    /// highest-priority ready node.
    async fn gate_on_approval(&mut self, id: &NodeId, label: &str) -> bool {
        let parked = self
            .update(|state| {
                if let Some(node) = state.graph.get_mut(id) {
                    if let Err(e) = node.await_approval() {
                        clog_error!("scheduler: waiting transition failed for '{}': {}", id, e);
                    }
                }
                state.active_node = Some(id.clone());
                state.log.push(
                    label.to_string(),
                    "Awaiting approval for critical-priority task",
                    Severity::Warning,
                );
            })
            .await;
        if parked.is_none() {
            return false;
        }

        loop {
            // Register interest before checking, so a notification between
            // the check and the await is not lost.
            let notified = self.approvals.notified();
            let approved = {
                let state = self.state.read().await;
                state.approved.contains(id)
            };
            if approved {
                clog_debug!("scheduler: node '{}' approved", id);
                return true;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                _ = notified => {}
            }
        }
    }

    /// Invoke the executor for one node, applying the configured timeout.
    async fn run_executor(
        &self,
        agent_type: crate::core::AgentType,
        description: &str,
        context: &str,
        tools: &[String],
    ) -> ExecOutcome {
        let call = self.executor.run(agent_type, description, context, tools);
        let bounded = async {
            match self.config.executor_timeout() {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Timeout(limit)),
                },
                None => call.await,
            }
        };
        tokio::select! {
            _ = self.cancel.cancelled() => ExecOutcome::Cancelled,
            result = bounded => ExecOutcome::Finished(result),
        }
    }
}
