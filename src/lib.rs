//! convoy — task-graph execution core for a simulated multi-agent
//! orchestrator.
//!
//! A [`RunController`] accepts a natural-language objective, hands it to a
//! [`PlannerService`](planner::PlannerService) for decomposition into a
//! dependency graph of prioritized subtasks, then drives the subtasks to
//! terminal states one at a time through an [`AgentExecutor`](executor::AgentExecutor).
//! Runs support pausing, approval gates for critical-priority nodes,
//! cancellation, deadlock detection, an append-only execution log, and
//! run-level token/cost aggregation.
//!
//! Rendering, persistence and concrete model backends live outside this
//! crate behind the planner and executor traits.

pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod executor;
pub mod log;
pub mod orchestration;
pub mod planner;

pub use config::RunConfig;
pub use error::{Error, Result};
pub use orchestration::{RunController, RunPhase, RunSnapshot};
