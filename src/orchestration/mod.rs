//! Run orchestration: the controller surface and the scheduling loop.

pub mod controller;
pub mod scheduler;

pub use controller::{RunController, RunPhase, RunSnapshot, RunState};
pub use scheduler::Scheduler;
