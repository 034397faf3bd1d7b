//! Integration test suite for convoy.
//!
//! These tests drive full runs through `RunController` with scripted
//! planner and executor fakes; no model backend is involved, so they are
//! safe to run anywhere.
//!
//! # Test Categories
//!
//! - `run_e2e`: full mission execution, ordering, context and totals
//! - `approval_and_pause`: human-in-the-loop gates and the pause flag
//! - `cancellation`: aborts, superseding runs, and blocked runs

mod fixtures;

mod approval_and_pause;
mod cancellation;
