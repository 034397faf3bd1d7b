//! Aborting runs, superseding runs, and blocked (deadlocked) runs.

use std::sync::Arc;
use std::time::Duration;

use convoy::core::{AgentType, NodeId, NodeStatus};
use convoy::executor::AgentExecutor;
use convoy::{RunConfig, RunController, RunPhase};

use crate::fixtures::{fast_config, task, wait_until, Behavior, ScriptedExecutor, ScriptedPlanner};

#[tokio::test]
async fn test_abort_discards_in_flight_result() {
    let planner = ScriptedPlanner::new(
        "aborted",
        vec![task("a", AgentType::Coder, 5, &[])],
    );
    let executor = Arc::new(ScriptedExecutor::new());
    executor.script(
        "a",
        Behavior::succeed("never lands").delayed(Duration::from_secs(60)),
    );

    let mut controller =
        RunController::new(Arc::new(planner), executor.clone() as Arc<dyn AgentExecutor>, fast_config());
    controller.start("aborted").await.unwrap();

    let a = NodeId::new("a");
    wait_until(&controller, |s| {
        s.node(&a).map(|n| n.status == NodeStatus::Executing).unwrap_or(false)
    })
    .await;
    controller.abort().await;
    controller.join().await.unwrap();

    let snap = controller.observe().await;
    assert_eq!(snap.phase, RunPhase::Cancelled);
    assert!(snap.active_node.is_none());
    // The executor was invoked, but its result never touched the state.
    assert_eq!(executor.dispatch_order().len(), 1);
    let node = snap.node(&a).unwrap();
    assert!(node.output.is_none());
    assert_eq!(snap.total_tokens, 0);
}

#[tokio::test]
async fn test_superseding_run_starts_from_clean_state() {
    let planner = ScriptedPlanner::new(
        "supersede",
        vec![task("a", AgentType::Coder, 5, &[])],
    );
    let executor = Arc::new(ScriptedExecutor::new());
    executor.script(
        "a",
        Behavior::succeed("stale").delayed(Duration::from_secs(60)),
    );

    let mut controller =
        RunController::new(Arc::new(planner), executor.clone() as Arc<dyn AgentExecutor>, fast_config());
    controller.start("first objective").await.unwrap();

    let a = NodeId::new("a");
    wait_until(&controller, |s| {
        s.node(&a).map(|n| n.status == NodeStatus::Executing).unwrap_or(false)
    })
    .await;
    let first = controller.observe().await;

    controller.abort().await;

    // Re-script the node so the second run finishes instantly, and start
    // again while the first run's executor call is still pending.
    executor.script("a", Behavior::succeed("fresh").with_usage(7, 0.001));
    controller.start("second objective").await.unwrap();
    controller.join().await.unwrap();

    let snap = controller.observe().await;
    assert_ne!(snap.generation, first.generation);
    assert_eq!(snap.objective, "second objective");
    assert_eq!(snap.phase, RunPhase::Completed);
    assert_eq!(snap.node(&a).unwrap().output.as_deref(), Some("fresh"));
    assert_eq!(snap.total_tokens, 7);
    // Only the second run's log survives the reset.
    assert!(snap.log.iter().all(|e| !e.message.contains("first objective")));
}

#[tokio::test]
async fn test_starved_run_ends_blocked_without_hanging() {
    let planner = ScriptedPlanner::new(
        "strict mode",
        vec![
            task("flaky", AgentType::Coder, 5, &[]),
            task("downstream", AgentType::Coder, 5, &["flaky"]),
        ],
    );
    let executor = Arc::new(ScriptedExecutor::new());
    executor.script("flaky", Behavior::failing("transient outage"));
    let config = RunConfig {
        pacing_ms: 0,
        failed_unblocks_dependents: false,
        ..RunConfig::default()
    };

    let mut controller = RunController::new(Arc::new(planner), executor.clone() as Arc<dyn AgentExecutor>, config);
    controller.start("strict mode").await.unwrap();
    controller.join().await.unwrap();

    let snap = controller.observe().await;
    assert_eq!(snap.phase, RunPhase::Blocked);
    assert!(matches!(
        snap.node(&NodeId::new("flaky")).unwrap().status,
        NodeStatus::Failed { .. }
    ));
    assert_eq!(
        snap.node(&NodeId::new("downstream")).unwrap().status,
        NodeStatus::Idle
    );
    assert_eq!(executor.dispatch_order().len(), 1);
}

#[tokio::test]
async fn test_abort_releases_a_closed_approval_gate() {
    let planner = ScriptedPlanner::new(
        "gated abort",
        vec![task("critical", AgentType::Coder, 10, &[])],
    );
    let executor = Arc::new(ScriptedExecutor::new());

    let mut controller =
        RunController::new(Arc::new(planner), executor.clone() as Arc<dyn AgentExecutor>, fast_config());
    controller.start("gated abort").await.unwrap();

    let id = NodeId::new("critical");
    wait_until(&controller, |s| {
        s.node(&id).map(|n| n.status == NodeStatus::Waiting).unwrap_or(false)
    })
    .await;

    controller.abort().await;
    controller.join().await.unwrap();

    let snap = controller.observe().await;
    assert_eq!(snap.phase, RunPhase::Cancelled);
    assert!(executor.dispatch_order().is_empty());
}
