//! Approval gates for critical-priority nodes and the pause flag.

use std::sync::Arc;
use std::time::Duration;

use convoy::core::{AgentType, NodeId, NodeStatus};
use convoy::executor::AgentExecutor;
use convoy::{Error, RunController, RunPhase};

use crate::fixtures::{fast_config, task, wait_until, Behavior, ScriptedExecutor, ScriptedPlanner};

#[tokio::test]
async fn test_critical_node_waits_until_approved() {
    let planner = ScriptedPlanner::new(
        "deploy",
        vec![
            task("deploy_prod", AgentType::Coder, 10, &[]),
            task("announce", AgentType::Media, 5, &["deploy_prod"]),
        ],
    );
    let executor = Arc::new(ScriptedExecutor::new());

    let mut controller =
        RunController::new(Arc::new(planner), executor.clone() as Arc<dyn AgentExecutor>, fast_config());
    controller.start("deploy").await.unwrap();

    let id = NodeId::new("deploy_prod");
    wait_until(&controller, |s| {
        s.node(&id).map(|n| n.status == NodeStatus::Waiting).unwrap_or(false)
    })
    .await;

    // The run is stalled: no executor call, nothing downstream moved.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let snap = controller.observe().await;
    assert!(executor.dispatch_order().is_empty());
    assert_eq!(snap.waiting().len(), 1);
    assert_eq!(snap.active_node, Some(id.clone()));
    assert_eq!(
        snap.node(&NodeId::new("announce")).unwrap().status,
        NodeStatus::Idle
    );
    assert_eq!(snap.phase, RunPhase::Running);

    controller.approve(&id).await.unwrap();
    controller.join().await.unwrap();

    let snap = controller.observe().await;
    assert_eq!(snap.phase, RunPhase::Completed);
    assert_eq!(
        executor.dispatch_order(),
        vec!["deploy_prod work".to_string(), "announce work".to_string()]
    );
}

#[tokio::test]
async fn test_two_critical_nodes_gate_one_at_a_time() {
    let planner = ScriptedPlanner::new(
        "double gate",
        vec![
            task("gate_one", AgentType::Coder, 10, &[]),
            task("gate_two", AgentType::Coder, 9, &["gate_one"]),
        ],
    );
    let executor = Arc::new(ScriptedExecutor::new());

    let mut controller =
        RunController::new(Arc::new(planner), executor.clone() as Arc<dyn AgentExecutor>, fast_config());
    controller.start("double gate").await.unwrap();

    let one = NodeId::new("gate_one");
    let two = NodeId::new("gate_two");

    wait_until(&controller, |s| {
        s.node(&one).map(|n| n.status == NodeStatus::Waiting).unwrap_or(false)
    })
    .await;
    // The second gate cannot be approved before it is reached.
    assert!(matches!(
        controller.approve(&two).await,
        Err(Error::NotAwaitingApproval(_))
    ));
    controller.approve(&one).await.unwrap();

    wait_until(&controller, |s| {
        s.node(&two).map(|n| n.status == NodeStatus::Waiting).unwrap_or(false)
    })
    .await;
    controller.approve(&two).await.unwrap();
    controller.join().await.unwrap();

    assert_eq!(controller.observe().await.phase, RunPhase::Completed);
}

#[tokio::test]
async fn test_pause_prevents_any_dispatch() {
    let planner = ScriptedPlanner::new(
        "frozen",
        vec![task("a", AgentType::Coder, 5, &[]), task("b", AgentType::Coder, 5, &["a"])],
    );
    let executor = Arc::new(ScriptedExecutor::new());

    let mut controller =
        RunController::new(Arc::new(planner), executor.clone() as Arc<dyn AgentExecutor>, fast_config());
    // Pause lands before the spawned scheduler reaches its first gate
    // check, so nothing at all dispatches.
    controller.start("frozen").await.unwrap();
    controller.pause().await;

    wait_until(&controller, |s| s.paused).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snap = controller.observe().await;
    assert!(executor.dispatch_order().is_empty());
    for id in ["a", "b"] {
        assert_eq!(
            snap.node(&NodeId::new(id)).unwrap().status,
            NodeStatus::Idle
        );
    }

    controller.resume().await;
    controller.join().await.unwrap();

    let snap = controller.observe().await;
    assert_eq!(snap.phase, RunPhase::Completed);
    assert!(!snap.paused);
}

#[tokio::test]
async fn test_pause_lets_active_node_settle_then_halts() {
    let planner = ScriptedPlanner::new(
        "mid pause",
        vec![task("a", AgentType::Coder, 5, &[]), task("b", AgentType::Coder, 5, &["a"])],
    );
    let executor = Arc::new(ScriptedExecutor::new());
    executor.script("a", Behavior::succeed("slow one").delayed(Duration::from_millis(80)));

    let mut controller =
        RunController::new(Arc::new(planner), executor.clone() as Arc<dyn AgentExecutor>, fast_config());
    controller.start("mid pause").await.unwrap();

    let a = NodeId::new("a");
    wait_until(&controller, |s| {
        s.node(&a).map(|n| n.status == NodeStatus::Executing).unwrap_or(false)
    })
    .await;
    controller.pause().await;

    // a finishes its in-flight call; b must not start while paused.
    wait_until(&controller, |s| {
        s.node(&a).map(|n| n.status == NodeStatus::Completed).unwrap_or(false)
    })
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let snap = controller.observe().await;
    assert_eq!(snap.node(&NodeId::new("b")).unwrap().status, NodeStatus::Idle);
    assert_ne!(snap.phase, RunPhase::Completed);

    controller.resume().await;
    controller.join().await.unwrap();
    assert_eq!(controller.observe().await.phase, RunPhase::Completed);
}
