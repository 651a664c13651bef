mod helpers;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use convoy::adapters::sqlite::SqliteCoordinationRepository;
use convoy::domain::models::{
    AgentMetricsUpdate, CoordinatorConfig, DaemonConfig, HealthLevel, StateStoreConfig, TeamStatus, TeamType,
};
use convoy::services::{Coordinator, CoordinatorDaemon, FormationRequest, RetryPolicy};
use helpers::database::{coordinator, setup_test_db, state_store};
use serde_json::json;

fn rust_agent() -> BTreeSet<String> {
    BTreeSet::from(["rust".to_string()])
}

async fn register_all(coordinator: &Coordinator<SqliteCoordinationRepository>, names: &[&str]) {
    for name in names {
        coordinator
            .register_agent(name, rust_agent(), BTreeMap::new(), vec![])
            .await
            .unwrap();
    }
}

async fn set_load(coordinator: &Coordinator<SqliteCoordinationRepository>, name: &str, load: f64) {
    coordinator
        .update_agent_metrics(
            name,
            AgentMetricsUpdate {
                current_load: Some(load),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_distribution_prefers_least_loaded_then_oldest_team() {
    let pool = setup_test_db().await;
    let coordinator = coordinator(&pool);
    register_all(&coordinator, &["a", "b", "c", "d"]).await;

    let first = coordinator
        .form_team(
            TeamType::Parallel,
            FormationRequest {
                preferred_agents: vec!["a".into(), "b".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    let second = coordinator
        .form_team(TeamType::Parallel, FormationRequest::default())
        .await
        .unwrap()
        .unwrap();

    let plan = coordinator
        .distribute_work((1..=5).map(|n| format!("item-{n}")).collect())
        .await
        .unwrap();
    assert!(plan.unassigned.is_empty());
    assert_eq!(plan.assignments[&first.id], vec!["item-1", "item-3", "item-5"]);
    assert_eq!(plan.assignments[&second.id], vec!["item-2", "item-4"]);
    assert_eq!(plan.max_items_per_team(), 3);

    let expected = plan.created_at + chrono::Duration::seconds(3 * CoordinatorConfig::default().per_item_duration_secs as i64);
    assert_eq!(plan.estimated_completion, expected);

    let stored = coordinator.team(first.id).await.unwrap();
    assert_eq!(stored.assigned_items.len(), 3);
}

#[tokio::test]
async fn test_overloaded_teams_leave_work_unassigned() {
    let pool = setup_test_db().await;
    let coordinator = coordinator(&pool);
    register_all(&coordinator, &["a", "b"]).await;
    coordinator
        .form_team(TeamType::Parallel, FormationRequest::default())
        .await
        .unwrap()
        .unwrap();

    set_load(&coordinator, "a", 0.85).await;
    set_load(&coordinator, "b", 0.85).await;

    let plan = coordinator.distribute_work(vec!["x".into(), "y".into()]).await.unwrap();
    assert!(plan.assignments.is_empty());
    assert_eq!(plan.unassigned, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(plan.estimated_completion, plan.created_at);
}

#[tokio::test]
async fn test_rebalance_drops_offline_members_and_reelects_leader() {
    let pool = setup_test_db().await;
    let coordinator = coordinator(&pool);
    for (name, skill) in [("a", "rust"), ("b", "go"), ("c", "sql")] {
        coordinator
            .register_agent(name, BTreeSet::from([skill.to_string()]), BTreeMap::new(), vec![])
            .await
            .unwrap();
    }

    // Each agent covers a different stage, so the pipeline takes all three.
    let team = coordinator
        .form_team(TeamType::Pipeline, FormationRequest::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(team.members.len(), 3);
    let leader = team.leader.clone().unwrap();

    coordinator.report_health(&leader, HealthLevel::Offline).await.unwrap();
    let report = coordinator.rebalance_teams().await.unwrap();
    assert_eq!(report.members_removed, 1);
    assert_eq!(report.leaders_changed, 1);
    assert!(report.teams_disbanded.is_empty());

    let team = coordinator.team(team.id).await.unwrap();
    assert_eq!(team.status, TeamStatus::Active);
    assert_eq!(team.members.len(), 2);
    assert!(!team.members.contains(&leader));
    assert!(team.leader.as_ref().is_some_and(|l| team.members.contains(l)));

    coordinator.unregister_agent(&team.members[0]).await.unwrap();
    let report = coordinator.rebalance_teams().await.unwrap();
    assert_eq!(report.teams_disbanded, vec![team.id]);
    assert_eq!(coordinator.status().await.active_teams, 0);
}

#[tokio::test]
async fn test_registries_survive_reload() {
    let pool = setup_test_db().await;
    let team_id = {
        let coordinator = coordinator(&pool);
        register_all(&coordinator, &["a", "b"]).await;
        let team = coordinator
            .form_team(TeamType::Parallel, FormationRequest::default())
            .await
            .unwrap()
            .unwrap();
        coordinator.distribute_work(vec!["first".into()]).await.unwrap();
        coordinator.distribute_work(vec!["second".into()]).await.unwrap();
        team.id
    };

    let reloaded = Coordinator::load(
        Arc::new(SqliteCoordinationRepository::new(pool.clone())),
        CoordinatorConfig::default(),
        RetryPolicy::immediate(3),
    )
    .await
    .unwrap();

    assert_eq!(reloaded.agents().await.len(), 2);
    let team = reloaded.team(team_id).await.unwrap();
    assert_eq!(team.assigned_items, vec!["first".to_string(), "second".to_string()]);

    let plans = reloaded.plans(10).await;
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0].assignments[&team_id], vec!["second".to_string()]);
}

#[tokio::test]
async fn test_daemon_distributes_backlog_and_recovers_stalled_owners() {
    let pool = setup_test_db().await;
    let store = state_store(&pool, StateStoreConfig::default());
    store.create_molecule("job", "c", json!({"step": 0}), json!({}), vec![]).await.unwrap();
    store.heartbeat("c", vec!["job".into()]).await.unwrap();

    let coordinator = Arc::new(coordinator(&pool).with_owner_recovery(Arc::new(store)));
    register_all(&coordinator, &["a", "b", "c"]).await;
    coordinator
        .form_team(
            TeamType::Parallel,
            FormationRequest {
                preferred_agents: vec!["a".into(), "b".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(coordinator.submit_work(vec!["queued-1".into(), "queued-2".into()]).await, 2);

    tokio::time::sleep(Duration::from_millis(10)).await;
    let handle = CoordinatorDaemon::new(Arc::clone(&coordinator), DaemonConfig::default(), Duration::ZERO).spawn();
    assert_eq!(handle.task_count(), 5);
    tokio::time::sleep(Duration::from_millis(200)).await;
    let stats = handle.shutdown().await;

    assert!(stats.iter().all(|s| s.ticks >= 1 && s.failures == 0));

    let status = coordinator.status().await;
    assert_eq!(status.pending_work, 0);
    assert_eq!(status.plans_recorded, 1);
    assert!(status.last_performance.is_some());
    assert_eq!(coordinator.agent("c").await.unwrap().health, HealthLevel::Offline);
}
