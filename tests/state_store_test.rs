mod helpers;

use std::sync::Arc;
use std::time::Duration;

use convoy::domain::errors::DomainError;
use convoy::domain::models::{HealthLevel, MoleculeState, StateStoreConfig};
use helpers::database::{coordinator, setup_file_db, setup_test_db, state_store, teardown_test_db};
use serde_json::json;

#[tokio::test]
async fn test_history_survives_reopen() {
    let (_dir, pool) = setup_file_db(4).await;
    {
        let store = state_store(&pool, StateStoreConfig::default());
        store.create_molecule("build", "agent-a", json!({"step": 0}), json!({}), vec![]).await.unwrap();
        store.checkpoint("build", json!({"step": 1}), MoleculeState::Running, true, false).await.unwrap();
        store.checkpoint("build", json!({"step": 2}), MoleculeState::Suspended, true, true).await.unwrap();
    }

    let reopened = state_store(&pool, StateStoreConfig::default());
    let history = reopened.history("build", 10).await.unwrap();
    let sequences: Vec<u64> = history.iter().map(|s| s.sequence).collect();
    assert_eq!(sequences, vec![3, 2, 1]);
    assert_eq!(history[0].state, MoleculeState::Suspended);
    assert!(history[0].rollback_point);

    let limited = reopened.history("build", 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].sequence, 3);

    teardown_test_db(pool).await;
}

#[tokio::test]
async fn test_checkpoint_fail_rollback_cycle() {
    let pool = setup_test_db().await;
    let store = state_store(&pool, StateStoreConfig::default());

    store
        .create_molecule("deploy", "agent-a", json!({"phase": "init"}), json!({"env": "staging"}), vec![])
        .await
        .unwrap();
    store
        .checkpoint("deploy", json!({"phase": "migrated"}), MoleculeState::Running, true, true)
        .await
        .unwrap();
    store
        .checkpoint("deploy", json!({"phase": "half-rolled"}), MoleculeState::Running, true, false)
        .await
        .unwrap();

    store.fail("deploy", json!("node 3 unreachable")).await.unwrap();
    let failed = store.get("deploy").await.unwrap();
    assert_eq!(failed.state, MoleculeState::Failed);
    assert_eq!(failed.payload["error"], json!("node 3 unreachable"));

    let restored = store.rollback("deploy").await.unwrap();
    assert_eq!(restored.state, MoleculeState::RolledBack);
    assert_eq!(restored.payload, json!({"phase": "migrated"}));
    assert_eq!(restored.context, json!({"env": "staging"}));

    // A rolled-back molecule can resume.
    assert!(store
        .checkpoint("deploy", json!({"phase": "retry"}), MoleculeState::Running, true, false)
        .await
        .unwrap());
    store.complete("deploy", json!({"phase": "done"})).await.unwrap();
    let err = store.rollback("deploy").await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidState { .. }));
}

#[tokio::test]
async fn test_throttle_honours_configured_interval() {
    let pool = setup_test_db().await;
    let store = state_store(
        &pool,
        StateStoreConfig {
            checkpoint_min_interval_secs: 0,
            ..StateStoreConfig::default()
        },
    );
    store.create_molecule("m", "a", json!({}), json!({}), vec![]).await.unwrap();

    for step in 1..=3 {
        assert!(store
            .checkpoint("m", json!({"step": step}), MoleculeState::Running, false, false)
            .await
            .unwrap());
    }
    assert_eq!(store.history("m", 10).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_concurrent_checkpoints_keep_sequences_contiguous() {
    let pool = setup_test_db().await;
    let store = Arc::new(state_store(&pool, StateStoreConfig::default()));
    store.create_molecule("m", "a", json!({}), json!({}), vec![]).await.unwrap();

    let mut handles = Vec::new();
    for step in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .checkpoint("m", json!({"step": step}), MoleculeState::Running, true, false)
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }

    let mut sequences: Vec<u64> = store.history("m", 100).await.unwrap().iter().map(|s| s.sequence).collect();
    sequences.sort_unstable();
    assert_eq!(sequences, (1..=9).collect::<Vec<u64>>());
    assert_eq!(store.get("m").await.unwrap().version, 9);
}

#[tokio::test]
async fn test_prune_history_keeps_latest_and_rollback_points() {
    let pool = setup_test_db().await;
    let store = state_store(&pool, StateStoreConfig::default());
    store.create_molecule("m", "a", json!({}), json!({}), vec![]).await.unwrap();
    store.checkpoint("m", json!({"step": 1}), MoleculeState::Running, true, false).await.unwrap();
    store.checkpoint("m", json!({"step": 2}), MoleculeState::Running, true, false).await.unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(store.prune_history(0).await.unwrap(), 1);

    let sequences: Vec<u64> = store.history("m", 10).await.unwrap().iter().map(|s| s.sequence).collect();
    assert_eq!(sequences, vec![3, 1]);
}

#[tokio::test]
async fn test_coordinator_recovers_stalled_owner() {
    let pool = setup_test_db().await;
    let store = state_store(&pool, StateStoreConfig::default());
    store.create_molecule("m1", "worker", json!({"step": 0}), json!({}), vec![]).await.unwrap();
    store.checkpoint("m1", json!({"step": 5}), MoleculeState::Running, true, false).await.unwrap();
    store.heartbeat("worker", vec!["m1".into()]).await.unwrap();

    let coordinator = coordinator(&pool).with_owner_recovery(Arc::new(store));
    coordinator
        .register_agent("worker", ["rust".to_string()].into(), Default::default(), vec![])
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    let reports = coordinator.recover_stalled_agents(Duration::ZERO).await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].owner, "worker");
    assert_eq!(reports[0].rolled_back, vec!["m1".to_string()]);
    assert!(reports[0].failed.is_empty());
    assert_eq!(coordinator.agent("worker").await.unwrap().health, HealthLevel::Offline);

    let store = state_store(&pool, StateStoreConfig::default());
    let molecule = store.get("m1").await.unwrap();
    assert_eq!(molecule.state, MoleculeState::RolledBack);
    assert_eq!(molecule.payload, json!({"step": 0}));

    // The heartbeat was cleared, so a second sweep finds nothing.
    assert!(coordinator.recover_stalled_agents(Duration::ZERO).await.unwrap().is_empty());
}
