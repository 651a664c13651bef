//! Molecule state store.
//!
//! Append-only checkpoint ledger for resumable work units, with rollback,
//! owner heartbeats and crash recovery. Mutations on one molecule id are
//! serialized in-process by a keyed lock and across processes by the
//! repository's version compare-and-swap.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    merge_error_info, CoreEvent, Molecule, MoleculeState, OwnerHeartbeat, RecoveryReport, Snapshot,
    StalledOwner, StateStoreConfig,
};
use crate::domain::ports::{EventSink, MoleculeRepository, NullEventSink, OwnerRecovery};
use crate::services::keyed_lock::KeyedLocks;
use crate::services::storage_retry::RetryPolicy;

/// Error info recorded when recovery fails a molecule that has no rollback point.
pub const AGENT_CRASH: &str = "agent_crash";

const ENTITY: &str = "molecule";
const ROLLBACK_POINT: &str = "rollback point";

pub struct StateStore<R: MoleculeRepository> {
    repo: Arc<R>,
    config: StateStoreConfig,
    retry: RetryPolicy,
    locks: KeyedLocks,
    events: Arc<dyn EventSink>,
}

impl<R: MoleculeRepository> StateStore<R> {
    pub fn new(repo: Arc<R>, config: StateStoreConfig, retry: RetryPolicy) -> Self {
        Self {
            repo,
            config,
            retry,
            locks: KeyedLocks::new(),
            events: Arc::new(NullEventSink),
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &StateStoreConfig {
        &self.config
    }

    /// Create a molecule and record its initial rollback-point snapshot.
    #[instrument(skip(self, payload, context), err)]
    pub async fn create_molecule(
        &self,
        id: &str,
        owner: &str,
        payload: Value,
        context: Value,
        dependencies: Vec<String>,
    ) -> DomainResult<Snapshot> {
        if id.trim().is_empty() {
            return Err(DomainError::ValidationError("molecule id cannot be empty".into()));
        }
        if owner.trim().is_empty() {
            return Err(DomainError::ValidationError("molecule owner cannot be empty".into()));
        }
        if dependencies.iter().any(|d| d == id) {
            return Err(DomainError::ValidationError(format!("molecule {id} cannot depend on itself")));
        }

        let _guard = self.locks.lock(id).await;
        let molecule = Molecule::new(id, owner, payload, context, dependencies);
        let snapshot = molecule.snapshot(true);

        self.retry.execute(|| self.repo.create(&molecule, &snapshot)).await?;

        info!(molecule_id = %id, owner = %owner, "molecule created");
        Ok(snapshot)
    }

    pub async fn get(&self, id: &str) -> DomainResult<Molecule> {
        self.retry
            .execute(|| self.repo.get(id))
            .await?
            .ok_or_else(|| DomainError::not_found(ENTITY, id))
    }

    pub async fn list_by_owner(&self, owner: &str) -> DomainResult<Vec<Molecule>> {
        self.retry.execute(|| self.repo.list_by_owner(owner)).await
    }

    /// Record a checkpoint.
    ///
    /// Returns `false` without writing when the previous checkpoint of this
    /// molecule is younger than the configured minimum interval and `force`
    /// is not set.
    #[instrument(skip(self, payload), err)]
    pub async fn checkpoint(
        &self,
        id: &str,
        payload: Value,
        state: MoleculeState,
        force: bool,
        mark_rollback: bool,
    ) -> DomainResult<bool> {
        if !state.is_checkpointable() {
            return Err(DomainError::ValidationError(format!(
                "cannot checkpoint into state {state}; use the dedicated operation"
            )));
        }

        let _guard = self.locks.lock(id).await;
        let written = self
            .retry
            .execute(|| self.try_checkpoint(id, &payload, state, force, mark_rollback))
            .await?;

        match written {
            Some(snapshot) => {
                info!(molecule_id = %id, state = %state, sequence = snapshot.sequence, rollback_point = mark_rollback, "checkpoint recorded");
                self.events.publish(CoreEvent::Checkpointed {
                    molecule_id: id.to_string(),
                    state,
                    sequence: snapshot.sequence,
                    rollback_point: mark_rollback,
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn try_checkpoint(
        &self,
        id: &str,
        payload: &Value,
        state: MoleculeState,
        force: bool,
        mark_rollback: bool,
    ) -> DomainResult<Option<Snapshot>> {
        let current = self.load_mutable(id, "checkpoint").await?;

        if !force {
            if let Some(last) = current.last_checkpoint_at {
                let elapsed = Utc::now().signed_duration_since(last);
                if elapsed.to_std().unwrap_or(Duration::ZERO) < self.config.checkpoint_min_interval() {
                    debug!(molecule_id = %id, "checkpoint throttled");
                    return Ok(None);
                }
            }
        }

        let mut next = current.advance(state, payload.clone());
        next.last_checkpoint_at = Some(next.updated_at);
        let snapshot = next.snapshot(mark_rollback);
        self.repo.append(current.version, &next, &snapshot).await?;
        Ok(Some(snapshot))
    }

    /// Mark a molecule Completed. Completed is terminal.
    #[instrument(skip(self, payload), err)]
    pub async fn complete(&self, id: &str, payload: Value) -> DomainResult<Snapshot> {
        let _guard = self.locks.lock(id).await;
        let snapshot = self
            .retry
            .execute(|| async {
                let current = self.load_mutable(id, "complete").await?;
                let mut next = current.advance(MoleculeState::Completed, payload.clone());
                next.last_checkpoint_at = Some(next.updated_at);
                let snapshot = next.snapshot(true);
                self.repo.append(current.version, &next, &snapshot).await?;
                Ok::<_, DomainError>(snapshot)
            })
            .await?;

        info!(molecule_id = %id, sequence = snapshot.sequence, "molecule completed");
        self.events.publish(CoreEvent::MoleculeCompleted {
            molecule_id: id.to_string(),
            sequence: snapshot.sequence,
        });
        Ok(snapshot)
    }

    /// Mark a molecule Failed, merging `error_info` into its payload.
    ///
    /// The molecule stays mutable so it can be rolled back afterwards.
    #[instrument(skip(self, error_info), err)]
    pub async fn fail(&self, id: &str, error_info: Value) -> DomainResult<Snapshot> {
        let _guard = self.locks.lock(id).await;
        let snapshot = self
            .retry
            .execute(|| async {
                let current = self.load_mutable(id, "fail").await?;
                let payload = merge_error_info(&current.payload, &error_info);
                let mut next = current.advance(MoleculeState::Failed, payload);
                next.last_checkpoint_at = Some(next.updated_at);
                let snapshot = next.snapshot(false);
                self.repo.append(current.version, &next, &snapshot).await?;
                Ok::<_, DomainError>(snapshot)
            })
            .await?;

        warn!(molecule_id = %id, sequence = snapshot.sequence, "molecule failed");
        self.events.publish(CoreEvent::MoleculeFailed {
            molecule_id: id.to_string(),
            sequence: snapshot.sequence,
        });
        Ok(snapshot)
    }

    /// Snapshots of a molecule, most recent first.
    pub async fn history(&self, id: &str, limit: usize) -> DomainResult<Vec<Snapshot>> {
        let snapshots = self.retry.execute(|| self.repo.history(id, limit)).await?;
        if snapshots.is_empty() && limit > 0 {
            // Every molecule has at least its initial snapshot.
            return Err(DomainError::not_found(ENTITY, id));
        }
        Ok(snapshots)
    }

    pub async fn find_latest_rollback_point(&self, id: &str) -> DomainResult<Snapshot> {
        self.retry
            .execute(|| self.repo.latest_rollback_point(id))
            .await?
            .ok_or_else(|| DomainError::not_found(ROLLBACK_POINT, id))
    }

    /// Restore the latest rollback point as a new RolledBack snapshot.
    #[instrument(skip(self), err)]
    pub async fn rollback(&self, id: &str) -> DomainResult<Snapshot> {
        let _guard = self.locks.lock(id).await;
        let (snapshot, restored_from) = self
            .retry
            .execute(|| async {
                let current = self.load_mutable(id, "rollback").await?;
                let point = self
                    .repo
                    .latest_rollback_point(id)
                    .await?
                    .ok_or_else(|| DomainError::not_found(ROLLBACK_POINT, id))?;

                let mut next = current.advance(MoleculeState::RolledBack, point.payload.clone());
                next.context = point.context.clone();
                next.dependencies = point.dependencies.clone();
                next.last_checkpoint_at = Some(next.updated_at);
                let snapshot = next.snapshot(true);
                self.repo.append(current.version, &next, &snapshot).await?;
                Ok::<_, DomainError>((snapshot, point.sequence))
            })
            .await?;

        info!(molecule_id = %id, sequence = snapshot.sequence, restored_from, "molecule rolled back");
        self.events.publish(CoreEvent::MoleculeRolledBack {
            molecule_id: id.to_string(),
            sequence: snapshot.sequence,
            restored_from,
        });
        Ok(snapshot)
    }

    /// Record that `owner` is alive and working on `active_molecules`.
    pub async fn heartbeat(&self, owner: &str, active_molecules: Vec<String>) -> DomainResult<()> {
        if owner.trim().is_empty() {
            return Err(DomainError::ValidationError("heartbeat owner cannot be empty".into()));
        }
        let heartbeat = OwnerHeartbeat {
            owner: owner.to_string(),
            active_molecules,
            last_heartbeat: Utc::now(),
        };
        self.retry.execute(|| self.repo.upsert_heartbeat(&heartbeat)).await?;
        debug!(owner = %owner, active = heartbeat.active_molecules.len(), "heartbeat recorded");
        Ok(())
    }

    /// Owners whose last heartbeat is older than `timeout`.
    pub async fn detect_stalled_owners(&self, timeout: Duration) -> DomainResult<Vec<StalledOwner>> {
        let timeout = chrono::Duration::from_std(timeout)
            .map_err(|e| DomainError::ValidationError(format!("invalid heartbeat timeout: {e}")))?;
        let cutoff = Utc::now() - timeout;

        let stalled = self.retry.execute(|| self.repo.heartbeats_before(cutoff)).await?;
        Ok(stalled
            .into_iter()
            .map(|h| StalledOwner {
                owner: h.owner,
                active_molecules: h.active_molecules,
                last_heartbeat: h.last_heartbeat,
            })
            .collect())
    }

    /// Roll back every in-flight molecule of a crashed owner.
    ///
    /// Molecules without a rollback point are failed with `agent_crash`.
    /// Per-molecule errors are collected in the report and never abort the
    /// sweep. The owner's heartbeat is cleared afterwards.
    #[instrument(skip(self), err)]
    pub async fn recover_owner(&self, owner: &str) -> DomainResult<RecoveryReport> {
        let heartbeat = self.retry.execute(|| self.repo.get_heartbeat(owner)).await?;
        let owned = self.list_by_owner(owner).await?;

        // Heartbeat ids are only trusted for molecules this owner actually holds.
        let owned_ids: BTreeSet<&str> = owned.iter().map(|m| m.id.as_str()).collect();
        let mut active: BTreeSet<String> = BTreeSet::new();
        for id in heartbeat.map(|h| h.active_molecules).unwrap_or_default() {
            if owned_ids.contains(id.as_str()) {
                active.insert(id);
            } else {
                warn!(owner = %owner, molecule_id = %id, "heartbeat lists a molecule the owner does not hold");
            }
        }
        active.extend(owned.iter().filter(|m| m.state.is_in_flight()).map(|m| m.id.clone()));

        let mut report = RecoveryReport {
            owner: owner.to_string(),
            ..Default::default()
        };

        for id in active {
            match self.rollback(&id).await {
                Ok(_) => report.rolled_back.push(id),
                Err(DomainError::NotFound { entity: ROLLBACK_POINT, .. }) => {
                    match self.fail(&id, Value::String(AGENT_CRASH.to_string())).await {
                        Ok(_) => report.failed.push(id),
                        Err(e) => {
                            warn!(molecule_id = %id, error = %e, "failed to mark molecule failed during recovery");
                            report.errors.push((id, e.to_string()));
                        }
                    }
                }
                Err(DomainError::InvalidState { .. }) => {
                    debug!(molecule_id = %id, "skipping completed molecule during recovery");
                }
                Err(e) => {
                    warn!(molecule_id = %id, error = %e, "failed to roll back molecule during recovery");
                    report.errors.push((id, e.to_string()));
                }
            }
        }

        self.retry.execute(|| self.repo.delete_heartbeat(owner)).await?;

        info!(
            owner = %owner,
            rolled_back = report.rolled_back.len(),
            failed = report.failed.len(),
            errors = report.errors.len(),
            "owner recovered"
        );
        self.events.publish(CoreEvent::OwnerRecovered {
            owner: owner.to_string(),
            rolled_back: report.rolled_back.len(),
            failed: report.failed.len(),
        });
        Ok(report)
    }

    /// Delete non-rollback-point snapshots older than `retention_days`.
    pub async fn prune_history(&self, retention_days: u32) -> DomainResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
        let pruned = self.retry.execute(|| self.repo.prune_snapshots(cutoff)).await?;
        info!(pruned, retention_days, "snapshot history pruned");
        Ok(pruned)
    }

    async fn load_mutable(&self, id: &str, operation: &'static str) -> DomainResult<Molecule> {
        let current = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(ENTITY, id))?;
        if current.state.is_terminal() {
            return Err(DomainError::invalid_state(ENTITY, id, current.state, operation));
        }
        Ok(current)
    }
}

#[async_trait]
impl<R: MoleculeRepository> OwnerRecovery for StateStore<R> {
    async fn detect_stalled_owners(&self, timeout: Duration) -> DomainResult<Vec<StalledOwner>> {
        StateStore::detect_stalled_owners(self, timeout).await
    }

    async fn recover_owner(&self, owner: &str) -> DomainResult<RecoveryReport> {
        StateStore::recover_owner(self, owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteMoleculeRepository};
    use serde_json::json;

    async fn setup_store(config: StateStoreConfig) -> StateStore<SqliteMoleculeRepository> {
        let pool = create_migrated_test_pool().await.unwrap();
        StateStore::new(Arc::new(SqliteMoleculeRepository::new(pool)), config, RetryPolicy::immediate(3))
    }

    async fn default_store() -> StateStore<SqliteMoleculeRepository> {
        setup_store(StateStoreConfig::default()).await
    }

    #[tokio::test]
    async fn test_create_returns_initial_rollback_point() {
        let store = default_store().await;
        let snapshot = store.create_molecule("m1", "a", json!({"step": 0}), json!({}), vec![]).await.unwrap();
        assert_eq!(snapshot.state, MoleculeState::Initialized);
        assert!(snapshot.rollback_point);
        assert_eq!(snapshot.sequence, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates_and_bad_input() {
        let store = default_store().await;
        store.create_molecule("m1", "a", json!({}), json!({}), vec![]).await.unwrap();

        let err = store.create_molecule("m1", "b", json!({}), json!({}), vec![]).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists { .. }));

        let err = store.create_molecule("", "a", json!({}), json!({}), vec![]).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)));

        let err = store.create_molecule("m2", "a", json!({}), json!({}), vec!["m2".into()]).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_checkpoint_throttled_unless_forced() {
        let store = default_store().await;
        store.create_molecule("m1", "a", json!({}), json!({}), vec![]).await.unwrap();

        assert!(store.checkpoint("m1", json!({"step": 1}), MoleculeState::Running, false, false).await.unwrap());
        assert!(!store.checkpoint("m1", json!({"step": 2}), MoleculeState::Running, false, false).await.unwrap());
        assert!(store.checkpoint("m1", json!({"step": 3}), MoleculeState::Running, true, false).await.unwrap());

        let history = store.history("m1", 10).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].payload, json!({"step": 3}));
    }

    #[tokio::test]
    async fn test_checkpoint_rejects_lifecycle_states() {
        let store = default_store().await;
        store.create_molecule("m1", "a", json!({}), json!({}), vec![]).await.unwrap();

        for state in [MoleculeState::Initialized, MoleculeState::Completed, MoleculeState::Failed, MoleculeState::RolledBack] {
            let err = store.checkpoint("m1", json!({}), state, true, false).await.unwrap_err();
            assert!(matches!(err, DomainError::ValidationError(_)));
        }

        let err = store.checkpoint("missing", json!({}), MoleculeState::Running, true, false).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_completed_is_terminal() {
        let store = default_store().await;
        store.create_molecule("m1", "a", json!({}), json!({}), vec![]).await.unwrap();
        let snapshot = store.complete("m1", json!({"done": true})).await.unwrap();
        assert!(snapshot.rollback_point);

        let err = store.checkpoint("m1", json!({}), MoleculeState::Running, true, false).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
        let err = store.rollback("m1").await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
        let err = store.fail("m1", json!("late")).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_fail_then_rollback_restores_checkpoint() {
        let store = default_store().await;
        store.create_molecule("m1", "a", json!({"step": 0}), json!({"cwd": "/tmp"}), vec![]).await.unwrap();
        store.checkpoint("m1", json!({"step": 4}), MoleculeState::Running, true, true).await.unwrap();

        let failed = store.fail("m1", json!({"reason": "oom"})).await.unwrap();
        assert!(!failed.rollback_point);
        assert_eq!(failed.payload, json!({"step": 4, "reason": "oom"}));

        let point = store.find_latest_rollback_point("m1").await.unwrap();
        let restored = store.rollback("m1").await.unwrap();
        assert_eq!(restored.state, MoleculeState::RolledBack);
        assert_eq!(restored.payload, point.payload);
        assert_eq!(restored.payload, json!({"step": 4}));
        assert_eq!(store.get("m1").await.unwrap().state, MoleculeState::RolledBack);
    }

    #[tokio::test]
    async fn test_recover_owner_rolls_back_in_flight_molecules() {
        let store = default_store().await;
        store.create_molecule("m1", "a", json!({}), json!({}), vec![]).await.unwrap();
        store.create_molecule("m2", "a", json!({}), json!({}), vec![]).await.unwrap();
        store.create_molecule("m3", "a", json!({}), json!({}), vec![]).await.unwrap();
        store.checkpoint("m1", json!({"step": 1}), MoleculeState::Running, true, false).await.unwrap();
        store.complete("m3", json!({})).await.unwrap();
        store.heartbeat("a", vec!["m1".into(), "m3".into()]).await.unwrap();

        let report = store.recover_owner("a").await.unwrap();
        assert_eq!(report.rolled_back, vec!["m1".to_string(), "m2".to_string()]);
        assert!(report.failed.is_empty());
        assert!(report.errors.is_empty());
        assert_eq!(store.get("m3").await.unwrap().state, MoleculeState::Completed);

        let stalled = store.detect_stalled_owners(Duration::ZERO).await.unwrap();
        assert!(stalled.is_empty());
    }

    /// Delegates to SQLite but never reports a rollback point.
    struct NoRollbackPoints(SqliteMoleculeRepository);

    #[async_trait]
    impl MoleculeRepository for NoRollbackPoints {
        async fn create(&self, molecule: &Molecule, initial: &Snapshot) -> DomainResult<()> {
            self.0.create(molecule, initial).await
        }

        async fn get(&self, id: &str) -> DomainResult<Option<Molecule>> {
            self.0.get(id).await
        }

        async fn append(&self, expected_version: u64, molecule: &Molecule, snapshot: &Snapshot) -> DomainResult<()> {
            self.0.append(expected_version, molecule, snapshot).await
        }

        async fn history(&self, id: &str, limit: usize) -> DomainResult<Vec<Snapshot>> {
            self.0.history(id, limit).await
        }

        async fn latest_rollback_point(&self, _id: &str) -> DomainResult<Option<Snapshot>> {
            Ok(None)
        }

        async fn list_by_owner(&self, owner: &str) -> DomainResult<Vec<Molecule>> {
            self.0.list_by_owner(owner).await
        }

        async fn prune_snapshots(&self, cutoff: chrono::DateTime<Utc>) -> DomainResult<u64> {
            self.0.prune_snapshots(cutoff).await
        }

        async fn upsert_heartbeat(&self, heartbeat: &OwnerHeartbeat) -> DomainResult<()> {
            self.0.upsert_heartbeat(heartbeat).await
        }

        async fn get_heartbeat(&self, owner: &str) -> DomainResult<Option<OwnerHeartbeat>> {
            self.0.get_heartbeat(owner).await
        }

        async fn heartbeats_before(&self, cutoff: chrono::DateTime<Utc>) -> DomainResult<Vec<OwnerHeartbeat>> {
            self.0.heartbeats_before(cutoff).await
        }

        async fn delete_heartbeat(&self, owner: &str) -> DomainResult<()> {
            self.0.delete_heartbeat(owner).await
        }
    }

    #[tokio::test]
    async fn test_recover_owner_fails_molecules_without_rollback_point() {
        let pool = create_migrated_test_pool().await.unwrap();
        let store = StateStore::new(
            Arc::new(NoRollbackPoints(SqliteMoleculeRepository::new(pool))),
            StateStoreConfig::default(),
            RetryPolicy::immediate(3),
        );
        store.create_molecule("m1", "a", json!({"step": 2}), json!({}), vec![]).await.unwrap();
        store.heartbeat("a", vec!["m1".into()]).await.unwrap();

        let report = store.recover_owner("a").await.unwrap();
        assert!(report.rolled_back.is_empty());
        assert_eq!(report.failed, vec!["m1".to_string()]);
        assert!(report.errors.is_empty());

        let molecule = store.get("m1").await.unwrap();
        assert_eq!(molecule.state, MoleculeState::Failed);
        assert_eq!(molecule.payload, json!({"step": 2, "error": AGENT_CRASH}));
    }

    #[tokio::test]
    async fn test_recover_owner_ignores_molecules_of_other_owners() {
        let store = default_store().await;
        store.create_molecule("mine", "a", json!({}), json!({}), vec![]).await.unwrap();
        store.create_molecule("theirs", "b", json!({}), json!({}), vec![]).await.unwrap();
        store.checkpoint("theirs", json!({"step": 1}), MoleculeState::Running, true, false).await.unwrap();
        store.heartbeat("a", vec!["mine".into(), "theirs".into()]).await.unwrap();

        let report = store.recover_owner("a").await.unwrap();
        assert_eq!(report.rolled_back, vec!["mine".to_string()]);

        let theirs = store.get("theirs").await.unwrap();
        assert_eq!(theirs.state, MoleculeState::Running);
        assert_eq!(theirs.payload, json!({"step": 1}));
    }

    #[tokio::test]
    async fn test_detect_stalled_owners() {
        let store = default_store().await;
        store.heartbeat("a", vec!["m1".into()]).await.unwrap();

        assert!(store.detect_stalled_owners(Duration::from_secs(60)).await.unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(5)).await;
        let stalled = store.detect_stalled_owners(Duration::ZERO).await.unwrap();
        assert_eq!(stalled.len(), 1);
        assert_eq!(stalled[0].active_molecules, vec!["m1".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_molecule_history() {
        let store = default_store().await;
        let err = store.history("ghost", 5).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
        let err = store.find_latest_rollback_point("ghost").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
