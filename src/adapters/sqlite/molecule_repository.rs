//! SQLite implementation of the MoleculeRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::{format_timestamp, parse_datetime, parse_json, parse_optional_datetime};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Molecule, MoleculeState, OwnerHeartbeat, Snapshot};
use crate::domain::ports::MoleculeRepository;

#[derive(Clone)]
pub struct SqliteMoleculeRepository {
    pool: SqlitePool,
}

impl SqliteMoleculeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert_snapshot(tx: &mut Transaction<'_, Sqlite>, snapshot: &Snapshot) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO molecule_snapshots (molecule_id, sequence, state, payload, context,
               dependencies, rollback_point, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&snapshot.molecule_id)
        .bind(snapshot.sequence as i64)
        .bind(snapshot.state.as_str())
        .bind(serde_json::to_string(&snapshot.payload)?)
        .bind(serde_json::to_string(&snapshot.context)?)
        .bind(serde_json::to_string(&snapshot.dependencies)?)
        .bind(snapshot.rollback_point)
        .bind(format_timestamp(snapshot.created_at))
        .execute(&mut **tx)
        .await
        .map_err(|e| map_unique_violation(e, "snapshot", &snapshot.molecule_id))?;
        Ok(())
    }
}

fn map_unique_violation(err: sqlx::Error, entity: &'static str, id: &str) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return DomainError::AlreadyExists { entity, id: id.to_string() };
        }
    }
    err.into()
}

#[async_trait]
impl MoleculeRepository for SqliteMoleculeRepository {
    async fn create(&self, molecule: &Molecule, initial: &Snapshot) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO molecules (id, owner, state, payload, context, dependencies, version,
               created_at, updated_at, last_checkpoint_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&molecule.id)
        .bind(&molecule.owner)
        .bind(molecule.state.as_str())
        .bind(serde_json::to_string(&molecule.payload)?)
        .bind(serde_json::to_string(&molecule.context)?)
        .bind(serde_json::to_string(&molecule.dependencies)?)
        .bind(molecule.version as i64)
        .bind(format_timestamp(molecule.created_at))
        .bind(format_timestamp(molecule.updated_at))
        .bind(molecule.last_checkpoint_at.map(format_timestamp))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "molecule", &molecule.id))?;

        Self::insert_snapshot(&mut tx, initial).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> DomainResult<Option<Molecule>> {
        let row: Option<MoleculeRow> = sqlx::query_as("SELECT * FROM molecules WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Molecule::try_from).transpose()
    }

    async fn append(&self, expected_version: u64, molecule: &Molecule, snapshot: &Snapshot) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        // Write first so the transaction takes the write lock before reading anything.
        let result = sqlx::query(
            r#"UPDATE molecules SET state = ?, payload = ?, context = ?, dependencies = ?,
               version = ?, updated_at = ?, last_checkpoint_at = ?
               WHERE id = ? AND version = ?"#,
        )
        .bind(molecule.state.as_str())
        .bind(serde_json::to_string(&molecule.payload)?)
        .bind(serde_json::to_string(&molecule.context)?)
        .bind(serde_json::to_string(&molecule.dependencies)?)
        .bind(molecule.version as i64)
        .bind(format_timestamp(molecule.updated_at))
        .bind(molecule.last_checkpoint_at.map(format_timestamp))
        .bind(&molecule.id)
        .bind(expected_version as i64)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DomainError::Conflict { entity: "molecule", id: molecule.id.clone() });
        }

        Self::insert_snapshot(&mut tx, snapshot).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn history(&self, id: &str, limit: usize) -> DomainResult<Vec<Snapshot>> {
        let rows: Vec<SnapshotRow> = sqlx::query_as(
            "SELECT * FROM molecule_snapshots WHERE molecule_id = ? ORDER BY sequence DESC LIMIT ?",
        )
        .bind(id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Snapshot::try_from).collect()
    }

    async fn latest_rollback_point(&self, id: &str) -> DomainResult<Option<Snapshot>> {
        let row: Option<SnapshotRow> = sqlx::query_as(
            r#"SELECT * FROM molecule_snapshots WHERE molecule_id = ? AND rollback_point = 1
               ORDER BY sequence DESC LIMIT 1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Snapshot::try_from).transpose()
    }

    async fn list_by_owner(&self, owner: &str) -> DomainResult<Vec<Molecule>> {
        let rows: Vec<MoleculeRow> =
            sqlx::query_as("SELECT * FROM molecules WHERE owner = ? ORDER BY created_at ASC, id ASC")
                .bind(owner)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Molecule::try_from).collect()
    }

    async fn prune_snapshots(&self, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let result = sqlx::query(
            r#"DELETE FROM molecule_snapshots
               WHERE rollback_point = 0 AND created_at < ?
               AND sequence < (SELECT m.version FROM molecules m WHERE m.id = molecule_snapshots.molecule_id)"#,
        )
        .bind(format_timestamp(cutoff))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn upsert_heartbeat(&self, heartbeat: &OwnerHeartbeat) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO owner_heartbeats (owner, active_molecules, last_heartbeat)
               VALUES (?, ?, ?)
               ON CONFLICT(owner) DO UPDATE SET
                   active_molecules = excluded.active_molecules,
                   last_heartbeat = excluded.last_heartbeat"#,
        )
        .bind(&heartbeat.owner)
        .bind(serde_json::to_string(&heartbeat.active_molecules)?)
        .bind(format_timestamp(heartbeat.last_heartbeat))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_heartbeat(&self, owner: &str) -> DomainResult<Option<OwnerHeartbeat>> {
        let row: Option<HeartbeatRow> = sqlx::query_as("SELECT * FROM owner_heartbeats WHERE owner = ?")
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;

        row.map(OwnerHeartbeat::try_from).transpose()
    }

    async fn heartbeats_before(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<OwnerHeartbeat>> {
        let rows: Vec<HeartbeatRow> = sqlx::query_as(
            "SELECT * FROM owner_heartbeats WHERE last_heartbeat < ? ORDER BY last_heartbeat ASC",
        )
        .bind(format_timestamp(cutoff))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OwnerHeartbeat::try_from).collect()
    }

    async fn delete_heartbeat(&self, owner: &str) -> DomainResult<()> {
        sqlx::query("DELETE FROM owner_heartbeats WHERE owner = ?")
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct MoleculeRow {
    id: String,
    owner: String,
    state: String,
    payload: String,
    context: String,
    dependencies: String,
    version: i64,
    created_at: String,
    updated_at: String,
    last_checkpoint_at: Option<String>,
}

fn parse_state(s: &str) -> DomainResult<MoleculeState> {
    MoleculeState::from_str(s)
        .ok_or_else(|| DomainError::SerializationError(format!("Invalid molecule state: {s}")))
}

impl TryFrom<MoleculeRow> for Molecule {
    type Error = DomainError;

    fn try_from(row: MoleculeRow) -> Result<Self, Self::Error> {
        Ok(Molecule {
            state: parse_state(&row.state)?,
            payload: parse_json(&row.payload)?,
            context: parse_json(&row.context)?,
            dependencies: parse_json(&row.dependencies)?,
            version: row.version as u64,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
            last_checkpoint_at: parse_optional_datetime(row.last_checkpoint_at)?,
            id: row.id,
            owner: row.owner,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    molecule_id: String,
    sequence: i64,
    state: String,
    payload: String,
    context: String,
    dependencies: String,
    rollback_point: bool,
    created_at: String,
}

impl TryFrom<SnapshotRow> for Snapshot {
    type Error = DomainError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        Ok(Snapshot {
            state: parse_state(&row.state)?,
            payload: parse_json(&row.payload)?,
            context: parse_json(&row.context)?,
            dependencies: parse_json(&row.dependencies)?,
            sequence: row.sequence as u64,
            rollback_point: row.rollback_point,
            created_at: parse_datetime(&row.created_at)?,
            molecule_id: row.molecule_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct HeartbeatRow {
    owner: String,
    active_molecules: String,
    last_heartbeat: String,
}

impl TryFrom<HeartbeatRow> for OwnerHeartbeat {
    type Error = DomainError;

    fn try_from(row: HeartbeatRow) -> Result<Self, Self::Error> {
        Ok(OwnerHeartbeat {
            active_molecules: parse_json(&row.active_molecules)?,
            last_heartbeat: parse_datetime(&row.last_heartbeat)?,
            owner: row.owner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use chrono::Duration;
    use serde_json::json;

    async fn setup_test_repo() -> SqliteMoleculeRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteMoleculeRepository::new(pool)
    }

    async fn create(repo: &SqliteMoleculeRepository, id: &str) -> Molecule {
        let molecule = Molecule::new(id, "owner-a", json!({"step": 0}), json!({}), vec![]);
        repo.create(&molecule, &molecule.snapshot(true)).await.unwrap();
        molecule
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = setup_test_repo().await;
        let molecule = create(&repo, "m1").await;

        let loaded = repo.get("m1").await.unwrap().unwrap();
        assert_eq!(loaded.owner, "owner-a");
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.created_at, molecule.created_at);
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_fails() {
        let repo = setup_test_repo().await;
        let molecule = create(&repo, "m1").await;

        let err = repo.create(&molecule, &molecule.snapshot(true)).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyExists { entity: "molecule", .. }));
    }

    #[tokio::test]
    async fn test_append_rejects_stale_version() {
        let repo = setup_test_repo().await;
        let molecule = create(&repo, "m1").await;

        let next = molecule.advance(MoleculeState::Running, json!({"step": 1}));
        repo.append(1, &next, &next.snapshot(false)).await.unwrap();

        let stale = molecule.advance(MoleculeState::Suspended, json!({"step": 9}));
        let err = repo.append(1, &stale, &stale.snapshot(false)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));

        let history = repo.history("m1", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sequence, 2);
        assert_eq!(history[0].state, MoleculeState::Running);
    }

    #[tokio::test]
    async fn test_latest_rollback_point() {
        let repo = setup_test_repo().await;
        let m1 = create(&repo, "m1").await;
        let m2 = m1.advance(MoleculeState::Running, json!({"step": 1}));
        repo.append(1, &m2, &m2.snapshot(true)).await.unwrap();
        let m3 = m2.advance(MoleculeState::Running, json!({"step": 2}));
        repo.append(2, &m3, &m3.snapshot(false)).await.unwrap();

        let point = repo.latest_rollback_point("m1").await.unwrap().unwrap();
        assert_eq!(point.sequence, 2);
        assert_eq!(point.payload, json!({"step": 1}));
    }

    #[tokio::test]
    async fn test_prune_keeps_latest_and_rollback_points() {
        let repo = setup_test_repo().await;
        let m1 = create(&repo, "m1").await;
        let m2 = m1.advance(MoleculeState::Running, json!({"step": 1}));
        repo.append(1, &m2, &m2.snapshot(false)).await.unwrap();
        let m3 = m2.advance(MoleculeState::Running, json!({"step": 2}));
        repo.append(2, &m3, &m3.snapshot(false)).await.unwrap();

        let pruned = repo.prune_snapshots(Utc::now() + Duration::hours(1)).await.unwrap();
        assert_eq!(pruned, 1);

        let sequences: Vec<u64> = repo.history("m1", 10).await.unwrap().iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![3, 1]);
    }

    #[tokio::test]
    async fn test_heartbeats() {
        let repo = setup_test_repo().await;
        let old = OwnerHeartbeat {
            owner: "a".into(),
            active_molecules: vec!["m1".into()],
            last_heartbeat: Utc::now() - Duration::minutes(10),
        };
        let fresh = OwnerHeartbeat {
            owner: "b".into(),
            active_molecules: vec![],
            last_heartbeat: Utc::now(),
        };
        repo.upsert_heartbeat(&old).await.unwrap();
        repo.upsert_heartbeat(&fresh).await.unwrap();

        let stalled = repo.heartbeats_before(Utc::now() - Duration::minutes(2)).await.unwrap();
        assert_eq!(stalled.len(), 1);
        assert_eq!(stalled[0].active_molecules, vec!["m1".to_string()]);

        repo.delete_heartbeat("a").await.unwrap();
        assert!(repo.get_heartbeat("a").await.unwrap().is_none());
        assert!(repo.get_heartbeat("b").await.unwrap().is_some());
    }
}
