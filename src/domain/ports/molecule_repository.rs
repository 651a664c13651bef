//! Molecule repository port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Molecule, OwnerHeartbeat, Snapshot};

/// Repository interface for the molecule checkpoint ledger.
///
/// Implementations must make `append` a conditional write: it only succeeds
/// when the stored molecule version still equals `expected_version`.
#[async_trait]
pub trait MoleculeRepository: Send + Sync {
    /// Insert a new molecule together with its initial snapshot.
    ///
    /// Fails `AlreadyExists` when the id is taken.
    async fn create(&self, molecule: &Molecule, initial: &Snapshot) -> DomainResult<()>;

    /// Get the current view of a molecule.
    async fn get(&self, id: &str) -> DomainResult<Option<Molecule>>;

    /// Replace the current view and append `snapshot` atomically.
    ///
    /// Fails `Conflict` when another writer advanced the molecule first.
    async fn append(
        &self,
        expected_version: u64,
        molecule: &Molecule,
        snapshot: &Snapshot,
    ) -> DomainResult<()>;

    /// Snapshots of a molecule, most recent first.
    async fn history(&self, id: &str, limit: usize) -> DomainResult<Vec<Snapshot>>;

    /// The most recent snapshot flagged as a rollback point.
    async fn latest_rollback_point(&self, id: &str) -> DomainResult<Option<Snapshot>>;

    /// Molecules owned by `owner`.
    async fn list_by_owner(&self, owner: &str) -> DomainResult<Vec<Molecule>>;

    /// Delete non-rollback-point snapshots created before `cutoff`.
    ///
    /// A molecule's latest snapshot is never deleted.
    async fn prune_snapshots(&self, cutoff: DateTime<Utc>) -> DomainResult<u64>;

    // Heartbeat operations

    /// Record an owner heartbeat, replacing the previous one.
    async fn upsert_heartbeat(&self, heartbeat: &OwnerHeartbeat) -> DomainResult<()>;

    async fn get_heartbeat(&self, owner: &str) -> DomainResult<Option<OwnerHeartbeat>>;

    /// Heartbeats last seen before `cutoff`.
    async fn heartbeats_before(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<OwnerHeartbeat>>;

    async fn delete_heartbeat(&self, owner: &str) -> DomainResult<()>;
}
