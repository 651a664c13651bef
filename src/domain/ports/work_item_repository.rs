//! Work item repository port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{TransitionPatch, WorkItem, WorkItemState};

/// Repository interface for per-agent hook queues.
#[async_trait]
pub trait WorkItemRepository: Send + Sync {
    /// Create the queue for `agent` if it does not exist yet.
    async fn ensure_queue(&self, agent: &str) -> DomainResult<()>;

    /// Agents that own a queue.
    async fn list_queues(&self) -> DomainResult<Vec<String>>;

    /// Insert a new item and return its submission sequence.
    async fn insert(&self, item: &WorkItem) -> DomainResult<i64>;

    async fn get(&self, agent: &str, id: Uuid) -> DomainResult<Option<WorkItem>>;

    /// Move an item into `to` only if it currently sits in one of `from`.
    ///
    /// Returns `true` when this call performed the transition. Must be a
    /// single conditional write so that concurrent callers, in any process,
    /// observe exactly one winner.
    async fn transition(
        &self,
        agent: &str,
        id: Uuid,
        from: &[WorkItemState],
        to: WorkItemState,
        patch: &TransitionPatch,
    ) -> DomainResult<bool>;

    /// Pending items ordered by priority rank, then submission order.
    async fn list_pending(&self, agent: &str, limit: Option<usize>) -> DomainResult<Vec<WorkItem>>;

    async fn count_by_state(&self, agent: &str) -> DomainResult<BTreeMap<WorkItemState, u64>>;

    /// Most recently updated items, newest first.
    async fn recent(&self, agent: &str, limit: usize) -> DomainResult<Vec<WorkItem>>;

    /// Delete completed and failed items last updated before `cutoff`.
    async fn prune_finished(&self, cutoff: DateTime<Utc>) -> DomainResult<u64>;
}
