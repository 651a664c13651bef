//! Hook work queue.
//!
//! Per-agent priority backlog. Every state change is a single conditional
//! write in the repository, so concurrent claimants in any process see
//! exactly one winner; losing a race is reported as `false`, not an error.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CoreEvent, QueueStatus, TransitionPatch, WorkItem, WorkItemState, WorkPriority, WorkQueueConfig,
};
use crate::domain::ports::{EventSink, NullEventSink, WorkItemRepository};
use crate::services::storage_retry::RetryPolicy;

const ENTITY: &str = "work item";

/// Parameters of a new work item.
#[derive(Debug, Clone)]
pub struct SlingRequest {
    pub agent: String,
    pub work_type: String,
    pub work_ref: String,
    pub requested_by: String,
    pub priority: WorkPriority,
    pub reason: Option<String>,
}

impl SlingRequest {
    pub fn new(agent: impl Into<String>, work_type: impl Into<String>, work_ref: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            work_type: work_type.into(),
            work_ref: work_ref.into(),
            requested_by: String::from("system"),
            priority: WorkPriority::default(),
            reason: None,
        }
    }

    pub fn with_priority(mut self, priority: WorkPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn requested_by(mut self, requester: impl Into<String>) -> Self {
        self.requested_by = requester.into();
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    fn validate(&self) -> DomainResult<()> {
        for (field, value) in [
            ("agent", &self.agent),
            ("work type", &self.work_type),
            ("work reference", &self.work_ref),
            ("requester", &self.requested_by),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::ValidationError(format!("{field} cannot be empty")));
            }
        }
        Ok(())
    }
}

pub struct WorkQueue<R: WorkItemRepository> {
    repo: Arc<R>,
    config: WorkQueueConfig,
    retry: RetryPolicy,
    events: Arc<dyn EventSink>,
}

impl<R: WorkItemRepository> WorkQueue<R> {
    pub fn new(repo: Arc<R>, config: WorkQueueConfig, retry: RetryPolicy) -> Self {
        Self {
            repo,
            config,
            retry,
            events: Arc::new(NullEventSink),
        }
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &WorkQueueConfig {
        &self.config
    }

    /// Create the agent's queue if it does not exist. Idempotent.
    pub async fn ensure_queue(&self, agent: &str) -> DomainResult<()> {
        if agent.trim().is_empty() {
            return Err(DomainError::ValidationError("agent cannot be empty".into()));
        }
        self.retry.execute(|| self.repo.ensure_queue(agent)).await
    }

    pub async fn list_agents(&self) -> DomainResult<Vec<String>> {
        self.retry.execute(|| self.repo.list_queues()).await
    }

    /// Put a new Pending item on an agent's hook, creating the queue lazily.
    #[instrument(skip(self), fields(agent = %request.agent), err)]
    pub async fn sling(&self, request: SlingRequest) -> DomainResult<Uuid> {
        request.validate()?;
        self.ensure_queue(&request.agent).await?;

        let item = WorkItem::new(
            &request.agent,
            &request.work_type,
            &request.work_ref,
            &request.requested_by,
            request.priority,
            request.reason,
        );
        let sequence = self.retry.execute(|| self.repo.insert(&item)).await?;

        info!(item_id = %item.id, sequence, work_type = %item.work_type, work_ref = %item.work_ref, priority = %item.priority, "work slung");
        self.events.publish(CoreEvent::WorkSlung {
            agent: item.agent,
            item_id: item.id,
            work_type: item.work_type,
            work_ref: item.work_ref,
            priority: item.priority,
        });
        Ok(item.id)
    }

    pub async fn get(&self, agent: &str, id: Uuid) -> DomainResult<WorkItem> {
        self.retry
            .execute(|| self.repo.get(agent, id))
            .await?
            .ok_or_else(|| DomainError::not_found(ENTITY, id.to_string()))
    }

    /// Pending items, most urgent first, then in submission order.
    pub async fn peek(&self, agent: &str, limit: Option<usize>) -> DomainResult<Vec<WorkItem>> {
        self.retry.execute(|| self.repo.list_pending(agent, limit)).await
    }

    /// Pending → Claimed. Exactly one of any number of concurrent callers wins.
    #[instrument(skip(self), err)]
    pub async fn claim(&self, agent: &str, id: Uuid) -> DomainResult<bool> {
        let won = self.race(agent, id, WorkItemState::Claimed, TransitionPatch::default()).await?;
        if won {
            info!("work claimed");
            self.events.publish(CoreEvent::WorkClaimed {
                agent: agent.to_string(),
                item_id: id,
            });
        }
        Ok(won)
    }

    /// Claimed → Executing, recording the execution context.
    #[instrument(skip(self, context), err)]
    pub async fn begin_execution(&self, agent: &str, id: Uuid, context: Option<Value>) -> DomainResult<bool> {
        let patch = TransitionPatch {
            context,
            ..Default::default()
        };
        let won = self.race(agent, id, WorkItemState::Executing, patch).await?;
        if won {
            info!("work execution started");
            self.events.publish(CoreEvent::WorkStarted {
                agent: agent.to_string(),
                item_id: id,
            });
        }
        Ok(won)
    }

    /// {Claimed, Executing} → Completed.
    #[instrument(skip(self, result), err)]
    pub async fn complete(&self, agent: &str, id: Uuid, result: Option<Value>) -> DomainResult<()> {
        let patch = TransitionPatch {
            result,
            ..Default::default()
        };
        self.settle(agent, id, WorkItemState::Completed, patch, "complete").await?;
        info!("work completed");
        self.events.publish(CoreEvent::WorkCompleted {
            agent: agent.to_string(),
            item_id: id,
        });
        Ok(())
    }

    /// Any non-terminal state → Failed, incrementing the retry count.
    ///
    /// Retrying is the caller's job: sling a fresh item.
    #[instrument(skip(self, error_info), err)]
    pub async fn fail(&self, agent: &str, id: Uuid, error_info: Value) -> DomainResult<()> {
        let patch = TransitionPatch {
            error: Some(error_info),
            increment_retry: true,
            ..Default::default()
        };
        let item = self.settle(agent, id, WorkItemState::Failed, patch, "fail").await?;
        warn!(retry_count = item.retry_count, "work failed");
        self.events.publish(CoreEvent::WorkFailed {
            agent: agent.to_string(),
            item_id: id,
            retry_count: item.retry_count,
        });
        Ok(())
    }

    /// Counts per state plus the most recently updated items.
    pub async fn status(&self, agent: &str) -> DomainResult<QueueStatus> {
        let counts = self.retry.execute(|| self.repo.count_by_state(agent)).await?;
        let recent = self
            .retry
            .execute(|| self.repo.recent(agent, self.config.recent_activity_limit))
            .await?;
        Ok(QueueStatus {
            agent: agent.to_string(),
            counts,
            recent,
        })
    }

    /// Delete Completed and Failed items older than `older_than_days`.
    pub async fn prune(&self, older_than_days: u32) -> DomainResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(older_than_days));
        let pruned = self.retry.execute(|| self.repo.prune_finished(cutoff)).await?;
        info!(pruned, older_than_days, "finished work items pruned");
        Ok(pruned)
    }

    /// Conditional transition where losing is a normal outcome.
    async fn race(&self, agent: &str, id: Uuid, to: WorkItemState, patch: TransitionPatch) -> DomainResult<bool> {
        let sources = WorkItemState::sources_for(to);
        let won = self
            .retry
            .execute(|| self.repo.transition(agent, id, sources, to, &patch))
            .await?;
        if !won {
            // Distinguish a lost race from an item that does not exist.
            self.get(agent, id).await?;
            debug!(target_state = %to, "transition lost");
        }
        Ok(won)
    }

    /// Conditional transition where a wrong source state is a caller error.
    async fn settle(
        &self,
        agent: &str,
        id: Uuid,
        to: WorkItemState,
        patch: TransitionPatch,
        operation: &'static str,
    ) -> DomainResult<WorkItem> {
        let sources = WorkItemState::sources_for(to);
        let applied = self
            .retry
            .execute(|| self.repo.transition(agent, id, sources, to, &patch))
            .await?;
        let item = self.get(agent, id).await?;
        if !applied {
            return Err(DomainError::invalid_state(ENTITY, id.to_string(), item.state, operation));
        }
        Ok(item)
    }
}
