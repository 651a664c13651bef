//! SQLite implementation of the WorkItemRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{format_timestamp, parse_datetime, parse_optional_json, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{TransitionPatch, WorkItem, WorkItemState, WorkPriority};
use crate::domain::ports::WorkItemRepository;

#[derive(Clone)]
pub struct SqliteWorkItemRepository {
    pool: SqlitePool,
}

impl SqliteWorkItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn to_json(value: Option<&serde_json::Value>) -> DomainResult<Option<String>> {
    value.map(serde_json::to_string).transpose().map_err(Into::into)
}

#[async_trait]
impl WorkItemRepository for SqliteWorkItemRepository {
    async fn ensure_queue(&self, agent: &str) -> DomainResult<()> {
        sqlx::query("INSERT INTO hook_queues (agent, created_at) VALUES (?, ?) ON CONFLICT(agent) DO NOTHING")
            .bind(agent)
            .bind(format_timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_queues(&self) -> DomainResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT agent FROM hook_queues ORDER BY agent ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(agent,)| agent).collect())
    }

    async fn insert(&self, item: &WorkItem) -> DomainResult<i64> {
        let result = sqlx::query(
            r#"INSERT INTO work_items (id, agent, work_type, work_ref, priority, requested_by, state,
               retry_count, reason, context, result, error, submitted_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(item.id.to_string())
        .bind(&item.agent)
        .bind(&item.work_type)
        .bind(&item.work_ref)
        .bind(item.priority.rank())
        .bind(&item.requested_by)
        .bind(item.state.as_str())
        .bind(i64::from(item.retry_count))
        .bind(&item.reason)
        .bind(to_json(item.context.as_ref())?)
        .bind(to_json(item.result.as_ref())?)
        .bind(to_json(item.error.as_ref())?)
        .bind(format_timestamp(item.submitted_at))
        .bind(format_timestamp(item.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => DomainError::AlreadyExists {
                entity: "work item",
                id: item.id.to_string(),
            },
            _ => e.into(),
        })?;

        Ok(result.last_insert_rowid())
    }

    async fn get(&self, agent: &str, id: Uuid) -> DomainResult<Option<WorkItem>> {
        let row: Option<WorkItemRow> = sqlx::query_as("SELECT * FROM work_items WHERE agent = ? AND id = ?")
            .bind(agent)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(WorkItem::try_from).transpose()
    }

    async fn transition(
        &self,
        agent: &str,
        id: Uuid,
        from: &[WorkItemState],
        to: WorkItemState,
        patch: &TransitionPatch,
    ) -> DomainResult<bool> {
        if from.is_empty() {
            return Ok(false);
        }

        // One conditional UPDATE: the state guard in the WHERE clause decides the winner.
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE work_items SET state = ");
        builder.push_bind(to.as_str());
        builder.push(", updated_at = ");
        builder.push_bind(format_timestamp(Utc::now()));
        if let Some(context) = to_json(patch.context.as_ref())? {
            builder.push(", context = ");
            builder.push_bind(context);
        }
        if let Some(result) = to_json(patch.result.as_ref())? {
            builder.push(", result = ");
            builder.push_bind(result);
        }
        if let Some(error) = to_json(patch.error.as_ref())? {
            builder.push(", error = ");
            builder.push_bind(error);
        }
        if patch.increment_retry {
            builder.push(", retry_count = retry_count + 1");
        }
        builder.push(" WHERE agent = ");
        builder.push_bind(agent);
        builder.push(" AND id = ");
        builder.push_bind(id.to_string());
        builder.push(" AND state IN (");
        let mut states = builder.separated(", ");
        for state in from {
            states.push_bind(state.as_str());
        }
        states.push_unseparated(")");

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_pending(&self, agent: &str, limit: Option<usize>) -> DomainResult<Vec<WorkItem>> {
        let limit = limit.map_or(-1, |l| l as i64);
        let rows: Vec<WorkItemRow> = sqlx::query_as(
            r#"SELECT * FROM work_items WHERE agent = ? AND state = 'pending'
               ORDER BY priority ASC, seq ASC LIMIT ?"#,
        )
        .bind(agent)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WorkItem::try_from).collect()
    }

    async fn count_by_state(&self, agent: &str) -> DomainResult<BTreeMap<WorkItemState, u64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT state, COUNT(*) FROM work_items WHERE agent = ? GROUP BY state")
                .bind(agent)
                .fetch_all(&self.pool)
                .await?;

        let mut counts: BTreeMap<WorkItemState, u64> = WorkItemState::ALL.iter().map(|s| (*s, 0)).collect();
        for (state, count) in rows {
            let state = parse_state(&state)?;
            counts.insert(state, count as u64);
        }
        Ok(counts)
    }

    async fn recent(&self, agent: &str, limit: usize) -> DomainResult<Vec<WorkItem>> {
        let rows: Vec<WorkItemRow> = sqlx::query_as(
            "SELECT * FROM work_items WHERE agent = ? ORDER BY updated_at DESC, seq DESC LIMIT ?",
        )
        .bind(agent)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WorkItem::try_from).collect()
    }

    async fn prune_finished(&self, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let result = sqlx::query(
            "DELETE FROM work_items WHERE state IN ('completed', 'failed') AND updated_at < ?",
        )
        .bind(format_timestamp(cutoff))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn parse_state(s: &str) -> DomainResult<WorkItemState> {
    WorkItemState::from_str(s)
        .ok_or_else(|| DomainError::SerializationError(format!("Invalid work item state: {s}")))
}

#[derive(sqlx::FromRow)]
struct WorkItemRow {
    seq: i64,
    id: String,
    agent: String,
    work_type: String,
    work_ref: String,
    priority: i64,
    requested_by: String,
    state: String,
    retry_count: i64,
    reason: Option<String>,
    context: Option<String>,
    result: Option<String>,
    error: Option<String>,
    submitted_at: String,
    updated_at: String,
}

impl TryFrom<WorkItemRow> for WorkItem {
    type Error = DomainError;

    fn try_from(row: WorkItemRow) -> Result<Self, Self::Error> {
        let priority = WorkPriority::from_rank(row.priority)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid priority rank: {}", row.priority)))?;

        Ok(WorkItem {
            id: parse_uuid(&row.id)?,
            agent: row.agent,
            work_type: row.work_type,
            work_ref: row.work_ref,
            priority,
            requested_by: row.requested_by,
            state: parse_state(&row.state)?,
            retry_count: row.retry_count as u32,
            reason: row.reason,
            context: parse_optional_json(row.context)?,
            result: parse_optional_json(row.result)?,
            error: parse_optional_json(row.error)?,
            sequence: row.seq,
            submitted_at: parse_datetime(&row.submitted_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}
