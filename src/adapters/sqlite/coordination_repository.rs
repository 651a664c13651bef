//! SQLite implementation of the CoordinationRepository.
//!
//! Registry entries are stored as JSON documents keyed by their identity,
//! with a few indexed columns for ordering and filtering.

use async_trait::async_trait;
use sqlx::{Executor, Sqlite, SqlitePool};

use super::{format_timestamp, parse_json};
use crate::domain::errors::DomainResult;
use crate::domain::models::{AgentProfile, Conflict, Team, TeamStatus, WorkDistributionPlan};
use crate::domain::ports::CoordinationRepository;

#[derive(Clone)]
pub struct SqliteCoordinationRepository {
    pool: SqlitePool,
}

impl SqliteCoordinationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn decode_all<T: serde::de::DeserializeOwned>(rows: Vec<(String,)>) -> DomainResult<Vec<T>> {
    rows.iter().map(|(data,)| parse_json(data)).collect()
}

async fn upsert_team<'e, E: Executor<'e, Database = Sqlite>>(executor: E, team: &Team) -> DomainResult<()> {
    let status = match team.status {
        TeamStatus::Active => "active",
        TeamStatus::Disbanded => "disbanded",
    };
    sqlx::query(
        r#"INSERT INTO teams (id, team_type, status, data, formed_at) VALUES (?, ?, ?, ?, ?)
           ON CONFLICT(id) DO UPDATE SET status = excluded.status, data = excluded.data"#,
    )
    .bind(team.id.to_string())
    .bind(team.team_type.as_str())
    .bind(status)
    .bind(serde_json::to_string(team)?)
    .bind(format_timestamp(team.formed_at))
    .execute(executor)
    .await?;
    Ok(())
}

async fn upsert_plan<'e, E: Executor<'e, Database = Sqlite>>(executor: E, plan: &WorkDistributionPlan) -> DomainResult<()> {
    sqlx::query(
        r#"INSERT INTO distribution_plans (batch_id, data, created_at) VALUES (?, ?, ?)
           ON CONFLICT(batch_id) DO UPDATE SET data = excluded.data"#,
    )
    .bind(plan.batch_id.to_string())
    .bind(serde_json::to_string(plan)?)
    .bind(format_timestamp(plan.created_at))
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl CoordinationRepository for SqliteCoordinationRepository {
    async fn save_agent(&self, profile: &AgentProfile) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO agent_profiles (name, data, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(name) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at"#,
        )
        .bind(&profile.name)
        .bind(serde_json::to_string(profile)?)
        .bind(format_timestamp(profile.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_agent(&self, name: &str) -> DomainResult<()> {
        sqlx::query("DELETE FROM agent_profiles WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_agents(&self) -> DomainResult<Vec<AgentProfile>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT data FROM agent_profiles ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn save_team(&self, team: &Team) -> DomainResult<()> {
        upsert_team(&self.pool, team).await
    }

    async fn list_teams(&self) -> DomainResult<Vec<Team>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT data FROM teams ORDER BY formed_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn save_plan(&self, plan: &WorkDistributionPlan) -> DomainResult<()> {
        upsert_plan(&self.pool, plan).await
    }

    async fn record_distribution(&self, teams: &[Team], plan: &WorkDistributionPlan) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        for team in teams {
            upsert_team(&mut *tx, team).await?;
        }
        upsert_plan(&mut *tx, plan).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_plans(&self, limit: usize) -> DomainResult<Vec<WorkDistributionPlan>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT data FROM distribution_plans ORDER BY created_at DESC LIMIT ?")
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?;
        decode_all(rows)
    }

    async fn save_conflict(&self, conflict: &Conflict) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO conflicts (id, kind, resolved, data, detected_at) VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET resolved = excluded.resolved, data = excluded.data"#,
        )
        .bind(conflict.id.to_string())
        .bind(conflict.kind.as_str())
        .bind(conflict.is_resolved())
        .bind(serde_json::to_string(conflict)?)
        .bind(format_timestamp(conflict.detected_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_conflicts(&self) -> DomainResult<Vec<Conflict>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT data FROM conflicts ORDER BY detected_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }
}
