//! PostgreSQL implementation of the scheduled check store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::ScheduledCheck;
use crate::domain::repositories::ScheduledCheckRepository;
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct ScheduledCheckRow {
    mapping_id: i64,
    fire_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<ScheduledCheckRow> for ScheduledCheck {
    fn from(row: ScheduledCheckRow) -> Self {
        ScheduledCheck {
            mapping_id: row.mapping_id,
            fire_at: row.fire_at,
            created_at: row.created_at,
        }
    }
}

/// Rows keyed by mapping id; deleting a mapping cascades to its check.
pub struct PgScheduledCheckRepository {
    pool: Arc<PgPool>,
}

impl PgScheduledCheckRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScheduledCheckRepository for PgScheduledCheckRepository {
    async fn upsert(
        &self,
        mapping_id: i64,
        fire_at: DateTime<Utc>,
    ) -> Result<ScheduledCheck, AppError> {
        let row = sqlx::query_as::<_, ScheduledCheckRow>(
            r#"
            INSERT INTO scheduled_checks (mapping_id, fire_at)
            VALUES ($1, $2)
            ON CONFLICT (mapping_id) DO UPDATE SET fire_at = EXCLUDED.fire_at
            RETURNING mapping_id, fire_at, created_at
            "#,
        )
        .bind(mapping_id)
        .bind(fire_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn find(&self, mapping_id: i64) -> Result<Option<ScheduledCheck>, AppError> {
        let row = sqlx::query_as::<_, ScheduledCheckRow>(
            "SELECT mapping_id, fire_at, created_at FROM scheduled_checks WHERE mapping_id = $1",
        )
        .bind(mapping_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(ScheduledCheck::from))
    }

    async fn remove(&self, mapping_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM scheduled_checks WHERE mapping_id = $1")
            .bind(mapping_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_pending(&self) -> Result<Vec<ScheduledCheck>, AppError> {
        let rows = sqlx::query_as::<_, ScheduledCheckRow>(
            "SELECT mapping_id, fire_at, created_at FROM scheduled_checks ORDER BY fire_at ASC",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(ScheduledCheck::from).collect())
    }
}
