//! PostgreSQL implementation of the malicious URL audit trail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{MaliciousLog, NewMaliciousLog};
use crate::domain::repositories::MaliciousLogRepository;
use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct MaliciousLogRow {
    id: i64,
    url: String,
    user_agent: Option<String>,
    ip_address: Option<String>,
    risk_score: i32,
    details: String,
    created_at: DateTime<Utc>,
}

impl From<MaliciousLogRow> for MaliciousLog {
    fn from(row: MaliciousLogRow) -> Self {
        MaliciousLog {
            id: row.id,
            url: row.url,
            user_agent: row.user_agent,
            ip_address: row.ip_address,
            risk_score: row.risk_score,
            details: row.details,
            created_at: row.created_at,
        }
    }
}

/// Insert-only repository; there is deliberately no update or delete.
pub struct PgMaliciousLogRepository {
    pool: Arc<PgPool>,
}

impl PgMaliciousLogRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MaliciousLogRepository for PgMaliciousLogRepository {
    async fn append(&self, entry: NewMaliciousLog) -> Result<MaliciousLog, AppError> {
        let row = sqlx::query_as::<_, MaliciousLogRow>(
            r#"
            INSERT INTO malicious_logs (url, user_agent, ip_address, risk_score, details)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, url, user_agent, ip_address, risk_score, details, created_at
            "#,
        )
        .bind(entry.url)
        .bind(entry.user_agent)
        .bind(entry.ip_address)
        .bind(entry.risk_score)
        .bind(entry.details)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<MaliciousLog>, AppError> {
        let rows = sqlx::query_as::<_, MaliciousLogRow>(
            r#"
            SELECT id, url, user_agent, ip_address, risk_score, details, created_at
            FROM malicious_logs
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(MaliciousLog::from).collect())
    }
}
