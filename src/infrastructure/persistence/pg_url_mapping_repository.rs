//! PostgreSQL implementation of the URL mapping repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{LinkStatus, NewUrlMapping, UrlMapping};
use crate::domain::repositories::UrlMappingRepository;
use crate::error::AppError;
use crate::utils::db_error::is_unique_violation_on_code;

const MAPPING_COLUMNS: &str = "id, short_code, original_url, created_at, intended_live_date, \
     intended_expiry_date, last_checked_at, status, check_interval_hours";

#[derive(sqlx::FromRow)]
struct UrlMappingRow {
    id: i64,
    short_code: String,
    original_url: String,
    created_at: DateTime<Utc>,
    intended_live_date: Option<DateTime<Utc>>,
    intended_expiry_date: Option<DateTime<Utc>>,
    last_checked_at: DateTime<Utc>,
    status: String,
    check_interval_hours: i32,
}

impl TryFrom<UrlMappingRow> for UrlMapping {
    type Error = AppError;

    fn try_from(row: UrlMappingRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<LinkStatus>().map_err(|e| {
            AppError::persistence(
                "Stored mapping has an unknown status",
                json!({ "id": row.id, "reason": e.to_string() }),
            )
        })?;

        Ok(UrlMapping {
            id: row.id,
            short_code: row.short_code,
            original_url: row.original_url,
            created_at: row.created_at,
            intended_live_date: row.intended_live_date,
            intended_expiry_date: row.intended_expiry_date,
            last_checked_at: row.last_checked_at,
            status,
            check_interval_hours: row.check_interval_hours,
        })
    }
}

fn into_mappings(rows: Vec<UrlMappingRow>) -> Result<Vec<UrlMapping>, AppError> {
    rows.into_iter().map(UrlMapping::try_from).collect()
}

/// PostgreSQL repository for URL mappings.
///
/// Short code uniqueness relies on the `url_mappings_short_code_key`
/// constraint; a violation surfaces as [`AppError::Conflict`].
pub struct PgUrlMappingRepository {
    pool: Arc<PgPool>,
}

impl PgUrlMappingRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UrlMappingRepository for PgUrlMappingRepository {
    async fn create(&self, new_mapping: NewUrlMapping) -> Result<UrlMapping, AppError> {
        let sql = format!(
            r#"
            INSERT INTO url_mappings
                (short_code, original_url, intended_live_date, intended_expiry_date,
                 last_checked_at, status, check_interval_hours)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {MAPPING_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, UrlMappingRow>(&sql)
            .bind(&new_mapping.short_code)
            .bind(&new_mapping.original_url)
            .bind(new_mapping.intended_live_date)
            .bind(new_mapping.intended_expiry_date)
            .bind(new_mapping.last_checked_at)
            .bind(new_mapping.status.as_str())
            .bind(new_mapping.check_interval_hours)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(|e| {
                if is_unique_violation_on_code(&e) {
                    AppError::conflict(
                        "Short code already exists",
                        json!({ "short_code": new_mapping.short_code }),
                    )
                } else {
                    AppError::from(e)
                }
            })?;

        row.try_into()
    }

    async fn find_by_short_code(&self, code: &str) -> Result<Option<UrlMapping>, AppError> {
        let sql = format!("SELECT {MAPPING_COLUMNS} FROM url_mappings WHERE short_code = $1");

        sqlx::query_as::<_, UrlMappingRow>(&sql)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(UrlMapping::try_from)
            .transpose()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UrlMapping>, AppError> {
        let sql = format!("SELECT {MAPPING_COLUMNS} FROM url_mappings WHERE id = $1");

        sqlx::query_as::<_, UrlMappingRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(UrlMapping::try_from)
            .transpose()
    }

    async fn update_status(
        &self,
        id: i64,
        status: LinkStatus,
        last_checked_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE url_mappings SET status = $2, last_checked_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(last_checked_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        status: Option<LinkStatus>,
        limit: i64,
    ) -> Result<Vec<UrlMapping>, AppError> {
        let sql = format!(
            r#"
            SELECT {MAPPING_COLUMNS}
            FROM url_mappings
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        );

        let rows = sqlx::query_as::<_, UrlMappingRow>(&sql)
            .bind(status.map(|s| s.as_str()))
            .bind(limit)
            .fetch_all(self.pool.as_ref())
            .await?;

        into_mappings(rows)
    }

    async fn list_due_for_recheck(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<UrlMapping>, AppError> {
        let sql = format!(
            r#"
            SELECT {MAPPING_COLUMNS}
            FROM url_mappings
            WHERE status IN ('live', 'inactive')
              AND last_checked_at + make_interval(hours => check_interval_hours) <= $1
              AND (intended_expiry_date IS NULL OR intended_expiry_date > $1)
            ORDER BY last_checked_at ASC
            LIMIT $2
            "#
        );

        let rows = sqlx::query_as::<_, UrlMappingRow>(&sql)
            .bind(now)
            .bind(limit)
            .fetch_all(self.pool.as_ref())
            .await?;

        into_mappings(rows)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}
