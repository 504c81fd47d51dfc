//! In-process storage backend.
//!
//! Used when `STORAGE_BACKEND=memory` and by the integration tests. State is
//! lost on restart, so scheduled checks do not survive one either.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::domain::entities::{
    LinkStatus, MaliciousLog, NewMaliciousLog, NewUrlMapping, ScheduledCheck, UrlMapping,
};
use crate::domain::repositories::{
    MaliciousLogRepository, ScheduledCheckRepository, UrlMappingRepository,
};
use crate::error::AppError;

/// All three repositories backed by [`DashMap`]s.
///
/// Short code uniqueness is decided by a single `entry()` call on the code
/// index, so two concurrent creations with the same code cannot both succeed.
#[derive(Debug)]
pub struct InMemoryStore {
    mappings: DashMap<i64, UrlMapping>,
    codes: DashMap<String, i64>,
    malicious_logs: DashMap<i64, MaliciousLog>,
    checks: DashMap<i64, ScheduledCheck>,
    next_mapping_id: AtomicI64,
    next_log_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            mappings: DashMap::new(),
            codes: DashMap::new(),
            malicious_logs: DashMap::new(),
            checks: DashMap::new(),
            next_mapping_id: AtomicI64::new(1),
            next_log_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn clamp_limit(limit: i64) -> usize {
    usize::try_from(limit.max(0)).unwrap_or(usize::MAX)
}

#[async_trait]
impl UrlMappingRepository for InMemoryStore {
    async fn create(&self, new_mapping: NewUrlMapping) -> Result<UrlMapping, AppError> {
        match self.codes.entry(new_mapping.short_code.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict(
                "Short code already exists",
                json!({ "short_code": new_mapping.short_code }),
            )),
            Entry::Vacant(slot) => {
                let id = self.next_mapping_id.fetch_add(1, Ordering::SeqCst);
                let mapping = UrlMapping {
                    id,
                    short_code: new_mapping.short_code,
                    original_url: new_mapping.original_url,
                    created_at: Utc::now(),
                    intended_live_date: new_mapping.intended_live_date,
                    intended_expiry_date: new_mapping.intended_expiry_date,
                    last_checked_at: new_mapping.last_checked_at,
                    status: new_mapping.status,
                    check_interval_hours: new_mapping.check_interval_hours,
                };

                self.mappings.insert(id, mapping.clone());
                slot.insert(id);
                Ok(mapping)
            }
        }
    }

    async fn find_by_short_code(&self, code: &str) -> Result<Option<UrlMapping>, AppError> {
        let Some(id) = self.codes.get(code).map(|entry| *entry.value()) else {
            return Ok(None);
        };

        Ok(self.mappings.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UrlMapping>, AppError> {
        Ok(self.mappings.get(&id).map(|entry| entry.value().clone()))
    }

    async fn update_status(
        &self,
        id: i64,
        status: LinkStatus,
        last_checked_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        match self.mappings.get_mut(&id) {
            Some(mut mapping) => {
                mapping.status = status;
                mapping.last_checked_at = last_checked_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(
        &self,
        status: Option<LinkStatus>,
        limit: i64,
    ) -> Result<Vec<UrlMapping>, AppError> {
        let mut items: Vec<UrlMapping> = self
            .mappings
            .iter()
            .filter(|entry| status.is_none_or(|s| entry.status == s))
            .map(|entry| entry.value().clone())
            .collect();

        newest_first(&mut items, |m| (m.created_at, m.id));
        items.truncate(clamp_limit(limit));
        Ok(items)
    }

    async fn list_due_for_recheck(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<UrlMapping>, AppError> {
        let mut items: Vec<UrlMapping> = self
            .mappings
            .iter()
            .filter(|entry| matches!(entry.status, LinkStatus::Live | LinkStatus::Inactive))
            .filter(|entry| {
                entry.last_checked_at
                    + chrono::Duration::hours(i64::from(entry.check_interval_hours))
                    <= now
            })
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value().clone())
            .collect();

        items.sort_by_key(|m| m.last_checked_at);
        items.truncate(clamp_limit(limit));
        Ok(items)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl MaliciousLogRepository for InMemoryStore {
    async fn append(&self, entry: NewMaliciousLog) -> Result<MaliciousLog, AppError> {
        let id = self.next_log_id.fetch_add(1, Ordering::SeqCst);
        let log = MaliciousLog {
            id,
            url: entry.url,
            user_agent: entry.user_agent,
            ip_address: entry.ip_address,
            risk_score: entry.risk_score,
            details: entry.details,
            created_at: Utc::now(),
        };

        self.malicious_logs.insert(id, log.clone());
        Ok(log)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<MaliciousLog>, AppError> {
        let mut items: Vec<MaliciousLog> = self
            .malicious_logs
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        newest_first(&mut items, |l| (l.created_at, l.id));
        items.truncate(clamp_limit(limit));
        Ok(items)
    }
}

#[async_trait]
impl ScheduledCheckRepository for InMemoryStore {
    async fn upsert(
        &self,
        mapping_id: i64,
        fire_at: DateTime<Utc>,
    ) -> Result<ScheduledCheck, AppError> {
        if !self.mappings.contains_key(&mapping_id) {
            return Err(AppError::persistence(
                "Scheduled check references an unknown mapping",
                json!({ "mapping_id": mapping_id }),
            ));
        }

        let check = ScheduledCheck {
            mapping_id,
            fire_at,
            created_at: Utc::now(),
        };

        let stored = self
            .checks
            .entry(mapping_id)
            .and_modify(|existing| existing.fire_at = fire_at)
            .or_insert(check);

        Ok(stored.value().clone())
    }

    async fn find(&self, mapping_id: i64) -> Result<Option<ScheduledCheck>, AppError> {
        Ok(self.checks.get(&mapping_id).map(|entry| entry.value().clone()))
    }

    async fn remove(&self, mapping_id: i64) -> Result<bool, AppError> {
        Ok(self.checks.remove(&mapping_id).is_some())
    }

    async fn list_pending(&self) -> Result<Vec<ScheduledCheck>, AppError> {
        let mut items: Vec<ScheduledCheck> =
            self.checks.iter().map(|entry| entry.value().clone()).collect();

        items.sort_by_key(|c| c.fire_at);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::DEFAULT_CHECK_INTERVAL_HOURS;
    use chrono::Duration;
    use std::sync::Arc;

    fn new_mapping(code: &str, status: LinkStatus) -> NewUrlMapping {
        NewUrlMapping {
            short_code: code.to_string(),
            original_url: format!("https://example.com/{code}"),
            intended_live_date: None,
            intended_expiry_date: None,
            last_checked_at: Utc::now(),
            status,
            check_interval_hours: DEFAULT_CHECK_INTERVAL_HOURS,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryStore::new();

        let created = store
            .create(new_mapping("abcd1234", LinkStatus::Live))
            .await
            .unwrap();

        let by_code = store.find_by_short_code("abcd1234").await.unwrap().unwrap();
        let by_id = store.find_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(by_code, created);
        assert_eq!(by_id, created);
        assert!(store.find_by_short_code("zzzz9999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let store = InMemoryStore::new();

        store
            .create(new_mapping("abcd1234", LinkStatus::Live))
            .await
            .unwrap();
        let err = store
            .create(new_mapping("abcd1234", LinkStatus::Pending))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict { .. }));
        let kept = store.find_by_short_code("abcd1234").await.unwrap().unwrap();
        assert_eq!(kept.status, LinkStatus::Live);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_code_has_one_winner() {
        let store = Arc::new(InMemoryStore::new());
        let mut handles = vec![];

        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.create(new_mapping("samecode", LinkStatus::Live)).await
            }));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(store.list(None, 100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_status() {
        let store = InMemoryStore::new();
        let created = store
            .create(new_mapping("abcd1234", LinkStatus::Pending))
            .await
            .unwrap();
        let checked_at = Utc::now() + Duration::minutes(5);

        assert!(
            store
                .update_status(created.id, LinkStatus::Inactive, checked_at)
                .await
                .unwrap()
        );
        assert!(
            !store
                .update_status(created.id + 100, LinkStatus::Live, checked_at)
                .await
                .unwrap()
        );

        let updated = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(updated.status, LinkStatus::Inactive);
        assert_eq!(updated.last_checked_at, checked_at);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let store = InMemoryStore::new();
        store
            .create(new_mapping("live0001", LinkStatus::Live))
            .await
            .unwrap();
        store
            .create(new_mapping("pend0001", LinkStatus::Pending))
            .await
            .unwrap();
        store
            .create(new_mapping("live0002", LinkStatus::Live))
            .await
            .unwrap();

        let live = store.list(Some(LinkStatus::Live), 10).await.unwrap();
        assert_eq!(live.len(), 2);
        assert!(live.iter().all(|m| m.status == LinkStatus::Live));

        assert_eq!(store.list(None, 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_due_for_recheck() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        let mut stale = new_mapping("stale001", LinkStatus::Inactive);
        stale.last_checked_at = now - Duration::hours(25);
        let stale = store.create(stale).await.unwrap();

        let mut fresh = new_mapping("fresh001", LinkStatus::Live);
        fresh.last_checked_at = now - Duration::hours(1);
        store.create(fresh).await.unwrap();

        let mut pending = new_mapping("pend0001", LinkStatus::Pending);
        pending.last_checked_at = now - Duration::hours(48);
        store.create(pending).await.unwrap();

        let mut expired = new_mapping("expd0001", LinkStatus::Live);
        expired.last_checked_at = now - Duration::hours(48);
        expired.intended_expiry_date = Some(now - Duration::minutes(1));
        store.create(expired).await.unwrap();

        let due = store.list_due_for_recheck(now, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, stale.id);
    }

    #[tokio::test]
    async fn test_malicious_log_newest_first() {
        let store = InMemoryStore::new();

        for i in 0..3 {
            store
                .append(NewMaliciousLog {
                    url: format!("https://bad{i}.example"),
                    user_agent: None,
                    ip_address: Some("10.0.0.1".to_string()),
                    risk_score: 5,
                    details: "Failed safety check".to_string(),
                })
                .await
                .unwrap();
        }

        let logs = store.list_recent(2).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].url, "https://bad2.example");
    }

    #[tokio::test]
    async fn test_scheduled_check_upsert_replaces_fire_time() {
        let store = InMemoryStore::new();
        let mapping = store
            .create(new_mapping("abcd1234", LinkStatus::Pending))
            .await
            .unwrap();
        let first = Utc::now() + Duration::hours(1);
        let second = first + Duration::hours(1);

        store.upsert(mapping.id, first).await.unwrap();
        store.upsert(mapping.id, second).await.unwrap();

        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].fire_at, second);

        assert!(store.remove(mapping.id).await.unwrap());
        assert!(!store.remove(mapping.id).await.unwrap());
        assert!(store.find(mapping.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scheduled_check_requires_mapping() {
        let store = InMemoryStore::new();

        let err = store.upsert(42, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::PersistenceFailure { .. }));
    }
}
