//! Short link creation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::application::services::recheck_scheduler::RecheckScheduler;
use crate::application::services::validation_service::{Submitter, UrlValidator};
use crate::domain::entities::{DEFAULT_CHECK_INTERVAL_HOURS, LinkStatus, NewUrlMapping, UrlMapping};
use crate::domain::lifecycle::{check_requested_dates, initial_status};
use crate::domain::repositories::UrlMappingRepository;
use crate::error::AppError;
use crate::utils::code_generator::generate_code;

/// Attempts at finding an unused short code before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct CreateLinkRequest {
    pub url: String,
    pub intended_live_date: Option<DateTime<Utc>>,
    pub intended_expiry_date: Option<DateTime<Utc>>,
    pub submitter: Submitter,
}

#[derive(Debug, Clone)]
pub struct CreatedLink {
    pub mapping: UrlMapping,
    /// The destination answered the creation probe with a 3xx status.
    pub redirect_detected: bool,
}

/// Service for vetting URLs and turning them into short links.
///
/// A URL goes through syntax, date, safety and liveness checks in that order;
/// the first failing check decides the error and later checks never run. The
/// stored URL is the submitted one, trimmed but otherwise unchanged.
pub struct LinkService {
    mappings: Arc<dyn UrlMappingRepository>,
    validator: UrlValidator,
    scheduler: RecheckScheduler,
}

impl LinkService {
    pub fn new(
        mappings: Arc<dyn UrlMappingRepository>,
        validator: UrlValidator,
        scheduler: RecheckScheduler,
    ) -> Self {
        Self {
            mappings,
            validator,
            scheduler,
        }
    }

    /// Vets `request.url` and stores a new mapping for it.
    ///
    /// A destination that is safe but not reachable is still accepted: it is
    /// stored as `pending` with a re-check at the intended live date, or as
    /// `inactive` when no future live date was given.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidSyntax`] / [`AppError::NotHttps`] from the syntax check
    /// - [`AppError::Validation`] if the requested dates are inconsistent
    /// - [`AppError::UnsafeUrl`], [`AppError::SafetyCheckUnavailable`],
    ///   [`AppError::SafetyCheckFailed`] from the safety check
    /// - [`AppError::CodeAllocationExhausted`] if no free code was found
    /// - [`AppError::PersistenceFailure`] on storage errors
    pub async fn create_link(&self, request: CreateLinkRequest) -> Result<CreatedLink, AppError> {
        let result = self.vet_and_store(request).await;

        match &result {
            Ok(created) => {
                metrics::counter!(
                    "links_created_total",
                    "status" => created.mapping.status.as_str()
                )
                .increment(1);
            }
            Err(e) => {
                metrics::counter!("links_rejected_total", "reason" => e.code()).increment(1);
            }
        }

        result
    }

    async fn vet_and_store(&self, request: CreateLinkRequest) -> Result<CreatedLink, AppError> {
        let url = UrlValidator::check_syntax(&request.url)?;

        // Date rules and the initial status are judged at submission time,
        // not after the outbound checks.
        let submitted_at = Utc::now();
        check_requested_dates(
            request.intended_live_date,
            request.intended_expiry_date,
            submitted_at,
        )?;

        self.validator
            .check_safety(&url, &request.submitter)
            .await?;

        let probe = self.validator.check_liveness(&url).await;

        let checked_at = Utc::now();
        let status = initial_status(probe.is_reachable(), request.intended_live_date, submitted_at);

        let template = NewUrlMapping {
            short_code: String::new(),
            original_url: request.url.trim().to_string(),
            intended_live_date: request.intended_live_date,
            intended_expiry_date: request.intended_expiry_date,
            last_checked_at: checked_at,
            status,
            check_interval_hours: DEFAULT_CHECK_INTERVAL_HOURS,
        };
        let mapping = self.insert_with_fresh_code(template).await?;

        if mapping.status == LinkStatus::Pending
            && let Some(live_date) = mapping.intended_live_date
            && let Err(e) = self.scheduler.enqueue(mapping.id, live_date).await
        {
            self.demote_unscheduled(&mapping, checked_at).await;
            return Err(e);
        }

        tracing::info!(
            short_code = %mapping.short_code,
            status = %mapping.status,
            redirect = probe.is_redirect(),
            "Short link created"
        );

        Ok(CreatedLink {
            mapping,
            redirect_detected: probe.is_redirect(),
        })
    }

    /// Marks a `pending` mapping whose re-check could not be stored as
    /// `inactive`, so periodic re-checks still cover it.
    async fn demote_unscheduled(&self, mapping: &UrlMapping, checked_at: DateTime<Utc>) {
        tracing::error!(
            short_code = %mapping.short_code,
            "Failed to schedule re-check, marking link inactive"
        );

        if let Err(e) = self
            .mappings
            .update_status(mapping.id, LinkStatus::Inactive, checked_at)
            .await
        {
            tracing::error!(
                short_code = %mapping.short_code,
                error = %e,
                "Failed to mark unscheduled link inactive"
            );
        }
    }

    /// Inserts `template` under a freshly generated code, retrying on
    /// collision. Uniqueness is decided by the storage layer only.
    async fn insert_with_fresh_code(&self, template: NewUrlMapping) -> Result<UrlMapping, AppError> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_code().map_err(|e| {
                AppError::code_allocation_exhausted(
                    "Failed to generate short code",
                    json!({ "reason": e.to_string() }),
                )
            })?;

            let candidate = NewUrlMapping {
                short_code: code,
                ..template.clone()
            };

            match self.mappings.create(candidate).await {
                Ok(mapping) => return Ok(mapping),
                Err(AppError::Conflict { .. }) => {
                    tracing::warn!(attempt, "Short code collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::code_allocation_exhausted(
            "Failed to allocate a unique short code",
            json!({ "attempts": MAX_CODE_ATTEMPTS }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ScheduledCheck;
    use crate::domain::repositories::{
        MockMaliciousLogRepository, MockScheduledCheckRepository, MockUrlMappingRepository,
    };
    use crate::domain::vetting::{
        MockLivenessProbe, MockSafetyChecker, ProbeOutcome, SafetyCheckError, SafetyVerdict,
    };
    use chrono::Duration;

    struct Mocks {
        mappings: MockUrlMappingRepository,
        safety: MockSafetyChecker,
        probe: MockLivenessProbe,
        logs: MockMaliciousLogRepository,
        checks: MockScheduledCheckRepository,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                mappings: MockUrlMappingRepository::new(),
                safety: MockSafetyChecker::new(),
                probe: MockLivenessProbe::new(),
                logs: MockMaliciousLogRepository::new(),
                checks: MockScheduledCheckRepository::new(),
            }
        }

        fn safe(mut self) -> Self {
            self.safety
                .expect_check()
                .times(1)
                .returning(|_| Ok(SafetyVerdict::Safe));
            self
        }

        fn probe_answers(mut self, outcome: ProbeOutcome) -> Self {
            self.probe
                .expect_probe()
                .times(1)
                .returning(move |_| outcome.clone());
            self
        }

        fn stores_mappings(mut self) -> Self {
            self.mappings
                .expect_create()
                .times(1)
                .returning(|new| Ok(stored(new)));
            self
        }

        fn service(self) -> LinkService {
            let mappings: Arc<dyn UrlMappingRepository> = Arc::new(self.mappings);
            let probe = Arc::new(self.probe);
            let validator = UrlValidator::new(Arc::new(self.safety), probe.clone(), Arc::new(self.logs));
            let scheduler = RecheckScheduler::new(mappings.clone(), Arc::new(self.checks), probe);
            LinkService::new(mappings, validator, scheduler)
        }
    }

    fn stored(new: NewUrlMapping) -> UrlMapping {
        UrlMapping {
            id: 42,
            short_code: new.short_code,
            original_url: new.original_url,
            created_at: Utc::now(),
            intended_live_date: new.intended_live_date,
            intended_expiry_date: new.intended_expiry_date,
            last_checked_at: new.last_checked_at,
            status: new.status,
            check_interval_hours: new.check_interval_hours,
        }
    }

    fn request(url: &str) -> CreateLinkRequest {
        CreateLinkRequest {
            url: url.to_string(),
            intended_live_date: None,
            intended_expiry_date: None,
            submitter: Submitter::default(),
        }
    }

    fn unreachable() -> ProbeOutcome {
        ProbeOutcome::Unreachable {
            status: Some(404),
            reason: "404 Not Found".to_string(),
        }
    }

    #[tokio::test]
    async fn test_reachable_url_is_live() {
        let mut mocks = Mocks::new()
            .safe()
            .probe_answers(ProbeOutcome::Live { status: 200 });
        mocks
            .mappings
            .expect_create()
            .withf(|new| {
                new.original_url == "https://example.com/a"
                    && new.status == LinkStatus::Live
                    && new.short_code.len() == 8
                    && new.check_interval_hours == DEFAULT_CHECK_INTERVAL_HOURS
            })
            .times(1)
            .returning(|new| Ok(stored(new)));
        mocks.checks.expect_upsert().times(0);

        let created = mocks
            .service()
            .create_link(request("  https://example.com/a "))
            .await
            .unwrap();

        assert_eq!(created.mapping.status, LinkStatus::Live);
        assert!(!created.redirect_detected);
    }

    #[tokio::test]
    async fn test_redirecting_url_is_live_and_reported() {
        let mocks = Mocks::new()
            .safe()
            .probe_answers(ProbeOutcome::Redirect {
                status: 301,
                location: Some("https://www.example.com/".to_string()),
            })
            .stores_mappings();

        let created = mocks
            .service()
            .create_link(request("https://example.com"))
            .await
            .unwrap();

        assert_eq!(created.mapping.status, LinkStatus::Live);
        assert!(created.redirect_detected);
    }

    #[tokio::test]
    async fn test_unreachable_with_future_live_date_is_pending_and_scheduled() {
        let live_date = Utc::now() + Duration::hours(1);
        let mut mocks = Mocks::new()
            .safe()
            .probe_answers(unreachable())
            .stores_mappings();
        mocks
            .checks
            .expect_upsert()
            .withf(move |id, fire_at| *id == 42 && *fire_at == live_date)
            .times(1)
            .returning(|mapping_id, fire_at| {
                Ok(ScheduledCheck {
                    mapping_id,
                    fire_at,
                    created_at: Utc::now(),
                })
            });

        let mut req = request("https://example.com/launch");
        req.intended_live_date = Some(live_date);

        let created = mocks.service().create_link(req).await.unwrap();
        assert_eq!(created.mapping.status, LinkStatus::Pending);
    }

    #[tokio::test]
    async fn test_unreachable_without_live_date_is_inactive() {
        let mut mocks = Mocks::new()
            .safe()
            .probe_answers(unreachable())
            .stores_mappings();
        mocks.checks.expect_upsert().times(0);

        let created = mocks
            .service()
            .create_link(request("https://example.com/missing"))
            .await
            .unwrap();

        assert_eq!(created.mapping.status, LinkStatus::Inactive);
    }

    #[tokio::test]
    async fn test_code_collision_is_retried() {
        let mut mocks = Mocks::new()
            .safe()
            .probe_answers(ProbeOutcome::Live { status: 200 });
        let mut seq = mockall::Sequence::new();
        mocks
            .mappings
            .expect_create()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|new| {
                Err(AppError::conflict(
                    "Short code already exists",
                    json!({ "short_code": new.short_code }),
                ))
            });
        mocks
            .mappings
            .expect_create()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|new| Ok(stored(new)));

        let created = mocks
            .service()
            .create_link(request("https://example.com"))
            .await
            .unwrap();

        assert_eq!(created.mapping.id, 42);
    }

    #[tokio::test]
    async fn test_code_allocation_gives_up() {
        let mut mocks = Mocks::new()
            .safe()
            .probe_answers(ProbeOutcome::Live { status: 200 });
        mocks
            .mappings
            .expect_create()
            .times(MAX_CODE_ATTEMPTS)
            .returning(|_| Err(AppError::conflict("Short code already exists", json!({}))));

        let err = mocks
            .service()
            .create_link(request("https://example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::CodeAllocationExhausted { .. }));
    }

    #[tokio::test]
    async fn test_storage_failure_is_not_retried() {
        let mut mocks = Mocks::new()
            .safe()
            .probe_answers(ProbeOutcome::Live { status: 200 });
        mocks
            .mappings
            .expect_create()
            .times(1)
            .returning(|_| Err(AppError::persistence("Database error", json!({}))));

        let err = mocks
            .service()
            .create_link(request("https://example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PersistenceFailure { .. }));
    }

    #[tokio::test]
    async fn test_bad_syntax_makes_no_calls() {
        let mut mocks = Mocks::new();
        mocks.safety.expect_check().times(0);
        mocks.probe.expect_probe().times(0);
        mocks.mappings.expect_create().times(0);

        let service = mocks.service();

        let err = service.create_link(request("not a url")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidSyntax { .. }));

        let err = service
            .create_link(request("http://example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotHttps { .. }));
    }

    #[tokio::test]
    async fn test_bad_dates_rejected_before_safety_check() {
        let mut mocks = Mocks::new();
        mocks.safety.expect_check().times(0);
        mocks.mappings.expect_create().times(0);

        let mut req = request("https://example.com");
        req.intended_live_date = Some(Utc::now() + Duration::days(2));
        req.intended_expiry_date = Some(Utc::now() + Duration::days(1));

        let err = mocks.service().create_link(req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_unsafe_url_stops_pipeline() {
        let mut mocks = Mocks::new();
        mocks.safety.expect_check().times(1).returning(|_| {
            Ok(SafetyVerdict::Unsafe {
                threat_type: "MALWARE".to_string(),
            })
        });
        mocks.logs.expect_append().times(1).returning(|entry| {
            Ok(crate::domain::entities::MaliciousLog {
                id: 1,
                url: entry.url,
                user_agent: entry.user_agent,
                ip_address: entry.ip_address,
                risk_score: entry.risk_score,
                details: entry.details,
                created_at: Utc::now(),
            })
        });
        mocks.probe.expect_probe().times(0);
        mocks.mappings.expect_create().times(0);

        let err = mocks
            .service()
            .create_link(request("https://malware.example"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsafeUrl { .. }));
    }

    #[tokio::test]
    async fn test_unconfigured_safety_check_blocks_creation() {
        let mut mocks = Mocks::new();
        mocks
            .safety
            .expect_check()
            .returning(|_| Err(SafetyCheckError::MissingCredential));
        mocks.probe.expect_probe().times(0);
        mocks.mappings.expect_create().times(0);

        let err = mocks
            .service()
            .create_link(request("https://example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SafetyCheckUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_failed_scheduling_demotes_pending_link() {
        let live_date = Utc::now() + Duration::hours(1);
        let mut mocks = Mocks::new()
            .safe()
            .probe_answers(unreachable())
            .stores_mappings();
        mocks
            .checks
            .expect_upsert()
            .times(1)
            .returning(|_, _| Err(AppError::persistence("Database error", json!({}))));
        mocks
            .mappings
            .expect_update_status()
            .withf(|id, status, _| *id == 42 && *status == LinkStatus::Inactive)
            .times(1)
            .returning(|_, _, _| Ok(true));

        let mut req = request("https://example.com/launch");
        req.intended_live_date = Some(live_date);

        let err = mocks.service().create_link(req).await.unwrap_err();

        assert!(matches!(err, AppError::PersistenceFailure { .. }));
    }

    /// Slow and unreachable on the first call, reachable afterwards.
    struct SlowFirstProbe {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl crate::domain::vetting::LivenessProbe for SlowFirstProbe {
        async fn probe(&self, _url: &str) -> ProbeOutcome {
            let call = self
                .calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if call == 0 {
                tokio::time::sleep(std::time::Duration::from_millis(400)).await;
                unreachable()
            } else {
                ProbeOutcome::Live { status: 200 }
            }
        }
    }

    #[tokio::test]
    async fn test_live_date_passing_during_slow_probe_stays_pending() {
        use crate::domain::repositories::ScheduledCheckRepository;
        use crate::infrastructure::persistence::InMemoryStore;

        let store = Arc::new(InMemoryStore::new());
        let probe = Arc::new(SlowFirstProbe {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let mut safety = MockSafetyChecker::new();
        safety.expect_check().returning(|_| Ok(SafetyVerdict::Safe));

        let validator = UrlValidator::new(Arc::new(safety), probe.clone(), store.clone());
        let scheduler = RecheckScheduler::new(store.clone(), store.clone(), probe);
        let service = LinkService::new(store.clone(), validator, scheduler);

        let mut req = request("https://launch.example");
        req.intended_live_date = Some(Utc::now() + Duration::milliseconds(100));

        let created = service.create_link(req).await.unwrap();
        assert_eq!(created.mapping.status, LinkStatus::Pending);

        // The live date has already passed, so the re-check fires at once.
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            if store.list_pending().await.unwrap().is_empty() {
                break;
            }
        }

        let mapping = store.find_by_id(created.mapping.id).await.unwrap().unwrap();
        assert_eq!(mapping.status, LinkStatus::Live);
        assert!(store.list_pending().await.unwrap().is_empty());
    }
}
