//! Deferred liveness re-checks.
//!
//! Each check is persisted before its timer is armed, so pending checks can be
//! re-armed after a restart with [`RecheckScheduler::restore`]. There is no
//! cancellation: a check that fires after the mapping expired records the
//! expiry and skips the probe.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::entities::LinkStatus;
use crate::domain::lifecycle::next_status;
use crate::domain::repositories::{ScheduledCheckRepository, UrlMappingRepository};
use crate::domain::vetting::LivenessProbe;
use crate::error::AppError;

/// What a single re-check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The destination was probed and the status written.
    Updated {
        previous: LinkStatus,
        current: LinkStatus,
    },
    /// The mapping had expired; it was marked `expired` without a probe.
    Suppressed,
    /// No mapping has this id anymore.
    Missing,
}

struct Inner {
    mappings: Arc<dyn UrlMappingRepository>,
    checks: Arc<dyn ScheduledCheckRepository>,
    probe: Arc<dyn LivenessProbe>,
}

/// Timer-driven re-check runner; cheap to clone.
#[derive(Clone)]
pub struct RecheckScheduler {
    inner: Arc<Inner>,
}

impl RecheckScheduler {
    pub fn new(
        mappings: Arc<dyn UrlMappingRepository>,
        checks: Arc<dyn ScheduledCheckRepository>,
        probe: Arc<dyn LivenessProbe>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                mappings,
                checks,
                probe,
            }),
        }
    }

    /// Persists a re-check of `mapping_id` at `fire_at` and arms its timer.
    ///
    /// Enqueuing again for the same mapping replaces the fire time; the timer
    /// armed for the old time becomes a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PersistenceFailure`] if the check cannot be stored.
    /// Nothing is armed in that case.
    pub async fn enqueue(&self, mapping_id: i64, fire_at: DateTime<Utc>) -> Result<(), AppError> {
        // Arm with the stored value; storage may truncate the timestamp.
        let check = self.inner.checks.upsert(mapping_id, fire_at).await?;
        self.arm(check.mapping_id, check.fire_at);

        tracing::debug!(mapping_id, fire_at = %check.fire_at, "Re-check scheduled");
        Ok(())
    }

    /// Re-arms every persisted check; overdue ones fire immediately.
    ///
    /// Returns the number of timers armed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PersistenceFailure`] if pending checks cannot be read.
    pub async fn restore(&self) -> Result<usize, AppError> {
        let pending = self.inner.checks.list_pending().await?;
        let count = pending.len();

        for check in pending {
            self.arm(check.mapping_id, check.fire_at);
        }

        if count > 0 {
            tracing::info!(count, "Restored scheduled re-checks");
        }
        Ok(count)
    }

    fn arm(&self, mapping_id: i64, fire_at: DateTime<Utc>) {
        let delay = (fire_at - Utc::now()).to_std().unwrap_or_default();
        let scheduler = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.fire(mapping_id, fire_at).await;
        });
    }

    async fn fire(&self, mapping_id: i64, armed_fire_at: DateTime<Utc>) {
        match self.inner.checks.find(mapping_id).await {
            Ok(Some(check)) if check.fire_at == armed_fire_at => {}
            Ok(Some(_)) => {
                tracing::debug!(mapping_id, "Re-check was rescheduled, skipping stale timer");
                return;
            }
            Ok(None) => {
                tracing::debug!(mapping_id, "Re-check already handled");
                return;
            }
            Err(e) => {
                tracing::error!(mapping_id, error = %e, "Failed to load scheduled re-check");
                return;
            }
        }

        match self.run_check(mapping_id).await {
            Ok(outcome) => {
                tracing::info!(mapping_id, outcome = ?outcome, "Scheduled re-check finished");
            }
            Err(e) => {
                tracing::error!(mapping_id, error = %e, "Scheduled re-check failed");
            }
        }

        if let Err(e) = self.inner.checks.remove(mapping_id).await {
            tracing::error!(mapping_id, error = %e, "Failed to remove scheduled re-check");
        }
    }

    /// Probes the mapping's destination and records the resulting status.
    ///
    /// Also used for manual re-checks.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::PersistenceFailure`] on storage errors.
    pub async fn run_check(&self, mapping_id: i64) -> Result<CheckOutcome, AppError> {
        let Some(mapping) = self.inner.mappings.find_by_id(mapping_id).await? else {
            metrics::counter!("rechecks_total", "outcome" => "missing").increment(1);
            return Ok(CheckOutcome::Missing);
        };

        if mapping.is_expired_at(Utc::now()) {
            if mapping.status != LinkStatus::Expired {
                self.inner
                    .mappings
                    .update_status(mapping.id, LinkStatus::Expired, mapping.last_checked_at)
                    .await?;
            }
            metrics::counter!("rechecks_total", "outcome" => "suppressed").increment(1);
            return Ok(CheckOutcome::Suppressed);
        }

        let probe = self.inner.probe.probe(&mapping.original_url).await;
        let current = next_status(mapping.status, probe.is_reachable(), false);

        self.inner
            .mappings
            .update_status(mapping.id, current, Utc::now())
            .await?;

        if current != mapping.status {
            tracing::info!(
                mapping_id,
                short_code = %mapping.short_code,
                from = %mapping.status,
                to = %current,
                "Link status changed"
            );
        }
        metrics::counter!("rechecks_total", "outcome" => current.as_str()).increment(1);

        Ok(CheckOutcome::Updated {
            previous: mapping.status,
            current,
        })
    }
}
