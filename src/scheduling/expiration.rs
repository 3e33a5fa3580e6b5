use std::sync::Arc;

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::db::repositories::AgreementRepository;
use crate::db::DatabaseError;

/// Background housekeeping loop that promotes lapsed pending appointments to
/// expired. Sweeps are sequential: one finishes before the next interval
/// starts. Each agreement is handled independently, so one bad row never
/// stalls the rest, and the pending-only repository query makes repeated
/// sweeps naturally idempotent.
pub struct ExpirationSweeper {
    repo: Arc<dyn AgreementRepository>,
    interval: std::time::Duration,
    shutdown: CancellationToken,
}

impl ExpirationSweeper {
    pub fn new(
        repo: Arc<dyn AgreementRepository>,
        interval: std::time::Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            repo,
            interval,
            shutdown,
        }
    }

    /// Runs until the shutdown token fires. The first sweep happens
    /// immediately on startup, then once per interval.
    pub async fn run(self) {
        info!("appointment expiration sweeper starting");
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match self.sweep_once(OffsetDateTime::now_utc()).await {
                        Ok(0) => {}
                        Ok(count) => info!(count, "expired lapsed pending appointments"),
                        Err(err) => error!("expiration sweep failed: {err}"),
                    }
                }
            }
        }

        info!("appointment expiration sweeper stopping");
    }

    /// One pass: fetch lapsed pending agreements and expire each, persisting
    /// individually. Returns how many were expired; per-agreement persistence
    /// failures are logged and skipped.
    pub async fn sweep_once(&self, now: OffsetDateTime) -> Result<usize, DatabaseError> {
        let lapsed = self.repo.get_expired_pending(now).await?;
        let mut expired = 0;

        for mut agreement in lapsed {
            if !agreement.expire(now) {
                continue;
            }
            match self.repo.update(&agreement).await {
                Ok(()) => expired += 1,
                Err(err) => {
                    error!(agreement_id = %agreement.id, "failed to expire appointment: {err}");
                }
            }
        }

        Ok(expired)
    }
}
