//! The expiry scanner: drains near-expiry sessions into the archive.
//!
//! Each tick walks the whole cache. An entry within `expiry_threshold`
//! of its TTL is read, upserted into the archive, and then removed from
//! the cache. Everything else waits for a later tick.
//!
//! # Failure handling
//!
//! A tick never aborts part-way. Per entry:
//!
//! | What went wrong | Outcome |
//! |---|---|
//! | entry vanished before it could be read | `skipped`, nothing logged above trace |
//! | cache read failed | `failed`, logged, entry left alone |
//! | archive write failed | `failed`, logged, entry **not** deleted |
//! | cache delete failed | `failed`, logged; already archived, retried next tick |
//!
//! Because the archive write is an upsert and the delete is
//! conditional, re-running a half-finished tick is always safe.

use std::sync::Arc;
use std::time::Duration;

use playgate_session::{Archive, CacheEntry, SessionCache, SessionRecord};
use playgate_tick::{TickConfig, TickMetrics, TickScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::SyncConfig;

/// What one scanner tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Entries enumerated from the cache.
    pub examined: usize,
    /// Entries written to the archive.
    pub archived: usize,
    /// Near-expiry entries that disappeared before they could be read.
    pub skipped: usize,
    /// Near-expiry entries that hit a store error.
    pub failed: usize,
}

/// Migrates near-expiry sessions from a [`SessionCache`] to an [`Archive`].
pub struct ExpiryScanner<C, A> {
    cache: Arc<C>,
    archive: Arc<A>,
    threshold: Duration,
    tick: TickConfig,
}

impl<C: SessionCache, A: Archive> ExpiryScanner<C, A> {
    pub fn new(cache: Arc<C>, archive: Arc<A>, config: &SyncConfig) -> Self {
        Self {
            cache,
            archive,
            threshold: config.expiry_threshold,
            tick: config.tick_config(),
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Runs one full pass over the cache.
    pub async fn tick(&self) -> ScanReport {
        let mut report = ScanReport::default();

        let entries = match self.cache.scan_all().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "cache scan failed, retrying next tick");
                return report;
            }
        };

        for entry in entries {
            report.examined += 1;
            if !entry.expires_within(self.threshold) {
                continue;
            }
            self.migrate(&entry, &mut report).await;
        }

        report
    }

    async fn migrate(&self, entry: &CacheEntry, report: &mut ScanReport) {
        let handle = &entry.handle;

        // Re-read, since the entry may have expired or been replaced
        // since it was enumerated.
        let identity = match self.cache.get(handle).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                trace!(%handle, "entry vanished before migration");
                report.skipped += 1;
                return;
            }
            Err(e) => {
                warn!(%handle, error = %e, "cache read failed");
                report.failed += 1;
                return;
            }
        };

        let record = SessionRecord::new(handle.clone(), identity);
        if let Err(e) = self.archive.upsert(&record).await {
            warn!(%handle, error = %e, "archive write failed, keeping cache entry");
            report.failed += 1;
            return;
        }

        match self.cache.delete_if_expiring(handle, self.threshold).await {
            Ok(true) => trace!(%handle, "session archived"),
            Ok(false) => trace!(%handle, "session archived, cache entry refreshed meanwhile"),
            Err(e) => {
                warn!(%handle, error = %e, "cache delete failed after archiving");
                report.failed += 1;
                return;
            }
        }
        report.archived += 1;
    }

    /// Ticks until `cancel` fires.
    ///
    /// Cancellation is checked between ticks, so shutdown waits for at
    /// most one in-flight tick. Returns the scheduler's final metrics.
    pub async fn run(self, cancel: CancellationToken) -> TickMetrics {
        let mut scheduler = TickScheduler::new(self.tick.clone());
        debug!(
            interval_ms = scheduler.period().as_millis() as u64,
            threshold_ms = self.threshold.as_millis() as u64,
            "expiry scanner started"
        );

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                info = scheduler.wait_for_tick() => {
                    let report = self.tick().await;
                    scheduler.record_tick_end();
                    if report.archived > 0 || report.failed > 0 {
                        let metrics = scheduler.metrics();
                        debug!(
                            tick = info.tick,
                            examined = report.examined,
                            archived = report.archived,
                            skipped = report.skipped,
                            failed = report.failed,
                            avg_scan_ms = metrics.avg_tick_time.as_secs_f64() * 1000.0,
                            max_scan_ms = metrics.max_tick_time.as_secs_f64() * 1000.0,
                            utilization = metrics.budget_utilization,
                            "scan finished"
                        );
                    } else {
                        trace!(tick = info.tick, examined = report.examined, "scan finished");
                    }
                }
            }
        }

        let metrics = scheduler.metrics().clone();
        debug!(
            ticks = metrics.total_ticks,
            overruns = metrics.total_overruns,
            skipped_periods = metrics.total_skipped,
            max_scan_ms = metrics.max_tick_time.as_secs_f64() * 1000.0,
            "expiry scanner stopped"
        );
        metrics
    }
}
