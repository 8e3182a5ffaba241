//! Process-wide ownership of the background jobs.

use std::sync::Arc;

use playgate_session::{Archive, SessionCache, SessionConfig};
use playgate_tick::TickMetrics;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{ExpiryScanner, RestoreReport, SyncConfig, startup_sync};

/// Handle to the running background jobs: one expiry scanner and, if
/// enabled, one startup sync.
///
/// [`SyncJobs::start`] is the only place either job is spawned, and the
/// server calls it once while building, so overlapping scanners cannot
/// occur. Both jobs share one cancellation token.
pub struct SyncJobs {
    cancel: CancellationToken,
    scanner: JoinHandle<TickMetrics>,
    startup: Option<JoinHandle<Option<RestoreReport>>>,
}

impl SyncJobs {
    /// Spawns the jobs on the current tokio runtime.
    ///
    /// The startup sync runs concurrently with the scanner and with
    /// request handling; a restored session is just another `set`.
    pub fn start<C, A>(
        cache: Arc<C>,
        archive: Arc<A>,
        sync: SyncConfig,
        session: &SessionConfig,
    ) -> Self
    where
        C: SessionCache,
        A: Archive,
    {
        let sync = sync.validated();
        let cancel = CancellationToken::new();

        let startup = sync.restore_on_start.then(|| {
            let cache = Arc::clone(&cache);
            let archive = Arc::clone(&archive);
            let session = session.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("startup sync cancelled");
                        None
                    }
                    report = startup_sync(cache.as_ref(), archive.as_ref(), &session) => Some(report),
                }
            })
        });

        let scanner = ExpiryScanner::new(cache, archive, &sync);
        let scanner = tokio::spawn(scanner.run(cancel.clone()));

        info!(
            scan_interval_ms = sync.scan_interval.as_millis() as u64,
            expiry_threshold_ms = sync.expiry_threshold.as_millis() as u64,
            restore_on_start = sync.restore_on_start,
            "background sync jobs started"
        );

        Self {
            cancel,
            scanner,
            startup,
        }
    }

    /// A token that fires when the jobs are shut down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// `true` until the scanner task has exited.
    pub fn is_running(&self) -> bool {
        !self.scanner.is_finished()
    }

    /// Waits for the startup sync to finish and returns its report.
    ///
    /// Returns `None` if it was disabled, was cancelled, or has already
    /// been awaited.
    pub async fn wait_for_startup(&mut self) -> Option<RestoreReport> {
        let handle = self.startup.take()?;
        match handle.await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "startup sync task panicked");
                None
            }
        }
    }

    /// Cancels both jobs and waits for them to exit.
    ///
    /// Returns the scanner's final tick metrics, or `None` if it panicked.
    pub async fn shutdown(mut self) -> Option<TickMetrics> {
        self.cancel.cancel();
        self.wait_for_startup().await;
        let metrics = match self.scanner.await {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                error!(error = %e, "expiry scanner task panicked");
                None
            }
        };
        info!(
            scans = metrics.as_ref().map_or(0, |m| m.total_ticks),
            "background sync jobs stopped"
        );
        metrics
    }
}
