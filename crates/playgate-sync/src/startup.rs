//! Startup sync: replay the archive into the cache once per process.

use tracing::{info, warn};

use playgate_session::{Archive, SessionCache, SessionConfig};

/// What the startup sync did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub failed: usize,
}

/// Writes every archived record into the cache with
/// `session.restore_ttl`.
///
/// The archive is only read; its records stay where they are. Failures
/// are logged and counted, never returned: a process that cannot
/// restore sessions still serves logins.
pub async fn startup_sync<C, A>(cache: &C, archive: &A, session: &SessionConfig) -> RestoreReport
where
    C: SessionCache,
    A: Archive,
{
    let mut report = RestoreReport::default();

    let records = match archive.scan_all().await {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "archive unavailable, skipping startup sync");
            return report;
        }
    };

    for record in &records {
        match cache
            .set(&record.handle, &record.external_identity, session.restore_ttl)
            .await
        {
            Ok(()) => report.restored += 1,
            Err(e) => {
                warn!(handle = %record.handle, error = %e, "restore failed");
                report.failed += 1;
            }
        }
    }

    info!(
        restored = report.restored,
        failed = report.failed,
        ttl_secs = session.restore_ttl.as_secs(),
        "startup sync finished"
    );
    report
}
