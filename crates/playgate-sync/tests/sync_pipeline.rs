//! Integration tests for the cache → archive → cache pipeline.
//!
//! Everything runs on in-memory stores with a paused tokio clock, so
//! TTLs and scanner ticks are exact.

use std::sync::Arc;
use std::time::Duration;

use playgate_protocol::PlayerHandle;
use playgate_session::{
    Archive, CacheEntry, MemoryArchive, MemoryCache, SessionCache, SessionConfig, SessionError,
    SessionRecord,
};
use playgate_sync::{ExpiryScanner, RestoreReport, ScanReport, SyncConfig, SyncJobs, startup_sync};

// =========================================================================
// Helpers
// =========================================================================

fn h(s: &str) -> PlayerHandle {
    PlayerHandle::from(s)
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn stores() -> (Arc<MemoryCache>, Arc<MemoryArchive>) {
    (Arc::new(MemoryCache::new()), Arc::new(MemoryArchive::new()))
}

fn scanner<C: SessionCache, A: Archive>(cache: &Arc<C>, archive: &Arc<A>) -> ExpiryScanner<C, A> {
    ExpiryScanner::new(Arc::clone(cache), Arc::clone(archive), &SyncConfig::default())
}

/// An archive that refuses writes for one handle.
struct FlakyArchive {
    inner: MemoryArchive,
    refuse: PlayerHandle,
}

impl Archive for FlakyArchive {
    async fn upsert(&self, record: &SessionRecord) -> Result<(), SessionError> {
        if record.handle == self.refuse {
            return Err(SessionError::Store("disk full".into()));
        }
        self.inner.upsert(record).await
    }

    async fn get(&self, handle: &PlayerHandle) -> Result<Option<SessionRecord>, SessionError> {
        self.inner.get(handle).await
    }

    async fn scan_all(&self) -> Result<Vec<SessionRecord>, SessionError> {
        self.inner.scan_all().await
    }

    async fn len(&self) -> Result<usize, SessionError> {
        self.inner.len().await
    }
}

/// An archive that is down entirely.
struct DownArchive;

impl Archive for DownArchive {
    async fn upsert(&self, _: &SessionRecord) -> Result<(), SessionError> {
        Err(SessionError::Store("connection refused".into()))
    }

    async fn get(&self, _: &PlayerHandle) -> Result<Option<SessionRecord>, SessionError> {
        Err(SessionError::Store("connection refused".into()))
    }

    async fn scan_all(&self) -> Result<Vec<SessionRecord>, SessionError> {
        Err(SessionError::Store("connection refused".into()))
    }

    async fn len(&self) -> Result<usize, SessionError> {
        Err(SessionError::Store("connection refused".into()))
    }
}

/// A cache whose entries show up in scans but are gone by the time
/// they are read, like a store evicting a key mid-scan.
struct VanishingCache {
    inner: MemoryCache,
}

impl SessionCache for VanishingCache {
    async fn set(
        &self,
        handle: &PlayerHandle,
        identity: &str,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        self.inner.set(handle, identity, ttl).await
    }

    async fn get(&self, _: &PlayerHandle) -> Result<Option<String>, SessionError> {
        Ok(None)
    }

    async fn scan_all(&self) -> Result<Vec<CacheEntry>, SessionError> {
        self.inner.scan_all().await
    }

    async fn delete(&self, handle: &PlayerHandle) -> Result<bool, SessionError> {
        self.inner.delete(handle).await
    }

    async fn delete_if_expiring(
        &self,
        handle: &PlayerHandle,
        threshold: Duration,
    ) -> Result<bool, SessionError> {
        self.inner.delete_if_expiring(handle, threshold).await
    }
}

// =========================================================================
// Scanner ticks
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_tick_near_expiry_entry_moves_to_archive() {
    let (cache, archive) = stores();
    cache.set(&h("bcd"), "abc", secs(3)).await.unwrap();

    let report = scanner(&cache, &archive).tick().await;

    assert_eq!(
        report,
        ScanReport {
            examined: 1,
            archived: 1,
            skipped: 0,
            failed: 0
        }
    );
    assert_eq!(
        archive.get(&h("bcd")).await.unwrap(),
        Some(SessionRecord::new(h("bcd"), "abc"))
    );
    assert_eq!(cache.get(&h("bcd")).await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_tick_fresh_entry_is_untouched() {
    let (cache, archive) = stores();
    cache.set(&h("bcd"), "abc", secs(30)).await.unwrap();

    let report = scanner(&cache, &archive).tick().await;

    assert_eq!(report.examined, 1);
    assert_eq!(report.archived, 0);
    assert_eq!(cache.ttl(&h("bcd")).await, Some(secs(30)));
    assert_eq!(archive.len().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_tick_threshold_is_inclusive() {
    let (cache, archive) = stores();
    cache.set(&h("edge"), "e", secs(5)).await.unwrap();

    let report = scanner(&cache, &archive).tick().await;

    assert_eq!(report.archived, 1);
}

#[tokio::test(start_paused = true)]
async fn test_tick_mixed_cache_only_migrates_near_expiry() {
    let (cache, archive) = stores();
    cache.set(&h("old"), "o", secs(2)).await.unwrap();
    cache.set(&h("new"), "n", secs(600)).await.unwrap();

    let report = scanner(&cache, &archive).tick().await;

    assert_eq!(report.examined, 2);
    assert_eq!(report.archived, 1);
    assert!(archive.get(&h("old")).await.unwrap().is_some());
    assert!(archive.get(&h("new")).await.unwrap().is_none());
    assert!(cache.get(&h("new")).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_tick_archive_failure_keeps_entry_and_continues() {
    let cache = Arc::new(MemoryCache::new());
    let archive = Arc::new(FlakyArchive {
        inner: MemoryArchive::new(),
        refuse: h("stuck"),
    });
    cache.set(&h("stuck"), "s", secs(3)).await.unwrap();
    cache.set(&h("fine"), "f", secs(3)).await.unwrap();

    let report = scanner(&cache, &archive).tick().await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.archived, 1);
    // Not archived, so it must still be in the cache.
    assert_eq!(cache.get(&h("stuck")).await.unwrap().as_deref(), Some("s"));
    assert!(archive.get(&h("fine")).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_tick_vanished_entry_is_skipped() {
    let cache = Arc::new(VanishingCache {
        inner: MemoryCache::new(),
    });
    let archive = Arc::new(MemoryArchive::new());
    cache.set(&h("ghost"), "g", secs(3)).await.unwrap();

    let report = scanner(&cache, &archive).tick().await;

    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(archive.len().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_tick_twice_archives_once() {
    let (cache, archive) = stores();
    let scanner = scanner(&cache, &archive);

    cache.set(&h("bcd"), "abc", secs(3)).await.unwrap();
    scanner.tick().await;
    // The player logs in again and is migrated a second time.
    cache.set(&h("bcd"), "abc", secs(3)).await.unwrap();
    scanner.tick().await;

    assert_eq!(archive.len().await.unwrap(), 1);
    assert_eq!(
        archive.get(&h("bcd")).await.unwrap(),
        Some(SessionRecord::new(h("bcd"), "abc"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_tick_racing_login_never_loses_session() {
    let (cache, archive) = stores();
    let scanner = scanner(&cache, &archive);
    let login_ttl = SessionConfig::default().login_ttl;

    for round in 0..50 {
        let handle = h(&format!("p{round}"));
        cache.set(&handle, "id", secs(3)).await.unwrap();

        let relogin = async {
            for _ in 0..round % 4 {
                tokio::task::yield_now().await;
            }
            cache.set(&handle, "id", login_ttl).await.unwrap();
        };
        tokio::join!(scanner.tick(), relogin);

        let in_cache = cache.get(&handle).await.unwrap().is_some();
        let in_archive = archive.get(&handle).await.unwrap().is_some();
        assert!(in_cache || in_archive, "round {round}: {handle} lost");
    }
}

// =========================================================================
// Startup sync
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_startup_sync_restores_every_record() {
    let (cache, archive) = stores();
    archive.upsert(&SessionRecord::new(h("h1"), "i1")).await.unwrap();
    archive.upsert(&SessionRecord::new(h("h2"), "i2")).await.unwrap();

    let report = startup_sync(cache.as_ref(), archive.as_ref(), &SessionConfig::default()).await;

    assert_eq!(report, RestoreReport { restored: 2, failed: 0 });
    assert_eq!(cache.get(&h("h1")).await.unwrap().as_deref(), Some("i1"));
    assert_eq!(cache.get(&h("h2")).await.unwrap().as_deref(), Some("i2"));
    assert_eq!(cache.ttl(&h("h1")).await, Some(secs(3600)));
    // The archive keeps its copies.
    assert_eq!(archive.len().await.unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_startup_sync_empty_archive_restores_nothing() {
    let (cache, archive) = stores();

    let report = startup_sync(cache.as_ref(), archive.as_ref(), &SessionConfig::default()).await;

    assert_eq!(report, RestoreReport::default());
    assert!(cache.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_startup_sync_archive_down_fails_soft() {
    let cache = MemoryCache::new();

    let report = startup_sync(&cache, &DownArchive, &SessionConfig::default()).await;

    assert_eq!(report, RestoreReport::default());
}

// =========================================================================
// SyncJobs
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_sync_jobs_restore_then_migrate() {
    let (cache, archive) = stores();
    archive.upsert(&SessionRecord::new(h("back"), "b")).await.unwrap();
    cache.set(&h("live"), "l", secs(10)).await.unwrap();

    let mut jobs = SyncJobs::start(
        Arc::clone(&cache),
        Arc::clone(&archive),
        SyncConfig::default(),
        &SessionConfig::default(),
    );

    let restored = jobs.wait_for_startup().await;
    assert_eq!(restored, Some(RestoreReport { restored: 1, failed: 0 }));
    assert!(cache.get(&h("back")).await.unwrap().is_some());

    // "live" crosses the 5s threshold at t = 5s; give the scanner a few ticks.
    tokio::time::sleep(secs(8)).await;

    assert!(cache.get(&h("live")).await.unwrap().is_none());
    assert_eq!(
        archive.get(&h("live")).await.unwrap(),
        Some(SessionRecord::new(h("live"), "l"))
    );
    // The restored session has an hour left and stays put.
    assert!(cache.get(&h("back")).await.unwrap().is_some());

    jobs.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_sync_jobs_restore_disabled() {
    let (cache, archive) = stores();
    archive.upsert(&SessionRecord::new(h("back"), "b")).await.unwrap();

    let mut jobs = SyncJobs::start(
        Arc::clone(&cache),
        Arc::clone(&archive),
        SyncConfig {
            restore_on_start: false,
            ..SyncConfig::default()
        },
        &SessionConfig::default(),
    );

    assert_eq!(jobs.wait_for_startup().await, None);
    assert!(cache.is_empty().await);
    jobs.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_sync_jobs_shutdown_stops_scanner() {
    let (cache, archive) = stores();
    let jobs = SyncJobs::start(
        Arc::clone(&cache),
        Arc::clone(&archive),
        SyncConfig::default(),
        &SessionConfig::default(),
    );
    let token = jobs.cancellation_token();
    assert!(jobs.is_running());

    jobs.shutdown().await;
    assert!(token.is_cancelled());

    // With no scanner left, a near-expiry session simply expires.
    cache.set(&h("late"), "x", secs(3)).await.unwrap();
    tokio::time::sleep(secs(10)).await;

    assert_eq!(archive.len().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sync_jobs_shutdown_returns_scanner_metrics() {
    let (cache, archive) = stores();
    let jobs = SyncJobs::start(
        Arc::clone(&cache),
        Arc::clone(&archive),
        SyncConfig::default(),
        &SessionConfig::default(),
    );

    // One-second ticks, first one within 100ms of jitter after t = 1s.
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    let metrics = jobs.shutdown().await.unwrap();

    assert_eq!(metrics.total_ticks, 3);
    assert_eq!(metrics.total_overruns, 0);
    assert!(metrics.budget_utilization < 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_scanner_run_returns_metrics_on_cancel() {
    let (cache, archive) = stores();
    cache.set(&h("soon"), "s", secs(3)).await.unwrap();
    let token = tokio_util::sync::CancellationToken::new();

    let task = tokio::spawn(scanner(&cache, &archive).run(token.clone()));
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    token.cancel();
    let metrics = task.await.unwrap();

    assert_eq!(metrics.total_ticks, 1);
    assert_eq!(archive.len().await.unwrap(), 1);
}
