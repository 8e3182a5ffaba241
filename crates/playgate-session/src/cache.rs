//! The session cache: active sessions with a TTL.
//!
//! [`SessionCache`] is the capability set the rest of Playgate needs
//! from a TTL-capable key/value store. [`MemoryCache`] keeps everything
//! in-process; `RedisCache` (feature `redis`) talks to a real server.
//!
//! # Concurrency
//!
//! The cache is shared by request handlers, the expiry scanner and the
//! startup sync without any outer transaction. Every operation is
//! individually atomic and idempotent: `set` overwrites, `delete` of a
//! missing key is a no-op, and `delete_if_expiring` re-checks the TTL
//! under the store's own atomicity before removing anything.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use playgate_protocol::PlayerHandle;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{CacheEntry, SessionError};

/// A TTL-bearing store of `handle → external identity`.
///
/// Methods return `impl Future + Send` so that generic callers can run
/// them inside `tokio::spawn`ed tasks. Implementors just write
/// `async fn`.
pub trait SessionCache: Send + Sync + 'static {
    /// Stores `identity` under `handle`, replacing any previous value
    /// and resetting its TTL.
    fn set(
        &self,
        handle: &PlayerHandle,
        identity: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Returns the identity for `handle`, or `None` if absent or expired.
    fn get(
        &self,
        handle: &PlayerHandle,
    ) -> impl Future<Output = Result<Option<String>, SessionError>> + Send;

    /// Snapshots every live entry with its remaining TTL.
    ///
    /// Each TTL is read as its entry is enumerated. No ordering is
    /// guaranteed, and the scan may be repeated at any time.
    fn scan_all(&self) -> impl Future<Output = Result<Vec<CacheEntry>, SessionError>> + Send;

    /// Removes `handle`. Returns `true` if something was removed.
    fn delete(
        &self,
        handle: &PlayerHandle,
    ) -> impl Future<Output = Result<bool, SessionError>> + Send;

    /// Removes `handle` only if its remaining TTL is still at or below
    /// `threshold`. A key that was re-`set` in the meantime survives.
    /// Returns `true` if something was removed.
    fn delete_if_expiring(
        &self,
        handle: &PlayerHandle,
        threshold: Duration,
    ) -> impl Future<Output = Result<bool, SessionError>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryCache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Slot {
    identity: String,
    deadline: Instant,
}

/// In-process [`SessionCache`].
///
/// Deadlines use `tokio::time::Instant`, so tests running with paused
/// time can fast-forward expiry with `tokio::time::advance`. Expired
/// entries disappear lazily, on the next access that observes them,
/// just as a real TTL store would drop them on its own.
#[derive(Debug, Default)]
pub struct MemoryCache {
    slots: Mutex<HashMap<PlayerHandle, Slot>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.slots
            .lock()
            .await
            .values()
            .filter(|slot| slot.deadline > now)
            .count()
    }

    /// Returns `true` if no live entries remain.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remaining TTL of `handle`, or `None` if absent or expired.
    pub async fn ttl(&self, handle: &PlayerHandle) -> Option<Duration> {
        let now = Instant::now();
        self.slots
            .lock()
            .await
            .get(handle)
            .filter(|slot| slot.deadline > now)
            .map(|slot| slot.deadline - now)
    }
}

impl SessionCache for MemoryCache {
    async fn set(
        &self,
        handle: &PlayerHandle,
        identity: &str,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        let slot = Slot {
            identity: identity.to_string(),
            deadline: Instant::now() + ttl,
        };
        self.slots.lock().await.insert(handle.clone(), slot);
        Ok(())
    }

    async fn get(&self, handle: &PlayerHandle) -> Result<Option<String>, SessionError> {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;
        match slots.get(handle) {
            Some(slot) if slot.deadline > now => Ok(Some(slot.identity.clone())),
            Some(_) => {
                slots.remove(handle);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn scan_all(&self) -> Result<Vec<CacheEntry>, SessionError> {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;
        slots.retain(|_, slot| slot.deadline > now);
        Ok(slots
            .iter()
            .map(|(handle, slot)| CacheEntry {
                handle: handle.clone(),
                external_identity: slot.identity.clone(),
                remaining_ttl: Some(slot.deadline - now),
            })
            .collect())
    }

    async fn delete(&self, handle: &PlayerHandle) -> Result<bool, SessionError> {
        let now = Instant::now();
        let removed = self.slots.lock().await.remove(handle);
        Ok(removed.is_some_and(|slot| slot.deadline > now))
    }

    async fn delete_if_expiring(
        &self,
        handle: &PlayerHandle,
        threshold: Duration,
    ) -> Result<bool, SessionError> {
        let now = Instant::now();
        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.get(handle) else {
            return Ok(false);
        };
        if slot.deadline <= now {
            slots.remove(handle);
            return Ok(false);
        }
        if slot.deadline - now > threshold {
            return Ok(false);
        }
        slots.remove(handle);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(s: &str) -> PlayerHandle {
        PlayerHandle::from(s)
    }

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_set_then_get_returns_identity() {
        let cache = MemoryCache::new();

        cache.set(&h("bcd"), "abc", MINUTE).await.unwrap();

        assert_eq!(cache.get(&h("bcd")).await.unwrap().as_deref(), Some("abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_unknown_handle_returns_none() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get(&h("nobody")).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_after_ttl_elapses_returns_none() {
        let cache = MemoryCache::new();
        cache.set(&h("bcd"), "abc", Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(cache.get(&h("bcd")).await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_again_resets_ttl() {
        let cache = MemoryCache::new();
        cache.set(&h("bcd"), "abc", Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;

        cache.set(&h("bcd"), "abc", Duration::from_secs(10)).await.unwrap();

        assert_eq!(cache.ttl(&h("bcd")).await, Some(Duration::from_secs(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_all_reports_live_remaining_ttl() {
        let cache = MemoryCache::new();
        cache.set(&h("a"), "1", Duration::from_secs(30)).await.unwrap();
        cache.set(&h("b"), "2", Duration::from_secs(3)).await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;

        let mut entries = cache.scan_all().await.unwrap();
        entries.sort_by(|x, y| x.handle.cmp(&y.handle));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].remaining_ttl, Some(Duration::from_secs(29)));
        assert_eq!(entries[1].remaining_ttl, Some(Duration::from_secs(2)));
        assert_eq!(entries[1].external_identity, "2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_all_skips_expired_entries() {
        let cache = MemoryCache::new();
        cache.set(&h("a"), "1", Duration::from_secs(2)).await.unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;

        assert!(cache.scan_all().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_is_idempotent() {
        let cache = MemoryCache::new();
        cache.set(&h("a"), "1", MINUTE).await.unwrap();

        assert!(cache.delete(&h("a")).await.unwrap());
        assert!(!cache.delete(&h("a")).await.unwrap());
        assert_eq!(cache.get(&h("a")).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_if_expiring_removes_near_expiry_entry() {
        let cache = MemoryCache::new();
        cache.set(&h("a"), "1", Duration::from_secs(3)).await.unwrap();

        let removed = cache
            .delete_if_expiring(&h("a"), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(removed);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_if_expiring_keeps_refreshed_entry() {
        let cache = MemoryCache::new();
        cache.set(&h("a"), "1", Duration::from_secs(3)).await.unwrap();
        // A re-login lands before the delete.
        cache.set(&h("a"), "1", MINUTE).await.unwrap();

        let removed = cache
            .delete_if_expiring(&h("a"), Duration::from_secs(5))
            .await
            .unwrap();

        assert!(!removed);
        assert_eq!(cache.get(&h("a")).await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_if_expiring_missing_key_is_noop() {
        let cache = MemoryCache::new();
        let removed = cache
            .delete_if_expiring(&h("ghost"), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!removed);
    }
}
