//! Session types: the data a player's login leaves behind.
//!
//! A "session" here is just the mapping `handle → external identity`.
//! While the player is active it lives in the [`SessionCache`] with a
//! TTL; once migrated it lives in the [`Archive`] with no TTL at all.
//!
//! [`SessionCache`]: crate::SessionCache
//! [`Archive`]: crate::Archive

use std::time::Duration;

use playgate_protocol::PlayerHandle;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// TTLs handed to the session cache.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// TTL of a session created by a successful login.
    /// A repeat login resets it. Default: 15 minutes.
    pub login_ttl: Duration,

    /// TTL of a session revived from the archive at process start.
    /// Default: 1 hour.
    pub restore_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_ttl: Duration::from_secs(15 * 60),
            restore_ttl: Duration::from_secs(60 * 60),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionRecord
// ---------------------------------------------------------------------------

/// One archived session: a handle and the identity it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub handle: PlayerHandle,
    pub external_identity: String,
}

impl SessionRecord {
    pub fn new(handle: PlayerHandle, external_identity: impl Into<String>) -> Self {
        Self {
            handle,
            external_identity: external_identity.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// CacheEntry
// ---------------------------------------------------------------------------

/// A snapshot of one live cache entry, taken during a scan.
///
/// `remaining_ttl` is measured when the entry is enumerated, not when
/// the scan started, since entries keep ticking down while the scan runs.
/// `None` means the key has no expiry set (only possible when something
/// other than Playgate wrote it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub handle: PlayerHandle,
    pub external_identity: String,
    pub remaining_ttl: Option<Duration>,
}

impl CacheEntry {
    /// `true` if the entry will expire within `threshold`.
    pub fn expires_within(&self, threshold: Duration) -> bool {
        matches!(self.remaining_ttl, Some(ttl) if ttl <= threshold)
    }
}
