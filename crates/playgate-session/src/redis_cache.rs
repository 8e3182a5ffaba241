//! Redis-backed [`SessionCache`].
//!
//! Every session is a plain string key `{prefix}{handle}` holding the
//! external identity, with a millisecond TTL. Scans walk the keyspace
//! with `SCAN MATCH {prefix}*` so other data in the same database (the
//! leaderboard's sorted set, for one) is never mistaken for a session.

use std::time::Duration;

use playgate_protocol::PlayerHandle;
use redis::aio::MultiplexedConnection;
use tracing::{trace, warn};

use crate::{CacheEntry, SessionCache, SessionError};

/// Default key prefix for session entries.
pub const DEFAULT_KEY_PREFIX: &str = "session:";

/// Keys fetched per `SCAN` round-trip.
const SCAN_BATCH: usize = 256;

/// Deletes `KEYS[1]` only while its PTTL is in `0..=ARGV[1]`.
const DELETE_IF_EXPIRING: &str = r"
local ttl = redis.call('PTTL', KEYS[1])
if ttl >= 0 and ttl <= tonumber(ARGV[1]) then
    return redis.call('DEL', KEYS[1])
end
return 0
";

/// A [`SessionCache`] on top of a single multiplexed Redis connection.
///
/// The connection is cloned per call; clones share one socket.
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
    prefix: String,
    delete_script: redis::Script,
}

impl RedisCache {
    /// Connects to the Redis server at `url` (e.g. `redis://127.0.0.1/`).
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        let client = redis::Client::open(url)?;
        Self::from_client(&client).await
    }

    /// Opens a multiplexed connection from an existing client.
    pub async fn from_client(client: &redis::Client) -> Result<Self, SessionError> {
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            delete_script: redis::Script::new(DELETE_IF_EXPIRING),
        })
    }

    /// Replaces the key prefix. An empty prefix scans the whole database.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn key(&self, handle: &PlayerHandle) -> String {
        session_key(&self.prefix, handle)
    }
}

fn session_key(prefix: &str, handle: &PlayerHandle) -> String {
    format!("{prefix}{handle}")
}

fn handle_from_key(prefix: &str, key: &str) -> Option<PlayerHandle> {
    key.strip_prefix(prefix).map(PlayerHandle::from)
}

/// Interprets a `PTTL` reply. `-2` (key gone) yields `None`; `-1` (no
/// expiry) yields `Some(None)`.
fn parse_pttl(pttl: i64) -> Option<Option<Duration>> {
    match pttl {
        -2 => None,
        ms if ms < 0 => Some(None),
        ms => Some(Some(Duration::from_millis(ms.unsigned_abs()))),
    }
}

/// Turns one key's `GET`/`PTTL` reply into an entry. A key that
/// vanished mid-scan, or that cannot be read (e.g. `WRONGTYPE` for a
/// non-string under the prefix), is skipped so the rest of the scan
/// still counts.
fn scanned_entry(
    handle: PlayerHandle,
    reply: Result<(Option<String>, i64), redis::RedisError>,
) -> Option<CacheEntry> {
    let (value, pttl) = match reply {
        Ok(pair) => pair,
        Err(e) => {
            warn!(%handle, error = %e, "unreadable key during scan, skipping");
            return None;
        }
    };
    let (Some(external_identity), Some(remaining_ttl)) = (value, parse_pttl(pttl)) else {
        trace!(%handle, "key vanished during scan");
        return None;
    };
    Some(CacheEntry {
        handle,
        external_identity,
        remaining_ttl,
    })
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl SessionCache for RedisCache {
    async fn set(
        &self,
        handle: &PlayerHandle,
        identity: &str,
        ttl: Duration,
    ) -> Result<(), SessionError> {
        let mut conn = self.conn.clone();
        // PX of zero is rejected by the server.
        let ms = duration_ms(ttl).max(1);
        let _: () = redis::cmd("SET")
            .arg(self.key(handle))
            .arg(identity)
            .arg("PX")
            .arg(ms)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, handle: &PlayerHandle) -> Result<Option<String>, SessionError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(self.key(handle))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn scan_all(&self) -> Result<Vec<CacheEntry>, SessionError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", self.prefix);
        let mut entries = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            for key in keys {
                let Some(handle) = handle_from_key(&self.prefix, &key) else {
                    continue;
                };
                // GET and PTTL in one round-trip so the pair is consistent.
                let reply = redis::pipe()
                    .atomic()
                    .cmd("GET")
                    .arg(&key)
                    .cmd("PTTL")
                    .arg(&key)
                    .query_async(&mut conn)
                    .await;
                if let Some(entry) = scanned_entry(handle, reply) {
                    entries.push(entry);
                }
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(entries)
    }

    async fn delete(&self, handle: &PlayerHandle) -> Result<bool, SessionError> {
        let mut conn = self.conn.clone();
        let removed: i64 = redis::cmd("DEL")
            .arg(self.key(handle))
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    async fn delete_if_expiring(
        &self,
        handle: &PlayerHandle,
        threshold: Duration,
    ) -> Result<bool, SessionError> {
        let mut conn = self.conn.clone();
        let removed: i64 = self
            .delete_script
            .key(self.key(handle))
            .arg(duration_ms(threshold))
            .invoke_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }
}
