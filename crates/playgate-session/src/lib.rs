//! Player sessions for Playgate.
//!
//! This crate owns everything a login touches:
//!
//! 1. **Identity exchange**: turning a client code into an external
//!    identity ([`IdentityProvider`] trait, [`HttpIdentityProvider`])
//! 2. **Aliasing**: deriving the public [`PlayerHandle`] from that
//!    identity ([`derive_handle`])
//! 3. **Payload decryption**: recovering the client's encrypted profile
//!    ([`decrypt_payload`])
//! 4. **Storage**: the TTL'd [`SessionCache`] and the durable [`Archive`]
//!    the background jobs move sessions between
//!
//! # How it fits in the stack
//!
//! ```text
//! HTTP layer (above)         ← calls the provider, writes the cache
//! Sync layer (beside)        ← drains the cache into the archive and back
//!     ↕
//! Session layer (this crate) ← handles, crypto, stores
//!     ↕
//! Protocol layer (below)     ← PlayerHandle, IdentityResponse types
//! ```
//!
//! # Features
//!
//! - `redis`: [`RedisCache`]
//! - `sqlite`: [`SqliteArchive`]
//! - `http`: [`HttpIdentityProvider`]
//!
//! All are on by default. With none of them the in-memory stores still
//! work, which is what most tests use.
//!
//! [`PlayerHandle`]: playgate_protocol::PlayerHandle

mod alias;
mod archive;
mod cache;
mod crypto;
mod error;
mod provider;
#[cfg(feature = "redis")]
mod redis_cache;
mod session;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use alias::{decode_handle, derive_handle};
pub use archive::{Archive, MemoryArchive};
pub use cache::{MemoryCache, SessionCache};
pub use crypto::{BLOCK_SIZE, decrypt_payload};
pub use error::SessionError;
pub use provider::{IdentityProvider, ProviderSession};
#[cfg(feature = "http")]
pub use provider::{DEFAULT_ENDPOINT, HttpIdentityProvider, HttpProviderConfig};
#[cfg(feature = "redis")]
pub use redis_cache::{DEFAULT_KEY_PREFIX, RedisCache};
pub use session::{CacheEntry, SessionConfig, SessionRecord};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteArchive;
