//! # Playgate
//!
//! Login and session backend for web and mini-program games.
//!
//! A client trades a one-time platform code for a pseudonymous player
//! handle. Playgate keeps that session in a TTL cache while the player
//! is active, quietly moves it to a durable archive before it expires,
//! and restores the archive into the cache on the next boot. A small
//! leaderboard endpoint rides along.
//!
//! ## Endpoints
//!
//! | Route | Body | Answer |
//! |---|---|---|
//! | `POST /login` | `{code, encryptedData?, iv?}` | the handle, as text |
//! | `POST /scores` | `{score, playerHandle}` | top-N `[{member, score}]` |
//! | `GET /health` | | `{status, version}` |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use playgate::prelude::*;
//!
//! # async fn run() -> Result<(), PlaygateError> {
//! let provider = HttpIdentityProvider::new(HttpProviderConfig {
//!     app_id: "wx-app".into(),
//!     app_secret: "secret".into(),
//!     ..HttpProviderConfig::default()
//! })?;
//!
//! let server = PlaygateServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(
//!         provider,
//!         Arc::new(MemoryCache::new()),
//!         Arc::new(MemoryArchive::new()),
//!         MemoryLeaderboard::new(),
//!     )
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::{ErrorResponse, PlaygateError, ServerError};
pub use server::{PlaygateServer, PlaygateServerBuilder};

/// Everything needed to assemble a server in one import.
pub mod prelude {
    pub use crate::{PlaygateError, PlaygateServer, PlaygateServerBuilder, ServerError};

    pub use playgate_protocol::{
        Codec, JsonCodec, LeaderboardEntry, LoginRequest, PlayerHandle, ProtocolError,
        ScoreSubmission, ScoreValue,
    };
    pub use playgate_ranking::{Leaderboard, LeaderboardConfig, MemoryLeaderboard, RankingError};
    pub use playgate_session::{
        Archive, CacheEntry, HttpIdentityProvider, HttpProviderConfig, IdentityProvider,
        MemoryArchive, MemoryCache, ProviderSession, SessionCache, SessionConfig, SessionError,
        SessionRecord, derive_handle,
    };
    pub use playgate_sync::{RestoreReport, ScanReport, SyncConfig, SyncJobs};
    pub use playgate_tick::TickPolicy;
}
