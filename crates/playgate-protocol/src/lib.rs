//! Wire protocol for Playgate.
//!
//! This crate defines what travels over HTTP between game clients and
//! the backend, and between the backend and the identity provider:
//!
//! - **Types** ([`LoginRequest`], [`ScoreSubmission`], [`LeaderboardEntry`],
//!   [`IdentityResponse`], [`PlayerHandle`]): the JSON documents.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how request bodies are
//!   turned into those types and responses back into bytes.
//! - **Errors** ([`ProtocolError`]): malformed or invalid documents.
//!
//! ```text
//! HTTP body (bytes) → Protocol (LoginRequest) → Session (handle, cache)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    IdentityResponse, LeaderboardEntry, LoginRequest, MAX_SCORE, PlayerHandle, ScoreSubmission,
    ScoreValue,
};
