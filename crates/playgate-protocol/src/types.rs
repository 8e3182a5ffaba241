//! Wire types for the Playgate HTTP surface.
//!
//! Every type here is something a client sends or receives as JSON:
//! the login request, the score submission, the leaderboard rows. The
//! identity provider's reply lives here too, since it is just another
//! JSON document crossing a network boundary.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// PlayerHandle
// ---------------------------------------------------------------------------

/// The pseudonymous handle a player is known by.
///
/// A handle is derived from the player's external identity and doubles
/// as the key in both the session cache and the archive. It is a plain
/// string on the wire (`#[serde(transparent)]`), so `PlayerHandle("abc")`
/// serializes as `"abc"`.
///
/// Wrapping the string in a newtype keeps handles and raw external
/// identities from being mixed up in function signatures: both are
/// strings, but only one of them is safe to hand back to a client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerHandle(pub String);

impl PlayerHandle {
    /// Wraps an already-derived handle.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Borrows the handle as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwraps the handle into its owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerHandle {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// Client → Server body of `POST /login`.
///
/// The field names follow the client SDK (`encryptedData`, camelCase).
/// `encrypted_data` and `iv` may be omitted; the login then skips the
/// profile decryption step entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// One-shot authorization code issued to the client by the
    /// identity provider.
    pub code: String,

    /// Base64 ciphertext of the client's profile blob.
    #[serde(rename = "encryptedData", default)]
    pub encrypted_data: String,

    /// Base64 initialization vector for `encrypted_data`.
    #[serde(default)]
    pub iv: String,
}

impl LoginRequest {
    /// Rejects requests that cannot possibly start a login.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] if `code` is blank.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.code.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage("code is required".into()));
        }
        Ok(())
    }

    /// `true` when the client attached an encrypted profile payload.
    pub fn has_payload(&self) -> bool {
        !self.encrypted_data.is_empty() || !self.iv.is_empty()
    }
}

/// The identity provider's reply to a code exchange.
///
/// Shaped after the `jscode2session` document: `openid` is the stable
/// external identity, `session_key` the per-session AES key in base64.
/// On failure the provider sends a non-zero `errcode` and leaves the
/// other fields empty, which is why everything is `#[serde(default)]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityResponse {
    #[serde(rename = "openid", default)]
    pub external_identity: String,

    #[serde(default)]
    pub session_key: String,

    #[serde(rename = "unionid", default, skip_serializing_if = "Option::is_none")]
    pub union_identity: Option<String>,

    #[serde(rename = "errcode", default)]
    pub error_code: i64,

    #[serde(rename = "errmsg", default)]
    pub error_message: String,
}

impl IdentityResponse {
    /// `true` if the provider reported success.
    pub fn is_ok(&self) -> bool {
        self.error_code == 0
    }
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

/// Largest accepted score: the largest integer an `f64` (and so a
/// JSON number or a Redis sorted-set score) represents exactly.
pub const MAX_SCORE: i64 = (1 << 53) - 1;

/// A score as the client sends it.
///
/// Older clients send the score as a string (`"120"`), newer ones as a
/// number. `#[serde(untagged)]` tries each variant in order until one
/// matches the JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    Number(f64),
    Text(String),
}

impl ScoreValue {
    /// Parses the submitted value as a whole, non-negative score.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] for non-numeric text,
    /// fractional values or negative numbers.
    pub fn to_points(&self) -> Result<i64, ProtocolError> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                ProtocolError::InvalidMessage(format!("score {s:?} is not a number"))
            })?,
        };
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
            return Err(ProtocolError::InvalidMessage(format!(
                "score {value} must be a whole, non-negative number"
            )));
        }
        if value > MAX_SCORE as f64 {
            return Err(ProtocolError::InvalidMessage(format!(
                "score {value} is out of range"
            )));
        }
        Ok(value as i64)
    }
}

/// Client → Server body of `POST /scores`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub score: ScoreValue,

    /// `playid` is accepted for clients built against the first
    /// version of the endpoint.
    #[serde(rename = "playerHandle", alias = "playid")]
    pub player_handle: PlayerHandle,
}

/// One row of the leaderboard returned by `POST /scores`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub member: PlayerHandle,
    pub score: i64,
}

// =========================================================================
// Tests
// =========================================================================
