//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes themselves were wrong:
//! bad JSON, a missing field, a value the endpoint can't accept. It
//! never means a store or the identity provider misbehaved.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields such as
    /// `code`, or a wrong data type.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The document parsed but violates an endpoint rule, e.g. an empty
    /// authorization code or a fractional score.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
