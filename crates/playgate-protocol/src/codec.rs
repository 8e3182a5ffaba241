//! Codec trait and implementations for request and response bodies.
//!
//! The HTTP layer hands raw body bytes to a [`Codec`] and gets typed
//! documents back. Handlers never call `serde_json` directly, so the
//! body format can change without touching them.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// - `Send + Sync` → one codec instance is shared by every request
///   handler, which may run on any Tokio worker thread.
/// - `'static` → the codec lives inside long-lived server state.
///
/// `decode<T: DeserializeOwned>` produces a value that owns all of its
/// data, so the request body buffer can be dropped right after decoding.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use playgate_protocol::{Codec, JsonCodec, LoginRequest};
///
/// let codec = JsonCodec;
///
/// let req: LoginRequest = codec
///     .decode(br#"{"code": "081x", "encryptedData": "", "iv": ""}"#)
///     .unwrap();
/// assert_eq!(req.code, "081x");
///
/// let bytes = codec.encode(&req).unwrap();
/// let again: LoginRequest = codec.decode(&bytes).unwrap();
/// assert_eq!(req, again);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
