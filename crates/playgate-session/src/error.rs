//! Error types for the session layer.

/// Errors that can occur while logging a player in or touching the
/// session stores.
///
/// The variants follow the way callers react to them: decode and
/// upstream failures abort a login, cipher and padding failures only
/// lose the optional profile payload, and store failures are fatal to
/// a request but merely skipped by background jobs.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A base64 input could not be decoded. `field` names which one
    /// (`"ciphertext"`, `"key"` or `"iv"`).
    #[error("base64 decode failed for {field}: {source}")]
    Decode {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    /// The block cipher rejected its inputs: wrong key or IV length, or
    /// a ciphertext that is not a whole number of blocks.
    #[error("cipher error: {0}")]
    Cipher(String),

    /// PKCS#7 padding removal failed after decryption. The payload is
    /// corrupt or was encrypted with a different key.
    #[error("invalid padding: {0}")]
    Padding(String),

    /// The identity provider was unreachable or rejected the exchange.
    #[error("identity provider error: {0}")]
    Upstream(String),

    /// The session cache or the archive is unavailable.
    #[error("store error: {0}")]
    Store(String),
}

impl SessionError {
    /// `true` for failures of the optional profile payload, which a
    /// login is allowed to survive.
    pub fn is_payload_error(&self) -> bool {
        matches!(self, Self::Cipher(_) | Self::Padding(_))
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for SessionError {
    fn from(e: redis::RedisError) -> Self {
        SessionError::Store(format!("redis: {e}"))
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for SessionError {
    fn from(e: rusqlite::Error) -> Self {
        SessionError::Store(format!("sqlite: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_payload_error_only_for_cipher_and_padding() {
        assert!(SessionError::Cipher("x".into()).is_payload_error());
        assert!(SessionError::Padding("x".into()).is_payload_error());
        assert!(!SessionError::Upstream("x".into()).is_payload_error());
        assert!(!SessionError::Store("x".into()).is_payload_error());
    }

    #[test]
    fn test_store_error_message() {
        let err = SessionError::Store("connection refused".into());
        assert_eq!(err.to_string(), "store error: connection refused");
    }
}
