//! Error types for the Playgate server.
//!
//! [`PlaygateError`] is what building and running a server can fail
//! with. [`ServerError`] is what a single request can fail with, and
//! knows how to render itself as an HTTP response.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use playgate_protocol::ProtocolError;
use playgate_ranking::RankingError;
use playgate_session::SessionError;
use serde::Serialize;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `playgate` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PlaygateError {
    /// A protocol-level error (encode, decode, invalid document).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (provider, crypto, stores).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A leaderboard error.
    #[error(transparent)]
    Ranking(#[from] RankingError),

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an I/O error.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// ServerError
// ---------------------------------------------------------------------------

/// A failed request.
///
/// | Variant | Status |
/// |---|---|
/// | `BadRequest` | 400 |
/// | `InvalidScore` | 400 |
/// | `Upstream` | 502 |
/// | `Unavailable` | 503 |
/// | `Internal` | 500 |
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The request body is malformed or incomplete.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The submitted score is not acceptable.
    #[error("invalid score: {0}")]
    InvalidScore(String),

    /// The identity provider failed or refused the exchange.
    #[error("identity provider error: {0}")]
    Upstream(String),

    /// A backing store is down.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ProtocolError> for ServerError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::InvalidMessage(msg) => ServerError::BadRequest(msg),
            ProtocolError::Decode(e) => ServerError::BadRequest(e.to_string()),
            ProtocolError::Encode(e) => ServerError::Internal(e.to_string()),
        }
    }
}

impl From<SessionError> for ServerError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Upstream(msg) => ServerError::Upstream(msg),
            SessionError::Store(msg) => ServerError::Unavailable(msg),
            e @ (SessionError::Decode { .. }
            | SessionError::Cipher(_)
            | SessionError::Padding(_)) => ServerError::BadRequest(e.to_string()),
        }
    }
}

impl From<RankingError> for ServerError {
    fn from(e: RankingError) -> Self {
        match e {
            RankingError::Store(msg) => ServerError::Unavailable(msg),
            RankingError::InvalidScore(msg) => ServerError::InvalidScore(msg),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) | ServerError::InvalidScore(_) => StatusCode::BAD_REQUEST,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServerError::BadRequest(_) => "bad_request",
            ServerError::InvalidScore(_) => "invalid_score",
            ServerError::Upstream(_) => "upstream_error",
            ServerError::Unavailable(_) => "service_unavailable",
            ServerError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "server error");
        } else {
            tracing::warn!(status = %status, code, error = %message, "client error");
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
