//! Request handlers: login, score submission, health.
//!
//! The login flow is:
//!   1. Decode `{code, encryptedData, iv}` and reject a blank code
//!   2. Exchange the code with the identity provider
//!   3. Derive the player's handle from the returned identity
//!   4. Decrypt the optional profile payload (logged, then discarded)
//!   5. Store `handle → identity` in the session cache with the login TTL
//!   6. Answer with the handle as plain text

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use playgate_protocol::{Codec, LoginRequest, PlayerHandle, ScoreSubmission};
use playgate_ranking::{Leaderboard, RankingError};
use playgate_session::{
    IdentityProvider, SessionCache, SessionError, decrypt_payload, derive_handle,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ServerError;
use crate::server::ServerState;

/// `POST /login`
pub(crate) async fn login<P, C, L, K>(
    State(state): State<Arc<ServerState<P, C, L, K>>>,
    body: Bytes,
) -> Result<String, ServerError>
where
    P: IdentityProvider,
    C: SessionCache,
    L: Leaderboard,
    K: Codec,
{
    let req: LoginRequest = state.codec.decode(&body)?;
    req.validate()?;

    let identity = state.provider.exchange(&req.code).await?;
    let handle = derive_handle(&identity.external_identity);

    if req.has_payload() {
        open_payload(&handle, &req, &identity.session_key)?;
    }

    state
        .cache
        .set(&handle, &identity.external_identity, state.session.login_ttl)
        .await?;

    info!(%handle, ttl_secs = state.session.login_ttl.as_secs(), "player logged in");
    Ok(handle.into_inner())
}

/// Decrypts the client's profile payload.
///
/// Only malformed base64 fails the login. Which side sent it decides
/// the status: the client's fields are a bad request, the provider's
/// session key is an upstream fault. A payload that fails to decrypt
/// is logged and ignored.
fn open_payload(
    handle: &PlayerHandle,
    req: &LoginRequest,
    session_key: &str,
) -> Result<(), ServerError> {
    match decrypt_payload(&req.encrypted_data, session_key, &req.iv) {
        Ok(profile) => {
            debug!(%handle, %profile, "profile payload decrypted");
            Ok(())
        }
        Err(SessionError::Decode { field: "key", .. }) => Err(ServerError::Upstream(
            "provider session key is not valid base64".into(),
        )),
        Err(e) if e.is_payload_error() => {
            warn!(%handle, error = %e, "profile payload unreadable, continuing login");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// `POST /scores`
pub(crate) async fn submit_score<P, C, L, K>(
    State(state): State<Arc<ServerState<P, C, L, K>>>,
    body: Bytes,
) -> Result<Response, ServerError>
where
    P: IdentityProvider,
    C: SessionCache,
    L: Leaderboard,
    K: Codec,
{
    let submission: ScoreSubmission = state.codec.decode(&body)?;
    let points = submission.score.to_points().map_err(RankingError::from)?;

    state
        .leaderboard
        .submit(&submission.player_handle, points)
        .await?;
    let top = state.leaderboard.top(state.top_n).await?;

    debug!(handle = %submission.player_handle, points, rows = top.len(), "score submitted");

    let bytes = state.codec.encode(&top)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], bytes).into_response())
}

#[derive(Debug, Serialize)]
pub(crate) struct Health {
    status: &'static str,
    version: &'static str,
}

/// `GET /health`
pub(crate) async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
