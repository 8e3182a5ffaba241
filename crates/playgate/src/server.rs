//! `PlaygateServer` builder and server loop.
//!
//! This is the entry point for running a Playgate backend. It ties
//! together all the layers: HTTP → protocol → session → stores, and
//! starts the background sync jobs exactly once.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use playgate_protocol::{Codec, JsonCodec};
use playgate_ranking::{Leaderboard, LeaderboardConfig};
use playgate_session::{Archive, IdentityProvider, SessionCache, SessionConfig};
use playgate_sync::{SyncConfig, SyncJobs};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::PlaygateError;
use crate::handler;

/// Shared server state passed to each request handler.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// cache is its own `Arc` because the sync jobs hold it too.
pub(crate) struct ServerState<P, C, L, K> {
    pub(crate) provider: P,
    pub(crate) cache: Arc<C>,
    pub(crate) leaderboard: L,
    pub(crate) codec: K,
    pub(crate) session: SessionConfig,
    pub(crate) top_n: usize,
}

/// Builder for configuring and starting a Playgate server.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use playgate::prelude::*;
///
/// let server = PlaygateServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(provider, Arc::new(cache), Arc::new(archive), leaderboard)
///     .await?;
/// server.run().await
/// ```
pub struct PlaygateServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    sync_config: SyncConfig,
    leaderboard_config: LeaderboardConfig,
}

impl PlaygateServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_config: SessionConfig::default(),
            sync_config: SyncConfig::default(),
            leaderboard_config: LeaderboardConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session TTLs.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the expiry scanner and startup sync configuration.
    pub fn sync_config(mut self, config: SyncConfig) -> Self {
        self.sync_config = config;
        self
    }

    /// Sets how many leaderboard rows `POST /scores` returns.
    pub fn leaderboard_config(mut self, config: LeaderboardConfig) -> Self {
        self.leaderboard_config = config;
        self
    }

    /// Builds the HTTP router on its own: no listener, no background
    /// jobs. Useful for driving the handlers directly in tests.
    pub fn router<P, C, L>(&self, provider: P, cache: Arc<C>, leaderboard: L) -> Router
    where
        P: IdentityProvider,
        C: SessionCache,
        L: Leaderboard,
    {
        let state = Arc::new(ServerState {
            provider,
            cache,
            leaderboard,
            codec: JsonCodec,
            session: self.session_config.clone(),
            top_n: self.leaderboard_config.top_n,
        });
        routes(state)
    }

    /// Binds the listener and starts the background sync jobs.
    ///
    /// Uses `JsonCodec` for request and response bodies.
    pub async fn build<P, C, A, L>(
        self,
        provider: P,
        cache: Arc<C>,
        archive: Arc<A>,
        leaderboard: L,
    ) -> Result<PlaygateServer, PlaygateError>
    where
        P: IdentityProvider,
        C: SessionCache,
        A: Archive,
        L: Leaderboard,
    {
        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|source| PlaygateError::Bind {
                addr: self.bind_addr.clone(),
                source,
            })?;

        let router = self.router(provider, Arc::clone(&cache), leaderboard);
        let jobs = SyncJobs::start(cache, archive, self.sync_config, &self.session_config);

        Ok(PlaygateServer {
            listener,
            router,
            jobs,
        })
    }
}

impl Default for PlaygateServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn routes<P, C, L, K>(state: Arc<ServerState<P, C, L, K>>) -> Router
where
    P: IdentityProvider,
    C: SessionCache,
    L: Leaderboard,
    K: Codec,
{
    Router::new()
        .route("/login", post(handler::login::<P, C, L, K>))
        .route("/scores", post(handler::submit_score::<P, C, L, K>))
        .route("/health", get(handler::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A bound Playgate server with its background jobs running.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to
/// start serving requests.
pub struct PlaygateServer {
    listener: TcpListener,
    router: Router,
    jobs: SyncJobs,
}

impl PlaygateServer {
    /// Creates a new builder.
    pub fn builder() -> PlaygateServerBuilder {
        PlaygateServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until Ctrl-C.
    pub async fn run(self) -> Result<(), PlaygateError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
            }
        })
        .await
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests
    /// and stops the background jobs.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), PlaygateError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.listener.local_addr()?;
        info!(%addr, "Playgate server running");

        let served = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await;

        self.jobs.shutdown().await;
        info!("Playgate server stopped");
        served.map_err(PlaygateError::from)
    }
}
