use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use playgate::prelude::*;
use playgate_ranking::RedisLeaderboard;
use playgate_session::{DEFAULT_ENDPOINT, RedisCache, SqliteArchive};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Login, session and leaderboard backend backed by Redis and SQLite.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "PLAYGATE_BIND", default_value = "0.0.0.0:8080")]
    bind: String,

    /// Redis holding the session cache and the leaderboard.
    #[arg(long, env = "PLAYGATE_REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// SQLite file for archived sessions.
    #[arg(long, env = "PLAYGATE_ARCHIVE_PATH", default_value = "playgate.db")]
    archive_path: PathBuf,

    #[arg(long, env = "PLAYGATE_APP_ID")]
    app_id: String,

    #[arg(long, env = "PLAYGATE_APP_SECRET", hide_env_values = true)]
    app_secret: String,

    /// Code exchange endpoint of the identity provider.
    #[arg(long, env = "PLAYGATE_PROVIDER_URL", default_value = DEFAULT_ENDPOINT)]
    provider_url: String,

    /// Session TTL after a login, in seconds.
    #[arg(long, env = "PLAYGATE_LOGIN_TTL", default_value_t = 900)]
    login_ttl: u64,

    /// Session TTL after a restore from the archive, in seconds.
    #[arg(long, env = "PLAYGATE_RESTORE_TTL", default_value_t = 3600)]
    restore_ttl: u64,

    /// Seconds between expiry scans.
    #[arg(long, env = "PLAYGATE_SCAN_INTERVAL", default_value_t = 1)]
    scan_interval: u64,

    /// Archive sessions with at most this many seconds left.
    #[arg(long, env = "PLAYGATE_EXPIRY_THRESHOLD", default_value_t = 5)]
    expiry_threshold: u64,

    /// Leaderboard rows returned per submission.
    #[arg(long, env = "PLAYGATE_TOP_N", default_value_t = 10)]
    top_n: usize,

    /// Emit logs as JSON lines.
    #[arg(long, env = "PLAYGATE_LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            login_ttl: Duration::from_secs(self.login_ttl),
            restore_ttl: Duration::from_secs(self.restore_ttl),
        }
    }

    fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            scan_interval: Duration::from_secs(self.scan_interval),
            expiry_threshold: Duration::from_secs(self.expiry_threshold),
            ..SyncConfig::default()
        }
    }

    fn leaderboard_config(&self) -> LeaderboardConfig {
        LeaderboardConfig {
            top_n: self.top_n,
            ..LeaderboardConfig::default()
        }
    }

    fn provider_config(&self) -> HttpProviderConfig {
        HttpProviderConfig {
            endpoint: self.provider_url.clone(),
            app_id: self.app_id.clone(),
            app_secret: self.app_secret.clone(),
            ..HttpProviderConfig::default()
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,playgate=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let leaderboard_config = args.leaderboard_config();
    let cache = RedisCache::connect(&args.redis_url).await?;
    let leaderboard = RedisLeaderboard::connect(&args.redis_url, &leaderboard_config).await?;
    let archive = SqliteArchive::open(&args.archive_path)?;
    let provider = HttpIdentityProvider::new(args.provider_config())?;

    info!(
        bind = %args.bind,
        archive = %args.archive_path.display(),
        "starting login server"
    );

    let server = PlaygateServer::builder()
        .bind(&args.bind)
        .session_config(args.session_config())
        .sync_config(args.sync_config())
        .leaderboard_config(leaderboard_config)
        .build(provider, Arc::new(cache), Arc::new(archive), leaderboard)
        .await?;

    server.run().await?;
    Ok(())
}
