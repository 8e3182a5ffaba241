//! Redis-backed [`Leaderboard`].
//!
//! Two sorted sets per board:
//!
//! - `{key}`: member → exact integer score
//! - `{key}:arrival`: member → submission time (unix milliseconds)
//!
//! Redis breaks score ties lexicographically, so the read path pulls
//! every member tied at the cut-off, looks up their arrival times and
//! re-sorts before truncating.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use playgate_protocol::{LeaderboardEntry, PlayerHandle};
use redis::aio::MultiplexedConnection;
use tracing::{debug, trace, warn};

use crate::{Leaderboard, LeaderboardConfig, RankingError, check_points};

/// A [`Leaderboard`] stored in Redis sorted sets.
#[derive(Clone)]
pub struct RedisLeaderboard {
    conn: MultiplexedConnection,
    key: String,
    arrival_key: String,
}

impl RedisLeaderboard {
    /// Connects to the Redis server at `url`.
    pub async fn connect(url: &str, config: &LeaderboardConfig) -> Result<Self, RankingError> {
        let client = redis::Client::open(url)?;
        Self::from_client(&client, config).await
    }

    pub async fn from_client(
        client: &redis::Client,
        config: &LeaderboardConfig,
    ) -> Result<Self, RankingError> {
        let conn = client.get_multiplexed_async_connection().await?;
        debug!(key = %config.key, "leaderboard connected");
        Ok(Self {
            conn,
            key: config.key.clone(),
            arrival_key: format!("{}:arrival", config.key),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Orders candidates by score descending, then arrival ascending, and
/// keeps the first `n`. Members with no arrival time sort last among
/// their tie.
fn rank(
    candidates: Vec<(String, f64)>,
    arrivals: &HashMap<String, f64>,
    n: usize,
) -> Vec<LeaderboardEntry> {
    let mut rows: Vec<(String, i64, f64)> = candidates
        .into_iter()
        .map(|(member, score)| {
            let arrival = arrivals.get(&member).copied().unwrap_or(f64::INFINITY);
            (member, score as i64, arrival)
        })
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.total_cmp(&b.2)));
    rows.into_iter()
        .take(n)
        .map(|(member, score, _)| LeaderboardEntry {
            member: PlayerHandle::new(member),
            score,
        })
        .collect()
}

impl Leaderboard for RedisLeaderboard {
    async fn submit(&self, member: &PlayerHandle, points: i64) -> Result<(), RankingError> {
        check_points(points)?;
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .cmd("ZADD")
            .arg(&self.key)
            .arg(points)
            .arg(member.as_str())
            .ignore()
            .cmd("ZADD")
            .arg(&self.arrival_key)
            .arg(unix_millis())
            .arg(member.as_str())
            .ignore()
            .query_async(&mut conn)
            .await
            .inspect_err(|e| warn!(%member, error = %e, "score write failed"))?;
        trace!(%member, points, "score recorded");
        Ok(())
    }

    async fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, RankingError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();

        let mut candidates: Vec<(String, f64)> = redis::cmd("ZREVRANGE")
            .arg(&self.key)
            .arg(0)
            .arg(n - 1)
            .arg("WITHSCORES")
            .query_async(&mut conn)
            .await?;

        // A full page may cut a tie in half; fetch everyone at the cut-off.
        if candidates.len() == n {
            if let Some(&(_, cutoff)) = candidates.last() {
                candidates = redis::cmd("ZREVRANGEBYSCORE")
                    .arg(&self.key)
                    .arg("+inf")
                    .arg(cutoff)
                    .arg("WITHSCORES")
                    .query_async(&mut conn)
                    .await?;
                trace!(cutoff, rows = candidates.len(), "top window widened to tie group");
            }
        }
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let members: Vec<&str> = candidates.iter().map(|(m, _)| m.as_str()).collect();
        let times: Vec<Option<f64>> = redis::cmd("ZMSCORE")
            .arg(&self.arrival_key)
            .arg(&members)
            .query_async(&mut conn)
            .await?;
        let arrivals: HashMap<String, f64> = members
            .iter()
            .zip(times)
            .filter_map(|(m, t)| t.map(|t| (m.to_string(), t)))
            .collect();
        if arrivals.len() < members.len() {
            warn!(
                missing = members.len() - arrivals.len(),
                "members without arrival time, ranking them last in their tie"
            );
        }

        Ok(rank(candidates, &arrivals, n))
    }
}
