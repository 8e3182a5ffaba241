//! The [`Leaderboard`] trait and its in-memory implementation.

use std::collections::HashMap;
use std::future::Future;

use playgate_protocol::{LeaderboardEntry, MAX_SCORE, PlayerHandle};
use tokio::sync::Mutex;

use crate::RankingError;

// ---------------------------------------------------------------------------
// LeaderboardConfig
// ---------------------------------------------------------------------------

/// Which board to use and how much of it to return.
#[derive(Debug, Clone)]
pub struct LeaderboardConfig {
    /// Store key of the board. Default: `"scores"`.
    pub key: String,
    /// Rows returned after each submission. Default: 10.
    pub top_n: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            key: "scores".to_string(),
            top_n: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

/// A ranked board of one score per player.
///
/// Ordering is by score, highest first. Equal scores rank the earlier
/// submission first. Submitting again replaces the player's score and
/// its submission time.
pub trait Leaderboard: Send + Sync + 'static {
    /// Records `points` for `member`.
    ///
    /// # Errors
    /// [`RankingError::InvalidScore`] if `points` is outside
    /// `0..=MAX_SCORE`; [`RankingError::Store`] if the board is down.
    fn submit(
        &self,
        member: &PlayerHandle,
        points: i64,
    ) -> impl Future<Output = Result<(), RankingError>> + Send;

    /// The best `n` rows, in rank order.
    fn top(&self, n: usize)
    -> impl Future<Output = Result<Vec<LeaderboardEntry>, RankingError>> + Send;
}

/// Rejects scores the board cannot hold exactly.
pub fn check_points(points: i64) -> Result<(), RankingError> {
    if (0..=MAX_SCORE).contains(&points) {
        Ok(())
    } else {
        Err(RankingError::InvalidScore(format!(
            "score {points} is outside 0..={MAX_SCORE}"
        )))
    }
}

// ---------------------------------------------------------------------------
// MemoryLeaderboard
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Board {
    /// member → (points, arrival sequence number)
    rows: HashMap<PlayerHandle, (i64, u64)>,
    next_seq: u64,
}

/// In-process [`Leaderboard`]. Arrival order is a sequence counter, so
/// ties are broken exactly even within the same millisecond.
#[derive(Debug, Default)]
pub struct MemoryLeaderboard {
    board: Mutex<Board>,
}

impl MemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of players on the board.
    pub async fn len(&self) -> usize {
        self.board.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Leaderboard for MemoryLeaderboard {
    async fn submit(&self, member: &PlayerHandle, points: i64) -> Result<(), RankingError> {
        check_points(points)?;
        let mut board = self.board.lock().await;
        let seq = board.next_seq;
        board.next_seq += 1;
        board.rows.insert(member.clone(), (points, seq));
        Ok(())
    }

    async fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, RankingError> {
        let board = self.board.lock().await;
        let mut rows: Vec<_> = board.rows.iter().collect();
        rows.sort_by(|(_, (pa, sa)), (_, (pb, sb))| pb.cmp(pa).then(sa.cmp(sb)));
        Ok(rows
            .into_iter()
            .take(n)
            .map(|(member, (points, _))| LeaderboardEntry {
                member: member.clone(),
                score: *points,
            })
            .collect())
    }
}
