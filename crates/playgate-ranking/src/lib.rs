//! Leaderboard boundary for Playgate.
//!
//! Players identify themselves on the board by their [`PlayerHandle`],
//! never by their external identity. The board keeps one score per
//! handle; the HTTP layer submits a score and answers with the current
//! top of the board.
//!
//! - [`Leaderboard`]: the trait the server is generic over
//! - [`MemoryLeaderboard`]: in-process, for tests and development
//! - [`RedisLeaderboard`] (feature `redis`): sorted sets in Redis
//!
//! [`PlayerHandle`]: playgate_protocol::PlayerHandle

mod error;
mod leaderboard;
#[cfg(feature = "redis")]
mod redis_board;

pub use error::RankingError;
pub use leaderboard::{Leaderboard, LeaderboardConfig, MemoryLeaderboard, check_points};
#[cfg(feature = "redis")]
pub use redis_board::RedisLeaderboard;
