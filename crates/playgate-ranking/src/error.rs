//! Error types for the leaderboard.

use playgate_protocol::ProtocolError;

/// Errors that can occur while submitting or reading scores.
#[derive(Debug, thiserror::Error)]
pub enum RankingError {
    /// The leaderboard store is unavailable.
    #[error("leaderboard store error: {0}")]
    Store(String),

    /// The score is not a whole number in `0..=MAX_SCORE`.
    #[error("invalid score: {0}")]
    InvalidScore(String),
}

impl From<ProtocolError> for RankingError {
    fn from(e: ProtocolError) -> Self {
        RankingError::InvalidScore(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for RankingError {
    fn from(e: redis::RedisError) -> Self {
        RankingError::Store(format!("redis: {e}"))
    }
}
