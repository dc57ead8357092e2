use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scheduled showtime as reported by the cinema service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub movie_id: i64,
    pub hall_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Session {
    /// Bookable only while the start time is strictly in the future.
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(i64),

    #[error("session provider unavailable: {0}")]
    Upstream(String),
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn get_session(&self, session_id: i64) -> Result<Session, SessionError>;
}
