use cinema_core::{BookingStatus, RepoError, SessionError};

/// Coarse error families, one HTTP status each at the API edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Expired,
    InvalidState,
    Upstream,
    Persistence,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("session {0} not found")]
    SessionNotFound(i64),

    #[error("session {0} has already started")]
    SessionAlreadyStarted(i64),

    #[error("session provider unavailable: {0}")]
    Upstream(String),

    #[error("seats already booked: {seat_ids:?}")]
    SeatsAlreadyBooked { seat_ids: Vec<i64> },

    #[error("booking {0} not found")]
    BookingNotFound(i64),

    #[error("booking {0} has expired")]
    BookingExpired(i64),

    #[error("booking {0} is already confirmed")]
    BookingAlreadyConfirmed(i64),

    #[error("booking {0} is already cancelled")]
    BookingAlreadyCancelled(i64),

    #[error("booking {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: i64,
        from: String,
        to: BookingStatus,
    },

    #[error("booking {id} has invalid stored status {status:?}")]
    InvalidBookingStatus { id: i64, status: String },

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::Validation(_)
            | BookingError::SessionAlreadyStarted(_)
            | BookingError::InvalidTransition { .. } => ErrorKind::Validation,
            BookingError::SessionNotFound(_) | BookingError::BookingNotFound(_) => ErrorKind::NotFound,
            BookingError::SeatsAlreadyBooked { .. }
            | BookingError::BookingAlreadyConfirmed(_)
            | BookingError::BookingAlreadyCancelled(_) => ErrorKind::Conflict,
            BookingError::BookingExpired(_) => ErrorKind::Expired,
            BookingError::InvalidBookingStatus { .. } => ErrorKind::InvalidState,
            BookingError::Upstream(_) => ErrorKind::Upstream,
            BookingError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

impl From<RepoError> for BookingError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(id) => BookingError::BookingNotFound(id),
            // The caller knows which seats it asked for and fills them in.
            RepoError::SeatConflict { .. } => BookingError::SeatsAlreadyBooked { seat_ids: Vec::new() },
            RepoError::Persistence(msg) => BookingError::Persistence(msg),
        }
    }
}

impl From<SessionError> for BookingError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => BookingError::SessionNotFound(id),
            SessionError::Upstream(msg) => BookingError::Upstream(msg),
        }
    }
}
