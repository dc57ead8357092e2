use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Booking status in the reservation lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Expired => "expired",
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }

    /// Whether a booking in this status owns seat rows.
    pub fn holds_seats(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// Structural legality of `self -> next`. Business rules (expiry) are
    /// applied on top of this by the booking service.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Pending, BookingStatus::Expired)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status value: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "expired" => Ok(BookingStatus::Expired),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Payment status is tracked only; no payment logic lives here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A stored status column.
///
/// Rows written by other tools may carry values outside the vocabulary, so
/// the raw string is kept and the booking service decides what an unknown
/// value means instead of the row mapper failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredStatus {
    Known(BookingStatus),
    Unknown(String),
}

impl StoredStatus {
    pub fn parse(raw: &str) -> Self {
        raw.parse::<BookingStatus>()
            .map(StoredStatus::Known)
            .unwrap_or_else(|_| StoredStatus::Unknown(raw.to_string()))
    }

    pub fn known(&self) -> Option<BookingStatus> {
        match self {
            StoredStatus::Known(status) => Some(*status),
            StoredStatus::Unknown(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StoredStatus::Known(status) => status.as_str(),
            StoredStatus::Unknown(raw) => raw,
        }
    }
}

impl From<BookingStatus> for StoredStatus {
    fn from(status: BookingStatus) -> Self {
        StoredStatus::Known(status)
    }
}

impl PartialEq<BookingStatus> for StoredStatus {
    fn eq(&self, other: &BookingStatus) -> bool {
        self.known() == Some(*other)
    }
}

impl fmt::Display for StoredStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A seat held by a booking for the booking's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedSeat {
    pub booking_id: i64,
    pub seat_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub session_id: i64,
    pub user_id: i64,
    pub booking_status: StoredStatus,
    pub payment_status: PaymentStatus,
    pub expires_at: DateTime<Utc>,
    pub seats: Vec<BookedSeat>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// A hold is live until `expires_at`; the instant itself counts as lapsed.
    pub fn hold_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn seat_ids(&self) -> Vec<i64> {
        self.seats.iter().map(|s| s.seat_id).collect()
    }
}

/// Values for a booking row that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub session_id: i64,
    pub user_id: i64,
    pub booking_status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub expires_at: DateTime<Utc>,
}

impl NewBooking {
    /// A fresh hold: pending, unpaid, expiring `hold` from `now`.
    pub fn hold(session_id: i64, user_id: i64, now: DateTime<Utc>, hold: chrono::Duration) -> Self {
        Self {
            session_id,
            user_id,
            booking_status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            expires_at: now + hold,
        }
    }
}

/// Partial update of the mutable booking columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingPatch {
    pub booking_status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl BookingPatch {
    pub fn status(status: BookingStatus) -> Self {
        Self {
            booking_status: Some(status),
            payment_status: None,
        }
    }

    pub fn with_payment(mut self, payment: PaymentStatus) -> Self {
        self.payment_status = Some(payment);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.booking_status.is_none() && self.payment_status.is_none()
    }
}
