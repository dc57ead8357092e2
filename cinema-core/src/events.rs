use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::booking::{Booking, StoredStatus};

/// Payload of the `bookings` topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingConfirmedEvent {
    pub session_id: i64,
    pub user_id: i64,
    pub booking_status: StoredStatus,
}

impl BookingConfirmedEvent {
    pub fn from_booking(booking: &Booking) -> Self {
        Self {
            session_id: booking.session_id,
            user_id: booking.user_id,
            booking_status: booking.booking_status.clone(),
        }
    }
}

/// Message key giving all events of one booking the same partition.
pub fn booking_event_key(booking_id: i64) -> String {
    format!("booking-{}", booking_id)
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to deliver event: {0}")]
    Delivery(String),
}

/// Best-effort notification of booking state changes.
#[async_trait]
pub trait BookingEventPublisher: Send + Sync {
    async fn publish_booking_confirmed(&self, booking: &Booking) -> Result<(), PublishError>;
}
