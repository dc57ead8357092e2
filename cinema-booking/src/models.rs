use cinema_core::BookingStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub session_id: i64,
    pub user_id: i64,
    #[serde(rename = "seats_id")]
    pub seat_ids: Vec<i64>,
}

impl CreateBookingRequest {
    /// Seats form a set: at least one, no repeats.
    pub fn validate(&self) -> Result<(), String> {
        if self.seat_ids.is_empty() {
            return Err("at least one seat is required".to_string());
        }

        let mut seen = std::collections::HashSet::with_capacity(self.seat_ids.len());
        let repeated: Vec<i64> = self
            .seat_ids
            .iter()
            .copied()
            .filter(|id| !seen.insert(*id))
            .collect();
        if !repeated.is_empty() {
            return Err(format!("seats requested more than once: {:?}", repeated));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBookingRequest {
    #[serde(default)]
    pub booking_status: Option<BookingStatus>,
}
