use cinema_booking::BookingOperations;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<dyn BookingOperations>,
}

impl AppState {
    pub fn new(bookings: Arc<dyn BookingOperations>) -> Self {
        Self { bookings }
    }
}
