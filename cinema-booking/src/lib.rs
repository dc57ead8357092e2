pub mod error;
pub mod mock;
pub mod models;
pub mod service;

pub use error::{BookingError, ErrorKind};
pub use models::{CreateBookingRequest, UpdateBookingRequest};
pub use service::{check_transition, BookingOperations, BookingService};
