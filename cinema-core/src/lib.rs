pub mod booking;
pub mod events;
pub mod repository;
pub mod session;

pub use booking::{BookedSeat, Booking, BookingPatch, BookingStatus, NewBooking, PaymentStatus, StoredStatus};
pub use events::{BookingConfirmedEvent, BookingEventPublisher, PublishError};
pub use repository::{BookingRepository, RepoError, RepoResult};
pub use session::{Session, SessionError, SessionProvider};
