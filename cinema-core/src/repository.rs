use async_trait::async_trait;
use crate::booking::{Booking, BookingPatch, NewBooking};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("booking {0} not found")]
    NotFound(i64),

    /// The store-level `(session_id, seat_id)` guard rejected a seat insert.
    #[error("seat of booking {booking_id} is already held for its session")]
    SeatConflict { booking_id: i64 },

    #[error("persistence failure: {0}")]
    Persistence(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository trait for bookings and their seat assignments.
///
/// Every reservation-affecting method takes the caller's transaction so that
/// "check availability + reserve + record" commits or rolls back as one unit.
/// Dropping a `Tx` without `commit` rolls it back.
#[async_trait]
pub trait BookingRepository: Send + Sync + 'static {
    type Tx: Send;

    async fn begin(&self) -> RepoResult<Self::Tx>;

    async fn commit(&self, tx: Self::Tx) -> RepoResult<()>;

    async fn rollback(&self, tx: Self::Tx) -> RepoResult<()>;

    async fn create(&self, tx: &mut Self::Tx, booking: &NewBooking) -> RepoResult<Booking>;

    /// Must run in the same transaction as the `create` of `booking_id`.
    async fn create_seats(&self, tx: &mut Self::Tx, booking_id: i64, seat_ids: &[i64]) -> RepoResult<()>;

    /// Subset of `seat_ids` attached to a pending or confirmed booking for
    /// `session_id`. Empty means every requested seat is free.
    async fn check_booked(&self, session_id: i64, seat_ids: &[i64]) -> RepoResult<Vec<i64>>;

    async fn check_booked_with_tx(
        &self,
        tx: &mut Self::Tx,
        session_id: i64,
        seat_ids: &[i64],
    ) -> RepoResult<Vec<i64>>;

    async fn list(&self) -> RepoResult<Vec<Booking>>;

    async fn get_by_id(&self, id: i64) -> RepoResult<Booking>;

    /// Locks the booking row until the transaction ends.
    async fn get_by_id_with_tx(&self, tx: &mut Self::Tx, id: i64) -> RepoResult<Booking>;

    async fn update(&self, id: i64, patch: &BookingPatch) -> RepoResult<()>;

    async fn update_with_tx(&self, tx: &mut Self::Tx, id: i64, patch: &BookingPatch) -> RepoResult<()>;

    async fn delete_seats_by_booking(&self, tx: &mut Self::Tx, booking_id: i64) -> RepoResult<()>;

    /// Administrative removal of a booking and its seats.
    async fn delete(&self, tx: &mut Self::Tx, id: i64) -> RepoResult<()>;
}
