use async_trait::async_trait;
use chrono::Utc;
use cinema_core::booking::{BookedSeat, Booking, BookingPatch, NewBooking};
use cinema_core::repository::{BookingRepository, RepoError, RepoResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_id: i64,
    bookings: BTreeMap<i64, Booking>,
    /// (session_id, seat_id) -> owning booking; the unique seat guard.
    held: HashMap<(i64, i64), i64>,
}

impl MemoryState {
    fn booking(&self, id: i64) -> RepoResult<&Booking> {
        self.bookings.get(&id).ok_or(RepoError::NotFound(id))
    }

    fn held_seats(&self, session_id: i64, seat_ids: &[i64]) -> Vec<i64> {
        seat_ids
            .iter()
            .copied()
            .filter(|seat_id| {
                self.held
                    .get(&(session_id, *seat_id))
                    .and_then(|owner| self.bookings.get(owner))
                    .and_then(|b| b.booking_status.known())
                    .map(|status| status.holds_seats())
                    .unwrap_or(false)
            })
            .collect()
    }

    fn insert_booking(&mut self, new: &NewBooking) -> Booking {
        self.last_id += 1;
        let now = Utc::now();
        let booking = Booking {
            id: self.last_id,
            session_id: new.session_id,
            user_id: new.user_id,
            booking_status: new.booking_status.into(),
            payment_status: new.payment_status,
            expires_at: new.expires_at,
            seats: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.bookings.insert(booking.id, booking.clone());
        booking
    }

    fn insert_seats(&mut self, booking_id: i64, seat_ids: &[i64]) -> RepoResult<()> {
        let session_id = self.booking(booking_id)?.session_id;

        let mut seen = Vec::with_capacity(seat_ids.len());
        for seat_id in seat_ids {
            if self.held.contains_key(&(session_id, *seat_id)) || seen.contains(seat_id) {
                return Err(RepoError::SeatConflict { booking_id });
            }
            seen.push(*seat_id);
        }

        let booking = self
            .bookings
            .get_mut(&booking_id)
            .ok_or(RepoError::NotFound(booking_id))?;
        for seat_id in seat_ids {
            booking.seats.push(BookedSeat { booking_id, seat_id: *seat_id });
            self.held.insert((session_id, *seat_id), booking_id);
        }
        booking.seats.sort_by_key(|s| s.seat_id);
        Ok(())
    }

    fn apply_patch(&mut self, id: i64, patch: &BookingPatch) -> RepoResult<()> {
        let booking = self.bookings.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        if let Some(status) = patch.booking_status {
            booking.booking_status = status.into();
        }
        if let Some(payment) = patch.payment_status {
            booking.payment_status = payment;
        }
        booking.updated_at = Utc::now();
        Ok(())
    }

    fn release_seats(&mut self, booking_id: i64) -> RepoResult<()> {
        let booking = self
            .bookings
            .get_mut(&booking_id)
            .ok_or(RepoError::NotFound(booking_id))?;
        let session_id = booking.session_id;
        for seat in booking.seats.drain(..) {
            self.held.remove(&(session_id, seat.seat_id));
        }
        Ok(())
    }
}

/// Process-local booking store.
///
/// Transactions are serialised: `begin` takes an owned lock on the whole
/// state and works on a staged copy that `commit` writes back. Dropping the
/// transaction discards the copy. Calling a non-transactional method from a
/// task that still holds a transaction waits forever.
#[derive(Clone, Default)]
pub struct MemoryBookingRepository {
    state: Arc<Mutex<MemoryState>>,
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

impl MemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Hooks for reproducing rows the booking service itself never writes.
#[cfg(any(test, feature = "test-util"))]
impl MemoryBookingRepository {
    /// Writes a stored status string directly, bypassing the vocabulary.
    /// Lets tests reproduce rows written by other tools.
    pub async fn force_raw_status(&self, id: i64, raw: &str) -> RepoResult<()> {
        let mut state = self.state.lock().await;
        let booking = state.bookings.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        booking.booking_status = cinema_core::StoredStatus::parse(raw);
        Ok(())
    }

    /// Moves a hold's expiry, for reproducing lapsed holds.
    pub async fn force_expires_at(&self, id: i64, expires_at: chrono::DateTime<Utc>) -> RepoResult<()> {
        let mut state = self.state.lock().await;
        let booking = state.bookings.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        booking.expires_at = expires_at;
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for MemoryBookingRepository {
    type Tx = MemoryTx;

    async fn begin(&self) -> RepoResult<Self::Tx> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx { guard, staged })
    }

    async fn commit(&self, tx: Self::Tx) -> RepoResult<()> {
        let MemoryTx { mut guard, staged } = tx;
        *guard = staged;
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> RepoResult<()> {
        drop(tx);
        Ok(())
    }

    async fn create(&self, tx: &mut Self::Tx, booking: &NewBooking) -> RepoResult<Booking> {
        Ok(tx.staged.insert_booking(booking))
    }

    async fn create_seats(&self, tx: &mut Self::Tx, booking_id: i64, seat_ids: &[i64]) -> RepoResult<()> {
        tx.staged.insert_seats(booking_id, seat_ids)
    }

    async fn check_booked(&self, session_id: i64, seat_ids: &[i64]) -> RepoResult<Vec<i64>> {
        Ok(self.state.lock().await.held_seats(session_id, seat_ids))
    }

    async fn check_booked_with_tx(
        &self,
        tx: &mut Self::Tx,
        session_id: i64,
        seat_ids: &[i64],
    ) -> RepoResult<Vec<i64>> {
        Ok(tx.staged.held_seats(session_id, seat_ids))
    }

    async fn list(&self) -> RepoResult<Vec<Booking>> {
        Ok(self.state.lock().await.bookings.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i64) -> RepoResult<Booking> {
        self.state.lock().await.booking(id).cloned()
    }

    async fn get_by_id_with_tx(&self, tx: &mut Self::Tx, id: i64) -> RepoResult<Booking> {
        tx.staged.booking(id).cloned()
    }

    async fn update(&self, id: i64, patch: &BookingPatch) -> RepoResult<()> {
        self.state.lock().await.apply_patch(id, patch)
    }

    async fn update_with_tx(&self, tx: &mut Self::Tx, id: i64, patch: &BookingPatch) -> RepoResult<()> {
        tx.staged.apply_patch(id, patch)
    }

    async fn delete_seats_by_booking(&self, tx: &mut Self::Tx, booking_id: i64) -> RepoResult<()> {
        tx.staged.release_seats(booking_id)
    }

    async fn delete(&self, tx: &mut Self::Tx, id: i64) -> RepoResult<()> {
        tx.staged.release_seats(id)?;
        tx.staged.bookings.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use cinema_core::BookingStatus;

    fn hold(session_id: i64) -> NewBooking {
        NewBooking::hold(session_id, 1, Utc::now(), Duration::minutes(15))
    }

    #[tokio::test]
    async fn test_commit_publishes_staged_rows() {
        let repo = MemoryBookingRepository::new();

        let mut tx = repo.begin().await.unwrap();
        let booking = repo.create(&mut tx, &hold(10)).await.unwrap();
        repo.create_seats(&mut tx, booking.id, &[2, 1]).await.unwrap();
        repo.commit(tx).await.unwrap();

        let stored = repo.get_by_id(booking.id).await.unwrap();
        assert_eq!(stored.seat_ids(), vec![1, 2]);
        assert_eq!(repo.check_booked(10, &[1, 2, 3]).await.unwrap(), vec![1, 2]);
        assert!(repo.check_booked(11, &[1, 2]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let repo = MemoryBookingRepository::new();

        {
            let mut tx = repo.begin().await.unwrap();
            let booking = repo.create(&mut tx, &hold(10)).await.unwrap();
            repo.create_seats(&mut tx, booking.id, &[1]).await.unwrap();
        }

        assert!(repo.list().await.unwrap().is_empty());
        assert!(repo.check_booked(10, &[1]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seat_guard_rejects_second_holder() {
        let repo = MemoryBookingRepository::new();

        let mut tx = repo.begin().await.unwrap();
        let first = repo.create(&mut tx, &hold(10)).await.unwrap();
        repo.create_seats(&mut tx, first.id, &[1, 2]).await.unwrap();
        let second = repo.create(&mut tx, &hold(10)).await.unwrap();

        let err = repo.create_seats(&mut tx, second.id, &[2, 3]).await.unwrap_err();
        assert!(matches!(err, RepoError::SeatConflict { booking_id } if booking_id == second.id));
    }

    #[tokio::test]
    async fn test_released_seats_become_free() {
        let repo = MemoryBookingRepository::new();

        let mut tx = repo.begin().await.unwrap();
        let booking = repo.create(&mut tx, &hold(10)).await.unwrap();
        repo.create_seats(&mut tx, booking.id, &[4]).await.unwrap();
        repo.commit(tx).await.unwrap();

        let mut tx = repo.begin().await.unwrap();
        repo.update_with_tx(&mut tx, booking.id, &BookingPatch::status(BookingStatus::Cancelled))
            .await
            .unwrap();
        repo.delete_seats_by_booking(&mut tx, booking.id).await.unwrap();
        repo.commit(tx).await.unwrap();

        let stored = repo.get_by_id(booking.id).await.unwrap();
        assert_eq!(stored.booking_status, BookingStatus::Cancelled);
        assert!(stored.seats.is_empty());
        assert!(repo.check_booked(10, &[4]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_rows_are_not_found() {
        let repo = MemoryBookingRepository::new();

        assert!(matches!(repo.get_by_id(42).await, Err(RepoError::NotFound(42))));
        assert!(matches!(
            repo.update(42, &BookingPatch::status(BookingStatus::Confirmed)).await,
            Err(RepoError::NotFound(42))
        ));

        let mut tx = repo.begin().await.unwrap();
        assert!(matches!(repo.delete(&mut tx, 42).await, Err(RepoError::NotFound(42))));
    }
}
