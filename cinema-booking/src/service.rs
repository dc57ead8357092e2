use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cinema_core::booking::{Booking, BookingPatch, BookingStatus, NewBooking, PaymentStatus};
use cinema_core::events::BookingEventPublisher;
use cinema_core::repository::{BookingRepository, RepoError};
use cinema_core::session::SessionProvider;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::BookingError;
use crate::models::{CreateBookingRequest, UpdateBookingRequest};

/// Booking lifecycle operations as seen by the HTTP layer.
#[async_trait]
pub trait BookingOperations: Send + Sync {
    /// Reserve seats: a new pending hold.
    async fn create(&self, request: CreateBookingRequest) -> Result<Booking, BookingError>;

    async fn list(&self) -> Result<Vec<Booking>, BookingError>;

    async fn get(&self, id: i64) -> Result<Booking, BookingError>;

    /// Routes a requested status to the matching transition.
    async fn update(&self, id: i64, request: UpdateBookingRequest) -> Result<Booking, BookingError>;

    async fn confirm(&self, id: i64) -> Result<Booking, BookingError>;

    async fn cancel(&self, id: i64) -> Result<Booking, BookingError>;

    /// Reclaims a lapsed hold: marks it expired and releases its seats.
    async fn expire(&self, id: i64) -> Result<Booking, BookingError>;

    /// Administrative removal, outside the normal lifecycle.
    async fn delete(&self, id: i64) -> Result<(), BookingError>;
}

/// Decides whether `booking` may move to `target` at `now`.
///
/// Confirm and cancel look at the hold first: once `expires_at` has passed
/// the booking answers as expired whatever its stored status. Expire only
/// applies to a pending booking whose hold has lapsed.
pub fn check_transition(
    booking: &Booking,
    target: BookingStatus,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    let id = booking.id;
    let lapsed = booking.hold_lapsed(now);

    if lapsed && matches!(target, BookingStatus::Confirmed | BookingStatus::Cancelled) {
        return Err(BookingError::BookingExpired(id));
    }

    match booking.booking_status.known() {
        Some(BookingStatus::Expired) => Err(BookingError::BookingExpired(id)),
        Some(BookingStatus::Cancelled) => Err(BookingError::BookingAlreadyCancelled(id)),
        Some(BookingStatus::Confirmed) => Err(BookingError::BookingAlreadyConfirmed(id)),
        Some(BookingStatus::Pending) => match target {
            BookingStatus::Expired if !lapsed => Err(BookingError::InvalidTransition {
                id,
                from: format!("pending (hold active until {})", booking.expires_at),
                to: target,
            }),
            _ if BookingStatus::Pending.can_transition_to(target) => Ok(()),
            _ => Err(BookingError::InvalidTransition {
                id,
                from: BookingStatus::Pending.to_string(),
                to: target,
            }),
        },
        None => {
            error!(
                "Booking {} has unrecognised status {:?}; refusing transition to {}",
                id,
                booking.booking_status.as_str(),
                target
            );
            Err(BookingError::InvalidBookingStatus {
                id,
                status: booking.booking_status.as_str().to_string(),
            })
        }
    }
}

/// Orchestrates reservations over a transactional repository.
pub struct BookingService<R: BookingRepository> {
    repo: Arc<R>,
    sessions: Arc<dyn SessionProvider>,
    publisher: Arc<dyn BookingEventPublisher>,
    hold: chrono::Duration,
}

impl<R: BookingRepository> BookingService<R> {
    pub fn new(
        repo: Arc<R>,
        sessions: Arc<dyn SessionProvider>,
        publisher: Arc<dyn BookingEventPublisher>,
        hold: chrono::Duration,
    ) -> Self {
        Self {
            repo,
            sessions,
            publisher,
            hold,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// Commits on success, rolls back on failure; never leaves `tx` open.
    async fn finish<T>(&self, tx: R::Tx, outcome: Result<T, BookingError>) -> Result<T, BookingError> {
        match outcome {
            Ok(value) => {
                self.repo.commit(tx).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.repo.rollback(tx).await {
                    error!("Rollback failed after {}: {}", err, rollback_err);
                }
                Err(err)
            }
        }
    }

    async fn reserve(&self, tx: &mut R::Tx, request: &CreateBookingRequest) -> Result<Booking, BookingError> {
        let session = self.sessions.get_session(request.session_id).await?;
        let now = Utc::now();
        if session.has_started(now) {
            return Err(BookingError::SessionAlreadyStarted(request.session_id));
        }

        let taken = self
            .repo
            .check_booked_with_tx(tx, request.session_id, &request.seat_ids)
            .await?;
        if !taken.is_empty() {
            return Err(BookingError::SeatsAlreadyBooked { seat_ids: taken });
        }

        let hold = NewBooking::hold(request.session_id, request.user_id, now, self.hold);
        let booking = self.repo.create(tx, &hold).await?;

        self.repo
            .create_seats(tx, booking.id, &request.seat_ids)
            .await
            .map_err(|e| match e {
                RepoError::SeatConflict { .. } => BookingError::SeatsAlreadyBooked {
                    seat_ids: request.seat_ids.clone(),
                },
                other => other.into(),
            })?;

        Ok(self.repo.get_by_id_with_tx(tx, booking.id).await?)
    }

    /// After a rollback, narrow a seat conflict down to the seats that are
    /// actually held now. Keeps the original list if the holder vanished.
    async fn held_now(&self, request: &CreateBookingRequest, reported: Vec<i64>) -> Vec<i64> {
        match self.repo.check_booked(request.session_id, &request.seat_ids).await {
            Ok(held) if !held.is_empty() => held,
            Ok(_) => reported,
            Err(e) => {
                warn!("Could not refresh held seats for session {}: {}", request.session_id, e);
                reported
            }
        }
    }

    async fn transition_locked(
        &self,
        tx: &mut R::Tx,
        id: i64,
        target: BookingStatus,
    ) -> Result<Booking, BookingError> {
        let booking = self.repo.get_by_id_with_tx(tx, id).await?;
        check_transition(&booking, target, Utc::now())?;

        let patch = match target {
            BookingStatus::Confirmed => BookingPatch::status(target).with_payment(PaymentStatus::Paid),
            _ => BookingPatch::status(target),
        };
        self.repo.update_with_tx(tx, id, &patch).await?;

        if !target.holds_seats() {
            self.repo.delete_seats_by_booking(tx, id).await?;
        }

        Ok(self.repo.get_by_id_with_tx(tx, id).await?)
    }

    async fn transition(&self, id: i64, target: BookingStatus) -> Result<Booking, BookingError> {
        let mut tx = self.repo.begin().await?;
        let outcome = self.transition_locked(&mut tx, id, target).await;
        let booking = self.finish(tx, outcome).await.map_err(|e| {
            warn!("Booking {} not moved to {}: {}", id, target, e);
            e
        })?;
        info!("Booking {} is now {}", id, target);
        Ok(booking)
    }
}

#[async_trait]
impl<R: BookingRepository> BookingOperations for BookingService<R> {
    async fn create(&self, request: CreateBookingRequest) -> Result<Booking, BookingError> {
        request.validate().map_err(BookingError::Validation)?;

        let mut tx = self.repo.begin().await?;
        let outcome = self.reserve(&mut tx, &request).await;

        match self.finish(tx, outcome).await {
            Ok(booking) => {
                info!(
                    "Booking {} created: session {} seats {:?}, hold until {}",
                    booking.id,
                    booking.session_id,
                    booking.seat_ids(),
                    booking.expires_at
                );
                Ok(booking)
            }
            Err(BookingError::SeatsAlreadyBooked { seat_ids }) => {
                let seat_ids = self.held_now(&request, seat_ids).await;
                warn!("Session {} seats already booked: {:?}", request.session_id, seat_ids);
                Err(BookingError::SeatsAlreadyBooked { seat_ids })
            }
            Err(e) => Err(e),
        }
    }

    async fn list(&self) -> Result<Vec<Booking>, BookingError> {
        Ok(self.repo.list().await?)
    }

    async fn get(&self, id: i64) -> Result<Booking, BookingError> {
        Ok(self.repo.get_by_id(id).await?)
    }

    async fn update(&self, id: i64, request: UpdateBookingRequest) -> Result<Booking, BookingError> {
        match request.booking_status {
            None => self.get(id).await,
            Some(BookingStatus::Confirmed) => self.confirm(id).await,
            Some(BookingStatus::Cancelled) => self.cancel(id).await,
            Some(BookingStatus::Expired) => self.expire(id).await,
            Some(BookingStatus::Pending) => {
                let booking = self.get(id).await?;
                if booking.booking_status == BookingStatus::Pending {
                    Ok(booking)
                } else {
                    Err(BookingError::InvalidTransition {
                        id,
                        from: booking.booking_status.to_string(),
                        to: BookingStatus::Pending,
                    })
                }
            }
        }
    }

    async fn confirm(&self, id: i64) -> Result<Booking, BookingError> {
        let booking = self.transition(id, BookingStatus::Confirmed).await?;

        // Committed already; a lost notification must not undo it.
        if let Err(e) = self.publisher.publish_booking_confirmed(&booking).await {
            error!("Failed to publish confirmation of booking {}: {}", booking.id, e);
        }

        Ok(booking)
    }

    async fn cancel(&self, id: i64) -> Result<Booking, BookingError> {
        self.transition(id, BookingStatus::Cancelled).await
    }

    async fn expire(&self, id: i64) -> Result<Booking, BookingError> {
        self.transition(id, BookingStatus::Expired).await
    }

    async fn delete(&self, id: i64) -> Result<(), BookingError> {
        let mut tx = self.repo.begin().await?;
        let outcome = self.repo.delete(&mut tx, id).await.map_err(BookingError::from);
        self.finish(tx, outcome).await?;
        info!("Booking {} deleted", id);
        Ok(())
    }
}
