use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use cinema_core::events::{BookingConfirmedEvent, BookingEventPublisher, PublishError};
use cinema_core::session::{Session, SessionError, SessionProvider};
use cinema_core::Booking;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-process Session Provider with a fixed schedule.
#[derive(Default)]
pub struct MockSessionProvider {
    sessions: Mutex<HashMap<i64, Session>>,
    unavailable: AtomicBool,
}

impl MockSessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(self, id: i64, start_time: DateTime<Utc>) -> Self {
        self.add_session(id, start_time);
        self
    }

    /// A session starting `minutes` from now; negative values are in the past.
    pub fn with_session_in(self, id: i64, minutes: i64) -> Self {
        self.with_session(id, Utc::now() + Duration::minutes(minutes))
    }

    pub fn add_session(&self, id: i64, start_time: DateTime<Utc>) {
        let session = Session {
            id,
            movie_id: 1,
            hall_id: 1,
            start_time,
            end_time: start_time + Duration::hours(2),
            status: Some("scheduled".to_string()),
        };
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(id, session);
        }
    }

    /// Every lookup fails as if the cinema service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionProvider for MockSessionProvider {
    async fn get_session(&self, session_id: i64) -> Result<Session, SessionError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SessionError::Upstream("connection refused".to_string()));
        }

        let sessions = self
            .sessions
            .lock()
            .map_err(|_| SessionError::Upstream("session table poisoned".to_string()))?;
        sessions
            .get(&session_id)
            .cloned()
            .ok_or(SessionError::NotFound(session_id))
    }
}

/// Publisher that keeps every event instead of sending it.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<(String, BookingConfirmedEvent)>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every publish fail with a delivery error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Recorded `(key, event)` pairs in publish order.
    pub fn events(&self) -> Vec<(String, BookingConfirmedEvent)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl BookingEventPublisher for RecordingPublisher {
    async fn publish_booking_confirmed(&self, booking: &Booking) -> Result<(), PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Delivery("broker unreachable".to_string()));
        }

        let key = cinema_core::events::booking_event_key(booking.id);
        let event = BookingConfirmedEvent::from_booking(booking);
        self.events
            .lock()
            .map_err(|_| PublishError::Delivery("recorder poisoned".to_string()))?
            .push((key, event));
        Ok(())
    }
}
