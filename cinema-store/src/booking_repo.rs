use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cinema_core::booking::{BookedSeat, Booking, BookingPatch, NewBooking, PaymentStatus, StoredStatus};
use cinema_core::repository::{BookingRepository, RepoError, RepoResult};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::collections::{HashMap, HashSet};
use tracing::error;

const BOOKING_COLUMNS: &str =
    "id, session_id, user_id, booking_status, payment_status, expires_at, created_at, updated_at";

pub struct PostgresBookingRepository {
    pool: PgPool,
}

impl PostgresBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    session_id: i64,
    user_id: i64,
    booking_status: String,
    payment_status: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    booking_id: i64,
    seat_id: i64,
}

impl BookingRow {
    fn into_booking(self, seats: Vec<BookedSeat>) -> RepoResult<Booking> {
        let payment_status = self.payment_status.parse::<PaymentStatus>().map_err(|e| {
            error!("booking {} has unreadable payment status: {}", self.id, e);
            RepoError::Persistence(e.to_string())
        })?;

        Ok(Booking {
            id: self.id,
            session_id: self.session_id,
            user_id: self.user_id,
            booking_status: StoredStatus::parse(&self.booking_status),
            payment_status,
            expires_at: self.expires_at,
            seats,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn persistence(e: sqlx::Error) -> RepoError {
    error!("database error: {}", e);
    RepoError::Persistence(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Keeps the caller's seat order for whatever the store reported as held.
fn in_request_order(seat_ids: &[i64], held: Vec<i64>) -> Vec<i64> {
    let held: HashSet<i64> = held.into_iter().collect();
    seat_ids.iter().copied().filter(|id| held.contains(id)).collect()
}

async fn load_booking(conn: &mut PgConnection, id: i64, for_update: bool) -> RepoResult<Booking> {
    let sql = format!(
        "SELECT {} FROM bookings WHERE id = $1{}",
        BOOKING_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );

    let row = sqlx::query_as::<_, BookingRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(persistence)?
        .ok_or(RepoError::NotFound(id))?;

    let seats = sqlx::query_as::<_, SeatRow>(
        "SELECT booking_id, seat_id FROM booked_seats WHERE booking_id = $1 ORDER BY seat_id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await
    .map_err(persistence)?
    .into_iter()
    .map(|s| BookedSeat { booking_id: s.booking_id, seat_id: s.seat_id })
    .collect();

    row.into_booking(seats)
}

async fn held_seats(conn: &mut PgConnection, session_id: i64, seat_ids: &[i64]) -> RepoResult<Vec<i64>> {
    if seat_ids.is_empty() {
        return Ok(Vec::new());
    }

    let held = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT bs.seat_id
        FROM booked_seats bs
        JOIN bookings b ON bs.booking_id = b.id
        WHERE b.session_id = $1
          AND b.booking_status IN ('pending', 'confirmed')
          AND bs.seat_id = ANY($2)
        "#,
    )
    .bind(session_id)
    .bind(seat_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(persistence)?;

    Ok(in_request_order(seat_ids, held))
}

async fn apply_patch(conn: &mut PgConnection, id: i64, patch: &BookingPatch) -> RepoResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE bookings
        SET booking_status = COALESCE($2, booking_status),
            payment_status = COALESCE($3, payment_status),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(patch.booking_status.map(|s| s.as_str()))
    .bind(patch.payment_status.map(|s| s.as_str()))
    .execute(&mut *conn)
    .await
    .map_err(persistence)?;

    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound(id));
    }
    Ok(())
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    type Tx = Transaction<'static, Postgres>;

    async fn begin(&self) -> RepoResult<Self::Tx> {
        self.pool.begin().await.map_err(persistence)
    }

    async fn commit(&self, tx: Self::Tx) -> RepoResult<()> {
        tx.commit().await.map_err(persistence)
    }

    async fn rollback(&self, tx: Self::Tx) -> RepoResult<()> {
        tx.rollback().await.map_err(persistence)
    }

    async fn create(&self, tx: &mut Self::Tx, booking: &NewBooking) -> RepoResult<Booking> {
        let sql = format!(
            r#"
            INSERT INTO bookings (session_id, user_id, booking_status, payment_status, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );

        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking.session_id)
            .bind(booking.user_id)
            .bind(booking.booking_status.as_str())
            .bind(booking.payment_status.as_str())
            .bind(booking.expires_at)
            .fetch_one(&mut **tx)
            .await
            .map_err(persistence)?;

        row.into_booking(Vec::new())
    }

    async fn create_seats(&self, tx: &mut Self::Tx, booking_id: i64, seat_ids: &[i64]) -> RepoResult<()> {
        if seat_ids.is_empty() {
            return Ok(());
        }

        // session_id is copied from the booking so the (session_id, seat_id)
        // unique constraint can guard against a concurrent reserver.
        let result = sqlx::query(
            r#"
            INSERT INTO booked_seats (booking_id, session_id, seat_id)
            SELECT b.id, b.session_id, s.seat_id
            FROM bookings b
            CROSS JOIN UNNEST($2::BIGINT[]) AS s(seat_id)
            WHERE b.id = $1
            "#,
        )
        .bind(booking_id)
        .bind(seat_ids)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoError::SeatConflict { booking_id }
            } else {
                persistence(e)
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(booking_id));
        }
        Ok(())
    }

    async fn check_booked(&self, session_id: i64, seat_ids: &[i64]) -> RepoResult<Vec<i64>> {
        let mut conn = self.pool.acquire().await.map_err(persistence)?;
        held_seats(&mut conn, session_id, seat_ids).await
    }

    async fn check_booked_with_tx(
        &self,
        tx: &mut Self::Tx,
        session_id: i64,
        seat_ids: &[i64],
    ) -> RepoResult<Vec<i64>> {
        held_seats(&mut **tx, session_id, seat_ids).await
    }

    async fn list(&self) -> RepoResult<Vec<Booking>> {
        let sql = format!("SELECT {} FROM bookings ORDER BY id", BOOKING_COLUMNS);
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let seat_rows = sqlx::query_as::<_, SeatRow>(
            "SELECT booking_id, seat_id FROM booked_seats WHERE booking_id = ANY($1) ORDER BY booking_id, seat_id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        let mut seats_by_booking: HashMap<i64, Vec<BookedSeat>> = HashMap::new();
        for seat in seat_rows {
            seats_by_booking
                .entry(seat.booking_id)
                .or_default()
                .push(BookedSeat { booking_id: seat.booking_id, seat_id: seat.seat_id });
        }

        rows.into_iter()
            .map(|row| {
                let seats = seats_by_booking.remove(&row.id).unwrap_or_default();
                row.into_booking(seats)
            })
            .collect()
    }

    async fn get_by_id(&self, id: i64) -> RepoResult<Booking> {
        let mut conn = self.pool.acquire().await.map_err(persistence)?;
        load_booking(&mut conn, id, false).await
    }

    async fn get_by_id_with_tx(&self, tx: &mut Self::Tx, id: i64) -> RepoResult<Booking> {
        load_booking(&mut **tx, id, true).await
    }

    async fn update(&self, id: i64, patch: &BookingPatch) -> RepoResult<()> {
        let mut conn = self.pool.acquire().await.map_err(persistence)?;
        apply_patch(&mut conn, id, patch).await
    }

    async fn update_with_tx(&self, tx: &mut Self::Tx, id: i64, patch: &BookingPatch) -> RepoResult<()> {
        apply_patch(&mut **tx, id, patch).await
    }

    async fn delete_seats_by_booking(&self, tx: &mut Self::Tx, booking_id: i64) -> RepoResult<()> {
        sqlx::query("DELETE FROM booked_seats WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&mut **tx)
            .await
            .map_err(persistence)?;
        Ok(())
    }

    async fn delete(&self, tx: &mut Self::Tx, id: i64) -> RepoResult<()> {
        sqlx::query("DELETE FROM booked_seats WHERE booking_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(persistence)?;

        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(persistence)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_held_seats_keep_request_order() {
        let held = in_request_order(&[5, 2, 9, 3], vec![3, 9]);
        assert_eq!(held, vec![9, 3]);
    }

    #[test]
    fn test_unknown_booking_status_survives_row_mapping() {
        let now = Utc::now();
        let row = BookingRow {
            id: 4,
            session_id: 10,
            user_id: 1,
            booking_status: "on_hold".to_string(),
            payment_status: "paid".to_string(),
            expires_at: now,
            created_at: now,
            updated_at: now,
        };

        let booking = row.into_booking(vec![]).unwrap();
        assert_eq!(booking.booking_status.known(), None);
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_unknown_payment_status_is_persistence_error() {
        let now = Utc::now();
        let row = BookingRow {
            id: 4,
            session_id: 10,
            user_id: 1,
            booking_status: "pending".to_string(),
            payment_status: "refunded".to_string(),
            expires_at: now,
            created_at: now,
            updated_at: now,
        };

        assert!(matches!(row.into_booking(vec![]), Err(RepoError::Persistence(_))));
    }
}
