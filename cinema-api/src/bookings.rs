use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use cinema_booking::{CreateBookingRequest, UpdateBookingRequest};
use cinema_core::Booking;
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/booking", post(create_booking).get(list_bookings))
        .route(
            "/booking/{id}",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
        .route("/booking/{id}/confirm", post(confirm_booking))
        .route("/booking/{id}/cancel", post(cancel_booking))
}

/// POST /booking
/// Hold seats for a session
async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    info!("Booking request: session {} user {} seats {:?}", req.session_id, req.user_id, req.seat_ids);
    let booking = state.bookings.create(req).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn list_bookings(State(state): State<AppState>) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.list().await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.get(id).await?))
}

/// PUT /booking/{id}
/// Moves the booking to the requested status through the lifecycle rules
async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.update(id, req).await?))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.confirm(id).await?))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.cancel(id).await?))
}

/// DELETE /booking/{id}
/// Administrative removal
async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.bookings.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
