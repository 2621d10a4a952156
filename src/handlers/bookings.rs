use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppResult;
use crate::handlers::{blocking, require_actor, with_conn};
use crate::models::{
    Booking, BookingDetail, BookingFilter, BookingStatus, Capability, CreateBookingRequest,
    CreatePaymentRequest, Page, Pagination, Payment, Role,
};
use crate::services::status::StatusUpdate;
use crate::services::{access, payments};
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<Booking>)> {
    let actor = require_actor(&headers)?;
    let booking = blocking(move || state.bookings.create_booking(Some(&actor), &req)).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// POST /api/guest/bookings
pub async fn create_guest_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<Booking>)> {
    let booking = blocking(move || state.bookings.create_guest_booking(&req)).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(filter): Query<BookingFilter>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Page<Booking>>> {
    let actor = require_actor(&headers)?;

    // Guests only ever see their own bookings.
    let user_id = match actor.role {
        Role::Guest => Some(actor.user_id),
        _ => {
            access::require(&actor, Capability::ViewAllBookings)?;
            None
        }
    };

    let page = blocking(move || state.bookings.filter_bookings(&filter, user_id, pagination)).await?;
    Ok(Json(page))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<BookingDetail>> {
    let actor = require_actor(&headers)?;

    let detail = blocking(move || {
        let detail = state.bookings.get_booking_detail(&id)?;
        let conn = crate::db::lock(&state.db)?;
        access::ensure_booking_visible(&conn, &actor, &detail.booking)?;
        Ok(detail)
    })
    .await?;
    Ok(Json(detail))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: BookingStatus,
}

// PUT /api/bookings/:id/status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> AppResult<Json<StatusUpdate>> {
    let actor = require_actor(&headers)?;
    let result =
        blocking(move || state.status_guard.update_booking_status(&actor, &id, req.status)).await?;
    Ok(Json(result))
}

// POST /api/bookings/:id/payments
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<CreatePaymentRequest>,
) -> AppResult<(StatusCode, Json<Payment>)> {
    let actor = require_actor(&headers)?;
    let payment = with_conn(&state, move |conn| payments::create_payment(conn, &actor, &id, &req)).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}
