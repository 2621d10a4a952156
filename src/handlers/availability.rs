use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::errors::AppResult;
use crate::handlers::{blocking, require_actor};
use crate::models::{AvailabilityDay, BulkAvailabilityRequest, Capability, SetOverrideRequest};
use crate::services::rooms;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CalendarQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Serialize)]
pub struct CalendarResponse {
    room_id: i64,
    base_price: i64,
    days: Vec<AvailabilityDay>,
}

// GET /api/rooms/:id/availability
pub async fn get_calendar(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<i64>,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<CalendarResponse>> {
    let response = blocking(move || {
        let room = {
            let conn = db::lock(&state.db)?;
            rooms::get_room(&conn, room_id)?
        };
        let days = state.ledger.calendar(room.id, query.start_date, query.end_date)?;
        Ok(CalendarResponse {
            room_id: room.id,
            base_price: room.price,
            days,
        })
    })
    .await?;
    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct CheckQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

#[derive(Serialize)]
pub struct CheckResponse {
    room_id: i64,
    check_in: NaiveDate,
    check_out: NaiveDate,
    available: bool,
}

// GET /api/rooms/:id/availability/check
pub async fn check_range(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<i64>,
    Query(query): Query<CheckQuery>,
) -> AppResult<Json<CheckResponse>> {
    let response = blocking(move || {
        {
            let conn = db::lock(&state.db)?;
            rooms::get_room(&conn, room_id)?;
        }
        let available = state.ledger.is_range_free(room_id, query.check_in, query.check_out)?;
        Ok(CheckResponse {
            room_id,
            check_in: query.check_in,
            check_out: query.check_out,
            available,
        })
    })
    .await?;
    Ok(Json(response))
}

// PUT /api/rooms/:id/availability
pub async fn set_override(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
    Json(req): Json<SetOverrideRequest>,
) -> AppResult<Json<AvailabilityDay>> {
    let actor = require_actor(&headers)?;

    let day = blocking(move || {
        {
            let conn = db::lock(&state.db)?;
            rooms::owned_room(&conn, &actor, room_id, Capability::ManageCalendar)?;
        }
        state
            .ledger
            .set_override(room_id, req.date, req.status, req.price, req.force)
    })
    .await?;
    Ok(Json(day))
}

// POST /api/rooms/:id/availability/bulk
pub async fn bulk_update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(room_id): Path<i64>,
    Json(req): Json<BulkAvailabilityRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let actor = require_actor(&headers)?;

    let updated = blocking(move || {
        {
            let conn = db::lock(&state.db)?;
            rooms::owned_room(&conn, &actor, room_id, Capability::ManageCalendar)?;
        }
        state.ledger.bulk_set_range(room_id, &req)
    })
    .await?;
    Ok(Json(serde_json::json!({ "success": true, "updated": updated })))
}
