use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::errors::AppResult;
use crate::handlers::{require_actor, with_conn};
use crate::models::{CreateRoomRequest, Page, Pagination, Room, RoomFilter, UpdateRoomRequest};
use crate::services::rooms;
use crate::state::AppState;

// POST /api/rooms
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateRoomRequest>,
) -> AppResult<(StatusCode, Json<Room>)> {
    let actor = require_actor(&headers)?;
    let room = with_conn(&state, move |conn| rooms::create_room(conn, &actor, &req)).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

// GET /api/rooms
pub async fn search_rooms(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<RoomFilter>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Page<Room>>> {
    let page = with_conn(&state, move |conn| rooms::search_rooms(conn, &filter, pagination)).await?;
    Ok(Json(page))
}

// GET /api/rooms/:id
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<Room>> {
    let room = with_conn(&state, move |conn| rooms::get_room(conn, id)).await?;
    Ok(Json(room))
}

// PUT /api/rooms/:id
pub async fn update_room(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRoomRequest>,
) -> AppResult<Json<Room>> {
    let actor = require_actor(&headers)?;
    let room = with_conn(&state, move |conn| rooms::update_room(conn, &actor, id, &req)).await?;
    Ok(Json(room))
}

// DELETE /api/rooms/:id
pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let actor = require_actor(&headers)?;
    with_conn(&state, move |conn| rooms::delete_room(conn, &actor, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
