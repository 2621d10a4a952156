use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::errors::AppResult;
use crate::handlers::{require_actor, with_conn};
use crate::models::{
    CreateHomestayRequest, CreateReviewRequest, Homestay, HomestayFilter, HomestayStats, Page,
    Pagination, Review, RoomStats, UpdateHomestayRequest,
};
use crate::services::reviews::HomestayReviews;
use crate::services::{homestays, reviews, rooms};
use crate::state::AppState;

// POST /api/homestays
pub async fn create_homestay(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateHomestayRequest>,
) -> AppResult<(StatusCode, Json<Homestay>)> {
    let actor = require_actor(&headers)?;
    let homestay = with_conn(&state, move |conn| homestays::create_homestay(conn, &actor, &req)).await?;
    Ok((StatusCode::CREATED, Json(homestay)))
}

// GET /api/homestays
pub async fn search_homestays(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<HomestayFilter>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Page<Homestay>>> {
    let page = with_conn(&state, move |conn| {
        homestays::search_homestays(conn, &filter, pagination)
    })
    .await?;
    Ok(Json(page))
}

// GET /api/homestays/:id
pub async fn get_homestay(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<Homestay>> {
    let homestay = with_conn(&state, move |conn| homestays::get_homestay(conn, id)).await?;
    Ok(Json(homestay))
}

// PUT /api/homestays/:id
pub async fn update_homestay(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UpdateHomestayRequest>,
) -> AppResult<Json<Homestay>> {
    let actor = require_actor(&headers)?;
    let homestay =
        with_conn(&state, move |conn| homestays::update_homestay(conn, &actor, id, &req)).await?;
    Ok(Json(homestay))
}

// DELETE /api/homestays/:id
pub async fn delete_homestay(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let actor = require_actor(&headers)?;
    with_conn(&state, move |conn| homestays::delete_homestay(conn, &actor, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/homestays/:id/reviews
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let actor = require_actor(&headers)?;
    let review = with_conn(&state, move |conn| reviews::create_review(conn, &actor, id, &req)).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

// GET /api/homestays/:id/reviews
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<HomestayReviews>> {
    let reviews = with_conn(&state, move |conn| reviews::list_reviews(conn, id, pagination)).await?;
    Ok(Json(reviews))
}

// GET /api/homestays/stats
pub async fn host_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<HomestayStats>> {
    let actor = require_actor(&headers)?;
    let stats = with_conn(&state, move |conn| homestays::host_stats(conn, &actor)).await?;
    Ok(Json(stats))
}

// GET /api/homestays/:id/stats
pub async fn homestay_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<HomestayStats>> {
    let actor = require_actor(&headers)?;
    let stats = with_conn(&state, move |conn| homestays::homestay_stats(conn, &actor, id)).await?;
    Ok(Json(stats))
}

#[derive(Deserialize)]
pub struct RoomStatsQuery {
    pub date: Option<NaiveDate>,
}

// GET /api/homestays/:id/rooms/stats?date=
pub async fn room_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(query): Query<RoomStatsQuery>,
) -> AppResult<Json<RoomStats>> {
    let actor = require_actor(&headers)?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let stats = with_conn(&state, move |conn| rooms::room_stats(conn, &actor, id, date)).await?;
    Ok(Json(stats))
}
