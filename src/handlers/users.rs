use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::errors::{AppError, AppResult};
use crate::handlers::with_conn;
use crate::models::{CreateUserRequest, User};
use crate::services::users;
use crate::state::AppState;

// POST /api/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = with_conn(&state, move |conn| users::create_user(conn, &req)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

// GET /api/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Json<User>> {
    let user = with_conn(&state, move |conn| users::get_user(conn, id)).await?;
    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct UserQuery {
    pub email: Option<String>,
}

// GET /api/users?email=
pub async fn find_user(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<User>> {
    let email = query
        .email
        .ok_or_else(|| AppError::validation("email query parameter is required"))?;
    let user = with_conn(&state, move |conn| users::get_user_by_email(conn, &email)).await?;
    Ok(Json(user))
}
