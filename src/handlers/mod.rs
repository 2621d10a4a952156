pub mod availability;
pub mod bookings;
pub mod health;
pub mod homestays;
pub mod rooms;
pub mod users;

use std::sync::Arc;

use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::Router;
use rusqlite::Connection;

use crate::db;
use crate::errors::{AppError, AppResult};
use crate::models::{Actor, Role};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/bookings", post(bookings::create_booking).get(bookings::list_bookings))
        .route("/api/guest/bookings", post(bookings::create_guest_booking))
        .route("/api/bookings/:id", get(bookings::get_booking))
        .route("/api/bookings/:id/status", put(bookings::update_status))
        .route("/api/bookings/:id/payments", post(bookings::create_payment))
        .route(
            "/api/rooms/:id/availability",
            get(availability::get_calendar).put(availability::set_override),
        )
        .route("/api/rooms/:id/availability/check", get(availability::check_range))
        .route("/api/rooms/:id/availability/bulk", post(availability::bulk_update))
        .route(
            "/api/homestays",
            post(homestays::create_homestay).get(homestays::search_homestays),
        )
        .route(
            "/api/homestays/:id",
            get(homestays::get_homestay)
                .put(homestays::update_homestay)
                .delete(homestays::delete_homestay),
        )
        .route("/api/homestays/stats", get(homestays::host_stats))
        .route("/api/homestays/:id/stats", get(homestays::homestay_stats))
        .route("/api/homestays/:id/rooms/stats", get(homestays::room_stats))
        .route(
            "/api/homestays/:id/reviews",
            post(homestays::create_review).get(homestays::list_reviews),
        )
        .route("/api/rooms", post(rooms::create_room).get(rooms::search_rooms))
        .route(
            "/api/rooms/:id",
            get(rooms::get_room)
                .put(rooms::update_room)
                .delete(rooms::delete_room),
        )
        .route("/api/users", post(users::create_user).get(users::find_user))
        .route("/api/users/:id", get(users::get_user))
        .with_state(state)
}

/// Identity forwarded by the gateway in `x-user-id` / `x-user-role`.
/// Both headers absent means an anonymous caller; anything malformed is
/// rejected.
pub fn actor_from_headers(headers: &HeaderMap) -> AppResult<Option<Actor>> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    match (header("x-user-id"), header("x-user-role")) {
        (None, None) => Ok(None),
        (Some(id), Some(role)) => {
            let user_id = id.trim().parse().map_err(|_| AppError::Unauthorized)?;
            let role = Role::parse(role.trim()).ok_or(AppError::Unauthorized)?;
            Ok(Some(Actor { user_id, role }))
        }
        _ => Err(AppError::Unauthorized),
    }
}

pub fn require_actor(headers: &HeaderMap) -> AppResult<Actor> {
    actor_from_headers(headers)?.ok_or(AppError::Unauthorized)
}

/// Runs store work off the async executor. The task runs to completion even
/// if the client goes away.
pub async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("blocking task failed: {e}")))?
}

pub async fn with_conn<T, F>(state: &Arc<AppState>, f: F) -> AppResult<T>
where
    F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    blocking(move || {
        let conn = db::lock(&state.db)?;
        f(&conn)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_anonymous_without_headers() {
        assert_eq!(actor_from_headers(&HeaderMap::new()).unwrap(), None);
        assert!(matches!(require_actor(&HeaderMap::new()), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_actor_parsed() {
        let actor = require_actor(&headers(&[("x-user-id", "7"), ("x-user-role", "host")])).unwrap();
        assert_eq!(actor, Actor { user_id: 7, role: Role::Host });
    }

    #[test]
    fn test_malformed_identity_rejected() {
        for pairs in [
            vec![("x-user-id", "7")],
            vec![("x-user-id", "seven"), ("x-user-role", "host")],
            vec![("x-user-id", "7"), ("x-user-role", "owner")],
        ] {
            assert!(matches!(actor_from_headers(&headers(&pairs)), Err(AppError::Unauthorized)));
        }
    }
}
