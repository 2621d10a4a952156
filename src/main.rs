use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use homestay_booking::config::AppConfig;
use homestay_booking::db;
use homestay_booking::handlers;
use homestay_booking::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    tracing::info!(
        database = %config.database_url,
        max_calendar_days = config.max_calendar_days,
        "database ready"
    );

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let cors = if config.cors_allow_origin == "*" {
        cors.allow_origin(Any)
    } else {
        let origin = HeaderValue::from_str(&config.cors_allow_origin)
            .context("CORS_ALLOW_ORIGIN is not a valid header value")?;
        cors.allow_origin(origin)
    };

    let state = Arc::new(AppState::new(conn, config.clone()));
    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
