//! Gazette HTTP gateway.
//!
//! Exposes the reader selector as a small read-only API: the rolling
//! `/today` edition, per-day editions, and slug-pinned lookups. CORS is
//! open — the front page is public.

pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the complete axum router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/today", get(routes::edition::today))
        .route("/{day}", get(routes::edition::day))
        .route("/{day}/{slug}", get(routes::edition::day_with_slug))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
