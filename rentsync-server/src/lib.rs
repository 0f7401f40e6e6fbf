//! HTTP surface for rentsync.
//!
//! Scheduler-facing endpoints (`/subscriptions/*`, `/ical/sync`) and public
//! token-based reads (`/ical/feed`, `/calendar/shared`).

pub mod routes;
pub mod state;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::subscriptions::router())
        .merge(routes::ical::router())
        .merge(routes::shared::router())
        .route("/health", get(routes::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
