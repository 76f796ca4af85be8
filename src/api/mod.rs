//! HTTP status API using Axum
//!
//! Read-mostly view of the engine for local tooling: published status,
//! activity log, a manual check trigger and the runtime toggles.

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::ApiState;

use axum::Router;
use tower_http::trace::TraceLayer;

/// Create the complete application router.
pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(routes::health_routes(state))
        .layer(TraceLayer::new_for_http())
}
