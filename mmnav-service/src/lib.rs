//! mmnav Service Library
//!
//! HTTP handlers, types and router for the navmesh path service.
//! This library is used by both the mmnav-service binary and integration tests.

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use mmnav::Pathfinder;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across handlers.
pub struct AppState {
    /// Loaded map and query settings.
    pub pathfinder: Pathfinder,
}

// Re-export commonly used types for convenience
pub use handlers::{ErrorResponse, HealthResponse, PathRequest, StatsResponse, Vector3};

/// OpenAPI documentation for the mmnav service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "mmnav Path Service",
        version = "0.1.0",
        description = "Walkable path and surface snapping queries over a tiled navigation mesh.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        handlers::post_path,
        handlers::post_closest,
        handlers::health_check,
        handlers::get_stats,
    ),
    components(
        schemas(
            handlers::Vector3,
            handlers::PathRequest,
            handlers::ErrorResponse,
            handlers::HealthResponse,
            handlers::StatsResponse,
        )
    ),
    tags(
        (name = "navigation", description = "Path and surface query endpoints"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;

/// Build the service router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/path", post(handlers::post_path))
        .route("/closest", post(handlers::post_closest))
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
