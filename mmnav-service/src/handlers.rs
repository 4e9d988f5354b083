//! HTTP request handlers for the path service.
//!
//! Request and response points use the caller frame (`z` up); conversion to
//! mesh order happens here and nowhere else in the service.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mmnav::WorldPoint;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use tokio::task;
use utoipa::ToSchema;

use crate::AppState;

/// A point in caller coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    /// Up axis.
    pub z: f32,
}

impl Vector3 {
    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<Vector3> for WorldPoint {
    fn from(v: Vector3) -> Self {
        WorldPoint::new(v.x, v.y, v.z)
    }
}

impl From<WorldPoint> for Vector3 {
    fn from(p: WorldPoint) -> Self {
        Vector3 {
            x: p.x,
            y: p.y,
            z: p.z,
        }
    }
}

/// Body of `POST /path`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PathRequest {
    pub start: Vector3,
    pub end: Vector3,
}

/// Error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Loaded map statistics.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Map being served.
    pub map_id: u32,
    /// Tiles attached at startup.
    pub tiles_loaded: u64,
    /// Attached tiles generated with liquid surfaces.
    pub liquid_tiles: u64,
    /// Polygons across all tiles.
    pub polygons: u64,
    /// Time spent loading, in milliseconds.
    pub load_time_ms: u64,
}

fn bad_request(rejection: JsonRejection) -> Response {
    tracing::warn!(error = %rejection.body_text(), "Rejected malformed request");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: rejection.body_text(),
        }),
    )
        .into_response()
}

fn non_finite() -> Response {
    tracing::warn!("Rejected request with non-finite coordinates");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "coordinates must be finite numbers".to_string(),
        }),
    )
        .into_response()
}

/// A failed query, or a query task that panicked.
fn engine_error(e: impl Display) -> Response {
    tracing::warn!(error = %e, "Query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// Find a walkable path between two points.
///
/// Returns the waypoints from start to end, or an empty array when either
/// point is off the mesh or no path exists.
#[utoipa::path(
    post,
    path = "/path",
    tag = "navigation",
    request_body = PathRequest,
    responses(
        (status = 200, description = "Waypoints, possibly empty", body = Vec<Vector3>),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 500, description = "Query failed", body = ErrorResponse),
    )
)]
pub async fn post_path(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PathRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_request(rejection),
    };
    if !request.start.is_finite() || !request.end.is_finite() {
        return non_finite();
    }

    tracing::debug!(start = ?request.start, end = ?request.end, "Path query");

    let start = WorldPoint::from(request.start).to_nav();
    let end = WorldPoint::from(request.end).to_nav();

    let worker = Arc::clone(&state);
    let outcome = task::spawn_blocking(move || worker.pathfinder.resolve_path(start, end)).await;

    match outcome {
        Ok(Ok(resolved)) => {
            if resolved.partial {
                tracing::warn!(
                    start = ?request.start,
                    end = ?request.end,
                    out_of_nodes = resolved.out_of_nodes,
                    "Goal not reached, returning partial path"
                );
            }
            if resolved.truncated {
                tracing::debug!(max_path = state.pathfinder.max_path(), "Path truncated");
            }

            let points: Vec<Vector3> = resolved
                .points
                .into_iter()
                .map(|p| p.to_world().into())
                .collect();
            tracing::debug!(points = points.len(), "Path found");
            (StatusCode::OK, Json(points)).into_response()
        }
        Ok(Err(e)) => engine_error(e),
        Err(e) => engine_error(e),
    }
}

/// Snap each point to the nearest walkable surface.
///
/// The response has one entry per input point, in order; points with no
/// surface within the search extent map to `null`.
#[utoipa::path(
    post,
    path = "/closest",
    tag = "navigation",
    request_body = Vec<Vector3>,
    responses(
        (status = 200, description = "Snapped points; null where unresolved", body = Vec<Option<Vector3>>),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 500, description = "Query failed", body = ErrorResponse),
    )
)]
pub async fn post_closest(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Vec<Vector3>>, JsonRejection>,
) -> Response {
    let points = match payload {
        Ok(Json(points)) => points,
        Err(rejection) => return bad_request(rejection),
    };
    if !points.iter().all(Vector3::is_finite) {
        return non_finite();
    }

    tracing::debug!(count = points.len(), "Closest point query");

    let nav: Vec<_> = points
        .iter()
        .map(|&p| WorldPoint::from(p).to_nav())
        .collect();

    let outcome = task::spawn_blocking(move || state.pathfinder.closest_points(&nav)).await;

    match outcome {
        Ok(Ok(snapped)) => {
            let body: Vec<Option<Vector3>> = snapped
                .into_iter()
                .map(|p| p.map(|p| p.to_world().into()))
                .collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(e)) => engine_error(e),
        Err(e) => engine_error(e),
    }
}

/// Health check endpoint.
///
/// Returns service status and version.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get statistics for the loaded map.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "system",
    responses((status = 200, description = "Map statistics", body = StatsResponse))
)]
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let stats = state.pathfinder.load_stats();

    Json(StatsResponse {
        map_id: state.pathfinder.map_id(),
        tiles_loaded: stats.tiles_loaded,
        liquid_tiles: stats.liquid_tiles,
        polygons: stats.polygons,
        load_time_ms: stats.elapsed_ms,
    })
}
