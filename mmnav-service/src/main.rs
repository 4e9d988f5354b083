//! mmnav Service - HTTP microservice for navmesh path queries.
//!
//! Loads one map at startup and serves path and surface queries over it.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `MMNAV_DATA_DIR` | Directory containing `.mmap`/`.mmtile` files | `mmaps` |
//! | `MMNAV_MAP_ID` | Map to load | 0 |
//! | `MMNAV_GRID_SIZE` | Tile grid extent | 64 |
//! | `MMNAV_MAX_PATH` | Path capacity | 256 |
//! | `MMNAV_MAX_NODES` | Corridor search node budget | 65535 |
//! | `MMNAV_SEARCH_EXTENT` | Snap half-extent per axis | 6 |
//! | `MMNAV_INCLUDE_FLAGS` | Polygon include mask | 5 |
//! | `MMNAV_EXCLUDE_FLAGS` | Polygon exclude mask | 10 |
//! | `MMNAV_PORT` | HTTP server port | 8080 |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `POST /path` - Waypoints between `start` and `end`
//! - `POST /closest` - Snap a list of points to the mesh
//! - `GET /health` - Health check
//! - `GET /stats` - Loaded map statistics
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;

use mmnav::PathfinderBuilder;
use mmnav_service::{router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DATA_DIR: &str = "mmaps";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mmnav_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port: u16 = std::env::var("MMNAV_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    // The library reads the MMNAV_* query and loader settings.
    let builder = match PathfinderBuilder::from_env() {
        Ok(builder) => builder,
        Err(_) => {
            tracing::warn!(
                data_dir = DEFAULT_DATA_DIR,
                "MMNAV_DATA_DIR not set, using default directory"
            );
            PathfinderBuilder::new(DEFAULT_DATA_DIR)
        }
    };

    tracing::info!(
        data_dir = %builder.data_dir_path().display(),
        map_id = builder.map(),
        port = port,
        "Loading map"
    );

    let pathfinder = match builder.build() {
        Ok(pathfinder) => pathfinder,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load map");
            std::process::exit(1);
        }
    };

    let stats = pathfinder.load_stats();
    tracing::info!(
        map_id = pathfinder.map_id(),
        tiles_loaded = stats.tiles_loaded,
        liquid_tiles = stats.liquid_tiles,
        polygons = stats.polygons,
        elapsed_ms = stats.elapsed_ms,
        "Map loaded"
    );
    tracing::info!(
        max_path = pathfinder.max_path(),
        max_nodes = pathfinder.max_nodes(),
        search_extent = ?pathfinder.search_extent(),
        include_flags = pathfinder.filter().include_flags(),
        exclude_flags = pathfinder.filter().exclude_flags(),
        "Query settings"
    );

    let state = Arc::new(AppState { pathfinder });
    let app = router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
