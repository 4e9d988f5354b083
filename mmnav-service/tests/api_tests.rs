//! Integration tests for the HTTP API.

use axum::{body::Bytes, http::StatusCode};
use axum_test::TestServer;
use mmnav::filename::{params_filename, tile_filename};
use mmnav::navmesh::{MeshData, NavMeshParams, PolyData, EXT_LINK};
use mmnav::{PathfinderBuilder, TileHeader};
use mmnav_service::{router, AppState};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const TILE_SIZE: f32 = 10.0;

/// One flat 10x10 quad at mesh tile `(tx, 0)`, open towards its east and
/// west neighbours.
fn quad_tile(tx: i32) -> MeshData {
    let x0 = tx as f32 * TILE_SIZE;
    let x1 = x0 + TILE_SIZE;
    // edge order: -x, +z, +x, -z
    let neis = [EXT_LINK | 4, 0, EXT_LINK, 0];

    MeshData {
        x: tx,
        y: 0,
        layer: 0,
        user_id: 0,
        walkable_height: 2.0,
        walkable_radius: 0.5,
        walkable_climb: 1.0,
        bmin: [x0, -1.0, 0.0],
        bmax: [x1, 1.0, TILE_SIZE],
        verts: vec![
            [x0, 0.0, 0.0],
            [x0, 0.0, TILE_SIZE],
            [x1, 0.0, TILE_SIZE],
            [x1, 0.0, 0.0],
        ],
        polys: vec![PolyData::ground(&[0, 1, 2, 3], &neis, 1, 0)],
    }
}

/// Write map 0 with two adjacent tiles. In caller coordinates the walkable
/// strip spans `x` 0..10, `y` 0..20 at `z` = 0.
fn create_test_map(dir: &Path) {
    let params = NavMeshParams {
        origin: [0.0, 0.0, 0.0],
        tile_width: TILE_SIZE,
        tile_height: TILE_SIZE,
        max_tiles: 64,
        max_polys: 16,
    };
    let mut buf = Vec::new();
    params.write_to(&mut buf).unwrap();
    fs::write(dir.join(params_filename(0)), buf).unwrap();

    for (gx, tx) in [(1, 0), (2, 1)] {
        let payload = quad_tile(tx).to_bytes();
        let mut buf = Vec::new();
        TileHeader::new(payload.len() as u32, 15, gx == 2)
            .write_to(&mut buf)
            .unwrap();
        buf.extend_from_slice(&payload);
        fs::write(dir.join(tile_filename(0, gx, 1)), buf).unwrap();
    }
}

/// Create a test server over the two-tile map.
fn create_test_server(temp_dir: &TempDir) -> TestServer {
    create_test_map(temp_dir.path());
    let pathfinder = PathfinderBuilder::new(temp_dir.path()).build().unwrap();
    let state = Arc::new(AppState { pathfinder });

    TestServer::new(router(state)).unwrap()
}

fn assert_point(value: &Value, x: f64, y: f64, z: f64) {
    let close = |key: &str, expected: f64| {
        let actual = value[key].as_f64().unwrap();
        assert!(
            (actual - expected).abs() < 1e-3,
            "{} = {}, expected {}",
            key,
            actual,
            expected
        );
    };
    close("x", x);
    close("y", y);
    close("z", z);
}

#[tokio::test]
async fn test_path_endpoint_success() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .post("/path")
        .json(&json!({
            "start": {"x": 5.0, "y": 2.0, "z": 0.0},
            "end": {"x": 5.0, "y": 18.0, "z": 0.0}
        }))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    let points = json.as_array().unwrap();
    assert!(points.len() >= 2);
    assert_point(&points[0], 5.0, 2.0, 0.0);
    assert_point(points.last().unwrap(), 5.0, 18.0, 0.0);
}

#[tokio::test]
async fn test_path_endpoint_keeps_requested_endpoints() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    // Endpoints hover above the surface; they are still found and kept.
    let response = server
        .post("/path")
        .json(&json!({
            "start": {"x": 3.0, "y": 4.0, "z": 2.5},
            "end": {"x": 7.0, "y": 16.0, "z": 2.5}
        }))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    let points = json.as_array().unwrap();
    assert!(points.len() >= 2);
    assert_point(&points[0], 3.0, 4.0, 2.5);
    assert_point(points.last().unwrap(), 7.0, 16.0, 2.5);
}

#[tokio::test]
async fn test_concurrent_requests() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let path = server.post("/path").json(&json!({
        "start": {"x": 5.0, "y": 2.0, "z": 0.0},
        "end": {"x": 5.0, "y": 18.0, "z": 0.0}
    }));
    let closest = server
        .post("/closest")
        .json(&json!([{"x": 5.0, "y": 2.0, "z": 1.0}]));
    let health = server.get("/health");

    let (path, closest, health) = tokio::join!(path, closest, health);

    path.assert_status_ok();
    closest.assert_status_ok();
    health.assert_status_ok();
    let points: Value = path.json();
    assert!(points.as_array().unwrap().len() >= 2);
    let snapped: Value = closest.json();
    assert_point(&snapped[0], 5.0, 2.0, 0.0);
}

#[tokio::test]
async fn test_path_endpoint_off_mesh() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .post("/path")
        .json(&json!({
            "start": {"x": 5.0, "y": 2.0, "z": 0.0},
            "end": {"x": 500.0, "y": 500.0, "z": 0.0}
        }))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn test_path_endpoint_malformed_json() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .post("/path")
        .bytes(Bytes::from_static(b"{\"start\": {\"x\": 1"))
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let json: Value = response.json();
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_path_endpoint_missing_fields() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    // Missing end
    let response = server
        .post("/path")
        .json(&json!({"start": {"x": 5.0, "y": 2.0, "z": 0.0}}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Wrong type
    let response = server
        .post("/path")
        .json(&json!({"start": "here", "end": "there"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Not JSON at all
    let response = server.post("/path").text("start=1,2,3").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let json: Value = response.json();
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_path_endpoint_non_finite() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    // Overflows f32
    let response = server
        .post("/path")
        .json(&json!({
            "start": {"x": 1e300, "y": 2.0, "z": 0.0},
            "end": {"x": 5.0, "y": 18.0, "z": 0.0}
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_closest_endpoint_empty() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.post("/closest").json(&json!([])).await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn test_closest_endpoint_single() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .post("/closest")
        .json(&json!([{"x": 4.0, "y": 12.0, "z": 3.0}]))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    let points = json.as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_point(&points[0], 4.0, 12.0, 0.0);
}

#[tokio::test]
async fn test_closest_endpoint_preserves_order_with_nulls() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .post("/closest")
        .json(&json!([
            {"x": 5.0, "y": 5.0, "z": 0.0},
            {"x": 500.0, "y": 500.0, "z": 0.0},
            {"x": 5.0, "y": 15.0, "z": 1.0}
        ]))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    let points = json.as_array().unwrap();
    assert_eq!(points.len(), 3);
    assert_point(&points[0], 5.0, 5.0, 0.0);
    assert!(points[1].is_null());
    assert_point(&points[2], 5.0, 15.0, 0.0);
}

#[tokio::test]
async fn test_closest_endpoint_malformed() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .post("/closest")
        .json(&json!({"x": 5.0, "y": 5.0, "z": 0.0}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let json: Value = response.json();
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_health_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.get("/health").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].as_str().is_some());
}

#[tokio::test]
async fn test_stats_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.get("/stats").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["map_id"], 0);
    assert_eq!(json["tiles_loaded"], 2);
    assert_eq!(json["liquid_tiles"], 1);
    assert_eq!(json["polygons"], 2);
    assert!(json["load_time_ms"].as_u64().is_some());
}

#[tokio::test]
async fn test_openapi_document() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.get("/api-docs/openapi.json").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert!(json["paths"]["/path"].is_object());
    assert!(json["paths"]["/closest"].is_object());
}
