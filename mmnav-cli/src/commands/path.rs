use anyhow::{Context, Result};
use mmnav::WorldPoint;
use serde::Serialize;
use std::path::PathBuf;

use super::Point;

#[derive(Serialize)]
struct PathResponse {
    from: Point,
    to: Point,
    points: Vec<Point>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    partial: bool,
}

pub fn run(
    data_dir: Option<PathBuf>,
    map_id: u32,
    extent: f32,
    from: WorldPoint,
    to: WorldPoint,
    json: bool,
) -> Result<()> {
    let pathfinder = super::load(data_dir, map_id, extent)?;

    let resolved = pathfinder
        .resolve_path(from.to_nav(), to.to_nav())
        .context("Failed to find path")?;
    let points: Vec<WorldPoint> = resolved.points.iter().map(|p| p.to_world()).collect();

    if json {
        let response = PathResponse {
            from: from.into(),
            to: to.into(),
            points: points.into_iter().map(Point::from).collect(),
            partial: resolved.partial,
        };
        println!("{}", serde_json::to_string(&response)?);
        return Ok(());
    }

    if points.is_empty() {
        println!("no path");
        return Ok(());
    }

    for p in &points {
        println!("{:.3} {:.3} {:.3}", p.x, p.y, p.z);
    }
    if resolved.partial {
        eprintln!("warning: destination not reachable, path ends at the closest point");
    }
    if resolved.truncated {
        eprintln!(
            "warning: path truncated at {} points",
            pathfinder.max_path()
        );
    }

    Ok(())
}
