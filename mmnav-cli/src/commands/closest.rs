use anyhow::{Context, Result};
use mmnav::WorldPoint;
use serde::Serialize;
use std::path::PathBuf;

use super::Point;

#[derive(Serialize)]
struct ClosestResponse {
    point: Point,
    closest: Option<Point>,
}

pub fn run(
    data_dir: Option<PathBuf>,
    map_id: u32,
    extent: f32,
    point: WorldPoint,
    json: bool,
) -> Result<()> {
    let pathfinder = super::load(data_dir, map_id, extent)?;

    let closest = pathfinder
        .closest_point(point.to_nav())
        .context("Failed to query surface")?
        .map(|p| p.to_world());

    if json {
        let response = ClosestResponse {
            point: point.into(),
            closest: closest.map(Point::from),
        };
        println!("{}", serde_json::to_string(&response)?);
    } else if let Some(p) = closest {
        println!("{:.3} {:.3} {:.3}", p.x, p.y, p.z);
    } else {
        println!("void");
    }

    Ok(())
}
