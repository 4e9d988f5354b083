pub mod batch;
pub mod closest;
pub mod info;
pub mod list;
pub mod path;

use anyhow::{Context, Result};
use mmnav::{Pathfinder, PathfinderBuilder, WorldPoint};
use serde::Serialize;
use std::path::PathBuf;

const DATA_DIR_HINT: &str =
    "MMNAV_DATA_DIR environment variable not set. Use --data-dir or set MMNAV_DATA_DIR";

/// Point as printed in JSON output.
#[derive(Debug, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<WorldPoint> for Point {
    fn from(p: WorldPoint) -> Self {
        Point {
            x: p.x,
            y: p.y,
            z: p.z,
        }
    }
}

/// Parse `x,y,z` into a caller-frame point.
pub fn parse_point(s: &str) -> Result<WorldPoint, String> {
    let parts: Vec<f32> = s
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid coordinate in '{}': {}", s, e))?;

    match parts[..] {
        [x, y, z] if x.is_finite() && y.is_finite() && z.is_finite() => {
            Ok(WorldPoint::new(x, y, z))
        }
        [_, _, _] => Err(format!("coordinates must be finite: '{}'", s)),
        _ => Err(format!("expected x,y,z but got '{}'", s)),
    }
}

pub fn data_dir(data_dir: Option<PathBuf>) -> Result<PathBuf> {
    match data_dir {
        Some(dir) => Ok(dir),
        None => {
            let dir = std::env::var("MMNAV_DATA_DIR").context(DATA_DIR_HINT)?;
            Ok(PathBuf::from(dir))
        }
    }
}

/// Load the map and build a pathfinder for it.
pub fn load(data_dir: Option<PathBuf>, map_id: u32, extent: f32) -> Result<Pathfinder> {
    let builder = match data_dir {
        Some(dir) => PathfinderBuilder::new(dir),
        None => PathfinderBuilder::from_env().context(DATA_DIR_HINT)?,
    };

    builder
        .map_id(map_id)
        .search_extent([extent; 3])
        .build()
        .with_context(|| format!("Failed to load map {}", map_id))
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        let p = parse_point("-8949.95, -132.49,83.53").unwrap();
        assert_eq!(p, WorldPoint::new(-8949.95, -132.49, 83.53));
    }

    #[test]
    fn test_parse_point_rejects_bad_input() {
        assert!(parse_point("1,2").is_err());
        assert!(parse_point("1,2,3,4").is_err());
        assert!(parse_point("1,x,3").is_err());
        assert!(parse_point("1,inf,3").is_err());
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
