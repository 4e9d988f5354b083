//! Basic example demonstrating mmnav library usage.
//!
//! Run with: cargo run --example basic -- /path/to/mmaps [map_id]

use mmnav::{NavError, PathfinderBuilder, WorldPoint};
use std::env;

fn main() -> Result<(), NavError> {
    let data_dir = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --example basic -- /path/to/mmaps [map_id]");
        std::process::exit(1);
    });
    let map_id = env::args()
        .nth(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let pathfinder = PathfinderBuilder::new(&data_dir).map_id(map_id).build()?;

    let stats = pathfinder.load_stats();
    println!("Loaded map {}:", map_id);
    println!("  Tiles: {} ({} with liquids)", stats.tiles_loaded, stats.liquid_tiles);
    println!("  Polygons: {}", stats.polygons);
    println!("  Load time: {}ms", stats.elapsed_ms);

    let start = WorldPoint::new(-8949.95, -132.49, 83.53);
    let end = WorldPoint::new(-8913.23, -136.11, 81.79);

    println!("\nSnapping endpoints:");
    for (name, p) in [("start", start), ("end", end)] {
        match pathfinder.closest_point(p.to_nav())? {
            Some(snapped) => println!("  {}: {:?}", name, snapped.to_world()),
            None => println!("  {}: no walkable surface nearby", name),
        }
    }

    let path = pathfinder.find_path(start.to_nav(), end.to_nav())?;
    println!("\nPath ({} points):", path.len());
    println!("{:-<50}", "");
    for p in path {
        let w = p.to_world();
        println!("  {:>10.2} {:>10.2} {:>8.2}", w.x, w.y, w.z);
    }

    Ok(())
}
