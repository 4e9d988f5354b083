use anyhow::{Context, Result};
use mmnav::filename::params_filename;
use mmnav::loader::scan_tiles;
use mmnav::{TileFile, TileFormat};
use std::fs;
use std::path::PathBuf;

use super::format_size;

pub fn run(data_dir: Option<PathBuf>, map_id: u32) -> Result<()> {
    let dir = super::data_dir(data_dir)?;

    if !dir.exists() {
        anyhow::bail!("Data directory does not exist: {}", dir.display());
    }

    let params_path = dir.join(params_filename(map_id));
    let tiles = scan_tiles(&dir, map_id).context("Failed to read data directory")?;

    if tiles.is_empty() {
        println!("No tiles for map {} found in: {}", map_id, dir.display());
        return Ok(());
    }

    let format = TileFormat::default();
    let mut liquid_count = 0;
    let mut invalid_count = 0;
    let mut total_size: u64 = 0;

    println!("{:<18} {:>4} {:>4} {:>12} {:>8}", "TILE", "GX", "GY", "SIZE", "LIQUIDS");
    println!("{}", "-".repeat(50));

    for entry in &tiles {
        let size = fs::metadata(&entry.path).map(|m| m.len()).unwrap_or(0);
        total_size += size;

        let liquids = match TileFile::open(&entry.path, &format) {
            Ok(tile) if tile.header().uses_liquids => {
                liquid_count += 1;
                "yes"
            }
            Ok(_) => "no",
            Err(_) => {
                invalid_count += 1;
                "invalid"
            }
        };

        let name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "{:<18} {:>4} {:>4} {:>12} {:>8}",
            name,
            entry.gx,
            entry.gy,
            format_size(size),
            liquids
        );
    }

    // Summary
    println!();
    println!("Summary:");
    println!("  Map: {}", map_id);
    println!(
        "  Parameters file: {}",
        if params_path.exists() { "present" } else { "missing" }
    );
    println!("  Total tiles: {}", tiles.len());
    if liquid_count > 0 {
        println!("  With liquids: {}", liquid_count);
    }
    if invalid_count > 0 {
        println!("  Invalid: {}", invalid_count);
    }
    println!("  Total size: {}", format_size(total_size));
    println!("  Data directory: {}", dir.display());

    Ok(())
}
