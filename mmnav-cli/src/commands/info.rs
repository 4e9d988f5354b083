use anyhow::{bail, Context, Result};
use mmnav::filename::{filename_to_grid, tile_filename};
use mmnav::navmesh::MeshData;
use mmnav::{TileFile, TileFormat};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::format_size;

pub fn run(
    data_dir: Option<PathBuf>,
    map_id: u32,
    tile: Option<PathBuf>,
    grid: Option<(u32, u32)>,
) -> Result<()> {
    let tile_path = match (tile, grid) {
        (Some(path), _) => path,
        (None, Some((gx, gy))) => super::data_dir(data_dir)?.join(tile_filename(map_id, gx, gy)),
        (None, None) => bail!("Specify a tile file or --gx/--gy"),
    };

    if !tile_path.exists() {
        bail!("Tile not found: {}", tile_path.display());
    }

    let tile = TileFile::open(&tile_path, &TileFormat::default())
        .with_context(|| format!("Failed to load tile {}", tile_path.display()))?;
    let mesh = MeshData::from_bytes(tile.payload()).context("Failed to decode tile data")?;
    let header = tile.header();

    let file_size = std::fs::metadata(&tile_path)?.len();
    let filename = tile_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    println!("Tile: {}", filename);
    println!("Path: {}", tile_path.display());
    if let Some((map, gx, gy)) = filename_to_grid(&filename) {
        println!("Map: {}, grid ({}, {})", map, gx, gy);
    }
    println!();
    println!("Navmesh version: {}", header.dt_version);
    println!("Generator version: {}", header.mmap_version);
    println!("Liquids: {}", if header.uses_liquids { "yes" } else { "no" });
    println!("Payload: {}", format_size(header.size as u64));
    println!("File size: {}", format_size(file_size));
    println!();
    println!("Location: ({}, {}) layer {}", mesh.x, mesh.y, mesh.layer);
    println!("Polygons: {}", mesh.polys.len());
    println!("Vertices: {}", mesh.verts.len());
    println!(
        "Bounds: [{:.2}, {:.2}, {:.2}] - [{:.2}, {:.2}, {:.2}]",
        mesh.bmin[0], mesh.bmin[1], mesh.bmin[2], mesh.bmax[0], mesh.bmax[1], mesh.bmax[2]
    );
    println!(
        "Walkable: height {:.2}, radius {:.2}, climb {:.2}",
        mesh.walkable_height, mesh.walkable_radius, mesh.walkable_climb
    );

    let mut areas: BTreeMap<u8, usize> = BTreeMap::new();
    let mut flags: BTreeMap<u16, usize> = BTreeMap::new();
    for poly in &mesh.polys {
        *areas.entry(poly.area).or_default() += 1;
        *flags.entry(poly.flags).or_default() += 1;
    }

    if !areas.is_empty() {
        println!();
        println!("Polygons by area:");
        for (area, count) in &areas {
            println!("  {:>3}: {}", area, count);
        }
        println!("Polygons by flags:");
        for (f, count) in &flags {
            println!("  {:#06x}: {}", f, count);
        }
    }

    Ok(())
}
