//! Whole-map loading.
//!
//! A map is one parameters file (`{map:03}.mmap`) plus any number of tile
//! files (`{map:03}{gx:02}{gy:02}.mmtile`) on a square grid. Missing tiles are
//! normal; a tile that is present but unusable fails the whole load.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::{NavError, Result};
use crate::filename::{filename_to_grid, params_filename, tile_filename};
use crate::navmesh::{NavMesh, NavMeshParams, TileRef};
use crate::tile::{TileFile, TileFormat};

/// Default extent of the tile grid along each axis.
pub const DEFAULT_GRID_SIZE: u32 = 64;

/// Settings for [`load_map`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Grid coordinates `1..grid_size` are tried on both axes.
    pub grid_size: u32,
    /// Header values every tile must carry.
    pub format: TileFormat,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            format: TileFormat::default(),
        }
    }
}

/// Statistics from a map load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Number of tiles attached to the mesh.
    pub tiles_loaded: u64,
    /// Number of attached tiles generated with liquid surfaces.
    pub liquid_tiles: u64,
    /// Total polygons across attached tiles.
    pub polygons: u64,
    /// Total elapsed time in milliseconds.
    pub elapsed_ms: u64,
}

/// A fully loaded map.
#[derive(Debug)]
pub struct LoadedMap {
    pub map_id: u32,
    pub mesh: NavMesh,
    pub stats: LoadStats,
}

/// Load the parameters and every tile of `map_id` found under `base`.
///
/// # Example
///
/// ```ignore
/// use mmnav::loader::{load_map, LoaderConfig};
///
/// let map = load_map("mmaps", 0, &LoaderConfig::default())?;
/// println!("{} tiles in {}ms", map.stats.tiles_loaded, map.stats.elapsed_ms);
/// ```
///
/// # Errors
///
/// - [`NavError::ParamsNotFound`] / [`NavError::ShortRead`] for the parameters file
/// - [`NavError::InvalidParams`] if the mesh rejects the parameters
/// - [`NavError::TileAttach`] naming the first tile file that failed
pub fn load_map<P: AsRef<Path>>(base: P, map_id: u32, config: &LoaderConfig) -> Result<LoadedMap> {
    let start = Instant::now();
    let base = base.as_ref();

    let params = NavMeshParams::from_file(base.join(params_filename(map_id)))?;
    let mut mesh = NavMesh::new(params)?;
    let mut stats = LoadStats::default();

    for gx in 1..config.grid_size {
        for gy in 1..config.grid_size {
            let path = base.join(tile_filename(map_id, gx, gy));

            let tile = match TileFile::open(&path, &config.format) {
                Ok(tile) => tile,
                Err(NavError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(attach_error(path, e)),
            };

            if let Err(e) = mesh.add_tile(tile.payload(), TileRef::NULL) {
                return Err(attach_error(path, e));
            }

            stats.tiles_loaded += 1;
            if tile.header().uses_liquids {
                stats.liquid_tiles += 1;
            }
        }
    }

    stats.polygons = mesh.poly_count() as u64;
    stats.elapsed_ms = start.elapsed().as_millis() as u64;

    Ok(LoadedMap { map_id, mesh, stats })
}

fn attach_error(path: PathBuf, source: NavError) -> NavError {
    NavError::TileAttach {
        path,
        source: Box::new(source),
    }
}

/// A tile file found by [`scan_tiles`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileEntry {
    pub gx: u32,
    pub gy: u32,
    pub path: PathBuf,
}

/// List the tile files of `map_id` in `base`, sorted by grid coordinate.
pub fn scan_tiles<P: AsRef<Path>>(base: P, map_id: u32) -> Result<Vec<TileEntry>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(base.as_ref())? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(crate::filename::TILE_EXTENSION) {
            continue;
        }
        if let Some((id, gx, gy)) = filename_to_grid(name) {
            if id == map_id {
                entries.push(TileEntry { gx, gy, path });
            }
        }
    }
    entries.sort_by_key(|e| (e.gx, e.gy));
    Ok(entries)
}
