//! Movement-map filename utilities.
//!
//! This module provides functions for converting between map ids, tile grid
//! coordinates and on-disk movement-map filenames.
//!
//! # Filename Format
//!
//! - Parameters file: `{map:03}.mmap` (e.g., `000.mmap`)
//! - Tile file: `{map:03}{gx:02}{gy:02}.mmtile` (e.g., `0003248.mmtile`)
//!
//! Grid coordinates start at 1; `(0, 0)` is never populated.

/// Extension of the map-level parameters file.
pub const PARAMS_EXTENSION: &str = "mmap";

/// Extension of per-tile files.
pub const TILE_EXTENSION: &str = "mmtile";

/// Build the parameters filename for a map.
///
/// # Examples
///
/// ```
/// use mmnav::filename::params_filename;
///
/// assert_eq!(params_filename(0), "000.mmap");
/// assert_eq!(params_filename(530), "530.mmap");
/// ```
pub fn params_filename(map_id: u32) -> String {
    format!("{:03}.{}", map_id, PARAMS_EXTENSION)
}

/// Build the tile filename for a map and grid coordinate.
///
/// # Examples
///
/// ```
/// use mmnav::filename::tile_filename;
///
/// assert_eq!(tile_filename(0, 32, 48), "0003248.mmtile");
/// assert_eq!(tile_filename(1, 1, 2), "0010102.mmtile");
/// ```
pub fn tile_filename(map_id: u32, gx: u32, gy: u32) -> String {
    format!("{:03}{:02}{:02}.{}", map_id, gx, gy, TILE_EXTENSION)
}

/// Parse a tile filename into `(map_id, gx, gy)`.
///
/// Accepts a bare name or a path, with or without the `.mmtile` extension.
///
/// # Examples
///
/// ```
/// use mmnav::filename::filename_to_grid;
///
/// assert_eq!(filename_to_grid("0003248.mmtile"), Some((0, 32, 48)));
/// assert_eq!(filename_to_grid("/data/mmaps/5300101.mmtile"), Some((530, 1, 1)));
/// assert_eq!(filename_to_grid("000.mmap"), None);
/// ```
pub fn filename_to_grid(filename: &str) -> Option<(u32, u32, u32)> {
    // Extract just the filename if a path is given
    let name = filename
        .rsplit('/')
        .next()
        .unwrap_or(filename)
        .rsplit('\\')
        .next()
        .unwrap_or(filename);

    let name = name
        .strip_suffix(TILE_EXTENSION)
        .and_then(|n| n.strip_suffix('.'))
        .unwrap_or(name);

    // Must be exactly 7 digits: MMMXXYY
    if name.len() != 7 || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let map_id = name[0..3].parse().ok()?;
    let gx = name[3..5].parse().ok()?;
    let gy = name[5..7].parse().ok()?;

    Some((map_id, gx, gy))
}
