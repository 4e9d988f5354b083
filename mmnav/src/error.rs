//! Error types for the mmnav library.

use std::path::PathBuf;
use thiserror::Error;

use crate::navmesh::PolyRef;

/// Errors that can occur when loading or querying movement maps.
#[derive(Error, Debug)]
pub enum NavError {
    /// IO error when reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The map-level parameters file is missing.
    #[error("Map parameters file not found: {path}")]
    ParamsNotFound { path: PathBuf },

    /// A file ended before a fixed-size record or payload was complete.
    #[error("Short read in {path}: expected {expected} bytes, got {actual}")]
    ShortRead {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    /// A header carried the wrong magic number.
    #[error("Wrong magic number: found {found:#010x}, expected {expected:#010x}")]
    WrongMagic { found: u32, expected: u32 },

    /// A header carried an unsupported format version.
    #[error("Wrong {what} version: found {found}, expected {expected}")]
    WrongVersion {
        what: &'static str,
        found: u32,
        expected: u32,
    },

    /// Navigation mesh parameters were rejected at initialization.
    #[error("Invalid navigation mesh parameters: {0}")]
    InvalidParams(String),

    /// Tile payload could not be decoded.
    #[error("Invalid tile data: {0}")]
    InvalidData(String),

    /// A tile already occupies the requested location or slot.
    #[error("Tile already exists at ({x}, {y}, layer {layer})")]
    TileAlreadyExists { x: i32, y: i32, layer: i32 },

    /// The mesh has no free tile slot left.
    #[error("Navigation mesh is full: at most {max} tiles")]
    TooManyTiles { max: usize },

    /// A polygon reference does not belong to this mesh.
    #[error("Invalid polygon reference: {0:?}")]
    InvalidPolyRef(PolyRef),

    /// A query was called with unusable arguments.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Attaching a tile file to the mesh failed.
    #[error("Failed to attach tile {path}: {source}")]
    TileAttach {
        path: PathBuf,
        #[source]
        source: Box<NavError>,
    },
}

/// Result type alias using [`NavError`].
pub type Result<T> = std::result::Result<T, NavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NavError::WrongMagic {
            found: 0xdeadbeef,
            expected: 0x4d4d4150,
        };
        assert!(err.to_string().contains("0xdeadbeef"));
        assert!(err.to_string().contains("0x4d4d4150"));

        let err = NavError::ShortRead {
            path: PathBuf::from("0000101.mmtile"),
            expected: 20,
            actual: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("0000101.mmtile"));
        assert!(msg.contains("20"));
        assert!(msg.contains('7'));

        let err = NavError::ParamsNotFound {
            path: PathBuf::from("000.mmap"),
        };
        assert!(err.to_string().contains("000.mmap"));
    }

    #[test]
    fn test_tile_attach_keeps_source() {
        let err = NavError::TileAttach {
            path: PathBuf::from("0000101.mmtile"),
            source: Box::new(NavError::WrongVersion {
                what: "navmesh",
                found: 6,
                expected: 7,
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("0000101.mmtile"));
        assert!(msg.contains("found 6"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
