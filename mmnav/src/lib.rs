//! # mmnav - Movement Map Navigation Library
//!
//! Loads tiled navigation meshes from movement-map files (`.mmap` + `.mmtile`)
//! and answers walkable path queries over them.
//!
//! ## Features
//!
//! - **Fast loading**: Tile files are memory-mapped and attached in one pass
//! - **Corridor search**: A* over polygon adjacency with per-area costs
//! - **Straight paths**: Funnel-pulled waypoints with optional edge crossings
//! - **Two frames**: Caller coordinates are converted to mesh order and back
//!
//! ## Quick Start
//!
//! ```ignore
//! use mmnav::{PathfinderBuilder, WorldPoint};
//!
//! let pathfinder = PathfinderBuilder::new("/data/mmaps").map_id(0).build()?;
//!
//! let start = WorldPoint::new(-8949.95, -132.49, 83.53);
//! let end = WorldPoint::new(-8960.0, -120.0, 84.0);
//!
//! let path = pathfinder.find_path(start.to_nav(), end.to_nav())?;
//! for p in path {
//!     println!("{:?}", p.to_world());
//! }
//! ```
//!
//! ## File Layout
//!
//! A map directory holds:
//!
//! - **`{map:03}.mmap`**: 28-byte mesh parameters (origin, tile size, limits)
//! - **`{map:03}{x:02}{y:02}.mmtile`**: 20-byte header followed by one tile of
//!   serialized mesh data
//!
//! All values are little-endian.
//!
//! ## Coordinates
//!
//! Callers use `(x, y, z)` with `z` up. The mesh stores `[y, z, x]` with the
//! second component up. See [`coords`].

pub mod coords;
pub mod error;
pub mod filename;
pub mod loader;
pub mod navmesh;
pub mod pathfinder;
pub mod tile;

// Re-export main types at crate root for convenience
pub use coords::{NavPoint, WorldPoint};
pub use error::{NavError, Result};
pub use loader::{load_map, LoadStats, LoadedMap, LoaderConfig};
pub use navmesh::{CrossingMode, NavMesh, PolyRef, QueryFilter, TileRef};
pub use pathfinder::{Pathfinder, PathfinderBuilder, ResolvedPath};
pub use tile::{TileFile, TileFormat, TileHeader};
