//! Tiled navigation mesh and the queries run against it.
//!
//! The mesh reads Detour tile data (the payload carried inside `.mmtile`
//! files), links polygons inside and across tiles, and answers three queries:
//! nearest polygon, polygon corridor (A*) and straight path (funnel).
//!
//! Off-mesh connections, detail meshes and BV-trees present in the tile data
//! are skipped; heights come from the polygon vertices.

mod data;
mod filter;
mod math;
mod mesh;
mod params;
mod query;

pub use data::{MeshData, PolyData, PolyType, DT_NAVMESH_MAGIC, DT_NAVMESH_VERSION};
pub use filter::QueryFilter;
pub use mesh::{Link, MeshTile, NavMesh, Poly};
pub use params::{NavMeshParams, NAVMESH_PARAMS_SIZE};
pub use query::{
    CrossingMode, NavMeshQuery, PathCorridor, StraightPath, StraightPathFlag, StraightPathPoint,
    DEFAULT_MAX_NODES, MAX_NODES_LIMIT,
};

/// Maximum number of vertices per polygon.
pub const MAX_VERTS_PER_POLY: usize = 6;

/// Neighbour flag marking an edge that continues in another tile.
pub const EXT_LINK: u16 = 0x8000;

/// Number of distinct polygon area ids.
pub const MAX_AREAS: usize = 64;

const POLY_BITS: u32 = 24;
const TILE_BITS: u32 = 24;
const SALT_BITS: u32 = 16;

/// Opaque handle to one polygon of one [`NavMesh`].
///
/// The handle encodes the owning mesh's salt, so a reference produced by one
/// mesh is rejected by [`NavMesh::is_valid_poly_ref`] on any other mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PolyRef(u64);

impl PolyRef {
    /// The null reference; never valid.
    pub const NULL: PolyRef = PolyRef(0);

    pub(crate) fn encode(salt: u16, tile: usize, poly: usize) -> Self {
        PolyRef(
            ((salt as u64) << (TILE_BITS + POLY_BITS))
                | ((tile as u64) << POLY_BITS)
                | poly as u64,
        )
    }

    /// Split into `(salt, tile index, polygon index)`.
    pub(crate) fn decode(self) -> (u16, usize, usize) {
        let salt = (self.0 >> (TILE_BITS + POLY_BITS)) & ((1 << SALT_BITS) - 1);
        let tile = (self.0 >> POLY_BITS) & ((1 << TILE_BITS) - 1);
        let poly = self.0 & ((1 << POLY_BITS) - 1);
        (salt as u16, tile as usize, poly as usize)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Raw integer value.
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Handle naming a tile slot. [`TileRef::NULL`] lets the mesh pick a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileRef(u64);

impl TileRef {
    pub const NULL: TileRef = TileRef(0);

    pub(crate) fn encode(salt: u16, tile: usize) -> Self {
        TileRef(((salt as u64) << (TILE_BITS + POLY_BITS)) | ((tile as u64) << POLY_BITS))
    }

    pub(crate) fn decode(self) -> (u16, usize) {
        let (salt, tile, _) = PolyRef(self.0).decode();
        (salt, tile)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Largest tile index or polygon index a reference can carry.
pub(crate) const MAX_REF_INDEX: usize = (1 << POLY_BITS) - 1;

#[cfg(test)]
pub(crate) mod testing;
