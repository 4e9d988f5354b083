//! Path resolution over a loaded map.
//!
//! [`Pathfinder`] owns the navigation mesh of one map and the query settings
//! used for every request: snap start and end onto the mesh, search the
//! polygon corridor, then straighten it into waypoints.
//!
//! ```ignore
//! use mmnav::{PathfinderBuilder, WorldPoint};
//!
//! let pathfinder = PathfinderBuilder::new("/data/mmaps").map_id(0).build()?;
//!
//! let start = WorldPoint::new(-8949.95, -132.49, 83.53).to_nav();
//! let end = WorldPoint::new(-9000.0, -100.0, 85.0).to_nav();
//! for p in pathfinder.find_path(start, end)? {
//!     println!("{:?}", p.to_world());
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::coords::NavPoint;
use crate::error::{NavError, Result};
use crate::loader::{load_map, LoadStats, LoadedMap, LoaderConfig};
use crate::navmesh::{
    CrossingMode, NavMesh, NavMeshQuery, PathCorridor, PolyRef, QueryFilter, DEFAULT_MAX_NODES,
    MAX_NODES_LIMIT,
};

/// Default path buffer capacity, for both corridor polygons and waypoints.
pub const DEFAULT_MAX_PATH: usize = 256;

/// Default snap half-extent on each axis.
pub const DEFAULT_SEARCH_EXTENT: f32 = 6.0;

/// Default polygon include mask.
pub const DEFAULT_INCLUDE_FLAGS: u16 = 0x05;

/// Default polygon exclude mask.
pub const DEFAULT_EXCLUDE_FLAGS: u16 = 0x0A;

/// Waypoints of a resolved path plus what the search reported on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPath {
    pub points: Vec<NavPoint>,
    /// The goal was unreachable; the path leads as close to it as possible.
    pub partial: bool,
    /// The corridor search hit its node budget.
    pub out_of_nodes: bool,
    /// Corridor or waypoints were cut at the path capacity.
    pub truncated: bool,
}

/// Path and snap queries over one map.
///
/// Immutable once built; share it between threads behind an `Arc`.
#[derive(Debug)]
pub struct Pathfinder {
    map_id: u32,
    mesh: NavMesh,
    stats: LoadStats,
    filter: QueryFilter,
    search_extent: [f32; 3],
    max_path: usize,
    max_nodes: usize,
    crossings: CrossingMode,
}

impl Pathfinder {
    /// Create a builder for the map files in `data_dir`.
    pub fn builder<P: AsRef<Path>>(data_dir: P) -> PathfinderBuilder {
        PathfinderBuilder::new(data_dir)
    }

    pub fn map_id(&self) -> u32 {
        self.map_id
    }

    pub fn mesh(&self) -> &NavMesh {
        &self.mesh
    }

    /// Statistics from loading the map.
    pub fn load_stats(&self) -> &LoadStats {
        &self.stats
    }

    pub fn filter(&self) -> &QueryFilter {
        &self.filter
    }

    pub fn search_extent(&self) -> [f32; 3] {
        self.search_extent
    }

    pub fn max_path(&self) -> usize {
        self.max_path
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    pub fn crossings(&self) -> CrossingMode {
        self.crossings
    }

    /// Waypoints from `start` to `end`, both ends included.
    ///
    /// Returns an empty list when either point has no surface within the
    /// search extent or no corridor exists. Never returns more than
    /// [`max_path`](Self::max_path) points.
    pub fn find_path(&self, start: NavPoint, end: NavPoint) -> Result<Vec<NavPoint>> {
        Ok(self.resolve_path(start, end)?.points)
    }

    /// Like [`find_path`](Self::find_path), also reporting partial,
    /// out-of-nodes and truncated searches.
    ///
    /// The corridor is searched between the snapped endpoints, but the
    /// waypoints are refined from `start` and `end` as given. An endpoint
    /// inside its polygon's footprint keeps its own height.
    pub fn resolve_path(&self, start: NavPoint, end: NavPoint) -> Result<ResolvedPath> {
        let mut query = NavMeshQuery::new(&self.mesh, self.max_nodes)?;

        let Some(corridor) = self.corridor(&mut query, start, end)? else {
            return Ok(ResolvedPath::default());
        };
        if corridor.polys.is_empty() {
            return Ok(ResolvedPath::default());
        }

        let straight = query.find_straight_path(
            start.0,
            end.0,
            &corridor.polys,
            self.max_path,
            self.crossings,
        )?;

        Ok(ResolvedPath {
            points: straight.positions().map(NavPoint).collect(),
            partial: corridor.partial,
            out_of_nodes: corridor.out_of_nodes,
            truncated: corridor.truncated || straight.truncated,
        })
    }

    /// Polygon corridor from `start` to `end`; empty when either point
    /// cannot be snapped.
    pub fn find_corridor(&self, start: NavPoint, end: NavPoint) -> Result<Vec<PolyRef>> {
        let mut query = NavMeshQuery::new(&self.mesh, self.max_nodes)?;
        Ok(self
            .corridor(&mut query, start, end)?
            .map(|corridor| corridor.polys)
            .unwrap_or_default())
    }

    /// Nearest surface point to `p`, or `None` if no surface lies within
    /// the search extent.
    pub fn closest_point(&self, p: NavPoint) -> Result<Option<NavPoint>> {
        let query = NavMeshQuery::new(&self.mesh, 1)?;
        Ok(self.snap(&query, p)?.map(|(_, pos)| NavPoint(pos)))
    }

    /// [`closest_point`](Self::closest_point) for each input, in order.
    pub fn closest_points(&self, points: &[NavPoint]) -> Result<Vec<Option<NavPoint>>> {
        let query = NavMeshQuery::new(&self.mesh, 1)?;
        points
            .iter()
            .map(|&p| Ok(self.snap(&query, p)?.map(|(_, pos)| NavPoint(pos))))
            .collect()
    }

    fn snap(&self, query: &NavMeshQuery, p: NavPoint) -> Result<Option<(PolyRef, [f32; 3])>> {
        let found = query.find_nearest_poly(p.0, self.search_extent, &self.filter)?;
        Ok(found.filter(|(r, _)| self.mesh.is_valid_poly_ref(*r)))
    }

    /// Snap both ends and search the corridor between them.
    fn corridor(
        &self,
        query: &mut NavMeshQuery,
        start: NavPoint,
        end: NavPoint,
    ) -> Result<Option<PathCorridor>> {
        let Some((start_ref, start_pos)) = self.snap(query, start)? else {
            return Ok(None);
        };
        let Some((end_ref, end_pos)) = self.snap(query, end)? else {
            return Ok(None);
        };

        let corridor = query.find_path(
            start_ref,
            end_ref,
            start_pos,
            end_pos,
            &self.filter,
            self.max_path,
        )?;
        Ok(Some(corridor))
    }
}

/// Builder for [`Pathfinder`].
#[derive(Debug, Clone)]
pub struct PathfinderBuilder {
    data_dir: PathBuf,
    map_id: u32,
    loader: LoaderConfig,
    max_path: usize,
    max_nodes: usize,
    search_extent: [f32; 3],
    include_flags: u16,
    exclude_flags: u16,
    crossings: CrossingMode,
}

impl PathfinderBuilder {
    /// Create a builder with default settings for the map files in `data_dir`.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            map_id: 0,
            loader: LoaderConfig::default(),
            max_path: DEFAULT_MAX_PATH,
            max_nodes: DEFAULT_MAX_NODES,
            search_extent: [DEFAULT_SEARCH_EXTENT; 3],
            include_flags: DEFAULT_INCLUDE_FLAGS,
            exclude_flags: DEFAULT_EXCLUDE_FLAGS,
            crossings: CrossingMode::default(),
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `MMNAV_DATA_DIR` | Directory containing `.mmap`/`.mmtile` files | Required |
    /// | `MMNAV_MAP_ID` | Map to load | 0 |
    /// | `MMNAV_GRID_SIZE` | Tile grid extent | 64 |
    /// | `MMNAV_MAX_PATH` | Path capacity | 256 |
    /// | `MMNAV_MAX_NODES` | Corridor search node budget | 65535 |
    /// | `MMNAV_SEARCH_EXTENT` | Snap half-extent per axis | 6 |
    /// | `MMNAV_INCLUDE_FLAGS` | Polygon include mask | 5 |
    /// | `MMNAV_EXCLUDE_FLAGS` | Polygon exclude mask | 10 |
    ///
    /// Masks accept decimal or `0x`-prefixed hex. Unparseable values fall
    /// back to the default.
    ///
    /// # Errors
    ///
    /// Returns an error if `MMNAV_DATA_DIR` is not set.
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("MMNAV_DATA_DIR").map_err(|_| {
            NavError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "MMNAV_DATA_DIR environment variable not set",
            ))
        })?;

        let mut builder = Self::new(data_dir);
        if let Some(v) = env_parse("MMNAV_MAP_ID") {
            builder.map_id = v;
        }
        if let Some(v) = env_parse("MMNAV_GRID_SIZE") {
            builder.loader.grid_size = v;
        }
        if let Some(v) = env_parse("MMNAV_MAX_PATH") {
            builder.max_path = v;
        }
        if let Some(v) = env_parse("MMNAV_MAX_NODES") {
            builder.max_nodes = v;
        }
        if let Some(v) = env_parse::<f32>("MMNAV_SEARCH_EXTENT") {
            builder.search_extent = [v; 3];
        }
        if let Some(v) = env_flags("MMNAV_INCLUDE_FLAGS") {
            builder.include_flags = v;
        }
        if let Some(v) = env_flags("MMNAV_EXCLUDE_FLAGS") {
            builder.exclude_flags = v;
        }
        Ok(builder)
    }

    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn map_id(mut self, map_id: u32) -> Self {
        self.map_id = map_id;
        self
    }

    /// Probe grid coordinates `1..grid_size` on both axes. Default 64.
    pub fn grid_size(mut self, grid_size: u32) -> Self {
        self.loader.grid_size = grid_size;
        self
    }

    /// Only accept tiles built by this generator version.
    pub fn mmap_version(mut self, version: u32) -> Self {
        self.loader.format.mmap_version = Some(version);
        self
    }

    /// Corridor and waypoint capacity. Default 256.
    pub fn max_path(mut self, max_path: usize) -> Self {
        self.max_path = max_path;
        self
    }

    /// Corridor search node budget, `1..=65535`. Default 65535.
    pub fn max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Snap half-extents in mesh axis order. Default 6 on each axis.
    pub fn search_extent(mut self, extent: [f32; 3]) -> Self {
        self.search_extent = extent;
        self
    }

    pub fn include_flags(mut self, flags: u16) -> Self {
        self.include_flags = flags;
        self
    }

    pub fn exclude_flags(mut self, flags: u16) -> Self {
        self.exclude_flags = flags;
        self
    }

    pub fn crossings(mut self, crossings: CrossingMode) -> Self {
        self.crossings = crossings;
        self
    }

    pub fn data_dir_path(&self) -> &Path {
        &self.data_dir
    }

    pub fn map(&self) -> u32 {
        self.map_id
    }

    /// Load the map and build the [`Pathfinder`].
    ///
    /// # Errors
    ///
    /// Any error from [`load_map`], or [`NavError::InvalidQuery`] for
    /// unusable query settings.
    pub fn build(self) -> Result<Pathfinder> {
        self.validate()?;
        let map = load_map(&self.data_dir, self.map_id, &self.loader)?;
        self.build_with(map)
    }

    /// Build a [`Pathfinder`] over an already loaded map.
    pub fn build_with(self, map: LoadedMap) -> Result<Pathfinder> {
        self.validate()?;
        Ok(Pathfinder {
            map_id: map.map_id,
            mesh: map.mesh,
            stats: map.stats,
            filter: QueryFilter::new(self.include_flags, self.exclude_flags),
            search_extent: self.search_extent,
            max_path: self.max_path,
            max_nodes: self.max_nodes,
            crossings: self.crossings,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.max_path == 0 {
            return Err(NavError::InvalidQuery("max_path must be at least 1".into()));
        }
        if self.max_nodes == 0 || self.max_nodes > MAX_NODES_LIMIT {
            return Err(NavError::InvalidQuery(format!(
                "max_nodes must be in 1..={}, got {}",
                MAX_NODES_LIMIT, self.max_nodes
            )));
        }
        if self.search_extent.iter().any(|e| !e.is_finite() || *e < 0.0) {
            return Err(NavError::InvalidQuery(format!(
                "search extent {:?} must be finite and non-negative",
                self.search_extent
            )));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flags(name: &str) -> Option<u16> {
    std::env::var(name).ok().and_then(|s| parse_flags(&s))
}

/// Parse a mask given in decimal or `0x`-prefixed hex.
fn parse_flags(value: &str) -> Option<u16> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::WorldPoint;
    use crate::navmesh::testing::{cells_tile, mesh_from_tiles, test_params, two_tile_mesh};
    use crate::navmesh::NavMesh;

    fn loaded(mesh: NavMesh) -> LoadedMap {
        LoadedMap {
            map_id: 0,
            mesh,
            stats: LoadStats::default(),
        }
    }

    fn pathfinder() -> Pathfinder {
        PathfinderBuilder::new(".")
            .build_with(loaded(two_tile_mesh()))
            .unwrap()
    }

    fn wide_params(size: f32) -> crate::navmesh::NavMeshParams {
        let mut params = test_params();
        params.tile_width = size;
        params.tile_height = size;
        params
    }

    fn close(a: NavPoint, b: [f32; 3]) -> bool {
        a.0.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-3)
    }

    #[test]
    fn test_defaults() {
        let pf = pathfinder();
        assert_eq!(pf.max_path(), 256);
        assert_eq!(pf.max_nodes(), 65535);
        assert_eq!(pf.search_extent(), [6.0; 3]);
        assert_eq!(pf.filter().include_flags(), 0x05);
        assert_eq!(pf.filter().exclude_flags(), 0x0A);
        assert_eq!(pf.crossings(), CrossingMode::AreaCrossings);
    }

    #[test]
    fn test_find_path_across_tiles() {
        let pf = pathfinder();
        let path = pf
            .find_path(NavPoint([2.0, 0.0, 5.0]), NavPoint([18.0, 0.0, 5.0]))
            .unwrap();

        assert!(path.len() >= 2);
        assert!(close(path[0], [2.0, 0.0, 5.0]));
        assert!(close(*path.last().unwrap(), [18.0, 0.0, 5.0]));
    }

    #[test]
    fn test_find_path_from_world_points() {
        let pf = pathfinder();
        // world (5, 2, 0) is mesh (2, 0, 5)
        let start = WorldPoint::new(5.0, 2.0, 0.0).to_nav();
        let end = WorldPoint::new(5.0, 18.0, 0.0).to_nav();
        let path: Vec<WorldPoint> = pf
            .find_path(start, end)
            .unwrap()
            .into_iter()
            .map(NavPoint::to_world)
            .collect();

        let first = path.first().unwrap();
        let last = path.last().unwrap();
        assert!((first.x - 5.0).abs() < 1e-3 && (first.y - 2.0).abs() < 1e-3);
        assert!((last.x - 5.0).abs() < 1e-3 && (last.y - 18.0).abs() < 1e-3);
    }

    #[test]
    fn test_find_path_keeps_requested_endpoints() {
        let pf = pathfinder();
        // both ends hover above the surface
        let path = pf
            .find_path(NavPoint([2.0, 2.5, 5.0]), NavPoint([18.0, 2.5, 5.0]))
            .unwrap();

        assert!(path.len() >= 2);
        assert!(close(path[0], [2.0, 2.5, 5.0]));
        assert!(close(*path.last().unwrap(), [18.0, 2.5, 5.0]));
    }

    #[test]
    fn test_find_path_clamps_endpoint_to_corridor() {
        let pf = pathfinder();
        // start lies outside the mesh footprint but within the search extent
        let path = pf
            .find_path(NavPoint([-1.0, 0.0, 5.0]), NavPoint([18.0, 0.0, 5.0]))
            .unwrap();

        assert!(!path.is_empty());
        assert!(close(path[0], [0.0, 0.0, 5.0]));
    }

    #[test]
    fn test_find_path_off_mesh_is_empty() {
        let pf = pathfinder();
        let path = pf
            .find_path(NavPoint([2.0, 0.0, 5.0]), NavPoint([500.0, 0.0, 500.0]))
            .unwrap();
        assert!(path.is_empty());

        let path = pf
            .find_path(NavPoint([500.0, 0.0, 500.0]), NavPoint([2.0, 0.0, 5.0]))
            .unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_find_path_unreachable_is_partial() {
        let mesh = mesh_from_tiles(
            wide_params(30.0),
            &[cells_tile(0, 0, 30.0, 10.0, &[(0, 0), (2, 0)])],
        );
        let pf = PathfinderBuilder::new(".").build_with(loaded(mesh)).unwrap();

        let resolved = pf
            .resolve_path(NavPoint([5.0, 0.0, 5.0]), NavPoint([25.0, 0.0, 5.0]))
            .unwrap();
        assert!(resolved.partial);
        assert!(!resolved.points.is_empty());
        // the path stops on the start polygon
        assert!(resolved.points.iter().all(|p| p.0[0] <= 10.0 + 1e-3));
    }

    #[test]
    fn test_max_path_bounds_output() {
        let cells: Vec<(u32, u32)> = (0..8).map(|x| (x, 0)).collect();
        let mut tiles = vec![cells_tile(0, 0, 80.0, 10.0, &cells)];
        for (i, p) in tiles[0].polys.iter_mut().enumerate() {
            p.area = i as u8;
        }
        let mesh = mesh_from_tiles(wide_params(80.0), &tiles);
        let pf = PathfinderBuilder::new(".")
            .max_path(3)
            .build_with(loaded(mesh))
            .unwrap();

        let resolved = pf
            .resolve_path(NavPoint([5.0, 0.0, 5.0]), NavPoint([75.0, 0.0, 5.0]))
            .unwrap();
        assert!(resolved.points.len() <= 3);
        assert!(resolved.truncated);
    }

    #[test]
    fn test_find_corridor() {
        let pf = pathfinder();
        let corridor = pf
            .find_corridor(NavPoint([2.0, 0.0, 5.0]), NavPoint([18.0, 0.0, 5.0]))
            .unwrap();
        assert_eq!(corridor.len(), 2);
        assert!(corridor.iter().all(|r| pf.mesh().is_valid_poly_ref(*r)));

        let none = pf
            .find_corridor(NavPoint([2.0, 0.0, 5.0]), NavPoint([500.0, 0.0, 5.0]))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_closest_point() {
        let pf = pathfinder();
        let p = pf.closest_point(NavPoint([5.0, 3.0, 5.0])).unwrap().unwrap();
        assert!(close(p, [5.0, 0.0, 5.0]));

        assert!(pf
            .closest_point(NavPoint([500.0, 0.0, 500.0]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_closest_point_respects_filter() {
        let pf = PathfinderBuilder::new(".")
            .include_flags(0x10)
            .build_with(loaded(two_tile_mesh()))
            .unwrap();
        assert!(pf.closest_point(NavPoint([5.0, 0.0, 5.0])).unwrap().is_none());
    }

    #[test]
    fn test_closest_points_batch() {
        let pf = pathfinder();
        assert!(pf.closest_points(&[]).unwrap().is_empty());

        let results = pf
            .closest_points(&[
                NavPoint([5.0, 0.0, 5.0]),
                NavPoint([500.0, 0.0, 500.0]),
                NavPoint([15.0, 1.0, 5.0]),
            ])
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_some());
        assert!(results[1].is_none());
        assert!(close(results[2].unwrap(), [15.0, 0.0, 5.0]));
    }

    #[test]
    fn test_build_rejects_bad_settings() {
        let result = PathfinderBuilder::new(".")
            .max_nodes(0)
            .build_with(loaded(two_tile_mesh()));
        assert!(matches!(result, Err(NavError::InvalidQuery(_))));

        let result = PathfinderBuilder::new(".")
            .max_nodes(MAX_NODES_LIMIT + 1)
            .build_with(loaded(two_tile_mesh()));
        assert!(matches!(result, Err(NavError::InvalidQuery(_))));

        let result = PathfinderBuilder::new(".")
            .max_path(0)
            .build_with(loaded(two_tile_mesh()));
        assert!(matches!(result, Err(NavError::InvalidQuery(_))));
    }

    #[test]
    fn test_build_missing_data_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = PathfinderBuilder::new(dir.path()).build();
        assert!(matches!(result, Err(NavError::ParamsNotFound { .. })));
    }

    #[test]
    fn test_parse_flags() {
        assert_eq!(parse_flags("5"), Some(5));
        assert_eq!(parse_flags("0x0A"), Some(10));
        assert_eq!(parse_flags(" 0XFFFF "), Some(0xffff));
        assert_eq!(parse_flags("nope"), None);
        assert_eq!(parse_flags("70000"), None);
    }

    #[test]
    fn test_from_env() {
        let vars = [
            "MMNAV_DATA_DIR",
            "MMNAV_MAP_ID",
            "MMNAV_MAX_PATH",
            "MMNAV_SEARCH_EXTENT",
            "MMNAV_INCLUDE_FLAGS",
        ];
        let saved: Vec<_> = vars.iter().map(|v| std::env::var(v).ok()).collect();

        std::env::remove_var("MMNAV_DATA_DIR");
        assert!(PathfinderBuilder::from_env().is_err());

        std::env::set_var("MMNAV_DATA_DIR", "/srv/mmaps");
        std::env::set_var("MMNAV_MAP_ID", "530");
        std::env::set_var("MMNAV_MAX_PATH", "not a number");
        std::env::set_var("MMNAV_SEARCH_EXTENT", "3.5");
        std::env::set_var("MMNAV_INCLUDE_FLAGS", "0x1");

        let builder = PathfinderBuilder::from_env().unwrap();
        assert_eq!(builder.data_dir_path(), Path::new("/srv/mmaps"));
        assert_eq!(builder.map(), 530);
        assert_eq!(builder.max_path, DEFAULT_MAX_PATH);
        assert_eq!(builder.search_extent, [3.5; 3]);
        assert_eq!(builder.include_flags, 1);
        assert_eq!(builder.exclude_flags, DEFAULT_EXCLUDE_FLAGS);

        for (var, value) in vars.iter().zip(saved) {
            match value {
                Some(v) => std::env::set_var(var, v),
                None => std::env::remove_var(var),
            }
        }
    }
}
