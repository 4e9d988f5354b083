//! Tiled navigation mesh: tile storage, polygon links and lookups.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};

use super::data::{MeshData, PolyType};
use super::filter::QueryFilter;
use super::math::{self, Vec3};
use super::params::NavMeshParams;
use super::{PolyRef, TileRef, EXT_LINK, MAX_REF_INDEX, MAX_VERTS_PER_POLY};
use crate::error::{NavError, Result};

/// Source of per-mesh salts. Zero is skipped so no reference is ever null.
static NEXT_SALT: AtomicU16 = AtomicU16::new(1);

/// Most neighbours a single border edge links to.
const MAX_EDGE_NEIGHBOURS: usize = 4;

/// Connection from one polygon edge to a neighbouring polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub neighbour: PolyRef,
    /// Edge index in the owning polygon.
    pub edge: u8,
    /// Tile border side for cross-tile links, `None` inside a tile.
    pub side: Option<u8>,
    /// Portal sub-range of the edge, 0..=255 along `v0 -> v1`.
    pub bmin: u8,
    pub bmax: u8,
}

/// A polygon together with its resolved links.
#[derive(Debug, Clone)]
pub struct Poly {
    pub verts: [u16; MAX_VERTS_PER_POLY],
    pub neis: [u16; MAX_VERTS_PER_POLY],
    pub vert_count: u8,
    pub flags: u16,
    pub area: u8,
    pub poly_type: PolyType,
    pub links: Vec<Link>,
}

impl Poly {
    fn edge_count(&self) -> usize {
        self.vert_count as usize
    }
}

/// A tile attached to a [`NavMesh`].
#[derive(Debug, Clone)]
pub struct MeshTile {
    pub x: i32,
    pub y: i32,
    pub layer: i32,
    pub bmin: [f32; 3],
    pub bmax: [f32; 3],
    pub walkable_climb: f32,
    pub verts: Vec<[f32; 3]>,
    pub polys: Vec<Poly>,
}

impl MeshTile {
    /// Vertex positions of `poly`, in winding order.
    pub fn poly_verts(&self, poly: &Poly) -> Vec<[f32; 3]> {
        poly.verts[..poly.edge_count()]
            .iter()
            .map(|&v| self.verts[v as usize])
            .collect()
    }

    fn edge(&self, poly: &Poly, edge: usize) -> (Vec3, Vec3) {
        let n = poly.edge_count();
        (
            self.verts[poly.verts[edge] as usize],
            self.verts[poly.verts[(edge + 1) % n] as usize],
        )
    }

    fn poly_bounds(&self, poly: &Poly) -> (Vec3, Vec3) {
        let mut bmin = [f32::MAX; 3];
        let mut bmax = [f32::MIN; 3];
        for &v in &poly.verts[..poly.edge_count()] {
            let p = self.verts[v as usize];
            for k in 0..3 {
                bmin[k] = bmin[k].min(p[k]);
                bmax[k] = bmax[k].max(p[k]);
            }
        }
        (bmin, bmax)
    }
}

/// Navigation mesh made of tiles on a regular grid.
///
/// Built once, then shared read-only between queries.
#[derive(Debug)]
pub struct NavMesh {
    params: NavMeshParams,
    salt: u16,
    max_tiles: usize,
    max_polys: usize,
    tiles: Vec<Option<MeshTile>>,
    lookup: HashMap<(i32, i32, i32), usize>,
}

impl NavMesh {
    /// Create an empty mesh.
    ///
    /// # Errors
    ///
    /// [`NavError::InvalidParams`] for non-positive tile sizes or limits, or
    /// limits a [`PolyRef`] cannot address.
    pub fn new(params: NavMeshParams) -> Result<Self> {
        if !(params.tile_width.is_finite() && params.tile_width > 0.0)
            || !(params.tile_height.is_finite() && params.tile_height > 0.0)
        {
            return Err(NavError::InvalidParams(format!(
                "tile size {}x{} must be positive",
                params.tile_width, params.tile_height
            )));
        }
        if params.origin.iter().any(|c| !c.is_finite()) {
            return Err(NavError::InvalidParams("origin is not finite".into()));
        }

        let max_tiles = checked_limit("max_tiles", params.max_tiles)?;
        let max_polys = checked_limit("max_polys", params.max_polys)?;

        Ok(Self {
            params,
            salt: next_salt(),
            max_tiles,
            max_polys,
            tiles: Vec::new(),
            lookup: HashMap::new(),
        })
    }

    pub fn params(&self) -> &NavMeshParams {
        &self.params
    }

    /// Decode tile data and attach it, linking it to adjacent tiles.
    ///
    /// With [`TileRef::NULL`] the mesh picks the next free slot; otherwise
    /// the tile is placed in the slot named by `tile_ref`.
    ///
    /// # Errors
    ///
    /// - decoding errors from [`MeshData::from_bytes`]
    /// - [`NavError::TileAlreadyExists`] when the grid cell or slot is taken
    /// - [`NavError::TooManyTiles`] when no slot is left
    /// - [`NavError::InvalidData`] for too many polygons or bad neighbour indices
    pub fn add_tile(&mut self, data: &[u8], tile_ref: TileRef) -> Result<TileRef> {
        let data = MeshData::from_bytes(data)?;
        let key = (data.x, data.y, data.layer);

        if self.lookup.contains_key(&key) {
            return Err(NavError::TileAlreadyExists {
                x: data.x,
                y: data.y,
                layer: data.layer,
            });
        }
        if data.polys.len() > self.max_polys {
            return Err(NavError::InvalidData(format!(
                "tile has {} polygons, limit is {}",
                data.polys.len(),
                self.max_polys
            )));
        }

        let index = self.claim_slot(tile_ref, key)?;
        let tile = self.build_tile(index, data)?;

        if index >= self.tiles.len() {
            self.tiles.resize_with(index + 1, || None);
        }
        self.tiles[index] = Some(tile);
        self.lookup.insert(key, index);

        for side in 0..8u8 {
            let (dx, dy) = side_offset(side);
            let Some(&neighbour) = self.lookup.get(&(key.0 + dx, key.1 + dy, key.2)) else {
                continue;
            };
            self.connect_ext_links(index, neighbour, side);
            self.connect_ext_links(neighbour, index, opposite_side(side));
        }

        Ok(TileRef::encode(self.salt, index))
    }

    fn claim_slot(&self, tile_ref: TileRef, key: (i32, i32, i32)) -> Result<usize> {
        if tile_ref.is_null() {
            return match self.tiles.iter().position(Option::is_none) {
                Some(free) => Ok(free),
                None if self.tiles.len() < self.max_tiles => Ok(self.tiles.len()),
                None => Err(NavError::TooManyTiles {
                    max: self.max_tiles,
                }),
            };
        }

        let (salt, index) = tile_ref.decode();
        if salt != self.salt || index >= self.max_tiles {
            return Err(NavError::InvalidData(format!(
                "tile reference {:#x} does not name a slot of this mesh",
                tile_ref.id()
            )));
        }
        if matches!(self.tiles.get(index), Some(Some(_))) {
            return Err(NavError::TileAlreadyExists {
                x: key.0,
                y: key.1,
                layer: key.2,
            });
        }
        Ok(index)
    }

    fn build_tile(&self, index: usize, data: MeshData) -> Result<MeshTile> {
        let poly_count = data.polys.len();
        let mut polys = Vec::with_capacity(poly_count);

        for (i, p) in data.polys.into_iter().enumerate() {
            let mut links = Vec::new();
            if p.poly_type == PolyType::Ground {
                for edge in 0..p.vert_count as usize {
                    let nei = p.neis[edge];
                    if nei == 0 || nei & EXT_LINK != 0 {
                        continue;
                    }
                    let target = (nei - 1) as usize;
                    if target >= poly_count {
                        return Err(NavError::InvalidData(format!(
                            "polygon {} edge {} names neighbour {} of {}",
                            i, edge, target, poly_count
                        )));
                    }
                    links.push(Link {
                        neighbour: PolyRef::encode(self.salt, index, target),
                        edge: edge as u8,
                        side: None,
                        bmin: 0,
                        bmax: 255,
                    });
                }
            }
            polys.push(Poly {
                verts: p.verts,
                neis: p.neis,
                vert_count: p.vert_count,
                flags: p.flags,
                area: p.area,
                poly_type: p.poly_type,
                links,
            });
        }

        Ok(MeshTile {
            x: data.x,
            y: data.y,
            layer: data.layer,
            bmin: data.bmin,
            bmax: data.bmax,
            walkable_climb: data.walkable_climb,
            verts: data.verts,
            polys,
        })
    }

    /// Link border edges of tile `from` on `side` to matching edges of `to`.
    fn connect_ext_links(&mut self, from: usize, to: usize, side: u8) {
        let (Some(Some(tile)), Some(Some(target))) = (self.tiles.get(from), self.tiles.get(to))
        else {
            return;
        };

        let mut new_links = Vec::new();
        for (pi, poly) in tile.polys.iter().enumerate() {
            for edge in 0..poly.edge_count() {
                if poly.neis[edge] != EXT_LINK | side as u16 {
                    continue;
                }
                let (va, vb) = tile.edge(poly, edge);
                for (neighbour, lo, hi) in self.find_connecting_polys(va, vb, to, target, side) {
                    let (bmin, bmax) = portal_range(va, vb, lo, hi, side);
                    new_links.push((
                        pi,
                        Link {
                            neighbour,
                            edge: edge as u8,
                            side: Some(side),
                            bmin,
                            bmax,
                        },
                    ));
                }
            }
        }

        if let Some(Some(tile)) = self.tiles.get_mut(from) {
            for (pi, link) in new_links {
                tile.polys[pi].links.push(link);
            }
        }
    }

    /// Polygons of `target` whose border edges on the opposite side overlap
    /// segment `va-vb`, with the overlap range along the border.
    fn find_connecting_polys(
        &self,
        va: Vec3,
        vb: Vec3,
        target_index: usize,
        target: &MeshTile,
        side: u8,
    ) -> Vec<(PolyRef, f32, f32)> {
        let opposite = opposite_side(side);
        let (amin, amax) = slab_end_points(va, vb, opposite);
        let apos = slab_coord(va, opposite);

        let mut found = Vec::new();
        for (pi, poly) in target.polys.iter().enumerate() {
            for edge in 0..poly.edge_count() {
                if poly.neis[edge] != EXT_LINK | opposite as u16 {
                    continue;
                }
                let (vc, vd) = target.edge(poly, edge);
                if (apos - slab_coord(vc, opposite)).abs() > 0.01 {
                    continue;
                }
                let (bmin, bmax) = slab_end_points(vc, vd, opposite);
                if !overlap_slabs(amin, amax, bmin, bmax, 0.01, target.walkable_climb) {
                    continue;
                }
                if found.len() < MAX_EDGE_NEIGHBOURS {
                    found.push((
                        PolyRef::encode(self.salt, target_index, pi),
                        amin[0].max(bmin[0]),
                        amax[0].min(bmax[0]),
                    ));
                }
                break;
            }
        }
        found
    }

    /// Whether `r` names a polygon of this mesh.
    pub fn is_valid_poly_ref(&self, r: PolyRef) -> bool {
        self.tile_and_poly_by_ref(r).is_ok()
    }

    /// Resolve a reference to its tile and polygon.
    pub fn tile_and_poly_by_ref(&self, r: PolyRef) -> Result<(&MeshTile, &Poly)> {
        if r.is_null() {
            return Err(NavError::InvalidPolyRef(r));
        }
        let (salt, ti, pi) = r.decode();
        if salt != self.salt {
            return Err(NavError::InvalidPolyRef(r));
        }
        let tile = self
            .tiles
            .get(ti)
            .and_then(Option::as_ref)
            .ok_or(NavError::InvalidPolyRef(r))?;
        let poly = tile.polys.get(pi).ok_or(NavError::InvalidPolyRef(r))?;
        Ok((tile, poly))
    }

    /// Tile at grid location `(x, y, layer)`.
    pub fn tile_at(&self, x: i32, y: i32, layer: i32) -> Option<&MeshTile> {
        self.lookup
            .get(&(x, y, layer))
            .and_then(|&i| self.tiles.get(i))
            .and_then(Option::as_ref)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &MeshTile> {
        self.tiles.iter().flatten()
    }

    pub fn tile_count(&self) -> usize {
        self.lookup.len()
    }

    pub fn poly_count(&self) -> usize {
        self.tiles().map(|t| t.polys.len()).sum()
    }

    /// Ground polygons passing `filter` whose bounds overlap the box
    /// `center ± extents`.
    pub fn query_polygons(
        &self,
        center: [f32; 3],
        extents: [f32; 3],
        filter: &QueryFilter,
    ) -> Vec<PolyRef> {
        let qmin = math::vsub(center, extents);
        let qmax = [
            center[0] + extents[0],
            center[1] + extents[1],
            center[2] + extents[2],
        ];

        let mut result = Vec::new();
        for (ti, tile) in self.tiles.iter().enumerate() {
            let Some(tile) = tile else { continue };
            if !math::overlap_bounds(qmin, qmax, tile.bmin, tile.bmax) {
                continue;
            }
            for (pi, poly) in tile.polys.iter().enumerate() {
                if poly.poly_type != PolyType::Ground || !filter.pass_filter(poly.flags) {
                    continue;
                }
                let (pmin, pmax) = tile.poly_bounds(poly);
                if math::overlap_bounds(qmin, qmax, pmin, pmax) {
                    result.push(PolyRef::encode(self.salt, ti, pi));
                }
            }
        }
        result
    }

    /// Closest point on polygon `r` to `pos`, and whether `pos` lies over it.
    pub fn closest_point_on_poly(&self, r: PolyRef, pos: [f32; 3]) -> Result<([f32; 3], bool)> {
        let (tile, poly) = self.tile_and_poly_by_ref(r)?;
        let verts = tile.poly_verts(poly);

        if math::point_in_polygon(pos, &verts) {
            let y = math::poly_height(pos, &verts).unwrap_or(pos[1]);
            return Ok(([pos[0], y, pos[2]], true));
        }
        Ok((math::closest_point_on_poly_boundary(pos, &verts), false))
    }

    /// Portal edge shared by adjacent polygons `from` and `to`, as
    /// `(left, right)` seen from `from`.
    pub fn portal_points(&self, from: PolyRef, to: PolyRef) -> Result<([f32; 3], [f32; 3])> {
        let (tile, poly) = self.tile_and_poly_by_ref(from)?;
        self.tile_and_poly_by_ref(to)?;

        let link = poly
            .links
            .iter()
            .find(|l| l.neighbour == to)
            .ok_or_else(|| {
                NavError::InvalidQuery(format!(
                    "polygons {:#x} and {:#x} are not adjacent",
                    from.id(),
                    to.id()
                ))
            })?;

        let (v0, v1) = tile.edge(poly, link.edge as usize);
        if link.side.is_some() && (link.bmin != 0 || link.bmax != 255) {
            let s = 1.0 / 255.0;
            return Ok((
                math::vlerp(v0, v1, link.bmin as f32 * s),
                math::vlerp(v0, v1, link.bmax as f32 * s),
            ));
        }
        Ok((v0, v1))
    }

    pub(crate) fn salt(&self) -> u16 {
        self.salt
    }
}

fn next_salt() -> u16 {
    loop {
        let salt = NEXT_SALT.fetch_add(1, Ordering::Relaxed);
        if salt != 0 {
            return salt;
        }
    }
}

fn checked_limit(name: &str, value: i32) -> Result<usize> {
    match usize::try_from(value) {
        Ok(v) if v > 0 && v <= MAX_REF_INDEX + 1 => Ok(v),
        _ => Err(NavError::InvalidParams(format!(
            "{} must be in 1..={}, got {}",
            name,
            MAX_REF_INDEX + 1,
            value
        ))),
    }
}

/// Grid offset of the neighbouring tile on `side`.
/// Side 0 is +x, 2 is +z, 4 is -x, 6 is -z; odd sides are diagonals.
fn side_offset(side: u8) -> (i32, i32) {
    match side & 7 {
        0 => (1, 0),
        1 => (1, 1),
        2 => (0, 1),
        3 => (-1, 1),
        4 => (-1, 0),
        5 => (-1, -1),
        6 => (0, -1),
        _ => (1, -1),
    }
}

fn opposite_side(side: u8) -> u8 {
    (side + 4) & 7
}

/// Coordinate of the border plane a vertex on `side` lies in.
fn slab_coord(v: Vec3, side: u8) -> f32 {
    match side {
        0 | 4 => v[0],
        _ => v[2],
    }
}

/// Edge end points projected to (along-border, height), ordered by the
/// along-border coordinate.
fn slab_end_points(va: Vec3, vb: Vec3, side: u8) -> ([f32; 2], [f32; 2]) {
    let along = match side {
        0 | 4 => 2,
        _ => 0,
    };
    if va[along] < vb[along] {
        ([va[along], va[1]], [vb[along], vb[1]])
    } else {
        ([vb[along], vb[1]], [va[along], va[1]])
    }
}

fn overlap_slabs(
    amin: [f32; 2],
    amax: [f32; 2],
    bmin: [f32; 2],
    bmax: [f32; 2],
    px: f32,
    py: f32,
) -> bool {
    let minx = (amin[0] + px).max(bmin[0] + px);
    let maxx = (amax[0] - px).min(bmax[0] - px);
    if minx > maxx {
        return false;
    }

    let ad = (amax[1] - amin[1]) / (amax[0] - amin[0]);
    let ak = amin[1] - ad * amin[0];
    let bd = (bmax[1] - bmin[1]) / (bmax[0] - bmin[0]);
    let bk = bmin[1] - bd * bmin[0];
    let dmin = (bd * minx + bk) - (ad * minx + ak);
    let dmax = (bd * maxx + bk) - (ad * maxx + ak);

    if dmin * dmax < 0.0 {
        return true;
    }
    let thr = (py * 2.0) * (py * 2.0);
    dmin * dmin <= thr || dmax * dmax <= thr
}

/// Quantised sub-range `[lo, hi]` of edge `va-vb` along the tile border.
fn portal_range(va: Vec3, vb: Vec3, lo: f32, hi: f32, side: u8) -> (u8, u8) {
    let along = match side {
        0 | 4 => 2,
        2 | 6 => 0,
        _ => return (0, 255),
    };
    let span = vb[along] - va[along];
    if span == 0.0 {
        return (0, 255);
    }
    let mut tmin = (lo - va[along]) / span;
    let mut tmax = (hi - va[along]) / span;
    if tmin > tmax {
        std::mem::swap(&mut tmin, &mut tmax);
    }
    (
        (tmin.clamp(0.0, 1.0) * 255.0).round() as u8,
        (tmax.clamp(0.0, 1.0) * 255.0).round() as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navmesh::testing::{quad_tile, test_params, two_tile_mesh};

    #[test]
    fn test_new_rejects_bad_params() {
        let mut params = test_params();
        params.tile_width = 0.0;
        assert!(matches!(
            NavMesh::new(params),
            Err(NavError::InvalidParams(_))
        ));

        let mut params = test_params();
        params.max_tiles = -1;
        assert!(matches!(
            NavMesh::new(params),
            Err(NavError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_add_tile_and_lookup() {
        let mut mesh = NavMesh::new(test_params()).unwrap();
        let r = mesh
            .add_tile(&quad_tile(0, 0, 10.0).to_bytes(), TileRef::NULL)
            .unwrap();
        assert!(!r.is_null());
        assert_eq!(mesh.tile_count(), 1);
        assert_eq!(mesh.poly_count(), 1);
        assert!(mesh.tile_at(0, 0, 0).is_some());
        assert!(mesh.tile_at(1, 0, 0).is_none());
    }

    #[test]
    fn test_add_duplicate_tile() {
        let mut mesh = NavMesh::new(test_params()).unwrap();
        let bytes = quad_tile(0, 0, 10.0).to_bytes();
        mesh.add_tile(&bytes, TileRef::NULL).unwrap();
        assert!(matches!(
            mesh.add_tile(&bytes, TileRef::NULL),
            Err(NavError::TileAlreadyExists { x: 0, y: 0, layer: 0 })
        ));
    }

    #[test]
    fn test_too_many_tiles() {
        let mut params = test_params();
        params.max_tiles = 1;
        let mut mesh = NavMesh::new(params).unwrap();
        mesh.add_tile(&quad_tile(0, 0, 10.0).to_bytes(), TileRef::NULL)
            .unwrap();
        assert!(matches!(
            mesh.add_tile(&quad_tile(1, 0, 10.0).to_bytes(), TileRef::NULL),
            Err(NavError::TooManyTiles { max: 1 })
        ));
    }

    #[test]
    fn test_cross_tile_links() {
        let mesh = two_tile_mesh();
        let a = mesh.tile_at(0, 0, 0).unwrap();
        let b = mesh.tile_at(1, 0, 0).unwrap();

        assert_eq!(a.polys[0].links.len(), 1);
        assert_eq!(b.polys[0].links.len(), 1);
        assert_eq!(a.polys[0].links[0].side, Some(0));
        assert_eq!(b.polys[0].links[0].side, Some(4));

        let to_b = a.polys[0].links[0].neighbour;
        let (tile, _) = mesh.tile_and_poly_by_ref(to_b).unwrap();
        assert_eq!((tile.x, tile.y), (1, 0));
    }

    #[test]
    fn test_portal_points_on_border() {
        let mesh = two_tile_mesh();
        let a = mesh.query_polygons([5.0, 0.0, 5.0], [1.0; 3], &QueryFilter::default())[0];
        let b = mesh.query_polygons([15.0, 0.0, 5.0], [1.0; 3], &QueryFilter::default())[0];

        let (left, right) = mesh.portal_points(a, b).unwrap();
        assert_eq!(left[0], 10.0);
        assert_eq!(right[0], 10.0);
        assert!((left[2] - right[2]).abs() > 9.9);

        let (l2, r2) = mesh.portal_points(b, a).unwrap();
        assert!(math::vequal(l2, right));
        assert!(math::vequal(r2, left));
    }

    #[test]
    fn test_portal_points_not_adjacent() {
        let mesh = two_tile_mesh();
        let a = mesh.query_polygons([5.0, 0.0, 5.0], [1.0; 3], &QueryFilter::default())[0];
        assert!(matches!(
            mesh.portal_points(a, a),
            Err(NavError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_poly_ref_from_other_mesh_is_invalid() {
        let first = two_tile_mesh();
        let second = two_tile_mesh();
        let r = first.query_polygons([5.0, 0.0, 5.0], [1.0; 3], &QueryFilter::default())[0];

        assert!(first.is_valid_poly_ref(r));
        assert!(!second.is_valid_poly_ref(r));
        assert!(!first.is_valid_poly_ref(PolyRef::NULL));
        assert!(matches!(
            second.tile_and_poly_by_ref(r),
            Err(NavError::InvalidPolyRef(_))
        ));
    }

    #[test]
    fn test_query_polygons_respects_filter() {
        let mesh = two_tile_mesh();
        let all = QueryFilter::default();
        assert_eq!(mesh.query_polygons([10.0, 0.0, 5.0], [1.0; 3], &all).len(), 2);
        assert!(mesh
            .query_polygons([50.0, 0.0, 5.0], [1.0; 3], &all)
            .is_empty());

        let none = QueryFilter::new(0x10, 0);
        assert!(mesh
            .query_polygons([5.0, 0.0, 5.0], [1.0; 3], &none)
            .is_empty());
    }

    #[test]
    fn test_closest_point_on_poly() {
        let mesh = two_tile_mesh();
        let r = mesh.query_polygons([5.0, 0.0, 5.0], [1.0; 3], &QueryFilter::default())[0];

        let (p, over) = mesh.closest_point_on_poly(r, [5.0, 3.0, 5.0]).unwrap();
        assert!(over);
        assert_eq!(p, [5.0, 0.0, 5.0]);

        let (p, over) = mesh.closest_point_on_poly(r, [5.0, 0.0, -4.0]).unwrap();
        assert!(!over);
        assert!((p[2] - 0.0).abs() < 1e-5);
    }

    #[test]
    fn test_portal_range_partial_overlap() {
        let (lo, hi) = portal_range([10.0, 0.0, 0.0], [10.0, 0.0, 10.0], 5.0, 10.0, 0);
        assert_eq!(lo, 128);
        assert_eq!(hi, 255);
    }
}
