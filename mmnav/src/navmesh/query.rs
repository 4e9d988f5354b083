//! Queries against a [`NavMesh`]: nearest polygon, A* corridor and the
//! funnel-based straight path.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use super::filter::QueryFilter;
use super::math::{self, Vec3};
use super::mesh::NavMesh;
use super::PolyRef;
use crate::error::{NavError, Result};

/// Default A* node budget.
pub const DEFAULT_MAX_NODES: usize = 65535;

/// Largest accepted A* node budget.
pub const MAX_NODES_LIMIT: usize = 65535;

/// Heuristic scale; slightly under 1 keeps the search admissible.
const H_SCALE: f32 = 0.999;

/// Which extra points [`NavMeshQuery::find_straight_path`] inserts where the
/// path crosses polygon edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossingMode {
    /// Funnel corners only.
    None,
    /// A point wherever the path enters a polygon of a different area.
    #[default]
    AreaCrossings,
    /// A point at every polygon edge crossed.
    AllCrossings,
}

/// Role of a point in a [`StraightPath`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StraightPathFlag {
    Start,
    /// Funnel corner.
    Corner,
    /// Edge crossing inserted by [`CrossingMode`].
    Crossing,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StraightPathPoint {
    pub pos: [f32; 3],
    pub flag: StraightPathFlag,
    /// Polygon entered at this point; the last corridor polygon for the end point.
    pub poly: PolyRef,
}

/// Result of [`NavMeshQuery::find_straight_path`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StraightPath {
    pub points: Vec<StraightPathPoint>,
    /// The point buffer filled up before the end point was reached.
    pub truncated: bool,
}

impl StraightPath {
    pub fn positions(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.points.iter().map(|p| p.pos)
    }
}

/// Result of [`NavMeshQuery::find_path`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathCorridor {
    /// Polygons from the start polygon onwards.
    pub polys: Vec<PolyRef>,
    /// The corridor ends at the polygon closest to the goal rather than the
    /// goal polygon.
    pub partial: bool,
    /// The search ran out of nodes.
    pub out_of_nodes: bool,
    /// The corridor was longer than the requested capacity and was cut.
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Open,
    Closed,
}

#[derive(Debug, Clone)]
struct Node {
    poly: PolyRef,
    pos: Vec3,
    cost: f32,
    total: f32,
    parent: Option<usize>,
    state: Option<NodeState>,
}

/// Open-list entry ordered so that [`BinaryHeap`] pops the lowest total.
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    total: f32,
    node: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .total
            .total_cmp(&self.total)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Bounded node storage for one search.
struct NodePool {
    nodes: Vec<Node>,
    index: HashMap<PolyRef, usize>,
    max_nodes: usize,
}

impl NodePool {
    fn new(max_nodes: usize) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            max_nodes,
        }
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
    }

    /// Existing node for `poly`, or a fresh one; `None` when the pool is full.
    fn get_or_insert(&mut self, poly: PolyRef) -> Option<usize> {
        if let Some(&i) = self.index.get(&poly) {
            return Some(i);
        }
        if self.nodes.len() >= self.max_nodes {
            return None;
        }
        let i = self.nodes.len();
        self.nodes.push(Node {
            poly,
            pos: [0.0; 3],
            cost: 0.0,
            total: 0.0,
            parent: None,
            state: None,
        });
        self.index.insert(poly, i);
        Some(i)
    }
}

/// Per-request query state over a shared [`NavMesh`].
///
/// Cheap to create; build one per request and drop it afterwards.
pub struct NavMeshQuery<'a> {
    mesh: &'a NavMesh,
    pool: NodePool,
}

impl<'a> NavMeshQuery<'a> {
    /// Create a query with room for `max_nodes` search nodes.
    ///
    /// # Errors
    ///
    /// [`NavError::InvalidQuery`] unless `1 <= max_nodes <= MAX_NODES_LIMIT`.
    pub fn new(mesh: &'a NavMesh, max_nodes: usize) -> Result<Self> {
        if max_nodes == 0 || max_nodes > MAX_NODES_LIMIT {
            return Err(NavError::InvalidQuery(format!(
                "max_nodes must be in 1..={}, got {}",
                MAX_NODES_LIMIT, max_nodes
            )));
        }
        Ok(Self {
            mesh,
            pool: NodePool::new(max_nodes),
        })
    }

    pub fn mesh(&self) -> &'a NavMesh {
        self.mesh
    }

    /// Polygon nearest to `center` within the box `center ± extents`, with
    /// the nearest point on it.
    ///
    /// When `center` lies over a polygon, vertical distance within the tile's
    /// walkable climb counts as zero.
    pub fn find_nearest_poly(
        &self,
        center: [f32; 3],
        extents: [f32; 3],
        filter: &QueryFilter,
    ) -> Result<Option<(PolyRef, [f32; 3])>> {
        if !is_finite(center) || !is_finite(extents) || extents.iter().any(|&e| e < 0.0) {
            return Err(NavError::InvalidQuery(format!(
                "bad search box {:?} ± {:?}",
                center, extents
            )));
        }

        let mut nearest = None;
        let mut nearest_dist = f32::MAX;
        for r in self.mesh.query_polygons(center, extents, filter) {
            let (tile, _) = self.mesh.tile_and_poly_by_ref(r)?;
            let (closest, over_poly) = self.mesh.closest_point_on_poly(r, center)?;

            let diff = math::vsub(center, closest);
            let d = if over_poly {
                let dy = diff[1].abs() - tile.walkable_climb;
                if dy > 0.0 {
                    dy * dy
                } else {
                    0.0
                }
            } else {
                math::vdist_sqr(center, closest)
            };

            if d < nearest_dist {
                nearest_dist = d;
                nearest = Some((r, closest));
            }
        }
        Ok(nearest)
    }

    /// A* search for the polygon corridor from `start_ref` to `end_ref`.
    ///
    /// At most `max_path` polygons are returned. When the goal cannot be
    /// reached the corridor leads to the explored polygon nearest to it and
    /// is flagged `partial`.
    pub fn find_path(
        &mut self,
        start_ref: PolyRef,
        end_ref: PolyRef,
        start_pos: [f32; 3],
        end_pos: [f32; 3],
        filter: &QueryFilter,
        max_path: usize,
    ) -> Result<PathCorridor> {
        let mesh = self.mesh;
        if !mesh.is_valid_poly_ref(start_ref) {
            return Err(NavError::InvalidPolyRef(start_ref));
        }
        if !mesh.is_valid_poly_ref(end_ref) {
            return Err(NavError::InvalidPolyRef(end_ref));
        }
        if !is_finite(start_pos) || !is_finite(end_pos) || max_path == 0 {
            return Err(NavError::InvalidQuery(
                "path endpoints must be finite and capacity non-zero".into(),
            ));
        }

        if start_ref == end_ref {
            return Ok(PathCorridor {
                polys: vec![start_ref],
                ..PathCorridor::default()
            });
        }

        self.pool.clear();
        let mut open = BinaryHeap::new();

        let start = self
            .pool
            .get_or_insert(start_ref)
            .ok_or_else(|| NavError::InvalidQuery("node pool exhausted".into()))?;
        {
            let node = &mut self.pool.nodes[start];
            node.pos = start_pos;
            node.cost = 0.0;
            node.total = math::vdist(start_pos, end_pos) * H_SCALE;
            node.state = Some(NodeState::Open);
            open.push(OpenEntry {
                total: node.total,
                node: start,
            });
        }

        let mut last_best = start;
        let mut last_best_cost = self.pool.nodes[start].total;
        let mut out_of_nodes = false;

        while let Some(entry) = open.pop() {
            let best = entry.node;
            {
                let node = &mut self.pool.nodes[best];
                if node.state == Some(NodeState::Closed) || entry.total != node.total {
                    continue;
                }
                node.state = Some(NodeState::Closed);
            }

            let best_ref = self.pool.nodes[best].poly;
            if best_ref == end_ref {
                last_best = best;
                break;
            }

            let (_, best_poly) = mesh.tile_and_poly_by_ref(best_ref)?;
            let parent_ref = self.pool.nodes[best].parent.map(|p| self.pool.nodes[p].poly);
            let best_pos = self.pool.nodes[best].pos;
            let best_cost = self.pool.nodes[best].cost;

            for link in &best_poly.links {
                let neighbour_ref = link.neighbour;
                if neighbour_ref.is_null() || Some(neighbour_ref) == parent_ref {
                    continue;
                }
                let (_, neighbour_poly) = mesh.tile_and_poly_by_ref(neighbour_ref)?;
                if !filter.pass_filter(neighbour_poly.flags) {
                    continue;
                }

                let Some(n) = self.pool.get_or_insert(neighbour_ref) else {
                    out_of_nodes = true;
                    continue;
                };

                if self.pool.nodes[n].state.is_none() {
                    let (left, right) = mesh.portal_points(best_ref, neighbour_ref)?;
                    self.pool.nodes[n].pos = math::vlerp(left, right, 0.5);
                }
                let neighbour_pos = self.pool.nodes[n].pos;

                let (cost, heuristic) = if neighbour_ref == end_ref {
                    let cur = filter.cost(best_pos, neighbour_pos, best_poly.area);
                    let end = filter.cost(neighbour_pos, end_pos, neighbour_poly.area);
                    (best_cost + cur + end, 0.0)
                } else {
                    let cur = filter.cost(best_pos, neighbour_pos, best_poly.area);
                    (
                        best_cost + cur,
                        math::vdist(neighbour_pos, end_pos) * H_SCALE,
                    )
                };
                let total = cost + heuristic;

                let node = &mut self.pool.nodes[n];
                if node.state.is_some() && total >= node.total {
                    continue;
                }
                node.parent = Some(best);
                node.cost = cost;
                node.total = total;
                node.state = Some(NodeState::Open);
                open.push(OpenEntry { total, node: n });

                if heuristic < last_best_cost {
                    last_best_cost = heuristic;
                    last_best = n;
                }
            }
        }

        let (polys, truncated) = self.path_to_node(last_best, max_path);
        Ok(PathCorridor {
            partial: self.pool.nodes[last_best].poly != end_ref,
            polys,
            out_of_nodes,
            truncated,
        })
    }

    /// Walk parents back from `node`, keeping the first `max_path` polygons.
    fn path_to_node(&self, node: usize, max_path: usize) -> (Vec<PolyRef>, bool) {
        let mut path = Vec::new();
        let mut cur = Some(node);
        while let Some(i) = cur {
            path.push(self.pool.nodes[i].poly);
            cur = self.pool.nodes[i].parent;
        }
        path.reverse();

        let truncated = path.len() > max_path;
        path.truncate(max_path);
        (path, truncated)
    }

    /// Straight path from `start_pos` to `end_pos` through `corridor`.
    ///
    /// Both endpoints are clamped onto the first and last corridor polygon.
    /// At most `max_points` points are produced; a longer path is cut and
    /// flagged `truncated`.
    pub fn find_straight_path(
        &self,
        start_pos: [f32; 3],
        end_pos: [f32; 3],
        corridor: &[PolyRef],
        max_points: usize,
        crossings: CrossingMode,
    ) -> Result<StraightPath> {
        let (Some(&first), Some(&last)) = (corridor.first(), corridor.last()) else {
            return Err(NavError::InvalidQuery("empty corridor".into()));
        };
        if max_points == 0 || !is_finite(start_pos) || !is_finite(end_pos) {
            return Err(NavError::InvalidQuery(
                "path endpoints must be finite and capacity non-zero".into(),
            ));
        }

        let start = self.closest_point_on_poly_boundary(first, start_pos)?;
        let mut end = self.closest_point_on_poly_boundary(last, end_pos)?;

        let mut out = PointBuffer::new(max_points);
        if out.append(start, StraightPathFlag::Start, first) == Append::Done {
            return Ok(out.finish());
        }

        let n = corridor.len();
        if n > 1 {
            let mut apex = start;
            let mut portal_left = apex;
            let mut portal_right = apex;
            let mut apex_index = 0;
            let mut left_index = 0;
            let mut right_index = 0;
            let mut left_poly = Some(first);
            let mut right_poly = Some(first);

            let mut i = 0;
            while i < n {
                let (left, right) = if i + 1 < n {
                    match self.mesh.portal_points(corridor[i], corridor[i + 1]) {
                        Ok(portal) => portal,
                        Err(_) => {
                            // Broken corridor: stop at the last reachable polygon.
                            end = self.closest_point_on_poly_boundary(corridor[i], end_pos)?;
                            if self.append_portals(
                                &mut out,
                                apex_index,
                                i,
                                end,
                                corridor,
                                crossings,
                            )? == Append::InProgress
                            {
                                out.append(end, StraightPathFlag::End, corridor[i]);
                            }
                            return Ok(out.finish());
                        }
                    }
                } else {
                    (end, end)
                };

                if i == 0 && i + 1 < n {
                    let (d, _) = math::dist_pt_seg_sqr_2d(apex, left, right);
                    if d < 0.001 * 0.001 {
                        i += 1;
                        continue;
                    }
                }

                let next_poly = corridor.get(i + 1).copied();

                // right side of the funnel
                if math::tri_area_2d(apex, portal_right, right) <= 0.0 {
                    if math::vequal(apex, portal_right)
                        || math::tri_area_2d(apex, portal_left, right) > 0.0
                    {
                        portal_right = right;
                        right_poly = next_poly;
                        right_index = i;
                    } else {
                        if self.append_portals(
                            &mut out,
                            apex_index,
                            left_index,
                            portal_left,
                            corridor,
                            crossings,
                        )? == Append::Done
                        {
                            return Ok(out.finish());
                        }
                        apex = portal_left;
                        apex_index = left_index;
                        let (flag, poly) = corner(left_poly, last);
                        if out.append(apex, flag, poly) == Append::Done {
                            return Ok(out.finish());
                        }
                        portal_left = apex;
                        portal_right = apex;
                        left_index = apex_index;
                        right_index = apex_index;
                        i = apex_index + 1;
                        continue;
                    }
                }

                // left side of the funnel
                if math::tri_area_2d(apex, portal_left, left) >= 0.0 {
                    if math::vequal(apex, portal_left)
                        || math::tri_area_2d(apex, portal_right, left) < 0.0
                    {
                        portal_left = left;
                        left_poly = next_poly;
                        left_index = i;
                    } else {
                        if self.append_portals(
                            &mut out,
                            apex_index,
                            right_index,
                            portal_right,
                            corridor,
                            crossings,
                        )? == Append::Done
                        {
                            return Ok(out.finish());
                        }
                        apex = portal_right;
                        apex_index = right_index;
                        let (flag, poly) = corner(right_poly, last);
                        if out.append(apex, flag, poly) == Append::Done {
                            return Ok(out.finish());
                        }
                        portal_left = apex;
                        portal_right = apex;
                        left_index = apex_index;
                        right_index = apex_index;
                        i = apex_index + 1;
                        continue;
                    }
                }

                i += 1;
            }

            if self.append_portals(&mut out, apex_index, n - 1, end, corridor, crossings)?
                == Append::Done
            {
                return Ok(out.finish());
            }
        }

        out.append(end, StraightPathFlag::End, last);
        Ok(out.finish())
    }

    /// Insert crossing points of segment `last point -> end_pos` with the
    /// portals between `corridor[start_index..=end_index]`.
    fn append_portals(
        &self,
        out: &mut PointBuffer,
        start_index: usize,
        end_index: usize,
        end_pos: Vec3,
        corridor: &[PolyRef],
        crossings: CrossingMode,
    ) -> Result<Append> {
        if crossings == CrossingMode::None {
            return Ok(Append::InProgress);
        }
        let Some(start_pos) = out.last_pos() else {
            return Ok(Append::InProgress);
        };

        for i in start_index..end_index {
            let from = corridor[i];
            let to = corridor[i + 1];
            let Ok((left, right)) = self.mesh.portal_points(from, to) else {
                break;
            };

            if crossings == CrossingMode::AreaCrossings {
                let (_, from_poly) = self.mesh.tile_and_poly_by_ref(from)?;
                let (_, to_poly) = self.mesh.tile_and_poly_by_ref(to)?;
                if from_poly.area == to_poly.area {
                    continue;
                }
            }

            if let Some((_, t)) = math::intersect_seg_seg_2d(start_pos, end_pos, left, right) {
                let pt = math::vlerp(left, right, t);
                if out.append(pt, StraightPathFlag::Crossing, to) == Append::Done {
                    return Ok(Append::Done);
                }
            }
        }
        Ok(Append::InProgress)
    }

    fn closest_point_on_poly_boundary(&self, r: PolyRef, pos: Vec3) -> Result<Vec3> {
        let (tile, poly) = self.mesh.tile_and_poly_by_ref(r)?;
        Ok(math::closest_point_on_poly_boundary(pos, &tile.poly_verts(poly)))
    }
}

/// Flag and polygon for a funnel apex; the apex is the end point when no
/// polygon follows it.
fn corner(poly: Option<PolyRef>, last: PolyRef) -> (StraightPathFlag, PolyRef) {
    match poly {
        Some(p) => (StraightPathFlag::Corner, p),
        None => (StraightPathFlag::End, last),
    }
}

fn is_finite(v: [f32; 3]) -> bool {
    v.iter().all(|c| c.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Append {
    InProgress,
    /// The end point was written or the buffer is full.
    Done,
}

struct PointBuffer {
    points: Vec<StraightPathPoint>,
    max: usize,
}

impl PointBuffer {
    fn new(max: usize) -> Self {
        Self {
            points: Vec::with_capacity(max.min(256)),
            max,
        }
    }

    fn last_pos(&self) -> Option<Vec3> {
        self.points.last().map(|p| p.pos)
    }

    fn append(&mut self, pos: Vec3, flag: StraightPathFlag, poly: PolyRef) -> Append {
        if let Some(last) = self.points.last_mut() {
            if math::vequal(last.pos, pos) {
                // Same spot: keep the later role.
                last.flag = flag;
                last.poly = poly;
                return if flag == StraightPathFlag::End {
                    Append::Done
                } else {
                    Append::InProgress
                };
            }
        }

        self.points.push(StraightPathPoint { pos, flag, poly });
        if flag == StraightPathFlag::End || self.points.len() >= self.max {
            Append::Done
        } else {
            Append::InProgress
        }
    }

    fn finish(self) -> StraightPath {
        let truncated = self
            .points
            .last()
            .map_or(true, |p| p.flag != StraightPathFlag::End);
        StraightPath {
            points: self.points,
            truncated,
        }
    }
}
