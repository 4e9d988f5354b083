//! Vector helpers. 2D operations work on the (x, z) plane; y is up.

pub(crate) type Vec3 = [f32; 3];

const EQUAL_THRESHOLD: f32 = (1.0 / 16384.0) * (1.0 / 16384.0);

#[inline]
pub(crate) fn vsub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub(crate) fn vlerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

#[inline]
pub(crate) fn vdist_sqr(a: Vec3, b: Vec3) -> f32 {
    let d = vsub(b, a);
    d[0] * d[0] + d[1] * d[1] + d[2] * d[2]
}

#[inline]
pub(crate) fn vdist(a: Vec3, b: Vec3) -> f32 {
    vdist_sqr(a, b).sqrt()
}

/// Points closer than 1/16384 units are the same point.
#[inline]
pub(crate) fn vequal(a: Vec3, b: Vec3) -> bool {
    vdist_sqr(a, b) < EQUAL_THRESHOLD
}

#[inline]
pub(crate) fn vperp_2d(u: Vec3, v: Vec3) -> f32 {
    u[2] * v[0] - u[0] * v[2]
}

/// Twice the signed area of triangle `abc` on the xz-plane.
#[inline]
pub(crate) fn tri_area_2d(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    let abx = b[0] - a[0];
    let abz = b[2] - a[2];
    let acx = c[0] - a[0];
    let acz = c[2] - a[2];
    acx * abz - abx * acz
}

pub(crate) fn overlap_bounds(amin: Vec3, amax: Vec3, bmin: Vec3, bmax: Vec3) -> bool {
    !(amin[0] > bmax[0]
        || amax[0] < bmin[0]
        || amin[1] > bmax[1]
        || amax[1] < bmin[1]
        || amin[2] > bmax[2]
        || amax[2] < bmin[2])
}

/// Squared xz distance from `pt` to segment `pq`, and the segment parameter
/// of the closest point.
pub(crate) fn dist_pt_seg_sqr_2d(pt: Vec3, p: Vec3, q: Vec3) -> (f32, f32) {
    let pqx = q[0] - p[0];
    let pqz = q[2] - p[2];
    let dx = pt[0] - p[0];
    let dz = pt[2] - p[2];
    let d = pqx * pqx + pqz * pqz;
    let mut t = pqx * dx + pqz * dz;
    if d > 0.0 {
        t /= d;
    }
    let t = t.clamp(0.0, 1.0);
    let dx = p[0] + t * pqx - pt[0];
    let dz = p[2] + t * pqz - pt[2];
    (dx * dx + dz * dz, t)
}

/// Whether `pt` lies inside the polygon on the xz-plane.
pub(crate) fn point_in_polygon(pt: Vec3, verts: &[Vec3]) -> bool {
    let n = verts.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let vi = verts[i];
        let vj = verts[j];
        if ((vi[2] > pt[2]) != (vj[2] > pt[2]))
            && (pt[0] < (vj[0] - vi[0]) * (pt[2] - vi[2]) / (vj[2] - vi[2]) + vi[0])
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Height of triangle `abc` under `p`, if `p` lies within it on the xz-plane.
pub(crate) fn closest_height_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let v0 = vsub(c, a);
    let v1 = vsub(b, a);
    let v2 = vsub(p, a);

    let mut denom = v0[0] * v1[2] - v0[2] * v1[0];
    if denom.abs() < 1e-6 {
        return None;
    }

    let mut u = v1[2] * v2[0] - v1[0] * v2[2];
    let mut v = v0[0] * v2[2] - v0[2] * v2[0];
    if denom < 0.0 {
        denom = -denom;
        u = -u;
        v = -v;
    }

    if u >= 0.0 && v >= 0.0 && (u + v) <= denom {
        Some(a[1] + (v0[1] * u + v1[1] * v) / denom)
    } else {
        None
    }
}

/// Height of the polygon under `p` using a triangle fan from the first vertex.
pub(crate) fn poly_height(p: Vec3, verts: &[Vec3]) -> Option<f32> {
    (1..verts.len().saturating_sub(1))
        .find_map(|i| closest_height_on_triangle(p, verts[0], verts[i], verts[i + 1]))
}

/// `p` itself when inside the polygon, otherwise the nearest point on its
/// boundary (xz distance).
pub(crate) fn closest_point_on_poly_boundary(p: Vec3, verts: &[Vec3]) -> Vec3 {
    if point_in_polygon(p, verts) {
        return p;
    }

    let n = verts.len();
    let mut best = (f32::MAX, 0usize, 0.0f32);
    for i in 0..n {
        let j = if i == 0 { n - 1 } else { i - 1 };
        let (d, t) = dist_pt_seg_sqr_2d(p, verts[j], verts[i]);
        if d < best.0 {
            best = (d, j, t);
        }
    }
    let (_, j, t) = best;
    vlerp(verts[j], verts[(j + 1) % n], t)
}

/// Intersection parameters `(s, t)` of lines `ap-aq` and `bp-bq` on the
/// xz-plane; `None` when parallel.
pub(crate) fn intersect_seg_seg_2d(ap: Vec3, aq: Vec3, bp: Vec3, bq: Vec3) -> Option<(f32, f32)> {
    let u = vsub(aq, ap);
    let v = vsub(bq, bp);
    let w = vsub(ap, bp);
    let d = vperp_2d(u, v);
    if d.abs() < 1e-6 {
        return None;
    }
    Some((vperp_2d(v, w) / d, vperp_2d(u, w) / d))
}
