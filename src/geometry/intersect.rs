//! Projected triangle–triangle intersection predicates.
//!
//! The *source* triangle carries a location and a normal per vertex; it is
//! projected along those normals onto the *target* triangle, which is three
//! locations only. Intersection membership is decided by signed offsets of
//! points against projected edges. Each predicate takes a direction flag so
//! both sides of a shared edge evaluate the exact same floating-point
//! expression: results are antisymmetric under edge reversal and shared
//! edges are never double-counted.

use crate::geometry::metrics::{self, Point, Vector};

/// Signed offset of a target point against the surface swept by a source
/// edge projected along its endpoint normals.
///
/// Positive when `tgt_p` lies on the left of the directed edge, looking
/// against the projection direction. `src_direction` states whether the
/// edge is passed in its canonical order; passing `false` evaluates the
/// reversed edge and negates, so the two orders agree exactly.
pub fn src_edge_tgt_point_offset(
    src_ps: [Point; 2],
    src_ns: [Vector; 2],
    tgt_p: Point,
    src_direction: bool,
) -> f64 {
    if src_direction {
        raw_edge_point_offset(src_ps[0], src_ps[1], src_ns[0], src_ns[1], tgt_p)
    } else {
        -raw_edge_point_offset(src_ps[1], src_ps[0], src_ns[1], src_ns[0], tgt_p)
    }
}

/// Signed offset of a projected source point against a target edge.
///
/// The plane of reference contains the target edge and the source point's
/// projection direction; `tgt_direction` plays the same role as in
/// [`src_edge_tgt_point_offset`].
pub fn src_point_tgt_edge_offset(
    src_p: Point,
    src_n: Vector,
    tgt_ps: [Point; 2],
    tgt_direction: bool,
) -> f64 {
    if tgt_direction {
        raw_point_edge_offset(src_p, src_n, tgt_ps[0], tgt_ps[1])
    } else {
        -raw_point_edge_offset(src_p, src_n, tgt_ps[1], tgt_ps[0])
    }
}

/// Intersection of a target edge with a projected source edge's surface.
///
/// Returns the local coordinates of the crossing along the source edge and
/// along the target edge, each in `[0, 1]` when they actually cross.
pub fn src_edge_tgt_edge_intersection(
    src_ps: [Point; 2],
    src_ns: [Vector; 2],
    tgt_ps: [Point; 2],
) -> [f64; 2] {
    // Target parameter from the offsets of the target endpoints against
    // the source edge surface.
    let o0 = raw_edge_point_offset(src_ps[0], src_ps[1], src_ns[0], src_ns[1], tgt_ps[0]);
    let o1 = raw_edge_point_offset(src_ps[0], src_ps[1], src_ns[0], src_ns[1], tgt_ps[1]);
    let t = safe_fraction(o0, o1);

    // Source parameter from the offsets of the source endpoints against
    // the target edge.
    let p0 = raw_point_edge_offset(src_ps[0], src_ns[0], tgt_ps[0], tgt_ps[1]);
    let p1 = raw_point_edge_offset(src_ps[1], src_ns[1], tgt_ps[0], tgt_ps[1]);
    let s = safe_fraction(p0, p1);

    [s, t]
}

/// Clip the target triangle by the three projected edges of the source
/// triangle, returning the intersection polygon (empty when disjoint).
///
/// Source vertices wind counter-clockwise seen against the projection
/// direction, so "inside" is a non-negative offset against every edge.
pub fn clip_tgt_tri(src_ps: [Point; 3], src_ns: [Vector; 3], tgt_ps: [Point; 3]) -> Vec<Point> {
    let mut polygon: Vec<Point> = tgt_ps.to_vec();

    for e in 0..3 {
        if polygon.is_empty() {
            break;
        }
        let ps = [src_ps[e], src_ps[(e + 1) % 3]];
        let ns = [src_ns[e], src_ns[(e + 1) % 3]];

        let offsets: Vec<f64> = polygon
            .iter()
            .map(|&p| src_edge_tgt_point_offset(ps, ns, p, true))
            .collect();

        let mut clipped = Vec::with_capacity(polygon.len() + 1);
        for i in 0..polygon.len() {
            let j = (i + 1) % polygon.len();
            let (pi, pj) = (polygon[i], polygon[j]);
            let (oi, oj) = (offsets[i], offsets[j]);
            if oi >= 0.0 {
                clipped.push(pi);
            }
            if (oi >= 0.0) != (oj >= 0.0) {
                let t = safe_fraction(oi, oj);
                clipped.push(metrics::add(pi, metrics::scale(t, metrics::sub(pj, pi))));
            }
        }
        polygon = clipped;
    }
    polygon
}

/// Offset of `x` against the ruled surface of edge `(p0, p1)` projected
/// along normals `(n0, n1)`. Exactly antisymmetric under edge reversal:
/// the offset vector is orthogonal to the edge, so the base-point change
/// cancels.
fn raw_edge_point_offset(p0: Point, p1: Point, n0: Vector, n1: Vector, x: Point) -> f64 {
    let edge = metrics::sub(p1, p0);
    let n = metrics::scale(0.5, metrics::add(n0, n1));
    metrics::dot(metrics::sub(x, p0), metrics::cross(edge, n))
}

/// Offset of the line through `p` along `n` against edge `(t0, t1)`.
fn raw_point_edge_offset(p: Point, n: Vector, t0: Point, t1: Point) -> f64 {
    metrics::dot(
        metrics::sub(p, t0),
        metrics::cross(metrics::sub(t1, t0), n),
    )
}

/// `o0 / (o0 - o1)` guarded against a vanishing denominator.
fn safe_fraction(o0: f64, o1: f64) -> f64 {
    let den = o0 - o1;
    if den.abs() < metrics::EPS {
        0.5
    } else {
        o0 / den
    }
}
