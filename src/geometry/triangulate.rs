//! Triangulation of three-dimensional polygons.
//!
//! [`PolygonTriangulate`] is a reusable workspace that decomposes a planar
//! (or nearly planar) polygon into `n - 2` triangles:
//!
//! - *Simple* polygons are ear-clipped: each round removes the convex vertex
//!   whose diagonal triangle contains no other polygon vertex, preferring
//!   the ear with the best projected quality so slivers are clipped late.
//! - Polygons whose boundary self-intersects in the projection plane are
//!   first partitioned: a spanning triangle is inserted between a point and
//!   a non-adjacent edge involved in the intersection, and the two resulting
//!   sub-polygons are triangulated recursively.
//! - An optional optimization pass flips the diagonal of adjacent triangle
//!   pairs when the flip strictly improves the worse of the two; a memoized
//!   set of already-tried triangles prevents flip cycles.
//!
//! The workspace keeps its scratch allocations between calls; results are
//! valid until the next `triangulate` call.

use hashbrown::{HashMap, HashSet};

use crate::geometry::metrics::{
    self, Point, Vector, edges_intersect, point_in_tri, tri_area_projected,
    tri_quality_projected, wedge_angle,
};
use crate::mesh_error::MeshPlicError;

/// A triangle as three indices into the polygon's point list.
pub type TriFace = [usize; 3];

/// Maximum recursion depth of the self-intersection partition step.
const MAX_PARTITION_DEPTH: usize = 32;

/// Triangulation workspace for three-dimensional polygons.
#[derive(Debug, Default)]
pub struct PolygonTriangulate {
    // Per-call scratch for the active (so far un-triangulated) polygon.
    poly: Vec<usize>,
    angle: Vec<f64>,
    ear: Vec<bool>,

    // Edge table shared by all triangles of one invocation.
    edges: Vec<(usize, usize)>,
    edge_of: HashMap<(usize, usize), usize>,

    // Previously tried triangle configurations, to stop flip cycles.
    tried: HashSet<TriFace>,

    // Outputs.
    tri_points: Vec<TriFace>,
    tri_edges: Vec<[usize; 3]>,
    edge_tris: Vec<[Option<usize>; 2]>,
}

impl PolygonTriangulate {
    pub fn new() -> Self {
        Self::default()
    }

    /// The triangles of the last call, as polygon point indices.
    pub fn tri_points(&self) -> &[TriFace] {
        &self.tri_points
    }

    /// The triangles of the last call, renumbered through `poly_points`.
    pub fn tri_points_renumbered(&self, poly_points: &[usize]) -> Vec<TriFace> {
        self.tri_points
            .iter()
            .map(|t| [poly_points[t[0]], poly_points[t[1]], poly_points[t[2]]])
            .collect()
    }

    /// Per-triangle edge indices into [`PolygonTriangulate::edge_list`].
    pub fn tri_edges(&self) -> &[[usize; 3]] {
        &self.tri_edges
    }

    /// Per-edge adjacent triangles; boundary edges have one entry.
    pub fn edge_tris(&self) -> &[[Option<usize>; 2]] {
        &self.edge_tris
    }

    /// The edge table of the last call.
    pub fn edge_list(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Triangulate `points` with the plane normal inferred from the polygon
    /// area vector.
    pub fn triangulate_auto(
        &mut self,
        points: &[Point],
        simple: bool,
        optimal: bool,
    ) -> Result<&[TriFace], MeshPlicError> {
        let normal = polygon_area_vector(points);
        if metrics::norm(normal) < metrics::EPS {
            return Err(MeshPlicError::DegenerateGeometry(format!(
                "polygon of {} points has zero area vector",
                points.len()
            )));
        }
        self.triangulate(points, normal, simple, optimal)
    }

    /// Triangulate `points` within the plane orthogonal to `normal`.
    ///
    /// `simple` skips self-intersection detection; `optimal` enables the
    /// edge-flip pass. Returns the triangles, `points.len() - 2` of them.
    pub fn triangulate(
        &mut self,
        points: &[Point],
        normal: Vector,
        simple: bool,
        optimal: bool,
    ) -> Result<&[TriFace], MeshPlicError> {
        let n = points.len();
        if n < 3 {
            return Err(MeshPlicError::DegenerateGeometry(format!(
                "cannot triangulate a polygon of {n} points"
            )));
        }
        let area = metrics::dot(polygon_area_vector(points), metrics::normalised(normal));
        let perim_sqr: f64 = (0..n)
            .map(|i| metrics::dist_sqr(points[i], points[(i + 1) % n]))
            .sum();
        if area.abs() < metrics::GEOM_TOL * perim_sqr.max(metrics::EPS) {
            return Err(MeshPlicError::DegenerateGeometry(format!(
                "polygon of {n} points has zero projected area"
            )));
        }

        self.edges.clear();
        self.edge_of.clear();
        self.tried.clear();
        self.tri_points.clear();
        self.tri_edges.clear();
        self.edge_tris.clear();

        let all: Vec<usize> = (0..n).collect();
        if simple {
            self.simple_triangulate(&all, points, normal);
        } else {
            self.complex_triangulate(&all, points, normal, 0);
        }

        if optimal {
            self.optimise_triangulation(points, normal);
        }

        debug_assert_eq!(self.tri_points.len(), n - 2);
        Ok(&self.tri_points)
    }

    // --- construction helpers -------------------------------------------------

    fn edge_index(&mut self, a: usize, b: usize) -> usize {
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(&e) = self.edge_of.get(&key) {
            return e;
        }
        let e = self.edges.len();
        self.edges.push(key);
        self.edge_of.insert(key, e);
        self.edge_tris.push([None, None]);
        e
    }

    fn add_tri(&mut self, a: usize, b: usize, c: usize) {
        let ti = self.tri_points.len();
        self.tri_points.push([a, b, c]);
        let ea = self.edge_index(a, b);
        let eb = self.edge_index(b, c);
        let ec = self.edge_index(c, a);
        self.tri_edges.push([ea, eb, ec]);
        for e in [ea, eb, ec] {
            let slot = &mut self.edge_tris[e];
            if slot[0].is_none() {
                slot[0] = Some(ti);
            } else if slot[1].is_none() {
                slot[1] = Some(ti);
            }
        }
    }

    fn detach_tri(&mut self, ti: usize) {
        for e in self.tri_edges[ti] {
            let slot = &mut self.edge_tris[e];
            if slot[0] == Some(ti) {
                slot[0] = slot[1].take();
            } else if slot[1] == Some(ti) {
                slot[1] = None;
            }
        }
    }

    fn retach_tri(&mut self, ti: usize, tri: TriFace) {
        self.tri_points[ti] = tri;
        let ea = self.edge_index(tri[0], tri[1]);
        let eb = self.edge_index(tri[1], tri[2]);
        let ec = self.edge_index(tri[2], tri[0]);
        self.tri_edges[ti] = [ea, eb, ec];
        for e in [ea, eb, ec] {
            let slot = &mut self.edge_tris[e];
            if slot[0].is_none() {
                slot[0] = Some(ti);
            } else if slot[1].is_none() && slot[0] != Some(ti) {
                slot[1] = Some(ti);
            }
        }
    }

    // --- ear clipping ---------------------------------------------------------

    fn ear_at(&self, pos: usize, points: &[Point], normal: Vector) -> bool {
        let m = self.poly.len();
        let prev = self.poly[(pos + m - 1) % m];
        let this = self.poly[pos];
        let next = self.poly[(pos + 1) % m];
        if self.angle[pos] >= std::f64::consts::PI {
            return false;
        }
        // The diagonal triangle must contain no other active vertex.
        for (k, &p) in self.poly.iter().enumerate() {
            if k == pos || p == prev || p == next {
                continue;
            }
            if point_in_tri(points[p], points[prev], points[this], points[next], normal) {
                return false;
            }
        }
        true
    }

    /// Ear-clip a simple (non-self-intersecting) polygon given as point
    /// indices in boundary order.
    fn simple_triangulate(&mut self, poly: &[usize], points: &[Point], normal: Vector) {
        self.poly.clear();
        self.poly.extend_from_slice(poly);
        let m = self.poly.len();

        self.angle.clear();
        self.angle.resize(m, 0.0);
        self.ear.clear();
        self.ear.resize(m, false);
        for pos in 0..m {
            self.angle[pos] = self.vertex_angle(pos, points, normal);
        }
        for pos in 0..m {
            self.ear[pos] = self.ear_at(pos, points, normal);
        }

        while self.poly.len() > 3 {
            let m = self.poly.len();
            // Best-quality ear; fall back to the best-quality vertex when
            // numerics leave no ear at all.
            let mut best: Option<(usize, f64)> = None;
            for pos in 0..m {
                if !self.ear[pos] {
                    continue;
                }
                let q = self.clip_quality(pos, points, normal);
                if best.map_or(true, |(_, bq)| q > bq) {
                    best = Some((pos, q));
                }
            }
            let pos = match best {
                Some((pos, _)) => pos,
                None => {
                    // Removing a vertex can turn distant vertices into ears;
                    // refresh all flags before giving up on ears entirely.
                    for k in 0..m {
                        self.ear[k] = self.ear_at(k, points, normal);
                    }
                    let candidates: Vec<usize> = if self.ear.iter().any(|&e| e) {
                        (0..m).filter(|&k| self.ear[k]).collect()
                    } else {
                        (0..m).collect()
                    };
                    candidates
                        .into_iter()
                        .max_by(|&i, &j| {
                            self.clip_quality(i, points, normal)
                                .total_cmp(&self.clip_quality(j, points, normal))
                        })
                        .unwrap()
                }
            };

            let prev = self.poly[(pos + m - 1) % m];
            let this = self.poly[pos];
            let next = self.poly[(pos + 1) % m];
            self.add_tri(prev, this, next);

            self.poly.remove(pos);
            self.angle.remove(pos);
            self.ear.remove(pos);
            let m = self.poly.len();
            for nb in [(pos + m - 1) % m, pos % m] {
                self.angle[nb] = self.vertex_angle(nb, points, normal);
            }
            for nb in [(pos + m - 1) % m, pos % m] {
                self.ear[nb] = self.ear_at(nb, points, normal);
            }
        }
        self.add_tri(self.poly[0], self.poly[1], self.poly[2]);
    }

    fn vertex_angle(&self, pos: usize, points: &[Point], normal: Vector) -> f64 {
        let m = self.poly.len();
        let prev = self.poly[(pos + m - 1) % m];
        let this = self.poly[pos];
        let next = self.poly[(pos + 1) % m];
        wedge_angle(points[prev], points[this], points[next], normal)
    }

    fn clip_quality(&self, pos: usize, points: &[Point], normal: Vector) -> f64 {
        let m = self.poly.len();
        let prev = self.poly[(pos + m - 1) % m];
        let this = self.poly[pos];
        let next = self.poly[(pos + 1) % m];
        tri_quality_projected(points[prev], points[this], points[next], normal)
    }

    // --- self-intersection partitioning --------------------------------------

    /// Find a pair of non-adjacent boundary edges of `poly` that intersect
    /// in the projection plane.
    fn find_self_intersection(
        poly: &[usize],
        points: &[Point],
        normal: Vector,
    ) -> Option<(usize, usize)> {
        let m = poly.len();
        for i in 0..m {
            for j in i + 2..m {
                // Skip adjacent edges (including the wrap-around pair).
                if i == 0 && j == m - 1 {
                    continue;
                }
                let (a0, a1) = (points[poly[i]], points[poly[(i + 1) % m]]);
                let (b0, b1) = (points[poly[j]], points[poly[(j + 1) % m]]);
                if edges_intersect(a0, a1, b0, b1, normal) {
                    return Some((i, j));
                }
            }
        }
        None
    }

    /// Insert a spanning triangle between vertex `span_pos` and edge
    /// `span_edge` of `poly`, then recurse into the two sub-polygons.
    fn partition_triangulate(
        &mut self,
        poly: &[usize],
        points: &[Point],
        normal: Vector,
        span_pos: usize,
        span_edge: usize,
        depth: usize,
    ) {
        let m = poly.len();
        let e0 = span_edge;
        let e1 = (span_edge + 1) % m;
        self.add_tri(poly[span_pos], poly[e0], poly[e1]);

        // Sub-polygon from the span point forward to the edge start, and
        // from the edge end forward back to the span point.
        let mut sub_a = Vec::new();
        let mut k = span_pos;
        loop {
            sub_a.push(poly[k]);
            if k == e0 {
                break;
            }
            k = (k + 1) % m;
        }
        let mut sub_b = Vec::new();
        let mut k = e1;
        loop {
            sub_b.push(poly[k]);
            if k == span_pos {
                break;
            }
            k = (k + 1) % m;
        }

        for sub in [sub_a, sub_b] {
            if sub.len() >= 3 {
                self.complex_triangulate(&sub, points, normal, depth + 1);
            }
        }
    }

    /// Triangulate `poly`, resolving boundary self-intersections by
    /// partitioning before ear clipping.
    fn complex_triangulate(
        &mut self,
        poly: &[usize],
        points: &[Point],
        normal: Vector,
        depth: usize,
    ) {
        if depth < MAX_PARTITION_DEPTH {
            if let Some((ei, ej)) = Self::find_self_intersection(poly, points, normal) {
                // Span between the first vertex of the earlier edge and the
                // later edge; both sub-polygons lose the crossing.
                self.partition_triangulate(poly, points, normal, ei, ej, depth);
                return;
            }
        }
        self.simple_triangulate(poly, points, normal);
    }

    // --- edge-flip optimization ----------------------------------------------

    fn optimise_triangulation(&mut self, points: &[Point], normal: Vector) {
        loop {
            let mut flipped = false;
            for e in 0..self.edges.len() {
                if self.try_flip(e, points, normal) {
                    flipped = true;
                }
            }
            if !flipped {
                break;
            }
        }
    }

    /// Flip the diagonal `e` shared by two triangles when that strictly
    /// improves the worse of the pair. Returns whether a flip happened.
    fn try_flip(&mut self, e: usize, points: &[Point], normal: Vector) -> bool {
        let [Some(t0), Some(t1)] = self.edge_tris[e] else {
            return false;
        };
        let (ea, eb) = self.edges[e];
        // Orient the shared edge as traversed by t0 so the flipped pair
        // keeps the winding of the originals.
        let Some((a, b)) = directed_in(self.tri_points[t0], ea, eb) else {
            return false;
        };
        let Some(c) = third_vertex(self.tri_points[t0], a, b) else {
            return false;
        };
        let Some(d) = third_vertex(self.tri_points[t1], a, b) else {
            return false;
        };

        // Candidate pair after flipping ab → cd.
        let new0 = [a, d, c];
        let new1 = [d, b, c];

        // Previously tried configurations are not revisited.
        if self.tried.contains(&canonical(new0)) && self.tried.contains(&canonical(new1)) {
            return false;
        }

        let q = |t: TriFace| tri_quality_projected(points[t[0]], points[t[1]], points[t[2]], normal);
        let old_worst = q(self.tri_points[t0]).min(q(self.tri_points[t1]));
        let new_worst = q(new0).min(q(new1));

        self.tried.insert(canonical(new0));
        self.tried.insert(canonical(new1));

        if new_worst <= old_worst + metrics::GEOM_TOL {
            return false;
        }

        self.detach_tri(t0);
        self.detach_tri(t1);
        self.retach_tri(t0, new0);
        self.retach_tri(t1, new1);
        true
    }
}

/// Area vector of a polygon (Newell's method); its direction is the
/// right-handed normal of the boundary orientation.
pub fn polygon_area_vector(points: &[Point]) -> Vector {
    let n = points.len();
    let mut area = [0.0f64; 3];
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = metrics::cross(a, b);
        area = metrics::add(area, c);
    }
    metrics::scale(0.5, area)
}

/// Signed area of a polygon projected on `normal`.
pub fn polygon_area_projected(points: &[Point], normal: Vector) -> f64 {
    metrics::dot(polygon_area_vector(points), metrics::normalised(normal))
}

fn third_vertex(tri: TriFace, a: usize, b: usize) -> Option<usize> {
    tri.into_iter().find(|&v| v != a && v != b)
}

fn canonical(mut tri: TriFace) -> TriFace {
    tri.sort_unstable();
    tri
}

/// The edge `{a, b}` as directed within `tri`'s winding, if present.
fn directed_in(tri: TriFace, a: usize, b: usize) -> Option<(usize, usize)> {
    for k in 0..3 {
        let (p, q) = (tri[k], tri[(k + 1) % 3]);
        if (p, q) == (a, b) {
            return Some((a, b));
        }
        if (p, q) == (b, a) {
            return Some((b, a));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const Z: Vector = [0.0, 0.0, 1.0];

    fn square() -> Vec<Point> {
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ]
    }

    #[test]
    fn square_gives_two_triangles() {
        let pts = square();
        let mut tri = PolygonTriangulate::new();
        let tris = tri.triangulate(&pts, Z, false, true).unwrap();
        assert_eq!(tris.len(), 2);
        let area: f64 = tris
            .iter()
            .map(|t| tri_area_projected(pts[t[0]], pts[t[1]], pts[t[2]], Z))
            .sum();
        assert!((area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn concave_polygon_triangulates() {
        // L-shape, counter-clockwise.
        let pts: Vec<Point> = vec![
            [0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [2.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [1.0, 2.0, 0.0],
            [0.0, 2.0, 0.0],
        ];
        let mut tri = PolygonTriangulate::new();
        let tris = tri.triangulate(&pts, Z, false, true).unwrap();
        assert_eq!(tris.len(), pts.len() - 2);
        let area: f64 = tris
            .iter()
            .map(|t| tri_area_projected(pts[t[0]], pts[t[1]], pts[t[2]], Z))
            .sum();
        assert!((area - 3.0).abs() < 1e-10, "area = {area}");
    }

    #[test]
    fn degenerate_inputs_error() {
        let mut tri = PolygonTriangulate::new();
        assert!(matches!(
            tri.triangulate(&[[0.0; 3], [1.0, 0.0, 0.0]], Z, false, true),
            Err(MeshPlicError::DegenerateGeometry(_))
        ));
        let collinear = [[0.0; 3], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        assert!(matches!(
            tri.triangulate(&collinear, Z, false, true),
            Err(MeshPlicError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn workspace_reuse_resets_state() {
        let mut tri = PolygonTriangulate::new();
        tri.triangulate(&square(), Z, false, true).unwrap();
        let pts: Vec<Point> = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.5, 1.0, 0.0],
        ];
        let tris = tri.triangulate(&pts, Z, false, true).unwrap();
        assert_eq!(tris.len(), 1);
        assert_eq!(tri.edge_list().len(), 3);
    }

    #[test]
    fn edge_tri_tables_are_consistent() {
        let mut tri = PolygonTriangulate::new();
        tri.triangulate(&square(), Z, true, false).unwrap();
        // Every triangle's edges must list it back.
        for (ti, edges) in tri.tri_edges().iter().enumerate() {
            for &e in edges {
                assert!(tri.edge_tris()[e].contains(&Some(ti)));
            }
        }
        // A quad has one interior diagonal.
        let interior = tri
            .edge_tris()
            .iter()
            .filter(|slot| slot.iter().all(Option::is_some))
            .count();
        assert_eq!(interior, 1);
    }
}
