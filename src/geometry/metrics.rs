//! Vector and triangle primitives shared by the triangulation, intersection
//! and cutting algorithms.
//!
//! Points and vectors are plain `[f64; 3]`. Planar quantities (areas,
//! angles, intersection tests) are evaluated as projections onto a caller
//! supplied plane normal, so nearly-planar polygons embedded in 3D behave
//! consistently.

pub type Point = [f64; 3];
pub type Vector = [f64; 3];

pub(crate) const EPS: f64 = 1e-12;

/// Small relative tolerance used by geometric predicates.
pub const GEOM_TOL: f64 = 1e-10;

#[inline]
pub fn add(a: Vector, b: Vector) -> Vector {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn sub(a: Vector, b: Vector) -> Vector {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn scale(s: f64, v: Vector) -> Vector {
    [s * v[0], s * v[1], s * v[2]]
}

#[inline]
pub fn dot(a: Vector, b: Vector) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn cross(a: Vector, b: Vector) -> Vector {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub fn norm(v: Vector) -> f64 {
    dot(v, v).sqrt()
}

#[inline]
pub fn mag_sqr(v: Vector) -> f64 {
    dot(v, v)
}

/// Unit vector along `v`, or zero when `v` is numerically zero.
pub fn normalised(v: Vector) -> Vector {
    let n = norm(v);
    if n < EPS {
        [0.0, 0.0, 0.0]
    } else {
        scale(1.0 / n, v)
    }
}

#[inline]
pub fn midpoint(a: Point, b: Point) -> Point {
    [
        0.5 * (a[0] + b[0]),
        0.5 * (a[1] + b[1]),
        0.5 * (a[2] + b[2]),
    ]
}

/// Squared distance between two points.
#[inline]
pub fn dist_sqr(a: Point, b: Point) -> f64 {
    mag_sqr(sub(a, b))
}

/// Area vector of triangle `(a, b, c)` (half the edge cross product).
#[inline]
pub fn tri_area_vector(a: Point, b: Point, c: Point) -> Vector {
    scale(0.5, cross(sub(b, a), sub(c, a)))
}

/// Signed area of triangle `(a, b, c)` projected on `normal`.
///
/// `normal` need not be unit; only its direction matters for the sign.
pub fn tri_area_projected(a: Point, b: Point, c: Point, normal: Vector) -> f64 {
    dot(tri_area_vector(a, b, c), normalised(normal))
}

/// Quality of triangle `(a, b, c)` projected on `normal`.
///
/// Ratio of projected area to squared perimeter, scaled so an equilateral
/// triangle scores 1. Slivers and inverted triangles score near or below
/// zero, so maximizing this metric steers ear selection and edge flips away
/// from degenerate triangles.
pub fn tri_quality_projected(a: Point, b: Point, c: Point, normal: Vector) -> f64 {
    let area = tri_area_projected(a, b, c, normal);
    let p = norm(sub(b, a)) + norm(sub(c, b)) + norm(sub(a, c));
    if p < EPS {
        return 0.0;
    }
    // 12/sqrt(3) normalizes the equilateral case to 1.
    12.0 / 3f64.sqrt() * area / (p * p)
}

/// Interior angle at `b` of the wedge `(a, b, c)`, measured in the plane of
/// `normal`, in `[0, 2π)`. Reflex angles (concave vertices) exceed π.
pub fn wedge_angle(a: Point, b: Point, c: Point, normal: Vector) -> f64 {
    let n = normalised(normal);
    let u = sub(a, b);
    let v = sub(c, b);
    // Components in the plane.
    let u = sub(u, scale(dot(u, n), n));
    let v = sub(v, scale(dot(v, n), n));
    let s = dot(cross(v, u), n);
    let c_ = dot(u, v);
    let ang = s.atan2(c_);
    if ang < 0.0 { ang + 2.0 * std::f64::consts::PI } else { ang }
}

/// Whether segments `(a0, a1)` and `(b0, b1)` intersect within the plane of
/// `normal`. Shared endpoints do not count as an intersection.
pub fn edges_intersect(a0: Point, a1: Point, b0: Point, b1: Point, normal: Vector) -> bool {
    let n = normalised(normal);
    let side = |p: Point, q: Point, r: Point| dot(cross(sub(q, p), sub(r, p)), n);

    let d0 = side(a0, a1, b0);
    let d1 = side(a0, a1, b1);
    let d2 = side(b0, b1, a0);
    let d3 = side(b0, b1, a1);

    // Strict straddling both ways; tolerances keep shared endpoints out.
    // Each side value scales with length squared, so their product is
    // compared against a fourth-power scale to stay unit-free.
    let scale0 = dist_sqr(a0, a1).max(EPS);
    let scale1 = dist_sqr(b0, b1).max(EPS);
    let tol = GEOM_TOL * GEOM_TOL * scale0 * scale1;
    d0 * d1 < -tol && d2 * d3 < -tol
}

/// Whether point `p` lies inside triangle `(a, b, c)` in the plane of
/// `normal`. Boundary points count as inside.
pub fn point_in_tri(p: Point, a: Point, b: Point, c: Point, normal: Vector) -> bool {
    let n = normalised(normal);
    let side = |p0: Point, p1: Point| dot(cross(sub(p1, p0), sub(p, p0)), n);
    let tol = -GEOM_TOL * (dist_sqr(a, b) + dist_sqr(b, c) + dist_sqr(c, a));
    side(a, b) >= tol && side(b, c) >= tol && side(c, a) >= tol
}

/// Signed volume of tetrahedron `(a, b, c, d)`.
#[inline]
pub fn tet_volume(a: Point, b: Point, c: Point, d: Point) -> f64 {
    dot(sub(b, a), cross(sub(c, a), sub(d, a))) / 6.0
}
