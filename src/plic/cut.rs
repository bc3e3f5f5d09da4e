//! Iso-surface cutting of faces and cells against a point-interpolated
//! fraction field.
//!
//! A point is *wet* when its level is at or above the cut value. Faces are
//! cut by marching their boundary and inserting edge crossings; cells close
//! the wet surface with cap loops chained from the per-face cut segments
//! and integrate the wet volume by the divergence theorem.

use crate::geometry::metrics::{self, Point, Vector};
use crate::mesh::PolyMesh;
use crate::topology::CompactList;

/// Result of cutting one face polygon.
pub struct FaceCut {
    /// Wet sub-polygon in the face's winding (empty when fully dry).
    pub wet: Vec<Point>,
    /// Cut segments (wet→dry crossing to the following dry→wet crossing).
    pub segments: Vec<(Point, Point)>,
}

impl FaceCut {
    /// Area vector of the wet sub-polygon (Newell, face winding).
    pub fn wet_area(&self) -> Vector {
        newell_area(&self.wet)
    }
}

/// Cut a face polygon at `iso`. `levels[i]` is the level at `points[i]`.
pub fn cut_face(points: &[Point], levels: &[f64], iso: f64) -> FaceCut {
    let n = points.len();
    let wet_at = |i: usize| levels[i] >= iso;
    let mut wet = Vec::new();
    let mut crossings: Vec<(Point, bool)> = Vec::new(); // (point, leaving wet)
    for i in 0..n {
        let j = (i + 1) % n;
        if wet_at(i) {
            wet.push(points[i]);
        }
        if wet_at(i) != wet_at(j) {
            let t = (iso - levels[i]) / (levels[j] - levels[i]);
            let p = metrics::add(points[i], metrics::scale(t, metrics::sub(points[j], points[i])));
            wet.push(p);
            crossings.push((p, wet_at(i)));
        }
    }
    // Pair each wet→dry crossing with the next dry→wet crossing along the
    // boundary; the pair is one edge of the cap polygon crossing this face.
    let mut segments = Vec::new();
    let m = crossings.len();
    for k in 0..m {
        if crossings[k].1 {
            let next = (k + 1) % m;
            segments.push((crossings[k].0, crossings[next].0));
        }
    }
    FaceCut { wet, segments }
}

/// Newell area vector of a closed polygon.
pub fn newell_area(poly: &[Point]) -> Vector {
    let mut area = [0.0; 3];
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        area = metrics::add(area, metrics::cross(a, b));
    }
    metrics::scale(0.5, area)
}

fn polygon_centroid(poly: &[Point]) -> Point {
    let mut c = [0.0; 3];
    for p in poly {
        c = metrics::add(c, *p);
    }
    metrics::scale(1.0 / poly.len() as f64, c)
}

/// Wet volume of `cell` at `iso`, closing the wet surface with cap loops
/// chained from the face cut segments.
///
/// Returns `None` when the cut is not representable under the requested
/// strategy: a face crossed more than once with `allow_multi == false`, or
/// segments that do not chain into closed loops. Callers escalate.
pub fn cell_wet_volume_chained(
    mesh: &PolyMesh,
    cell: usize,
    levels: &[f64],
    iso: f64,
    allow_multi: bool,
) -> Option<f64> {
    let scale = mesh.cell_volume(cell).abs().cbrt();
    let match_tol_sqr = (1e-9 * scale.max(f64::MIN_POSITIVE)).powi(2);

    let mut volume = 0.0;
    let mut segments: Vec<(Point, Point)> = Vec::new();
    let mut face_pts: Vec<Point> = Vec::new();
    let mut face_lvls: Vec<f64> = Vec::new();
    for &f in mesh.cell_faces(cell) {
        let f = f as usize;
        face_pts.clear();
        face_lvls.clear();
        for &p in mesh.face_points(f) {
            face_pts.push(mesh.points()[p as usize]);
            face_lvls.push(levels[p as usize]);
        }
        let cut = cut_face(&face_pts, &face_lvls, iso);
        if !allow_multi && cut.segments.len() > 1 {
            return None;
        }
        if cut.wet.len() >= 3 {
            // Outward orientation relative to this cell.
            let sign = if mesh.owner(f) == cell { 1.0 } else { -1.0 };
            let area = metrics::scale(sign, cut.wet_area());
            volume += metrics::dot(polygon_centroid(&cut.wet), area) / 3.0;
            if !cut.segments.is_empty() {
                // The cap traverses each shared edge opposite to the wet
                // sub-face's outward winding.
                for &(a, b) in &cut.segments {
                    segments.push(if sign > 0.0 { (b, a) } else { (a, b) });
                }
            }
        } else if !cut.segments.is_empty() {
            return None;
        }
    }

    if segments.is_empty() {
        // Fully wet or fully dry.
        return Some(volume.clamp(0.0, mesh.cell_volume(cell)));
    }

    let loops = chain_loops(segments, match_tol_sqr)?;
    if !allow_multi && loops.len() > 1 {
        return None;
    }
    for lp in &loops {
        if lp.len() < 3 {
            return None;
        }
        let area = newell_area(lp);
        volume += metrics::dot(polygon_centroid(lp), area) / 3.0;
    }
    Some(volume.clamp(0.0, mesh.cell_volume(cell)))
}

/// Chain directed segments into closed loops by endpoint proximity.
fn chain_loops(
    mut segments: Vec<(Point, Point)>,
    match_tol_sqr: f64,
) -> Option<Vec<Vec<Point>>> {
    let mut loops = Vec::new();
    while let Some((start, mut end)) = segments.pop() {
        let mut lp = vec![start];
        loop {
            if metrics::dist_sqr(end, start) <= match_tol_sqr {
                break;
            }
            lp.push(end);
            let next = segments
                .iter()
                .position(|&(a, _)| metrics::dist_sqr(a, end) <= match_tol_sqr)?;
            end = segments.swap_remove(next).1;
        }
        loops.push(lp);
    }
    Some(loops)
}

/// Inverse-distance interpolation weights of cell values to mesh points,
/// row-aligned with the mesh's point→cells table.
pub fn point_weights(mesh: &PolyMesh) -> CompactList<f64> {
    let n_points = mesh.n_points();
    let mut sizes = vec![0u32; n_points];
    for p in 0..n_points {
        sizes[p] = mesh.point_cells(p).len() as u32;
    }
    let mut weights = CompactList::from_row_sizes(&sizes, 0.0);
    for p in 0..n_points {
        let pos = mesh.points()[p];
        let row = weights.row_mut(p);
        let mut total = 0.0;
        for (k, &c) in mesh.point_cells(p).iter().enumerate() {
            let d = metrics::dist_sqr(pos, mesh.cell_centre(c as usize)).sqrt();
            let w = 1.0 / d.max(metrics::EPS);
            row[k] = w;
            total += w;
        }
        for w in row.iter_mut() {
            *w /= total;
        }
    }
    weights
}

/// Interpolate a cell field to mesh points with precomputed weights.
pub fn point_field(mesh: &PolyMesh, weights: &CompactList<f64>, cell_field: &[f64]) -> Vec<f64> {
    (0..mesh.n_points())
        .map(|p| {
            mesh.point_cells(p)
                .iter()
                .zip(weights.row(p))
                .map(|(&c, &w)| w * cell_field[c as usize])
                .sum()
        })
        .collect()
}
