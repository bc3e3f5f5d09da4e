//! Tetrahedral decomposition cutting: the backstop strategy that succeeds
//! for every well-formed cell.
//!
//! Cells decompose into tets spanned by the cell centre and the ear-clipped
//! triangles of each face. The wet fraction of a single tet under a linear
//! level field has a closed form (the divided-difference identity for the
//! truncated cubic), monotone in the cut value.

use crate::geometry::metrics::{self, Point};
use crate::geometry::PolygonTriangulate;
use crate::mesh::PolyMesh;
use crate::mesh_error::MeshPlicError;

/// One tet of a cell decomposition: corner positions and levels.
#[derive(Copy, Clone, Debug)]
pub struct Tet {
    pub points: [Point; 4],
    pub levels: [f64; 4],
}

impl Tet {
    pub fn volume(&self) -> f64 {
        metrics::tet_volume(self.points[0], self.points[1], self.points[2], self.points[3]).abs()
    }
}

/// Wet volume fraction of a tet with corner excesses `d = level - iso`
/// (wet where `d >= 0`).
pub fn tet_wet_fraction(d: [f64; 4]) -> f64 {
    if d.iter().all(|&x| x >= 0.0) {
        return 1.0;
    }
    if d.iter().all(|&x| x <= 0.0) {
        return 0.0;
    }
    // Separate coincident values so the divided-difference denominators
    // stay finite; the perturbation is far below field accuracy.
    let scale = d.iter().fold(0.0f64, |m, &x| m.max(x.abs())).max(f64::MIN_POSITIVE);
    let mut dd = d;
    for (i, x) in dd.iter_mut().enumerate() {
        *x += scale * 1e-12 * (i as f64 + 1.0);
    }
    let mut f = 0.0;
    for i in 0..4 {
        if dd[i] > 0.0 {
            let mut denom = 1.0;
            for j in 0..4 {
                if j != i {
                    denom *= dd[i] - dd[j];
                }
            }
            f += dd[i].powi(3) / denom;
        }
    }
    f.clamp(0.0, 1.0)
}

/// Decompose `cell` into tets about its centre, triangulating each face
/// with the shared workspace. Point levels come from `levels`; the centre
/// level is the mean over the cell's distinct points.
pub fn cell_tets(
    mesh: &PolyMesh,
    cell: usize,
    levels: &[f64],
    tri: &mut PolygonTriangulate,
) -> Result<Vec<Tet>, MeshPlicError> {
    let cc = mesh.cell_centre(cell);
    let cell_points = mesh.cell_points(cell);
    let cc_level = cell_points
        .iter()
        .map(|&p| levels[p as usize])
        .sum::<f64>()
        / cell_points.len() as f64;

    let mut tets = Vec::new();
    let mut face_pts: Vec<Point> = Vec::new();
    for &f in mesh.cell_faces(cell) {
        let f = f as usize;
        let pts = mesh.face_points(f);
        face_pts.clear();
        face_pts.extend(pts.iter().map(|&p| mesh.points()[p as usize]));
        let normal = metrics::normalised(mesh.face_area(f));
        let tris = tri.triangulate(&face_pts, normal, true, false)?.to_vec();
        for t in tris {
            let [a, b, c] = t;
            tets.push(Tet {
                points: [cc, face_pts[a], face_pts[b], face_pts[c]],
                levels: [
                    cc_level,
                    levels[pts[a] as usize],
                    levels[pts[b] as usize],
                    levels[pts[c] as usize],
                ],
            });
        }
    }
    Ok(tets)
}

/// Wet volume of a tet decomposition at `iso`.
pub fn tets_wet_volume(tets: &[Tet], iso: f64) -> f64 {
    tets.iter()
        .map(|t| {
            let d = [
                t.levels[0] - iso,
                t.levels[1] - iso,
                t.levels[2] - iso,
                t.levels[3] - iso,
            ];
            t.volume() * tet_wet_fraction(d)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build::unit_cube;

    #[test]
    fn tet_fraction_extremes_and_symmetry() {
        assert_eq!(tet_wet_fraction([1.0, 2.0, 3.0, 4.0]), 1.0);
        assert_eq!(tet_wet_fraction([-1.0, -2.0, -3.0, -0.5]), 0.0);
        // One corner wet: fraction is the cube of the linear extent ratio.
        let f = tet_wet_fraction([1.0, -1.0, -1.0, -1.0]);
        assert!((f - 0.125).abs() < 1e-9, "{f}");
        // Complementary cuts sum to one.
        let d = [0.3, -0.7, 0.1, -0.2];
        let neg = [-0.3, 0.7, -0.1, 0.2];
        assert!((tet_wet_fraction(d) + tet_wet_fraction(neg) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cube_decomposition_fills_the_volume() {
        let mesh = unit_cube().unwrap();
        let levels = vec![0.0; mesh.n_points()];
        let mut tri = PolygonTriangulate::new();
        let tets = cell_tets(&mesh, 0, &levels, &mut tri).unwrap();
        assert_eq!(tets.len(), 12);
        let total: f64 = tets.iter().map(Tet::volume).sum();
        assert!((total - 1.0).abs() < 1e-10);
    }

    #[test]
    fn planar_cut_volume_matches_plane_position() {
        let mesh = unit_cube().unwrap();
        let levels: Vec<f64> = mesh.points().iter().map(|p| p[0]).collect();
        let mut tri = PolygonTriangulate::new();
        let tets = cell_tets(&mesh, 0, &levels, &mut tri).unwrap();
        for &iso in &[0.2, 0.5, 0.8] {
            let v = tets_wet_volume(&tets, iso);
            assert!((v - (1.0 - iso)).abs() < 1e-6, "iso {iso}: {v}");
        }
    }
}
