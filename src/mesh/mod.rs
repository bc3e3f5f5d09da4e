//! Unstructured polyhedral mesh: owner/neighbour face addressing, patches,
//! zones, and derived adjacency and metric geometry.
//!
//! A [`PolyMesh`] is built once from its primitive arrays (points, face →
//! point table, owner and neighbour cells) and is topologically immutable
//! afterwards; the core never changes topology itself. Internal faces come
//! first in the face list; boundary faces are grouped into contiguous named
//! patches. Derived data (cell → face adjacency, face/cell centres, areas,
//! volumes, point → cell adjacency) is computed by `refresh` and tagged
//! with a topology version counter so longer-lived consumers can key their
//! own caches on [`PolyMesh::topology_version`].

pub mod build;

use serde::{Deserialize, Serialize};

use crate::geometry::metrics::{self, Point, Vector};
use crate::mesh_error::MeshPlicError;
use crate::topology::{CompactList, CoupledPatchTable, ZoneList};

/// Rigid transform applied to data crossing a coupled patch.
///
/// Translation-only covers processor and translational cyclic couplings.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub offset: Vector,
}

impl Transform {
    pub fn identity() -> Self {
        Self::default()
    }

    /// Apply to a position.
    pub fn apply(&self, p: Point) -> Point {
        metrics::add(p, self.offset)
    }
}

/// Coupling of a patch to the matching patch on a neighbouring partition.
///
/// Face `k` of this patch pairs with face `k` of the remote patch.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcCoupling {
    pub neighbour_rank: usize,
    pub transform: Transform,
}

/// A contiguous group of boundary faces.
#[derive(Clone, Debug)]
pub struct Patch {
    pub name: String,
    /// First face of the patch in the mesh face list.
    pub start: usize,
    pub size: usize,
    /// Present on processor/cyclic patches.
    pub coupling: Option<ProcCoupling>,
}

impl Patch {
    /// Face range of this patch.
    pub fn faces(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.size
    }
}

/// Unstructured polyhedral mesh for one partition.
#[derive(Clone, Debug)]
pub struct PolyMesh {
    points: Vec<Point>,
    /// Face → point addressing.
    faces: CompactList<u32>,
    /// Owner cell per face.
    owner: Vec<u32>,
    /// Neighbour cell per internal face.
    neighbour: Vec<u32>,
    n_cells: usize,
    patches: Vec<Patch>,
    zones: ZoneList,
    coupled: CoupledPatchTable,
    topo_version: u64,

    // Derived by refresh().
    cells: CompactList<u32>,
    point_cells: CompactList<u32>,
    face_centres: Vec<Point>,
    face_areas: Vec<Vector>,
    cell_centres: Vec<Point>,
    cell_volumes: Vec<f64>,
}

impl PolyMesh {
    /// Build a mesh from primitive arrays and patch descriptions.
    pub fn new(
        points: Vec<Point>,
        faces: CompactList<u32>,
        owner: Vec<u32>,
        neighbour: Vec<u32>,
        patches: Vec<Patch>,
    ) -> Result<Self, MeshPlicError> {
        let n_faces = faces.row_count();
        if owner.len() != n_faces {
            return Err(MeshPlicError::bad_mesh(format!(
                "owner list has {} entries for {} faces",
                owner.len(),
                n_faces
            )));
        }
        if neighbour.len() > n_faces {
            return Err(MeshPlicError::bad_mesh(format!(
                "{} neighbours exceed {} faces",
                neighbour.len(),
                n_faces
            )));
        }
        let n_internal = neighbour.len();
        let mut covered = n_internal;
        for (pi, patch) in patches.iter().enumerate() {
            if patch.start != covered {
                return Err(MeshPlicError::bad_mesh(format!(
                    "patch {pi} `{}` starts at face {} but face {covered} is next uncovered",
                    patch.name, patch.start
                )));
            }
            covered += patch.size;
        }
        if covered != n_faces {
            return Err(MeshPlicError::bad_mesh(format!(
                "patches cover faces up to {covered} of {n_faces}"
            )));
        }
        let n_points = points.len() as u32;
        for f in 0..n_faces {
            if faces.row_size(f) < 3 {
                return Err(MeshPlicError::bad_mesh(format!(
                    "face {f} has fewer than 3 points"
                )));
            }
            if faces.row(f).iter().any(|&p| p >= n_points) {
                return Err(MeshPlicError::bad_mesh(format!(
                    "face {f} references a point beyond {n_points}"
                )));
            }
        }
        let n_cells = owner
            .iter()
            .chain(neighbour.iter())
            .map(|&c| c as usize + 1)
            .max()
            .unwrap_or(0);

        let n_patches = patches.len();
        let mut mesh = Self {
            points,
            faces,
            owner,
            neighbour,
            n_cells,
            patches,
            zones: ZoneList::new(),
            coupled: CoupledPatchTable::new(n_patches),
            topo_version: 1,
            cells: CompactList::new(),
            point_cells: CompactList::new(),
            face_centres: Vec::new(),
            face_areas: Vec::new(),
            cell_centres: Vec::new(),
            cell_volumes: Vec::new(),
        };
        mesh.refresh();
        Ok(mesh)
    }

    // --- sizes ---------------------------------------------------------------

    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    pub fn n_faces(&self) -> usize {
        self.faces.row_count()
    }

    pub fn n_internal_faces(&self) -> usize {
        self.neighbour.len()
    }

    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// Monotone counter bumped on every topology rebuild.
    pub fn topology_version(&self) -> u64 {
        self.topo_version
    }

    // --- primitive addressing ------------------------------------------------

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Points of `face` in boundary order.
    pub fn face_points(&self, face: usize) -> &[u32] {
        self.faces.row(face)
    }

    pub fn is_internal(&self, face: usize) -> bool {
        face < self.neighbour.len()
    }

    pub fn owner(&self, face: usize) -> usize {
        self.owner[face] as usize
    }

    /// Neighbour cell of an internal face.
    pub fn neighbour(&self, face: usize) -> Option<usize> {
        self.neighbour.get(face).map(|&c| c as usize)
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn patch(&self, pi: usize) -> Result<&Patch, MeshPlicError> {
        self.patches.get(pi).ok_or(MeshPlicError::UnknownPatch(pi))
    }

    /// Patch containing `face`, if it is a boundary face.
    pub fn patch_of_face(&self, face: usize) -> Option<usize> {
        if self.is_internal(face) {
            return None;
        }
        self.patches.iter().position(|p| p.faces().contains(&face))
    }

    pub fn zones(&self) -> &ZoneList {
        &self.zones
    }

    pub fn zones_mut(&mut self) -> &mut ZoneList {
        &mut self.zones
    }

    pub fn coupled(&self) -> &CoupledPatchTable {
        &self.coupled
    }

    pub fn coupled_mut(&mut self) -> &mut CoupledPatchTable {
        &mut self.coupled
    }

    // --- derived adjacency ---------------------------------------------------

    /// Faces of `cell`.
    pub fn cell_faces(&self, cell: usize) -> &[u32] {
        self.cells.row(cell)
    }

    /// Cell → face table.
    pub fn cells(&self) -> &CompactList<u32> {
        &self.cells
    }

    /// Cells sharing `point`.
    pub fn point_cells(&self, point: usize) -> &[u32] {
        self.point_cells.row(point)
    }

    /// Distinct points of `cell`, in ascending order.
    pub fn cell_points(&self, cell: usize) -> Vec<u32> {
        let mut pts: Vec<u32> = self
            .cell_faces(cell)
            .iter()
            .flat_map(|&f| self.face_points(f as usize).iter().copied())
            .collect();
        pts.sort_unstable();
        pts.dedup();
        pts
    }

    // --- derived geometry ----------------------------------------------------

    pub fn face_centre(&self, face: usize) -> Point {
        self.face_centres[face]
    }

    /// Face area vector; magnitude is the area, direction owner → neighbour
    /// (outward on boundary faces).
    pub fn face_area(&self, face: usize) -> Vector {
        self.face_areas[face]
    }

    pub fn cell_centre(&self, cell: usize) -> Point {
        self.cell_centres[cell]
    }

    pub fn cell_volume(&self, cell: usize) -> f64 {
        self.cell_volumes[cell]
    }

    pub fn cell_volumes(&self) -> &[f64] {
        &self.cell_volumes
    }

    /// Recompute all derived data and bump the topology version.
    ///
    /// Called on construction; callers that rebuild the primitive arrays in
    /// place (mesh motion, refinement) call it again before the next
    /// wave/reconstruction pass.
    pub fn refresh(&mut self) {
        self.topo_version += 1;
        self.rebuild_cells();
        self.rebuild_point_cells();
        self.rebuild_geometry();
    }

    fn rebuild_cells(&mut self) {
        let n_faces = self.n_faces();
        let mut sizes = vec![0u32; self.n_cells];
        for f in 0..n_faces {
            sizes[self.owner[f] as usize] += 1;
            if let Some(&n) = self.neighbour.get(f) {
                sizes[n as usize] += 1;
            }
        }
        let mut cells = CompactList::from_row_sizes(&sizes, 0u32);
        let mut fill = vec![0usize; self.n_cells];
        for f in 0..n_faces {
            let o = self.owner[f] as usize;
            cells.row_mut(o)[fill[o]] = f as u32;
            fill[o] += 1;
            if let Some(&n) = self.neighbour.get(f) {
                let n = n as usize;
                cells.row_mut(n)[fill[n]] = f as u32;
                fill[n] += 1;
            }
        }
        self.cells = cells;
    }

    fn rebuild_point_cells(&mut self) {
        let n_points = self.n_points();
        let mut per_point: Vec<Vec<u32>> = vec![Vec::new(); n_points];
        for cell in 0..self.n_cells {
            for p in self.cell_points(cell) {
                per_point[p as usize].push(cell as u32);
            }
        }
        self.point_cells = CompactList::from_rows(&per_point);
    }

    fn rebuild_geometry(&mut self) {
        let n_faces = self.n_faces();
        self.face_centres = vec![[0.0; 3]; n_faces];
        self.face_areas = vec![[0.0; 3]; n_faces];

        for f in 0..n_faces {
            let pts = self.faces.row(f);
            let n = pts.len();
            // First estimate: arithmetic mean; then the area-weighted fan
            // centroid, which is exact for warped faces.
            let mut est = [0.0; 3];
            for &p in pts {
                est = metrics::add(est, self.points[p as usize]);
            }
            est = metrics::scale(1.0 / n as f64, est);

            let mut area = [0.0; 3];
            let mut centre = [0.0; 3];
            let mut area_mag = 0.0;
            for i in 0..n {
                let a = self.points[pts[i] as usize];
                let b = self.points[pts[(i + 1) % n] as usize];
                let tri_area = metrics::tri_area_vector(est, a, b);
                let tri_mag = metrics::norm(tri_area);
                let tri_centre = metrics::scale(1.0 / 3.0, metrics::add(metrics::add(est, a), b));
                area = metrics::add(area, tri_area);
                centre = metrics::add(centre, metrics::scale(tri_mag, tri_centre));
                area_mag += tri_mag;
            }
            self.face_areas[f] = area;
            self.face_centres[f] = if area_mag > metrics::EPS {
                metrics::scale(1.0 / area_mag, centre)
            } else {
                est
            };
        }

        self.cell_centres = vec![[0.0; 3]; self.n_cells];
        self.cell_volumes = vec![0.0; self.n_cells];
        // Estimate cell centres as the mean of face centres, then integrate
        // pyramid volumes about the estimate (divergence theorem).
        let mut est = vec![[0.0; 3]; self.n_cells];
        for cell in 0..self.n_cells {
            let faces = self.cells.row(cell);
            let mut e = [0.0; 3];
            for &f in faces {
                e = metrics::add(e, self.face_centres[f as usize]);
            }
            est[cell] = metrics::scale(1.0 / faces.len() as f64, e);
        }
        for f in 0..n_faces {
            let fc = self.face_centres[f];
            let fa = self.face_areas[f];
            let o = self.owner[f] as usize;
            let pyr = metrics::dot(metrics::sub(fc, est[o]), fa) / 3.0;
            self.cell_volumes[o] += pyr;
            self.cell_centres[o] = metrics::add(
                self.cell_centres[o],
                metrics::scale(pyr, centroid_of_pyramid(est[o], fc)),
            );
            if let Some(&nb) = self.neighbour.get(f) {
                let nb = nb as usize;
                let pyr = -metrics::dot(metrics::sub(fc, est[nb]), fa) / 3.0;
                self.cell_volumes[nb] += pyr;
                self.cell_centres[nb] = metrics::add(
                    self.cell_centres[nb],
                    metrics::scale(pyr, centroid_of_pyramid(est[nb], fc)),
                );
            }
        }
        for cell in 0..self.n_cells {
            let v = self.cell_volumes[cell];
            self.cell_centres[cell] = if v.abs() > metrics::EPS {
                metrics::scale(1.0 / v, self.cell_centres[cell])
            } else {
                est[cell]
            };
        }
    }
}

/// Centroid of the pyramid with apex `apex` and base centre `base`, which
/// sits three quarters of the way from the apex.
fn centroid_of_pyramid(apex: Point, base: Point) -> Point {
    metrics::add(
        metrics::scale(0.25, apex),
        metrics::scale(0.75, base),
    )
}

#[cfg(test)]
mod tests {
    use super::build::{box_mesh, unit_cube};
    use super::*;

    #[test]
    fn unit_cube_metrics() {
        let mesh = unit_cube().unwrap();
        assert_eq!(mesh.n_cells(), 1);
        assert_eq!(mesh.n_faces(), 6);
        assert_eq!(mesh.n_internal_faces(), 0);
        assert!((mesh.cell_volume(0) - 1.0).abs() < 1e-12);
        let c = mesh.cell_centre(0);
        for d in 0..3 {
            assert!((c[d] - 0.5).abs() < 1e-12);
        }
        // Outward area vectors sum to zero over a closed cell.
        let sum = mesh
            .cell_faces(0)
            .iter()
            .fold([0.0; 3], |acc, &f| metrics::add(acc, mesh.face_area(f as usize)));
        assert!(metrics::norm(sum) < 1e-12);
        for f in 0..6 {
            assert!((metrics::norm(mesh.face_area(f)) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn box_mesh_counts_and_volumes() {
        let mesh = box_mesh(3, 2, 2, [3.0, 2.0, 2.0]).unwrap();
        assert_eq!(mesh.n_cells(), 12);
        // Internal faces: (3-1)*2*2 + 3*(2-1)*2 + 3*2*(2-1) = 8 + 6 + 6
        assert_eq!(mesh.n_internal_faces(), 20);
        for cell in 0..mesh.n_cells() {
            assert!((mesh.cell_volume(cell) - 1.0).abs() < 1e-12);
            assert_eq!(mesh.cell_faces(cell).len(), 6);
        }
        let total: f64 = mesh.cell_volumes().iter().sum();
        assert!((total - 12.0).abs() < 1e-10);
    }

    #[test]
    fn owner_neighbour_are_face_adjacent() {
        let mesh = box_mesh(2, 2, 2, [2.0, 2.0, 2.0]).unwrap();
        for f in 0..mesh.n_internal_faces() {
            let o = mesh.owner(f);
            let n = mesh.neighbour(f).unwrap();
            assert!(o != n);
            assert!(mesh.cell_faces(o).contains(&(f as u32)));
            assert!(mesh.cell_faces(n).contains(&(f as u32)));
            // Area vector points from owner to neighbour.
            let d = metrics::sub(mesh.cell_centre(n), mesh.cell_centre(o));
            assert!(metrics::dot(d, mesh.face_area(f)) > 0.0);
        }
    }

    #[test]
    fn patch_lookup() {
        let mesh = box_mesh(2, 1, 1, [2.0, 1.0, 1.0]).unwrap();
        let boundary_face = mesh.n_internal_faces();
        let pi = mesh.patch_of_face(boundary_face).unwrap();
        assert!(mesh.patch(pi).unwrap().faces().contains(&boundary_face));
        assert!(mesh.patch_of_face(0).is_none());
        assert!(matches!(mesh.patch(99), Err(MeshPlicError::UnknownPatch(99))));
    }
}
