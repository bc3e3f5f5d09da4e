//! Per-entity records propagated by the wave engine.
//!
//! A record remembers where its information came from and decides whether a
//! neighbouring proposal improves on what it already holds. Records are
//! `Pod` so changed ones can be cast straight to bytes for the halo
//! exchange.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

use crate::geometry::metrics::{self, Point, Vector};
use crate::mesh::{PolyMesh, Transform};

// Wire layout is fixed; both sides of an exchange cast these directly.
const_assert_eq!(std::mem::size_of::<WallPoint>(), 32);
const_assert_eq!(std::mem::size_of::<WallData>(), 64);

/// Information carried by the face→cell→face wave.
///
/// `update_cell` and `update_face` return whether the proposal was accepted;
/// the engine only re-propagates accepted entities. `tol` is relative:
/// proposals within `tol` of the held value are ties and rejected, keeping
/// the wave deterministic under sweep order.
pub trait WaveInfo: Copy + Pod {
    /// Whether this record has received any information yet.
    fn valid(&self) -> bool;

    /// Propose `neighbour` (on face `face`) to cell `cell`.
    fn update_cell(
        &mut self,
        mesh: &PolyMesh,
        cell: usize,
        face: usize,
        neighbour: &Self,
        tol: f64,
    ) -> bool;

    /// Propose `neighbour` (on cell `cell`) to face `face`.
    fn update_face(
        &mut self,
        mesh: &PolyMesh,
        face: usize,
        cell: usize,
        neighbour: &Self,
        tol: f64,
    ) -> bool;

    /// Propose the paired rank's record for the same face.
    fn merge_face(&mut self, mesh: &PolyMesh, face: usize, neighbour: &Self, tol: f64) -> bool;

    /// Map the record through a coupling transform when it crosses a
    /// coupled patch.
    fn transform(&mut self, t: &Transform);
}

/// Nearest-wall record: seed origin and squared distance to it.
///
/// A negative squared distance marks an unvisited record.
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct WallPoint {
    pub origin: Point,
    pub dist_sqr: f64,
}

impl WallPoint {
    pub fn unvisited() -> Self {
        Self {
            origin: [0.0; 3],
            dist_sqr: -1.0,
        }
    }

    pub fn seed(origin: Point) -> Self {
        Self {
            origin,
            dist_sqr: 0.0,
        }
    }

    /// Accept `other`'s origin if it is strictly nearer to `pos`, beyond
    /// the relative tolerance.
    fn update(&mut self, pos: Point, other: &WallPoint, tol: f64) -> bool {
        let d2 = metrics::dist_sqr(pos, other.origin);
        if self.valid() {
            let diff = self.dist_sqr - d2;
            if diff <= 0.0 || diff <= tol * self.dist_sqr {
                return false;
            }
        }
        self.origin = other.origin;
        self.dist_sqr = d2;
        true
    }
}

impl WaveInfo for WallPoint {
    fn valid(&self) -> bool {
        self.dist_sqr >= 0.0
    }

    fn update_cell(
        &mut self,
        mesh: &PolyMesh,
        cell: usize,
        _face: usize,
        neighbour: &Self,
        tol: f64,
    ) -> bool {
        self.update(mesh.cell_centre(cell), neighbour, tol)
    }

    fn update_face(
        &mut self,
        mesh: &PolyMesh,
        face: usize,
        _cell: usize,
        neighbour: &Self,
        tol: f64,
    ) -> bool {
        self.update(mesh.face_centre(face), neighbour, tol)
    }

    fn merge_face(&mut self, mesh: &PolyMesh, face: usize, neighbour: &Self, tol: f64) -> bool {
        self.update(mesh.face_centre(face), neighbour, tol)
    }

    fn transform(&mut self, t: &Transform) {
        self.origin = t.apply(self.origin);
    }
}

/// Nearest-wall record carrying a scalar and a vector payload from the
/// seed, for transporting boundary data into the volume.
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct WallData {
    pub origin: Point,
    pub dist_sqr: f64,
    pub s: f64,
    pub v: Vector,
}

impl WallData {
    pub fn unvisited() -> Self {
        Self {
            origin: [0.0; 3],
            dist_sqr: -1.0,
            s: 0.0,
            v: [0.0; 3],
        }
    }

    pub fn seed(origin: Point, s: f64, v: Vector) -> Self {
        Self {
            origin,
            dist_sqr: 0.0,
            s,
            v,
        }
    }

    fn update(&mut self, pos: Point, other: &WallData, tol: f64) -> bool {
        let d2 = metrics::dist_sqr(pos, other.origin);
        if self.valid() {
            let diff = self.dist_sqr - d2;
            if diff <= 0.0 || diff <= tol * self.dist_sqr {
                return false;
            }
        }
        self.origin = other.origin;
        self.dist_sqr = d2;
        self.s = other.s;
        self.v = other.v;
        true
    }
}

impl WaveInfo for WallData {
    fn valid(&self) -> bool {
        self.dist_sqr >= 0.0
    }

    fn update_cell(
        &mut self,
        mesh: &PolyMesh,
        cell: usize,
        _face: usize,
        neighbour: &Self,
        tol: f64,
    ) -> bool {
        self.update(mesh.cell_centre(cell), neighbour, tol)
    }

    fn update_face(
        &mut self,
        mesh: &PolyMesh,
        face: usize,
        _cell: usize,
        neighbour: &Self,
        tol: f64,
    ) -> bool {
        self.update(mesh.face_centre(face), neighbour, tol)
    }

    fn merge_face(&mut self, mesh: &PolyMesh, face: usize, neighbour: &Self, tol: f64) -> bool {
        self.update(mesh.face_centre(face), neighbour, tol)
    }

    fn transform(&mut self, t: &Transform) {
        self.origin = t.apply(self.origin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build::unit_cube;

    #[test]
    fn wall_point_accepts_nearer_origin() {
        let mesh = unit_cube().unwrap();
        let mut info = WallPoint::unvisited();
        assert!(!info.valid());
        let far = WallPoint::seed([5.0, 0.5, 0.5]);
        assert!(info.update_cell(&mesh, 0, 0, &far, 1e-6));
        assert!(info.valid());
        let near = WallPoint::seed([0.5, 0.5, 0.0]);
        assert!(info.update_cell(&mesh, 0, 0, &near, 1e-6));
        assert!((info.dist_sqr - 0.25).abs() < 1e-12);
        // Re-proposing the same origin is a tie, not a change.
        assert!(!info.update_cell(&mesh, 0, 0, &near, 1e-6));
        // Farther origins never win.
        assert!(!info.update_cell(&mesh, 0, 0, &far, 1e-6));
    }

    #[test]
    fn wall_data_carries_payload_from_winner() {
        let mesh = unit_cube().unwrap();
        let mut info = WallData::unvisited();
        let far = WallData::seed([3.0, 0.5, 0.5], 1.0, [1.0, 0.0, 0.0]);
        let near = WallData::seed([0.5, 0.5, 0.0], 2.0, [0.0, 0.0, 1.0]);
        info.update_cell(&mesh, 0, 0, &far, 1e-6);
        info.update_cell(&mesh, 0, 0, &near, 1e-6);
        assert_eq!(info.s, 2.0);
        assert_eq!(info.v, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn transform_shifts_origin() {
        let mut info = WallPoint::seed([1.0, 2.0, 3.0]);
        info.transform(&Transform {
            offset: [0.0, 0.0, -3.0],
        });
        assert_eq!(info.origin, [1.0, 2.0, 0.0]);
    }
}
