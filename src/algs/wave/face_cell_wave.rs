//! Face→cell→face wave propagation with synchronized halo exchange.
//!
//! Each iteration sweeps changed faces into their owner/neighbour cells,
//! sweeps changed cells back out over their faces, exchanges changed
//! coupled-patch faces with the paired ranks, and then agrees globally on
//! whether anything changed. Every rank stays in the loop until all ranks
//! are quiet, so no rank ever waits on a message that will not come.

use bytemuck::Pod;
use log::{debug, trace};

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::reduce::{check_uniform, reduce_or};
use crate::mesh::PolyMesh;
use crate::mesh_error::MeshPlicError;

use super::info::WaveInfo;

const TAG_COUNT: CommTag = CommTag(10);
const TAG_FACES: CommTag = CommTag(11);
const TAG_DATA: CommTag = CommTag(12);

/// Relative near-tie tolerance applied to all record updates.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Wave engine over one mesh partition.
pub struct FaceCellWave<'a, T: WaveInfo, C: Communicator> {
    mesh: &'a PolyMesh,
    comm: &'a C,
    tol: f64,
    face_info: Vec<T>,
    cell_info: Vec<T>,
    face_changed: Vec<bool>,
    cell_changed: Vec<bool>,
    changed_faces: Vec<usize>,
    changed_cells: Vec<usize>,
}

impl<'a, T: WaveInfo + Pod, C: Communicator> FaceCellWave<'a, T, C> {
    /// Set up an unseeded wave with all records unvisited (`init`).
    pub fn new(mesh: &'a PolyMesh, comm: &'a C, init: T) -> Result<Self, MeshPlicError> {
        let mut seen = vec![false; comm.size()];
        for (pi, patch) in mesh.patches().iter().enumerate() {
            if let Some(c) = patch.coupling {
                if c.neighbour_rank >= comm.size() {
                    return Err(MeshPlicError::bad_mesh(format!(
                        "patch {pi} couples to rank {} of {}",
                        c.neighbour_rank,
                        comm.size()
                    )));
                }
                // The tag scheme keys messages on the peer rank alone.
                if std::mem::replace(&mut seen[c.neighbour_rank], true) {
                    return Err(MeshPlicError::bad_mesh(format!(
                        "two patches couple to rank {}",
                        c.neighbour_rank
                    )));
                }
            }
        }
        Ok(Self {
            mesh,
            comm,
            tol: DEFAULT_TOLERANCE,
            face_info: vec![init; mesh.n_faces()],
            cell_info: vec![init; mesh.n_cells()],
            face_changed: vec![false; mesh.n_faces()],
            cell_changed: vec![false; mesh.n_cells()],
            changed_faces: Vec::new(),
            changed_cells: Vec::new(),
        })
    }

    /// Relative near-tie tolerance (must be uniform across ranks).
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Seed `faces` with `infos` and mark them changed.
    pub fn seed(&mut self, faces: &[usize], infos: &[T]) -> Result<(), MeshPlicError> {
        if faces.len() != infos.len() {
            return Err(MeshPlicError::bad_mesh(format!(
                "{} seed faces with {} records",
                faces.len(),
                infos.len()
            )));
        }
        for (&f, &info) in faces.iter().zip(infos) {
            if f >= self.mesh.n_faces() {
                return Err(MeshPlicError::bad_mesh(format!(
                    "seed face {f} beyond {} faces",
                    self.mesh.n_faces()
                )));
            }
            self.face_info[f] = info;
            self.mark_face(f);
        }
        Ok(())
    }

    /// Run sweeps until no rank changes anything, or fail after `max_iter`
    /// rounds. Returns the number of rounds taken.
    pub fn iterate(&mut self, max_iter: usize) -> Result<usize, MeshPlicError> {
        check_uniform(self.comm, self.tol.to_bits(), "wave tolerance")?;
        for round in 0..max_iter {
            self.face_to_cell();
            self.cell_to_face();
            self.exchange()?;
            let local = !self.changed_faces.is_empty() || !self.changed_cells.is_empty();
            trace!(
                "wave round {round}: {} faces, {} cells pending",
                self.changed_faces.len(),
                self.changed_cells.len()
            );
            if !reduce_or(self.comm, local)? {
                debug!("wave converged after {} rounds", round + 1);
                return Ok(round + 1);
            }
        }
        Err(MeshPlicError::ConvergenceFailure {
            iterations: max_iter,
            context: "face-cell wave still changing".into(),
        })
    }

    pub fn face_info(&self) -> &[T] {
        &self.face_info
    }

    pub fn cell_info(&self) -> &[T] {
        &self.cell_info
    }

    pub fn into_cell_info(self) -> Vec<T> {
        self.cell_info
    }

    fn mark_face(&mut self, f: usize) {
        if !std::mem::replace(&mut self.face_changed[f], true) {
            self.changed_faces.push(f);
        }
    }

    fn mark_cell(&mut self, c: usize) {
        if !std::mem::replace(&mut self.cell_changed[c], true) {
            self.changed_cells.push(c);
        }
    }

    fn face_to_cell(&mut self) {
        let faces = std::mem::take(&mut self.changed_faces);
        for f in faces {
            self.face_changed[f] = false;
            let info = self.face_info[f];
            let owner = self.mesh.owner(f);
            if self.cell_info[owner].update_cell(self.mesh, owner, f, &info, self.tol) {
                self.mark_cell(owner);
            }
            if let Some(nb) = self.mesh.neighbour(f) {
                if self.cell_info[nb].update_cell(self.mesh, nb, f, &info, self.tol) {
                    self.mark_cell(nb);
                }
            }
        }
    }

    fn cell_to_face(&mut self) {
        let cells = std::mem::take(&mut self.changed_cells);
        for c in cells {
            self.cell_changed[c] = false;
            let info = self.cell_info[c];
            for fi in 0..self.mesh.cell_faces(c).len() {
                let f = self.mesh.cell_faces(c)[fi] as usize;
                if self.face_info[f].update_face(self.mesh, f, c, &info, self.tol) {
                    self.mark_face(f);
                }
            }
        }
    }

    /// Exchange changed coupled-patch faces with the paired ranks.
    ///
    /// Counts first, then patch-local face indices and records; all
    /// receives are posted before the matching payloads are awaited.
    fn exchange(&mut self) -> Result<(), MeshPlicError> {
        let coupled: Vec<(usize, usize)> = self
            .mesh
            .patches()
            .iter()
            .enumerate()
            .filter_map(|(pi, p)| p.coupling.map(|c| (pi, c.neighbour_rank)))
            .collect();
        if coupled.is_empty() {
            return Ok(());
        }

        let count_recvs: Vec<_> = coupled
            .iter()
            .map(|&(pi, peer)| (pi, peer, self.comm.irecv(peer, TAG_COUNT, 4)))
            .collect();

        for &(pi, peer) in &coupled {
            let patch = &self.mesh.patches()[pi];
            let mut idx: Vec<u32> = Vec::new();
            let mut recs: Vec<T> = Vec::new();
            for f in patch.faces() {
                if self.face_changed[f] {
                    idx.push((f - patch.start) as u32);
                    recs.push(self.face_info[f]);
                }
            }
            let n = idx.len() as u32;
            self.comm.isend(peer, TAG_COUNT, bytemuck::bytes_of(&n));
            if n > 0 {
                self.comm.isend(peer, TAG_FACES, bytemuck::cast_slice(&idx));
                self.comm.isend(peer, TAG_DATA, bytemuck::cast_slice(&recs));
            }
        }

        let mut payload_recvs = Vec::new();
        for (pi, peer, h) in count_recvs {
            let data = h.wait().ok_or_else(|| MeshPlicError::Comm {
                neighbor: peer,
                detail: "missing changed-face count".into(),
            })?;
            if data.len() != 4 {
                return Err(MeshPlicError::Comm {
                    neighbor: peer,
                    detail: format!("count message of {} bytes", data.len()),
                });
            }
            let n = u32::from_ne_bytes([data[0], data[1], data[2], data[3]]) as usize;
            if n > 0 {
                let idx = self.comm.irecv(peer, TAG_FACES, 4 * n);
                let rec = self.comm.irecv(peer, TAG_DATA, n * std::mem::size_of::<T>());
                payload_recvs.push((pi, peer, n, idx, rec));
            }
        }

        for (pi, peer, n, idx_h, rec_h) in payload_recvs {
            let missing = |what: &str| MeshPlicError::Comm {
                neighbor: peer,
                detail: format!("missing changed-face {what}"),
            };
            let idx_bytes = idx_h.wait().ok_or_else(|| missing("indices"))?;
            let rec_bytes = rec_h.wait().ok_or_else(|| missing("records"))?;
            // Received buffers are byte-aligned; re-collect to typed storage.
            let idx: Vec<u32> = bytemuck::pod_collect_to_vec(&idx_bytes);
            let recs: Vec<T> = bytemuck::pod_collect_to_vec(&rec_bytes);
            let patch = &self.mesh.patches()[pi];
            if idx.len() != n || recs.len() != n {
                return Err(MeshPlicError::Comm {
                    neighbor: peer,
                    detail: format!("expected {n} changed faces, got {}", idx.len()),
                });
            }
            let transform = match patch.coupling {
                Some(c) => c.transform,
                None => continue,
            };
            for (&k, rec) in idx.iter().zip(&recs) {
                let f = patch.start + k as usize;
                if f >= patch.start + patch.size {
                    return Err(MeshPlicError::Comm {
                        neighbor: peer,
                        detail: format!("face index {k} beyond patch of {}", patch.size),
                    });
                }
                let mut rec = *rec;
                rec.transform(&transform);
                if self.face_info[f].merge_face(self.mesh, f, &rec, self.tol) {
                    self.mark_face(f);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::algs::wave::info::WallPoint;
    use crate::mesh::build::box_mesh;

    #[test]
    fn seed_validation() {
        let mesh = box_mesh(2, 1, 1, [2.0, 1.0, 1.0]).unwrap();
        let comm = NoComm;
        let mut wave = FaceCellWave::new(&mesh, &comm, WallPoint::unvisited()).unwrap();
        assert!(wave.seed(&[0, 1], &[WallPoint::seed([0.0; 3])]).is_err());
        assert!(wave.seed(&[999], &[WallPoint::seed([0.0; 3])]).is_err());
    }

    #[test]
    fn iteration_cap_is_an_error() {
        let mesh = box_mesh(8, 1, 1, [8.0, 1.0, 1.0]).unwrap();
        let comm = NoComm;
        let mut wave = FaceCellWave::new(&mesh, &comm, WallPoint::unvisited()).unwrap();
        let f = mesh.n_internal_faces(); // first xmin boundary face
        wave.seed(&[f], &[WallPoint::seed(mesh.face_centre(f))])
            .unwrap();
        let err = wave.iterate(2).unwrap_err();
        assert!(matches!(err, MeshPlicError::ConvergenceFailure { .. }));
    }

    #[test]
    fn wave_reaches_all_cells() {
        let mesh = box_mesh(4, 3, 2, [4.0, 3.0, 2.0]).unwrap();
        let comm = NoComm;
        let mut wave = FaceCellWave::new(&mesh, &comm, WallPoint::unvisited()).unwrap();
        let seeds: Vec<usize> = mesh.patches()[0].faces().collect();
        let infos: Vec<WallPoint> = seeds
            .iter()
            .map(|&f| WallPoint::seed(mesh.face_centre(f)))
            .collect();
        wave.seed(&seeds, &infos).unwrap();
        wave.iterate(100).unwrap();
        for cell in 0..mesh.n_cells() {
            assert!(wave.cell_info()[cell].valid());
            assert!(wave.cell_info()[cell].dist_sqr >= 0.0);
        }
    }
}
