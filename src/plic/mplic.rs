//! Multicut piecewise-linear interface reconstruction.
//!
//! Interface cells are cut by an iso-value of the point-interpolated
//! fraction field; the value is iterated until the wet sub-volume matches
//! the cell fraction. Strategies escalate per cell: one cut surface over
//! the whole cell, several cut loops, and finally a tet decomposition that
//! always succeeds. The resolved cut writes wet area fractions onto the
//! cell's faces; faces no interface cell resolves take the donor-cell
//! (upwind by flux sign) value.

use log::{debug, trace};

use crate::geometry::PolygonTriangulate;
use crate::mesh::PolyMesh;
use crate::mesh_error::MeshPlicError;
use crate::topology::{CompactList, VersionCache};

use super::cut::{self, cell_wet_volume_chained};
use super::tet::{cell_tets, tets_wet_volume};

/// Tunables for the reconstruction.
#[derive(Copy, Clone, Debug)]
pub struct MplicConfig {
    /// Cells with `alpha` within this of 0 or 1 are not interface cells.
    pub interface_tol: f64,
    /// Accepted relative mismatch between wet volume and target.
    pub volume_tol: f64,
    /// Bisection iterations per strategy.
    pub max_bisect: usize,
}

impl Default for MplicConfig {
    fn default() -> Self {
        Self {
            interface_tol: 1e-6,
            volume_tol: 1e-8,
            max_bisect: 32,
        }
    }
}

/// Face fractions produced by [`Mplic::interpolate`].
pub struct AlphaFaces {
    /// Per-face wet fraction in `[0, 1]`.
    pub alphaf: Vec<f64>,
    /// Faces resolved by a cell cut (the rest are upwind values).
    pub corrected: Vec<bool>,
}

#[derive(Copy, Clone, PartialEq, Debug)]
enum Strategy {
    Single,
    Multi,
    Tet,
}

/// Reconstruction driver holding reusable workspaces.
pub struct Mplic {
    cfg: MplicConfig,
    tri: PolygonTriangulate,
    /// Point interpolation weights, keyed on the mesh topology version.
    weights: VersionCache<CompactList<f64>>,
}

impl Mplic {
    pub fn new() -> Self {
        Self::with_config(MplicConfig::default())
    }

    pub fn with_config(cfg: MplicConfig) -> Self {
        Self {
            cfg,
            tri: PolygonTriangulate::new(),
            weights: VersionCache::new(),
        }
    }

    /// Face fractions for cell fractions `alpha` under face fluxes `phi`.
    pub fn interpolate(
        &mut self,
        mesh: &PolyMesh,
        alpha: &[f64],
        phi: &[f64],
    ) -> Result<AlphaFaces, MeshPlicError> {
        if alpha.len() != mesh.n_cells() {
            return Err(MeshPlicError::bad_mesh(format!(
                "{} cell fractions for {} cells",
                alpha.len(),
                mesh.n_cells()
            )));
        }
        if phi.len() != mesh.n_faces() {
            return Err(MeshPlicError::bad_mesh(format!(
                "{} face fluxes for {} faces",
                phi.len(),
                mesh.n_faces()
            )));
        }

        let weights = self
            .weights
            .get_or_rebuild(mesh.topology_version(), || cut::point_weights(mesh));
        let levels = cut::point_field(mesh, weights, alpha);

        // Upwind (donor-cell) fill; cell cuts overwrite below.
        let mut alphaf: Vec<f64> = (0..mesh.n_faces())
            .map(|f| {
                let donor = match mesh.neighbour(f) {
                    Some(nb) if phi[f] < 0.0 => nb,
                    _ => mesh.owner(f),
                };
                alpha[donor].clamp(0.0, 1.0)
            })
            .collect();
        let mut corrected = vec![false; mesh.n_faces()];

        let tol = self.cfg.interface_tol;
        for cell in 0..mesh.n_cells() {
            if alpha[cell] <= tol || alpha[cell] >= 1.0 - tol {
                continue;
            }
            if let Some(iso) = self.cut_cell(mesh, cell, &levels, alpha[cell])? {
                self.write_faces(mesh, cell, &levels, iso, &mut alphaf, &mut corrected);
            }
        }
        Ok(AlphaFaces { alphaf, corrected })
    }

    /// Find the iso-value whose wet volume matches `alpha * V`, escalating
    /// through the cut strategies. `None` when the point field is too flat
    /// to cut (the upwind value stands).
    fn cut_cell(
        &mut self,
        mesh: &PolyMesh,
        cell: usize,
        levels: &[f64],
        alpha: f64,
    ) -> Result<Option<f64>, MeshPlicError> {
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for &p in &mesh.cell_points(cell) {
            lo = lo.min(levels[p as usize]);
            hi = hi.max(levels[p as usize]);
        }
        if hi - lo < self.cfg.interface_tol {
            debug!("cell {cell}: point field too flat to cut");
            return Ok(None);
        }
        let target = alpha * mesh.cell_volume(cell);
        let vol_tol = self.cfg.volume_tol * mesh.cell_volume(cell);

        for strategy in [Strategy::Single, Strategy::Multi] {
            let allow_multi = strategy == Strategy::Multi;
            let probe = |iso: f64| cell_wet_volume_chained(mesh, cell, levels, iso, allow_multi);
            if let Some((iso, vol)) = bisect(&probe, lo, hi, target, vol_tol, self.cfg.max_bisect)
            {
                if (vol - target).abs() <= vol_tol {
                    trace!("cell {cell}: {strategy:?} cut at iso {iso}");
                    return Ok(Some(iso));
                }
            }
            trace!("cell {cell}: {strategy:?} cut failed, escalating");
        }

        // The tet probe is total and monotone in the iso-value, so the
        // bisection always lands; accept its result even at the tolerance
        // edge rather than leave the cell uncut.
        let tets = cell_tets(mesh, cell, levels, &mut self.tri)?;
        let probe = |iso: f64| Some(tets_wet_volume(&tets, iso));
        let (iso, vol) = bisect(&probe, lo, hi, target, vol_tol, self.cfg.max_bisect)
            .ok_or_else(|| MeshPlicError::ConvergenceFailure {
                iterations: self.cfg.max_bisect,
                context: format!("iso-value search in cell {cell}"),
            })?;
        if (vol - target).abs() > vol_tol {
            debug!("cell {cell}: {:?} cut accepted at iso {iso} beyond volume tolerance", Strategy::Tet);
        } else {
            trace!("cell {cell}: {:?} cut at iso {iso}", Strategy::Tet);
        }
        Ok(Some(iso))
    }

    fn write_faces(
        &mut self,
        mesh: &PolyMesh,
        cell: usize,
        levels: &[f64],
        iso: f64,
        alphaf: &mut [f64],
        corrected: &mut [bool],
    ) {
        for &f in mesh.cell_faces(cell) {
            let f = f as usize;
            // First resolving cell wins; a shared face is not re-cut.
            if corrected[f] {
                continue;
            }
            let pts = mesh.face_points(f);
            let face_pts: Vec<_> = pts.iter().map(|&p| mesh.points()[p as usize]).collect();
            let face_lvls: Vec<f64> = pts.iter().map(|&p| levels[p as usize]).collect();
            let wet = crate::geometry::metrics::norm(
                cut::cut_face(&face_pts, &face_lvls, iso).wet_area(),
            );
            let total = crate::geometry::metrics::norm(mesh.face_area(f));
            alphaf[f] = (wet / total).clamp(0.0, 1.0);
            corrected[f] = true;
        }
    }
}

impl Default for Mplic {
    fn default() -> Self {
        Self::new()
    }
}

/// Bisection for the iso-value whose probed wet volume meets `target`.
///
/// The wet volume is non-increasing in the iso-value. Returns the final
/// `(iso, volume)` pair, or `None` when the probe fails at an evaluated
/// value; the caller judges the achieved mismatch.
fn bisect(
    probe: &dyn Fn(f64) -> Option<f64>,
    mut lo: f64,
    mut hi: f64,
    target: f64,
    vol_tol: f64,
    max_iter: usize,
) -> Option<(f64, f64)> {
    let mut iso = 0.5 * (lo + hi);
    let mut vol = probe(iso)?;
    for _ in 0..max_iter {
        if (vol - target).abs() <= vol_tol {
            break;
        }
        if vol > target {
            lo = iso;
        } else {
            hi = iso;
        }
        iso = 0.5 * (lo + hi);
        vol = probe(iso)?;
    }
    Some((iso, vol))
}
