//! Wall-distance drivers: seed a wave on a set of patches and collect the
//! propagated distances (and payloads) into cell and patch fields.

use log::debug;

use crate::algs::communicator::Communicator;
use crate::algs::reduce::reduce_sum;
use crate::geometry::metrics::Vector;
use crate::mesh::PolyMesh;
use crate::mesh_error::MeshPlicError;

use super::face_cell_wave::FaceCellWave;
use super::info::{WallData, WallPoint, WaveInfo};

/// A propagated value extracted per cell and per boundary face.
///
/// `patches[pi][k]` is the value on face `k` of patch `pi`, for every patch
/// of the mesh; seeded patch faces hold their seed value.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveField<V> {
    pub cells: Vec<V>,
    pub patches: Vec<Vec<V>>,
}

/// Distance from every cell centre and boundary face centre to the nearest
/// face of `seed_patches`.
///
/// Entities the wave never reaches (isolated regions) take `stabilise`.
pub fn wall_distance<C: Communicator>(
    mesh: &PolyMesh,
    comm: &C,
    seed_patches: &[usize],
    stabilise: f64,
) -> Result<WaveField<f64>, MeshPlicError> {
    let seeds = patch_seed_faces(mesh, seed_patches)?;
    let infos: Vec<WallPoint> = seeds
        .iter()
        .map(|&f| WallPoint::seed(mesh.face_centre(f)))
        .collect();

    let mut wave = FaceCellWave::new(mesh, comm, WallPoint::unvisited())?;
    wave.seed(&seeds, &infos)?;
    wave.iterate(iteration_cap(mesh, comm)?)?;

    Ok(collect(mesh, &wave, stabilise, |r| r.dist_sqr.sqrt()))
}

/// As [`wall_distance`], also transporting a scalar and a vector from the
/// nearest seed face. `seeds` pairs each seed face with its payload.
#[allow(clippy::type_complexity)]
pub fn wall_data<C: Communicator>(
    mesh: &PolyMesh,
    comm: &C,
    seeds: &[(usize, f64, Vector)],
    stabilise: f64,
) -> Result<(WaveField<f64>, WaveField<f64>, WaveField<Vector>), MeshPlicError> {
    let faces: Vec<usize> = seeds.iter().map(|&(f, _, _)| f).collect();
    let infos: Vec<WallData> = seeds
        .iter()
        .map(|&(f, s, v)| WallData::seed(mesh.face_centre(f), s, v))
        .collect();

    let mut wave = FaceCellWave::new(mesh, comm, WallData::unvisited())?;
    wave.seed(&faces, &infos)?;
    wave.iterate(iteration_cap(mesh, comm)?)?;

    let dist = collect(mesh, &wave, stabilise, |r| r.dist_sqr.sqrt());
    let s = collect(mesh, &wave, 0.0, |r| r.s);
    let v = collect(mesh, &wave, [0.0; 3], |r| r.v);
    Ok((dist, s, v))
}

fn patch_seed_faces(mesh: &PolyMesh, patches: &[usize]) -> Result<Vec<usize>, MeshPlicError> {
    let mut seeds = Vec::new();
    for &pi in patches {
        seeds.extend(mesh.patch(pi)?.faces());
    }
    Ok(seeds)
}

/// Global round cap: information crosses at most one cell layer per round,
/// so the global cell count plus slack bounds any converging wave.
fn iteration_cap<C: Communicator>(mesh: &PolyMesh, comm: &C) -> Result<usize, MeshPlicError> {
    let global_cells = reduce_sum(comm, mesh.n_cells() as f64)?;
    Ok(global_cells as usize + 2)
}

fn collect<T: WaveInfo, C: Communicator, V: Copy>(
    mesh: &PolyMesh,
    wave: &FaceCellWave<T, C>,
    fallback: V,
    extract: impl Fn(&T) -> V,
) -> WaveField<V> {
    let mut unvisited = 0usize;
    let mut take = |r: &T| {
        if r.valid() {
            extract(r)
        } else {
            unvisited += 1;
            fallback
        }
    };
    let cells: Vec<V> = wave.cell_info().iter().map(&mut take).collect();
    let face_info = wave.face_info();
    let patches: Vec<Vec<V>> = mesh
        .patches()
        .iter()
        .map(|p| p.faces().map(|f| take(&face_info[f])).collect())
        .collect();
    if unvisited > 0 {
        debug!(
            "{unvisited} of {} entities unreached by wave",
            mesh.n_cells() + mesh.n_faces() - mesh.n_internal_faces()
        );
    }
    WaveField { cells, patches }
}
