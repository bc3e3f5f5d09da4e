//! Parallel determinism: the wave over a slab-decomposed mesh reproduces
//! the single-partition result.

use mesh_plic::algs::wave::wall_distance;
use mesh_plic::mesh::build::{box_mesh, box_mesh_slab};
use mesh_plic::prelude::*;
use serial_test::serial;

const NX: usize = 8;
const NY: usize = 3;
const NZ: usize = 2;
const DIMS: [f64; 3] = [8.0, 3.0, 2.0];

/// Run the wall-distance wave on every slab in its own thread and return
/// the per-rank cell fields.
fn distributed_distance(n_ranks: usize, seed_patch_name: &str) -> Vec<Vec<f64>> {
    let group = ThreadComm::group(n_ranks);
    let handles: Vec<_> = group
        .into_iter()
        .enumerate()
        .map(|(rank, comm)| {
            let name = seed_patch_name.to_string();
            std::thread::spawn(move || {
                let mesh = box_mesh_slab(NX, NY, NZ, DIMS, rank, n_ranks).unwrap();
                let seeds: Vec<usize> = mesh
                    .patches()
                    .iter()
                    .position(|p| p.name == name)
                    .map(|pi| vec![pi])
                    .unwrap_or_default();
                wall_distance(&mesh, &comm, &seeds, -1.0).unwrap().cells
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
#[serial]
fn two_ranks_match_serial() {
    let full = box_mesh(NX, NY, NZ, DIMS).unwrap();
    let serial_dist = wall_distance(&full, &NoComm, &[0], -1.0).unwrap().cells;

    let per_rank = distributed_distance(2, "xmin");
    // Slab cells along x are contiguous blocks of the global x index; map
    // each local cell to its global counterpart by cell centre.
    for (rank, dist) in per_rank.iter().enumerate() {
        let slab = box_mesh_slab(NX, NY, NZ, DIMS, rank, 2).unwrap();
        assert_eq!(dist.len(), slab.n_cells());
        for cell in 0..slab.n_cells() {
            let c = slab.cell_centre(cell);
            let global = (0..full.n_cells())
                .find(|&g| {
                    let gc = full.cell_centre(g);
                    (gc[0] - c[0]).abs() < 1e-9
                        && (gc[1] - c[1]).abs() < 1e-9
                        && (gc[2] - c[2]).abs() < 1e-9
                })
                .unwrap();
            assert!(
                (dist[cell] - serial_dist[global]).abs() < 1e-9,
                "rank {rank} cell {cell}: {} vs {}",
                dist[cell],
                serial_dist[global]
            );
        }
    }
}

#[test]
#[serial]
fn four_ranks_match_the_flat_patch_distance() {
    // The seed patch is flat, so the exact distance is the x coordinate;
    // every slab must reproduce it across two processor hops.
    let per_rank = distributed_distance(4, "xmin");
    for (rank, dist) in per_rank.iter().enumerate() {
        let slab = box_mesh_slab(NX, NY, NZ, DIMS, rank, 4).unwrap();
        for cell in 0..slab.n_cells() {
            let x = slab.cell_centre(cell)[0];
            assert!((dist[cell] - x).abs() < 1e-9, "rank {rank}: {}", dist[cell]);
        }
    }
}

#[test]
#[serial]
fn seed_on_the_last_rank_propagates_backwards() {
    let per_rank = distributed_distance(2, "xmax");
    for (rank, dist) in per_rank.iter().enumerate() {
        let slab = box_mesh_slab(NX, NY, NZ, DIMS, rank, 2).unwrap();
        for cell in 0..slab.n_cells() {
            let x = slab.cell_centre(cell)[0];
            assert!(
                (dist[cell] - (DIMS[0] - x)).abs() < 1e-9,
                "rank {rank}: {} at x {x}",
                dist[cell]
            );
        }
    }
}
