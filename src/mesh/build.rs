//! Structured test meshes: single cells, boxes, and slab-decomposed boxes
//! with index-matched processor patches.

use crate::geometry::metrics::Point;
use crate::mesh_error::MeshPlicError;
use crate::topology::CompactList;

use super::{Patch, PolyMesh, ProcCoupling, Transform};

/// A single unit hexahedral cell with one patch per side.
pub fn unit_cube() -> Result<PolyMesh, MeshPlicError> {
    box_mesh(1, 1, 1, [1.0, 1.0, 1.0])
}

/// Structured hexahedral box of `nx * ny * nz` cells spanning `dims` from
/// the origin, with patches `xmin`, `xmax`, `ymin`, `ymax`, `zmin`, `zmax`.
pub fn box_mesh(nx: usize, ny: usize, nz: usize, dims: [f64; 3]) -> Result<PolyMesh, MeshPlicError> {
    build_box(
        [0.0; 3],
        [nx, ny, nz],
        [dims[0] / nx as f64, dims[1] / ny as f64, dims[2] / nz as f64],
        SidePatch::wall("xmin"),
        SidePatch::wall("xmax"),
    )
}

/// One slab of `box_mesh(nx, ny, nz, dims)` decomposed along x into
/// `n_ranks` partitions.
///
/// Slab boundaries use the integer split `nx * r / n_ranks`, so any `nx >=
/// n_ranks` decomposes. Inter-slab boundaries become processor patches whose
/// faces are index-matched with the neighbouring rank's patch; running the
/// same algorithm over all slabs must reproduce the undecomposed result.
pub fn box_mesh_slab(
    nx: usize,
    ny: usize,
    nz: usize,
    dims: [f64; 3],
    rank: usize,
    n_ranks: usize,
) -> Result<PolyMesh, MeshPlicError> {
    if n_ranks == 0 || rank >= n_ranks {
        return Err(MeshPlicError::bad_mesh(format!(
            "rank {rank} outside decomposition of {n_ranks}"
        )));
    }
    if nx < n_ranks {
        return Err(MeshPlicError::bad_mesh(format!(
            "{nx} cells along x cannot split into {n_ranks} slabs"
        )));
    }
    let lo = nx * rank / n_ranks;
    let hi = nx * (rank + 1) / n_ranks;
    let dx = dims[0] / nx as f64;
    let xmin = if rank == 0 {
        SidePatch::wall("xmin")
    } else {
        SidePatch::coupled(format!("procBoundary{rank}to{}", rank - 1), rank - 1)
    };
    let xmax = if rank + 1 == n_ranks {
        SidePatch::wall("xmax")
    } else {
        SidePatch::coupled(format!("procBoundary{rank}to{}", rank + 1), rank + 1)
    };
    build_box(
        [lo as f64 * dx, 0.0, 0.0],
        [hi - lo, ny, nz],
        [dx, dims[1] / ny as f64, dims[2] / nz as f64],
        xmin,
        xmax,
    )
}

struct SidePatch {
    name: String,
    coupling: Option<ProcCoupling>,
}

impl SidePatch {
    fn wall(name: &str) -> Self {
        Self {
            name: name.to_string(),
            coupling: None,
        }
    }

    fn coupled(name: String, neighbour_rank: usize) -> Self {
        Self {
            name,
            coupling: Some(ProcCoupling {
                neighbour_rank,
                transform: Transform::identity(),
            }),
        }
    }
}

fn build_box(
    origin: Point,
    n: [usize; 3],
    d: [f64; 3],
    xmin: SidePatch,
    xmax: SidePatch,
) -> Result<PolyMesh, MeshPlicError> {
    let [nx, ny, nz] = n;
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(MeshPlicError::bad_mesh("zero cells along an axis"));
    }

    let pid = |i: usize, j: usize, k: usize| (i + j * (nx + 1) + k * (nx + 1) * (ny + 1)) as u32;
    let cid = |i: usize, j: usize, k: usize| (i + j * nx + k * nx * ny) as u32;

    let mut points = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                points.push([
                    origin[0] + i as f64 * d[0],
                    origin[1] + j as f64 * d[1],
                    origin[2] + k as f64 * d[2],
                ]);
            }
        }
    }

    // Quads with outward/owner-to-neighbour winding along each axis.
    let x_face = |i: usize, j: usize, k: usize| {
        [pid(i, j, k), pid(i, j + 1, k), pid(i, j + 1, k + 1), pid(i, j, k + 1)]
    };
    let y_face = |i: usize, j: usize, k: usize| {
        [pid(i, j, k), pid(i, j, k + 1), pid(i + 1, j, k + 1), pid(i + 1, j, k)]
    };
    let z_face = |i: usize, j: usize, k: usize| {
        [pid(i, j, k), pid(i + 1, j, k), pid(i + 1, j + 1, k), pid(i, j + 1, k)]
    };
    let reversed = |q: [u32; 4]| [q[0], q[3], q[2], q[1]];

    let mut faces: Vec<[u32; 4]> = Vec::new();
    let mut owner: Vec<u32> = Vec::new();
    let mut neighbour: Vec<u32> = Vec::new();

    // Internal faces, normals along +x, +y, +z.
    for k in 0..nz {
        for j in 0..ny {
            for i in 1..nx {
                faces.push(x_face(i, j, k));
                owner.push(cid(i - 1, j, k));
                neighbour.push(cid(i, j, k));
            }
        }
    }
    for k in 0..nz {
        for j in 1..ny {
            for i in 0..nx {
                faces.push(y_face(i, j, k));
                owner.push(cid(i, j - 1, k));
                neighbour.push(cid(i, j, k));
            }
        }
    }
    for k in 1..nz {
        for j in 0..ny {
            for i in 0..nx {
                faces.push(z_face(i, j, k));
                owner.push(cid(i, j, k - 1));
                neighbour.push(cid(i, j, k));
            }
        }
    }

    let mut patches = Vec::with_capacity(6);
    let mut add_patch = |name: String,
                         coupling: Option<ProcCoupling>,
                         patch_faces: Vec<([u32; 4], u32)>,
                         faces: &mut Vec<[u32; 4]>,
                         owner: &mut Vec<u32>| {
        patches.push(Patch {
            name,
            start: faces.len(),
            size: patch_faces.len(),
            coupling,
        });
        for (quad, own) in patch_faces {
            faces.push(quad);
            owner.push(own);
        }
    };

    // The (k, j) and (k, i) loop orders here fix the index matching used by
    // processor couplings on the x sides.
    let mut lo_faces = Vec::with_capacity(ny * nz);
    let mut hi_faces = Vec::with_capacity(ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            lo_faces.push((reversed(x_face(0, j, k)), cid(0, j, k)));
            hi_faces.push((x_face(nx, j, k), cid(nx - 1, j, k)));
        }
    }
    add_patch(xmin.name, xmin.coupling, lo_faces, &mut faces, &mut owner);
    add_patch(xmax.name, xmax.coupling, hi_faces, &mut faces, &mut owner);

    let mut lo_faces = Vec::with_capacity(nx * nz);
    let mut hi_faces = Vec::with_capacity(nx * nz);
    for k in 0..nz {
        for i in 0..nx {
            lo_faces.push((reversed(y_face(i, 0, k)), cid(i, 0, k)));
            hi_faces.push((y_face(i, ny, k), cid(i, ny - 1, k)));
        }
    }
    add_patch("ymin".into(), None, lo_faces, &mut faces, &mut owner);
    add_patch("ymax".into(), None, hi_faces, &mut faces, &mut owner);

    let mut lo_faces = Vec::with_capacity(nx * ny);
    let mut hi_faces = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            lo_faces.push((reversed(z_face(i, j, 0)), cid(i, j, 0)));
            hi_faces.push((z_face(i, j, nz), cid(i, j, nz - 1)));
        }
    }
    add_patch("zmin".into(), None, lo_faces, &mut faces, &mut owner);
    add_patch("zmax".into(), None, hi_faces, &mut faces, &mut owner);

    PolyMesh::new(points, CompactList::from_rows(&faces), owner, neighbour, patches)
}
