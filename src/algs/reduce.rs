//! Small collectives built from point-to-point messages: gather to rank 0,
//! combine, broadcast back.
//!
//! Every rank must enter each collective the same number of times with the
//! same tags; the wave engine and the reconstruction drivers guarantee this
//! by construction.

use bytemuck::Pod;

use crate::mesh_error::MeshPlicError;

use super::communicator::{CommTag, Communicator, Wait};

/// Tags reserved for the collectives in this module.
pub const TAG_GATHER: CommTag = CommTag(1);
pub const TAG_BCAST: CommTag = CommTag(2);

/// Logical OR of `local` over all ranks.
pub fn reduce_or<C: Communicator>(comm: &C, local: bool) -> Result<bool, MeshPlicError> {
    let combined = gather_bytes(comm, &[local as u8])?;
    Ok(combined.iter().any(|&b| b != 0))
}

/// Logical AND of `local` over all ranks.
pub fn reduce_and<C: Communicator>(comm: &C, local: bool) -> Result<bool, MeshPlicError> {
    Ok(!reduce_or(comm, !local)?)
}

/// Minimum of `local` over all ranks.
pub fn reduce_min<C: Communicator>(comm: &C, local: f64) -> Result<f64, MeshPlicError> {
    let combined = gather_bytes(comm, bytemuck::bytes_of(&local))?;
    let values: Vec<f64> = bytemuck::pod_collect_to_vec(&combined);
    Ok(values.iter().fold(f64::INFINITY, |m, &v| m.min(v)))
}

/// Sum of `local` over all ranks.
pub fn reduce_sum<C: Communicator>(comm: &C, local: f64) -> Result<f64, MeshPlicError> {
    let combined = gather_bytes(comm, bytemuck::bytes_of(&local))?;
    let values: Vec<f64> = bytemuck::pod_collect_to_vec(&combined);
    Ok(values.iter().sum())
}

/// Verify that every rank passes bitwise the same `value`.
///
/// Returns [`MeshPlicError::SyncMismatch`] on every rank if any pair
/// disagrees, before partition-dependent behaviour can develop.
pub fn check_uniform<C: Communicator, T: Pod + PartialEq>(
    comm: &C,
    value: T,
    what: &str,
) -> Result<(), MeshPlicError> {
    let combined = gather_bytes(comm, bytemuck::bytes_of(&value))?;
    let values: Vec<T> = bytemuck::pod_collect_to_vec(&combined);
    if values.iter().any(|v| *v != value) {
        return Err(MeshPlicError::SyncMismatch {
            rank: comm.rank(),
            detail: format!("ranks disagree on {what}"),
        });
    }
    Ok(())
}

/// Gather `local` from every rank on rank 0, then broadcast the
/// concatenation (rank-ordered) back to all ranks.
fn gather_bytes<C: Communicator>(comm: &C, local: &[u8]) -> Result<Vec<u8>, MeshPlicError> {
    let rank = comm.rank();
    let size = comm.size();
    let n = local.len();
    if size == 1 {
        return Ok(local.to_vec());
    }

    if rank == 0 {
        let recvs: Vec<_> = (1..size)
            .map(|peer| (peer, comm.irecv(peer, TAG_GATHER, n)))
            .collect();
        let mut combined = Vec::with_capacity(n * size);
        combined.extend_from_slice(local);
        for (peer, h) in recvs {
            let data = h.wait().ok_or_else(|| MeshPlicError::Comm {
                neighbor: peer,
                detail: "gather receive returned no data".into(),
            })?;
            combined.extend_from_slice(&data);
        }
        let mut sends = Vec::with_capacity(size - 1);
        for peer in 1..size {
            sends.push(comm.isend(peer, TAG_BCAST, &combined));
        }
        for s in sends {
            s.wait();
        }
        Ok(combined)
    } else {
        let recv = comm.irecv(0, TAG_BCAST, n * size);
        comm.isend(0, TAG_GATHER, local).wait();
        recv.wait().ok_or_else(|| MeshPlicError::Comm {
            neighbor: 0,
            detail: "broadcast receive returned no data".into(),
        })
    }
}
