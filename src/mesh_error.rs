//! MeshPlicError: unified error type for mesh-plic public APIs.
//!
//! Every fallible public API in the crate returns this type so callers can
//! match on one enum. Recoverable conditions (degenerate geometry during a
//! cut, an unreached wave entity) are handled internally by the algorithms
//! and never surface here; the variants below describe conditions the caller
//! must decide about.

use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for mesh-plic operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshPlicError {
    /// Polygon or cell geometry too degenerate to process (fewer than three
    /// points, zero projected area, coincident points).
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Invalid resize of a compact list. Growing the row count requires the
    /// new rows' sizes, so the plain row resize only contracts.
    #[error("invalid compact-list resize: requested {requested} rows, have {have}")]
    Size { requested: usize, have: usize },

    /// The same entity was inserted into the same zone with contradictory
    /// flip flags. Construction of the case is invalid.
    #[error("zone `{zone}` already holds face {member} with flip={existing}, refusing flip={requested}")]
    ZoneConflict {
        zone: String,
        member: usize,
        existing: bool,
        requested: bool,
    },

    /// No zone with this name or index exists.
    #[error("unknown zone `{0}`")]
    UnknownZone(String),

    /// No patch with this index exists on the mesh.
    #[error("unknown patch index {0}")]
    UnknownPatch(usize),

    /// An entity index was outside the mesh's range.
    #[error("mesh addressing error: {0}")]
    BadMesh(String),

    /// Wave propagation or a cut-value search exceeded its iteration cap.
    #[error("no convergence after {iterations} iterations: {context}")]
    ConvergenceFailure { iterations: usize, context: String },

    /// Parallel ranks disagree on a value expected to be globally uniform.
    /// Continuing would produce partition-dependent results, so this is
    /// surfaced immediately.
    #[error("synchronization mismatch on rank {rank}: {detail}")]
    SyncMismatch { rank: usize, detail: String },

    /// A halo exchange with a neighbouring rank failed.
    #[error("communication with rank {neighbor} failed: {detail}")]
    Comm { neighbor: usize, detail: String },
}

impl MeshPlicError {
    /// Shorthand for a [`MeshPlicError::BadMesh`] with a formatted message.
    pub fn bad_mesh(msg: impl Into<String>) -> Self {
        MeshPlicError::BadMesh(msg.into())
    }
}
