#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-plic
//!
//! mesh-plic is a Rust library of mesh kernels for finite-volume interface
//! capturing: compact adjacency storage, zone and coupled-patch bookkeeping,
//! robust polygon triangulation and projection intersection predicates, a
//! synchronized face→cell→face wave propagator, and multicut PLIC interface
//! reconstruction. It supports serial, in-process multi-rank (threaded), and
//! MPI-based distributed workflows over partitioned polyhedral meshes.
//!
//! ## Features
//! - `CompactList` offset-table storage for one-to-many mesh adjacency
//! - Named zones with orientation flip flags and coupled face pairing
//! - Ear-clipping triangulation with quality optimization and
//!   self-intersection recovery; projected triangle intersection predicates
//! - FaceCellWave distance/payload propagation with halo exchange and
//!   global convergence agreement
//! - MPLIC reconstruction: single → multi → tetrahedral cut escalation
//!   matching cell volume fractions, producing bounded face fractions
//!
//! ## Usage
//! Add `mesh-plic` as a dependency in your `Cargo.toml` and enable features
//! as needed:
//!
//! ```toml
//! [dependencies]
//! mesh-plic = "0.2"
//! # Optional features:
//! # features = ["mpi-support"]
//! ```

pub mod algs;
pub mod geometry;
pub mod mesh;
pub mod mesh_error;
pub mod plic;
pub mod topology;

pub use mesh_error::MeshPlicError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::Communicator;
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{NoComm, ThreadComm};
    pub use crate::algs::wave::{
        wall_data, wall_distance, FaceCellWave, WallData, WallPoint, WaveField, WaveInfo,
    };
    pub use crate::geometry::{Point, PolygonTriangulate, TriFace, Vector};
    pub use crate::mesh::{Patch, PolyMesh, ProcCoupling, Transform};
    pub use crate::mesh_error::MeshPlicError;
    pub use crate::plic::{AlphaFaces, Mplic, MplicConfig};
    pub use crate::topology::{
        CompactList, CoupledFacePair, CoupledPatchTable, VersionCache, Zone, ZoneKind, ZoneList,
    };
}
