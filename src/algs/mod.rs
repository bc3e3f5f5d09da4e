//! Mesh algorithms: communication backends, reductions, and wave
//! propagation.

pub mod communicator;
pub mod reduce;
pub mod wave;

pub use communicator::{CommTag, Communicator, NoComm, ThreadComm, Wait};
#[cfg(feature = "mpi-support")]
pub use communicator::MpiComm;
