//! Piecewise-linear interface reconstruction on the point-interpolated
//! fraction field.

pub mod cut;
pub mod mplic;
pub mod tet;

pub use mplic::{AlphaFaces, Mplic, MplicConfig};
