//! Geometric predicates and polygon algorithms: vector/triangle metrics,
//! polygon triangulation, and projected triangle intersection.

pub mod intersect;
pub mod metrics;
pub mod triangulate;

pub use metrics::{Point, Vector};
pub use triangulate::{PolygonTriangulate, TriFace};
