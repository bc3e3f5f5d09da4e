//! Graph wave propagation over faces and cells.

pub mod face_cell_wave;
pub mod info;
pub mod patch_dist;

pub use face_cell_wave::{FaceCellWave, DEFAULT_TOLERANCE};
pub use info::{WallData, WallPoint, WaveInfo};
pub use patch_dist::{wall_data, wall_distance, WaveField};
