//! Mesh topology building blocks: compact adjacency storage, zones with
//! orientation flags, coupled-face pairing, and version-keyed caching of
//! derived data.

pub mod cache;
pub mod compact;
pub mod coupled;
pub mod zone;

pub use cache::VersionCache;
pub use compact::CompactList;
pub use coupled::{CoupledFacePair, CoupledPatchTable};
pub use zone::{Zone, ZoneInsertion, ZoneKind, ZoneList};
