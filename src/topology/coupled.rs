//! Coupled face pairing metadata.
//!
//! A [`CoupledFacePair`] records a couple between two faces of the mesh, as
//! produced during mesh assembly or import. Master and slave are fixed by a
//! global ordering rule (lower cell label is the master) so every partition
//! derives the same pairing independently. Pairs are created once and are
//! read-only thereafter.

use serde::{Deserialize, Serialize};

use crate::mesh_error::MeshPlicError;

/// Data associated with a pair of coupled faces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoupledFacePair {
    couple: usize,
    master_cell: usize,
    master_face: usize,
    slave_cell: usize,
    slave_face: usize,
    integral_match: bool,
}

impl CoupledFacePair {
    /// Construct from the two sides of a couple.
    ///
    /// The side with the lower cell label becomes the master; equal cell
    /// labels (degenerate input) fall back to the lower face label.
    pub fn new(
        couple: usize,
        cell_a: usize,
        face_a: usize,
        cell_b: usize,
        face_b: usize,
        integral_match: bool,
    ) -> Self {
        let a_is_master = (cell_a, face_a) < (cell_b, face_b);
        let (master_cell, master_face, slave_cell, slave_face) = if a_is_master {
            (cell_a, face_a, cell_b, face_b)
        } else {
            (cell_b, face_b, cell_a, face_a)
        };
        Self {
            couple,
            master_cell,
            master_face,
            slave_cell,
            slave_face,
            integral_match,
        }
    }

    /// Couple identifier.
    pub fn couple(&self) -> usize {
        self.couple
    }

    /// Master cell (lower cell label).
    pub fn master_cell(&self) -> usize {
        self.master_cell
    }

    /// Master face.
    pub fn master_face(&self) -> usize {
        self.master_face
    }

    /// Slave cell (higher cell label).
    pub fn slave_cell(&self) -> usize {
        self.slave_cell
    }

    /// Slave face.
    pub fn slave_face(&self) -> usize {
        self.slave_face
    }

    /// True for a one-to-one geometric match; false for an arbitrary
    /// (non-conformal) couple needing interpolation.
    pub fn integral_match(&self) -> bool {
        self.integral_match
    }
}

/// Read-only coupled-patch relation, keyed by patch index.
///
/// The owner side of a coupling is whichever side's arrays are referenced
/// from the primary mesh partition; it is fixed at construction. Couples
/// whose faces do not match integrally are additionally associated with an
/// error patch that collects the mismatched sub-faces.
#[derive(Clone, Debug, Default)]
pub struct CoupledPatchTable {
    /// Per-patch couple lists; `pairs[patch]` is empty for uncoupled patches.
    pairs: Vec<Vec<CoupledFacePair>>,
    /// Error patch index for non-integral couples, per patch.
    error_patch: Vec<Option<usize>>,
}

impl CoupledPatchTable {
    pub fn new(n_patches: usize) -> Self {
        Self {
            pairs: vec![Vec::new(); n_patches],
            error_patch: vec![None; n_patches],
        }
    }

    /// Attach the couples of `patch`, fixing its error patch if any couple
    /// is non-integral.
    pub fn set_patch(
        &mut self,
        patch: usize,
        pairs: Vec<CoupledFacePair>,
        error_patch: Option<usize>,
    ) -> Result<(), MeshPlicError> {
        if patch >= self.pairs.len() {
            return Err(MeshPlicError::UnknownPatch(patch));
        }
        if error_patch.is_none() && pairs.iter().any(|p| !p.integral_match()) {
            return Err(MeshPlicError::bad_mesh(format!(
                "patch {patch} has non-integral couples but no error patch"
            )));
        }
        self.pairs[patch] = pairs;
        self.error_patch[patch] = error_patch;
        Ok(())
    }

    /// Couples of `patch`.
    pub fn pairs(&self, patch: usize) -> Result<&[CoupledFacePair], MeshPlicError> {
        self.pairs
            .get(patch)
            .map(|v| v.as_slice())
            .ok_or(MeshPlicError::UnknownPatch(patch))
    }

    /// Error patch of `patch`, if it has non-integral couples.
    pub fn error_patch(&self, patch: usize) -> Result<Option<usize>, MeshPlicError> {
        self.error_patch
            .get(patch)
            .copied()
            .ok_or(MeshPlicError::UnknownPatch(patch))
    }
}
