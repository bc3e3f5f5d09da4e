//! Named zones of mesh entities with orientation flags.
//!
//! A zone is an ordered subset of cells, faces, or points, addressed by name
//! or by index in its [`ZoneList`]. Face zones additionally carry a flip flag
//! per member: `true` means the zone's canonical normal opposes the face's
//! natural (owner→neighbour) orientation. A face may sit in several zones
//! with independent flips, so membership is held per `(zone, member)` pair.
//!
//! Incremental insertion goes through [`ZoneList::insert`], which is atomic
//! across zones: the whole request is validated before any zone changes, so
//! a contradictory flip leaves every zone untouched.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::mesh_error::MeshPlicError;

/// What kind of mesh entity a zone collects.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    Cell,
    Face,
    Point,
}

/// A named, ordered subset of mesh entities.
#[derive(Clone, Debug)]
pub struct Zone {
    name: String,
    kind: ZoneKind,
    /// Members in insertion order.
    members: Vec<usize>,
    /// Sparse membership map: member index → (position, flip).
    index: HashMap<usize, (usize, bool)>,
}

impl Zone {
    pub fn new(name: impl Into<String>, kind: ZoneKind) -> Self {
        Self {
            name: name.into(),
            kind,
            members: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ZoneKind {
        self.kind
    }

    /// Members in insertion order.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// True when `member` belongs to this zone.
    pub fn contains(&self, member: usize) -> bool {
        self.index.contains_key(&member)
    }

    /// Flip flag of `member`, if present.
    pub fn flip(&self, member: usize) -> Option<bool> {
        self.index.get(&member).map(|&(_, flip)| flip)
    }

    /// Flip flags aligned with [`Zone::members`].
    pub fn flip_map(&self) -> Vec<bool> {
        self.members
            .iter()
            .map(|m| self.index[m].1)
            .collect()
    }

    fn push(&mut self, member: usize, flip: bool) {
        if !self.index.contains_key(&member) {
            self.index.insert(member, (self.members.len(), flip));
            self.members.push(member);
        }
    }
}

/// A request to insert entities into one zone of a [`ZoneList`].
///
/// Maps member index → flip flag. Non-face zones ignore the flag.
pub type ZoneInsertion = HashMap<usize, bool>;

/// Ordered collection of zones with name lookup.
#[derive(Clone, Debug, Default)]
pub struct ZoneList {
    zones: Vec<Zone>,
    by_name: HashMap<String, usize>,
}

impl ZoneList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an empty zone and return its index.
    pub fn add(&mut self, name: impl Into<String>, kind: ZoneKind) -> usize {
        let name = name.into();
        let zi = self.zones.len();
        self.by_name.insert(name.clone(), zi);
        self.zones.push(Zone::new(name, kind));
        zi
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn get(&self, zi: usize) -> Option<&Zone> {
        self.zones.get(zi)
    }

    /// Zone index by name.
    pub fn find(&self, name: &str) -> Result<usize, MeshPlicError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| MeshPlicError::UnknownZone(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    /// Insert entities into several zones atomically.
    ///
    /// Either the whole request applies or none of it does. Re-inserting a
    /// member already present with the same flip is a no-op; a contradictory
    /// flip fails with [`MeshPlicError::ZoneConflict`] before any mutation.
    pub fn insert(&mut self, request: &[(usize, ZoneInsertion)]) -> Result<(), MeshPlicError> {
        // Validate the whole request first.
        for &(zi, ref insertion) in request {
            let zone = self
                .zones
                .get(zi)
                .ok_or_else(|| MeshPlicError::UnknownZone(format!("#{zi}")))?;
            for (&member, &flip) in insertion {
                if let Some(existing) = zone.flip(member) {
                    if existing != flip {
                        return Err(MeshPlicError::ZoneConflict {
                            zone: zone.name.clone(),
                            member,
                            existing,
                            requested: flip,
                        });
                    }
                }
            }
        }
        // Apply. Sort member order within one insertion for determinism.
        for &(zi, ref insertion) in request {
            let mut members: Vec<(usize, bool)> =
                insertion.iter().map(|(&m, &f)| (m, f)).collect();
            members.sort_unstable_by_key(|&(m, _)| m);
            let zone = &mut self.zones[zi];
            for (member, flip) in members {
                zone.push(member, flip);
            }
        }
        Ok(())
    }

    /// For each candidate zone containing `face`, return its flip flag.
    ///
    /// Solvers use this to fix the outward-normal sign of a face regardless
    /// of which zone they query through.
    pub fn zones_flip_face(
        &self,
        face: usize,
        candidates: &[usize],
    ) -> Result<Vec<(usize, bool)>, MeshPlicError> {
        let mut out = Vec::new();
        for &zi in candidates {
            let zone = self
                .zones
                .get(zi)
                .ok_or_else(|| MeshPlicError::UnknownZone(format!("#{zi}")))?;
            if let Some(flip) = zone.flip(face) {
                out.push((zi, flip));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insertion(pairs: &[(usize, bool)]) -> ZoneInsertion {
        pairs.iter().copied().collect()
    }

    #[test]
    fn insert_and_query_flip() {
        let mut zones = ZoneList::new();
        let z = zones.add("outlet", ZoneKind::Face);
        zones.insert(&[(z, insertion(&[(4, true), (7, false)]))]).unwrap();
        assert_eq!(zones.get(z).unwrap().flip(4), Some(true));
        assert_eq!(zones.zones_flip_face(4, &[z]).unwrap(), vec![(z, true)]);
        assert_eq!(zones.zones_flip_face(5, &[z]).unwrap(), vec![]);
    }

    #[test]
    fn reinsert_same_flip_is_idempotent() {
        let mut zones = ZoneList::new();
        let z = zones.add("baffle", ZoneKind::Face);
        zones.insert(&[(z, insertion(&[(3, true)]))]).unwrap();
        zones.insert(&[(z, insertion(&[(3, true)]))]).unwrap();
        assert_eq!(zones.get(z).unwrap().len(), 1);
    }

    #[test]
    fn contradictory_flip_conflicts_atomically() {
        let mut zones = ZoneList::new();
        let a = zones.add("a", ZoneKind::Face);
        let b = zones.add("b", ZoneKind::Face);
        zones.insert(&[(a, insertion(&[(1, true)]))]).unwrap();
        // Second zone insertion is valid, but the request as a whole is not.
        let err = zones
            .insert(&[(b, insertion(&[(9, false)])), (a, insertion(&[(1, false)]))])
            .unwrap_err();
        assert!(matches!(err, MeshPlicError::ZoneConflict { member: 1, .. }));
        assert!(zones.get(b).unwrap().is_empty(), "failed insert must not apply");
    }

    #[test]
    fn face_in_multiple_zones_with_independent_flips() {
        let mut zones = ZoneList::new();
        let a = zones.add("a", ZoneKind::Face);
        let b = zones.add("b", ZoneKind::Face);
        zones
            .insert(&[(a, insertion(&[(2, true)])), (b, insertion(&[(2, false)]))])
            .unwrap();
        let flips = zones.zones_flip_face(2, &[a, b]).unwrap();
        assert_eq!(flips, vec![(a, true), (b, false)]);
    }

    #[test]
    fn lookup_by_name() {
        let mut zones = ZoneList::new();
        zones.add("movingCells", ZoneKind::Cell);
        assert_eq!(zones.find("movingCells").unwrap(), 0);
        assert!(matches!(
            zones.find("nope"),
            Err(MeshPlicError::UnknownZone(_))
        ));
    }
}
