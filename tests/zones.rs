//! Zone membership, flip-flag consistency, and coupled face pairing.

use mesh_plic::prelude::*;
use mesh_plic::topology::ZoneInsertion;

fn insertion(pairs: &[(usize, bool)]) -> ZoneInsertion {
    pairs.iter().copied().collect()
}

#[test]
fn flip_flags_round_trip() {
    let mut zones = ZoneList::new();
    let z = zones.add("baffle", ZoneKind::Face);
    zones
        .insert(&[(z, insertion(&[(10, true), (11, false)]))])
        .unwrap();
    let zone = zones.get(z).unwrap();
    assert!(zone.contains(10));
    assert_eq!(zone.flip(10), Some(true));
    assert_eq!(zone.flip(11), Some(false));
    assert_eq!(zone.flip(99), None);
}

#[test]
fn same_flip_reinsert_is_idempotent() {
    let mut zones = ZoneList::new();
    let z = zones.add("baffle", ZoneKind::Face);
    zones.insert(&[(z, insertion(&[(10, true)]))]).unwrap();
    zones.insert(&[(z, insertion(&[(10, true)]))]).unwrap();
    assert_eq!(zones.get(z).unwrap().members().len(), 1);
}

#[test]
fn contradictory_flip_is_rejected_atomically() {
    let mut zones = ZoneList::new();
    let z = zones.add("baffle", ZoneKind::Face);
    zones.insert(&[(z, insertion(&[(10, true)]))]).unwrap();
    // One batch mixing a valid new member with a contradiction: nothing
    // from the batch may land.
    let err = zones
        .insert(&[(z, insertion(&[(12, false), (10, false)]))])
        .unwrap_err();
    assert!(matches!(err, MeshPlicError::ZoneConflict { member: 10, .. }));
    let zone = zones.get(z).unwrap();
    assert!(!zone.contains(12));
    assert_eq!(zone.flip(10), Some(true));
}

#[test]
fn lookup_by_name() {
    let mut zones = ZoneList::new();
    zones.add("inlet_cells", ZoneKind::Cell);
    zones.add("rotor", ZoneKind::Face);
    assert!(zones.find("rotor").is_ok());
    assert!(matches!(
        zones.find("stator"),
        Err(MeshPlicError::UnknownZone(_))
    ));
}

#[test]
fn coupled_pair_master_ordering() {
    // Master side is the lower (cell, face) pair regardless of argument
    // order.
    let a = CoupledFacePair::new(0, 5, 20, 3, 17, true);
    let b = CoupledFacePair::new(0, 3, 17, 5, 20, true);
    assert_eq!(a.master_cell(), 3);
    assert_eq!(a.master_face(), 17);
    assert_eq!(a.slave_cell(), 5);
    assert_eq!(b.master_cell(), a.master_cell());
    assert_eq!(b.slave_face(), a.slave_face());
}

#[test]
fn coupled_pairs_survive_serialization() {
    // Pair metadata travels in case files and between ranks.
    let pair = CoupledFacePair::new(3, 10, 40, 11, 41, false);
    let json = serde_json::to_string(&pair).unwrap();
    let back: CoupledFacePair = serde_json::from_str(&json).unwrap();
    assert_eq!(back, pair);
    let bytes = bincode::serialize(&pair).unwrap();
    let back: CoupledFacePair = bincode::deserialize(&bytes).unwrap();
    assert_eq!(back, pair);
}

#[test]
fn non_integral_couples_require_error_patch() {
    let mut table = CoupledPatchTable::new(2);
    let integral = vec![CoupledFacePair::new(0, 0, 1, 1, 2, true)];
    table.set_patch(0, integral, None).unwrap();
    let partial = vec![CoupledFacePair::new(1, 2, 3, 4, 5, false)];
    assert!(table.set_patch(1, partial.clone(), None).is_err());
    table.set_patch(1, partial, Some(1)).unwrap();
    assert_eq!(table.error_patch(1).unwrap(), Some(1));
}
