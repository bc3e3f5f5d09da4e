//! Round-trip and resize behaviour of the compact adjacency store.

use mesh_plic::prelude::*;
use proptest::prelude::*;

#[test]
fn rows_round_trip() {
    let rows: Vec<Vec<u32>> = vec![vec![3, 1], vec![], vec![7, 7, 7], vec![0]];
    let list = CompactList::from_rows(&rows);
    assert_eq!(list.row_count(), 4);
    assert_eq!(list.total_size(), 6);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(list.row(i), row.as_slice());
    }
}

#[test]
fn transfer_moves_ownership() {
    let mut src = CompactList::from_rows(&[vec![1u32, 2], vec![3]]);
    let mut dst = CompactList::new();
    dst.transfer(&mut src);
    assert!(src.is_empty());
    assert_eq!(dst.row_count(), 2);
    assert_eq!(dst.row(0), &[1, 2]);
}

#[test]
fn contraction_only_row_resize() {
    let mut list = CompactList::from_rows(&[vec![1u32], vec![2, 3], vec![4]]);
    list.resize_rows(1).unwrap();
    assert_eq!(list.row_count(), 1);
    assert_eq!(list.total_size(), 1);
    assert!(matches!(
        list.resize_rows(5),
        Err(MeshPlicError::Size { requested: 5, have: 1 })
    ));
}

proptest! {
    /// Offsets difference reproduces every requested row size, and the data
    /// span partitions exactly.
    #[test]
    fn offsets_encode_row_sizes(sizes in proptest::collection::vec(0u32..20, 0..40)) {
        let list = CompactList::from_row_sizes(&sizes, 0u8);
        prop_assert_eq!(list.row_count(), sizes.len());
        let mut total = 0u32;
        for (i, &s) in sizes.iter().enumerate() {
            prop_assert_eq!(list.row_size(i) as u32, s);
            prop_assert_eq!(list.offsets()[i], total);
            total += s;
        }
        prop_assert_eq!(list.total_size() as u32, total);
    }

    #[test]
    fn rebuilt_row_sizes_preserve_prefix(
        sizes in proptest::collection::vec(1u32..8, 1..20),
        new_sizes in proptest::collection::vec(0u32..8, 1..20),
    ) {
        let mut list = CompactList::from_row_sizes(&sizes, 7u8);
        list.resize_row_sizes(&new_sizes, 0u8);
        prop_assert_eq!(list.row_count(), new_sizes.len());
        for (i, &s) in new_sizes.iter().enumerate() {
            prop_assert_eq!(list.row_size(i) as u32, s);
        }
    }
}
