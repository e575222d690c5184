//! SkipList Tests
//!
//! Tests verify:
//! - Insert / search / remove semantics
//! - In-place overwrite
//! - Sorted iteration
//! - Level bookkeeping as the list grows and empties
//! - Agreement with BTreeMap under arbitrary operation sequences

use std::collections::BTreeMap;

use lodekv::skiplist::{SkipList, MAX_LEVEL};
use proptest::prelude::*;

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_list_is_empty() {
    let list: SkipList<Vec<u8>, u32> = SkipList::new();
    assert!(list.is_empty());
    assert_eq!(list.len(), 0);
    assert_eq!(list.level(), 0);
    assert_eq!(list.iter().count(), 0);
}

#[test]
fn test_insert_and_get() {
    let mut list = SkipList::new();

    assert_eq!(list.insert(b"key1".to_vec(), "value1"), None);

    assert_eq!(list.get(b"key1".as_slice()), Some(&"value1"));
    assert_eq!(list.len(), 1);
    assert!(list.level() >= 1);
}

#[test]
fn test_get_nonexistent_key() {
    let mut list = SkipList::new();
    list.insert(b"present".to_vec(), 1);

    assert_eq!(list.get(b"absent".as_slice()), None);
    assert!(!list.contains_key(b"absent".as_slice()));
}

#[test]
fn test_insert_overwrites_in_place() {
    let mut list = SkipList::with_seed(3);

    list.insert("key1", 1);
    let level_before = list.level();
    let previous = list.insert("key1", 2);

    assert_eq!(previous, Some(1));
    assert_eq!(list.get("key1"), Some(&2));
    assert_eq!(list.len(), 1);
    assert_eq!(list.level(), level_before);
}

#[test]
fn test_get_mut_modifies_value() {
    let mut list = SkipList::new();
    list.insert("list", vec![1]);

    if let Some(values) = list.get_mut("list") {
        values.push(2);
    }

    assert_eq!(list.get("list"), Some(&vec![1, 2]));
}

// =============================================================================
// Remove Tests
// =============================================================================

#[test]
fn test_remove_existing_key() {
    let mut list = SkipList::new();
    list.insert("a", 1);
    list.insert("b", 2);
    list.insert("c", 3);

    assert_eq!(list.remove("b"), Some(2));

    assert_eq!(list.get("b"), None);
    assert_eq!(list.len(), 2);
    let keys: Vec<_> = list.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec!["a", "c"]);
}

#[test]
fn test_remove_nonexistent_key() {
    let mut list = SkipList::new();
    list.insert("a", 1);

    assert_eq!(list.remove("z"), None);
    assert_eq!(list.len(), 1);
}

#[test]
fn test_remove_from_empty_list() {
    let mut list: SkipList<&str, u32> = SkipList::new();
    assert_eq!(list.remove("anything"), None);
    assert_eq!(list.level(), 0);
}

#[test]
fn test_level_returns_to_zero_after_removing_everything() {
    let mut list = SkipList::with_seed(11);
    for i in 0..1000u32 {
        list.insert(i, i);
    }
    assert!(list.level() > 1);
    assert!(list.level() <= MAX_LEVEL);

    for i in 0..1000u32 {
        assert_eq!(list.remove(&i), Some(i));
    }

    assert!(list.is_empty());
    assert_eq!(list.level(), 0);
}

#[test]
fn test_reinsert_after_remove() {
    let mut list = SkipList::new();
    list.insert("k", 1);
    list.remove("k");
    list.insert("k", 2);

    assert_eq!(list.get("k"), Some(&2));
    assert_eq!(list.len(), 1);
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn test_iteration_is_sorted() {
    let mut list = SkipList::new();
    for key in ["delta", "alpha", "echo", "charlie", "bravo"] {
        list.insert(key.as_bytes().to_vec(), key.len());
    }

    let keys: Vec<&[u8]> = list.iter().map(|(k, _)| k.as_slice()).collect();
    assert_eq!(
        keys,
        vec![
            b"alpha".as_slice(),
            b"bravo".as_slice(),
            b"charlie".as_slice(),
            b"delta".as_slice(),
            b"echo".as_slice(),
        ]
    );
}

#[test]
fn test_byte_lexicographic_order() {
    let mut list = SkipList::new();
    list.insert(vec![0xFF], "high");
    list.insert(vec![0x00, 0x01], "low-long");
    list.insert(vec![0x00], "low");
    list.insert(b"A".to_vec(), "upper");
    list.insert(b"a".to_vec(), "lower");

    let values: Vec<&str> = list.iter().map(|(_, v)| *v).collect();
    assert_eq!(values, vec!["low", "low-long", "upper", "lower", "high"]);
}

#[test]
fn test_iter_len_matches() {
    let mut list = SkipList::new();
    for i in 0..37 {
        list.insert(i, ());
    }
    assert_eq!(list.iter().len(), 37);
    assert_eq!((&list).into_iter().count(), 37);
}

#[test]
fn test_clear() {
    let mut list = SkipList::new();
    for i in 0..100 {
        list.insert(i, i);
    }
    list.clear();

    assert!(list.is_empty());
    assert_eq!(list.level(), 0);
    assert_eq!(list.get(&5), None);

    list.insert(5, 50);
    assert_eq!(list.get(&5), Some(&50));
}

// =============================================================================
// Model Tests
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Insert(u8, u32),
    Remove(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<u8>(), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        any::<u8>().prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn prop_matches_btreemap(ops in proptest::collection::vec(op(), 0..400)) {
        let mut list = SkipList::new();
        let mut model = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    prop_assert_eq!(list.insert(k, v), model.insert(k, v));
                }
                Op::Remove(k) => {
                    prop_assert_eq!(list.remove(&k), model.remove(&k));
                }
            }
        }

        prop_assert_eq!(list.len(), model.len());
        for k in 0..=u8::MAX {
            prop_assert_eq!(list.get(&k), model.get(&k));
        }

        let listed: Vec<(u8, u32)> = list.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u8, u32)> = model.into_iter().collect();
        prop_assert_eq!(listed, expected);
    }

    #[test]
    fn prop_traversal_strictly_increasing(keys in proptest::collection::vec(any::<Vec<u8>>(), 0..200)) {
        let mut list = SkipList::new();
        for key in keys {
            list.insert(key, ());
        }

        let collected: Vec<&Vec<u8>> = list.iter().map(|(k, _)| k).collect();
        for pair in collected.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn prop_emptied_list_has_no_levels(keys in proptest::collection::vec(any::<u16>(), 1..300)) {
        let mut list = SkipList::new();
        for &key in &keys {
            list.insert(key, key);
        }
        for key in &keys {
            list.remove(key);
        }

        prop_assert!(list.is_empty());
        prop_assert_eq!(list.level(), 0);
    }
}
