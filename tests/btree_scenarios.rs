//! End-to-end B+Tree scenarios through the table facade.

use stratadb::common::config::LEAF_NODE_MAX_CELLS;
use stratadb::{Error, PageId, Row, Table};
use tempfile::tempdir;

fn row(id: u32) -> Row {
    Row::new(id, format!("user{}", id), format!("person{}@example.com", id)).unwrap()
}

fn ids(table: &mut Table) -> Vec<u32> {
    table.select_all().unwrap().iter().map(|r| r.id).collect()
}

// ============================================================================
// Insert scenarios
// ============================================================================

#[test]
fn test_insert_with_duplicate_scans_sorted() {
    let dir = tempdir().unwrap();
    let mut table = Table::open(dir.path().join("test.db")).unwrap();

    for (i, id) in [3, 1, 4, 1, 5, 9, 2, 6].into_iter().enumerate() {
        let result = table.insert(&row(id));
        if i == 3 {
            assert!(matches!(result, Err(Error::DuplicateKey(1))));
        } else {
            result.unwrap();
        }
        table.tree().verify().unwrap();
    }

    assert_eq!(ids(&mut table), vec![1, 2, 3, 4, 5, 6, 9]);
}

#[test]
fn test_duplicate_leaves_scan_unchanged() {
    let dir = tempdir().unwrap();
    let mut table = Table::open(dir.path().join("test.db")).unwrap();
    for id in 1..=10 {
        table.insert(&row(id)).unwrap();
    }
    let before = table.select_all().unwrap();

    let imposter = Row::new(5, "imposter", "x@y.z").unwrap();
    assert!(matches!(table.insert(&imposter), Err(Error::DuplicateKey(5))));
    assert_eq!(table.select_all().unwrap(), before);
}

#[test]
fn test_select_one_returns_inserted_fields() {
    let dir = tempdir().unwrap();
    let mut table = Table::open(dir.path().join("test.db")).unwrap();

    let long = Row::new(77, "u".repeat(32), "e".repeat(255)).unwrap();
    table.insert(&long).unwrap();
    for id in 1..=20 {
        table.insert(&row(id)).unwrap();
    }

    assert_eq!(table.select_one(77).unwrap(), long);
    assert_eq!(table.select_one(13).unwrap(), row(13));
}

// ============================================================================
// Grow then shrink
// ============================================================================

#[test]
fn test_two_internal_splits_then_collapse() {
    let dir = tempdir().unwrap();
    let mut table = Table::open(dir.path().join("test.db")).unwrap();
    let root = table.tree().root();

    // The first internal split grows the tree to three levels and leaves
    // the root with one key; the second gives the root its second key.
    let mut next = 0;
    loop {
        next += 1;
        table.insert(&row(next)).unwrap();
        assert_eq!(table.tree().root(), root, "root moved during a split");

        let tree = table.tree();
        if tree.height().unwrap() == 3
            && tree.dump_tree().unwrap().starts_with("- internal (size 2)\n")
        {
            break;
        }
    }
    table.tree().verify().unwrap();

    let mut survivors: Vec<u32> = (1..=next).collect();
    while table.tree().height().unwrap() > 1 {
        let id = survivors.remove(0);
        table.delete(id).unwrap();
        table.tree().verify().unwrap();
    }

    let tree = table.tree();
    assert_ne!(tree.root(), root);
    assert_eq!(tree.pager().allocated_count(), 2);
    let new_root = tree.root();
    assert!(tree.pager().is_allocated(new_root));
    assert_eq!(ids(&mut table), survivors);
    assert!(survivors.len() <= LEAF_NODE_MAX_CELLS);
}

#[test]
fn test_delete_absent_key_leaves_scan_unchanged() {
    let dir = tempdir().unwrap();
    let mut table = Table::open(dir.path().join("test.db")).unwrap();
    for id in (2..=40).step_by(2) {
        table.insert(&row(id)).unwrap();
    }
    let before = ids(&mut table);

    for missing in [1, 21, 41] {
        assert!(matches!(table.delete(missing), Err(Error::KeyNotFound(k)) if k == missing));
    }
    assert_eq!(ids(&mut table), before);
}

#[test]
fn test_delete_everything_in_random_order() {
    let dir = tempdir().unwrap();
    let mut table = Table::open(dir.path().join("test.db")).unwrap();

    let mut keys: Vec<u32> = (1..=60).collect();
    for &id in &keys {
        table.insert(&row(id)).unwrap();
    }

    // Fixed shuffle: multiply by a unit mod 61.
    keys.sort_by_key(|k| (k * 17) % 61);
    let mut remaining: Vec<u32> = (1..=60).collect();
    for id in keys {
        table.delete(id).unwrap();
        remaining.retain(|&k| k != id);
        table.tree().verify().unwrap();
        assert_eq!(ids(&mut table), remaining);
    }

    let tree = table.tree();
    assert_eq!(tree.height().unwrap(), 1);
    assert!(tree.pager().is_allocated(tree.root()));
    assert_ne!(tree.root(), PageId::META);
    assert_eq!(tree.pager().allocated_count(), 2);
}
