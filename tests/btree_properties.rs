//! Property tests: random insert/delete sequences checked against a model.

use std::collections::BTreeSet;

use proptest::prelude::*;
use stratadb::{BPlusTree, Error, Row, Table};
use tempfile::tempdir;

#[derive(Debug, Clone)]
enum Op {
    Insert(u32),
    Delete(u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u32..120).prop_map(Op::Insert),
        2 => (0u32..120).prop_map(Op::Delete),
    ]
}

fn row(id: u32) -> Row {
    Row::new(id, format!("u{}", id), format!("{}@example.com", id)).unwrap()
}

fn scan(tree: &mut BPlusTree) -> Vec<u32> {
    stratadb::Cursor::start(tree)
        .unwrap()
        .map(|r| r.unwrap().id)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every operation leaves a valid tree whose scan matches the model.
    #[test]
    fn prop_matches_ordered_set(ops in proptest::collection::vec(op(), 1..250)) {
        let dir = tempdir().unwrap();
        let mut table = Table::open(dir.path().join("prop.db")).unwrap();
        let mut model = BTreeSet::new();

        for op in &ops {
            match *op {
                Op::Insert(id) => {
                    let result = table.insert(&row(id));
                    if model.insert(id) {
                        prop_assert!(result.is_ok(), "insert {} failed: {:?}", id, result);
                    } else {
                        prop_assert!(matches!(result, Err(Error::DuplicateKey(k)) if k == id));
                    }
                }
                Op::Delete(id) => {
                    let result = table.delete(id);
                    if model.remove(&id) {
                        prop_assert!(result.is_ok(), "delete {} failed: {:?}", id, result);
                    } else {
                        prop_assert!(matches!(result, Err(Error::KeyNotFound(k)) if k == id));
                    }
                }
            }
            table.tree().verify().unwrap();
        }

        let expected: Vec<u32> = model.iter().copied().collect();
        prop_assert_eq!(scan(table.tree()), expected);
    }

    /// The tree read back after close holds exactly what was written.
    #[test]
    fn prop_reopen_preserves_contents(ops in proptest::collection::vec(op(), 1..150)) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prop.db");
        let mut model = BTreeSet::new();

        let root = {
            let mut table = Table::open(&path).unwrap();
            for op in &ops {
                match *op {
                    Op::Insert(id) => {
                        if table.insert(&row(id)).is_ok() {
                            model.insert(id);
                        }
                    }
                    Op::Delete(id) => {
                        if table.delete(id).is_ok() {
                            model.remove(&id);
                        }
                    }
                }
            }
            let root = table.tree().root();
            table.close().unwrap();
            root
        };

        let mut table = Table::open(&path).unwrap();
        prop_assert_eq!(table.tree().root(), root);
        table.tree().verify().unwrap();
        for &id in &model {
            prop_assert_eq!(table.select_one(id).unwrap(), row(id));
        }
        let expected: Vec<u32> = model.iter().copied().collect();
        prop_assert_eq!(scan(table.tree()), expected);
    }
}
