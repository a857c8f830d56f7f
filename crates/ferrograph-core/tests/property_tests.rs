use ferrograph_core::dynamic::{ArrayStore, StringStore};
use ferrograph_core::storage::StoreManager;
use ferrograph_core::storage::records::Node;
use ferrograph_core::{ArrayValue, Defragmenter, StoreKind};
use proptest::prelude::*;
use std::collections::BTreeSet;
use tempfile::TempDir;

#[derive(Debug, Clone)]
enum Operation {
    Insert { type_ref: u32 },
    Delete { pick: usize },
}

fn arb_operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => (1u32..=20).prop_map(|type_ref| Operation::Insert { type_ref }),
        2 => any::<usize>().prop_map(|pick| Operation::Delete { pick }),
    ]
}

/// Apply `ops` to a node store, returning the live `(index, type_ref)` pairs
fn apply(store: &mut StoreManager<Node>, ops: &[Operation]) -> Vec<(u32, u32)> {
    let mut live: Vec<(u32, u32)> = Vec::new();
    for op in ops {
        match op {
            Operation::Insert { type_ref } => {
                let node = store
                    .create_item(None, |index| Node::new(index, 0, 0, *type_ref))
                    .unwrap();
                assert!(
                    live.iter().all(|(index, _)| *index != node.index),
                    "index {} handed out while live",
                    node.index
                );
                store.write_item(&node).unwrap();
                live.push((node.index, *type_ref));
            }
            Operation::Delete { pick } => {
                if live.is_empty() {
                    continue;
                }
                let (index, _) = live.swap_remove(pick % live.len());
                store.delete_item_at_index(index).unwrap();
            }
        }
    }
    live
}

proptest! {
    #[test]
    fn prop_allocation_never_reuses_live_index(
        ops in prop::collection::vec(arb_operation(), 1..120)
    ) {
        let dir = TempDir::new().unwrap();
        let mut store = StoreManager::open(dir.path().join("nodes.db"), Node::SIZE).unwrap();

        let live = apply(&mut store, &ops);

        let stored: BTreeSet<_> = store
            .iter()
            .unwrap()
            .map(|node| {
                let node = node.unwrap();
                (node.index, node.type_ref)
            })
            .collect();
        let expected: BTreeSet<_> = live.into_iter().collect();
        prop_assert_eq!(stored, expected);
    }

    #[test]
    fn prop_defrag_preserves_content(
        ops in prop::collection::vec(arb_operation(), 1..120)
    ) {
        let dir = TempDir::new().unwrap();
        let mut store = StoreManager::open(dir.path().join("nodes.db"), Node::SIZE).unwrap();

        let live = apply(&mut store, &ops);
        let mut before: Vec<u32> = live.iter().map(|(_, type_ref)| *type_ref).collect();
        before.sort_unstable();

        {
            let (file, ids) = store.parts_mut();
            Defragmenter::new(file, ids, Vec::new()).defragment().unwrap();
        }

        prop_assert_eq!(store.count().unwrap() as usize, live.len());
        let mut after: Vec<u32> = store
            .iter()
            .unwrap()
            .map(|node| node.unwrap().type_ref)
            .collect();
        after.sort_unstable();
        prop_assert_eq!(after, before);
    }

    #[test]
    fn prop_string_round_trip(
        block_size in 1usize..=24,
        values in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..100), 1..8)
    ) {
        let dir = TempDir::new().unwrap();
        let mut strings =
            StringStore::open(dir.path().join("strings.db"), block_size, StoreKind::String)
                .unwrap();

        let starts: Vec<_> = values.iter().map(|v| strings.write(v).unwrap()).collect();
        for (start, value) in starts.iter().zip(&values) {
            prop_assert_eq!(strings.read(*start).unwrap(), Some(value.clone()));
        }
    }

    #[test]
    fn prop_long_array_round_trip(
        items in prop::collection::vec(any::<i64>(), 0..40)
    ) {
        let dir = TempDir::new().unwrap();
        let mut strings =
            StringStore::open(dir.path().join("strings.db"), 8, StoreKind::String).unwrap();
        let mut arrays = ArrayStore::open(dir.path().join("arrays.db"), 16).unwrap();

        let value = ArrayValue::Long(items);
        let start = arrays.write(&mut strings, &value).unwrap();
        prop_assert_eq!(arrays.read(&strings, start).unwrap(), Some(value));
    }

    #[test]
    fn prop_string_array_round_trip(
        items in prop::collection::vec("[a-z]{0,20}", 0..10)
    ) {
        let dir = TempDir::new().unwrap();
        let mut strings =
            StringStore::open(dir.path().join("strings.db"), 8, StoreKind::String).unwrap();
        let mut arrays = ArrayStore::open(dir.path().join("arrays.db"), 16).unwrap();

        let value = ArrayValue::String(items);
        let start = arrays.write(&mut strings, &value).unwrap();
        prop_assert_eq!(arrays.read(&strings, start).unwrap(), Some(value.clone()));

        arrays.delete(&mut strings, start).unwrap();
        prop_assert_eq!(strings.manager().count().unwrap(), 0);
    }
}
