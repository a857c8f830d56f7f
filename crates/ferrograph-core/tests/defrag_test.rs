//! Defragmentation tests
//!
//! These tests validate:
//! - Pointer integrity after compaction (referring stores are rewritten)
//! - No-op behavior on stores without free slots
//! - Dynamic store compaction fixing property payloads and string arrays

use ferrograph_core::storage::StoreManager;
use ferrograph_core::storage::records::{Node, Payload, Property};
use ferrograph_core::{
    ArrayValue, DefragReport, Defragmenter, GraphStore, PropertyType, PropertyValue, StoreConfig,
    StoreKind,
};
use tempfile::TempDir;

fn property_store(dir: &TempDir) -> StoreManager<Property> {
    StoreManager::open(dir.path().join("properties.db"), Property::SIZE).unwrap()
}

fn node_store(dir: &TempDir) -> StoreManager<Node> {
    StoreManager::open(dir.path().join("nodes.db"), Node::SIZE).unwrap()
}

fn insert_properties(store: &mut StoreManager<Property>, amount: u32) {
    for value in 1..=amount {
        let property = store
            .create_item(None, |index| {
                Property::new(index, PropertyType::Int, 0, Payload::Inline(value as u64))
            })
            .unwrap();
        store.write_item(&property).unwrap();
    }
}

// ============================================================================
// Record stores
// ============================================================================

#[test]
fn test_defrag_rewrites_node_property_heads() {
    let dir = TempDir::new().unwrap();
    let mut properties = property_store(&dir);
    let mut nodes = node_store(&dir);

    insert_properties(&mut properties, 5);
    properties.delete_item_at_index(2).unwrap();
    properties.delete_item_at_index(4).unwrap();

    for prop_head in [5, 3, 1, 4, 0] {
        let node = nodes
            .create_item(None, |index| Node::new(index, 0, prop_head, 1))
            .unwrap();
        nodes.write_item(&node).unwrap();
    }

    let report = {
        let (file, ids) = properties.parts_mut();
        let (node_file, _) = nodes.parts_mut();
        Defragmenter::new(file, ids, vec![node_file])
            .defragment()
            .unwrap()
    };

    assert_eq!(report.moved, 2);
    assert_eq!(report.reclaimed, 2);
    assert_eq!(properties.count().unwrap(), 3);
    assert!(properties.ids().is_empty().unwrap());

    let heads: Vec<_> = (1..=5)
        .map(|index| nodes.get_item(index).unwrap().unwrap().prop_head)
        .collect();
    assert_eq!(heads, vec![3, 2, 1, 4, 0]);

    let payloads: Vec<_> = (1..=3)
        .map(|index| properties.get_item(index).unwrap().unwrap().payload)
        .collect();
    assert_eq!(
        payloads,
        vec![Payload::Inline(1), Payload::Inline(3), Payload::Inline(5)]
    );
}

#[test]
fn test_defrag_without_free_slots_is_noop() {
    let dir = TempDir::new().unwrap();
    let mut properties = property_store(&dir);
    insert_properties(&mut properties, 4);

    let (file, ids) = properties.parts_mut();
    let report = Defragmenter::new(file, ids, Vec::new()).defragment().unwrap();

    assert_eq!(report, DefragReport::default());
    assert_eq!(properties.count().unwrap(), 4);
}

#[test]
fn test_tail_deletes_leave_nothing_to_defragment() {
    let dir = TempDir::new().unwrap();
    let mut properties = property_store(&dir);
    insert_properties(&mut properties, 5);

    properties.delete_item_at_index(4).unwrap();
    properties.delete_item_at_index(5).unwrap();
    assert_eq!(properties.count().unwrap(), 3);
    assert!(properties.ids().is_empty().unwrap());

    let (file, ids) = properties.parts_mut();
    let report = Defragmenter::new(file, ids, Vec::new()).defragment().unwrap();
    assert_eq!(report, DefragReport::default());
}

#[test]
fn test_free_tail_is_truncated_without_moves() {
    let dir = TempDir::new().unwrap();
    let mut properties = property_store(&dir);
    insert_properties(&mut properties, 5);

    let report = {
        let (file, ids) = properties.parts_mut();
        // Freed without the store manager's own tail truncation
        for index in [4, 5] {
            file.delete(index).unwrap();
            ids.store_id(index).unwrap();
        }
        Defragmenter::new(file, ids, Vec::new()).defragment().unwrap()
    };

    assert_eq!(report.moved, 0);
    assert_eq!(report.reclaimed, 2);
    assert_eq!(properties.count().unwrap(), 3);
    assert!(properties.ids().is_empty().unwrap());
    let payloads: Vec<_> = properties
        .iter()
        .unwrap()
        .map(|property| property.unwrap().payload)
        .collect();
    assert_eq!(
        payloads,
        vec![Payload::Inline(1), Payload::Inline(2), Payload::Inline(3)]
    );
}

#[test]
fn test_defrag_fixes_chain_links_inside_store() {
    let dir = TempDir::new().unwrap();
    let mut properties = property_store(&dir);
    insert_properties(&mut properties, 4);

    // Thread 3 <-> 4 as one chain, then free 1 and 2.
    let mut third = properties.get_item(3).unwrap().unwrap();
    let mut fourth = properties.get_item(4).unwrap().unwrap();
    third.next = 4;
    fourth.prev = 3;
    properties.write_item(&third).unwrap();
    properties.write_item(&fourth).unwrap();
    properties.delete_item_at_index(1).unwrap();
    properties.delete_item_at_index(2).unwrap();

    let (file, ids) = properties.parts_mut();
    Defragmenter::new(file, ids, Vec::new()).defragment().unwrap();

    let first = properties.get_item(1).unwrap().unwrap();
    let second = properties.get_item(2).unwrap().unwrap();
    assert_eq!((first.payload, first.next), (Payload::Inline(3), 2));
    assert_eq!((second.payload, second.prev), (Payload::Inline(4), 1));
}

// ============================================================================
// Dynamic stores through the graph facade
// ============================================================================

fn create_graph(dir: &TempDir) -> GraphStore {
    let config = StoreConfig {
        string_block_size: 10,
        name_block_size: 8,
        array_block_size: 16,
        ..StoreConfig::new(dir.path())
    };
    GraphStore::open(config).unwrap()
}

fn strings(items: &[&str]) -> PropertyValue {
    PropertyValue::Array(ArrayValue::String(
        items.iter().map(|item| item.to_string()).collect(),
    ))
}

#[test]
fn test_string_defrag_updates_payloads_and_array_elements() {
    let dir = TempDir::new().unwrap();
    let mut graph = create_graph(&dir);
    graph
        .create_type(
            "Tagged",
            &[
                ("name", PropertyType::String),
                ("n", PropertyType::Int),
                ("tags", PropertyType::StringArray),
            ],
        )
        .unwrap();

    let (a, _) = graph
        .insert_node(
            "Tagged",
            &[PropertyValue::String("aa".into()), PropertyValue::Int(3), strings(&["x", "y"])],
        )
        .unwrap();
    let (b, _) = graph
        .insert_node(
            "Tagged",
            &[PropertyValue::String("bb".into()), PropertyValue::Int(4), strings(&["z"])],
        )
        .unwrap();
    let (c, _) = graph
        .insert_node(
            "Tagged",
            &[PropertyValue::String("cc".into()), PropertyValue::Int(5), strings(&[])],
        )
        .unwrap();
    assert_eq!(graph.store_count(StoreKind::String).unwrap(), 6);

    graph.delete_node(&a).unwrap();
    let report = graph.defragment(StoreKind::String).unwrap();

    assert_eq!(report.moved, 3);
    assert_eq!(report.reclaimed, 3);
    assert_eq!(graph.store_count(StoreKind::String).unwrap(), 3);

    assert_eq!(
        graph.node_properties(&b).unwrap(),
        vec![
            ("name".to_string(), PropertyValue::String("bb".into())),
            ("n".to_string(), PropertyValue::Int(4)),
            ("tags".to_string(), strings(&["z"])),
        ]
    );
    assert_eq!(
        graph.node_properties(&c).unwrap(),
        vec![
            ("name".to_string(), PropertyValue::String("cc".into())),
            ("n".to_string(), PropertyValue::Int(5)),
            ("tags".to_string(), strings(&[])),
        ]
    );
}

#[test]
fn test_defragment_all_after_churn() {
    let dir = TempDir::new().unwrap();
    let mut graph = create_graph(&dir);
    graph
        .create_type("Doc", &[("title", PropertyType::String)])
        .unwrap();
    graph
        .create_type("LINKS", &[("weight", PropertyType::DoubleArray)])
        .unwrap();

    let mut docs = Vec::new();
    for i in 0..8 {
        let title = PropertyValue::String(format!("document number {i}"));
        docs.push(graph.insert_node("Doc", &[title]).unwrap().0);
    }
    for pair in docs.windows(2) {
        let weight = PropertyValue::Array(ArrayValue::Double(vec![0.5, 1.5, 2.5]));
        graph
            .insert_relation("LINKS", &[weight], pair[0].index, pair[1].index)
            .unwrap();
    }
    for doc in docs.iter().step_by(3) {
        graph.delete_node(doc).unwrap();
    }

    let survivors: Vec<_> = docs
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 3 != 0)
        .map(|(i, _)| format!("document number {i}"))
        .collect();

    graph.defragment_all().unwrap();

    let mut titles: Vec<_> = graph
        .get_nodes_of_type("Doc")
        .unwrap()
        .map(|pair| {
            let (node, _) = pair.unwrap();
            match graph.node_properties(&node).unwrap().remove(0).1 {
                PropertyValue::String(title) => title,
                other => panic!("unexpected value {other}"),
            }
        })
        .collect();
    titles.sort();
    assert_eq!(titles, survivors);

    let links: Vec<_> = graph
        .get_relations_of_type("LINKS")
        .unwrap()
        .collect::<ferrograph_core::Result<_>>()
        .unwrap();
    assert_eq!(links.len(), 2);
    for (rel, _) in &links {
        assert!(graph.get_node(rel.first_node).unwrap().is_some());
        assert!(graph.get_node(rel.second_node).unwrap().is_some());
        assert_eq!(
            graph.relation_properties(rel).unwrap()[0].1,
            PropertyValue::Array(ArrayValue::Double(vec![0.5, 1.5, 2.5]))
        );
        let from_first: Vec<_> = graph
            .relations_of(rel.first_node)
            .unwrap()
            .map(|r| r.unwrap().index)
            .collect();
        assert!(from_first.contains(&rel.index));
    }

    for kind in StoreKind::ALL {
        let count = graph.store_count(kind).unwrap();
        let report = graph.defragment(kind).unwrap();
        assert_eq!(report, DefragReport::default(), "{kind} not compact");
        assert_eq!(graph.store_count(kind).unwrap(), count);
    }
}
