//! Loader integration tests.
//!
//! Loads normalized snapshots into the in-memory store and verifies the
//! write protocol: previous content is cleared, entities land before
//! relationships, batches are partitioned and counted, reloads are
//! idempotent, and a failing batch surfaces its stage and position.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use suhoc::Error;
use suhoc::models::{
    Entity, FragmentNode, FragmentRelationship, GraphFragment, GraphSnapshot, Relationship,
};
use suhoc::services::{GraphLoader, Normalizer};
use suhoc::storage::{GraphStore, MemoryStore};

/// A small normalized snapshot: five entities, three relationships.
fn sample_snapshot() -> GraphSnapshot {
    let fragments = vec![
        GraphFragment::new("chunk_0000")
            .with_node(FragmentNode::new("n1", "Person", "Lý Thái Tổ"))
            .with_node(FragmentNode::new("n2", "Location", "Thăng Long"))
            .with_node(FragmentNode::new("n3", "Date", "1010"))
            .with_relationship(FragmentRelationship::new("n1", "n2", "dời đô đến"))
            .with_relationship(FragmentRelationship::new("n1", "n3", "lên ngôi năm")),
        GraphFragment::new("chunk_0001")
            .with_node(FragmentNode::new("n1", "Dynasty", "Nhà Lý"))
            .with_node(FragmentNode::new("n2", "Document", "Chiếu dời đô"))
            .with_relationship(FragmentRelationship::new("Lý Thái Tổ", "n2", "ban hành")),
    ];
    let (snapshot, report) = Normalizer::new().normalize(&fragments);
    assert_eq!(report.dangling_relationships, 0);
    snapshot
}

#[test]
fn test_load_replaces_previous_store_content() {
    let store = MemoryStore::new();
    store
        .write_entities(&[Entity::new("Person", "Lê Lợi")])
        .expect("seed store");

    let snapshot = sample_snapshot();
    let loader = GraphLoader::new(store);
    loader.load(&snapshot).expect("load");

    let names: Vec<String> = loader
        .store()
        .all_entities()
        .expect("read entities")
        .into_iter()
        .map(|entity| entity.name)
        .collect();
    assert_eq!(names.len(), 5);
    assert!(!names.contains(&"Lê Lợi".to_string()));
    assert!(names.contains(&"Lý Thái Tổ".to_string()));
}

#[test]
fn test_entities_land_before_relationships() {
    // MemoryStore rejects edges whose endpoints are missing, so a
    // successful load proves the write order.
    let loader = GraphLoader::new(MemoryStore::new()).with_batch_size(1);
    let report = loader.load(&sample_snapshot()).expect("load");

    assert_eq!(report.entities, 5);
    assert_eq!(report.relationships, 3);
    let stats = loader.store().stats().expect("stats");
    assert_eq!(stats.entities, 5);
    assert_eq!(stats.relationships, 3);
}

#[test]
fn test_batch_size_partitions_writes() {
    let loader = GraphLoader::new(MemoryStore::new()).with_batch_size(2);
    let report = loader.load(&sample_snapshot()).expect("load");

    // 5 entities in batches of 2 -> 3 batches; 3 relationships -> 2
    assert_eq!(report.entity_batches, 3);
    assert_eq!(report.relationship_batches, 2);
}

#[test]
fn test_reload_reproduces_the_same_graph() {
    let snapshot = sample_snapshot();
    let loader = GraphLoader::new(MemoryStore::new());

    loader.load(&snapshot).expect("first load");
    let first = loader.store().all_entities().expect("entities");

    loader.load(&snapshot).expect("second load");
    let second = loader.store().all_entities().expect("entities");

    assert_eq!(first, second);
    let stats = loader.store().stats().expect("stats");
    assert_eq!(stats.entities, 5);
    assert_eq!(stats.relationships, 3);
}

#[test]
fn test_failing_relationship_batch_names_stage_and_range() {
    // Hand-built snapshot with an edge to an id that was never written.
    let present = Entity::new("Person", "Ngô Quyền");
    let missing = Entity::new("Location", "Bạch Đằng");
    let snapshot = GraphSnapshot {
        relationships: vec![Relationship::new(
            present.id.clone(),
            missing.id.clone(),
            "chiến thắng tại",
        )],
        entities: vec![present],
    };

    let loader = GraphLoader::new(MemoryStore::new()).with_batch_size(10);
    let error = loader.load(&snapshot).expect_err("load must fail");

    match error {
        Error::BatchWrite {
            stage,
            batch,
            range,
            cause,
        } => {
            assert_eq!(stage, "relationships");
            assert_eq!(batch, 0);
            assert_eq!(range, "0-0");
            assert!(cause.contains("not found"), "cause was: {cause}");
        },
        other => panic!("expected BatchWrite, got {other:?}"),
    }

    // The failed batch was not applied.
    let stats = loader.store().stats().expect("stats");
    assert_eq!(stats.relationships, 0);
}

#[test]
fn test_zero_batch_size_is_rejected_before_clearing() {
    let store = MemoryStore::new();
    store
        .write_entities(&[Entity::new("Person", "Lê Lợi")])
        .expect("seed store");

    let loader = GraphLoader::new(store).with_batch_size(0);
    let error = loader.load(&sample_snapshot()).expect_err("must fail");
    assert!(matches!(error, Error::InvalidInput(_)));

    // The store was left untouched.
    let stats = loader.store().stats().expect("stats");
    assert_eq!(stats.entities, 1);
}
