//! Normalizer integration tests.
//!
//! Drives the fragment merge end to end over realistic multi-chunk
//! extraction output and verifies the snapshot invariants: one entity
//! per folded (name, primary label) pair, only resolved endpoints, no
//! duplicate edges, and deterministic output. Property tests cover the
//! counter accounting across random fragment soups.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use std::collections::BTreeSet;
use suhoc::models::{
    FragmentNode, FragmentRelationship, GraphFragment, GraphInput, NormalizationKey,
    PropertyValue, read_fragments_file, read_graph_file, write_json_file, write_snapshot_file,
};
use suhoc::services::Normalizer;
use tempfile::TempDir;

/// Three chunks' worth of extraction output over the same historical
/// figure, with varied spelling, casing, and whitespace.
fn textbook_fragments() -> Vec<GraphFragment> {
    vec![
        GraphFragment::new("chunk_0000")
            .with_node(
                FragmentNode::new("n1", "Person", "Trần Hưng Đạo")
                    .with_property("nam_sinh", 1228_i64),
            )
            .with_node(FragmentNode::new(
                "n2",
                "Event",
                "Kháng chiến chống Nguyên Mông lần thứ hai",
            ))
            .with_node(FragmentNode::new("n3", "Date", "1285"))
            .with_relationship(FragmentRelationship::new("n1", "n2", "chỉ huy"))
            .with_relationship(FragmentRelationship::new("n2", "n3", "diễn ra năm")),
        GraphFragment::new("chunk_0001")
            .with_node(
                FragmentNode::new("n1", "Person", "trần hưng đạo")
                    .with_property("ten_that", "Trần Quốc Tuấn")
                    .with_property("nam_sinh", 1230_i64),
            )
            .with_node(FragmentNode::new("n2", "Document", "Hịch tướng sĩ"))
            .with_relationship(FragmentRelationship::new("n1", "n2", "viết")),
        GraphFragment::new("chunk_0002")
            .with_node(FragmentNode::new("a", "Dynasty", "Nhà Trần"))
            .with_node(FragmentNode::new("b", "Person", "Trần  Hưng   Đạo"))
            .with_relationship(FragmentRelationship::new("b", "a", "phục vụ"))
            .with_relationship(FragmentRelationship::new("b", "ghost", "liên quan")),
    ]
}

#[test]
fn test_textbook_merge_produces_one_entity_per_figure() {
    let (snapshot, report) = Normalizer::new().normalize(&textbook_fragments());

    // Person, Event, Date, Document, Dynasty
    assert_eq!(snapshot.entities.len(), 5);
    assert_eq!(report.entities, 5);
    assert_eq!(report.merged_entities, 2);
    assert_eq!(report.node_records, 7);

    // chỉ huy, diễn ra năm, viết, phục vụ; the "ghost" edge is dropped
    assert_eq!(snapshot.relationships.len(), 4);
    assert_eq!(report.dangling_relationships, 1);
    assert_eq!(report.duplicate_relationships, 0);

    let people: Vec<_> = snapshot
        .entities
        .iter()
        .filter(|entity| entity.labels.first().map(String::as_str) == Some("Person"))
        .collect();
    assert_eq!(people.len(), 1);
}

#[test]
fn test_merged_entity_keeps_first_spelling_and_unions_the_rest() {
    let (snapshot, _) = Normalizer::new().normalize(&textbook_fragments());

    let person = snapshot
        .entities
        .iter()
        .find(|entity| entity.labels.first().map(String::as_str) == Some("Person"))
        .expect("person entity");

    // First occurrence fixes the canonical spelling and scalar values
    assert_eq!(person.name, "Trần Hưng Đạo");
    assert_eq!(
        person.properties.get("nam_sinh"),
        Some(&PropertyValue::Integer(1228))
    );
    assert_eq!(
        person.properties.get("ten_that").and_then(PropertyValue::as_text),
        Some("Trần Quốc Tuấn")
    );
    assert_eq!(
        person.source_chunks,
        vec!["chunk_0000", "chunk_0001", "chunk_0002"]
    );
}

#[test]
fn test_snapshot_upholds_graph_invariants() {
    let (snapshot, _) = Normalizer::new().normalize(&textbook_fragments());

    let mut keys = BTreeSet::new();
    for entity in &snapshot.entities {
        let label = entity.labels.first().expect("primary label");
        assert!(
            keys.insert(NormalizationKey::new(&entity.name, label)),
            "two entities share a normalization key"
        );
    }

    let ids: BTreeSet<_> = snapshot.entities.iter().map(|e| e.id.clone()).collect();
    let mut edges = BTreeSet::new();
    for relationship in &snapshot.relationships {
        assert!(ids.contains(&relationship.source), "unresolved source");
        assert!(ids.contains(&relationship.target), "unresolved target");
        assert!(
            edges.insert(relationship.dedup_key()),
            "duplicate (source, type, target) edge"
        );
    }
}

#[test]
fn test_snapshot_round_trips_through_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let fragments_path = temp_dir.path().join("fragments.json");
    let snapshot_path = temp_dir.path().join("snapshot.json");

    let fragments = textbook_fragments();
    write_json_file(&fragments_path, &fragments).expect("write fragments");
    let reread = read_fragments_file(&fragments_path).expect("read fragments");
    assert_eq!(reread, fragments);

    let (snapshot, _) = Normalizer::new().normalize(&fragments);
    write_snapshot_file(&snapshot_path, &snapshot).expect("write snapshot");
    match read_graph_file(&snapshot_path).expect("read snapshot") {
        GraphInput::Snapshot(loaded) => assert_eq!(loaded, snapshot),
        other => panic!("snapshot file parsed as {other:?}"),
    }
}

/// Random fragment soup over a small name pool, so key collisions,
/// dangling references, and duplicate edges all occur.
fn fragment_strategy() -> impl Strategy<Value = GraphFragment> {
    let node = (
        0usize..4,
        prop::sample::select(vec!["Person", "Location"]),
        prop::sample::select(vec!["An Dương Vương", "Cổ Loa", "Triệu Đà", "Âu Lạc"]),
    )
        .prop_map(|(id, label, name)| FragmentNode::new(format!("n{id}"), label, name));
    let relationship = (
        0usize..6,
        0usize..6,
        prop::sample::select(vec!["liên quan", "đóng đô ở", "đánh bại"]),
    )
        .prop_map(|(source, target, rel_type)| {
            FragmentRelationship::new(format!("n{source}"), format!("n{target}"), rel_type)
        });
    (
        prop::collection::vec(node, 0..4),
        prop::collection::vec(relationship, 0..4),
    )
        .prop_map(|(nodes, relationships)| {
            let mut fragment = GraphFragment::new("chunk_0000");
            for node in nodes {
                fragment = fragment.with_node(node);
            }
            for relationship in relationships {
                fragment = fragment.with_relationship(relationship);
            }
            fragment
        })
}

proptest! {
    /// Property: normalization is deterministic.
    #[test]
    fn prop_normalize_is_deterministic(fragments in prop::collection::vec(fragment_strategy(), 0..6)) {
        let (first, first_report) = Normalizer::new().normalize(&fragments);
        let (second, second_report) = Normalizer::new().normalize(&fragments);
        prop_assert_eq!(first, second);
        prop_assert_eq!(first_report, second_report);
    }

    /// Property: every node record is accounted for exactly once.
    #[test]
    fn prop_node_records_are_fully_accounted(fragments in prop::collection::vec(fragment_strategy(), 0..6)) {
        let (_, report) = Normalizer::new().normalize(&fragments);
        prop_assert_eq!(
            report.node_records,
            report.entities + report.merged_entities + report.skipped_nodes
        );
    }

    /// Property: every relationship record is kept, dropped, or collapsed.
    #[test]
    fn prop_relationship_records_are_fully_accounted(fragments in prop::collection::vec(fragment_strategy(), 0..6)) {
        let (_, report) = Normalizer::new().normalize(&fragments);
        prop_assert_eq!(
            report.relationship_records,
            report.relationships + report.dangling_relationships + report.duplicate_relationships
        );
    }

    /// Property: snapshot endpoints always resolve and edges are unique.
    #[test]
    fn prop_snapshot_edges_resolve_and_are_unique(fragments in prop::collection::vec(fragment_strategy(), 0..6)) {
        let (snapshot, _) = Normalizer::new().normalize(&fragments);
        let ids: BTreeSet<_> = snapshot.entities.iter().map(|e| e.id.clone()).collect();
        let mut edges = BTreeSet::new();
        for relationship in &snapshot.relationships {
            prop_assert!(ids.contains(&relationship.source));
            prop_assert!(ids.contains(&relationship.target));
            prop_assert!(edges.insert(relationship.dedup_key()));
        }
    }
}
