//! Graph normalization: merging per-chunk fragments into one snapshot.
//!
//! The normalizer is the pure core of the pipeline. It folds every
//! [`GraphFragment`] into a single [`GraphSnapshot`], deduplicating
//! entities by normalization key, merging their properties, resolving
//! fragment-local relationship endpoints, dropping dangling edges, and
//! collapsing duplicate edges. No I/O, no clock, no randomness: the
//! same fragment sequence always yields the same snapshot, including
//! entity ids and output order.
//!
//! Merge rules:
//!
//! - Entities are the same when folded name and folded primary label
//!   match. The first occurrence fixes the canonical spelling and the
//!   id; later occurrences contribute labels, properties and
//!   provenance.
//! - Property conflicts keep the first-seen value; two lists union in
//!   first-seen order.
//! - Relationship endpoints resolve by fragment-local node id first,
//!   then by globally unique folded name. Unresolvable endpoints make
//!   the edge dangling: it is dropped and counted, never written.
//! - Edges sharing (source, folded type, target) collapse into one.

use crate::models::{
    Entity, GraphFragment, GraphSnapshot, NormalizationKey, Relationship, merge_properties,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Counters describing one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeReport {
    /// Fragments consumed.
    pub fragments: usize,
    /// Raw node records across all fragments.
    pub node_records: usize,
    /// Raw relationship records across all fragments.
    pub relationship_records: usize,
    /// Distinct entities in the snapshot.
    pub entities: usize,
    /// Distinct relationships in the snapshot.
    pub relationships: usize,
    /// Node records folded into an already-seen entity.
    pub merged_entities: usize,
    /// Node records skipped for a blank name.
    pub skipped_nodes: usize,
    /// Relationship records dropped because an endpoint did not resolve.
    pub dangling_relationships: usize,
    /// Relationship records collapsed into an already-seen edge.
    pub duplicate_relationships: usize,
}

/// Either the only entity with a folded name, or a marker that the
/// name is claimed by more than one entity.
enum NameSlot {
    Unique(usize),
    Ambiguous,
}

/// Merges graph fragments into a deduplicated snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    /// Creates a normalizer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Merges `fragments` into a snapshot, returning it with the
    /// counters of everything that was merged, dropped, or collapsed.
    #[must_use]
    pub fn normalize(&self, fragments: &[GraphFragment]) -> (GraphSnapshot, NormalizeReport) {
        let mut report = NormalizeReport {
            fragments: fragments.len(),
            ..NormalizeReport::default()
        };

        let mut entities: Vec<Entity> = Vec::new();
        let mut by_key: HashMap<NormalizationKey, usize> = HashMap::new();
        let mut by_name: HashMap<String, NameSlot> = HashMap::new();

        // First pass: register every node so edge resolution in the
        // second pass sees the complete entity set.
        let mut local_tables: Vec<HashMap<String, usize>> = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            let mut local: HashMap<String, usize> = HashMap::new();
            for node in &fragment.nodes {
                report.node_records += 1;
                let name = node.name.trim();
                if name.is_empty() {
                    report.skipped_nodes += 1;
                    debug!(node_id = %node.id, "skipping node with blank name");
                    continue;
                }
                let key = NormalizationKey::new(name, node.label.primary());
                let index = match by_key.get(&key) {
                    Some(&index) => {
                        let entity = &mut entities[index];
                        for label in node.label.to_vec() {
                            entity.add_label(label);
                        }
                        merge_properties(&mut entity.properties, &node.properties);
                        report.merged_entities += 1;
                        index
                    },
                    None => {
                        let mut entity = Entity::new(node.label.primary(), name);
                        entity.labels = node.label.to_vec();
                        entity.properties = node.properties.clone();
                        let index = entities.len();
                        by_key.insert(key.clone(), index);
                        match by_name.entry(key.name().to_string()) {
                            std::collections::hash_map::Entry::Vacant(slot) => {
                                slot.insert(NameSlot::Unique(index));
                            },
                            std::collections::hash_map::Entry::Occupied(mut slot) => {
                                slot.insert(NameSlot::Ambiguous);
                            },
                        }
                        entities.push(entity);
                        index
                    },
                };
                if let Some(chunk_id) = &fragment.chunk_id {
                    entities[index].add_source_chunk(chunk_id.clone());
                }
                local.insert(node.id.clone(), index);
            }
            local_tables.push(local);
        }

        // Second pass: resolve endpoints, drop dangling edges, collapse
        // duplicates.
        let mut relationships: Vec<Relationship> = Vec::new();
        let mut edge_index: HashMap<(String, String, String), usize> = HashMap::new();
        for (fragment, local) in fragments.iter().zip(&local_tables) {
            for record in &fragment.relationships {
                report.relationship_records += 1;
                let source = resolve_endpoint(&record.source, local, &by_name);
                let target = resolve_endpoint(&record.target, local, &by_name);
                let (Some(source), Some(target)) = (source, target) else {
                    report.dangling_relationships += 1;
                    debug!(
                        rel_type = %record.rel_type,
                        source = %record.source,
                        target = %record.target,
                        "dropping dangling relationship"
                    );
                    continue;
                };

                let mut edge = Relationship::new(
                    entities[source].id.clone(),
                    entities[target].id.clone(),
                    record.rel_type.trim(),
                );
                edge.properties = record.properties.clone();
                if let Some(chunk_id) = &fragment.chunk_id {
                    edge = edge.with_source_chunk(chunk_id.clone());
                }

                match edge_index.get(&edge.dedup_key()) {
                    Some(&index) => {
                        let existing = &mut relationships[index];
                        merge_properties(&mut existing.properties, &edge.properties);
                        for chunk_id in edge.source_chunks {
                            if !existing.source_chunks.contains(&chunk_id) {
                                existing.source_chunks.push(chunk_id);
                            }
                        }
                        report.duplicate_relationships += 1;
                    },
                    None => {
                        edge_index.insert(edge.dedup_key(), relationships.len());
                        relationships.push(edge);
                    },
                }
            }
        }

        report.entities = entities.len();
        report.relationships = relationships.len();
        (
            GraphSnapshot {
                entities,
                relationships,
            },
            report,
        )
    }
}

/// Resolves a relationship endpoint to an entity index.
///
/// Tries the fragment-local node id table first, then falls back to a
/// globally unique folded name. Extractors sometimes emit entity names
/// in the endpoint slots instead of node ids; the fallback keeps those
/// edges when the reference is unambiguous.
fn resolve_endpoint(
    endpoint: &str,
    local: &HashMap<String, usize>,
    by_name: &HashMap<String, NameSlot>,
) -> Option<usize> {
    if let Some(&index) = local.get(endpoint) {
        return Some(index);
    }
    let folded = NormalizationKey::fold(endpoint);
    if folded.is_empty() {
        return None;
    }
    match by_name.get(&folded) {
        Some(NameSlot::Unique(index)) => Some(*index),
        _ => None,
    }
}
