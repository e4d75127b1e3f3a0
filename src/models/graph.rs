//! Graph data model for knowledge graph construction.
//!
//! This module provides the types flowing through the pipeline: raw
//! per-chunk [`GraphFragment`]s on the extraction side, and the merged,
//! deduplicated [`GraphSnapshot`] on the loading side.
//!
//! # Entity labels
//!
//! Labels are open strings (the extractor vocabulary is guidance, not a
//! closed enum). Typical labels for the history corpus:
//!
//! | Label | Examples |
//! |-------|----------|
//! | `Person` | "Trần Hưng Đạo", "Hồ Chí Minh" |
//! | `Location` | "Thăng Long", "sông Bạch Đằng" |
//! | `Event` | "chiến thắng Bạch Đằng" |
//! | `Date` | "năm 1288" |
//! | `Organization` | "nhà Trần", "Việt Minh" |
//! | `Dynasty` | "triều Nguyễn" |
//! | `Document` | "Hịch tướng sĩ" |
//! | `Concept` | "độc lập dân tộc" |
//!
//! # Identity
//!
//! Two entity records are the same logical entity when their
//! [`NormalizationKey`]s match: case-folded, whitespace-collapsed name
//! plus folded primary label. Snapshot entity ids are derived from that
//! key, so normalization output is deterministic down to identifiers.
//!
//! # Example
//!
//! ```rust
//! use suhoc::models::{Entity, Relationship};
//!
//! let general = Entity::new("Person", "Trần Hưng Đạo")
//!     .with_property("vai_tro", "tổng chỉ huy")
//!     .with_source_chunk("chunk_0007");
//!
//! let battle = Entity::new("Event", "chiến thắng Bạch Đằng");
//!
//! let rel = Relationship::new(general.id.clone(), battle.id.clone(), "chỉ huy");
//! assert_eq!(rel.rel_type, "chỉ huy");
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

/// Unique identifier for a graph entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    /// Creates a new entity ID from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the stable entity ID for a normalization key.
    ///
    /// The ID is `ent_` plus the first 16 hex characters of the SHA-256
    /// digest of the folded label and name. Deriving ids from the key
    /// (instead of generating them) is what makes `normalize` and
    /// load-then-reload reproducible down to identifiers.
    #[must_use]
    pub fn from_key(key: &NormalizationKey) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(key.label().as_bytes());
        hasher.update([0x1f]);
        hasher.update(key.name().as_bytes());
        let digest = hex::encode(hasher.finalize());
        Self(format!("ent_{}", &digest[..16]))
    }

    /// Returns the entity ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity key deciding whether two entity records are the same entity.
///
/// Built from the case-folded, whitespace-collapsed name plus the folded
/// primary type label. `"Hồ  Chí  Minh"` and `"hồ chí minh"` under the
/// same label produce equal keys; the same name under `Person` vs
/// `Event` does not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizationKey {
    name: String,
    label: String,
}

impl NormalizationKey {
    /// Builds a key from a raw name and primary label.
    #[must_use]
    pub fn new(name: &str, label: &str) -> Self {
        Self {
            name: Self::fold(name),
            label: Self::fold(label),
        }
    }

    /// Case-folds and whitespace-collapses text for identity comparison.
    ///
    /// Trims, lowercases, and joins interior whitespace runs to a single
    /// space. Unicode-aware, so Vietnamese diacritics are preserved.
    #[must_use]
    pub fn fold(text: &str) -> String {
        text.trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Returns the folded name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the folded label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for NormalizationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.label, self.name)
    }
}

/// A property value on an entity or relationship.
///
/// Serialized untagged, so JSON scalars and arrays map directly. The
/// merge policy for colliding keys is first-write-wins for scalars and
/// order-preserving union when both sides are lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// List of values.
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Returns the text content if this is a `Text` value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::List(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", rendered.join(", "))
            },
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values.into_iter().map(Self::Text).collect())
    }
}

/// Property map with deterministic iteration order.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Merges `incoming` properties into `existing`.
///
/// Policy: a key absent from `existing` is inserted; a scalar conflict
/// keeps the existing value (first-write-wins); when both sides are
/// lists, incoming items not already present are appended in order.
pub fn merge_properties(existing: &mut PropertyMap, incoming: &PropertyMap) {
    for (key, value) in incoming {
        match existing.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(value.clone());
            },
            Entry::Occupied(mut slot) => {
                if let (PropertyValue::List(current), PropertyValue::List(new_items)) =
                    (slot.get_mut(), value)
                {
                    for item in new_items {
                        if !current.contains(item) {
                            current.push(item.clone());
                        }
                    }
                }
            },
        }
    }
}

/// An entity in the merged knowledge graph.
///
/// Carries the label set (primary label first), the canonical name, the
/// merged property map, and provenance: the ids of the chunks whose
/// fragments contributed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier, derived from the normalization key.
    pub id: EntityId,
    /// Type labels; the first is the primary label used for identity.
    pub labels: Vec<String>,
    /// Canonical name (spelling of the first occurrence).
    pub name: String,
    /// Merged properties.
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub properties: PropertyMap,
    /// Ids of the chunks this entity was extracted from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_chunks: Vec<String>,
}

impl Entity {
    /// Creates a new entity with an id derived from its key.
    #[must_use]
    pub fn new(label: impl Into<String>, name: impl Into<String>) -> Self {
        let label = label.into();
        let name = name.into();
        let id = EntityId::from_key(&NormalizationKey::new(&name, &label));
        Self {
            id,
            labels: vec![label],
            name,
            properties: PropertyMap::new(),
            source_chunks: Vec::new(),
        }
    }

    /// Replaces the entity id.
    #[must_use]
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    /// Adds a secondary label, skipping duplicates.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.add_label(label.into());
        self
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Records a contributing chunk id.
    #[must_use]
    pub fn with_source_chunk(mut self, chunk_id: impl Into<String>) -> Self {
        self.add_source_chunk(chunk_id.into());
        self
    }

    /// Returns the primary label.
    #[must_use]
    pub fn primary_label(&self) -> &str {
        self.labels.first().map_or("Entity", String::as_str)
    }

    /// Returns this entity's normalization key.
    #[must_use]
    pub fn normalization_key(&self) -> NormalizationKey {
        NormalizationKey::new(&self.name, self.primary_label())
    }

    /// Returns true if `name` folds to the same text as this entity's name.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        NormalizationKey::fold(&self.name) == NormalizationKey::fold(name)
    }

    pub(crate) fn add_label(&mut self, label: String) {
        let folded = NormalizationKey::fold(&label);
        if !self
            .labels
            .iter()
            .any(|l| NormalizationKey::fold(l) == folded)
        {
            self.labels.push(label);
        }
    }

    pub(crate) fn add_source_chunk(&mut self, chunk_id: String) {
        if !self.source_chunks.contains(&chunk_id) {
            self.source_chunks.push(chunk_id);
        }
    }
}

/// A directed, typed edge between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Source entity id.
    pub source: EntityId,
    /// Target entity id.
    pub target: EntityId,
    /// Relationship type as extracted (folded for dedup, sanitized for
    /// the store at write time).
    #[serde(rename = "type")]
    pub rel_type: String,
    /// Merged properties.
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub properties: PropertyMap,
    /// Ids of the chunks this relationship was extracted from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_chunks: Vec<String>,
}

impl Relationship {
    /// Creates a new relationship.
    #[must_use]
    pub fn new(source: EntityId, target: EntityId, rel_type: impl Into<String>) -> Self {
        Self {
            source,
            target,
            rel_type: rel_type.into(),
            properties: PropertyMap::new(),
            source_chunks: Vec::new(),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Records a contributing chunk id.
    #[must_use]
    pub fn with_source_chunk(mut self, chunk_id: impl Into<String>) -> Self {
        let chunk_id = chunk_id.into();
        if !self.source_chunks.contains(&chunk_id) {
            self.source_chunks.push(chunk_id);
        }
        self
    }

    /// Identity triple for duplicate collapse: (source, folded type, target).
    #[must_use]
    pub fn dedup_key(&self) -> (String, String, String) {
        (
            self.source.as_str().to_string(),
            NormalizationKey::fold(&self.rel_type),
            self.target.as_str().to_string(),
        )
    }
}

/// One JSON value that may be a single label or a list of labels.
///
/// The fragment contract accepts `"label": "Person"` and
/// `"label": ["Person", "Hero"]`; the first element is primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    /// A single label.
    One(String),
    /// Multiple labels, primary first.
    Many(Vec<String>),
}

impl LabelValue {
    /// Returns the primary label, falling back to `Entity` when empty.
    #[must_use]
    pub fn primary(&self) -> &str {
        match self {
            Self::One(label) => label,
            Self::Many(labels) => labels.first().map_or("Entity", String::as_str),
        }
    }

    /// Returns all labels as a vector, primary first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(label) => vec![label.clone()],
            Self::Many(labels) if labels.is_empty() => vec!["Entity".to_string()],
            Self::Many(labels) => labels.clone(),
        }
    }
}

/// A raw node record inside a fragment.
///
/// `id`, `label` and `name` are required (the validated schema at the
/// extractor/normalizer boundary); `properties` is an open bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentNode {
    /// Fragment-local node id (e.g. `n1`). Not globally unique.
    pub id: String,
    /// Type label(s).
    #[serde(alias = "labels")]
    pub label: LabelValue,
    /// Surface name as extracted.
    pub name: String,
    /// Extracted properties.
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub properties: PropertyMap,
}

impl FragmentNode {
    /// Creates a node record with a single label.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: LabelValue::One(label.into()),
            name: name.into(),
            properties: PropertyMap::new(),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A raw relationship record inside a fragment.
///
/// Endpoint references are fragment-local node ids. Legacy spellings
/// from the earlier extraction pipeline (`subject_id`/`object_id`/
/// `predicate`) are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentRelationship {
    /// Source node id.
    #[serde(alias = "subject", alias = "subject_id")]
    pub source: String,
    /// Target node id.
    #[serde(alias = "object", alias = "object_id")]
    pub target: String,
    /// Relationship type.
    #[serde(rename = "type", alias = "predicate")]
    pub rel_type: String,
    /// Extracted properties.
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    pub properties: PropertyMap,
}

impl FragmentRelationship {
    /// Creates a relationship record.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        rel_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            rel_type: rel_type.into(),
            properties: PropertyMap::new(),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// One chunk's worth of raw extracted nodes and relationships.
///
/// Write-once, read-once: produced by one extraction call, consumed by
/// one normalization pass. Node ids are local to the fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphFragment {
    /// Id of the chunk this fragment was extracted from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    /// Extracted nodes.
    pub nodes: Vec<FragmentNode>,
    /// Extracted relationships.
    #[serde(default, alias = "rels", skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<FragmentRelationship>,
}

impl GraphFragment {
    /// Creates an empty fragment for a chunk.
    #[must_use]
    pub fn new(chunk_id: impl Into<String>) -> Self {
        Self {
            chunk_id: Some(chunk_id.into()),
            nodes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Adds a node record.
    #[must_use]
    pub fn with_node(mut self, node: FragmentNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Adds a relationship record.
    #[must_use]
    pub fn with_relationship(mut self, relationship: FragmentRelationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Returns true if the fragment has no nodes and no relationships.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}

/// The fully merged, deduplicated graph state.
///
/// Invariants (established by the normalizer): no two entities share a
/// normalization key; every relationship's endpoints exist in the
/// entity set; no two relationships share (source, type, target).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Deduplicated entities.
    pub entities: Vec<Entity>,
    /// Resolved relationships.
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl GraphSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entities: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Number of entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of relationships.
    #[must_use]
    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Returns true if the snapshot holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Looks up an entity by id.
    #[must_use]
    pub fn find_entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| &e.id == id)
    }
}
