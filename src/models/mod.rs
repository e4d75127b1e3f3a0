//! Data models for suhoc.
//!
//! This module contains the core data structures flowing through the
//! pipeline, plus the JSON file readers and writers for its artifacts.

mod chunk;
pub mod graph;
mod io;

pub use chunk::TextChunk;
pub use graph::{
    Entity, EntityId, FragmentNode, FragmentRelationship, GraphFragment, GraphSnapshot,
    LabelValue, NormalizationKey, PropertyMap, PropertyValue, Relationship, merge_properties,
};
pub use io::{
    GraphInput, read_chunks_file, read_fragments_file, read_graph_file, read_text_file,
    write_json_file, write_snapshot_file,
};
