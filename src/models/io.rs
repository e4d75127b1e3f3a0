//! JSON file readers and writers for pipeline artifacts.
//!
//! Every stage of the pipeline communicates through files: chunks,
//! fragments, snapshots, and reports. Readers are lenient about shape
//! where the upstream tooling varied (a fragments file may be a JSON
//! array or a single fragment object); writers always emit pretty JSON.

use crate::models::chunk::TextChunk;
use crate::models::graph::{GraphFragment, GraphSnapshot};
use crate::{Error, Result};
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Parsed content of a graph file passed to `load`.
///
/// The loader accepts either raw extraction output (fragments, which it
/// normalizes first) or an already normalized snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GraphInput {
    /// A normalized snapshot.
    Snapshot(GraphSnapshot),
    /// Raw fragments, one per chunk.
    Fragments(Vec<GraphFragment>),
    /// A single fragment object.
    Fragment(Box<GraphFragment>),
}

/// Reads a fragments file (JSON array of fragments, or one fragment).
pub fn read_fragments_file(path: impl AsRef<Path>) -> Result<Vec<GraphFragment>> {
    let path = path.as_ref();
    let raw = read_to_string(path)?;
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FragmentsFile {
        Many(Vec<GraphFragment>),
        One(Box<GraphFragment>),
    }
    let parsed: FragmentsFile = serde_json::from_str(&raw).map_err(|e| {
        Error::InvalidInput(format!("{} is not a fragments file: {e}", path.display()))
    })?;
    Ok(match parsed {
        FragmentsFile::Many(fragments) => fragments,
        FragmentsFile::One(fragment) => vec![*fragment],
    })
}

/// Reads a graph file that may hold fragments or a snapshot.
pub fn read_graph_file(path: impl AsRef<Path>) -> Result<GraphInput> {
    let path = path.as_ref();
    let raw = read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        Error::InvalidInput(format!(
            "{} is neither a snapshot nor a fragments file: {e}",
            path.display()
        ))
    })
}

/// Reads a chunks file produced by the `chunk` command.
pub fn read_chunks_file(path: impl AsRef<Path>) -> Result<Vec<TextChunk>> {
    let path = path.as_ref();
    let raw = read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::InvalidInput(format!("{} is not a chunks file: {e}", path.display())))
}

/// Reads a UTF-8 text file.
pub fn read_text_file(path: impl AsRef<Path>) -> Result<String> {
    read_to_string(path.as_ref())
}

/// Writes a snapshot as pretty JSON.
pub fn write_snapshot_file(path: impl AsRef<Path>, snapshot: &GraphSnapshot) -> Result<()> {
    write_json_file(path, snapshot)
}

/// Writes any serializable value as pretty JSON.
pub fn write_json_file<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let rendered = serde_json::to_string_pretty(value).map_err(|e| Error::OperationFailed {
        operation: format!("serialize {}", path.display()),
        cause: e.to_string(),
    })?;
    fs::write(path, rendered).map_err(|e| Error::OperationFailed {
        operation: format!("write {}", path.display()),
        cause: e.to_string(),
    })
}

fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::OperationFailed {
        operation: format!("read {}", path.display()),
        cause: e.to_string(),
    })
}
