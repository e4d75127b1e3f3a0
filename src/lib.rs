//! # Suhoc
//!
//! Knowledge graph construction and graph-grounded question answering
//! for Vietnamese history texts.
//!
//! Suhoc turns raw textbook text into a deduplicated knowledge graph
//! persisted in Neo4j, then answers natural-language questions by
//! retrieving graph neighborhoods as context for an LLM.
//!
//! ## Pipeline
//!
//! - Chunking: split source text into bounded chunks
//! - Extraction: LLM call per chunk, producing a [`GraphFragment`]
//! - Normalization: merge all fragments into one [`GraphSnapshot`]
//!   (entity deduplication, dangling-edge removal; pure and deterministic)
//! - Loading: clear-then-load the snapshot into the graph store in batches,
//!   entities before relationships
//! - Retrieval + answering: seed entities from the question, expand
//!   the neighborhood, condition the LLM on the collected triples
//! - Evaluation: ROUGE-style scoring against reference answers
//!
//! ## Example
//!
//! ```rust,ignore
//! use suhoc::services::{GraphLoader, Normalizer};
//! use suhoc::storage::Neo4jStore;
//!
//! let fragments = suhoc::models::read_fragments_file("graph_documents.json")?;
//! let (snapshot, report) = Normalizer::new().normalize(&fragments);
//! let store = Neo4jStore::connect(&config.store, config.load.reconnect_attempts)?;
//! let result = GraphLoader::new(store).load(&snapshot)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod embedding;
pub mod llm;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::SuhocConfig;
pub use embedding::Embedder;
pub use llm::LlmProvider;
pub use models::{
    Entity, EntityId, GraphFragment, GraphSnapshot, PropertyValue, Relationship, TextChunk,
};
pub use services::{
    AnswerService, EvaluationService, ExtractionService, GraphLoader, NormalizeReport, Normalizer,
    RetrievalService,
};
pub use storage::{GraphStore, MemoryStore, Neo4jStore};

/// Error type for suhoc operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed fragment/snapshot/question files, empty questions, bad CLI values |
/// | `OperationFailed` | File I/O errors, LLM HTTP failures, config parse errors |
/// | `StoreUnavailable` | Graph store unreachable after bounded reconnect attempts |
/// | `BatchWrite` | A loader batch transaction failed; the load aborts |
///
/// Recoverable conditions (a chunk whose extraction failed, a dangling
/// edge, a duplicate relationship) are not errors: they are counted in
/// the stage reports and the run continues.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A fragment or snapshot file fails schema validation
    /// - A question/reference-answer file is malformed
    /// - A CLI argument value is out of range (e.g. zero batch size)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - Filesystem I/O errors occur
    /// - An LLM HTTP request fails or returns an unusable payload
    /// - Configuration files cannot be read or parsed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The graph store could not be reached.
    ///
    /// Raised when connecting or verifying connectivity fails after the
    /// configured number of reconnect attempts. Fatal: nothing can be
    /// loaded or queried without a reachable store.
    #[error("graph store unavailable at {uri}: {cause}")]
    StoreUnavailable {
        /// The bolt URI that was tried.
        uri: String,
        /// The underlying cause of the last attempt.
        cause: String,
    },

    /// A batched write to the graph store failed.
    ///
    /// The load aborts at the failing batch; earlier batches remain
    /// committed, so the store may be partially loaded. The next
    /// successful load (full clear + reload) is the recovery path.
    #[error("load aborted: {stage} batch {batch} (items {range}) failed: {cause}")]
    BatchWrite {
        /// Which stage failed: `entities` or `relationships`.
        stage: String,
        /// Zero-based index of the failing batch within its stage.
        batch: usize,
        /// Item range of the failing batch, e.g. `200-249`.
        range: String,
        /// The underlying store error.
        cause: String,
    },
}

/// Result type alias for suhoc operations.
pub type Result<T> = std::result::Result<T, Error>;
