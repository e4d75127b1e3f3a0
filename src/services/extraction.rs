//! LLM-based graph extraction from text chunks.
//!
//! Each chunk becomes one [`GraphFragment`] through a single LLM call.
//! A chunk whose call fails or whose response cannot be parsed is
//! skipped and counted; the run never aborts over one bad chunk.

use crate::llm::prompts::{EXTRACTION_SYSTEM_PROMPT, extraction_prompt};
use crate::llm::{LlmProvider, extract_json_from_response};
use crate::models::{FragmentNode, FragmentRelationship, GraphFragment, TextChunk};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Summary of an extraction run over a set of chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Chunks submitted.
    pub chunks: usize,
    /// Fragments produced (chunks that extracted successfully).
    pub fragments: usize,
    /// Chunks skipped after an LLM failure or unparseable response.
    pub failed_chunks: usize,
    /// Node records discarded for missing required keys.
    pub discarded_nodes: usize,
    /// Relationship records discarded for missing required keys.
    pub discarded_relationships: usize,
}

/// Extracts graph fragments from text chunks via an LLM.
pub struct ExtractionService<P: LlmProvider> {
    /// LLM provider for extraction calls.
    llm: P,
}

impl<P: LlmProvider> ExtractionService<P> {
    /// Creates a new extraction service.
    pub const fn new(llm: P) -> Self {
        Self { llm }
    }

    /// Returns the underlying provider.
    pub const fn provider(&self) -> &P {
        &self.llm
    }

    /// Extracts a graph fragment from one chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the LLM call fails or the response contains
    /// no parseable JSON object. Individual malformed records inside an
    /// otherwise valid response are discarded, not errors.
    pub fn extract(&self, chunk: &TextChunk) -> Result<GraphFragment> {
        self.extract_counted(chunk).map(|(fragment, _, _)| fragment)
    }

    /// Extracts fragments from every chunk, skipping failures.
    ///
    /// Failed chunks are logged and counted in the report; the pipeline
    /// continues with whatever fragments were produced.
    pub fn extract_all(&self, chunks: &[TextChunk]) -> (Vec<GraphFragment>, ExtractionReport) {
        let mut fragments = Vec::with_capacity(chunks.len());
        let mut report = ExtractionReport {
            chunks: chunks.len(),
            ..ExtractionReport::default()
        };

        for chunk in chunks {
            match self.extract_counted(chunk) {
                Ok((fragment, discarded_nodes, discarded_relationships)) => {
                    report.fragments += 1;
                    report.discarded_nodes += discarded_nodes;
                    report.discarded_relationships += discarded_relationships;
                    fragments.push(fragment);
                },
                Err(e) => {
                    tracing::warn!(
                        chunk_id = %chunk.id,
                        error = %e,
                        "Chunk extraction failed, skipping"
                    );
                    metrics::counter!("extraction_failed_chunks_total").increment(1);
                    report.failed_chunks += 1;
                },
            }
        }

        metrics::counter!("extraction_chunks_total").increment(chunks.len() as u64);
        tracing::info!(
            chunks = report.chunks,
            fragments = report.fragments,
            failed_chunks = report.failed_chunks,
            discarded_nodes = report.discarded_nodes,
            discarded_relationships = report.discarded_relationships,
            "Extraction complete"
        );

        (fragments, report)
    }

    /// Extracts one chunk, returning discard counts alongside the fragment.
    fn extract_counted(&self, chunk: &TextChunk) -> Result<(GraphFragment, usize, usize)> {
        let user = extraction_prompt(&chunk.text);
        let response = self.llm.complete_with_system(EXTRACTION_SYSTEM_PROMPT, &user)?;
        let payload = extract_json_from_response(&response);
        parse_fragment(&chunk.id, payload)
    }
}

/// Raw LLM response shape, parsed leniently record by record.
#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    nodes: Vec<serde_json::Value>,
    #[serde(default)]
    relationships: Vec<serde_json::Value>,
}

/// Parses an extraction payload into a fragment.
///
/// Records that fail to deserialize are discarded and counted, so one
/// malformed node does not cost the whole chunk.
fn parse_fragment(chunk_id: &str, payload: &str) -> Result<(GraphFragment, usize, usize)> {
    let raw: RawExtraction = serde_json::from_str(payload).map_err(|e| {
        tracing::debug!(chunk_id = %chunk_id, error = %e, "Unparseable extraction response");
        Error::OperationFailed {
            operation: "parse_extraction".to_string(),
            cause: format!("invalid JSON response: {e}"),
        }
    })?;

    let mut fragment = GraphFragment::new(chunk_id);
    let mut discarded_nodes = 0;
    let mut discarded_relationships = 0;

    for value in raw.nodes {
        match serde_json::from_value::<FragmentNode>(value) {
            Ok(node) => fragment.nodes.push(node),
            Err(e) => {
                tracing::debug!(chunk_id = %chunk_id, error = %e, "Discarding malformed node record");
                discarded_nodes += 1;
            },
        }
    }

    for value in raw.relationships {
        match serde_json::from_value::<FragmentRelationship>(value) {
            Ok(rel) => fragment.relationships.push(rel),
            Err(e) => {
                tracing::debug!(chunk_id = %chunk_id, error = %e, "Discarding malformed relationship record");
                discarded_relationships += 1;
            },
        }
    }

    Ok((fragment, discarded_nodes, discarded_relationships))
}
