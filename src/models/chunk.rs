//! Text chunk model.

use serde::{Deserialize, Serialize};

/// A contiguous slice of source text sized for one extraction call.
///
/// Chunk ids are assigned sequentially by the chunker (`chunk_0000`,
/// `chunk_0001`, ...) and flow through fragments into entity and
/// relationship provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Stable chunk id.
    pub id: String,
    /// Zero-based position in the source document.
    pub index: usize,
    /// Source document name or path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Chunk text.
    pub text: String,
}

impl TextChunk {
    /// Creates a chunk with the id derived from its index.
    #[must_use]
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            id: format!("chunk_{index:04}"),
            index,
            source: None,
            text: text.into(),
        }
    }

    /// Attaches the source document name.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Chunk length in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_from_index() {
        let chunk = TextChunk::new(7, "Năm 1288, quân Trần đại phá quân Nguyên.");
        assert_eq!(chunk.id, "chunk_0007");
        assert_eq!(chunk.index, 7);
    }

    #[test]
    fn test_char_len_counts_characters() {
        let chunk = TextChunk::new(0, "Bạch Đằng");
        assert_eq!(chunk.char_len(), 9);
    }
}
