//! Text chunking for extraction.
//!
//! Splits source text into [`TextChunk`]s sized for one LLM extraction
//! call each. Paragraph boundaries are preferred, oversized paragraphs
//! fall back to sentence packing, and a single oversized sentence is
//! cut with a sliding character window. All limits are measured in
//! characters, not bytes, so multi-byte Vietnamese text never splits
//! inside a code point.

use crate::models::TextChunk;

/// Sentence terminators recognized by the fallback splitter.
const SENTENCE_TERMINATORS: [char; 4] = ['.', '!', '?', '…'];

/// Splits text into extraction-sized chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    max_chars: usize,
    overlap: usize,
}

impl Chunker {
    /// Creates a chunker with the given character budget and window
    /// overlap. `max_chars` is clamped to at least 1.
    #[must_use]
    pub fn new(max_chars: usize, overlap: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
            overlap,
        }
    }

    /// Splits `text` into chunks with sequential ids.
    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        self.pieces(text)
            .into_iter()
            .enumerate()
            .map(|(index, piece)| TextChunk::new(index, piece))
            .collect()
    }

    /// Splits `text` into chunks tagged with a source document name.
    #[must_use]
    pub fn chunk_source(&self, text: &str, source: &str) -> Vec<TextChunk> {
        self.chunk(text)
            .into_iter()
            .map(|chunk| chunk.with_source(source))
            .collect()
    }

    fn pieces(&self, text: &str) -> Vec<String> {
        let normalized = text.replace("\r\n", "\n");
        let mut pieces = Vec::new();
        let mut current = String::new();

        for paragraph in normalized.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            if char_len(paragraph) > self.max_chars {
                flush(&mut current, &mut pieces);
                pieces.extend(self.split_oversized(paragraph));
                continue;
            }
            // +2 for the paragraph separator rejoined below
            if !current.is_empty() && char_len(&current) + 2 + char_len(paragraph) > self.max_chars
            {
                flush(&mut current, &mut pieces);
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
        }
        flush(&mut current, &mut pieces);
        pieces
    }

    fn split_oversized(&self, paragraph: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current = String::new();

        for sentence in split_sentences(paragraph) {
            if char_len(&sentence) > self.max_chars {
                flush(&mut current, &mut pieces);
                pieces.extend(self.window(&sentence));
                continue;
            }
            if !current.is_empty() && char_len(&current) + 1 + char_len(&sentence) > self.max_chars
            {
                flush(&mut current, &mut pieces);
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&sentence);
        }
        flush(&mut current, &mut pieces);
        pieces
    }

    /// Sliding character window with overlap between consecutive slices.
    fn window(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = self.max_chars.saturating_sub(self.overlap).max(1);
        let mut pieces = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.max_chars).min(chars.len());
            let piece: String = chars[start..end].iter().collect();
            let piece = piece.trim().to_string();
            if !piece.is_empty() {
                pieces.push(piece);
            }
            if end == chars.len() {
                break;
            }
            start += step;
        }
        pieces
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn flush(current: &mut String, pieces: &mut Vec<String>) {
    if !current.trim().is_empty() {
        pieces.push(std::mem::take(current).trim().to_string());
    } else {
        current.clear();
    }
}

/// Splits a paragraph after sentence terminators followed by whitespace.
fn split_sentences(paragraph: &str) -> Vec<String> {
    let chars: Vec<char> = paragraph.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < chars.len() {
        if SENTENCE_TERMINATORS.contains(&chars[i])
            && chars.get(i + 1).is_none_or(|c| c.is_whitespace())
        {
            let sentence: String = chars[start..=i].iter().collect();
            let sentence = sentence.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = i + 1;
        }
        i += 1;
    }
    if start < chars.len() {
        let tail: String = chars[start..].iter().collect();
        let tail = tail.trim().to_string();
        if !tail.is_empty() {
            sentences.push(tail);
        }
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunker = Chunker::new(1200, 150);
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("  \n\n  ").is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunker = Chunker::new(1200, 150);
        let chunks = chunker.chunk("Năm 1288, quân dân nhà Trần đại phá quân Nguyên.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "chunk_0000");
    }

    #[test]
    fn test_paragraphs_pack_up_to_the_budget() {
        let chunker = Chunker::new(30, 0);
        let text = "đoạn một ngắn.\n\nđoạn hai ngắn.\n\nđoạn ba dài hơn một chút nữa.";
        let chunks = chunker.chunk(text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 30, "chunk over budget: {}", chunk.text);
        }
        // First two short paragraphs fit together
        assert!(chunks[0].text.contains("đoạn một"));
        assert!(chunks[0].text.contains("đoạn hai"));
    }

    #[test]
    fn test_oversized_paragraph_splits_at_sentences() {
        let chunker = Chunker::new(40, 0);
        let text = "Câu thứ nhất nói về nhà Trần. Câu thứ hai nói về quân Nguyên. Câu thứ ba nói về sông Bạch Đằng.";
        let chunks = chunker.chunk(text);
        assert!(chunks.len() >= 2);
        assert!(chunks[0].text.ends_with('.'));
        for chunk in &chunks {
            assert!(chunk.char_len() <= 40);
        }
    }

    #[test]
    fn test_window_overlap_repeats_tail_characters() {
        let chunker = Chunker::new(10, 4);
        let text = "abcdefghijklmnopqrst"; // one 20-char "sentence"
        let chunks = chunker.chunk(text);
        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].text, "abcdefghij");
        assert!(chunks[1].text.starts_with("ghij"));
    }

    #[test]
    fn test_multibyte_text_never_panics() {
        let chunker = Chunker::new(8, 3);
        let text = "Đại Việt sử ký toàn thư ghi chép lịch sử Đại Việt";
        let chunks = chunker.chunk(text);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.char_len() <= 8);
        }
    }

    #[test]
    fn test_chunk_source_tags_every_chunk() {
        let chunker = Chunker::new(1200, 150);
        let chunks = chunker.chunk_source("Một đoạn văn.", "lich_su_7.txt");
        assert_eq!(chunks[0].source.as_deref(), Some("lich_su_7.txt"));
    }

    #[test]
    fn test_ids_are_sequential() {
        let chunker = Chunker::new(12, 0);
        let chunks = chunker.chunk("đoạn một.\n\nđoạn hai.\n\nđoạn ba.");
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(*id, format!("chunk_{i:04}"));
        }
    }
}
