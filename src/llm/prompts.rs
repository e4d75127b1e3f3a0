//! Prompt templates for graph extraction and question answering.
//!
//! Extraction prompts instruct the model to emit strict JSON matching the
//! [`crate::models::GraphFragment`] shape. Answer prompts constrain the model
//! to the retrieved graph context so answers stay grounded in the source text.

/// Entity labels the extractor is allowed to assign.
pub const ENTITY_LABELS: [&str; 8] = [
    "Person",
    "Location",
    "Event",
    "Date",
    "Organization",
    "Dynasty",
    "Document",
    "Concept",
];

/// System prompt for knowledge graph extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a knowledge graph extraction assistant for Vietnamese history texts. You read a passage and extract entities and the relationships between them.

Respond ONLY with a single JSON object, no prose, no markdown fences, in exactly this shape:

{
  "nodes": [
    {"id": "n1", "label": "Person", "name": "Trần Hưng Đạo", "properties": {"nam_sinh": 1228}}
  ],
  "relationships": [
    {"source": "n1", "target": "n2", "type": "chỉ huy", "properties": {}}
  ]
}

Rules:
- "id" values are local to this passage: n1, n2, n3, ... in order of first mention.
- "label" must be one of: Person, Location, Event, Date, Organization, Dynasty, Document, Concept. A node may use a list of labels when more than one applies; put the most specific label first.
- "name" is the canonical Vietnamese name exactly as written in the passage, with full diacritics. Never translate, transliterate, or abbreviate names.
- "relationships" must reference node ids defined in "nodes". The "type" is a short Vietnamese verb phrase describing the relation.
- "properties" hold scalar facts stated in the passage (years as numbers, titles and places as strings). Omit properties you are not certain of.
- Extract only what the passage states. Do not add outside knowledge.
- If the passage contains no extractable entities, respond with {"nodes": [], "relationships": []}."#;

/// System prompt for grounded question answering.
pub const ANSWER_SYSTEM_PROMPT: &str = r#"You are a history question answering assistant. You answer questions about Vietnamese history using ONLY the knowledge graph context provided in the user message.

Rules:
- Answer in Vietnamese, in complete sentences.
- Use only facts present in the provided context. Do not add outside knowledge.
- If the context does not contain enough information to answer, say so plainly: "Không tìm thấy thông tin trong ngữ cảnh được cung cấp."
- Keep the answer concise and factual. Cite names and dates exactly as they appear in the context."#;

/// Builds the extraction user prompt for one text chunk.
#[must_use]
pub fn extraction_prompt(chunk_text: &str) -> String {
    format!("Extract the knowledge graph from this passage:\n\n{chunk_text}")
}

/// Builds the answer user prompt from a question and retrieved context.
#[must_use]
pub fn answer_prompt(question: &str, context: &str) -> String {
    format!("Knowledge graph context:\n\n{context}\n\nQuestion: {question}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_prompt_embeds_chunk() {
        let prompt = extraction_prompt("Trần Hưng Đạo sinh năm 1228.");
        assert!(prompt.contains("Trần Hưng Đạo sinh năm 1228."));
    }

    #[test]
    fn test_answer_prompt_embeds_question_and_context() {
        let prompt = answer_prompt("Ai chỉ huy quân đội?", "- Trần Hưng Đạo -[CHỈ_HUY]-> Quân đội nhà Trần");
        assert!(prompt.contains("Ai chỉ huy quân đội?"));
        assert!(prompt.contains("Quân đội nhà Trần"));
    }

    #[test]
    fn test_system_prompts_name_the_label_set() {
        for label in ENTITY_LABELS {
            assert!(
                EXTRACTION_SYSTEM_PROMPT.contains(label),
                "extraction prompt should mention {label}"
            );
        }
    }
}
