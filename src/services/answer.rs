//! Grounded answer generation.

use crate::llm::LlmProvider;
use crate::llm::prompts::{ANSWER_SYSTEM_PROMPT, answer_prompt};
use crate::services::RankedContext;
use crate::{Error, Result};
use serde::Serialize;

/// A generated answer with the context it was grounded in.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// The question asked.
    pub question: String,
    /// Generated answer text.
    pub text: String,
    /// Rendered context block the model saw.
    pub context: String,
    /// Triples that backed the answer.
    pub triples: usize,
    /// Source chunk ids backing the context.
    pub chunk_ids: Vec<String>,
}

/// Generates answers grounded in retrieved graph context.
pub struct AnswerService<P: LlmProvider> {
    /// LLM provider for answer generation.
    llm: P,
}

impl<P: LlmProvider> AnswerService<P> {
    /// Creates a new answer service.
    pub const fn new(llm: P) -> Self {
        Self { llm }
    }

    /// Generates an answer for a question from retrieved context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty question, or the
    /// provider error if generation fails.
    pub fn answer(&self, question: &str, context: &RankedContext) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidInput("question must not be empty".to_string()));
        }

        let block = context.context_block();
        let user = answer_prompt(question, &block);
        let text = self.llm.complete_with_system(ANSWER_SYSTEM_PROMPT, &user)?;

        metrics::counter!("answers_generated_total").increment(1);
        tracing::debug!(
            question = %question,
            triples = context.triples.len(),
            "Generated answer"
        );

        Ok(Answer {
            question: question.to_string(),
            text: text.trim().to_string(),
            context: block,
            triples: context.triples.len(),
            chunk_ids: context.chunk_ids.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    impl LlmProvider for EchoProvider {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn complete(&self, prompt: &str) -> Result<String> {
            Ok(format!("echo: {prompt}"))
        }
    }

    #[test]
    fn test_answer_includes_context() {
        let service = AnswerService::new(EchoProvider);
        let context = RankedContext {
            seeds: Vec::new(),
            triples: vec!["- Trần Hưng Đạo -[chỉ huy]-> Quân đội nhà Trần".to_string()],
            chunk_ids: vec!["chunk_0001".to_string()],
        };

        let answer = service
            .answer("Ai chỉ huy quân đội nhà Trần?", &context)
            .expect("answer should succeed");

        assert!(answer.text.contains("Trần Hưng Đạo"));
        assert_eq!(answer.triples, 1);
        assert_eq!(answer.chunk_ids, vec!["chunk_0001".to_string()]);
    }

    #[test]
    fn test_empty_question_rejected() {
        let service = AnswerService::new(EchoProvider);
        let err = service
            .answer("   ", &RankedContext::default())
            .expect_err("blank question should fail");
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
