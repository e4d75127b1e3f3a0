//! Pipeline services.
//!
//! Services orchestrate the pipeline stages over the models, the LLM
//! layer and the storage backends. Each stage is independently usable;
//! the CLI wires them together.

mod answer;
mod chunking;
mod evaluation;
mod extraction;
mod loader;
mod normalizer;
mod retrieval;

pub use answer::{Answer, AnswerService};
pub use chunking::Chunker;
pub use evaluation::{
    EvalReport, EvaluationService, QaPair, QuestionScore, RougeScore, read_qa_pairs_file, rouge_1,
    rouge_l, tokenize,
};
pub use extraction::{ExtractionReport, ExtractionService};
pub use loader::{DEFAULT_BATCH_SIZE, GraphLoader, LoadReport};
pub use normalizer::{NormalizeReport, Normalizer};
pub use retrieval::{RankedContext, RetrievalService};
