//! Reference-based answer evaluation.
//!
//! Scoring is deterministic: generated answers are compared against
//! reference answers with unigram overlap (ROUGE-1) and longest common
//! subsequence (ROUGE-L). Tokenization is Unicode-aware so Vietnamese
//! diacritics survive punctuation stripping.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One question with its reference answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    /// The question to ask.
    pub question: String,
    /// The reference answer to score against.
    #[serde(alias = "answer", alias = "ground_truth")]
    pub reference: String,
}

/// ROUGE score components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RougeScore {
    /// Fraction of candidate tokens matched.
    pub precision: f64,
    /// Fraction of reference tokens matched.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
}

impl RougeScore {
    fn from_counts(overlap: usize, candidate_len: usize, reference_len: usize) -> Self {
        if candidate_len == 0 || reference_len == 0 {
            return Self::default();
        }
        let precision = overlap as f64 / candidate_len as f64;
        let recall = overlap as f64 / reference_len as f64;
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
        }
    }
}

/// Scores for one evaluated question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionScore {
    /// The question asked.
    pub question: String,
    /// The reference answer.
    pub reference: String,
    /// The generated answer, absent when generation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Unigram overlap score.
    pub rouge_1: RougeScore,
    /// Longest common subsequence score.
    pub rouge_l: RougeScore,
}

/// Aggregated evaluation results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    /// Questions evaluated.
    pub total: usize,
    /// Questions whose answer generation failed.
    pub failed: usize,
    /// Mean ROUGE-1 F1 over all questions (failures score zero).
    pub mean_rouge_1_f1: f64,
    /// Mean ROUGE-L F1 over all questions (failures score zero).
    pub mean_rouge_l_f1: f64,
    /// When the evaluation ran.
    pub generated_at: DateTime<Utc>,
    /// Per-question scores in input order.
    pub scores: Vec<QuestionScore>,
}

/// Evaluates generated answers against references.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationService;

impl EvaluationService {
    /// Creates a new evaluation service.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Evaluates every pair, generating answers through `answer_fn`.
    ///
    /// A generation failure counts the question as failed with zero
    /// scores; the evaluation continues.
    pub fn evaluate<F>(&self, pairs: &[QaPair], mut answer_fn: F) -> EvalReport
    where
        F: FnMut(&str) -> Result<String>,
    {
        let mut scores = Vec::with_capacity(pairs.len());
        let mut failed = 0;
        let mut sum_rouge_1 = 0.0;
        let mut sum_rouge_l = 0.0;

        for pair in pairs {
            match answer_fn(&pair.question) {
                Ok(answer) => {
                    let r1 = rouge_1(&pair.reference, &answer);
                    let rl = rouge_l(&pair.reference, &answer);
                    sum_rouge_1 += r1.f1;
                    sum_rouge_l += rl.f1;
                    scores.push(QuestionScore {
                        question: pair.question.clone(),
                        reference: pair.reference.clone(),
                        answer: Some(answer),
                        rouge_1: r1,
                        rouge_l: rl,
                    });
                },
                Err(e) => {
                    tracing::warn!(
                        question = %pair.question,
                        error = %e,
                        "Answer generation failed, scoring zero"
                    );
                    metrics::counter!("eval_failed_total").increment(1);
                    failed += 1;
                    scores.push(QuestionScore {
                        question: pair.question.clone(),
                        reference: pair.reference.clone(),
                        answer: None,
                        rouge_1: RougeScore::default(),
                        rouge_l: RougeScore::default(),
                    });
                },
            }
        }

        let total = pairs.len();
        let denominator = if total == 0 { 1.0 } else { total as f64 };
        let report = EvalReport {
            total,
            failed,
            mean_rouge_1_f1: sum_rouge_1 / denominator,
            mean_rouge_l_f1: sum_rouge_l / denominator,
            generated_at: Utc::now(),
            scores,
        };

        metrics::counter!("eval_questions_total").increment(total as u64);
        tracing::info!(
            total = report.total,
            failed = report.failed,
            mean_rouge_1_f1 = report.mean_rouge_1_f1,
            mean_rouge_l_f1 = report.mean_rouge_l_f1,
            "Evaluation complete"
        );

        report
    }
}

/// Reads question/reference pairs from a JSON or CSV file.
///
/// JSON files hold an array of objects; `answer` and `ground_truth` are
/// accepted aliases for the reference field. CSV files need a
/// `question,answer` header.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_qa_pairs_file(path: impl AsRef<Path>) -> Result<Vec<QaPair>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        read_csv_pairs(path)
    } else {
        read_json_pairs(path)
    }
}

fn read_json_pairs(path: &Path) -> Result<Vec<QaPair>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
        operation: format!("read {}", path.display()),
        cause: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| {
        Error::InvalidInput(format!("invalid QA pairs in {}: {e}", path.display()))
    })
}

fn read_csv_pairs(path: &Path) -> Result<Vec<QaPair>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| Error::OperationFailed {
        operation: format!("read {}", path.display()),
        cause: e.to_string(),
    })?;

    let mut pairs = Vec::new();
    for record in reader.deserialize() {
        let pair: QaPair = record.map_err(|e| {
            Error::InvalidInput(format!("invalid QA pairs in {}: {e}", path.display()))
        })?;
        pairs.push(pair);
    }
    Ok(pairs)
}

/// Tokenizes text for scoring: lowercased words with punctuation
/// trimmed from both ends.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// ROUGE-1: unigram overlap with clipped counts.
#[must_use]
pub fn rouge_1(reference: &str, candidate: &str) -> RougeScore {
    let ref_tokens = tokenize(reference);
    let cand_tokens = tokenize(candidate);
    if ref_tokens.is_empty() || cand_tokens.is_empty() {
        return RougeScore::default();
    }

    let mut ref_counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for token in &ref_tokens {
        *ref_counts.entry(token).or_insert(0) += 1;
    }

    // Clipped: each candidate token matches at most its reference count.
    let mut overlap = 0;
    for token in &cand_tokens {
        if let Some(remaining) = ref_counts.get_mut(token.as_str())
            && *remaining > 0
        {
            *remaining -= 1;
            overlap += 1;
        }
    }

    RougeScore::from_counts(overlap, cand_tokens.len(), ref_tokens.len())
}

/// ROUGE-L: longest common subsequence overlap.
#[must_use]
pub fn rouge_l(reference: &str, candidate: &str) -> RougeScore {
    let ref_tokens = tokenize(reference);
    let cand_tokens = tokenize(candidate);
    if ref_tokens.is_empty() || cand_tokens.is_empty() {
        return RougeScore::default();
    }

    let lcs = lcs_length(&ref_tokens, &cand_tokens);
    RougeScore::from_counts(lcs, cand_tokens.len(), ref_tokens.len())
}

/// LCS length via two-row dynamic programming.
fn lcs_length(a: &[String], b: &[String]) -> usize {
    let (short, long) = if a.len() < b.len() { (a, b) } else { (b, a) };

    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];

    for row in long {
        for (j, col) in short.iter().enumerate() {
            curr[j + 1] = if row == col {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}
