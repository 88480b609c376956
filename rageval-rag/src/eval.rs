//! Lightweight lexical evaluation of retrieval and generation.
//!
//! These metrics need no extra model calls: they compare term sets of the
//! query, the retrieved context and the answer. Each evaluation renders to a
//! single comma-joined `name: value` line.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::document::ScoredPoint;

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

/// Share of `needles` present in `haystack`; 0.0 when `needles` is empty.
fn coverage(needles: &HashSet<String>, haystack: &HashSet<String>) -> f32 {
    if needles.is_empty() {
        return 0.0;
    }
    needles.iter().filter(|t| haystack.contains(*t)).count() as f32 / needles.len() as f32
}

/// Metrics describing one retrieved result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrieverEvaluation {
    /// Number of retrieved chunks.
    pub retrieved: usize,
    /// Mean retrieval score.
    pub mean_score: f32,
    /// Highest retrieval score.
    pub top_score: f32,
    /// Share of query terms found in the retrieved context.
    pub query_coverage: f32,
}

impl RetrieverEvaluation {
    /// Evaluate `results` retrieved for `query`.
    pub fn assess(query: &str, results: &[ScoredPoint]) -> Self {
        let retrieved = results.len();
        let mean_score = if retrieved == 0 {
            0.0
        } else {
            results.iter().map(|r| r.score).sum::<f32>() / retrieved as f32
        };
        let top_score = results.iter().map(|r| r.score).reduce(f32::max).unwrap_or(0.0);
        let context: HashSet<String> = results.iter().flat_map(|r| terms(&r.content)).collect();

        Self { retrieved, mean_score, top_score, query_coverage: coverage(&terms(query), &context) }
    }

    /// Render as `retrieved: n, mean_score: x, ...`.
    pub fn to_metric_line(&self) -> String {
        format!(
            "retrieved: {}, mean_score: {:.4}, top_score: {:.4}, query_coverage: {:.2}",
            self.retrieved, self.mean_score, self.top_score, self.query_coverage
        )
    }
}

/// Metrics describing one generated answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmEvaluation {
    /// Number of whitespace-separated words in the answer.
    pub answer_words: usize,
    /// Share of answer terms that also appear in the context.
    pub context_grounding: f32,
    /// Share of question terms the answer mentions.
    pub question_coverage: f32,
}

impl LlmEvaluation {
    /// Evaluate `answer` against the `question` and the `context` it was given.
    pub fn assess(question: &str, answer: &str, context: &str) -> Self {
        let answer_terms = terms(answer);
        Self {
            answer_words: answer.split_whitespace().count(),
            context_grounding: coverage(&answer_terms, &terms(context)),
            question_coverage: coverage(&terms(question), &answer_terms),
        }
    }

    /// Render as `answer_words: n, context_grounding: x, ...`.
    pub fn to_metric_line(&self) -> String {
        format!(
            "answer_words: {}, context_grounding: {:.2}, question_coverage: {:.2}",
            self.answer_words, self.context_grounding, self.question_coverage
        )
    }
}
