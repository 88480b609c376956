//! The JSON contract between the comparison backend and its clients.
//!
//! A request names one strategy (`hybrid_rag`, `hyde_rag`, `multiquery_rag`,
//! `dense_rag`) or `all`. Response keys are `{prefix}_response`,
//! `{prefix}_llm_eval` and `{prefix}_retriever_eval`, where the prefix is the
//! wire name for a single strategy and the lowercased label
//! (`hybrid_retriever`, ...) for `all`. Evaluation values are arrays whose
//! first element is a comma-joined metric line.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RagError;

/// Shown when the backend sent no response text for a strategy.
pub const NO_RESPONSE: &str = "No response available.";

/// Wire name selecting every strategy.
pub const ALL_WIRE_NAME: &str = "all";

/// Label of the every-strategy selection.
pub const ALL_LABEL: &str = "All";

/// One retrieval strategy under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Sparse + dense prefetch fused with RRF.
    Hybrid,
    /// Hypothetical document embedding with MMR.
    Hyde,
    /// Dense search over model-generated query rewrites.
    MultiQuery,
    /// Plain dense search.
    Dense,
}

impl Strategy {
    /// Every strategy, in display order.
    pub const ALL: [Strategy; 4] =
        [Strategy::Hybrid, Strategy::Hyde, Strategy::MultiQuery, Strategy::Dense];

    /// Path segment and single-model key prefix, e.g. `hybrid_rag`.
    pub fn wire_name(self) -> &'static str {
        match self {
            Strategy::Hybrid => "hybrid_rag",
            Strategy::Hyde => "hyde_rag",
            Strategy::MultiQuery => "multiquery_rag",
            Strategy::Dense => "dense_rag",
        }
    }

    /// Human-readable label, e.g. `Hybrid Retriever`.
    pub fn label(self) -> &'static str {
        match self {
            Strategy::Hybrid => "Hybrid Retriever",
            Strategy::Hyde => "HyDE Retriever",
            Strategy::MultiQuery => "Multiquery Retriever",
            Strategy::Dense => "Dense Retriever",
        }
    }

    /// Key prefix used in `all` responses: the label lowercased, spaces to underscores.
    pub fn label_key(self) -> String {
        self.label().to_lowercase().replace(' ', "_")
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which strategies a request runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSelection {
    /// Exactly one strategy.
    Single(Strategy),
    /// All four strategies.
    All,
}

impl ModelSelection {
    /// Every selection, in the order a form offers them.
    pub const OPTIONS: [ModelSelection; 5] = [
        ModelSelection::Single(Strategy::Hybrid),
        ModelSelection::Single(Strategy::Hyde),
        ModelSelection::Single(Strategy::MultiQuery),
        ModelSelection::Single(Strategy::Dense),
        ModelSelection::All,
    ];

    /// Path segment, e.g. `dense_rag` or `all`.
    pub fn wire_name(self) -> &'static str {
        match self {
            ModelSelection::Single(s) => s.wire_name(),
            ModelSelection::All => ALL_WIRE_NAME,
        }
    }

    /// Form label, e.g. `Dense Retriever` or `All`.
    pub fn label(self) -> &'static str {
        match self {
            ModelSelection::Single(s) => s.label(),
            ModelSelection::All => ALL_LABEL,
        }
    }

    /// Look a selection up by its form label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::OPTIONS.into_iter().find(|o| o.label() == label)
    }

    /// The strategies this selection runs, in display order.
    pub fn strategies(self) -> Vec<Strategy> {
        match self {
            ModelSelection::Single(s) => vec![s],
            ModelSelection::All => Strategy::ALL.to_vec(),
        }
    }

    /// Response key prefix for `strategy` under this selection.
    pub fn key_prefix(self, strategy: Strategy) -> String {
        match self {
            ModelSelection::Single(_) => strategy.wire_name().to_string(),
            ModelSelection::All => strategy.label_key(),
        }
    }
}

impl FromStr for ModelSelection {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL_WIRE_NAME {
            return Ok(ModelSelection::All);
        }
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.wire_name() == s)
            .map(ModelSelection::Single)
            .ok_or_else(|| RagError::ConfigError(format!("unknown RAG model '{s}'")))
    }
}

impl fmt::Display for ModelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// What one strategy produced for a request, as sent on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutcome {
    /// Generated answer, or an error description when the strategy failed.
    pub response: String,
    /// Comma-joined LLM metrics; `None` when the strategy failed.
    pub llm_eval: Option<String>,
    /// Comma-joined retriever metrics; `None` when the strategy failed.
    pub retriever_eval: Option<String>,
}

impl StrategyOutcome {
    /// A failed strategy: the error goes into the response slot, evaluations stay empty.
    pub fn failed(error: impl fmt::Display) -> Self {
        Self { response: format!("Error: {error}"), llm_eval: None, retriever_eval: None }
    }
}

fn eval_value(line: &Option<String>) -> Value {
    Value::Array(line.iter().map(|l| Value::String(l.clone())).collect())
}

/// Build the response object for `selection` from per-strategy outcomes.
pub fn response_body(
    selection: ModelSelection,
    outcomes: &[(Strategy, StrategyOutcome)],
) -> Map<String, Value> {
    let mut body = Map::new();
    for (strategy, outcome) in outcomes {
        let prefix = selection.key_prefix(*strategy);
        body.insert(format!("{prefix}_response"), Value::String(outcome.response.clone()));
        body.insert(format!("{prefix}_llm_eval"), eval_value(&outcome.llm_eval));
        body.insert(format!("{prefix}_retriever_eval"), eval_value(&outcome.retriever_eval));
    }
    body
}

/// Client-side view of one strategy's result.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyView {
    /// The strategy shown.
    pub strategy: Strategy,
    /// Answer text, or [`NO_RESPONSE`].
    pub response: String,
    /// Individual LLM metrics, trimmed.
    pub llm_eval: Vec<String>,
    /// Individual retriever metrics, trimmed.
    pub retriever_eval: Vec<String>,
}

/// Split the first element of an evaluation array on commas.
///
/// Anything that is not a non-empty array of strings yields no metrics.
pub fn split_metrics(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(Value::as_str)
        .map(|line| line.split(',').map(|m| m.trim().to_string()).collect())
        .unwrap_or_default()
}

/// Read the per-strategy views out of a response body.
pub fn parse_response(selection: ModelSelection, body: &Value) -> Vec<StrategyView> {
    selection
        .strategies()
        .into_iter()
        .map(|strategy| {
            let prefix = selection.key_prefix(strategy);
            let response = body
                .get(format!("{prefix}_response"))
                .and_then(Value::as_str)
                .unwrap_or(NO_RESPONSE)
                .to_string();
            StrategyView {
                strategy,
                response,
                llm_eval: split_metrics(body.get(format!("{prefix}_llm_eval"))),
                retriever_eval: split_metrics(body.get(format!("{prefix}_retriever_eval"))),
            }
        })
        .collect()
}
