//! Multi-query retrieval: search with model-generated rewrites of the query.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::document::{ScoredPoint, sort_by_score};
use crate::error::Result;
use crate::llm::LanguageModel;
use crate::prompt::PromptTemplate;
use crate::retriever::{DenseRetriever, Retriever, retrieval_failed};

/// Runs a dense search for the query and each rewrite, then unions the results.
pub struct MultiQueryRetriever {
    llm: Arc<dyn LanguageModel>,
    dense: DenseRetriever,
    template: PromptTemplate,
    variants: usize,
    limit: usize,
}

impl MultiQueryRetriever {
    /// Create a multi-query retriever generating `variants` rewrites.
    ///
    /// `template` must carry `{question}` and `{count}` slots.
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        dense: DenseRetriever,
        template: PromptTemplate,
        variants: usize,
        limit: usize,
    ) -> Self {
        Self { llm, dense, template, variants, limit }
    }

    /// Ask the model for rewrites of `query`, one per non-empty line.
    pub async fn generate_queries(&self, query: &str) -> Result<Vec<String>> {
        let count = self.variants.to_string();
        let prompt = self.template.render(&[("question", query), ("count", count.as_str())]);
        let completion = self
            .llm
            .generate(&prompt)
            .await
            .map_err(|e| retrieval_failed("multiquery", "query generation", e))?;
        Ok(parse_queries(&completion, self.variants))
    }
}

/// Drop a leading `1.` / `2)` number or a `-` / `*` bullet. Other leading digits are content.
fn strip_list_marker(line: &str) -> &str {
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let marker = if digits > 0 {
        line[digits..].strip_prefix(['.', ')'])
    } else {
        line.strip_prefix(['-', '*'])
    };
    match marker {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => line,
    }
}

/// Split a completion into at most `max` queries, stripping list markers.
pub fn parse_queries(completion: &str, max: usize) -> Vec<String> {
    completion
        .lines()
        .map(|line| strip_list_marker(line.trim()).trim())
        .filter(|line| !line.is_empty())
        .take(max)
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Retriever for MultiQueryRetriever {
    fn name(&self) -> &str {
        "multiquery"
    }

    async fn retrieve(
        &self,
        query: &str,
        document_id: &str,
        collection: &str,
    ) -> Result<Vec<ScoredPoint>> {
        let mut queries = vec![query.to_string()];
        queries.extend(self.generate_queries(query).await?);
        let mut seen = HashSet::new();
        queries.retain(|q| seen.insert(q.to_lowercase()));

        let mut merged: HashMap<String, ScoredPoint> = HashMap::new();
        for q in &queries {
            let results = match self.dense.retrieve(q, document_id, collection).await {
                Ok(results) => results,
                Err(e) if q != query => {
                    warn!(query = %q, error = %e, "skipping failed query rewrite");
                    continue;
                }
                Err(e) => return Err(e),
            };
            for point in results {
                merged
                    .entry(point.id.clone())
                    .and_modify(|existing| {
                        if point.score > existing.score {
                            existing.score = point.score;
                        }
                    })
                    .or_insert(point);
            }
        }

        let mut results: Vec<ScoredPoint> = merged.into_values().collect();
        sort_by_score(&mut results);
        results.truncate(self.limit);

        info!(
            collection,
            query_count = queries.len(),
            result_count = results.len(),
            "multi-query search completed"
        );
        Ok(results)
    }
}
