//! Offline stand-ins for the embedding and language-model services.
//!
//! Useful for tests and for running the comparison without API keys.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::LanguageModel;
use crate::sparse::{token_index, tokenize};

/// A deterministic dense embedder: hashed bag of words, L2-normalised.
///
/// Texts sharing terms get positive cosine similarity, which is enough to
/// exercise ranking without a model.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// Create an embedder producing `dimensions`-long vectors.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    /// Compute the embedding synchronously.
    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokenize(text) {
            vector[token_index(&token) as usize % self.dimensions] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

type Responder = dyn Fn(&str) -> Result<String> + Send + Sync;

/// A scripted [`LanguageModel`] that records every prompt it receives.
#[derive(Clone)]
pub struct MockLanguageModel {
    name: String,
    responder: Arc<Responder>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockLanguageModel {
    /// Answer every prompt through `responder`.
    pub fn from_fn(responder: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            name: "mock".to_string(),
            responder: Arc::new(responder),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer every prompt with `response`.
    pub fn fixed(response: impl Into<String>) -> Self {
        let response = response.into();
        Self::from_fn(move |_| Ok(response.clone()))
    }

    /// Fail every prompt with a generation error.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::from_fn(move |_| {
            Err(RagError::GenerationError { model: "mock".into(), message: message.clone() })
        })
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        (self.responder)(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmr::cosine;

    #[test]
    fn shared_terms_are_similar() {
        let embedder = HashEmbeddingProvider::new(64);
        let a = embedder.vectorize("refund policy for orders");
        let b = embedder.vectorize("the refund policy");
        let c = embedder.vectorize("shipping times");
        assert!(cosine(&a, &b) > cosine(&a, &c));
        assert!((a.iter().map(|x| x * x).sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn prompts_are_recorded() {
        let llm = MockLanguageModel::fixed("ok");
        assert_eq!(llm.generate("first").await.unwrap(), "ok");
        llm.generate("second").await.unwrap();
        assert_eq!(llm.prompts(), vec!["first", "second"]);
        assert!(MockLanguageModel::failing("down").generate("x").await.is_err());
    }
}
