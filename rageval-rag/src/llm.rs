//! Language-model boundary: one formatted prompt in, one completion out.

use async_trait::async_trait;

use crate::error::Result;

/// A text-generation backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// The model name, used in logs and errors.
    fn name(&self) -> &str;

    /// Generate a completion for a fully formatted prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
