//! Response generation from retrieved context.

use std::sync::Arc;

use tracing::{error, info};

use crate::document::ScoredPoint;
use crate::error::{RagError, Result};
use crate::llm::LanguageModel;
use crate::prompt::PromptTemplate;

/// Join retrieved chunk contents into one context block.
pub fn format_context(points: &[ScoredPoint]) -> String {
    points
        .iter()
        .map(|p| p.content.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Formats a question and context into a template and asks the model for an answer.
pub struct ResponseGenerator {
    llm: Arc<dyn LanguageModel>,
    template: PromptTemplate,
}

impl ResponseGenerator {
    /// Create a generator using `template` for every prompt.
    pub fn new(llm: Arc<dyn LanguageModel>, template: PromptTemplate) -> Self {
        Self { llm, template }
    }

    /// The template this generator renders.
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Generate an answer; the completion is returned unmodified.
    ///
    /// # Errors
    ///
    /// Model failures are logged and returned as [`RagError::GenerationError`].
    pub async fn generate_response(&self, question: &str, context: &str) -> Result<String> {
        let prompt = self.template.format(question, context);

        match self.llm.generate(&prompt).await {
            Ok(response) => {
                info!(
                    model = self.llm.name(),
                    template = self.template.name(),
                    "response generated"
                );
                Ok(response)
            }
            Err(e) => {
                error!(model = self.llm.name(), error = %e, "response generation failed");
                Err(match e {
                    RagError::GenerationError { .. } => e,
                    other => RagError::GenerationError {
                        model: self.llm.name().to_string(),
                        message: other.to_string(),
                    },
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::mock::MockLanguageModel;
    use crate::prompt::PromptTemplates;

    fn point(content: &str) -> ScoredPoint {
        ScoredPoint {
            id: content.to_string(),
            score: 1.0,
            content: content.to_string(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn context_skips_blank_chunks() {
        let context = format_context(&[point(" first "), point("  "), point("second")]);
        assert_eq!(context, "first\n\nsecond");
    }

    #[tokio::test]
    async fn prompt_carries_question_and_context() {
        let llm = Arc::new(MockLanguageModel::fixed("  thirty days  "));
        let generator = ResponseGenerator::new(llm.clone(), PromptTemplates::default().standard);

        let answer = generator.generate_response("How long?", "Refunds: thirty days.").await;

        assert_eq!(answer.unwrap(), "  thirty days  ");
        let prompts = llm.prompts();
        assert!(prompts[0].contains("How long?"));
        assert!(prompts[0].contains("Refunds: thirty days."));
    }

    #[tokio::test]
    async fn failures_surface_as_generation_errors() {
        let generator = ResponseGenerator::new(
            Arc::new(MockLanguageModel::failing("timeout")),
            PromptTemplates::default().conversational,
        );
        let err = generator.generate_response("q", "c").await.unwrap_err();
        assert!(matches!(err, RagError::GenerationError { .. }));
        assert!(err.to_string().contains("timeout"));
    }
}
