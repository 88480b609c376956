//! Prompt templates shared by every retrieval strategy.
//!
//! All templates live in one [`PromptTemplates`] value with named variants so
//! the strategies cannot drift apart.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

const STANDARD: &str = "You are an assistant answering questions about documents uploaded by the user.
Use only the following extracted parts of the documents to answer the question.
If the context does not contain the answer, say that you don't know. Do not make up an answer.

Context:
{context}

Question: {question}

Answer:";

const CONVERSATIONAL: &str = "You are an AI assistant for answering questions about the various documents from the user.
You are given the following extracted parts of a long document and a question. If you are not provided with any extracted
parts of the documents then try to generate an answer based on your knowledge and facts in your knowledge. Remember to provide a conversational answer.
If you don't know the answer, just say \"Hmm, I'm not sure.\" Don't try to make up an answer.
Question: {question}
=========
{context}
=========
Answer in Markdown: ";

const HYPOTHETICAL_DOCUMENT: &str = "Write a short passage from a document that answers the question below.
Write it as the document itself would, without mentioning the question.

Question: {question}

Passage:";

const QUERY_VARIANTS: &str = "You are an AI language model assistant. Generate {count} different versions of the
given user question to retrieve relevant documents from a vector database. By generating multiple
perspectives on the user question, help the user overcome some of the limitations of distance-based
similarity search. Provide these alternative questions separated by newlines, with no numbering.

Original question: {question}";

/// A template with named `{placeholder}` slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    name: String,
    text: String,
}

impl PromptTemplate {
    /// Create a template, checking that every `placeholders` entry appears in `text`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] naming the first missing placeholder.
    pub fn new(
        name: impl Into<String>,
        text: impl Into<String>,
        placeholders: &[&str],
    ) -> Result<Self> {
        let name = name.into();
        let text = text.into();
        if let Some(missing) = placeholders.iter().find(|p| !text.contains(&format!("{{{p}}}"))) {
            return Err(RagError::ConfigError(format!(
                "prompt template '{name}' is missing the {{{missing}}} placeholder"
            )));
        }
        Ok(Self { name, text })
    }

    fn builtin(name: &str, text: &str) -> Self {
        Self { name: name.to_string(), text: text.to_string() }
    }

    /// The template name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw template text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substitute `{key}` for each pair in a single pass over the template.
    ///
    /// Substituted values are never scanned again. Unknown keys are left as-is.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let slot = &rest[open..];
            let filled = slot[1..].find('}').and_then(|end| {
                let key = &slot[1..=end];
                values.iter().find(|(k, _)| *k == key).map(|(_, value)| (*value, end + 2))
            });
            match filled {
                Some((value, consumed)) => {
                    out.push_str(value);
                    rest = &slot[consumed..];
                }
                None => {
                    out.push('{');
                    rest = &slot[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Render a question/context answer prompt.
    pub fn format(&self, question: &str, context: &str) -> String {
        self.render(&[("question", question), ("context", context)])
    }
}

/// The named template variants used across the strategies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplates {
    /// Answer prompt for dense, hybrid and multi-query generation.
    pub standard: PromptTemplate,
    /// Markdown answer prompt used for HyDE generation.
    pub conversational: PromptTemplate,
    /// Prompt producing the hypothetical document HyDE embeds.
    pub hypothetical_document: PromptTemplate,
    /// Prompt producing query rewrites for multi-query retrieval.
    pub query_variants: PromptTemplate,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            standard: PromptTemplate::builtin("standard", STANDARD),
            conversational: PromptTemplate::builtin("conversational", CONVERSATIONAL),
            hypothetical_document: PromptTemplate::builtin(
                "hypothetical_document",
                HYPOTHETICAL_DOCUMENT,
            ),
            query_variants: PromptTemplate::builtin("query_variants", QUERY_VARIANTS),
        }
    }
}
