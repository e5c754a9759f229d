//! Prompt rendering for retrieval-augmented answers.

use crate::error::{RagError, Result};

const CONTEXT_PLACEHOLDER: &str = "{context}";
const QUESTION_PLACEHOLDER: &str = "{question}";

/// The default instruction sent with the retrieved context.
///
/// Retrieval only surfaces the top-K chunks, so the model is told to cover
/// every concept it was given rather than summarize selectively.
pub const DEFAULT_TEMPLATE: &str = "Based on the following context, list and briefly describe all key \
concepts. Ensure you include every concept without omitting any: {context}\n\nQuestion: {question}";

/// A prompt template with a required `{context}` and optional `{question}` slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Create a template.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the template has no `{context}` placeholder.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(CONTEXT_PLACEHOLDER) {
            return Err(RagError::Config(format!(
                "prompt template must contain a {CONTEXT_PLACEHOLDER} placeholder"
            )));
        }
        Ok(Self { template })
    }

    /// The raw template text.
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Substitute the retrieved context and the question.
    ///
    /// Single pass over the template: placeholder-like text inside the
    /// substituted values is never expanded again.
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context.len() + question.len());
        let mut rest = self.template.as_str();

        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some(after) = tail.strip_prefix(CONTEXT_PLACEHOLDER) {
                out.push_str(context);
                rest = after;
            } else if let Some(after) = tail.strip_prefix(QUESTION_PLACEHOLDER) {
                out.push_str(question);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self { template: DEFAULT_TEMPLATE.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_demands_completeness() {
        let prompt = PromptTemplate::default().render("alpha\n\nbeta", "What is total cost?");
        assert!(prompt.contains("without omitting any: alpha\n\nbeta"));
        assert!(prompt.ends_with("Question: What is total cost?"));
    }

    #[test]
    fn requires_context_placeholder() {
        assert!(matches!(PromptTemplate::new("Answer: {question}"), Err(RagError::Config(_))));
    }

    #[test]
    fn substituted_values_are_not_re_expanded() {
        let template = PromptTemplate::new("{question} | {context} | {other}").unwrap();
        assert_eq!(template.render("ctx {question}", "q {context}"), "q {context} | ctx {question} | {other}");
    }

    #[test]
    fn empty_context_still_renders() {
        let template = PromptTemplate::new("Context: [{context}]").unwrap();
        assert_eq!(template.render("", "q"), "Context: []");
    }
}
