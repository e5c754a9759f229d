//! Language model gateway trait.

use async_trait::async_trait;

use crate::error::Result;

/// A language model that completes a rendered prompt.
///
/// Failures (rate limit, timeout, content policy) are reported as
/// [`RagError::Llm`](crate::RagError::Llm); the query pipeline does not retry.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// The model name, used in logs and error messages.
    fn name(&self) -> &str;

    /// Produce the model's textual answer for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
