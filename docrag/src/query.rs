//! Retrieval-augmented question answering.
//!
//! The [`QueryPipeline`] embeds a question, fetches the `top_k` nearest
//! chunks from the [`VectorIndex`], renders them into a [`PromptTemplate`]
//! as context, and asks the [`LanguageModel`] for the answer.
//!
//! A failure at any stage is returned as [`RagError::Query`] naming the
//! stage (`embed`, `retrieve` or `generate`).
//!
//! When retrieval returns no matches the model is still called, with an
//! empty context. The answer is then a low-confidence one (typically "no
//! information found"); this is logged at `warn` level rather than treated
//! as an error.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::RagConfig;
use crate::document::{QueryResult, ScoredChunk};
use crate::embedding::EmbeddingProvider;
use crate::error::{QueryStage, RagError, Result};
use crate::llm::LanguageModel;
use crate::prompt::PromptTemplate;
use crate::vectorstore::VectorIndex;

/// Separator placed between retrieved chunk texts in the prompt context.
const CONTEXT_SEPARATOR: &str = "\n\n";

/// The query pipeline. Construct one via [`QueryPipeline::builder()`].
pub struct QueryPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_index: Arc<dyn VectorIndex>,
    language_model: Arc<dyn LanguageModel>,
    prompt: PromptTemplate,
}

impl QueryPipeline {
    /// Create a new [`QueryPipelineBuilder`].
    pub fn builder() -> QueryPipelineBuilder {
        QueryPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Answer `question` using the configured `top_k`.
    ///
    /// # Errors
    ///
    /// See [`QueryPipeline::query`].
    pub async fn ask(&self, question: &str) -> Result<QueryResult> {
        self.query(question, self.config.top_k).await
    }

    /// Answer `question` from the `top_k` most similar chunks.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Query`] with the failed [`QueryStage`] if the
    /// question cannot be embedded, the index cannot be searched, or the
    /// language model call fails.
    pub async fn query(&self, question: &str, top_k: usize) -> Result<QueryResult> {
        let vector = self.embedding_provider.embed(question).await.map_err(|e| {
            warn!(error = %e, "query embedding failed");
            e.at_stage(QueryStage::Embed)
        })?;

        let index_name = self.config.index_name.as_str();
        let matches = self.vector_index.query(index_name, &vector, top_k).await.map_err(|e| {
            warn!(index = index_name, error = %e, "retrieval failed");
            e.at_stage(QueryStage::Retrieve)
        })?;

        if matches.is_empty() {
            warn!(index = index_name, top_k, "no matching chunks; answering with empty context");
        }

        let prompt = self.prompt.render(&render_context(&matches), question);
        let answer = self.language_model.complete(&prompt).await.map_err(|e| {
            warn!(model = self.language_model.name(), error = %e, "generation failed");
            e.at_stage(QueryStage::Generate)
        })?;

        info!(matches = matches.len(), answer_len = answer.len(), "query completed");

        Ok(QueryResult { question: question.to_string(), matches, answer })
    }
}

/// Join retrieved chunk texts, best match first.
fn render_context(matches: &[ScoredChunk]) -> String {
    matches.iter().map(|m| m.chunk.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}

/// Builder for constructing a [`QueryPipeline`].
///
/// All fields except `prompt` are required; the prompt defaults to
/// [`PromptTemplate::default`].
#[derive(Default)]
pub struct QueryPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_index: Option<Arc<dyn VectorIndex>>,
    language_model: Option<Arc<dyn LanguageModel>>,
    prompt: Option<PromptTemplate>,
}

impl QueryPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider. It must match the one used for ingestion.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector index to search.
    pub fn vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.vector_index = Some(index);
        self
    }

    /// Set the language model that writes the answer.
    pub fn language_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.language_model = Some(model);
        self
    }

    /// Override the prompt template.
    pub fn prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Build the [`QueryPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any required field is missing.
    pub fn build(self) -> Result<QueryPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::Config("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_index = self
            .vector_index
            .ok_or_else(|| RagError::Config("vector_index is required".to_string()))?;
        let language_model = self
            .language_model
            .ok_or_else(|| RagError::Config("language_model is required".to_string()))?;

        Ok(QueryPipeline {
            config,
            embedding_provider,
            vector_index,
            language_model,
            prompt: self.prompt.unwrap_or_default(),
        })
    }
}
