//! Construction of the remote model clients.
//!
//! The pair of clients is bundled in [`Models`] and handed explicitly to the pipeline and the
//! query engines; nothing is installed as a process-wide default.

use crate::config::Config;
use crate::embedding::{EmbeddingClient, MistralEmbeddingClient};
use crate::llm::{LlmClient, MistralLlmClient};
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while configuring the model clients.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The shared HTTP client could not be constructed.
    #[error("Failed to construct HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Generation and embedding clients used for one pipeline.
#[derive(Clone)]
pub struct Models {
    /// Text generation client.
    pub llm: Arc<dyn LlmClient>,
    /// Embedding client.
    pub embedder: Arc<dyn EmbeddingClient>,
}

impl Models {
    /// Bundle existing clients.
    pub fn new(llm: Arc<dyn LlmClient>, embedder: Arc<dyn EmbeddingClient>) -> Self {
        Self { llm, embedder }
    }

    /// Build Mistral clients from configuration, sharing one connection pool.
    pub fn from_config(config: &Config) -> Result<Self, ModelError> {
        let http = Client::builder()
            .user_agent(concat!("rusty-paper/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()?;

        tracing::info!(
            llm_model = %config.llm_model,
            embedding_model = %config.embedding_model,
            timeout_secs = config.request_timeout.as_secs(),
            "Model clients configured"
        );

        let llm = MistralLlmClient::new(
            http.clone(),
            config.api_base_url.clone(),
            config.api_key.clone(),
            config.llm_model.clone(),
        );
        let embedder = MistralEmbeddingClient::new(
            http,
            config.api_base_url.clone(),
            config.api_key.clone(),
            config.embedding_model.clone(),
        );

        Ok(Self::new(Arc::new(llm), Arc::new(embedder)))
    }
}
