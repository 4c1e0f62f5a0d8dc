pub mod chat;
pub mod inference;
pub mod local;
pub mod summarizer;

use async_trait::async_trait;
use std::sync::Arc;

use crate::infra::config::{AppConfig, BackendKind};

pub use chat::ChatBackend;
pub use inference::InferenceBackend;
pub use local::{GenerationPipeline, LocalPipelineBackend, OllamaLoader, PipelineLoader};
pub use summarizer::{degraded_summary, LabSummarizer};

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{backend} returned {status}: {body}")]
    Status {
        backend: &'static str,
        status: u16,
        body: String,
    },
    #[error("Model error: {0}")]
    Model(String),
    #[error("No text in model response")]
    EmptyResponse,
    #[error("Failed to parse model response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Failed to load generation pipeline: {0}")]
    PipelineLoad(String),
}

/// A text-generation backend able to answer one prompt.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Short backend name for logs and the health command
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Build the backend selected by `config.backend`.
pub fn build_backend(config: &AppConfig) -> anyhow::Result<Arc<dyn TextCompletion>> {
    let client = reqwest::Client::new();
    let backend: Arc<dyn TextCompletion> = match config.backend {
        BackendKind::Inference => Arc::new(InferenceBackend::from_config(
            client,
            &config.inference,
            config.max_tokens,
        )?),
        BackendKind::Chat => Arc::new(ChatBackend::from_config(
            client,
            &config.chat,
            config.max_tokens,
        )?),
        BackendKind::Local => Arc::new(LocalPipelineBackend::new(
            Box::new(OllamaLoader::new(client, &config.local)),
            config.max_tokens,
        )),
    };
    Ok(backend)
}
