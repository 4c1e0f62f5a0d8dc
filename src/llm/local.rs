//! Local generation pipeline.
//!
//! The pipeline is loaded on first use and kept for the life of the process.
//! Concurrent first calls wait on the same initialization; a failed load
//! leaves the cell empty so the next request retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::infra::config::LocalConfig;
use crate::llm::{GenerationError, TextCompletion};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSequence {
    pub generated_text: String,
}

/// A loaded model able to generate text.
#[async_trait]
pub trait GenerationPipeline: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        max_length: u32,
    ) -> Result<Vec<GeneratedSequence>, GenerationError>;
}

/// Performs the expensive model load.
#[async_trait]
pub trait PipelineLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn GenerationPipeline>, GenerationError>;
}

pub struct LocalPipelineBackend {
    loader: Box<dyn PipelineLoader>,
    pipeline: OnceCell<Arc<dyn GenerationPipeline>>,
    max_length: u32,
}

impl LocalPipelineBackend {
    pub fn new(loader: Box<dyn PipelineLoader>, max_length: u32) -> Self {
        Self {
            loader,
            pipeline: OnceCell::new(),
            max_length,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.pipeline.initialized()
    }

    async fn pipeline(&self) -> Result<&Arc<dyn GenerationPipeline>, GenerationError> {
        self.pipeline
            .get_or_try_init(|| async {
                tracing::info!("loading local generation pipeline");
                self.loader.load().await
            })
            .await
    }
}

#[async_trait]
impl TextCompletion for LocalPipelineBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let pipeline = self.pipeline().await?;
        pipeline
            .generate(prompt, self.max_length)
            .await?
            .into_iter()
            .next()
            .map(|sequence| sequence.generated_text)
            .ok_or(GenerationError::EmptyResponse)
    }
}

/// Loads a model into a local Ollama server.
pub struct OllamaLoader {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl OllamaLoader {
    pub fn new(client: reqwest::Client, config: &LocalConfig) -> Self {
        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl PipelineLoader for OllamaLoader {
    async fn load(&self) -> Result<Arc<dyn GenerationPipeline>, GenerationError> {
        // An empty prompt makes Ollama load the model without generating
        let request = OllamaGenerateRequest {
            model: &self.model,
            prompt: "",
            stream: false,
            options: None,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::PipelineLoad(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::PipelineLoad(format!(
                "model {} failed to load ({status}): {body}",
                self.model
            )));
        }

        Ok(Arc::new(OllamaPipeline {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
        }))
    }
}

struct OllamaPipeline {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[async_trait]
impl GenerationPipeline for OllamaPipeline {
    async fn generate(
        &self,
        prompt: &str,
        max_length: u32,
    ) -> Result<Vec<GeneratedSequence>, GenerationError> {
        let request = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: Some(OllamaOptions {
                num_predict: max_length,
            }),
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(GenerationError::Status {
                backend: "local",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: OllamaGenerateResponse = response.json().await?;
        Ok(vec![GeneratedSequence {
            generated_text: body.response,
        }])
    }
}
