use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::infra::config::InferenceConfig;
use crate::llm::{GenerationError, TextCompletion};

/// Generic text-generation endpoint (Hugging Face inference style).
#[derive(Debug, Clone)]
pub struct InferenceBackend {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
    max_new_tokens: u32,
    timeout: Duration,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
}

impl InferenceBackend {
    pub fn new(client: reqwest::Client, url: impl Into<String>, max_new_tokens: u32) -> Self {
        Self {
            client,
            url: url.into(),
            headers: HeaderMap::new(),
            max_new_tokens,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(
        client: reqwest::Client,
        config: &InferenceConfig,
        max_new_tokens: u32,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid inference header name: {name}"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for inference header {name}"))?;
            headers.insert(name, value);
        }
        if let Some(key) = config.bearer_token() {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .context("Invalid inference API key")?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(Self {
            headers,
            timeout: Duration::from_secs(config.timeout_secs),
            ..Self::new(client, config.url.clone(), max_new_tokens)
        })
    }
}

#[async_trait]
impl TextCompletion for InferenceBackend {
    fn name(&self) -> &'static str {
        "inference"
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                max_new_tokens: self.max_new_tokens,
            },
        };

        let response = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Error payloads often arrive with a non-2xx status, so parse first
        let payload: Value = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(_) if !status.is_success() => {
                return Err(GenerationError::Status {
                    backend: self.name(),
                    status: status.as_u16(),
                    body,
                })
            }
            Err(e) => return Err(e.into()),
        };

        interpret_payload(payload)
    }
}

/// Map the shapes inference endpoints return onto summary text.
///
/// - `[{"generated_text": ...}, ...]` yields the first generated text
/// - `{"error": ...}` is a model-side failure
/// - anything else is passed through as its JSON text
pub fn interpret_payload(payload: Value) -> Result<String, GenerationError> {
    match &payload {
        Value::Array(items) => {
            let first = items.first().ok_or(GenerationError::EmptyResponse)?;
            match first.get("generated_text") {
                Some(Value::String(text)) => Ok(text.clone()),
                Some(other) => Ok(other.to_string()),
                None => Ok(payload.to_string()),
            }
        }
        Value::Object(map) if map.contains_key("error") => {
            let message = match &map["error"] {
                Value::String(message) => message.clone(),
                other => other.to_string(),
            };
            Err(GenerationError::Model(message))
        }
        _ => Ok(payload.to_string()),
    }
}
