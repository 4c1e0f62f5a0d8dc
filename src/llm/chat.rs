use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::infra::config::ChatConfig;
use crate::llm::{GenerationError, TextCompletion};
use crate::prompts::CHAT_SYSTEM_PROMPT;

/// Chat-completion API (OpenAI wire format).
#[derive(Debug, Clone)]
pub struct ChatBackend {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl ChatBackend {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &ChatConfig, max_tokens: u32) -> Result<Self> {
        let api_key = config
            .bearer_token()
            .context("Chat backend requires LABSENSE_CHAT_API_KEY")?
            .to_string();
        Ok(Self::new(
            client,
            config.url.clone(),
            api_key,
            config.model.clone(),
            max_tokens,
        ))
    }
}

#[async_trait]
impl TextCompletion for ChatBackend {
    fn name(&self) -> &'static str {
        "chat"
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: CHAT_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .timeout(Duration::from_secs(60))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            // Friendlier messages for the common failures
            let body = match status.as_u16() {
                401 => "Invalid API key. Please check LABSENSE_CHAT_API_KEY".to_string(),
                429 => "Rate limit exceeded. Please try again later".to_string(),
                _ => error_text,
            };

            return Err(GenerationError::Status {
                backend: self.name(),
                status: status.as_u16(),
                body,
            });
        }

        let chat_response: ChatResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(url: String) -> ChatBackend {
        ChatBackend::new(reqwest::Client::new(), url, "sk-test", "gpt-4o-mini", 80)
    }

    #[tokio::test]
    async fn sends_system_and_user_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 80,
                "messages": [
                    {"role": "system", "content": CHAT_SYSTEM_PROMPT},
                    {"role": "user", "content": "Explain glucose"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  Your sugar is fine.\n"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = backend(server.uri()).complete("Explain glucose").await.unwrap();
        assert_eq!(text, "Your sugar is fine.");
    }

    #[tokio::test]
    async fn no_choices_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = backend(server.uri()).complete("p").await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
            .mount(&server)
            .await;

        let err = backend(server.uri()).complete("p").await.unwrap_err();
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = ChatConfig::default();
        assert!(ChatBackend::from_config(reqwest::Client::new(), &config, 80).is_err());

        let config = ChatConfig {
            api_key: Some(String::new()),
            ..ChatConfig::default()
        };
        assert!(ChatBackend::from_config(reqwest::Client::new(), &config, 80).is_err());
    }
}
