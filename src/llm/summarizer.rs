use serde_json::Value;
use std::sync::Arc;

use crate::domain::LabValue;
use crate::infra::error_chain;
use crate::fhir::path::{self, text_at};
use crate::llm::{GenerationError, TextCompletion};
use crate::prompts::{self, DEFAULT_PROMPT_TEMPLATE, DEFAULT_TEST_NAME, SUMMARY_ERROR_PREFIX};

/// Asks a text-completion backend to explain one observation.
#[derive(Clone)]
pub struct LabSummarizer {
    backend: Arc<dyn TextCompletion>,
    template: String,
}

impl LabSummarizer {
    pub fn new(backend: Arc<dyn TextCompletion>) -> Self {
        Self {
            backend,
            template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn build_prompt(&self, observation: &Value) -> String {
        let test_name = text_at(observation, path::TEST_NAME).unwrap_or(DEFAULT_TEST_NAME);
        // A missing value reads as nothing in the prompt, not "N/A"
        let value = LabValue::from_json(path::lookup(observation, path::VALUE))
            .map(|v| v.to_string())
            .unwrap_or_default();
        let unit = text_at(observation, path::UNIT).unwrap_or("");

        prompts::render_prompt(&self.template, test_name, &value, unit)
    }

    pub async fn summarize(&self, observation: &Value) -> Result<String, GenerationError> {
        let prompt = self.build_prompt(observation);
        self.backend.complete(&prompt).await
    }
}

/// Display text for a summary that could not be generated, causes included.
pub fn degraded_summary(err: &GenerationError) -> String {
    format!("{SUMMARY_ERROR_PREFIX}{}", error_chain(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextCompletion for RecordingBackend {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("explained".to_string())
        }
    }

    struct DownBackend;

    #[async_trait]
    impl TextCompletion for DownBackend {
        fn name(&self) -> &'static str {
            "down"
        }

        async fn complete(&self, _prompt: &str) -> Result<String, GenerationError> {
            Err(GenerationError::PipelineLoad("connection refused".to_string()))
        }
    }

    #[test]
    fn prompt_embeds_name_value_and_unit() {
        let summarizer = LabSummarizer::new(Arc::new(RecordingBackend::default()));
        let obs = json!({
            "code": {"coding": [{"display": "Hemoglobin A1c"}]},
            "valueQuantity": {"value": 6.1, "unit": "%"}
        });
        assert_eq!(
            summarizer.build_prompt(&obs),
            "Explain in plain language what it means if Hemoglobin A1c is 6.1%."
        );
    }

    #[test]
    fn prompt_tolerates_empty_observation() {
        let summarizer = LabSummarizer::new(Arc::new(RecordingBackend::default()));
        let prompt = summarizer.build_prompt(&json!({}));
        assert_eq!(
            prompt,
            "Explain in plain language what it means if Unknown test is ."
        );
        assert_eq!(prompt, summarizer.build_prompt(&json!({})));
    }

    #[test]
    fn custom_template_is_used() {
        let summarizer = LabSummarizer::new(Arc::new(RecordingBackend::default()))
            .with_template("{test_name}={value} {unit}");
        let obs = json!({"code": {"coding": [{"display": "LDL"}]}, "valueQuantity": {"value": 130, "unit": "mg/dL"}});
        assert_eq!(summarizer.build_prompt(&obs), "LDL=130 mg/dL");
    }

    #[tokio::test]
    async fn summarize_sends_prompt_to_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let summarizer = LabSummarizer::new(backend.clone());
        let text = summarizer.summarize(&json!({})).await.unwrap();
        assert_eq!(text, "explained");
        assert_eq!(backend.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failures_render_with_error_prefix() {
        let summarizer = LabSummarizer::new(Arc::new(DownBackend));
        let err = summarizer.summarize(&json!({})).await.unwrap_err();
        let text = degraded_summary(&err);
        assert!(text.starts_with("Error generating summary:"));
        assert!(text.contains("connection refused"));
    }

    #[tokio::test]
    async fn transport_failure_names_underlying_cause() {
        // Nothing listens on the discard port
        let backend =
            crate::llm::InferenceBackend::new(reqwest::Client::new(), "http://127.0.0.1:9", 80);
        let summarizer = LabSummarizer::new(Arc::new(backend));
        let err = summarizer.summarize(&json!({})).await.unwrap_err();
        let text = degraded_summary(&err);
        assert!(text.starts_with("Error generating summary: request failed: error sending"));
        assert!(text.to_lowercase().contains("connect"), "{text}");
    }
}
