use anyhow::Result;
use std::sync::Arc;

use crate::domain::QueryMode;
use crate::fhir::LabFetcher;
use crate::infra::AppConfig;
use crate::llm::{self, LabSummarizer};

/// Shared, read-only request context.
pub struct AppState {
    pub fetcher: LabFetcher,
    pub summarizer: LabSummarizer,
    pub mode: QueryMode,
    pub lab_code: String,
    pub expose_error_details: bool,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Arc<Self>> {
        let backend = llm::build_backend(config)?;
        let summarizer =
            LabSummarizer::new(backend).with_template(config.prompt_template.clone());

        Ok(Arc::new(Self {
            fetcher: LabFetcher::new(config.fhir.base_url.clone(), config.fhir.count),
            summarizer,
            mode: config.fhir.mode,
            lab_code: config.fhir.code.clone(),
            expose_error_details: config.expose_error_details,
        }))
    }
}
