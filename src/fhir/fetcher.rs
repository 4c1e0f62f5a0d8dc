use serde_json::Value;
use std::time::Duration;

use crate::domain::LabQuery;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Clinical data source returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Failed to reach clinical data source: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Failed to parse clinical data response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Reads Observation search results from a FHIR server.
#[derive(Debug, Clone)]
pub struct LabFetcher {
    client: reqwest::Client,
    base_url: String,
    count: u32,
}

impl LabFetcher {
    pub fn new(base_url: impl Into<String>, count: u32) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, count)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, count: u32) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            count,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Most recent `count` entries for `query`. An absent `entry` array is
    /// an empty result, not an error.
    pub async fn fetch(&self, query: &LabQuery) -> Result<Vec<Value>, FetchError> {
        let (param, value) = query.search_param();
        let url = format!("{}/Observation", self.base_url);
        let count = self.count.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[(param, value), ("_count", count.as_str())])
            .header("Accept", "application/fhir+json")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let mut bundle: Value = serde_json::from_str(&body)?;
        let entries = match bundle.get_mut("entry").map(Value::take) {
            Some(Value::Array(entries)) => entries,
            _ => Vec::new(),
        };

        tracing::debug!(param, value, count = entries.len(), "fetched observations");
        Ok(entries)
    }

    /// Probe `{base}/metadata`; used by the health command.
    pub async fn check_metadata(&self) -> Result<(), FetchError> {
        let response = self
            .client
            .get(format!("{}/metadata", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(FetchError::Upstream {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}
