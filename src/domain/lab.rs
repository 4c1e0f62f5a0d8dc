use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::prompts::{DEFAULT_TEST_NAME, DEFAULT_VALUE};

/// How the clinical data source is queried for a deployment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// One fixed diagnostic code across all patients.
    #[default]
    Code,
    /// Every result for the patient named in the request.
    Patient,
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "code" => Ok(QueryMode::Code),
            "patient" => Ok(QueryMode::Patient),
            other => Err(format!("unknown query mode '{other}' (expected code or patient)")),
        }
    }
}

/// A single Observation search against the clinical data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabQuery {
    Code(String),
    Patient(String),
}

impl LabQuery {
    /// Search parameter name and value for the Observation endpoint.
    pub fn search_param(&self) -> (&'static str, &str) {
        match self {
            LabQuery::Code(code) => ("code", code.as_str()),
            LabQuery::Patient(id) => ("patient", id.as_str()),
        }
    }

    pub fn is_patient_scoped(&self) -> bool {
        matches!(self, LabQuery::Patient(_))
    }
}

/// Result value: numbers keep their JSON representation, anything else is text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabValue {
    Number(serde_json::Number),
    Text(String),
}

impl LabValue {
    /// Convert a raw `valueQuantity.value`. `None` for absent or null values.
    pub fn from_json(value: Option<&Value>) -> Option<Self> {
        match value? {
            Value::Null => None,
            Value::Number(n) => Some(LabValue::Number(n.clone())),
            Value::String(s) => Some(LabValue::Text(s.clone())),
            other => Some(LabValue::Text(other.to_string())),
        }
    }

    pub fn missing() -> Self {
        LabValue::Text(DEFAULT_VALUE.to_string())
    }
}

impl fmt::Display for LabValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabValue::Number(n) => write!(f, "{n}"),
            LabValue::Text(s) => f.write_str(s),
        }
    }
}

/// Display-ready lab result returned by `/labs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabResult {
    pub test_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub value: LabValue,
    pub unit: String,
    pub status: String,
    #[serde(rename = "effectiveDateTime")]
    pub effective_date_time: String,
    pub summary: String,
}

impl Default for LabResult {
    fn default() -> Self {
        Self {
            test_name: DEFAULT_TEST_NAME.to_string(),
            code: None,
            value: LabValue::missing(),
            unit: String::new(),
            status: String::new(),
            effective_date_time: String::new(),
            summary: String::new(),
        }
    }
}

impl LabResult {
    pub fn with_summary(mut self, summary: String) -> Self {
        self.summary = summary;
        self
    }
}
