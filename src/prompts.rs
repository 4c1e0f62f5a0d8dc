//! All user-facing strings and prompts for LabSense
//!
//! This module centralizes all text constants for easy maintenance and localization

// Summary prompts
pub const DEFAULT_PROMPT_TEMPLATE: &str =
    "Explain in plain language what it means if {test_name} is {value}{unit}.";
pub const CHAT_SYSTEM_PROMPT: &str =
    "You explain lab results to a patient in plain, accurate, kind language.";
pub const SUMMARY_ERROR_PREFIX: &str = "Error generating summary: ";

// Observation defaults
pub const DEFAULT_TEST_NAME: &str = "Unknown test";
pub const DEFAULT_VALUE: &str = "N/A";

// API Messages
pub const ERROR_MISSING_PATIENT_ID: &str = "Missing required query parameter: patient_id";
pub const ERROR_NO_LAB_RESULTS: &str = "No lab results found.";
pub const ERROR_INTERNAL: &str = "Internal server error";

pub fn no_results_for_patient(patient_id: &str) -> String {
    format!("No lab results found for patient {patient_id}.")
}

// Health Check Messages
pub const MSG_HEALTH_CHECK: &str = "🏥 Checking LabSense health...";
pub const MSG_CONFIG_OK: &str = "✓ Configuration loaded";
pub const MSG_CONFIG_ERROR: &str = "Config error";
pub const MSG_FHIR_OK: &str = "✓ Clinical data source reachable";
pub const MSG_FHIR_ERROR: &str = "Clinical data source unreachable";
pub const MSG_BACKEND_HEADER: &str = "\nSummary backend:";
pub const MSG_ALL_SYSTEMS_OK: &str = "\n✅ All systems operational!";
pub const MSG_ISSUES_DETECTED: &str = "\n⚠️ Some issues detected";

// Init Messages
pub const MSG_CONFIG_CREATED: &str = "✓ Configuration created";
pub const MSG_CONFIG_EXISTS: &str = "Configuration already exists";

// Configuration File Content
pub const DEFAULT_CONFIG_CONTENT: &str = r#"# LabSense Configuration
# Environment variables (LABSENSE_*) override these values.

bind: "127.0.0.1:5000"

fhir:
  base_url: "https://hapi.fhir.org/baseR4"
  mode: code          # code | patient
  code: "2339-0"      # Glucose [mg/dL], used in code mode
  count: 3

backend: inference    # inference | chat | local
max_tokens: 80

inference:
  url: "https://router.huggingface.co/hf-inference"
  timeout_secs: 60

chat:
  model: "gpt-4o-mini"

local:
  url: "http://localhost:11434"
  model: "llama3.2"
"#;

/// Render the summary prompt for one observation.
pub fn render_prompt(template: &str, test_name: &str, value: &str, unit: &str) -> String {
    template
        .replace("{test_name}", test_name)
        .replace("{value}", value)
        .replace("{unit}", unit)
}
