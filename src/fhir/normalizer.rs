use serde_json::Value;

use crate::domain::{LabResult, LabValue};
use crate::fhir::path::{self, text_at, text_or};
use crate::prompts::DEFAULT_TEST_NAME;

static EMPTY_RESOURCE: Value = Value::Null;

/// The Observation wrapped by a search-result entry. Entries without a
/// `resource` yield an empty observation.
pub fn entry_resource(entry: &Value) -> &Value {
    entry.get("resource").unwrap_or(&EMPTY_RESOURCE)
}

/// Flatten one raw Observation. Missing fields take their display defaults;
/// `summary` is left empty for the caller to fill.
pub fn normalize(observation: &Value) -> LabResult {
    LabResult {
        test_name: text_or(observation, path::TEST_NAME, DEFAULT_TEST_NAME),
        code: text_at(observation, path::TEST_CODE).map(str::to_string),
        value: LabValue::from_json(path::lookup(observation, path::VALUE))
            .unwrap_or_else(LabValue::missing),
        unit: text_or(observation, path::UNIT, ""),
        status: text_or(observation, path::STATUS, ""),
        effective_date_time: text_or(observation, path::EFFECTIVE_DATE_TIME, ""),
        summary: String::new(),
    }
}
