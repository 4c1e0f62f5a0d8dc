//! Optional-path access over semi-structured FHIR JSON.
//!
//! Every lookup walks a fixed list of steps and stops at the first missing
//! key, out-of-range index, or type mismatch. Callers pick the default.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Key(&'static str),
    Index(usize),
}

pub const TEST_NAME: &[Step] = &[
    Step::Key("code"),
    Step::Key("coding"),
    Step::Index(0),
    Step::Key("display"),
];
pub const TEST_CODE: &[Step] = &[
    Step::Key("code"),
    Step::Key("coding"),
    Step::Index(0),
    Step::Key("code"),
];
pub const VALUE: &[Step] = &[Step::Key("valueQuantity"), Step::Key("value")];
pub const UNIT: &[Step] = &[Step::Key("valueQuantity"), Step::Key("unit")];
pub const STATUS: &[Step] = &[Step::Key("status")];
pub const EFFECTIVE_DATE_TIME: &[Step] = &[Step::Key("effectiveDateTime")];

pub fn lookup<'v>(doc: &'v Value, path: &[Step]) -> Option<&'v Value> {
    path.iter().try_fold(doc, |current, step| match step {
        Step::Key(key) => current.as_object()?.get(*key),
        Step::Index(index) => current.as_array()?.get(*index),
    })
}

/// String at `path`, or `None` when absent or not a string.
pub fn text_at<'v>(doc: &'v Value, path: &[Step]) -> Option<&'v str> {
    lookup(doc, path).and_then(Value::as_str)
}

pub fn text_or(doc: &Value, path: &[Step], default: &str) -> String {
    text_at(doc, path).unwrap_or(default).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn walks_keys_and_indices() {
        let doc = json!({"code": {"coding": [{"display": "Glucose"}]}});
        assert_eq!(text_at(&doc, TEST_NAME), Some("Glucose"));
    }

    #[test]
    fn stops_at_empty_coding_list() {
        let doc = json!({"code": {"coding": []}});
        assert_eq!(lookup(&doc, TEST_NAME), None);
    }

    #[test]
    fn stops_on_type_mismatch() {
        let doc = json!({"code": "2339-0", "valueQuantity": [1, 2]});
        assert_eq!(lookup(&doc, TEST_CODE), None);
        assert_eq!(lookup(&doc, VALUE), None);
        assert_eq!(text_or(&doc, UNIT, ""), "");
    }

    #[test]
    fn non_string_leaf_falls_back() {
        let doc = json!({"status": 7});
        assert_eq!(text_or(&doc, STATUS, "fallback"), "fallback");
    }
}
