use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::domain::QueryMode;
use crate::prompts::{DEFAULT_CONFIG_CONTENT, DEFAULT_PROMPT_TEMPLATE};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("FHIR base URL must not be empty")]
    EmptyFhirBase,
    #[error("Result count must be a positive integer")]
    ZeroCount,
    #[error("Chat backend selected but no API key configured (set LABSENSE_CHAT_API_KEY)")]
    MissingChatKey,
    #[error("Prompt template must not be empty")]
    EmptyTemplate,
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Inference,
    Chat,
    Local,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inference" => Ok(BackendKind::Inference),
            "chat" => Ok(BackendKind::Chat),
            "local" => Ok(BackendKind::Local),
            other => Err(format!(
                "unknown backend '{other}' (expected inference, chat or local)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FhirConfig {
    pub base_url: String,
    pub mode: QueryMode,
    pub code: String,
    pub count: u32,
}

impl Default for FhirConfig {
    fn default() -> Self {
        Self {
            base_url: "https://hapi.fhir.org/baseR4".to_string(),
            mode: QueryMode::Code,
            code: "2339-0".to_string(),
            count: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InferenceConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: "https://router.huggingface.co/hf-inference".to_string(),
            api_key: None,
            headers: BTreeMap::new(),
            timeout_secs: 60,
        }
    }
}

impl InferenceConfig {
    /// The API key, unless unset or blank.
    pub fn bearer_token(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            url: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
        }
    }
}

impl ChatConfig {
    /// The API key, unless unset or blank.
    pub fn bearer_token(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocalConfig {
    pub url: String,
    pub model: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub bind: String,
    pub fhir: FhirConfig,
    pub backend: BackendKind,
    pub inference: InferenceConfig,
    pub chat: ChatConfig,
    pub local: LocalConfig,
    pub max_tokens: u32,
    pub prompt_template: String,
    /// Put error messages in 500 response bodies. Details are always logged.
    pub expose_error_details: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            fhir: FhirConfig::default(),
            backend: BackendKind::default(),
            inference: InferenceConfig::default(),
            chat: ChatConfig::default(),
            local: LocalConfig::default(),
            max_tokens: 80,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            expose_error_details: true,
        }
    }
}

impl AppConfig {
    /// Apply `LABSENSE_*` overrides read through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LABSENSE_BIND") {
            self.bind = v;
        }
        if let Some(v) = lookup("LABSENSE_FHIR_BASE") {
            self.fhir.base_url = v;
        }
        if let Some(v) = lookup("LABSENSE_QUERY_MODE") {
            self.fhir.mode = parse_value("LABSENSE_QUERY_MODE", &v)?;
        }
        if let Some(v) = lookup("LABSENSE_LAB_CODE") {
            self.fhir.code = v;
        }
        if let Some(v) = lookup("LABSENSE_RESULT_COUNT") {
            self.fhir.count = parse_value("LABSENSE_RESULT_COUNT", &v)?;
        }
        if let Some(v) = lookup("LABSENSE_BACKEND") {
            self.backend = parse_value("LABSENSE_BACKEND", &v)?;
        }
        if let Some(v) = lookup("LABSENSE_INFERENCE_URL") {
            self.inference.url = v;
        }
        if let Some(v) = lookup("LABSENSE_INFERENCE_API_KEY") {
            self.inference.api_key = non_blank(Some(&v)).map(str::to_string);
        }
        if let Some(v) = lookup("LABSENSE_CHAT_URL") {
            self.chat.url = v;
        }
        if let Some(v) = lookup("LABSENSE_CHAT_API_KEY") {
            self.chat.api_key = non_blank(Some(&v)).map(str::to_string);
        }
        if let Some(v) = lookup("LABSENSE_CHAT_MODEL") {
            self.chat.model = v;
        }
        if let Some(v) = lookup("LABSENSE_LOCAL_URL") {
            self.local.url = v;
        }
        if let Some(v) = lookup("LABSENSE_LOCAL_MODEL") {
            self.local.model = v;
        }
        if let Some(v) = lookup("LABSENSE_MAX_TOKENS") {
            self.max_tokens = parse_value("LABSENSE_MAX_TOKENS", &v)?;
        }
        if let Some(v) = lookup("LABSENSE_EXPOSE_ERRORS") {
            self.expose_error_details = parse_bool("LABSENSE_EXPOSE_ERRORS", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fhir.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyFhirBase);
        }
        if self.fhir.count == 0 {
            return Err(ConfigError::ZeroCount);
        }
        if self.backend == BackendKind::Chat && self.chat.bearer_token().is_none() {
            return Err(ConfigError::MissingChatKey);
        }
        if self.prompt_template.trim().is_empty() {
            return Err(ConfigError::EmptyTemplate);
        }
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

pub struct ConfigManager {
    path: PathBuf,
    config: AppConfig,
}

impl ConfigManager {
    pub const CONFIG_FILE: &'static str = ".labsense.yml";

    /// Load from `path`, or `.labsense.yml` in the working directory.
    /// A missing file means defaults.
    pub fn new(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(Self::CONFIG_FILE));
        let config = Self::load_config(&path)?;

        Ok(Self { path, config })
    }

    fn load_config(path: &Path) -> Result<AppConfig> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: AppConfig = serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            Ok(AppConfig::default())
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File configuration with environment overrides applied, validated.
    pub fn get(&self) -> Result<AppConfig> {
        let mut config = self.config.clone();
        config.apply_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file. Returns false if one already exists.
    pub fn create_default(path: impl AsRef<Path>) -> Result<bool> {
        let config_path = path.as_ref();

        if config_path.exists() {
            return Ok(false);
        }

        std::fs::write(config_path, DEFAULT_CONFIG_CONTENT)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_fixed_glucose_query() {
        let config = AppConfig::default();
        assert_eq!(config.fhir.mode, QueryMode::Code);
        assert_eq!(config.fhir.code.as_str(), "2339-0");
        assert_eq!(config.fhir.count, 3);
        assert_eq!(config.backend, BackendKind::Inference);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = AppConfig::default();
        config
            .apply_env_from(env(&[
                ("LABSENSE_QUERY_MODE", "patient"),
                ("LABSENSE_RESULT_COUNT", "20"),
                ("LABSENSE_BACKEND", "chat"),
                ("LABSENSE_CHAT_API_KEY", "sk-test"),
                ("LABSENSE_EXPOSE_ERRORS", "false"),
            ]))
            .unwrap();

        assert_eq!(config.fhir.mode, QueryMode::Patient);
        assert_eq!(config.fhir.count, 20);
        assert_eq!(config.backend, BackendKind::Chat);
        assert_eq!(config.chat.api_key.as_deref(), Some("sk-test"));
        assert!(!config.expose_error_details);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_env_value_is_reported() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_from(env(&[("LABSENSE_RESULT_COUNT", "many")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "LABSENSE_RESULT_COUNT",
                ..
            }
        ));
    }

    #[test]
    fn validation_rejects_bad_settings() {
        let mut config = AppConfig::default();
        config.fhir.count = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroCount));

        let mut config = AppConfig::default();
        config.backend = BackendKind::Chat;
        assert_eq!(config.validate(), Err(ConfigError::MissingChatKey));

        let mut config = AppConfig::default();
        config.fhir.base_url = "  ".to_string();
        assert_eq!(config.validate(), Err(ConfigError::EmptyFhirBase));
    }

    #[test]
    fn blank_api_keys_count_as_missing() {
        let mut config = AppConfig::default();
        config.inference.api_key = Some("hf_from_file".to_string());
        config
            .apply_env_from(env(&[
                ("LABSENSE_BACKEND", "chat"),
                ("LABSENSE_CHAT_API_KEY", ""),
                ("LABSENSE_INFERENCE_API_KEY", "   "),
            ]))
            .unwrap();

        assert_eq!(config.chat.api_key, None);
        assert_eq!(config.inference.api_key, None);
        assert_eq!(config.validate(), Err(ConfigError::MissingChatKey));

        let mut config = AppConfig::default();
        config.backend = BackendKind::Chat;
        config.chat.api_key = Some(" ".to_string());
        assert_eq!(config.chat.bearer_token(), None);
        assert_eq!(config.validate(), Err(ConfigError::MissingChatKey));
    }

    #[test]
    fn loads_partial_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ConfigManager::CONFIG_FILE);
        std::fs::write(
            &path,
            "fhir:\n  mode: patient\n  count: 10\ninference:\n  headers:\n    x-wait-for-model: \"true\"\n",
        )
        .unwrap();

        let manager = ConfigManager::new(Some(&path)).unwrap();
        assert_eq!(manager.config.fhir.mode, QueryMode::Patient);
        assert_eq!(manager.config.fhir.count, 10);
        assert_eq!(manager.config.fhir.code.as_str(), "2339-0");
        assert_eq!(
            manager.config.inference.headers.get("x-wait-for-model").map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::new(Some(&dir.path().join("absent.yml"))).unwrap();
        assert_eq!(manager.config, AppConfig::default());
    }

    #[test]
    fn create_default_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ConfigManager::CONFIG_FILE);
        assert!(ConfigManager::create_default(&path).unwrap());
        assert!(!ConfigManager::create_default(&path).unwrap());

        let manager = ConfigManager::new(Some(&path)).unwrap();
        assert_eq!(manager.config, AppConfig::default());
    }
}
