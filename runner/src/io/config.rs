//! Runner configuration loaded from `dorsz.toml`.
//!
//! Resolution order for every setting: CLI flag > environment > file > default.
//! The CLI layer applies flags on top of [`load_config`].

use std::env;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "dorsz.toml";

const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:1234/v1";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "Bielik-4.5B-v3.0-Instruct.Q8_0.gguf";

/// Chat-completions provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible local server (LM Studio, llama.cpp, vLLM).
    Local,
    /// Ollama's OpenAI-compatible endpoint.
    Ollama,
    /// Hosted OpenAI API.
    Openai,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Openai => "openai",
        }
    }
}

/// Endpoint settings for one provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Bearer token sent with requests; `None` sends no `Authorization` header.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Per-provider endpoints.
///
/// A partial `[providers.<name>]` table only replaces the keys it sets; the
/// rest keep that provider's defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "ProvidersTable")]
pub struct ProvidersConfig {
    pub local: ProviderConfig,
    pub ollama: ProviderConfig,
    pub openai: ProviderConfig,
}

/// `[providers.<name>]` as written in the file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProviderTable {
    base_url: Option<String>,
    api_key: Option<String>,
}

impl ProviderTable {
    fn over(self, defaults: ProviderConfig) -> ProviderConfig {
        ProviderConfig {
            base_url: self.base_url.unwrap_or(defaults.base_url),
            api_key: self.api_key.or(defaults.api_key),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProvidersTable {
    local: ProviderTable,
    ollama: ProviderTable,
    openai: ProviderTable,
}

impl From<ProvidersTable> for ProvidersConfig {
    fn from(table: ProvidersTable) -> Self {
        let defaults = ProvidersConfig::default();
        Self {
            local: table.local.over(defaults.local),
            ollama: table.ollama.over(defaults.ollama),
            openai: table.openai.over(defaults.openai),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        let local = ProviderConfig {
            base_url: DEFAULT_LOCAL_BASE_URL.to_string(),
            api_key: Some("EMPTY".to_string()),
        };
        Self {
            ollama: local.clone(),
            local,
            openai: ProviderConfig {
                base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
                api_key: None,
            },
        }
    }
}

/// Runner configuration (TOML).
///
/// Missing fields default to the values the CLI ships with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
    pub provider: ProviderKind,

    pub model: String,

    /// Upper bound on model requests per conversation.
    pub max_turns: u32,

    /// Capacity of the sliding conversation window.
    pub history_max_items: usize,

    /// Sampling temperature (ignored for reasoning models).
    pub temperature: f32,

    /// Output token cap per request (ignored for reasoning models).
    pub max_output_tokens: u32,

    /// Wall-clock budget for a whole conversation in seconds.
    pub conversation_timeout_secs: u64,

    /// Timeout for a single model request in seconds.
    pub request_timeout_secs: u64,

    pub providers: ProvidersConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Local,
            model: DEFAULT_MODEL.to_string(),
            max_turns: 50,
            history_max_items: 4,
            temperature: 0.1,
            max_output_tokens: 2048,
            conversation_timeout_secs: 60 * 60,
            request_timeout_secs: 5 * 60,
            providers: ProvidersConfig::default(),
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must be a non-empty string"));
        }
        if self.max_turns == 0 {
            return Err(anyhow!("max_turns must be > 0"));
        }
        if self.history_max_items == 0 {
            return Err(anyhow!("history_max_items must be > 0"));
        }
        if self.conversation_timeout_secs == 0 {
            return Err(anyhow!("conversation_timeout_secs must be > 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        for (name, provider) in [
            ("local", &self.providers.local),
            ("ollama", &self.providers.ollama),
            ("openai", &self.providers.openai),
        ] {
            if provider.base_url.trim().is_empty() {
                return Err(anyhow!("providers.{name}.base_url must be non-empty"));
            }
        }
        Ok(())
    }

    /// Endpoint for the selected provider.
    pub fn active_provider(&self) -> &ProviderConfig {
        match self.provider {
            ProviderKind::Local => &self.providers.local,
            ProviderKind::Ollama => &self.providers.ollama,
            ProviderKind::Openai => &self.providers.openai,
        }
    }

    pub fn active_provider_mut(&mut self) -> &mut ProviderConfig {
        match self.provider {
            ProviderKind::Local => &mut self.providers.local,
            ProviderKind::Ollama => &mut self.providers.ollama,
            ProviderKind::Openai => &mut self.providers.openai,
        }
    }

    pub fn history_capacity(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.history_max_items)
            .ok_or_else(|| anyhow!("history_max_items must be > 0"))
    }

    /// Reasoning models reject sampling and output-cap parameters.
    pub fn is_reasoning_model(&self) -> bool {
        self.model.starts_with("gpt-5")
    }

    pub fn effective_temperature(&self) -> Option<f32> {
        (!self.is_reasoning_model()).then_some(self.temperature)
    }

    pub fn effective_max_tokens(&self) -> Option<u32> {
        (!self.is_reasoning_model()).then_some(self.max_output_tokens)
    }

    /// Overlay environment variables on top of file values.
    pub fn apply_env(&mut self, vars: impl Fn(&str) -> Option<String>) {
        if let Some(model) = vars("MODEL").filter(|v| !v.trim().is_empty()) {
            self.model = model;
        }
        if let Some(url) = vars("LOCAL_BASE_URL") {
            self.providers.local.base_url = url.clone();
            self.providers.ollama.base_url = url;
        }
        if let Some(key) = vars("LOCAL_API_KEY") {
            self.providers.local.api_key = Some(key.clone());
            self.providers.ollama.api_key = Some(key);
        }
        if let Some(url) = vars("OPENAI_BASE_URL") {
            self.providers.openai.base_url = url;
        }
        if let Some(key) = vars("OPENAI_API_KEY") {
            self.providers.openai.api_key = Some(key);
        }
    }
}

/// Load config from a TOML file and overlay the process environment.
///
/// If the file is missing, starts from `RunnerConfig::default()`. The result
/// is not validated: callers apply CLI flags first, then call
/// [`RunnerConfig::validate`].
pub fn load_config(path: &Path) -> Result<RunnerConfig> {
    let mut cfg = read_config_file(path)?;
    cfg.apply_env(|name| env::var(name).ok());
    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<RunnerConfig> {
    if !path.exists() {
        return Ok(RunnerConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = read_config_file(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, RunnerConfig::default());
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("dorsz.toml");
        fs::write(
            &path,
            "provider = \"ollama\"\nmax_turns = 7\n\n[providers.ollama]\nbase_url = \"http://gpu:11434/v1\"\n",
        )
        .expect("write");

        let mut cfg = read_config_file(&path).expect("load");
        cfg.apply_env(no_env);
        assert_eq!(cfg.provider, ProviderKind::Ollama);
        assert_eq!(cfg.max_turns, 7);
        assert_eq!(cfg.history_max_items, 4);
        assert_eq!(cfg.active_provider().base_url, "http://gpu:11434/v1");
        assert_eq!(cfg.active_provider().api_key.as_deref(), Some("EMPTY"));
        assert_eq!(cfg.providers.local, ProvidersConfig::default().local);
    }

    #[test]
    fn provider_table_can_override_only_the_key() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("dorsz.toml");
        fs::write(&path, "[providers.openai]\napi_key = \"sk-file\"\n").expect("write");

        let cfg = read_config_file(&path).expect("load");
        assert_eq!(cfg.providers.openai.base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(cfg.providers.openai.api_key.as_deref(), Some("sk-file"));
    }

    #[test]
    fn load_config_leaves_validation_to_the_caller() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("dorsz.toml");
        fs::write(&path, "history_max_items = 0\n").expect("write");

        let mut cfg = load_config(&path).expect("load");
        assert!(cfg.validate().is_err());
        cfg.history_max_items = 4;
        cfg.validate().expect("fixed by override");
    }

    #[test]
    fn invalid_toml_reports_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("dorsz.toml");
        fs::write(&path, "max_turns = \"many\"").expect("write");
        let err = read_config_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("dorsz.toml"));
    }

    #[test]
    fn env_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            ("MODEL", "gpt-5-mini"),
            ("LOCAL_BASE_URL", "http://box:8080/v1"),
            ("OPENAI_API_KEY", "sk-test"),
        ]
        .into_iter()
        .collect();
        let mut cfg = RunnerConfig::default();
        cfg.apply_env(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(cfg.model, "gpt-5-mini");
        assert_eq!(cfg.providers.local.base_url, "http://box:8080/v1");
        assert_eq!(cfg.providers.ollama.base_url, "http://box:8080/v1");
        assert_eq!(cfg.providers.openai.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn reasoning_models_drop_sampling_settings() {
        let mut cfg = RunnerConfig::default();
        assert_eq!(cfg.effective_temperature(), Some(0.1));
        assert_eq!(cfg.effective_max_tokens(), Some(2048));

        cfg.model = "gpt-5".to_string();
        assert_eq!(cfg.effective_temperature(), None);
        assert_eq!(cfg.effective_max_tokens(), None);
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let cfg = RunnerConfig {
            history_max_items: 0,
            ..RunnerConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = RunnerConfig {
            max_turns: 0,
            ..RunnerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
