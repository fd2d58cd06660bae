//! Configuration loading, validation, and management for CodiCode.
//!
//! Loads configuration from `~/.codicode/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use codicode_core::SamplingParams;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.codicode/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language-model backend
    #[serde(default)]
    pub llm: LlmConfig,

    /// Agent loop budgets and display
    #[serde(default)]
    pub agent: AgentConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend kind; only "ollama" ships today
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Temperature (0.0 = deterministic, 2.0 = very creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// HTTP timeout for a single backend request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "codellama:7b".into()
}
fn default_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_request_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl LlmConfig {
    /// Sampling options to send with every request.
    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// `[agent]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Iterations allowed before a run is declared incomplete
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Failed tool dispatches allowed before a run is aborted
    #[serde(default = "default_max_tool_errors")]
    pub max_tool_errors: u32,

    /// Ask the backend for incremental fragments
    #[serde(default)]
    pub stream: bool,

    /// Default the log filter to `debug`
    #[serde(default)]
    pub verbose: bool,
}

fn default_max_steps() -> u32 {
    50
}
fn default_max_tool_errors() -> u32 {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_tool_errors: default_max_tool_errors(),
            stream: false,
            verbose: false,
        }
    }
}

/// `[tools]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Wall-clock limit for one `run_shell` command
    #[serde(default = "default_shell_timeout")]
    pub shell_timeout_secs: u64,

    /// Substrings (case-insensitive) that make `run_shell` refuse a command
    #[serde(default = "default_blocked_patterns")]
    pub blocked_patterns: Vec<String>,
}

fn default_shell_timeout() -> u64 {
    30
}

fn default_blocked_patterns() -> Vec<String> {
    [
        "rm -rf /",
        "mkfs",
        "dd if=",
        "> /dev/sda",
        "format c:",
        "del /f /s /q",
        "chmod 777 /",
        "chown -R",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            shell_timeout_secs: default_shell_timeout(),
            blocked_patterns: default_blocked_patterns(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.codicode/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment-like lookup.
    ///
    /// `load()` passes `std::env::var`; tests pass a map.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Some(v) = lookup("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = lookup("LLM_TEMPERATURE") {
            self.llm.temperature = parse_env("LLM_TEMPERATURE", &v)?;
        }
        if let Some(v) = lookup("LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_env("LLM_MAX_TOKENS", &v)?;
        }
        if let Some(v) = lookup("AGENT_MAX_STEPS") {
            self.agent.max_steps = parse_env("AGENT_MAX_STEPS", &v)?;
        }
        if let Some(v) = lookup("AGENT_MAX_ERRORS") {
            self.agent.max_tool_errors = parse_env("AGENT_MAX_ERRORS", &v)?;
        }
        if let Some(v) = lookup("AGENT_STREAM") {
            self.agent.stream = parse_flag(&v);
        }
        if let Some(v) = lookup("AGENT_VERBOSE") {
            self.agent.verbose = parse_flag(&v);
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".codicode")
    }

    /// Path of the default config file.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "llm.max_tokens must be at least 1".into(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("llm.model must not be empty".into()));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "llm.base_url must not be empty".into(),
            ));
        }
        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }
        if self.agent.max_tool_errors == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_errors must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| {
        ConfigError::ValidationError(format!("{key}={value:?} is not a valid number"))
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.model, "codellama:7b");
        assert_eq!(config.agent.max_steps, 50);
        assert_eq!(config.agent.max_tool_errors, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.llm.base_url, config.llm.base_url);
        assert_eq!(parsed.tools.blocked_patterns, config.tools.blocked_patterns);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[agent]\nmax_steps = 3\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.agent.max_steps, 3);
        assert_eq!(config.agent.max_tool_errors, 5);
        assert_eq!(config.llm.model, "codellama:7b");
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.llm.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_budgets_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_steps = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.max_tool_errors = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm\nmodel = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.llm.provider, "ollama");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides_from(env(&[
                ("LLM_MODEL", "deepseek-coder:6.7b"),
                ("LLM_TEMPERATURE", "0.2"),
                ("AGENT_MAX_STEPS", "10"),
                ("AGENT_MAX_ERRORS", "2"),
                ("AGENT_STREAM", "true"),
            ]))
            .unwrap();
        assert_eq!(config.llm.model, "deepseek-coder:6.7b");
        assert!((config.llm.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.agent.max_steps, 10);
        assert_eq!(config.agent.max_tool_errors, 2);
        assert!(config.agent.stream);
        assert!(!config.agent.verbose);
    }

    #[test]
    fn unparseable_env_override_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_overrides_from(env(&[("AGENT_MAX_STEPS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("AGENT_MAX_STEPS"));
    }

    #[test]
    fn sampling_follows_llm_section() {
        let mut config = AppConfig::default();
        config.llm.max_tokens = 512;
        assert_eq!(config.llm.sampling().max_tokens, 512);
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("[llm]"));
        assert!(toml_str.contains("codellama:7b"));
        assert!(toml_str.contains("max_tool_errors"));
    }
}
