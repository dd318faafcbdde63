//! Configuration loading, validation, and management for LocalAgent.
//!
//! Loads configuration from `~/.localagent/config.toml` with environment
//! variable overrides. Validates all settings at startup. The resulting
//! `AppConfig` is passed explicitly into every component; nothing below
//! the CLI and gateway reads the environment.

use localagent_core::run::RunLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.localagent/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model server and model selection
    #[serde(default)]
    pub model: ModelConfig,

    /// Agent loop limits
    #[serde(default)]
    pub agent: AgentSettings,

    /// Memory store configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier as the server knows it
    #[serde(default = "default_model_id")]
    pub id: String,

    /// Base URL of the Ollama server
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout for chat and embedding calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How many times to poll for the model at startup
    #[serde(default = "default_startup_retries")]
    pub startup_retries: u32,

    #[serde(default = "default_startup_interval_secs")]
    pub startup_interval_secs: u64,
}

fn default_model_id() -> String {
    "qwen2.5-coder:0.5b".into()
}
fn default_host() -> String {
    "http://ollama:11434".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_startup_retries() -> u32 {
    30
}
fn default_startup_interval_secs() -> u64 {
    5
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            id: default_model_id(),
            host: default_host(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
            startup_retries: default_startup_retries(),
            startup_interval_secs: default_startup_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Wall-clock ceiling per run, checked between iterations
    #[serde(default = "default_max_seconds")]
    pub max_seconds: u64,

    /// Past entries injected into each prompt
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,

    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

fn default_max_iterations() -> u32 {
    8
}
fn default_max_seconds() -> u64 {
    60
}
fn default_recall_limit() -> usize {
    3
}
fn default_tool_timeout_secs() -> u64 {
    15
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_seconds: default_max_seconds(),
            recall_limit: default_recall_limit(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "file", "in_memory" or "none"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// Collection name; the file backend stores `<path>/<collection>.jsonl`
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Directory for the file backend (defaults to `~/.localagent/memory`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// "ollama" or "hash"
    #[serde(default = "default_embedder")]
    pub embedder: String,

    /// Vector size for the hash embedder
    #[serde(default = "default_embedding_dims")]
    pub embedding_dims: usize,
}

fn default_memory_backend() -> String {
    "file".into()
}
fn default_collection() -> String {
    "agent_history".into()
}
fn default_embedder() -> String {
    "ollama".into()
}
fn default_embedding_dims() -> usize {
    256
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            collection: default_collection(),
            path: None,
            embedder: default_embedder(),
            embedding_dims: default_embedding_dims(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Block startup until the model server lists the configured model
    #[serde(default = "default_true")]
    pub wait_for_model: bool,
}

fn default_port() -> u16 {
    8000
}
fn default_gateway_host() -> String {
    "0.0.0.0".into()
}
fn default_true() -> bool {
    true
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_gateway_host(),
            wait_for_model: true,
        }
    }
}

const MEMORY_BACKENDS: &[&str] = &["file", "in_memory", "none"];
const EMBEDDERS: &[&str] = &["ollama", "hash"];

impl AppConfig {
    /// Load configuration from the default path (~/.localagent/config.toml),
    /// then apply environment overrides:
    /// - `LOCALAGENT_MODEL` / `OLLAMA_MODEL`
    /// - `LOCALAGENT_HOST` / `OLLAMA_HOST`
    /// - `LOCALAGENT_MEMORY_COLLECTION`
    /// - `LOCALAGENT_MAX_ITERATIONS`, `LOCALAGENT_MAX_SECONDS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
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

    /// Apply overrides from an environment lookup. Prefixed names win.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k).filter(|v| !v.is_empty()));

        if let Some(model) = first(&["LOCALAGENT_MODEL", "OLLAMA_MODEL"]) {
            self.model.id = model;
        }
        if let Some(host) = first(&["LOCALAGENT_HOST", "OLLAMA_HOST"]) {
            self.model.host = host;
        }
        if let Some(collection) = first(&["LOCALAGENT_MEMORY_COLLECTION"]) {
            self.memory.collection = collection;
        }
        if let Some(raw) = first(&["LOCALAGENT_MAX_ITERATIONS"]) {
            self.agent.max_iterations = parse_env("LOCALAGENT_MAX_ITERATIONS", &raw)?;
        }
        if let Some(raw) = first(&["LOCALAGENT_MAX_SECONDS"]) {
            self.agent.max_seconds = parse_env("LOCALAGENT_MAX_SECONDS", &raw)?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".localagent")
    }

    /// Directory the file memory backend writes to.
    pub fn memory_dir(&self) -> PathBuf {
        self.memory
            .path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("memory"))
    }

    pub fn run_limits(&self) -> RunLimits {
        RunLimits {
            max_iterations: self.agent.max_iterations,
            max_duration: Duration::from_secs(self.agent.max_seconds),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.model.request_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.agent.tool_timeout_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.id.trim().is_empty() {
            return Err(ConfigError::ValidationError("model.id must not be empty".into()));
        }

        if !(self.model.host.starts_with("http://") || self.model.host.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "model.host must be an http(s) URL, got '{}'",
                self.model.host
            )));
        }

        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.model.request_timeout_secs == 0 || self.agent.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError("timeouts must be > 0".into()));
        }

        if self.agent.max_iterations == 0 || self.agent.max_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations and agent.max_seconds must be > 0".into(),
            ));
        }

        if !MEMORY_BACKENDS.contains(&self.memory.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "memory.backend must be one of {MEMORY_BACKENDS:?}, got '{}'",
                self.memory.backend
            )));
        }

        if !EMBEDDERS.contains(&self.memory.embedder.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "memory.embedder must be one of {EMBEDDERS:?}, got '{}'",
                self.memory.embedder
            )));
        }

        if self.memory.embedding_dims == 0 {
            return Err(ConfigError::ValidationError(
                "memory.embedding_dims must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} must be a number, got '{raw}'")))
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
    use std::io::Write;

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
        assert!(config.validate().is_ok());
        assert_eq!(config.model.id, "qwen2.5-coder:0.5b");
        assert_eq!(config.model.host, "http://ollama:11434");
        assert_eq!(config.agent.max_iterations, 8);
        assert_eq!(config.agent.max_seconds, 60);
        assert_eq!(config.memory.collection, "agent_history");
        assert_eq!(config.gateway.port, 8000);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model.id, config.model.id);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agent]\nmax_iterations = 3\n\n[memory]\nbackend = \"in_memory\"").unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.agent.max_iterations, 3);
        assert_eq!(config.agent.max_seconds, 60);
        assert_eq!(config.memory.backend, "in_memory");
        assert_eq!(config.model.id, "qwen2.5-coder:0.5b");
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agent\nmax_iterations = ").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.model.host, "http://ollama:11434");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("OLLAMA_MODEL", "codellama:7b"),
                ("OLLAMA_HOST", "http://localhost:11434"),
                ("LOCALAGENT_MEMORY_COLLECTION", "scratch"),
                ("LOCALAGENT_MAX_ITERATIONS", "4"),
            ]))
            .unwrap();
        assert_eq!(config.model.id, "codellama:7b");
        assert_eq!(config.model.host, "http://localhost:11434");
        assert_eq!(config.memory.collection, "scratch");
        assert_eq!(config.agent.max_iterations, 4);
    }

    #[test]
    fn prefixed_env_wins_over_ollama_names() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("OLLAMA_MODEL", "codellama:7b"),
                ("LOCALAGENT_MODEL", "llama3"),
            ]))
            .unwrap();
        assert_eq!(config.model.id, "llama3");
    }

    #[test]
    fn non_numeric_env_limit_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env(&[("LOCALAGENT_MAX_SECONDS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("LOCALAGENT_MAX_SECONDS"));
    }

    #[test]
    fn zero_limits_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut config = AppConfig::default();
        config.memory.backend = "chroma".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("memory.backend"));
    }

    #[test]
    fn non_http_host_rejected() {
        let mut config = AppConfig::default();
        config.model.host = "ollama:11434".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn run_limits_follow_agent_settings() {
        let mut config = AppConfig::default();
        config.agent.max_iterations = 3;
        config.agent.max_seconds = 5;
        let limits = config.run_limits();
        assert_eq!(limits.max_iterations, 3);
        assert_eq!(limits.max_duration, Duration::from_secs(5));
    }

    #[test]
    fn memory_dir_prefers_configured_path() {
        let mut config = AppConfig::default();
        assert!(config.memory_dir().ends_with(".localagent/memory"));
        config.memory.path = Some(PathBuf::from("/data/history"));
        assert_eq!(config.memory_dir(), PathBuf::from("/data/history"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("qwen2.5-coder:0.5b"));
        assert!(toml_str.contains("agent_history"));
    }
}
