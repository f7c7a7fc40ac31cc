use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CognisConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub retrieval: RetrievalConfig,
    pub reasoning: ReasoningConfig,
    pub oracle: OracleConfig,
    pub learning: LearningConfig,
    pub evolution: EvolutionConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    /// When false, nothing is journaled and all state lives in memory.
    pub persist: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    /// Entries with importance below this are never returned.
    pub relevance_floor: f64,
    pub recent_window_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReasoningConfig {
    pub timeout_secs: u64,
    pub abductive_ceiling: f64,
    pub max_chain_statements: usize,
    pub excerpt_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OracleConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub repeat_penalty: f64,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LearningConfig {
    pub learning_rate: f64,
    pub default_importance: f64,
    pub initial_adaptation: f64,
    pub recent_history: usize,
    pub remember_experiences: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EvolutionConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub significance_threshold: f64,
    pub report_limit: usize,
    /// Completed cycles kept in memory for the fitness trajectory.
    pub history_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "http".into(),
            host: "127.0.0.1".into(),
            port: 8000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_cognis_dir()
            .join("cognis.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            persist: true,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            relevance_floor: 0.05,
            recent_window_hours: 24,
        }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            abductive_ceiling: 0.85,
            max_chain_statements: 12,
            excerpt_chars: 200,
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: "extractive".into(),
            base_url: "http://localhost:11434".into(),
            model: "llama2".into(),
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            repeat_penalty: 1.1,
            system_prompt: None,
        }
    }
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.3,
            default_importance: 0.5,
            initial_adaptation: 50.0,
            recent_history: 5,
            remember_experiences: true,
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 3600,
            significance_threshold: 0.5,
            report_limit: 10,
            history_limit: 50,
        }
    }
}

impl ReasoningConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Returns `~/.cognis/`
pub fn default_cognis_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".cognis")
}

/// Returns the default config file path: `~/.cognis/config.toml`
pub fn default_config_path() -> PathBuf {
    default_cognis_dir().join("config.toml")
}

impl CognisConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, apply env var overrides, then validate.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            CognisConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("COGNIS_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("COGNIS_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("COGNIS_OLLAMA_URL") {
            self.oracle.base_url = val;
        }
        if let Ok(val) = std::env::var("COGNIS_MODEL") {
            self.oracle.model = val;
        }
        if let Some(port) = std::env::var("COGNIS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }
    }

    /// Reject numeric settings that would break the core's invariants.
    pub fn validate(&self) -> Result<()> {
        let alpha = self.learning.learning_rate;
        ensure!(
            alpha > 0.0 && alpha <= 1.0,
            "learning.learning_rate must be in (0, 1], got {alpha}"
        );
        let ceiling = self.reasoning.abductive_ceiling;
        ensure!(
            ceiling > 0.0 && ceiling < 1.0,
            "reasoning.abductive_ceiling must be in (0, 1), got {ceiling}"
        );
        ensure!(
            (0.0..=1.0).contains(&self.learning.default_importance),
            "learning.default_importance must be in [0, 1]"
        );
        ensure!(
            (0.0..=100.0).contains(&self.learning.initial_adaptation),
            "learning.initial_adaptation must be in [0, 100]"
        );
        ensure!(
            (0.0..=1.0).contains(&self.retrieval.relevance_floor),
            "retrieval.relevance_floor must be in [0, 1]"
        );
        ensure!(
            self.retrieval.default_limit > 0
                && self.retrieval.default_limit <= self.retrieval.max_limit,
            "retrieval.default_limit must be in 1..=max_limit"
        );
        ensure!(
            self.evolution.interval_secs > 0,
            "evolution.interval_secs must be positive"
        );
        ensure!(
            self.evolution.history_limit > 0,
            "evolution.history_limit must be positive"
        );
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
