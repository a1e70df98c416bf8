//! Configuration: built-in defaults, overridden by the TOML config file,
//! overridden by environment variables.
//!
//! The resolved value is passed explicitly to the components that need it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_API_KEY_ENV, DEFAULT_FAILURE_PREVIEW,
    DEFAULT_MAX_NEW_TOKENS, DEFAULT_MODEL_ID, DEFAULT_REGION, DEFAULT_SCAN_PAGE_CAP,
    MAX_BATCH_STATEMENTS,
};
use crate::errors::ConfigError;

/// Colour theme of the terminal front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    #[serde(alias = "Dark")]
    Dark,
    #[serde(alias = "Light")]
    Light,
}

impl FromStr for Theme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            other => Err(ConfigError::Invalid {
                field: "theme",
                message: format!("unknown theme '{other}'"),
            }),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dark => f.write_str("dark"),
            Self::Light => f.write_str("light"),
        }
    }
}

/// Hosted-model planner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub model_id: String,
    /// Region of the model endpoint. Falls back to `AWS_REGION`, then `us-east-1`.
    pub region: Option<String>,
    /// Full endpoint override, mainly for proxies and tests.
    pub endpoint: Option<String>,
    pub max_new_tokens: u32,
    pub temperature: f64,
    /// Name of the environment variable that holds the bearer token.
    pub api_key_env: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            region: None,
            endpoint: None,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            temperature: 0.0,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl PlannerConfig {
    pub fn effective_region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }
}

/// Per-call timeouts, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub metadata_ms: u64,
    pub single_item_ms: u64,
    pub scan_ms: u64,
    pub statement_ms: u64,
    pub batch_chunk_ms: u64,
    pub planner_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            metadata_ms: 5_000,
            single_item_ms: 5_000,
            scan_ms: 10_000,
            statement_ms: 10_000,
            batch_chunk_ms: 10_000,
            planner_ms: 15_000,
        }
    }
}

impl TimeoutConfig {
    pub fn metadata(&self) -> Duration {
        Duration::from_millis(self.metadata_ms)
    }

    pub fn single_item(&self) -> Duration {
        Duration::from_millis(self.single_item_ms)
    }

    pub fn scan(&self) -> Duration {
        Duration::from_millis(self.scan_ms)
    }

    pub fn statement(&self) -> Duration {
        Duration::from_millis(self.statement_ms)
    }

    pub fn batch_chunk(&self) -> Duration {
        Duration::from_millis(self.batch_chunk_ms)
    }

    pub fn planner(&self) -> Duration {
        Duration::from_millis(self.planner_ms)
    }
}

/// Batch write settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Statements per batch round-trip; at most 25.
    pub chunk_size: usize,
    /// Failure messages surfaced after a partially failed batch.
    pub failure_preview: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: MAX_BATCH_STATEMENTS,
            failure_preview: DEFAULT_FAILURE_PREVIEW,
        }
    }
}

/// Browsing scan settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub page_cap: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            page_cap: DEFAULT_SCAN_PAGE_CAP,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DynoConfig {
    pub theme: Theme,
    pub planner: PlannerConfig,
    pub timeouts: TimeoutConfig,
    pub batch: BatchConfig,
    pub scan: ScanConfig,
}

impl DynoConfig {
    /// Parse a TOML document. Absent keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// `$XDG_CONFIG_HOME/dynotui/config.toml`, else `$HOME/.config/dynotui/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from `path` (or the default location) and apply process
    /// environment overrides. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// [`Self::load`] with an injectable environment lookup.
    pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolved = path.map(Path::to_path_buf).or_else(Self::default_path);

        let mut config = match resolved {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(&p).map_err(|e| ConfigError::Io {
                    path: p.display().to_string(),
                    message: e.to_string(),
                })?;
                Self::from_toml(&text)?
            }
            _ => Self::default(),
        };

        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(theme) = env("DYNOTUI_THEME") {
            self.theme = theme.parse()?;
        }
        if self.planner.region.is_none() {
            self.planner.region = env("AWS_REGION").filter(|r| !r.is_empty());
        }
        Ok(())
    }

    /// Persist as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |e: std::io::Error| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        std::fs::write(path, text).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.chunk_size == 0 || self.batch.chunk_size > MAX_BATCH_STATEMENTS {
            return Err(ConfigError::Invalid {
                field: "batch.chunk_size",
                message: format!(
                    "must be between 1 and {MAX_BATCH_STATEMENTS}, got {}",
                    self.batch.chunk_size
                ),
            });
        }
        if self.scan.page_cap == 0 {
            return Err(ConfigError::Invalid {
                field: "scan.page_cap",
                message: "must be at least 1".to_string(),
            });
        }
        let t = &self.timeouts;
        let timeouts = [
            ("timeouts.metadata_ms", t.metadata_ms),
            ("timeouts.single_item_ms", t.single_item_ms),
            ("timeouts.scan_ms", t.scan_ms),
            ("timeouts.statement_ms", t.statement_ms),
            ("timeouts.batch_chunk_ms", t.batch_chunk_ms),
            ("timeouts.planner_ms", t.planner_ms),
        ];
        for (field, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    message: "timeout must be non-zero".to_string(),
                });
            }
        }
        if self.planner.model_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "planner.model_id",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
