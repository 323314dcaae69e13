// Engine configuration for AlgoLab grading
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::types::{ComparisonMode, DEFAULT_FUNCTION_NAME};

pub const DEFAULT_CONFIG_PATH: &str = "config/engine.json";
pub const CONFIG_PATH_ENV: &str = "ALGOLAB_CONFIG";
pub const REQUEST_TIMEOUT_ENV: &str = "ALGOLAB_REQUEST_TIMEOUT_MS";
pub const COMPARISON_ENV: &str = "ALGOLAB_COMPARISON";

/// Interpreter limits installed on every execution context.
/// `None` disables the corresponding limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionLimits {
    pub loop_iteration_limit: Option<u64>,
    pub recursion_limit: Option<usize>,
    pub stack_size_limit: Option<usize>,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            loop_iteration_limit: Some(10_000_000),
            recursion_limit: Some(10_000),
            stack_size_limit: Some(1_048_576),
        }
    }
}

impl ExecutionLimits {
    pub fn unbounded() -> Self {
        Self {
            loop_iteration_limit: None,
            recursion_limit: None,
            stack_size_limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub default_function_name: String,
    pub max_source_bytes: usize,
    pub max_input_bytes: usize,
    pub limits: ExecutionLimits,
    pub comparison: ComparisonMode,
    /// Wall-clock budget for one request in the HTTP service and per
    /// exercise in `verify`.
    pub request_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_function_name: DEFAULT_FUNCTION_NAME.to_string(),
            max_source_bytes: 1024 * 1024,
            max_input_bytes: 10 * 1024 * 1024,
            limits: ExecutionLimits::default(),
            comparison: ComparisonMode::Serialized,
            request_timeout_ms: 10_000,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file. The file must exist.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Engine config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: EngineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;
        info!(path = %config_path.display(), "Loaded engine configuration");
        Ok(config)
    }

    /// Load from `$ALGOLAB_CONFIG`, else `config/engine.json` when present,
    /// else built-in defaults. Environment overrides are applied last.
    pub fn load_default() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::load(default_path)?
                } else {
                    debug!("No engine config file, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(REQUEST_TIMEOUT_ENV) {
            self.request_timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", REQUEST_TIMEOUT_ENV, raw))?;
        }

        if let Some(raw) = lookup(COMPARISON_ENV) {
            self.comparison = raw
                .trim()
                .parse()
                .map_err(|e: String| anyhow::anyhow!("Invalid {}: {}", COMPARISON_ENV, e))?;
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_function_name.trim().is_empty() {
            bail!("defaultFunctionName cannot be empty");
        }
        if self.max_source_bytes == 0 || self.max_input_bytes == 0 {
            bail!("maxSourceBytes and maxInputBytes must be positive");
        }
        if self.request_timeout_ms == 0 {
            bail!("requestTimeoutMs must be positive");
        }
        Ok(())
    }

    /// Write the configuration as pretty JSON, creating parent directories.
    pub fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json_content =
            serde_json::to_string_pretty(self).context("Failed to serialize engine config")?;

        fs::write(config_path, json_content)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;

        Ok(())
    }
}
