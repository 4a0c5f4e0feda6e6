use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::app::APP_NAME;

const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Print `[debug]` diagnostics to stderr.
    pub debug: bool,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub git: String,
    pub bun: String,
    pub probe_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            bun: "bun".to_string(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let proj = directories::ProjectDirs::from("", "", APP_NAME)
        .context("could not determine config directory")?;
    Ok(proj.config_dir().join("config.toml"))
}

/// Loads the user's config, falling back to defaults when there is none.
pub fn load_default_config() -> Result<Config> {
    let path = default_config_path()?;
    if !path.exists() {
        return Ok(Config::default());
    }
    load_config(&path)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config from {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("invalid config at {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents).context("failed to parse config TOML")?;

    if config.tools.probe_timeout_secs == 0 {
        bail!("probe_timeout_secs must be greater than 0");
    }
    if config.tools.git.trim().is_empty() {
        bail!("tools.git must not be empty");
    }
    if config.tools.bun.trim().is_empty() {
        bail!("tools.bun must not be empty");
    }

    Ok(config)
}
