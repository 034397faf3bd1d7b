use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{clog_debug, Error, Result};

fn default_approval_threshold() -> u8 {
    9
}

fn default_pacing_ms() -> u64 {
    800
}

fn default_failed_unblocks_dependents() -> bool {
    true
}

fn default_enabled_tools() -> Vec<String> {
    vec!["Google Search".to_string(), "Code Interpreter".to_string()]
}

/// Run-level tunables, TOML-backed at `~/.convoy/convoy.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Nodes with priority at or above this require explicit approval
    /// before executing.
    #[serde(default = "default_approval_threshold")]
    pub approval_threshold: u8,
    /// Delay between node dispatches, in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    /// Per-node executor timeout in seconds; `None` waits indefinitely.
    pub executor_timeout_secs: Option<u64>,
    /// Whether a failed node's id still satisfies its dependents.
    /// With `false`, dependents of a failure are starved and the run
    /// ends blocked.
    #[serde(default = "default_failed_unblocks_dependents")]
    pub failed_unblocks_dependents: bool,
    /// Tool names passed through to the executor.
    #[serde(default = "default_enabled_tools")]
    pub enabled_tools: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            approval_threshold: default_approval_threshold(),
            pacing_ms: default_pacing_ms(),
            executor_timeout_secs: None,
            failed_unblocks_dependents: default_failed_unblocks_dependents(),
            enabled_tools: default_enabled_tools(),
        }
    }
}

impl RunConfig {
    pub fn convoy_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".convoy"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::convoy_dir()?.join("convoy.toml"))
    }

    /// Delay between node dispatches.
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Per-node executor timeout, if configured.
    pub fn executor_timeout(&self) -> Option<Duration> {
        self.executor_timeout_secs.map(Duration::from_secs)
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        clog_debug!("RunConfig::load path={}", path.display());
        Self::load_from(&path)
    }

    /// Load from an explicit path; missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            clog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let dir = Self::convoy_dir()?;
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        let path = Self::config_path()?;
        self.save_to(&path)?;
        clog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}
