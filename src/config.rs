use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::scoring::ScoringConfig;
use crate::core::similarity::DuplicateConfig;
use crate::{tlog_debug, Error, Result};

/// Engine configuration, read from `tusk.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Database location. `~/` is expanded. Defaults to `~/.tusk/tasks.db`.
    pub db_path: Option<String>,
    #[serde(default)]
    pub attributes: AttributeRules,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub duplicates: DuplicateConfig,
}

/// Allowed values for the free-form classification attributes.
///
/// An empty set accepts anything; a non-empty set is a closed list.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AttributeRules {
    #[serde(default)]
    pub domains: BTreeSet<String>,
    #[serde(default)]
    pub task_types: BTreeSet<String>,
    #[serde(default)]
    pub agents: BTreeSet<String>,
}

impl AttributeRules {
    pub fn validate_domain(&self, value: Option<&str>) -> Result<()> {
        check_allowed("domain", &self.domains, value)
    }

    pub fn validate_task_type(&self, value: Option<&str>) -> Result<()> {
        check_allowed("task_type", &self.task_types, value)
    }

    pub fn validate_assignee(&self, value: Option<&str>) -> Result<()> {
        check_allowed("assignee", &self.agents, value)
    }
}

fn check_allowed(field: &'static str, allowed: &BTreeSet<String>, value: Option<&str>) -> Result<()> {
    match value {
        Some(v) if !allowed.is_empty() && !allowed.contains(v) => Err(Error::invalid(field, v)),
        _ => Ok(()),
    }
}

impl Config {
    pub fn tusk_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".tusk"))
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::tusk_dir()?.join("tusk.toml"))
    }

    /// Resolved database path.
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(expand_tilde(path)),
            None => Ok(Self::tusk_dir()?.join("tasks.db")),
        }
    }

    /// Load from the default location, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        tlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            tlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        tlog_debug!(
            "Config loaded: domains={} task_types={} agents={}",
            config.attributes.domains.len(),
            config.attributes.task_types.len(),
            config.attributes.agents.len()
        );
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        tlog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        self.duplicates.validate()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
