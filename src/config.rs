//! Engine settings, read from `~/.config/elementa/config.toml`

use anyhow::{Context, Result, bail};
use declarative::{ExecuteOptions, PlannerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("elementa"))
}

/// All engine settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub transform: TransformSettings,

    #[serde(default)]
    pub planner: PlannerSettings,

    #[serde(default)]
    pub apply: ApplySettings,
}

/// How discovered elements are normalized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformSettings {
    /// Drop values that have no field in their type
    pub strict: bool,
    /// Wrap single values of list fields in a list
    pub normalize_lists: bool,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            strict: true,
            normalize_lists: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerSettings {
    /// Run adapter dependency changers in parallel
    pub parallel_changers: bool,
    /// Worker threads for changers and discovery
    pub jobs: usize,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            parallel_changers: true,
            jobs: 4,
        }
    }
}

impl PlannerSettings {
    /// Apply these settings to a planner config
    pub fn configure(&self, config: PlannerConfig) -> PlannerConfig {
        config
            .with_parallel_changers(self.parallel_changers)
            .with_jobs(self.jobs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplySettings {
    /// Plan and report, but never call adapters
    pub dry_run: bool,
    /// Apply without asking for confirmation
    pub force: bool,
}

impl From<&ApplySettings> for ExecuteOptions {
    fn from(settings: &ApplySettings) -> Self {
        Self {
            dry_run: settings.dry_run,
            force: settings.force,
        }
    }
}

impl EngineConfig {
    /// Path of the default config file
    pub fn default_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.toml"))
    }

    /// Load the config from ~/.config/elementa/config.toml
    ///
    /// Returns the defaults if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("Config file does not exist, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load the config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Invalid TOML format in engine config")?;
        config.validate()?;
        Ok(config)
    }

    /// Save the config to a file, creating its directory
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.planner.jobs == 0 {
            bail!("planner.jobs must be at least 1");
        }
        Ok(())
    }

    pub fn execute_options(&self) -> ExecuteOptions {
        ExecuteOptions::from(&self.apply)
    }
}
