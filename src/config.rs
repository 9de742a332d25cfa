use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{sklog_debug, Error, Result};

/// Metric used for indicator heads when nothing is configured.
///
/// Slices are usually rare, so indicator tasks are heavily class-imbalanced.
pub const DEFAULT_INDICATOR_METRIC: &str = "f1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Metrics the scorer of every indicator task reports.
    #[serde(default = "default_indicator_metrics")]
    pub indicator_metrics: Vec<String>,
    /// Softmax temperature the master combiner applies to slice scores.
    #[serde(default = "default_temperature")]
    pub combiner_temperature: f32,
    /// Seed for initializing freshly created slice modules.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_indicator_metrics() -> Vec<String> {
    vec![DEFAULT_INDICATOR_METRIC.to_string()]
}

fn default_temperature() -> f32 {
    1.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            indicator_metrics: default_indicator_metrics(),
            combiner_temperature: default_temperature(),
            seed: None,
        }
    }
}

impl Config {
    pub fn slicekit_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".slicekit"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::slicekit_dir()?.join("slicekit.toml"))
    }

    /// Load from the default location, falling back to defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        sklog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            sklog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        sklog_debug!(
            "Config loaded: indicator_metrics={:?}, temperature={}, seed={:?}",
            config.indicator_metrics,
            config.combiner_temperature,
            config.seed
        );
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        sklog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.indicator_metrics.is_empty() {
            return Err(Error::Validation(
                "indicator_metrics must name at least one metric".to_string(),
            ));
        }
        if self.combiner_temperature.is_nan() || self.combiner_temperature <= 0.0 {
            return Err(Error::Validation(format!(
                "combiner_temperature must be positive, got {}",
                self.combiner_temperature
            )));
        }
        Ok(())
    }
}
