//! Optional TOML configuration. CLI flags override file values, which override
//! the defaults here.
//!
//! ```toml
//! data_file = "/var/lib/citypop/citypop.json"
//! next_year = "current-calendar"
//! locale = "de"
//!
//! [chart]
//! width = 1200
//! height = 700
//! ```

use crate::forecast::NextYearPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("chart size must be non-zero, got {width}x{height}")]
    ChartSize { width: u32, height: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_file: PathBuf,
    pub next_year: NextYearPolicy,
    pub locale: String,
    pub chart: ChartConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            next_year: NextYearPolicy::default(),
            locale: "en".to_string(),
            chart: ChartConfig::default(),
        }
    }
}

/// `<data dir>/citypop/citypop.json`, or `./citypop.json` when the platform has no data dir.
pub fn default_data_file() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("citypop"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("citypop.json")
}

impl Config {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loading config from {}", path.display());
        Self::from_toml_str(&text, path)
    }

    /// Load `path` if given, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(ConfigError::ChartSize {
                width: self.chart.width,
                height: self.chart.height,
            });
        }
        Ok(())
    }
}
