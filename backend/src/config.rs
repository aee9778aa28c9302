//! Runtime configuration.
//!
//! Values come from a TOML file whose path is given on the command line. Every
//! field has a default, so a missing file yields a working development setup
//! rooted in the current directory.

use crate::error::ConfigError;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "choir-binder.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// SQLite database holding events, pieces, songs and media.
    pub database: PathBuf,
    /// Root that media URLs such as `/uploads/x.pdf` are resolved against.
    pub public_dir: PathBuf,
    /// Directory for per-run intermediate files.
    pub scratch_dir: PathBuf,
    pub fonts_dir: PathBuf,
    pub font_family: String,
    /// IANA zone used to print event dates.
    pub timezone: String,
    pub debounce_secs: u64,
    pub create_delay_ms: u64,
    pub update_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: PathBuf::from("choir.sqlite"),
            public_dir: PathBuf::from("public"),
            scratch_dir: PathBuf::from("public/.temp"),
            fonts_dir: PathBuf::from("./fonts"),
            font_family: "LiberationSans".to_string(),
            timezone: "America/Mexico_City".to_string(),
            debounce_secs: 30,
            create_delay_ms: 2000,
            update_delay_ms: 1000,
        }
    }
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            log::warn!(
                "Config file {} not found, using defaults",
                path.display()
            );
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Config::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.time_zone()?;
        Ok(config)
    }

    pub fn time_zone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::TimeZone(self.timezone.clone()))
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }

    /// Directory that stored event documents are written to.
    pub fn events_output_dir(&self) -> PathBuf {
        self.public_dir.join("uploads").join("events")
    }
}
