//! Configuration management for flightlog.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geo::Coordinates;
use crate::map::{Projection, SurfaceOptions};
use crate::storage::{load_access_token, KeyValueStore};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flightlog";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "flightlog.db";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "FLIGHTLOG_";

/// Highest zoom level map providers accept.
const MAX_ZOOM: f64 = 22.0;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLIGHTLOG_`, `__` between
///    section and key, e.g. `FLIGHTLOG_MAP__ACCESS_TOKEN`)
/// 2. TOML config file at `~/.config/flightlog/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Map configuration.
    pub map: MapConfig,
    /// Share link configuration.
    pub share: ShareConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/flightlog/flightlog.db`
    pub database_path: Option<PathBuf>,
}

/// Map surface configuration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Provider access token. No default; falls back to the saved token.
    pub access_token: Option<String>,
    /// Id of the element the map renders into.
    pub container: String,
    /// Initial `[lon, lat]` center.
    pub center: Coordinates,
    /// Initial zoom level.
    pub zoom: f64,
    /// Projection mode.
    pub projection: Projection,
    /// Show zoom and rotate controls.
    pub navigation_control: bool,
    /// How long `render` waits for the surface, in milliseconds.
    pub ready_timeout_ms: u64,
}

impl std::fmt::Debug for MapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapConfig")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("container", &self.container)
            .field("center", &self.center)
            .field("zoom", &self.zoom)
            .field("projection", &self.projection)
            .field("navigation_control", &self.navigation_control)
            .field("ready_timeout_ms", &self.ready_timeout_ms)
            .finish()
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            container: "map".to_string(),
            center: Coordinates::new(-30.0, 30.0),
            zoom: 1.5,
            projection: Projection::Globe,
            navigation_control: true,
            ready_timeout_ms: 5000,
        }
    }
}

/// Share link configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// URL the share parameter is appended to.
    pub base_url: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        let config = Self::figment(&config_file).extract::<Self>()?;
        config.validate()?;
        Ok(config)
    }

    /// The layered provider stack for `config_file`.
    #[must_use]
    pub fn figment(config_file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let map = &self.map;
        if !(0.0..=MAX_ZOOM).contains(&map.zoom) {
            return Err(invalid(format!(
                "map.zoom ({}) must be between 0 and {MAX_ZOOM}",
                map.zoom
            )));
        }

        if !map.center.is_valid() {
            return Err(invalid(format!(
                "map.center [{}, {}] is outside [-180..180, -90..90]",
                map.center.lon, map.center.lat
            )));
        }

        if map.container.trim().is_empty() {
            return Err(invalid("map.container must not be empty"));
        }

        if map.ready_timeout_ms == 0 {
            return Err(invalid("map.ready_timeout_ms must be greater than 0"));
        }

        let base = &self.share.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(invalid(format!(
                "share.base_url ({base}) must start with http:// or https://"
            )));
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// The configured access token, else the one saved in `store`.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn access_token(&self, store: &impl KeyValueStore) -> Result<Option<String>> {
        let configured = self
            .map
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        match configured {
            Some(token) => Ok(Some(token.to_string())),
            None => load_access_token(store),
        }
    }

    /// Surface creation options carrying `token`.
    #[must_use]
    pub fn surface_options(&self, token: &str) -> SurfaceOptions {
        SurfaceOptions {
            access_token: token.to_string(),
            center: self.map.center,
            zoom: self.map.zoom,
            projection: self.map.projection,
            navigation_control: self.map.navigation_control,
        }
    }

    /// Get the ready timeout as a Duration.
    #[must_use]
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.map.ready_timeout_ms)
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}
