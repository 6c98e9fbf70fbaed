//! Configuration for the anchor system.
//!
//! Loaded from optional YAML files with `ANCHOR_HUB__*` environment
//! overrides. Every field has a default, so an empty source is valid.

use serde::Deserialize;

/// Configuration file read from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "anchor-hub.yaml";
/// Environment variable naming an additional configuration file.
pub const CONFIG_ENV_VAR: &str = "ANCHOR_HUB_CONFIG";
/// Prefix for environment overrides, e.g. `ANCHOR_HUB__EVENTS__FORWARD_LIFECYCLE_EVENTS`.
pub const CONFIG_ENV_PREFIX: &str = "ANCHOR_HUB";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "ANCHOR_HUB_LOG";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Event aggregation.
    pub events: EventsConfig,
    /// Request dispatch.
    pub dispatch: DispatchConfig,
}

/// Event aggregation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Also relay session lifecycle events, not just service events.
    pub forward_lifecycle_events: bool,
}

/// Dispatch settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Run broadcast operations against all providers concurrently.
    pub parallel_broadcast: bool,
    /// Longest lifetime accepted for a new anchor. Unlimited when unset.
    pub max_time_to_live_secs: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            parallel_broadcast: true,
            max_time_to_live_secs: None,
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Sources, later overriding earlier:
    /// 1. `DEFAULT_CONFIG_FILE` in the current directory (if it exists)
    /// 2. File at `path` (if provided)
    /// 3. File named by `CONFIG_ENV_VAR` (if set)
    /// 4. Environment variables with the `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        Self {
            dispatch: DispatchConfig {
                parallel_broadcast: false,
                ..DispatchConfig::default()
            },
            ..Self::default()
        }
    }
}
