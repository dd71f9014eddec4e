//! Shared configuration for aquarium tools.
//!
//! TOML profiles merged with `AQUARIUM_*` environment variables, and
//! translation to `aquarium_core::ControllerConfig`. The core never reads
//! files; the CLI layers its flag overrides on top of what this crate
//! resolves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use aquarium_core::{ControllerConfig, DeviceAddress, PinMap};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "AQUARIUM_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("no device address configured for profile '{profile}'")]
    NoAddress { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: explicit choice, then `default_profile`,
    /// then `"default"`.
    pub fn profile_name<'a>(&'a self, explicit: Option<&'a str>) -> &'a str {
        explicit
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Pull cadence in milliseconds. 0 disables periodic polling.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Flat push-channel reconnect delay in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            poll_interval_ms: default_poll_interval_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_reconnect_delay_ms() -> u64 {
    2000
}

/// A named device profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Device host or IP, optionally with an HTTP port (e.g. "192.168.70.37").
    #[serde(default)]
    pub address: String,

    /// WebSocket port on the device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_port: Option<u16>,

    /// Override poll cadence (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,

    /// Override reconnect delay (ms).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect_delay_ms: Option<u64>,

    /// Per-fetch timeout in seconds. Unset means no timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_countdown_secs: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_change_countdown_secs: Option<u32>,

    /// Set to `false` for pull-only operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub websocket: Option<bool>,

    /// Actuator → device pin mapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pins: Option<PinMap>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$AQUARIUM_CONFIG`, then platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }

    ProjectDirs::from("org", "aquarium", "aquarium").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("aquarium");
    p
}

// ── Config loading ──────────────────────────────────────────────────

fn base_figment() -> Figment {
    Figment::new().merge(Serialized::defaults(Config::default()))
}

fn env_provider() -> Env {
    // `__` separates nesting so keys like `default_profile` survive intact
    Env::prefixed("AQUARIUM_")
        .split("__")
        .ignore(&["config", "profile", "address", "output"])
}

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment. A missing file is
/// not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = base_figment()
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()?;
    Ok(config)
}

/// Parse a TOML document on top of the defaults, without environment.
pub fn parse_config(toml_src: &str) -> Result<Config, ConfigError> {
    let config: Config = base_figment().merge(Toml::string(toml_src)).extract()?;
    Ok(config)
}

/// Load config, returning a default if anything goes wrong.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Parse and validate a profile's device address.
pub fn profile_address(profile: &Profile, profile_name: &str) -> Result<DeviceAddress, ConfigError> {
    if profile.address.trim().is_empty() {
        return Err(ConfigError::NoAddress {
            profile: profile_name.into(),
        });
    }
    profile
        .address
        .parse::<DeviceAddress>()
        .map_err(|e| ConfigError::Validation {
            field: "address".into(),
            reason: e.to_string(),
        })
}

/// Build a `ControllerConfig` from a profile and the global defaults.
/// No CLI flag overrides are applied here.
pub fn profile_to_controller_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let reconnect_ms = profile.reconnect_delay_ms.unwrap_or(defaults.reconnect_delay_ms);
    if reconnect_ms == 0 {
        return Err(ConfigError::Validation {
            field: "reconnect_delay_ms".into(),
            reason: "must be greater than zero".into(),
        });
    }
    if profile.push_port == Some(0) {
        return Err(ConfigError::Validation {
            field: "push_port".into(),
            reason: "must be a valid TCP port".into(),
        });
    }

    let base = ControllerConfig::default();

    Ok(ControllerConfig {
        push_port: profile.push_port.unwrap_or(base.push_port),
        poll_interval: Duration::from_millis(
            profile.poll_interval_ms.unwrap_or(defaults.poll_interval_ms),
        ),
        reconnect_delay: Duration::from_millis(reconnect_ms),
        request_timeout: profile.timeout.map(Duration::from_secs),
        feed_countdown_secs: profile
            .feed_countdown_secs
            .unwrap_or(base.feed_countdown_secs),
        water_change_countdown_secs: profile
            .water_change_countdown_secs
            .unwrap_or(base.water_change_countdown_secs),
        pins: profile.pins.clone().unwrap_or(base.pins),
        websocket_enabled: profile.websocket.unwrap_or(base.websocket_enabled),
    })
}
