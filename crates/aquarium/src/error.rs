//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use aquarium_config::ConfigError;
use aquarium_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const PROTOCOL: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Device unreachable: {message}")]
    #[diagnostic(
        code(aquarium::unreachable),
        help(
            "Check that the controller is powered and on the same network.\n\
             Try: aquarium status --address <host>"
        )
    )]
    Unreachable { message: String },

    #[error("Push channel to {address} is not connected; nothing was sent")]
    #[diagnostic(
        code(aquarium::not_sent),
        help(
            "Commands travel over the WebSocket on the device's push port.\n\
             Increase --wait, or check push_port and websocket in your profile."
        )
    )]
    NotSent { address: String },

    // ── Device ───────────────────────────────────────────────────────

    #[error("Unexpected response from device: {message}")]
    #[diagnostic(code(aquarium::protocol))]
    Protocol { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(aquarium::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(aquarium::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: aquarium config init --device <host>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No device address configured")]
    #[diagnostic(
        code(aquarium::no_address),
        help(
            "Pass --address <host>, set AQUARIUM_ADDRESS, or create a profile:\n\
             aquarium config init --device <host>\n\
             Config file: {path}"
        )
    )]
    NoAddress { path: String },

    #[error("Profile '{name}' already exists")]
    #[diagnostic(
        code(aquarium::profile_exists),
        help("Use --force to replace it, or: aquarium config set-address <host>")
    )]
    ProfileExists { name: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(aquarium::config))]
    Config { message: String },

    // ── Internal ─────────────────────────────────────────────────────

    #[error("Internal error: {0}")]
    #[diagnostic(code(aquarium::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not encode output: {0}")]
    #[diagnostic(code(aquarium::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unreachable { .. } | Self::NotSent { .. } => exit_code::CONNECTION,
            Self::Protocol { .. } => exit_code::PROTOCOL,
            Self::Validation { .. } => exit_code::USAGE,
            Self::ProfileNotFound { .. }
            | Self::NoAddress { .. }
            | Self::ProfileExists { .. }
            | Self::Config { .. } => exit_code::CONFIG,
            Self::Internal(_) | Self::Io(_) | Self::Json(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport { message } => CliError::Unreachable { message },
            CoreError::Protocol { message } => CliError::Protocol { message },
            CoreError::Validation { field, message } => CliError::Validation {
                field,
                reason: message,
            },
            CoreError::Config { message } => CliError::Config { message },
            CoreError::NotStarted => CliError::Internal("controller not started".into()),
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::NoAddress { .. } => CliError::NoAddress {
                path: aquarium_config::config_path().display().to_string(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other @ (ConfigError::Serialization(_) | ConfigError::Figment(_)) => {
                CliError::Config {
                    message: other.to_string(),
                }
            }
        }
    }
}
