// ── Core error types ──
//
// User-facing errors from aquarium-core. Consumers never match on HTTP
// statuses or tungstenite failures; the `From<aquarium_api::Error>` impl
// folds them into three recoverable classes plus lifecycle errors.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Recoverable device errors ────────────────────────────────────
    /// Socket/connect failure or failed fetch. The next retry or tick recovers.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The device answered with something that isn't a usable reading.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ── Caller errors ────────────────────────────────────────────────
    /// Rejected locally; nothing was transmitted.
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Controller not started")]
    NotStarted,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_owned(),
            message: message.into(),
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<aquarium_api::Error> for CoreError {
    fn from(err: aquarium_api::Error) -> Self {
        match err {
            aquarium_api::Error::InvalidAddress { .. } | aquarium_api::Error::InvalidUrl(_) => {
                CoreError::Config {
                    message: err.to_string(),
                }
            }
            aquarium_api::Error::Transport(_)
            | aquarium_api::Error::Status { .. }
            | aquarium_api::Error::WebSocketConnect(_)
            | aquarium_api::Error::WebSocketSend(_) => CoreError::Transport {
                message: err.to_string(),
            },
            aquarium_api::Error::Deserialization { message, body: _ } => {
                CoreError::Protocol { message }
            }
        }
    }
}
