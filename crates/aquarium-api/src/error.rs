use thiserror::Error;

/// Top-level error type for the `aquarium-api` crate.
///
/// Covers every failure mode of the two device surfaces: the HTTP pull
/// endpoint and the WebSocket push channel. `aquarium-core` maps these
/// into its transport/protocol taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Addressing ──────────────────────────────────────────────────
    /// The operator-supplied device address is not a bare host[:port].
    #[error("Invalid device address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The pull endpoint answered with a non-success status.
    #[error("Device returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed or broke while reading.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// Writing a frame to the WebSocket failed.
    #[error("WebSocket send failed: {0}")]
    WebSocketSend(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying on the
    /// next tick or reconnect.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status >= 500,
            Self::WebSocketConnect(_) | Self::WebSocketSend(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if the device answered but the payload was unusable.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Deserialization { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_errors_are_transient() {
        assert!(Error::WebSocketConnect("refused".into()).is_transient());
        assert!(Error::WebSocketSend("broken pipe".into()).is_transient());
    }

    #[test]
    fn server_errors_are_transient_client_errors_are_not() {
        let s503 = Error::Status {
            status: 503,
            url: "http://tank/data".into(),
        };
        let s404 = Error::Status {
            status: 404,
            url: "http://tank/data".into(),
        };
        assert!(s503.is_transient());
        assert!(!s404.is_transient());
    }

    #[test]
    fn deserialization_is_protocol_not_transient() {
        let err = Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        };
        assert!(err.is_protocol());
        assert!(!err.is_transient());
    }
}
