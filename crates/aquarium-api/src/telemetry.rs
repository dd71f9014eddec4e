// Pull endpoint client
//
// One-shot `GET http://<address>/data` fetches. The body is returned as
// raw JSON; shape validation belongs to the reconciler in aquarium-core,
// so both data paths are judged by the same rules.

use tracing::{debug, trace};
use url::Url;

use crate::address::DeviceAddress;
use crate::error::Error;
use crate::transport::TransportConfig;

/// HTTP client for the device's telemetry endpoint.
///
/// Cheap to clone; each clone shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct TelemetryClient {
    http: reqwest::Client,
    data_url: Url,
}

impl TelemetryClient {
    /// Create a client for `address` from a `TransportConfig`.
    pub fn new(address: &DeviceAddress, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            data_url: address.data_url()?,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, address: &DeviceAddress) -> Result<Self, Error> {
        Ok(Self {
            http,
            data_url: address.data_url()?,
        })
    }

    /// The URL this client fetches.
    pub fn data_url(&self) -> &Url {
        &self.data_url
    }

    /// Fetch the current readings.
    ///
    /// Non-success statuses and non-JSON bodies are errors; the JSON value
    /// itself is not inspected here.
    pub async fn fetch(&self) -> Result<serde_json::Value, Error> {
        debug!("GET {}", self.data_url);

        let resp = self
            .http
            .get(self.data_url.clone())
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: self.data_url.to_string(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        trace!(body = %body, "telemetry body");

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}
