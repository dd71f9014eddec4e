// Device addressing.
//
// The operator supplies a bare host (IP or hostname, optionally with an
// HTTP port). Both device surfaces are derived from it: the pull endpoint
// `http://<host[:port]>/data` and the push channel `ws://<host>:<push_port>/`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// Validated device address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceAddress {
    raw: String,
    host: String,
    port: Option<u16>,
}

impl DeviceAddress {
    /// Host part, bracketed for IPv6 literals.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit HTTP port, if one was given (and it wasn't 80).
    pub fn http_port(&self) -> Option<u16> {
        self.port
    }

    /// Address exactly as the operator entered it (trimmed).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `http://<host[:port]>/data`
    pub fn data_url(&self) -> Result<Url, Error> {
        let authority = match self.port {
            Some(p) => format!("{}:{p}", self.host),
            None => self.host.clone(),
        };
        Ok(Url::parse(&format!("http://{authority}/data"))?)
    }

    /// `ws://<host>:<push_port>/`
    pub fn push_url(&self, push_port: u16) -> Result<Url, Error> {
        Ok(Url::parse(&format!("ws://{}:{push_port}/", self.host))?)
    }
}

impl FromStr for DeviceAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = |reason: &str| Error::InvalidAddress {
            address: s.to_owned(),
            reason: reason.to_owned(),
        };

        if trimmed.is_empty() {
            return Err(invalid("address is empty"));
        }
        if trimmed.contains("://") {
            return Err(invalid("expected a bare host or IP, without a scheme"));
        }
        if trimmed.contains(['/', '?', '#', '@']) || trimmed.chars().any(char::is_whitespace) {
            return Err(invalid("expected host[:port] only"));
        }

        let url = Url::parse(&format!("http://{trimmed}/")).map_err(|e| invalid(&e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host"))?
            .to_owned();

        Ok(Self {
            raw: trimmed.to_owned(),
            host,
            port: url.port(),
        })
    }
}

impl TryFrom<String> for DeviceAddress {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceAddress> for String {
    fn from(addr: DeviceAddress) -> Self {
        addr.raw
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::transport::DEFAULT_PUSH_PORT;

    #[test]
    fn builds_both_device_urls_from_ip() {
        let addr: DeviceAddress = "192.168.70.37".parse().unwrap();
        assert_eq!(addr.data_url().unwrap().as_str(), "http://192.168.70.37/data");
        assert_eq!(
            addr.push_url(DEFAULT_PUSH_PORT).unwrap().as_str(),
            "ws://192.168.70.37:81/"
        );
    }

    #[test]
    fn explicit_http_port_only_applies_to_pull() {
        let addr: DeviceAddress = "tank.local:8080".parse().unwrap();
        assert_eq!(addr.http_port(), Some(8080));
        assert_eq!(addr.data_url().unwrap().as_str(), "http://tank.local:8080/data");
        assert_eq!(addr.push_url(81).unwrap().as_str(), "ws://tank.local:81/");
    }

    #[test]
    fn ipv6_literal_keeps_brackets() {
        let addr: DeviceAddress = "[fe80::1]".parse().unwrap();
        assert_eq!(addr.host(), "[fe80::1]");
        assert_eq!(addr.push_url(81).unwrap().as_str(), "ws://[fe80::1]:81/");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let addr: DeviceAddress = "  10.0.0.5 ".parse().unwrap();
        assert_eq!(addr.to_string(), "10.0.0.5");
    }

    #[test]
    fn rejects_empty_scheme_and_path() {
        for bad in ["", "   ", "http://10.0.0.5", "10.0.0.5/data", "a b", "user@host"] {
            assert!(
                matches!(bad.parse::<DeviceAddress>(), Err(Error::InvalidAddress { .. })),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn serde_round_trips_through_plain_string() {
        let addr: DeviceAddress = serde_json::from_str("\"10.0.0.5\"").unwrap();
        assert_eq!(serde_json::to_string(&addr).unwrap(), "\"10.0.0.5\"");
        assert!(serde_json::from_str::<DeviceAddress>("\"ws://x\"").is_err());
    }
}
