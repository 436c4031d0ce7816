//! Client configuration and server-list parsing.

use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// Default memcached port.
pub const DEFAULT_PORT: u16 = 11211;

/// Configuration for a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Cache server addresses: `"host"`, `"host:port"` or `"host:port:weight"`.
    /// Port defaults to 11211, weight to 1.
    pub servers: Vec<String>,
    /// Optional prefix applied to every wire key as `"{namespace}:{key}"`.
    pub namespace: Option<String>,
    /// Reject mutating operations before any network I/O.
    pub readonly: bool,
    /// Wall-clock bound on awaiting a server response. Zero disables the
    /// bound.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            servers: vec!["127.0.0.1:11211".to_string()],
            namespace: None,
            readonly: false,
            request_timeout: Duration::from_secs(1),
        }
    }
}

/// A validated server entry: identity plus its share of the bucket ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSpec {
    host: String,
    port: u16,
    weight: u32,
}

impl ServerSpec {
    /// Build a spec, rejecting an empty host, port 0, or weight 0.
    pub fn new(host: impl Into<String>, port: u16, weight: u32) -> Result<Self, Error> {
        let host = host.into();
        if host.is_empty() {
            return Err(Error::Usage("server host must not be empty".into()));
        }
        if port == 0 {
            return Err(Error::Usage(format!("server {host} has port 0")));
        }
        if weight == 0 {
            return Err(Error::Usage(format!("server {host}:{port} has weight 0")));
        }
        Ok(Self { host, port, weight })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }
}

impl FromStr for ServerSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let mut parts = s.split(':');
        let host = parts.next().unwrap_or("");
        let port = match parts.next() {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| Error::Usage(format!("bad port in server spec {s:?}")))?,
            None => DEFAULT_PORT,
        };
        let weight = match parts.next() {
            Some(w) => w
                .parse::<u32>()
                .map_err(|_| Error::Usage(format!("bad weight in server spec {s:?}")))?,
            None => 1,
        };
        if parts.next().is_some() {
            return Err(Error::Usage(format!("malformed server spec {s:?}")));
        }
        ServerSpec::new(host, port, weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_spec() {
        let spec: ServerSpec = "cache1.internal:11212:3".parse().unwrap();
        assert_eq!(spec.host(), "cache1.internal");
        assert_eq!(spec.port(), 11212);
        assert_eq!(spec.weight(), 3);
    }

    #[test]
    fn port_and_weight_default() {
        let spec: ServerSpec = "cache1.internal".parse().unwrap();
        assert_eq!(spec.port(), DEFAULT_PORT);
        assert_eq!(spec.weight(), 1);

        let spec: ServerSpec = "cache1.internal:11213".parse().unwrap();
        assert_eq!(spec.port(), 11213);
        assert_eq!(spec.weight(), 1);
    }

    #[test]
    fn rejects_bad_specs() {
        for bad in ["", ":11211", "host:0", "host:port", "host:11211:0", "host:11211:1:x"] {
            assert!(
                matches!(bad.parse::<ServerSpec>(), Err(Error::Usage(_))),
                "expected usage error for {bad:?}"
            );
        }
    }
}
