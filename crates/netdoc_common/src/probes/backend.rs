//! Network access seam used by the probes
//!
//! Production code uses `SystemNetworkBackend`, which shells out to `ip`
//! and `ping` and talks HTTP through reqwest. Tests use
//! `FakeNetworkBackend` with pre-configured answers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use thiserror::Error;

/// Failure inside a backend call. Probes turn these into failed results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("command failed: {0}")]
    Command(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("resolver error: {0}")]
    Resolve(String),

    #[error("{0}")]
    Other(String),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Link state of one local interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceStatus {
    pub name: String,
    /// Operational state as reported by the OS (UP, DOWN, DORMANT, UNKNOWN...)
    pub state: String,
    pub is_loopback: bool,
}

impl InterfaceStatus {
    pub fn new(name: &str, state: &str) -> Self {
        Self {
            name: name.to_string(),
            state: state.to_string(),
            is_loopback: name == "lo",
        }
    }

    pub fn is_up(&self) -> bool {
        self.state.eq_ignore_ascii_case("up")
    }
}

/// A record returned by name resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DnsRecord {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Other { record_type: String, data: String },
}

impl DnsRecord {
    pub fn address(&self) -> Option<IpAddr> {
        match self {
            DnsRecord::A(ip) => Some(IpAddr::V4(*ip)),
            DnsRecord::Aaaa(ip) => Some(IpAddr::V6(*ip)),
            DnsRecord::Other { .. } => None,
        }
    }

    pub fn record_type(&self) -> &str {
        match self {
            DnsRecord::A(_) => "A",
            DnsRecord::Aaaa(_) => "AAAA",
            DnsRecord::Other { record_type, .. } => record_type,
        }
    }
}

impl From<IpAddr> for DnsRecord {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => DnsRecord::A(v4),
            IpAddr::V6(v6) => DnsRecord::Aaaa(v6),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Head,
    Get,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Head => "HEAD",
            HttpMethod::Get => "GET",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the probes need from the OS and the network.
/// Every call must honour the timeout it is given.
#[async_trait]
pub trait NetworkBackend: Send + Sync {
    /// Local interfaces with their operational state
    async fn interfaces(&self, timeout: Duration) -> BackendResult<Vec<InterfaceStatus>>;

    /// Configured default gateways, possibly with duplicates
    async fn default_gateways(&self, timeout: Duration) -> BackendResult<Vec<String>>;

    /// Send one echo request; `Ok(true)` if it was answered
    async fn echo(&self, host: &str, timeout: Duration) -> BackendResult<bool>;

    /// GET a URL and return the body as text
    async fn fetch_text(&self, url: &str, timeout: Duration) -> BackendResult<String>;

    /// Resolve a domain name
    async fn resolve(&self, domain: &str, timeout: Duration) -> BackendResult<Vec<DnsRecord>>;

    /// Issue a request and return the status code
    async fn http_status(
        &self,
        method: HttpMethod,
        url: &str,
        timeout: Duration,
    ) -> BackendResult<u16>;
}
