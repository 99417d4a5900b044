//! Real network backend
//!
//! Interface and route inventory come from iproute2 (`ip -o link show`,
//! `ip route show default`), echo uses `ping`, HTTP goes through reqwest
//! and name resolution through the system resolver.

use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::backend::{
    BackendError, BackendResult, DnsRecord, HttpMethod, InterfaceStatus, NetworkBackend,
};
use crate::error::{NetDocError, Result};

const USER_AGENT: &str = concat!("netdoc/", env!("CARGO_PKG_VERSION"));

/// Backend that talks to the real OS and network
pub struct SystemNetworkBackend {
    client: reqwest::Client,
}

impl SystemNetworkBackend {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NetDocError::Backend(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { client })
    }
}

/// Run a command, bounded by `timeout`
async fn run_command(program: &str, args: &[&str], timeout: Duration) -> BackendResult<Output> {
    debug!("Executing: {} {}", program, args.join(" "));

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(timeout, child).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(BackendError::Command(format!("{}: {}", program, e))),
        Err(_) => Err(BackendError::Timeout(timeout)),
    }
}

/// Parse one line of `ip -o link show`
pub(crate) fn parse_link_line(line: &str) -> Option<InterfaceStatus> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        return None;
    }

    // "veth12ab@if7:" -> "veth12ab"
    let name = parts[1].trim_end_matches(':');
    let name = name.split('@').next().unwrap_or(name);
    if name.is_empty() {
        return None;
    }

    let state = parts
        .iter()
        .position(|p| *p == "state")
        .and_then(|i| parts.get(i + 1))
        .copied()
        .unwrap_or("UNKNOWN");

    let mut iface = InterfaceStatus::new(name, state);
    if parts[2].contains("LOOPBACK") || line.contains("link/loopback") {
        iface.is_loopback = true;
    }
    Some(iface)
}

/// Extract gateway addresses from `ip route show default` output.
/// IPv6 link-local gateways keep their interface as a `%dev` scope,
/// without it they cannot be pinged.
pub(crate) fn parse_default_routes(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let words: Vec<&str> = line.split_whitespace().collect();
            let gw = match words.as_slice() {
                ["default", "via", gw, ..] => *gw,
                _ => return None,
            };
            if !is_link_local_v6(gw) || gw.contains('%') {
                return Some(gw.to_string());
            }
            let dev = words
                .windows(2)
                .find(|pair| pair[0] == "dev")
                .map(|pair| pair[1]);
            match dev {
                Some(dev) => Some(format!("{}%{}", gw, dev)),
                None => {
                    debug!("Skipping unscoped link-local gateway {}", gw);
                    None
                }
            }
        })
        .collect()
}

fn is_link_local_v6(addr: &str) -> bool {
    addr.get(..4)
        .map(|prefix| prefix.eq_ignore_ascii_case("fe80"))
        .unwrap_or(false)
        && addr.contains(':')
}

#[async_trait]
impl NetworkBackend for SystemNetworkBackend {
    async fn interfaces(&self, timeout: Duration) -> BackendResult<Vec<InterfaceStatus>> {
        let output = run_command("ip", &["-o", "link", "show"], timeout).await?;
        if !output.status.success() {
            return Err(BackendError::Command(format!(
                "ip link show: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(parse_link_line).collect())
    }

    async fn default_gateways(&self, timeout: Duration) -> BackendResult<Vec<String>> {
        let v4 = run_command("ip", &["route", "show", "default"], timeout).await?;
        if !v4.status.success() {
            return Err(BackendError::Command(format!(
                "ip route show: {}",
                String::from_utf8_lossy(&v4.stderr).trim()
            )));
        }
        let mut gateways = parse_default_routes(&String::from_utf8_lossy(&v4.stdout));

        // IPv6 routes are optional; hosts without IPv6 just report nothing
        match run_command("ip", &["-6", "route", "show", "default"], timeout).await {
            Ok(v6) if v6.status.success() => {
                gateways.extend(parse_default_routes(&String::from_utf8_lossy(&v6.stdout)));
            }
            Ok(_) => {}
            Err(e) => debug!("IPv6 route lookup skipped: {}", e),
        }

        Ok(gateways)
    }

    async fn echo(&self, host: &str, timeout: Duration) -> BackendResult<bool> {
        let wait = timeout.as_secs().max(1).to_string();
        // ping enforces -W itself; the outer bound covers a hung process
        let output = run_command(
            "ping",
            &["-c", "1", "-W", &wait, host],
            timeout + Duration::from_secs(1),
        )
        .await?;
        Ok(output.status.success())
    }

    async fn fetch_text(&self, url: &str, timeout: Duration) -> BackendResult<String> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| http_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Http(format!("{} returned {}", url, status)));
        }

        response.text().await.map_err(|e| http_error(e, timeout))
    }

    async fn resolve(&self, domain: &str, timeout: Duration) -> BackendResult<Vec<DnsRecord>> {
        let lookup = tokio::net::lookup_host((domain, 0));
        let addrs = match tokio::time::timeout(timeout, lookup).await {
            Ok(Ok(addrs)) => addrs,
            Ok(Err(e)) => return Err(BackendError::Resolve(e.to_string())),
            Err(_) => return Err(BackendError::Timeout(timeout)),
        };

        let mut records: Vec<DnsRecord> = Vec::new();
        for addr in addrs {
            let record = DnsRecord::from(addr.ip());
            if !records.contains(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn http_status(
        &self,
        method: HttpMethod,
        url: &str,
        timeout: Duration,
    ) -> BackendResult<u16> {
        let method = match method {
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Get => reqwest::Method::GET,
        };

        let response = self
            .client
            .request(method, url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| http_error(e, timeout))?;

        Ok(response.status().as_u16())
    }
}

fn http_error(e: reqwest::Error, timeout: Duration) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout(timeout)
    } else {
        BackendError::Http(e.to_string())
    }
}
