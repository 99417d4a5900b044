//! Connectivity probes
//!
//! Each probe turns one category-specific check into exactly one
//! `ProbeResult`. Backend errors are folded into failed results here and
//! never reach the runner.

mod backend;
mod fake;
mod system;

pub use backend::{
    BackendError, BackendResult, DnsRecord, HttpMethod, InterfaceStatus, NetworkBackend,
};
pub use fake::{FakeNetworkBackend, FakeNetworkBackendBuilder};
pub use system::SystemNetworkBackend;

use std::time::Duration;
use tracing::debug;

use crate::config::ProbeConfig;
use crate::types::{ProbeCategory, ProbeResult, TARGET_NONE};

/// Echo requests sent per gateway before declaring it unreachable
pub const ECHO_ATTEMPTS: usize = 2;

pub const DEFAULT_EXTERNAL_IP_PRIMARY: &str = "https://api.ipify.org";
pub const DEFAULT_EXTERNAL_IP_FALLBACK: &str = "https://ifconfig.me/ip";

/// Timeouts and endpoints used by the probes
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub head_timeout: Duration,
    pub get_timeout: Duration,
    pub external_ip_timeout: Duration,
    pub dns_timeout: Duration,
    pub ping_timeout: Duration,
    pub command_timeout: Duration,
    pub external_ip_primary: String,
    pub external_ip_fallback: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self::from(&ProbeConfig::default())
    }
}

impl From<&ProbeConfig> for ProbeSettings {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            head_timeout: Duration::from_secs(config.http_head_timeout_secs),
            get_timeout: Duration::from_secs(config.http_get_timeout_secs),
            external_ip_timeout: Duration::from_secs(config.external_ip_timeout_secs),
            dns_timeout: Duration::from_secs(config.dns_timeout_secs),
            ping_timeout: Duration::from_secs(config.ping_timeout_secs),
            command_timeout: Duration::from_secs(config.command_timeout_secs),
            external_ip_primary: config.external_ip_primary.clone(),
            external_ip_fallback: config.external_ip_fallback.clone(),
        }
    }
}

/// Inputs shared by every probe of one run
#[derive(Debug, Clone)]
pub struct ProbeContext {
    pub domain: String,
    pub web_url: String,
    pub settings: ProbeSettings,
}

impl ProbeContext {
    /// Build a context; the web URL defaults to `https://<domain>`
    pub fn new(domain: &str, web_url: Option<&str>, settings: ProbeSettings) -> Self {
        let web_url = match web_url.map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!("https://{}", domain),
        };
        Self {
            domain: domain.to_string(),
            web_url,
            settings,
        }
    }

    /// What a probe of this category examines
    pub fn target_for(&self, category: ProbeCategory) -> String {
        match category {
            ProbeCategory::DnsResolution => self.domain.clone(),
            ProbeCategory::WebAccess => self.web_url.clone(),
            ProbeCategory::AdapterState
            | ProbeCategory::GatewayReachability
            | ProbeCategory::ExternalIp => TARGET_NONE.to_string(),
        }
    }
}

/// Run the probe for one category
pub async fn run_probe(
    category: ProbeCategory,
    backend: &dyn NetworkBackend,
    ctx: &ProbeContext,
) -> ProbeResult {
    match category {
        ProbeCategory::AdapterState => check_adapters(backend, &ctx.settings).await,
        ProbeCategory::GatewayReachability => check_gateways(backend, &ctx.settings).await,
        ProbeCategory::ExternalIp => check_external_ip(backend, &ctx.settings).await,
        ProbeCategory::DnsResolution => check_dns(backend, &ctx.domain, &ctx.settings).await,
        ProbeCategory::WebAccess => check_web(backend, &ctx.web_url, &ctx.settings).await,
    }
}

/// Pass iff at least one non-loopback interface is up
pub async fn check_adapters(backend: &dyn NetworkBackend, settings: &ProbeSettings) -> ProbeResult {
    let category = ProbeCategory::AdapterState;

    let interfaces = match backend.interfaces(settings.command_timeout).await {
        Ok(list) => list,
        Err(e) => {
            return ProbeResult::fail(
                category,
                TARGET_NONE,
                format!("Unable to enumerate network interfaces: {}", e),
            )
        }
    };

    let interfaces: Vec<InterfaceStatus> =
        interfaces.into_iter().filter(|i| !i.is_loopback).collect();
    if interfaces.is_empty() {
        return ProbeResult::fail(category, TARGET_NONE, "No network interfaces found");
    }

    let up: Vec<&str> = interfaces
        .iter()
        .filter(|i| i.is_up())
        .map(|i| i.name.as_str())
        .collect();

    if up.is_empty() {
        let states = interfaces
            .iter()
            .map(|i| format!("{}: {}", i.name, i.state))
            .collect::<Vec<_>>()
            .join(", ");
        let names = interfaces
            .iter()
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return ProbeResult::fail(category, names, format!("No interface is up ({})", states));
    }

    ProbeResult::pass(
        category,
        up.join(", "),
        format!(
            "{} of {} interface(s) up: {}",
            up.len(),
            interfaces.len(),
            up.join(", ")
        ),
    )
}

/// Pass iff every default gateway answers one of `ECHO_ATTEMPTS` echoes
pub async fn check_gateways(backend: &dyn NetworkBackend, settings: &ProbeSettings) -> ProbeResult {
    let category = ProbeCategory::GatewayReachability;

    let configured = match backend.default_gateways(settings.command_timeout).await {
        Ok(list) => list,
        Err(e) => {
            return ProbeResult::fail(
                category,
                TARGET_NONE,
                format!("Unable to read default gateways: {}", e),
            )
        }
    };

    let mut gateways: Vec<String> = Vec::new();
    for gw in configured {
        let gw = gw.trim().to_string();
        if !gw.is_empty() && !gateways.contains(&gw) {
            gateways.push(gw);
        }
    }

    if gateways.is_empty() {
        return ProbeResult::fail(category, TARGET_NONE, "No default gateway configured");
    }

    let mut reachability = Vec::with_capacity(gateways.len());
    for gw in &gateways {
        reachability.push((gw.as_str(), echo_any(backend, gw, settings.ping_timeout).await));
    }

    let target = gateways.join(", ");
    let detail = reachability
        .iter()
        .map(|(gw, ok)| format!("{}: reachable={}", gw, ok))
        .collect::<Vec<_>>()
        .join(", ");

    if reachability.iter().all(|(_, ok)| *ok) {
        ProbeResult::pass(category, target, detail)
    } else {
        ProbeResult::fail(category, target, detail)
    }
}

async fn echo_any(backend: &dyn NetworkBackend, host: &str, timeout: Duration) -> bool {
    for attempt in 1..=ECHO_ATTEMPTS {
        match backend.echo(host, timeout).await {
            Ok(true) => return true,
            Ok(false) => debug!("Echo {} to {} unanswered", attempt, host),
            Err(e) => debug!("Echo {} to {} failed: {}", attempt, host, e),
        }
    }
    false
}

/// Pass iff the primary or the single fallback service returns an IP
pub async fn check_external_ip(
    backend: &dyn NetworkBackend,
    settings: &ProbeSettings,
) -> ProbeResult {
    let category = ProbeCategory::ExternalIp;

    for url in [&settings.external_ip_primary, &settings.external_ip_fallback] {
        match backend.fetch_text(url, settings.external_ip_timeout).await {
            Ok(body) if !body.trim().is_empty() => {
                let ip = body.trim();
                return ProbeResult::pass(category, url.as_str(), format!("External IP: {}", ip));
            }
            Ok(_) => debug!("External IP service {} returned an empty body", url),
            Err(e) => debug!("External IP service {} failed: {}", url, e),
        }
    }

    ProbeResult::fail(
        category,
        format!(
            "{}, {}",
            settings.external_ip_primary, settings.external_ip_fallback
        ),
        "Unable to retrieve external IP",
    )
}

/// Pass iff the domain resolves to at least one A/AAAA record
pub async fn check_dns(
    backend: &dyn NetworkBackend,
    domain: &str,
    settings: &ProbeSettings,
) -> ProbeResult {
    let category = ProbeCategory::DnsResolution;

    let records = match backend.resolve(domain, settings.dns_timeout).await {
        Ok(records) => records,
        Err(e) => {
            return ProbeResult::fail(category, domain, format!("DNS resolution failed: {}", e))
        }
    };

    if records.is_empty() {
        return ProbeResult::fail(category, domain, "DNS resolution returned no records");
    }

    let addresses: Vec<String> = records
        .iter()
        .filter_map(|r| r.address())
        .map(|ip| ip.to_string())
        .collect();
    let other: Vec<&str> = records
        .iter()
        .filter(|r| r.address().is_none())
        .map(|r| r.record_type())
        .collect();

    if addresses.is_empty() {
        return ProbeResult::fail(
            category,
            domain,
            format!(
                "No A/AAAA records among {} returned record(s) ({})",
                records.len(),
                other.join(", ")
            ),
        );
    }

    let mut detail = format!("Resolved to {}", addresses.join(", "));
    if !other.is_empty() {
        detail.push_str(&format!(
            " (ignored {} non-address record(s): {})",
            other.len(),
            other.join(", ")
        ));
    }
    ProbeResult::pass(category, domain, detail)
}

fn status_ok(status: u16) -> bool {
    (200..400).contains(&status)
}

/// HEAD with a short timeout, then one GET with a longer timeout if HEAD did not succeed
pub async fn check_web(backend: &dyn NetworkBackend, url: &str, settings: &ProbeSettings) -> ProbeResult {
    let category = ProbeCategory::WebAccess;

    let head = backend
        .http_status(HttpMethod::Head, url, settings.head_timeout)
        .await;
    let head_note = match &head {
        Ok(status) if status_ok(*status) => {
            return ProbeResult::pass(category, url, format!("HTTP {} (HEAD)", status));
        }
        Ok(status) => format!("HEAD returned HTTP {}", status),
        Err(e) => format!("HEAD failed: {}", e),
    };
    debug!("{} for {}, retrying with GET", head_note, url);

    match backend
        .http_status(HttpMethod::Get, url, settings.get_timeout)
        .await
    {
        Ok(status) if status_ok(status) => {
            ProbeResult::pass(category, url, format!("HTTP {} (GET); {}", status, head_note))
        }
        Ok(status) => {
            ProbeResult::fail(category, url, format!("HTTP {} (GET); {}", status, head_note))
        }
        Err(e) => ProbeResult::fail(
            category,
            url,
            format!("Web request failed: {}; GET failed: {}", head_note, e),
        ),
    }
}
