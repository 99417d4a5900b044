//! Core data contract: probe categories, results, profiles and runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::NetDocError;

/// Sentinel target for probes that examined nothing
pub const TARGET_NONE: &str = "None";

/// Domain used when the caller leaves it unset or blank
pub const DEFAULT_DOMAIN: &str = "google.com";

/// The closed set of connectivity checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeCategory {
    AdapterState,
    GatewayReachability,
    ExternalIp,
    DnsResolution,
    WebAccess,
}

impl ProbeCategory {
    /// Every category in canonical execution order
    pub const ALL: [ProbeCategory; 5] = [
        ProbeCategory::AdapterState,
        ProbeCategory::GatewayReachability,
        ProbeCategory::ExternalIp,
        ProbeCategory::DnsResolution,
        ProbeCategory::WebAccess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeCategory::AdapterState => "adapter_state",
            ProbeCategory::GatewayReachability => "gateway_reachability",
            ProbeCategory::ExternalIp => "external_ip",
            ProbeCategory::DnsResolution => "dns_resolution",
            ProbeCategory::WebAccess => "web_access",
        }
    }

    /// Human-readable name used in tables and reports
    pub fn display_name(&self) -> &'static str {
        match self {
            ProbeCategory::AdapterState => "Network Adapter",
            ProbeCategory::GatewayReachability => "Default Gateway",
            ProbeCategory::ExternalIp => "External IP",
            ProbeCategory::DnsResolution => "DNS Resolution",
            ProbeCategory::WebAccess => "Web Access",
        }
    }
}

impl fmt::Display for ProbeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Named selection of probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestProfile {
    /// All five categories
    Full,
    /// Gateway, external IP and DNS only
    Basic,
}

impl TestProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestProfile::Full => "full",
            TestProfile::Basic => "basic",
        }
    }

    /// Categories run by this profile, in canonical order
    pub fn categories(&self) -> Vec<ProbeCategory> {
        ProbeCategory::ALL
            .iter()
            .copied()
            .filter(|category| self.includes(*category))
            .collect()
    }

    pub fn includes(&self, category: ProbeCategory) -> bool {
        match self {
            TestProfile::Full => true,
            TestProfile::Basic => matches!(
                category,
                ProbeCategory::GatewayReachability
                    | ProbeCategory::ExternalIp
                    | ProbeCategory::DnsResolution
            ),
        }
    }
}

impl fmt::Display for TestProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestProfile {
    type Err = NetDocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(TestProfile::Full),
            "basic" => Ok(TestProfile::Basic),
            other => Err(NetDocError::InvalidProfile(other.to_string())),
        }
    }
}

/// Apply the default domain to a blank or missing value
pub fn normalize_domain(domain: Option<&str>) -> String {
    match domain.map(str::trim) {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => DEFAULT_DOMAIN.to_string(),
    }
}

/// Outcome of exactly one probe invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    category: ProbeCategory,
    success: bool,
    detail: String,
    target: String,
    timestamp: DateTime<Utc>,
}

impl ProbeResult {
    pub fn pass(category: ProbeCategory, target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(category, true, target, detail)
    }

    pub fn fail(category: ProbeCategory, target: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(category, false, target, detail)
    }

    fn new(
        category: ProbeCategory,
        success: bool,
        target: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        let target = target.into();
        Self {
            category,
            success,
            detail: detail.into(),
            target: if target.trim().is_empty() {
                TARGET_NONE.to_string()
            } else {
                target
            },
            timestamp: Utc::now(),
        }
    }

    pub fn category(&self) -> ProbeCategory {
        self.category
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn status_symbol(&self) -> &'static str {
        if self.success {
            "[OK]"
        } else {
            "[FAIL]"
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "{} {} ({}) - {}",
            self.status_symbol(),
            self.category.display_name(),
            self.target,
            self.detail
        )
    }
}

/// Ordered results of one runner invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    id: Uuid,
    profile: TestProfile,
    domain: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    results: Vec<ProbeResult>,
}

impl Run {
    /// Seal a completed set of results into a Run
    pub fn new(
        profile: TestProfile,
        domain: impl Into<String>,
        started_at: DateTime<Utc>,
        results: Vec<ProbeResult>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile,
            domain: domain.into(),
            started_at,
            finished_at: Utc::now(),
            results,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn profile(&self) -> TestProfile {
        self.profile
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn result_for(&self, category: ProbeCategory) -> Option<&ProbeResult> {
        self.results.iter().find(|r| r.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_categories_keep_canonical_order() {
        assert_eq!(TestProfile::Full.categories(), ProbeCategory::ALL.to_vec());
        assert_eq!(
            TestProfile::Basic.categories(),
            vec![
                ProbeCategory::GatewayReachability,
                ProbeCategory::ExternalIp,
                ProbeCategory::DnsResolution,
            ]
        );
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!("Full".parse::<TestProfile>().unwrap(), TestProfile::Full);
        assert_eq!(" basic ".parse::<TestProfile>().unwrap(), TestProfile::Basic);
        assert!(matches!(
            "quick".parse::<TestProfile>(),
            Err(NetDocError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_normalize_domain_defaults_blank() {
        assert_eq!(normalize_domain(None), "google.com");
        assert_eq!(normalize_domain(Some("   ")), "google.com");
        assert_eq!(normalize_domain(Some(" archlinux.org ")), "archlinux.org");
    }

    #[test]
    fn test_result_blank_target_becomes_sentinel() {
        let result = ProbeResult::fail(ProbeCategory::GatewayReachability, "", "no gateway");
        assert_eq!(result.target(), TARGET_NONE);
        assert!(!result.success());
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_string(&ProbeCategory::ExternalIp).unwrap();
        assert_eq!(json, "\"external_ip\"");
    }

    #[test]
    fn test_run_lookup_by_category() {
        let run = Run::new(
            TestProfile::Basic,
            "google.com",
            Utc::now(),
            vec![
                ProbeResult::pass(ProbeCategory::ExternalIp, "https://api.ipify.org", "203.0.113.7"),
                ProbeResult::fail(ProbeCategory::DnsResolution, "google.com", "NXDOMAIN"),
            ],
        );
        assert_eq!(run.len(), 2);
        assert!(run.result_for(ProbeCategory::DnsResolution).is_some());
        assert!(run.result_for(ProbeCategory::WebAccess).is_none());
    }
}
