//! Configuration management for NetDoc.
//!
//! Loads settings from /etc/netdoc/config.toml, then the user config
//! directory, or falls back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{NetDocError, Result};
use crate::probes::{DEFAULT_EXTERNAL_IP_FALLBACK, DEFAULT_EXTERNAL_IP_PRIMARY};
use crate::remediation::CommandSpec;
use crate::rules::GatewayPolicy;
use crate::types::DEFAULT_DOMAIN;

/// System-wide config file path
pub const CONFIG_PATH: &str = "/etc/netdoc/config.toml";

/// Per-user config path relative to the XDG config dir
pub const USER_CONFIG_FILE: &str = "netdoc/config.toml";

/// Probe endpoints and timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Domain used when none is supplied
    #[serde(default = "default_domain")]
    pub default_domain: String,

    /// URL for the web access probe (defaults to https://<domain>)
    #[serde(default)]
    pub web_url: Option<String>,

    #[serde(default = "default_external_ip_primary")]
    pub external_ip_primary: String,

    #[serde(default = "default_external_ip_fallback")]
    pub external_ip_fallback: String,

    /// HEAD request timeout in seconds
    #[serde(default = "default_head_timeout")]
    pub http_head_timeout_secs: u64,

    /// GET fallback timeout in seconds
    #[serde(default = "default_get_timeout")]
    pub http_get_timeout_secs: u64,

    #[serde(default = "default_external_ip_timeout")]
    pub external_ip_timeout_secs: u64,

    #[serde(default = "default_dns_timeout")]
    pub dns_timeout_secs: u64,

    /// Wait per echo request
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_secs: u64,

    /// Timeout for `ip` inventory commands
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Hard upper bound for a whole probe
    #[serde(default = "default_probe_deadline")]
    pub probe_deadline_secs: u64,
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_external_ip_primary() -> String {
    DEFAULT_EXTERNAL_IP_PRIMARY.to_string()
}

fn default_external_ip_fallback() -> String {
    DEFAULT_EXTERNAL_IP_FALLBACK.to_string()
}

fn default_head_timeout() -> u64 {
    5
}

fn default_get_timeout() -> u64 {
    10
}

fn default_external_ip_timeout() -> u64 {
    5
}

fn default_dns_timeout() -> u64 {
    5
}

fn default_ping_timeout() -> u64 {
    2
}

fn default_command_timeout() -> u64 {
    5
}

fn default_probe_deadline() -> u64 {
    30
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            default_domain: default_domain(),
            web_url: None,
            external_ip_primary: default_external_ip_primary(),
            external_ip_fallback: default_external_ip_fallback(),
            http_head_timeout_secs: default_head_timeout(),
            http_get_timeout_secs: default_get_timeout(),
            external_ip_timeout_secs: default_external_ip_timeout(),
            dns_timeout_secs: default_dns_timeout(),
            ping_timeout_secs: default_ping_timeout(),
            command_timeout_secs: default_command_timeout(),
            probe_deadline_secs: default_probe_deadline(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Run probes concurrently instead of one after another
    #[serde(default)]
    pub concurrent: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemediationConfig {
    #[serde(default)]
    pub gateway_policy: GatewayPolicy,

    /// Show commands without running them
    #[serde(default)]
    pub dry_run: bool,

    /// Overrides the platform default DNS flush commands
    #[serde(default)]
    pub flush_dns_commands: Option<Vec<CommandSpec>>,

    /// Overrides the platform default IP renewal commands
    #[serde(default)]
    pub renew_ip_commands: Option<Vec<CommandSpec>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// JSON-lines diagnostic log; disabled when unset
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetDocConfig {
    #[serde(default)]
    pub probes: ProbeConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub remediation: RemediationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NetDocConfig {
    /// Load from an explicit path, or search the default locations
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        let mut candidates = vec![PathBuf::from(CONFIG_PATH)];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join(USER_CONFIG_FILE));
        }

        for path in &candidates {
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        warn!("Config not found, using defaults");
        Ok(Self::default())
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| NetDocError::Config(format!("{}: {}", path.display(), e)))?;
        let config: NetDocConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save config to path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        let p = &self.probes;
        let timeouts = [
            ("http_head_timeout_secs", p.http_head_timeout_secs),
            ("http_get_timeout_secs", p.http_get_timeout_secs),
            ("external_ip_timeout_secs", p.external_ip_timeout_secs),
            ("dns_timeout_secs", p.dns_timeout_secs),
            ("ping_timeout_secs", p.ping_timeout_secs),
            ("command_timeout_secs", p.command_timeout_secs),
            ("probe_deadline_secs", p.probe_deadline_secs),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(NetDocError::Config(format!("probes.{} must be > 0", name)));
            }
        }

        for commands in [
            &self.remediation.flush_dns_commands,
            &self.remediation.renew_ip_commands,
        ]
        .into_iter()
        .flatten()
        {
            if commands.iter().any(|c| c.program.trim().is_empty()) {
                return Err(NetDocError::Config(
                    "remediation commands need a program".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = NetDocConfig::default();
        assert_eq!(config.probes.default_domain, "google.com");
        assert_eq!(config.probes.http_head_timeout_secs, 5);
        assert_eq!(config.probes.http_get_timeout_secs, 10);
        assert!(!config.runner.concurrent);
        assert_eq!(config.remediation.gateway_policy, GatewayPolicy::Strict);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let toml = r#"
[runner]
concurrent = true

[remediation]
gateway_policy = "advisory"
renew_ip_commands = [{ program = "dhclient", args = ["-r"] }, { program = "dhclient" }]
"#;
        let config: NetDocConfig = toml::from_str(toml).unwrap();
        assert!(config.runner.concurrent);
        assert_eq!(config.remediation.gateway_policy, GatewayPolicy::Advisory);
        assert_eq!(config.probes.dns_timeout_secs, 5);
        let renew = config.remediation.renew_ip_commands.unwrap();
        assert_eq!(renew.len(), 2);
        assert!(renew[1].args.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("netdoc").join("config.toml");
        let mut config = NetDocConfig::default();
        config.probes.default_domain = "archlinux.org".to_string();
        config.save(&path).unwrap();

        let loaded = NetDocConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.probes.default_domain, "archlinux.org");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[probes]\ndns_timeout_secs = 0\n").unwrap();
        let err = NetDocConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(err, NetDocError::Config(_)));
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let err = NetDocConfig::load(Some(Path::new("/nonexistent/netdoc.toml"))).unwrap_err();
        assert!(matches!(err, NetDocError::Config(_)));
    }
}
