//! Remediation executor
//!
//! Applies a plan in order. Every action is attempted even when an earlier
//! one failed, and each one yields its own `ActionOutcome`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::RemediationConfig;
use crate::logger::{DiagnosticLogger, LogLevel};
use crate::rules::{RemediationAction, RemediationPlan};

/// One OS command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.program)
        } else {
            write!(f, "{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Exit status and output of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Seam for running OS commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutput>;
}

/// Runs commands for real
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutput> {
        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Records commands and fails the ones it was told to fail
#[derive(Debug, Default)]
pub struct FakeCommandRunner {
    failing: Vec<String>,
    denied: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make this command line exit with status 1
    pub fn fail(mut self, command_line: &str) -> Self {
        self.failing.push(command_line.to_string());
        self
    }

    /// Make this command line fail to spawn with a permission error
    pub fn deny(mut self, command_line: &str) -> Self {
        self.denied.push(command_line.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeCommandRunner {
    async fn run(&self, command: &CommandSpec) -> std::io::Result<CommandOutput> {
        let line = command.to_string();
        self.calls.lock().unwrap().push(line.clone());

        if self.denied.contains(&line) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "requires elevation",
            ));
        }
        if self.failing.contains(&line) {
            return Ok(CommandOutput {
                success: false,
                exit_code: Some(1),
                stdout: String::new(),
                stderr: format!("{} failed", command.program),
            });
        }
        Ok(CommandOutput {
            success: true,
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

/// Commands behind each mutating action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationCommands {
    pub flush_dns: Vec<CommandSpec>,
    pub renew_ip: Vec<CommandSpec>,
}

impl RemediationCommands {
    /// Defaults for the platform this binary was built for
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self {
                flush_dns: vec![
                    CommandSpec::new("ipconfig", &["/flushdns"]),
                    CommandSpec::new("ipconfig", &["/registerdns"]),
                ],
                renew_ip: vec![
                    CommandSpec::new("ipconfig", &["/release"]),
                    CommandSpec::new("ipconfig", &["/renew"]),
                ],
            }
        } else {
            Self {
                flush_dns: vec![CommandSpec::new("resolvectl", &["flush-caches"])],
                renew_ip: vec![
                    CommandSpec::new("nmcli", &["networking", "off"]),
                    CommandSpec::new("nmcli", &["networking", "on"]),
                ],
            }
        }
    }

    /// Platform defaults with any configured overrides applied
    pub fn from_config(config: &RemediationConfig) -> Self {
        let mut commands = Self::platform_default();
        if let Some(flush) = &config.flush_dns_commands {
            commands.flush_dns = flush.clone();
        }
        if let Some(renew) = &config.renew_ip_commands {
            commands.renew_ip = renew.clone();
        }
        commands
    }

    pub fn commands_for(&self, action: RemediationAction) -> &[CommandSpec] {
        match action {
            RemediationAction::FlushAndReregisterDns => &self.flush_dns,
            RemediationAction::RenewIpConfiguration => &self.renew_ip,
            RemediationAction::AdviseAdapterRestart => &[],
        }
    }
}

impl Default for RemediationCommands {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Result of applying one action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: RemediationAction,
    pub success: bool,
    pub error: Option<String>,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl ActionOutcome {
    fn succeeded(action: RemediationAction, detail: String) -> Self {
        Self {
            action,
            success: true,
            error: None,
            detail,
            timestamp: Utc::now(),
        }
    }

    fn failed(action: RemediationAction, error: String, detail: String) -> Self {
        Self {
            action,
            success: false,
            error: Some(error),
            detail,
            timestamp: Utc::now(),
        }
    }

    pub fn status_symbol(&self) -> &'static str {
        if self.success {
            "[OK]"
        } else {
            "[FAIL]"
        }
    }

    pub fn format_summary(&self) -> String {
        match &self.error {
            Some(error) => format!(
                "{} {} - {}",
                self.status_symbol(),
                self.action.description(),
                error
            ),
            None => format!(
                "{} {} - {}",
                self.status_symbol(),
                self.action.description(),
                self.detail
            ),
        }
    }
}

pub const ADAPTER_ADVICE: &str =
    "Disable and re-enable the network adapter, or check the cable / Wi-Fi connection";

/// Applies remediation plans
pub struct RemediationExecutor {
    runner: Arc<dyn CommandRunner>,
    commands: RemediationCommands,
    logger: Arc<dyn DiagnosticLogger>,
    dry_run: bool,
}

impl RemediationExecutor {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        commands: RemediationCommands,
        logger: Arc<dyn DiagnosticLogger>,
    ) -> Self {
        Self {
            runner,
            commands,
            logger,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Apply every action of the plan, in plan order
    pub async fn execute(&self, plan: &RemediationPlan) -> Vec<ActionOutcome> {
        info!(
            "Applying {} remediation action(s), dry_run={}",
            plan.actions().len(),
            self.dry_run
        );

        let mut outcomes = Vec::with_capacity(plan.actions().len());
        for action in plan.actions() {
            let outcome = self.apply(*action).await;
            let level = if outcome.success {
                LogLevel::Info
            } else {
                LogLevel::Error
            };
            self.logger.log(&outcome.format_summary(), level, None);
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Apply one action; all of its commands run even if one fails
    pub async fn apply(&self, action: RemediationAction) -> ActionOutcome {
        if action.is_advisory() {
            return ActionOutcome::succeeded(action, ADAPTER_ADVICE.to_string());
        }

        let commands = self.commands.commands_for(action);
        if commands.is_empty() {
            return ActionOutcome::failed(
                action,
                "No commands configured for this action".to_string(),
                String::new(),
            );
        }

        if self.dry_run {
            let planned = commands
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            info!("[DRY-RUN] Would execute: {}", planned);
            return ActionOutcome::succeeded(action, format!("[dry-run] {}", planned));
        }

        let mut steps = Vec::new();
        let mut errors = Vec::new();
        for command in commands {
            info!("Executing: {}", command);
            match self.runner.run(command).await {
                Ok(output) if output.success => {
                    steps.push(format!("{} (success)", command));
                }
                Ok(output) => {
                    let reason = if output.stderr.is_empty() {
                        format!("exit code {}", output.exit_code.unwrap_or(-1))
                    } else {
                        output.stderr.clone()
                    };
                    warn!("{} failed: {}", command, reason);
                    steps.push(format!("{} failed", command));
                    errors.push(format!("{}: {}", command, reason));
                }
                Err(e) => {
                    warn!("Could not execute {}: {}", command, e);
                    steps.push(format!("{} not executed", command));
                    errors.push(format!("{}: {}", command, e));
                }
            }
        }

        let detail = steps.join("; ");
        if errors.is_empty() {
            ActionOutcome::succeeded(action, detail)
        } else {
            ActionOutcome::failed(action, errors.join("; "), detail)
        }
    }
}
