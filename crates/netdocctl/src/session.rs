//! Diagnostic session state
//!
//! Holds the last run and the last remediation outcomes. A new run
//! replaces the previous one in full.

use anyhow::{Context, Result};
use netdoc_common::{
    report, ActionOutcome, CommandRunner, DiagnosticLogger, FanoutLogger, FileLogger,
    NetDocConfig, NetworkBackend, ProbeRunner, RemediationCommands, RemediationDecision,
    RemediationExecutor, RuleEngine, Run, SystemCommandRunner, SystemNetworkBackend, TestProfile,
    TracingLogger,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Result of an Auto-Fix request
#[derive(Debug, Clone)]
pub struct FixReport {
    pub decision: RemediationDecision,
    pub outcomes: Vec<ActionOutcome>,
}

pub struct Session {
    config: NetDocConfig,
    runner: ProbeRunner,
    engine: RuleEngine,
    executor: RemediationExecutor,
    last_run: Option<Run>,
    last_outcomes: Vec<ActionOutcome>,
}

impl Session {
    /// Session wired to the real network and OS
    pub fn new(config: NetDocConfig) -> Result<Self> {
        let backend = SystemNetworkBackend::new().context("Failed to set up network backend")?;
        let logger = build_logger(&config);
        Ok(Self::with_parts(
            config,
            Arc::new(backend),
            Arc::new(SystemCommandRunner),
            logger,
        ))
    }

    pub fn with_parts(
        config: NetDocConfig,
        backend: Arc<dyn NetworkBackend>,
        command_runner: Arc<dyn CommandRunner>,
        logger: Arc<dyn DiagnosticLogger>,
    ) -> Self {
        let runner = ProbeRunner::from_config(backend, &config).logger(logger.clone());
        let engine = RuleEngine::new(config.remediation.gateway_policy);
        let executor = RemediationExecutor::new(
            command_runner,
            RemediationCommands::from_config(&config.remediation),
            logger,
        )
        .dry_run(config.remediation.dry_run);

        Self {
            config,
            runner,
            engine,
            executor,
            last_run: None,
            last_outcomes: Vec::new(),
        }
    }

    pub fn config(&self) -> &NetDocConfig {
        &self.config
    }

    pub fn last_run(&self) -> Option<&Run> {
        self.last_run.as_ref()
    }

    pub fn last_outcomes(&self) -> &[ActionOutcome] {
        &self.last_outcomes
    }

    /// Blank domains fall back to the configured default domain
    fn effective_domain(&self, domain: Option<&str>) -> String {
        match domain.map(str::trim) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => self.config.probes.default_domain.clone(),
        }
    }

    /// Run a profile and replace the previous run
    pub async fn run_test(&mut self, profile: TestProfile, domain: Option<&str>) -> Result<&Run> {
        let domain = self.effective_domain(domain);
        let run = self
            .runner
            .run(profile, Some(&domain))
            .await
            .context("Diagnostic run aborted")?;
        self.last_outcomes.clear();
        Ok(&*self.last_run.insert(run))
    }

    /// Decide and apply remediation for the last run
    pub async fn auto_fix(&mut self) -> FixReport {
        let decision = self.engine.decide(self.last_run.as_ref());
        info!("Auto-Fix: {}", decision.message());

        let outcomes = match decision.plan() {
            Some(plan) => self.executor.execute(plan).await,
            None => Vec::new(),
        };
        self.last_outcomes = outcomes.clone();
        FixReport { decision, outcomes }
    }

    /// Write the last run (and any remediation outcomes) as HTML
    pub fn export_html(&self, path: Option<&Path>) -> Result<PathBuf> {
        let run = self
            .last_run
            .as_ref()
            .context("No prior run to export. Run a diagnostic test first.")?;
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(report::default_file_name(run, "html")));
        let outcomes = if self.last_outcomes.is_empty() {
            None
        } else {
            Some(self.last_outcomes.as_slice())
        };
        report::write_html(run, outcomes, &path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        Ok(path)
    }

    pub fn export_json(&self, path: &Path) -> Result<()> {
        let run = self
            .last_run
            .as_ref()
            .context("No prior run to export. Run a diagnostic test first.")?;
        report::write_json(run, path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        Ok(())
    }
}

fn build_logger(config: &NetDocConfig) -> Arc<dyn DiagnosticLogger> {
    let mut fanout = FanoutLogger::new().with(Arc::new(TracingLogger));
    if let Some(path) = &config.logging.log_file {
        fanout = fanout.with(Arc::new(FileLogger::new(path)));
    }
    Arc::new(fanout)
}
