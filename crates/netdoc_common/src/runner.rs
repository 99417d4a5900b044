//! Probe runner
//!
//! Executes the probes of a profile in canonical order and seals the
//! results into a `Run`. Every probe runs in its own task under a hard
//! deadline, so a hung or panicking probe still produces a failed result.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info};

use crate::aggregate::RunSummary;
use crate::config::NetDocConfig;
use crate::error::{NetDocError, Result};
use crate::logger::{DiagnosticLogger, LogLevel, TracingLogger};
use crate::probes::{self, NetworkBackend, ProbeContext, ProbeSettings};
use crate::types::{normalize_domain, ProbeCategory, ProbeResult, Run, TestProfile};

/// How probes of one run are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One probe at a time
    #[default]
    Sequential,
    /// All probes at once, joined before the run is sealed
    Concurrent,
}

pub struct ProbeRunner {
    backend: Arc<dyn NetworkBackend>,
    settings: ProbeSettings,
    web_url: Option<String>,
    mode: ExecutionMode,
    deadline: Duration,
    logger: Arc<dyn DiagnosticLogger>,
}

impl ProbeRunner {
    pub fn new(backend: Arc<dyn NetworkBackend>) -> Self {
        Self {
            backend,
            settings: ProbeSettings::default(),
            web_url: None,
            mode: ExecutionMode::Sequential,
            deadline: Duration::from_secs(30),
            logger: Arc::new(TracingLogger),
        }
    }

    /// Runner configured from the loaded config file
    pub fn from_config(backend: Arc<dyn NetworkBackend>, config: &NetDocConfig) -> Self {
        let mode = if config.runner.concurrent {
            ExecutionMode::Concurrent
        } else {
            ExecutionMode::Sequential
        };
        Self::new(backend)
            .settings(ProbeSettings::from(&config.probes))
            .web_url(config.probes.web_url.clone())
            .mode(mode)
            .deadline(Duration::from_secs(config.probes.probe_deadline_secs))
    }

    pub fn settings(mut self, settings: ProbeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn web_url(mut self, web_url: Option<String>) -> Self {
        self.web_url = web_url;
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn logger(mut self, logger: Arc<dyn DiagnosticLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Run a profile. A blank or missing domain becomes `google.com`.
    pub async fn run(&self, profile: TestProfile, domain: Option<&str>) -> Result<Run> {
        self.run_categories(profile, &profile.categories(), domain).await
    }

    async fn run_categories(
        &self,
        profile: TestProfile,
        categories: &[ProbeCategory],
        domain: Option<&str>,
    ) -> Result<Run> {
        let domain = normalize_domain(domain);
        let ctx = Arc::new(ProbeContext::new(
            &domain,
            self.web_url.as_deref(),
            self.settings.clone(),
        ));
        let started_at = Utc::now();

        info!(
            "Starting {} test ({} probes, {:?}) for {}",
            profile,
            categories.len(),
            self.mode,
            domain
        );

        let mut results = Vec::with_capacity(categories.len());
        match self.mode {
            ExecutionMode::Sequential => {
                for category in categories {
                    let handle = self.spawn_probe(*category, ctx.clone());
                    let result = self.collect(*category, &ctx, handle).await?;
                    results.push(result);
                }
            }
            ExecutionMode::Concurrent => {
                let handles: Vec<(ProbeCategory, JoinHandle<ProbeResult>)> = categories
                    .iter()
                    .map(|category| (*category, self.spawn_probe(*category, ctx.clone())))
                    .collect();
                let mut pending = handles.into_iter();
                while let Some((category, handle)) = pending.next() {
                    match self.collect(category, &ctx, handle).await {
                        Ok(result) => results.push(result),
                        Err(e) => {
                            for (_, rest) in pending {
                                rest.abort();
                            }
                            return Err(e);
                        }
                    }
                }
            }
        }

        let run = Run::new(profile, domain, started_at, results);
        let summary = RunSummary::from_results(run.results());
        let level = if summary.all_passed() {
            LogLevel::Info
        } else {
            LogLevel::Warning
        };
        self.logger.log(
            &format!("{} test complete: {}", profile, summary.format_totals()),
            level,
            Some(run.results()),
        );
        Ok(run)
    }

    fn spawn_probe(&self, category: ProbeCategory, ctx: Arc<ProbeContext>) -> JoinHandle<ProbeResult> {
        let backend = self.backend.clone();
        let deadline = self.deadline;
        tokio::spawn(async move {
            let probe = probes::run_probe(category, &*backend, &ctx);
            match tokio::time::timeout(deadline, probe).await {
                Ok(result) => result,
                Err(_) => ProbeResult::fail(
                    category,
                    ctx.target_for(category),
                    format!("Probe timed out after {}s", deadline.as_secs()),
                ),
            }
        })
    }

    async fn collect(
        &self,
        category: ProbeCategory,
        ctx: &ProbeContext,
        handle: JoinHandle<ProbeResult>,
    ) -> Result<ProbeResult> {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => ProbeResult::fail(
                category,
                ctx.target_for(category),
                format!("Probe aborted: {}", join_error_message(e)),
            ),
        };

        let result = verify_category(category, result)?;

        debug!("{}", result.format_summary());
        let level = if result.success() {
            LogLevel::Info
        } else {
            LogLevel::Warning
        };
        self.logger.log(
            &format!(
                "{}: {}",
                category.display_name(),
                if result.success() { "passed" } else { "failed" }
            ),
            level,
            Some(std::slice::from_ref(&result)),
        );
        Ok(result)
    }
}

/// A probe must answer for the category it was asked to check
fn verify_category(expected: ProbeCategory, result: ProbeResult) -> Result<ProbeResult> {
    if result.category() != expected {
        return Err(NetDocError::ContractViolation(format!(
            "{} probe returned a {} result",
            expected.as_str(),
            result.category().as_str()
        )));
    }
    Ok(result)
}

fn join_error_message(e: JoinError) -> String {
    if e.is_panic() {
        let payload = e.into_panic();
        if let Some(s) = payload.downcast_ref::<&str>() {
            format!("panicked: {}", s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("panicked: {}", s)
        } else {
            "panicked".to_string()
        }
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::MemoryLogger;
    use crate::probes::{DnsRecord, FakeNetworkBackend, HttpMethod};

    fn healthy_backend() -> FakeNetworkBackend {
        FakeNetworkBackend::builder()
            .interface("eth0", "UP")
            .gateway("192.168.1.1")
            .echo_replies("192.168.1.1", &[true, true])
            .text(probes::DEFAULT_EXTERNAL_IP_PRIMARY, "203.0.113.7")
            .dns("google.com", vec![DnsRecord::A("142.250.0.1".parse().unwrap())])
            .http(HttpMethod::Head, "https://google.com", 200)
            .build()
    }

    #[tokio::test]
    async fn test_full_profile_order() {
        let runner = ProbeRunner::new(Arc::new(healthy_backend()));
        let run = runner.run(TestProfile::Full, None).await.unwrap();
        let categories: Vec<ProbeCategory> = run.results().iter().map(|r| r.category()).collect();
        assert_eq!(categories, ProbeCategory::ALL.to_vec());
        assert!(run.results().iter().all(|r| r.success()));
        assert_eq!(run.domain(), "google.com");
    }

    #[tokio::test]
    async fn test_basic_profile_subset() {
        let runner = ProbeRunner::new(Arc::new(healthy_backend()));
        let run = runner.run(TestProfile::Basic, Some("  ")).await.unwrap();
        let categories: Vec<ProbeCategory> = run.results().iter().map(|r| r.category()).collect();
        assert_eq!(categories, TestProfile::Basic.categories());
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential_order() {
        let runner =
            ProbeRunner::new(Arc::new(healthy_backend())).mode(ExecutionMode::Concurrent);
        let run = runner.run(TestProfile::Full, Some("google.com")).await.unwrap();
        let categories: Vec<ProbeCategory> = run.results().iter().map(|r| r.category()).collect();
        assert_eq!(categories, ProbeCategory::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_deadline_turns_hang_into_failure() {
        let backend = FakeNetworkBackend::builder()
            .delay(Duration::from_secs(5))
            .build();
        let runner = ProbeRunner::new(Arc::new(backend))
            .mode(ExecutionMode::Concurrent)
            .deadline(Duration::from_millis(50));
        let run = runner.run(TestProfile::Basic, None).await.unwrap();
        assert_eq!(run.len(), 3);
        for result in run.results() {
            assert!(!result.success());
            assert!(result.detail().contains("timed out"));
        }
    }

    #[tokio::test]
    async fn test_panicking_probe_becomes_failure() {
        let backend = FakeNetworkBackend::builder().panic_on_interfaces().build();
        let runner = ProbeRunner::new(Arc::new(backend));
        let run = runner.run(TestProfile::Full, None).await.unwrap();
        assert_eq!(run.len(), 5);
        let adapter = run.result_for(ProbeCategory::AdapterState).unwrap();
        assert!(!adapter.success());
        assert!(adapter.detail().contains("interface table unavailable"));
    }

    #[tokio::test]
    async fn test_logger_called_per_probe_and_per_run() {
        let logger = Arc::new(MemoryLogger::new());
        let runner = ProbeRunner::new(Arc::new(healthy_backend())).logger(logger.clone());
        runner.run(TestProfile::Basic, None).await.unwrap();
        let entries = logger.entries();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[3].data.len(), 3);
    }

    #[test]
    fn test_mismatched_category_is_contract_violation() {
        let result = ProbeResult::pass(ProbeCategory::DnsResolution, "google.com", "Resolved to 1.2.3.4");
        let err = verify_category(ProbeCategory::WebAccess, result).unwrap_err();
        assert!(matches!(err, NetDocError::ContractViolation(_)));
        assert!(err.to_string().contains("web_access probe returned a dns_resolution result"));

        let result = ProbeResult::fail(ProbeCategory::WebAccess, "https://google.com", "HEAD failed");
        assert!(verify_category(ProbeCategory::WebAccess, result).is_ok());
    }

    #[test]
    fn test_from_config_reads_mode() {
        let mut config = NetDocConfig::default();
        config.runner.concurrent = true;
        let runner = ProbeRunner::from_config(Arc::new(healthy_backend()), &config);
        assert_eq!(runner.execution_mode(), ExecutionMode::Concurrent);
    }
}
