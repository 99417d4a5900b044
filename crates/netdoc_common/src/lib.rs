//! NetDoc Common - probes, runs and the Auto-Fix engine
//!
//! A run executes a fixed battery of connectivity probes (adapter, gateway,
//! external IP, DNS, web). Failed categories feed the rule engine, which
//! plans remediation for the executor.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod logger;
pub mod probes;
pub mod remediation;
pub mod report;
pub mod rules;
pub mod runner;
pub mod types;

pub use aggregate::RunSummary;
pub use config::NetDocConfig;
pub use error::{NetDocError, Result};
pub use logger::{DiagnosticLogger, FanoutLogger, FileLogger, LogLevel, MemoryLogger, TracingLogger};
pub use probes::{FakeNetworkBackend, NetworkBackend, SystemNetworkBackend};
pub use remediation::{
    ActionOutcome, CommandRunner, CommandSpec, FakeCommandRunner, RemediationCommands,
    RemediationExecutor, SystemCommandRunner,
};
pub use rules::{
    FailureFlags, GatewayPolicy, RemediationAction, RemediationDecision, RemediationPlan,
    RuleEngine,
};
pub use runner::{ExecutionMode, ProbeRunner};
pub use types::{normalize_domain, ProbeCategory, ProbeResult, Run, TestProfile, DEFAULT_DOMAIN};
