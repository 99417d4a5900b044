//! Auto-Fix rule engine
//!
//! Maps the failed categories of a run to an ordered remediation plan.
//! Plan order is fixed (DNS repair, then IP renewal, then adapter advice)
//! no matter which failures triggered each action.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::aggregate::RunSummary;
use crate::types::{ProbeCategory, Run};

/// Remediation steps the executor knows how to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    FlushAndReregisterDns,
    RenewIpConfiguration,
    /// Advisory only, never mutates the system
    AdviseAdapterRestart,
}

impl RemediationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemediationAction::FlushAndReregisterDns => "flush_and_reregister_dns",
            RemediationAction::RenewIpConfiguration => "renew_ip_configuration",
            RemediationAction::AdviseAdapterRestart => "advise_adapter_restart",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RemediationAction::FlushAndReregisterDns => "Flush DNS cache and re-register DNS",
            RemediationAction::RenewIpConfiguration => "Release and renew IP configuration",
            RemediationAction::AdviseAdapterRestart => "Restart the network adapter manually",
        }
    }

    pub fn is_advisory(&self) -> bool {
        matches!(self, RemediationAction::AdviseAdapterRestart)
    }
}

impl fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a failed gateway echo is weighed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayPolicy {
    /// Gateway failure always counts
    #[default]
    Strict,
    /// Gateway failure is ignored when the run shows working upstream
    /// connectivity (external IP or web access passed), which points at
    /// ICMP filtering rather than a broken route
    Advisory,
}

/// One flag per category present among the failures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureFlags {
    pub adapter: bool,
    pub gateway: bool,
    pub external_ip: bool,
    pub dns: bool,
    pub web: bool,
}

impl FailureFlags {
    pub fn from_categories<I>(categories: I) -> Self
    where
        I: IntoIterator<Item = ProbeCategory>,
    {
        let mut flags = FailureFlags::default();
        for category in categories {
            match category {
                ProbeCategory::AdapterState => flags.adapter = true,
                ProbeCategory::GatewayReachability => flags.gateway = true,
                ProbeCategory::ExternalIp => flags.external_ip = true,
                ProbeCategory::DnsResolution => flags.dns = true,
                ProbeCategory::WebAccess => flags.web = true,
            }
        }
        flags
    }

    pub fn any(&self) -> bool {
        self.adapter || self.gateway || self.external_ip || self.dns || self.web
    }
}

/// Ordered list of actions to apply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationPlan {
    actions: Vec<RemediationAction>,
}

impl RemediationPlan {
    /// Apply the fixed rules to a set of flags
    pub fn from_flags(flags: &FailureFlags) -> Self {
        let mut actions = Vec::new();
        if flags.dns || flags.web {
            actions.push(RemediationAction::FlushAndReregisterDns);
        }
        if flags.gateway || flags.external_ip || flags.web {
            actions.push(RemediationAction::RenewIpConfiguration);
        }
        if flags.adapter {
            actions.push(RemediationAction::AdviseAdapterRestart);
        }
        Self { actions }
    }

    pub fn actions(&self) -> &[RemediationAction] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn contains(&self, action: RemediationAction) -> bool {
        self.actions.contains(&action)
    }
}

/// What the engine concluded for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationDecision {
    /// There is no run (or it holds no results) to base a decision on
    NoPriorRun,
    /// Every probe passed
    NothingToRemediate,
    Plan(RemediationPlan),
}

impl RemediationDecision {
    pub fn plan(&self) -> Option<&RemediationPlan> {
        match self {
            RemediationDecision::Plan(plan) => Some(plan),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            RemediationDecision::NoPriorRun => {
                "No prior run available. Run a diagnostic test first.".to_string()
            }
            RemediationDecision::NothingToRemediate => {
                "All tests passed. Nothing to remediate.".to_string()
            }
            RemediationDecision::Plan(plan) => format!(
                "Planned {} action(s): {}",
                plan.actions().len(),
                plan.actions()
                    .iter()
                    .map(|a| a.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

/// Decides remediation for a run
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEngine {
    gateway_policy: GatewayPolicy,
}

impl RuleEngine {
    pub fn new(gateway_policy: GatewayPolicy) -> Self {
        Self { gateway_policy }
    }

    pub fn decide(&self, run: Option<&Run>) -> RemediationDecision {
        let run = match run {
            Some(run) if !run.is_empty() => run,
            _ => return RemediationDecision::NoPriorRun,
        };

        let summary = RunSummary::from_results(run.results());
        if summary.all_passed() {
            return RemediationDecision::NothingToRemediate;
        }

        let flags = self.flags_for(run, &summary);
        debug!("Failure flags: {:?}", flags);

        let plan = RemediationPlan::from_flags(&flags);
        if plan.is_empty() {
            RemediationDecision::NothingToRemediate
        } else {
            RemediationDecision::Plan(plan)
        }
    }

    fn flags_for(&self, run: &Run, summary: &RunSummary<'_>) -> FailureFlags {
        let mut flags = FailureFlags::from_categories(summary.failed_categories());

        if flags.gateway && self.gateway_policy == GatewayPolicy::Advisory {
            let upstream_ok = [ProbeCategory::ExternalIp, ProbeCategory::WebAccess]
                .iter()
                .any(|c| run.result_for(*c).map(|r| r.success()).unwrap_or(false));
            if upstream_ok {
                debug!("Gateway failure downgraded: upstream connectivity works");
                flags.gateway = false;
            }
        }

        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProbeResult, TestProfile};
    use chrono::Utc;

    fn run_with(failed: &[ProbeCategory], passed: &[ProbeCategory]) -> Run {
        let mut results = Vec::new();
        for category in ProbeCategory::ALL {
            if failed.contains(&category) {
                results.push(ProbeResult::fail(category, "t", "failed"));
            } else if passed.contains(&category) {
                results.push(ProbeResult::pass(category, "t", "ok"));
            }
        }
        Run::new(TestProfile::Full, "google.com", Utc::now(), results)
    }

    #[test]
    fn test_dns_failure_only_flushes_dns() {
        let run = run_with(&[ProbeCategory::DnsResolution], &[ProbeCategory::ExternalIp]);
        let decision = RuleEngine::default().decide(Some(&run));
        assert_eq!(
            decision.plan().unwrap().actions(),
            &[RemediationAction::FlushAndReregisterDns]
        );
    }

    #[test]
    fn test_gateway_and_adapter_failure_order() {
        let run = run_with(
            &[ProbeCategory::GatewayReachability, ProbeCategory::AdapterState],
            &[],
        );
        let decision = RuleEngine::default().decide(Some(&run));
        assert_eq!(
            decision.plan().unwrap().actions(),
            &[
                RemediationAction::RenewIpConfiguration,
                RemediationAction::AdviseAdapterRestart
            ]
        );
    }

    #[test]
    fn test_web_failure_triggers_dns_and_renew() {
        let flags = FailureFlags::from_categories([ProbeCategory::WebAccess]);
        let plan = RemediationPlan::from_flags(&flags);
        assert_eq!(
            plan.actions(),
            &[
                RemediationAction::FlushAndReregisterDns,
                RemediationAction::RenewIpConfiguration
            ]
        );
    }

    #[test]
    fn test_all_flags_produce_fixed_order() {
        let flags = FailureFlags::from_categories(ProbeCategory::ALL.iter().rev().copied());
        let plan = RemediationPlan::from_flags(&flags);
        assert_eq!(
            plan.actions(),
            &[
                RemediationAction::FlushAndReregisterDns,
                RemediationAction::RenewIpConfiguration,
                RemediationAction::AdviseAdapterRestart
            ]
        );
    }

    #[test]
    fn test_all_passed_is_nothing_to_remediate() {
        let run = run_with(&[], &ProbeCategory::ALL);
        assert_eq!(
            RuleEngine::default().decide(Some(&run)),
            RemediationDecision::NothingToRemediate
        );
    }

    #[test]
    fn test_absent_or_empty_run_is_no_prior_run() {
        let engine = RuleEngine::default();
        assert_eq!(engine.decide(None), RemediationDecision::NoPriorRun);

        let empty = Run::new(TestProfile::Basic, "google.com", Utc::now(), Vec::new());
        assert_eq!(engine.decide(Some(&empty)), RemediationDecision::NoPriorRun);
        assert_ne!(
            RemediationDecision::NoPriorRun.message(),
            RemediationDecision::NothingToRemediate.message()
        );
    }

    #[test]
    fn test_advisory_policy_downgrades_gateway_when_upstream_works() {
        let run = run_with(
            &[ProbeCategory::GatewayReachability],
            &[ProbeCategory::ExternalIp, ProbeCategory::DnsResolution],
        );
        let engine = RuleEngine::new(GatewayPolicy::Advisory);
        assert_eq!(engine.decide(Some(&run)), RemediationDecision::NothingToRemediate);

        let strict = RuleEngine::new(GatewayPolicy::Strict);
        assert_eq!(
            strict.decide(Some(&run)).plan().unwrap().actions(),
            &[RemediationAction::RenewIpConfiguration]
        );
    }

    #[test]
    fn test_advisory_policy_keeps_gateway_when_upstream_down() {
        let run = run_with(
            &[ProbeCategory::GatewayReachability, ProbeCategory::ExternalIp],
            &[],
        );
        let engine = RuleEngine::new(GatewayPolicy::Advisory);
        assert!(engine
            .decide(Some(&run))
            .plan()
            .unwrap()
            .contains(RemediationAction::RenewIpConfiguration));
    }
}
