//! End-to-end Auto-Fix pipeline tests
//!
//! These tests use FakeNetworkBackend and FakeCommandRunner to drive a run
//! through aggregation, rule evaluation and remediation without any
//! network or shell calls.

use std::sync::Arc;

use netdoc_common::probes::{DnsRecord, HttpMethod, DEFAULT_EXTERNAL_IP_PRIMARY};
use netdoc_common::{
    CommandSpec, FakeCommandRunner, FakeNetworkBackend, MemoryLogger, ProbeCategory, ProbeRunner,
    RemediationAction, RemediationCommands, RemediationDecision, RemediationExecutor, RuleEngine,
    RunSummary, TestProfile,
};

fn commands() -> RemediationCommands {
    RemediationCommands {
        flush_dns: vec![
            CommandSpec::new("ipconfig", &["/flushdns"]),
            CommandSpec::new("ipconfig", &["/registerdns"]),
        ],
        renew_ip: vec![
            CommandSpec::new("ipconfig", &["/release"]),
            CommandSpec::new("ipconfig", &["/renew"]),
        ],
    }
}

// ============================================================================
// Run -> Summary
// ============================================================================

#[tokio::test]
async fn test_counts_always_cover_run() {
    let backends = vec![
        FakeNetworkBackend::builder().build(),
        FakeNetworkBackend::builder()
            .interface("eth0", "UP")
            .gateway("192.168.1.1")
            .echo_replies("192.168.1.1", &[true])
            .build(),
    ];

    for backend in backends {
        let runner = ProbeRunner::new(Arc::new(backend));
        for profile in [TestProfile::Full, TestProfile::Basic] {
            let run = runner.run(profile, None).await.unwrap();
            let summary = RunSummary::from_results(run.results());
            assert_eq!(summary.passed + summary.failed, run.len());
            assert_eq!(run.len(), profile.categories().len());
        }
    }
}

#[tokio::test]
async fn test_dead_network_yields_one_failure_per_probe() {
    let runner = ProbeRunner::new(Arc::new(FakeNetworkBackend::builder().build()));
    let run = runner.run(TestProfile::Full, None).await.unwrap();
    let summary = RunSummary::from_results(run.results());
    assert_eq!(summary.failed, 5);
    assert_eq!(
        run.result_for(ProbeCategory::GatewayReachability).unwrap().detail(),
        "No default gateway configured"
    );
}

// ============================================================================
// Run -> Plan
// ============================================================================

#[tokio::test]
async fn test_dns_only_failure_plans_dns_flush() {
    let backend = FakeNetworkBackend::builder()
        .gateway("192.168.1.1")
        .echo_replies("192.168.1.1", &[true])
        .text(DEFAULT_EXTERNAL_IP_PRIMARY, "203.0.113.7")
        .build();
    let runner = ProbeRunner::new(Arc::new(backend));
    let run = runner.run(TestProfile::Basic, Some("google.com")).await.unwrap();

    let decision = RuleEngine::default().decide(Some(&run));
    assert_eq!(
        decision.plan().unwrap().actions(),
        &[RemediationAction::FlushAndReregisterDns]
    );
}

#[tokio::test]
async fn test_healthy_run_has_nothing_to_remediate() {
    let backend = FakeNetworkBackend::builder()
        .interface("eth0", "UP")
        .gateway("192.168.1.1")
        .echo_replies("192.168.1.1", &[true])
        .text(DEFAULT_EXTERNAL_IP_PRIMARY, "203.0.113.7")
        .dns("google.com", vec![DnsRecord::A("1.2.3.4".parse().unwrap())])
        .http(HttpMethod::Head, "https://google.com", 500)
        .http(HttpMethod::Get, "https://google.com", 200)
        .build();
    let runner = ProbeRunner::new(Arc::new(backend));
    let run = runner.run(TestProfile::Full, None).await.unwrap();

    let web = run.result_for(ProbeCategory::WebAccess).unwrap();
    assert!(web.success());
    assert!(web.detail().contains("200 (GET)"));

    let dns = run.result_for(ProbeCategory::DnsResolution).unwrap();
    assert_eq!(dns.target(), "google.com");
    assert!(dns.detail().contains("1.2.3.4"));

    assert_eq!(
        RuleEngine::default().decide(Some(&run)),
        RemediationDecision::NothingToRemediate
    );
}

#[test]
fn test_no_run_is_not_nothing_to_remediate() {
    let decision = RuleEngine::default().decide(None);
    assert_eq!(decision, RemediationDecision::NoPriorRun);
    assert_ne!(decision, RemediationDecision::NothingToRemediate);
}

// ============================================================================
// Plan -> Outcomes
// ============================================================================

#[tokio::test]
async fn test_failed_dns_flush_does_not_block_renew() {
    let backend = FakeNetworkBackend::builder()
        .interface("eth0", "UP")
        .gateway("192.168.1.1")
        .echo_replies("192.168.1.1", &[true])
        .text(DEFAULT_EXTERNAL_IP_PRIMARY, "203.0.113.7")
        .dns("google.com", vec![DnsRecord::A("1.2.3.4".parse().unwrap())])
        .build();
    let run = ProbeRunner::new(Arc::new(backend))
        .run(TestProfile::Full, None)
        .await
        .unwrap();

    // Web access failed, so both mutating actions are planned
    let decision = RuleEngine::default().decide(Some(&run));
    let plan = decision.plan().unwrap();
    assert_eq!(
        plan.actions(),
        &[
            RemediationAction::FlushAndReregisterDns,
            RemediationAction::RenewIpConfiguration
        ]
    );

    let runner = Arc::new(FakeCommandRunner::new().deny("ipconfig /flushdns"));
    let logger = Arc::new(MemoryLogger::new());
    let executor = RemediationExecutor::new(runner.clone(), commands(), logger.clone());
    let outcomes = executor.execute(plan).await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].action, RemediationAction::FlushAndReregisterDns);
    assert!(!outcomes[0].success);
    assert!(outcomes[0].error.as_deref().unwrap().contains("requires elevation"));
    assert_eq!(outcomes[1].action, RemediationAction::RenewIpConfiguration);
    assert!(outcomes[1].success);
    assert!(outcomes[1].error.is_none());

    assert_eq!(
        runner.calls(),
        vec![
            "ipconfig /flushdns".to_string(),
            "ipconfig /registerdns".to_string(),
            "ipconfig /release".to_string(),
            "ipconfig /renew".to_string(),
        ]
    );
    assert_eq!(logger.entries().len(), 2);
}
