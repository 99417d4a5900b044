//! Pass/fail aggregation over a run

use crate::types::{ProbeCategory, ProbeResult};

/// Counts and failed subset of a set of results
#[derive(Debug, Clone)]
pub struct RunSummary<'a> {
    pub passed: usize,
    pub failed: usize,
    failures: Vec<&'a ProbeResult>,
}

impl<'a> RunSummary<'a> {
    pub fn from_results(results: &'a [ProbeResult]) -> Self {
        let failures: Vec<&ProbeResult> = results.iter().filter(|r| !r.success()).collect();
        Self {
            passed: results.len() - failures.len(),
            failed: failures.len(),
            failures,
        }
    }

    /// Failed results in run order
    pub fn failures(&self) -> &[&'a ProbeResult] {
        &self.failures
    }

    pub fn failed_categories(&self) -> Vec<ProbeCategory> {
        self.failures.iter().map(|r| r.category()).collect()
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn format_totals(&self) -> String {
        format!("{} passed, {} failed", self.passed, self.failed)
    }
}
