//! Output formatting - ASCII-only terminal output

use netdoc_common::{ActionOutcome, RemediationDecision, Run, RunSummary};
use owo_colors::OwoColorize;

pub const THIN_SEPARATOR: &str = "------------------------------------------------------------";

/// Plain-text result table, one line per probe
pub fn format_run(run: &Run) -> String {
    let mut lines = Vec::with_capacity(run.len() + 3);
    lines.push(format!(
        "{} test for {} ({} probes)",
        run.profile(),
        run.domain(),
        run.len()
    ));
    lines.push(THIN_SEPARATOR.to_string());
    for result in run.results() {
        lines.push(format!(
            "{:<7}{:<18}{:<28}{}",
            result.status_symbol(),
            result.category().display_name(),
            result.target(),
            result.detail()
        ));
    }
    lines.push(THIN_SEPARATOR.to_string());
    lines.push(RunSummary::from_results(run.results()).format_totals());
    lines.join("\n")
}

/// Display a finished run
pub fn display_run(run: &Run) {
    println!();
    for line in format_run(run).lines() {
        if line.starts_with("[FAIL]") {
            println!("{}", line.red());
        } else if line.starts_with("[OK]") {
            println!("{}", line.green());
        } else {
            println!("{}", line);
        }
    }
    println!();
}

/// Display the Auto-Fix decision and per-action outcomes
pub fn display_fix(decision: &RemediationDecision, outcomes: &[ActionOutcome]) {
    println!();
    match decision {
        RemediationDecision::NoPriorRun => display_warning(&decision.message()),
        RemediationDecision::NothingToRemediate => display_success(&decision.message()),
        RemediationDecision::Plan(_) => {
            println!("[AUTO-FIX] {}", decision.message());
            for outcome in outcomes {
                if outcome.success {
                    println!("  {}", outcome.format_summary().green());
                } else {
                    println!("  {}", outcome.format_summary().red());
                }
            }
        }
    }
    println!();
}

/// Display a success message
pub fn display_success(message: &str) {
    println!("[OK] {}", message.green());
}

/// Display an info message
pub fn display_info(message: &str) {
    println!("[INFO] {}", message);
}

/// Display a warning
pub fn display_warning(message: &str) {
    println!("[WARNING] {}", message.yellow());
}

/// Display an error
pub fn display_error(message: &str) {
    eprintln!();
    eprintln!("[ERROR] {}", message.red());
    eprintln!();
}
