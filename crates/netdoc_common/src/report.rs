//! Run reports (HTML and JSON)
//!
//! Renderers only read the run; a failed write never affects it.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use sysinfo::System;
use tracing::info;

use crate::aggregate::RunSummary;
use crate::error::{NetDocError, Result};
use crate::remediation::ActionOutcome;
use crate::types::Run;

/// Escape text for HTML element and attribute content
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Host identification shown in the report header
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub host_name: String,
    pub os: String,
}

impl HostInfo {
    pub fn collect() -> Self {
        Self {
            host_name: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            os: System::long_os_version().unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

const STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#222}\
table{border-collapse:collapse;width:100%}\
th,td{border:1px solid #ccc;padding:6px 10px;text-align:left;vertical-align:top}\
th{background:#f0f0f0}\
.pass{color:#1a7f37;font-weight:bold}\
.fail{color:#cf222e;font-weight:bold}\
.meta td{border:none;padding:2px 10px 2px 0}";

pub fn render_html(run: &Run, outcomes: Option<&[ActionOutcome]>) -> String {
    render_html_for_host(run, outcomes, &HostInfo::collect())
}

pub fn render_html_for_host(run: &Run, outcomes: Option<&[ActionOutcome]>, host: &HostInfo) -> String {
    let summary = RunSummary::from_results(run.results());
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Network Diagnostics Report</title>\n");
    let _ = writeln!(html, "<style>{}</style>\n</head>\n<body>", STYLE);
    html.push_str("<h1>Network Diagnostics Report</h1>\n<table class=\"meta\">\n");

    let meta = [
        ("Host", host.host_name.clone()),
        ("OS", host.os.clone()),
        ("Run", run.id().to_string()),
        ("Profile", run.profile().to_string()),
        ("Domain", run.domain().to_string()),
        ("Started", run.started_at().to_rfc3339()),
        ("Finished", run.finished_at().to_rfc3339()),
        ("Totals", summary.format_totals()),
    ];
    for (label, value) in meta {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td></tr>",
            label,
            escape_html(&value)
        );
    }
    html.push_str("</table>\n");

    html.push_str("<h2>Results</h2>\n<table>\n");
    html.push_str("<tr><th>Test</th><th>Status</th><th>Target</th><th>Detail</th><th>Time</th></tr>\n");
    for result in run.results() {
        let (class, label) = if result.success() {
            ("pass", "PASS")
        } else {
            ("fail", "FAIL")
        };
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td class=\"{}\">{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(result.category().display_name()),
            class,
            label,
            escape_html(result.target()),
            escape_html(result.detail()),
            result.timestamp().format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    html.push_str("</table>\n");

    if let Some(outcomes) = outcomes.filter(|o| !o.is_empty()) {
        html.push_str("<h2>Remediation</h2>\n<table>\n");
        html.push_str("<tr><th>Action</th><th>Status</th><th>Detail</th></tr>\n");
        for outcome in outcomes {
            let (class, label) = if outcome.success {
                ("pass", "OK")
            } else {
                ("fail", "FAILED")
            };
            let detail = match &outcome.error {
                Some(error) => format!("{} ({})", outcome.detail, error),
                None => outcome.detail.clone(),
            };
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td class=\"{}\">{}</td><td>{}</td></tr>",
                escape_html(outcome.action.description()),
                class,
                label,
                escape_html(&detail)
            );
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// `netdoc-report-<profile>-<yyyymmdd-hhmmss>.<ext>`
pub fn default_file_name(run: &Run, extension: &str) -> String {
    format!(
        "netdoc-report-{}-{}.{}",
        run.profile(),
        run.started_at().format("%Y%m%d-%H%M%S"),
        extension
    )
}

pub fn write_html(run: &Run, outcomes: Option<&[ActionOutcome]>, path: &Path) -> Result<()> {
    let html = render_html(run, outcomes);
    write_file(path, html.as_bytes())?;
    info!("HTML report written: {}", path.display());
    Ok(())
}

pub fn write_json(run: &Run, path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(run)?;
    write_file(path, &json)?;
    info!("JSON report written: {}", path.display());
    Ok(())
}

fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| NetDocError::Report(format!("{}: {}", parent.display(), e)))?;
        }
    }
    fs::write(path, content).map_err(|e| NetDocError::Report(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProbeCategory, ProbeResult, TestProfile};
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_run() -> Run {
        Run::new(
            TestProfile::Basic,
            "google.com",
            Utc::now(),
            vec![
                ProbeResult::pass(ProbeCategory::ExternalIp, "https://api.ipify.org", "External IP: 203.0.113.7"),
                ProbeResult::fail(ProbeCategory::DnsResolution, "google.com", "resolver said <nope> & gave up"),
            ],
        )
    }

    fn host() -> HostInfo {
        HostInfo {
            host_name: "workstation".to_string(),
            os: "Linux".to_string(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_render_escapes_detail() {
        let html = render_html_for_host(&sample_run(), None, &host());
        assert!(html.contains("resolver said &lt;nope&gt; &amp; gave up"));
        assert!(!html.contains("<nope>"));
        assert!(html.contains("1 passed, 1 failed"));
        assert!(html.contains("workstation"));
        assert!(!html.contains("<h2>Remediation</h2>"));
    }

    #[test]
    fn test_write_reports() {
        let dir = TempDir::new().unwrap();
        let run = sample_run();

        let html_path = dir.path().join("out").join("report.html");
        write_html(&run, None, &html_path).unwrap();
        assert!(fs::read_to_string(&html_path).unwrap().starts_with("<!DOCTYPE html>"));

        let json_path = dir.path().join("report.json");
        write_json(&run, &json_path).unwrap();
        let loaded: Run = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(loaded.results(), run.results());
    }

    #[test]
    fn test_write_failure_leaves_run_intact() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let run = sample_run();

        let err = write_html(&run, None, &blocker.join("report.html")).unwrap_err();
        assert!(matches!(err, NetDocError::Report(_)));
        assert_eq!(run.len(), 2);
    }
}
