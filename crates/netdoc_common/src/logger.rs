//! Diagnostic log sinks
//!
//! The runner and the remediation executor report every probe completion
//! and every action through a `DiagnosticLogger`. Where the entries end up
//! is the sink's business.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::types::ProbeResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Sink for diagnostic events
pub trait DiagnosticLogger: Send + Sync {
    fn log(&self, message: &str, level: LogLevel, data: Option<&[ProbeResult]>);
}

/// One recorded log event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<ProbeResult>,
}

impl LogEntry {
    pub fn new(message: &str, level: LogLevel, data: Option<&[ProbeResult]>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            data: data.map(|d| d.to_vec()).unwrap_or_default(),
        }
    }
}

/// Forwards entries to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl DiagnosticLogger for TracingLogger {
    fn log(&self, message: &str, level: LogLevel, data: Option<&[ProbeResult]>) {
        let results = data.map(|d| d.len()).unwrap_or(0);
        match level {
            LogLevel::Info => info!(target: "netdoc", results, "{}", message),
            LogLevel::Warning => warn!(target: "netdoc", results, "{}", message),
            LogLevel::Error => error!(target: "netdoc", results, "{}", message),
        }
    }
}

/// Appends entries as JSON lines to a file
pub struct FileLogger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, entry: &LogEntry) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let line = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl DiagnosticLogger for FileLogger {
    fn log(&self, message: &str, level: LogLevel, data: Option<&[ProbeResult]>) {
        let entry = LogEntry::new(message, level, data);
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = self.append(&entry) {
            warn!("Failed to write diagnostic log {}: {}", self.path.display(), e);
        }
    }
}

/// Keeps entries in memory
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn count_at(&self, level: LogLevel) -> usize {
        self.entries().iter().filter(|e| e.level == level).count()
    }
}

impl DiagnosticLogger for MemoryLogger {
    fn log(&self, message: &str, level: LogLevel, data: Option<&[ProbeResult]>) {
        let entry = LogEntry::new(message, level, data);
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

/// Sends every entry to each inner sink
#[derive(Default, Clone)]
pub struct FanoutLogger {
    sinks: Vec<Arc<dyn DiagnosticLogger>>,
}

impl FanoutLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn DiagnosticLogger>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl DiagnosticLogger for FanoutLogger {
    fn log(&self, message: &str, level: LogLevel, data: Option<&[ProbeResult]>) {
        for sink in &self.sinks {
            sink.log(message, level, data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProbeCategory;
    use tempfile::TempDir;

    #[test]
    fn test_memory_logger_records_data() {
        let logger = MemoryLogger::new();
        let result = ProbeResult::pass(ProbeCategory::DnsResolution, "google.com", "1.2.3.4");
        logger.log("DNS ok", LogLevel::Info, Some(std::slice::from_ref(&result)));
        logger.log("renew failed", LogLevel::Error, None);

        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].data.len(), 1);
        assert_eq!(logger.count_at(LogLevel::Error), 1);
    }

    #[test]
    fn test_file_logger_appends_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("netdoc.jsonl");
        let logger = FileLogger::new(&path);

        logger.log("first", LogLevel::Info, None);
        logger.log("second", LogLevel::Warning, None);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let entry: LogEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(entry.message, "second");
        assert_eq!(entry.level, LogLevel::Warning);
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let a = Arc::new(MemoryLogger::new());
        let b = Arc::new(MemoryLogger::new());
        let fanout = FanoutLogger::new().with(a.clone()).with(b.clone());
        fanout.log("hello", LogLevel::Info, None);
        assert_eq!(a.entries().len(), 1);
        assert_eq!(b.entries().len(), 1);
    }
}
