//! Process-wide error log and its CI report serialization.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::DocsGenError;
use crate::model::Origin;

pub const REPORT_FILE: &str = "docsgen_report.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Notice,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogEntry {
    pub file: String,
    pub line: usize,
    pub message: String,
    pub severity: Severity,
}

/// One record of the JSON report, shaped for CI annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRecord {
    pub file: String,
    pub line: usize,
    pub title: String,
    pub message: String,
    pub annotation_level: Severity,
}

/// Ordered record of everything that went wrong during a run.
///
/// Only `Error` entries fail the run or mark a file as bad. A problem found
/// again at the same place, with the same message, is kept once.
#[derive(Debug, Default)]
pub struct ErrorLog {
    entries: Vec<LogEntry>,
    seen: HashSet<LogEntry>,
    bad_files: HashSet<String>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, file: &str, line: usize, message: &str, severity: Severity) {
        let entry = LogEntry {
            file: file.to_string(),
            line,
            message: message.to_string(),
            severity,
        };
        if !self.seen.insert(entry.clone()) {
            return;
        }
        match severity {
            Severity::Error => log::error!("!! ERROR at {file}:{line}: {message}"),
            Severity::Warning => log::warn!("!! WARNING at {file}:{line}: {message}"),
            Severity::Notice => log::info!("!! NOTICE at {file}:{line}: {message}"),
        }
        if severity == Severity::Error {
            self.bad_files.insert(file.to_string());
        }
        self.entries.push(entry);
    }

    /// Records an engine error against the place it was found.
    pub fn record(&mut self, origin: &Origin, err: &DocsGenError) {
        self.add_entry(&origin.file, origin.line, &err.to_string(), err.severity());
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn has_errors(&self) -> bool {
        !self.bad_files.is_empty()
    }

    pub fn file_has_errors(&self, file: &str) -> bool {
        self.bad_files.contains(file)
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .count()
    }

    pub fn records(&self) -> Vec<ReportRecord> {
        self.entries
            .iter()
            .map(|e| ReportRecord {
                file: e.file.clone(),
                line: e.line,
                title: format!("DocsGen {}", e.severity),
                message: e.message.clone(),
                annotation_level: e.severity,
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records())
    }

    pub fn write_report(&self, path: &Path) -> Result<(), DocsGenError> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
