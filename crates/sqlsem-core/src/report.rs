//! Batch extraction report (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};
use crate::diagnostic::Severity;
use crate::origin::Origin;
use crate::semantics::{ConfidenceLevel, SqlSemantics};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Number of statements extracted
    pub statements: usize,

    /// Total table references
    pub tables: usize,

    /// Total joins
    pub joins: usize,

    /// Total projected columns
    pub columns: usize,

    /// Diagnostics at error severity
    pub errors: usize,

    /// Diagnostics at warn severity
    pub warnings: usize,

    /// Diagnostics at info severity
    pub info: usize,

    /// Statements at high confidence
    pub high_confidence: usize,

    /// Statements at medium confidence
    pub medium_confidence: usize,

    /// Statements at low confidence
    pub low_confidence: usize,
}

/// One extracted statement with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub origin: Origin,
    pub confidence_level: ConfidenceLevel,
    pub semantics: SqlSemantics,
}

/// Extraction report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: ReportSummary,

    /// All extracted statements
    pub entries: Vec<ReportEntry>,
}

impl Report {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary::default(),
            entries: Vec::new(),
        }
    }

    /// Create a report from entries
    pub fn from_entries(entries: Vec<ReportEntry>) -> Self {
        let mut report = Self::new();
        for entry in entries {
            report.add_entry(entry);
        }
        report
    }

    /// Add an entry to the report
    pub fn add_entry(&mut self, entry: ReportEntry) {
        let summary = &mut self.summary;
        summary.statements += 1;
        summary.tables += entry.semantics.tables.len();
        summary.joins += entry.semantics.joins.len();
        summary.columns += entry.semantics.columns.len();

        for diagnostic in &entry.semantics.diagnostics {
            match diagnostic.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warn => summary.warnings += 1,
                Severity::Info => summary.info += 1,
            }
        }

        match entry.confidence_level {
            ConfidenceLevel::High => summary.high_confidence += 1,
            ConfidenceLevel::Medium => summary.medium_confidence += 1,
            ConfidenceLevel::Low => summary.low_confidence += 1,
        }

        self.entries.push(entry);
    }

    /// Entries below a confidence level
    pub fn below(&self, level: ConfidenceLevel) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(move |e| e.confidence_level < level)
    }

    /// Check if the report has any error-severity diagnostics
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}
