//! Confidence accounting
//!
//! Collects diagnostics in encounter order and multiplies their penalty
//! factors into the aggregate score.

use sqlsem_core::{Diagnostic, PenaltyTable, SeverityThreshold};

/// Diagnostic sink for a single extraction
#[derive(Debug)]
pub struct ConfidenceTracker<'a> {
    penalties: &'a PenaltyTable,
    severity: &'a SeverityThreshold,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ConfidenceTracker<'a> {
    pub fn new(penalties: &'a PenaltyTable, severity: &'a SeverityThreshold) -> Self {
        Self {
            penalties,
            severity,
            diagnostics: Vec::new(),
        }
    }

    /// Record a diagnostic carrying its code's configured penalty
    pub fn report(&mut self, diagnostic: Diagnostic) {
        let factor = self.penalties.factor(diagnostic.code);
        self.record(diagnostic.with_confidence(factor));
    }

    /// Record a diagnostic that leaves confidence untouched
    pub fn note(&mut self, diagnostic: Diagnostic) {
        self.record(diagnostic.with_confidence(1.0));
    }

    fn record(&mut self, mut diagnostic: Diagnostic) {
        diagnostic.severity = self.severity.get_severity(diagnostic.code, diagnostic.severity);
        self.diagnostics.push(diagnostic);
    }

    /// Product of all recorded factors, clamped to [0.0, 1.0]
    pub fn confidence(&self) -> f64 {
        self.diagnostics
            .iter()
            .map(|d| d.confidence)
            .product::<f64>()
            .clamp(0.0, 1.0)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
