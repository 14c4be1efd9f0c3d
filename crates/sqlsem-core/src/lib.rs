//! sqlsem Core
//!
//! Core domain model with stable, versioned types.
//! Never rename diagnostic codes - they are part of the public API.

pub mod diagnostic;
pub mod semantics;
pub mod origin;
pub mod report;
pub mod config;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, ElementRef, Span};
pub use semantics::{
    SqlSemantics, TableReference, JoinClause, JoinKind, ConditionPair, ColumnProjection,
    StatementKind, ConfidenceLevel, MigrationSummary,
};
pub use origin::Origin;
pub use report::{Report, ReportEntry, ReportSummary, ReportVersion};
pub use config::{
    Config, ConfigError, DialectConfig, ExtractionSettings, ConfidenceThresholds, PenaltyTable,
    SeverityThreshold,
};
