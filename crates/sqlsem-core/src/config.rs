//! Configuration schema (sqlsem.toml)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::diagnostic::{DiagnosticCode, Severity};
use crate::semantics::JoinKind;

/// SQL dialect used for strict validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectConfig {
    /// T-SQL (SSIS packages)
    MsSql,

    /// Generic ANSI SQL
    Generic,

    /// MySQL
    MySql,

    /// PostgreSQL
    Postgres,

    /// Snowflake
    Snowflake,

    /// BigQuery
    BigQuery,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self::MsSql
    }
}

/// Severity threshold overrides for specific diagnostic codes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityThreshold {
    /// Map of diagnostic code to severity override
    pub overrides: HashMap<String, Severity>,
}

impl Default for SeverityThreshold {
    fn default() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }
}

impl SeverityThreshold {
    /// Get severity for a diagnostic code, or default
    pub fn get_severity(&self, code: DiagnosticCode, default: Severity) -> Severity {
        self.overrides
            .get(code.as_str())
            .copied()
            .unwrap_or(default)
    }

    /// Set severity override for a code
    pub fn set_override(&mut self, code: DiagnosticCode, severity: Severity) {
        self.overrides.insert(code.as_str().to_string(), severity);
    }
}

/// Extraction behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Join kind recorded for a bare `JOIN`
    pub default_join_kind: JoinKind,

    /// Also parse each statement with sqlparser and report failures
    pub strict_validation: bool,

    /// Input beyond this many bytes is truncated before extraction
    pub max_query_bytes: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            default_join_kind: JoinKind::Inner,
            strict_validation: false,
            max_query_bytes: 1024 * 1024,
        }
    }
}

/// Score boundaries for confidence levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    /// Scores at or above this are `high`
    pub high_threshold: f64,

    /// Scores at or above this (and below high) are `medium`
    pub medium_threshold: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high_threshold: 0.8,
            medium_threshold: 0.5,
        }
    }
}

/// Per-element confidence factors, each in (0.0, 1.0]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyTable {
    pub unparsable_clause: f64,
    pub unmatched_keyword: f64,
    pub join_missing_condition: f64,
    pub alias_collision: f64,
    pub complex_column: f64,
    pub unsupported_syntax: f64,
    pub trailing_tokens: f64,
    pub unterminated_quote: f64,
    pub statement_parse_error: f64,
}

impl Default for PenaltyTable {
    fn default() -> Self {
        Self {
            unparsable_clause: 0.6,
            unmatched_keyword: 0.8,
            join_missing_condition: 0.7,
            alias_collision: 0.8,
            complex_column: 0.95,
            unsupported_syntax: 0.7,
            trailing_tokens: 0.85,
            unterminated_quote: 0.7,
            statement_parse_error: 0.9,
        }
    }
}

impl PenaltyTable {
    /// Confidence factor for a diagnostic code (1.0 for codes that carry no penalty)
    pub fn factor(&self, code: DiagnosticCode) -> f64 {
        match code {
            DiagnosticCode::SqlUnparsableClause => self.unparsable_clause,
            DiagnosticCode::SqlUnmatchedKeyword => self.unmatched_keyword,
            DiagnosticCode::SqlJoinMissingCondition => self.join_missing_condition,
            DiagnosticCode::SqlAliasCollision => self.alias_collision,
            DiagnosticCode::SqlComplexColumn => self.complex_column,
            DiagnosticCode::SqlUnsupportedSyntax => self.unsupported_syntax,
            DiagnosticCode::SqlTrailingTokens => self.trailing_tokens,
            DiagnosticCode::SqlUnterminatedQuote => self.unterminated_quote,
            DiagnosticCode::SqlParseError => self.statement_parse_error,
            DiagnosticCode::SqlAmbiguousCondition
            | DiagnosticCode::SqlMultipartName
            | DiagnosticCode::Info
            | DiagnosticCode::Warning => 1.0,
        }
    }

    fn entries(&self) -> [(&'static str, f64); 9] {
        [
            ("unparsable_clause", self.unparsable_clause),
            ("unmatched_keyword", self.unmatched_keyword),
            ("join_missing_condition", self.join_missing_condition),
            ("alias_collision", self.alias_collision),
            ("complex_column", self.complex_column),
            ("unsupported_syntax", self.unsupported_syntax),
            ("trailing_tokens", self.trailing_tokens),
            ("unterminated_quote", self.unterminated_quote),
            ("statement_parse_error", self.statement_parse_error),
        ]
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    /// SQL dialect for strict validation
    #[serde(default)]
    pub dialect: DialectConfig,

    /// Extraction behaviour
    #[serde(default)]
    pub extraction: ExtractionSettings,

    /// Confidence level boundaries
    #[serde(default)]
    pub confidence: ConfidenceThresholds,

    /// Per-diagnostic confidence factors
    #[serde(default)]
    pub penalties: PenaltyTable,

    /// Severity thresholds
    #[serde(default)]
    pub severity: SeverityThreshold,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, factor) in self.penalties.entries() {
            if !(factor > 0.0 && factor <= 1.0) {
                return Err(ConfigError::InvalidValue(format!(
                    "penalties.{} must be in (0.0, 1.0], got {}",
                    name, factor
                )));
            }
        }

        let ConfidenceThresholds { high_threshold, medium_threshold } = self.confidence;
        if !(0.0..=1.0).contains(&high_threshold) || !(0.0..=1.0).contains(&medium_threshold) {
            return Err(ConfigError::InvalidValue(
                "confidence thresholds must be in [0.0, 1.0]".to_string(),
            ));
        }
        if medium_threshold > high_threshold {
            return Err(ConfigError::InvalidValue(format!(
                "confidence.medium_threshold ({}) exceeds confidence.high_threshold ({})",
                medium_threshold, high_threshold
            )));
        }

        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
