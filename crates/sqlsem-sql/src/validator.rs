//! Strict statement validation using datafusion-sqlparser-rs
//!
//! The extractor itself never needs a full parse. When strict validation is
//! enabled, the statement is also run through sqlparser with the configured
//! dialect and a failure is recorded as a diagnostic.

use sqlparser::dialect::{
    BigQueryDialect, Dialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect,
    SnowflakeDialect,
};
use sqlparser::parser::{Parser, ParserError};
use sqlsem_core::{DialectConfig, Diagnostic, DiagnosticCode, Severity};

/// SQL validator with configurable dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementValidator {
    dialect: DialectConfig,
}

impl StatementValidator {
    /// Create a validator from a dialect config
    pub fn new(dialect: DialectConfig) -> Self {
        Self { dialect }
    }

    // Built per call so the validator stays Send + Sync
    fn dialect(&self) -> Box<dyn Dialect> {
        match self.dialect {
            DialectConfig::MsSql => Box::new(MsSqlDialect {}),
            DialectConfig::Generic => Box::new(GenericDialect {}),
            DialectConfig::MySql => Box::new(MySqlDialect {}),
            DialectConfig::Postgres => Box::new(PostgreSqlDialect {}),
            DialectConfig::Snowflake => Box::new(SnowflakeDialect {}),
            DialectConfig::BigQuery => Box::new(BigQueryDialect {}),
        }
    }

    /// Parse SQL, returning the number of statements
    pub fn validate(&self, sql: &str) -> Result<usize, ValidationError> {
        let dialect = self.dialect();
        let statements = Parser::parse_sql(&*dialect, sql)?;
        Ok(statements.len())
    }

    /// Parse SQL and return a diagnostic on failure
    pub fn validate_with_diagnostic(&self, sql: &str) -> Result<usize, Diagnostic> {
        self.validate(sql).map_err(|e| e.to_diagnostic())
    }
}

impl Default for StatementValidator {
    fn default() -> Self {
        Self::new(DialectConfig::default())
    }
}

/// SQL parse failure
#[derive(Debug, thiserror::Error)]
#[error("SQL parse error: {source}")]
pub struct ValidationError {
    #[from]
    source: ParserError,
}

impl ValidationError {
    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(
            DiagnosticCode::SqlParseError,
            Severity::Warn,
            format!("Failed to parse SQL: {}", self.source),
        )
    }
}
