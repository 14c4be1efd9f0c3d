//! Extraction entry point
//!
//! `SqlExtractor::extract` runs the whole pipeline over one statement:
//! tokenize and normalize, segment, then build the join graph and the
//! projection list. It never fails; problems become diagnostics on the
//! returned `SqlSemantics`.

use serde::{Deserialize, Serialize};
use sqlsem_core::{Config, Diagnostic, DiagnosticCode, Origin, Severity, Span, SqlSemantics};

use crate::confidence::ConfidenceTracker;
use crate::joins::build_join_graph;
use crate::normalizer::normalize;
use crate::projection::{parse_projection, Projection};
use crate::segmenter::{segment, ClauseKind};
use crate::statement::{classify, count_placeholders};
use crate::validator::StatementValidator;

/// Semantics paired with the caller's provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub origin: Origin,
    pub semantics: SqlSemantics,
}

/// SQL reference extractor
///
/// Holds only configuration, so one instance can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct SqlExtractor {
    config: Config,
}

impl SqlExtractor {
    /// Create an extractor with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Extract tables, joins and columns from one statement
    ///
    /// Absent or blank input yields an empty result with no diagnostics.
    pub fn extract(&self, sql: Option<&str>) -> SqlSemantics {
        let Some(original) = sql else {
            return SqlSemantics::empty("");
        };
        if original.trim().is_empty() {
            return SqlSemantics::empty(original);
        }

        let mut tracker = ConfidenceTracker::new(&self.config.penalties, &self.config.severity);
        let input = self.truncate(original, &mut tracker);

        let normalized = normalize(input);
        if normalized.text.is_empty() {
            // Comments only
            return SqlSemantics::empty(original);
        }
        let text = normalized.text.as_str();
        let tokens = normalized.tokens.as_slice();

        if let Some(failure) = &normalized.failure {
            tracker.report(
                Diagnostic::new(
                    DiagnosticCode::SqlUnparsableClause,
                    Severity::Warn,
                    format!("query text could not be tokenized: {}", failure),
                )
                .with_span(Span::new(0, text.len())),
            );
        }

        if let Some((style, start)) = normalized.unterminated {
            tracker.report(
                Diagnostic::new(
                    DiagnosticCode::SqlUnterminatedQuote,
                    Severity::Warn,
                    format!("quoted span is never closed (expected '{}')", style.closer()),
                )
                .with_span(Span::new(start, text.len())),
            );
        }

        let statement_kind = classify(tokens);
        let parameter_count = count_placeholders(tokens);
        let clauses = segment(tokens, &mut tracker);

        let projection = clauses
            .iter()
            .position(|c| c.kind == ClauseKind::Select)
            .map(|index| parse_projection(clauses[index].body(tokens), text, index, &mut tracker))
            .unwrap_or_default();
        let Projection { columns, distinct } = projection;

        let graph = build_join_graph(
            &clauses,
            tokens,
            text,
            self.config.extraction.default_join_kind,
            &mut tracker,
        );

        let where_clause = clauses
            .iter()
            .find(|c| c.kind == ClauseKind::Where)
            .map(|c| c.body_text(tokens, text))
            .filter(|body| !body.is_empty())
            .map(String::from);

        if self.config.extraction.strict_validation {
            let validator = StatementValidator::new(self.config.dialect);
            if let Err(diagnostic) = validator.validate_with_diagnostic(input) {
                tracker.report(diagnostic);
            }
        }

        let confidence = tracker.confidence();
        tracing::debug!(
            statement = %statement_kind,
            tables = graph.tables.len(),
            joins = graph.joins.len(),
            columns = columns.len(),
            diagnostics = tracker.diagnostics().len(),
            confidence,
            "extracted SQL semantics"
        );

        SqlSemantics {
            original_query: original.to_string(),
            statement_kind,
            tables: graph.tables,
            joins: graph.joins,
            columns,
            distinct,
            where_clause,
            parameter_count,
            confidence,
            diagnostics: tracker.into_diagnostics(),
        }
    }

    /// Extract and attach the caller's origin untouched
    pub fn extract_with_origin(&self, sql: Option<&str>, origin: Origin) -> Extraction {
        Extraction {
            semantics: self.extract(sql),
            origin,
        }
    }

    /// Cut input at `max_query_bytes` on a char boundary
    fn truncate<'s>(&self, sql: &'s str, tracker: &mut ConfidenceTracker<'_>) -> &'s str {
        let max = self.config.extraction.max_query_bytes;
        if sql.len() <= max {
            return sql;
        }

        let mut end = max;
        while !sql.is_char_boundary(end) {
            end -= 1;
        }
        tracker.note(Diagnostic::new(
            DiagnosticCode::SqlUnsupportedSyntax,
            Severity::Info,
            format!("query is {} bytes; only the first {} were extracted", sql.len(), end),
        ));
        &sql[..end]
    }
}

/// Extract with the default configuration
pub fn extract(sql: Option<&str>) -> SqlSemantics {
    SqlExtractor::new().extract(sql)
}
