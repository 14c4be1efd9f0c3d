//! Diagnostic codes and extraction warnings
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Table references (1xxx)
    /// A FROM/JOIN span yielded no usable table identifier
    SqlUnparsableClause,

    /// Two references share an alias, or an identical reference repeats
    SqlAliasCollision,

    /// Tokens remain after a table reference and its alias
    SqlTrailingTokens,

    /// Table name with three or more dotted parts
    SqlMultipartName,

    // Join graph (2xxx)
    /// ON without a JOIN, JOIN without a left table, or an invalid qualifier sequence
    SqlUnmatchedKeyword,

    /// A JOIN without an ON or USING condition
    SqlJoinMissingCondition,

    /// An ON conjunct that is not a simple column equality
    SqlAmbiguousCondition,

    // Projection (3xxx)
    /// A column expression too complex to assign a table hint
    SqlComplexColumn,

    // Statement level (4xxx)
    /// Syntax outside the supported subset (subqueries, CTEs, set operations)
    SqlUnsupportedSyntax,

    /// A quoted span never closes
    SqlUnterminatedQuote,

    /// Strict validation could not parse the statement
    SqlParseError,

    // General warnings (9xxx)
    /// General informational message
    Info,

    /// General warning message
    Warning,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SqlUnparsableClause => "SQL_UNPARSABLE_CLAUSE",
            Self::SqlAliasCollision => "SQL_ALIAS_COLLISION",
            Self::SqlTrailingTokens => "SQL_TRAILING_TOKENS",
            Self::SqlMultipartName => "SQL_MULTIPART_NAME",
            Self::SqlUnmatchedKeyword => "SQL_UNMATCHED_KEYWORD",
            Self::SqlJoinMissingCondition => "SQL_JOIN_MISSING_CONDITION",
            Self::SqlAmbiguousCondition => "SQL_AMBIGUOUS_CONDITION",
            Self::SqlComplexColumn => "SQL_COMPLEX_COLUMN",
            Self::SqlUnsupportedSyntax => "SQL_UNSUPPORTED_SYNTAX",
            Self::SqlUnterminatedQuote => "SQL_UNTERMINATED_QUOTE",
            Self::SqlParseError => "SQL_PARSE_ERROR",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - extraction is partial and should be reviewed
    Warn,

    /// Error - only produced through severity overrides
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The extracted element a diagnostic is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "lowercase")]
pub enum ElementRef {
    /// Index into `SqlSemantics::tables`
    Table(usize),

    /// Index into `SqlSemantics::joins`
    Join(usize),

    /// Index into `SqlSemantics::columns`
    Column(usize),

    /// Index of the clause in segmenter order (for clauses that produced nothing)
    Clause(usize),
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table(i) => write!(f, "table[{}]", i),
            Self::Join(i) => write!(f, "join[{}]", i),
            Self::Column(i) => write!(f, "column[{}]", i),
            Self::Clause(i) => write!(f, "clause[{}]", i),
        }
    }
}

/// Byte range in the normalized query text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start offset (inclusive)
    pub start: usize,

    /// End offset (exclusive)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Slice the text this span covers, if it is in bounds
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start..self.end)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Affected element (best-effort)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementRef>,

    /// Location in the normalized query (best-effort)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,

    /// Confidence factor this issue contributes, in [0.0, 1.0]
    pub confidence: f64,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            element: None,
            span: None,
            confidence: 1.0,
        }
    }

    /// Set the affected element
    pub fn with_element(mut self, element: ElementRef) -> Self {
        self.element = Some(element);
        self
    }

    /// Set the span (`None` leaves it unset)
    pub fn with_span(mut self, span: impl Into<Option<Span>>) -> Self {
        self.span = span.into();
        self
    }

    /// Set the confidence factor, clamped to [0.0, 1.0]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        self
    }

    /// Whether this diagnostic lowers confidence
    pub fn is_penalty(&self) -> bool {
        self.confidence < 1.0
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.severity, self.code)?;
        if let Some(element) = &self.element {
            write!(f, " {}", element)?;
        }
        write!(f, ": {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_code_stability() {
        // Ensure codes are stable strings
        assert_eq!(DiagnosticCode::SqlUnparsableClause.as_str(), "SQL_UNPARSABLE_CLAUSE");
        assert_eq!(DiagnosticCode::SqlJoinMissingCondition.as_str(), "SQL_JOIN_MISSING_CONDITION");
    }

    #[test]
    fn serde_names_match_as_str() {
        let json = serde_json::to_string(&DiagnosticCode::SqlAliasCollision).unwrap();
        assert_eq!(json, "\"SQL_ALIAS_COLLISION\"");
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::new(
            DiagnosticCode::SqlUnparsableClause,
            Severity::Warn,
            "JOIN clause has no table name",
        )
        .with_element(ElementRef::Clause(2))
        .with_confidence(0.6);

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("SQL_UNPARSABLE_CLAUSE"));
        assert!(json.contains("\"kind\":\"clause\""));
        assert!(json.contains("warn"));
        assert!(!json.contains("span"));
    }

    #[test]
    fn confidence_is_clamped() {
        let diag = Diagnostic::new(DiagnosticCode::Warning, Severity::Warn, "x").with_confidence(1.7);
        assert_eq!(diag.confidence, 1.0);
        assert!(!diag.is_penalty());

        let diag = Diagnostic::new(DiagnosticCode::Warning, Severity::Warn, "x").with_confidence(-0.2);
        assert_eq!(diag.confidence, 0.0);
        assert!(diag.is_penalty());
    }

    #[test]
    fn display_includes_element() {
        let diag = Diagnostic::new(DiagnosticCode::SqlComplexColumn, Severity::Info, "no table hint")
            .with_element(ElementRef::Column(3));
        assert_eq!(diag.to_string(), "info [SQL_COMPLEX_COLUMN] column[3]: no table hint");
    }

    #[test]
    fn span_slicing() {
        let span = Span::new(7, 15);
        assert_eq!(span.slice("SELECT Products"), Some("Products"));
        assert_eq!(Span::new(3, 40).slice("abc"), None);
    }
}
