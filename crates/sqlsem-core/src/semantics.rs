//! Extracted SQL semantics
//!
//! The immutable record produced for one SQL statement: referenced tables in
//! appearance order, the join graph, and the column projection list.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ConfidenceThresholds;
use crate::diagnostic::{Diagnostic, DiagnosticCode};

/// SQL join variant, recorded but never evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinKind {
    #[serde(alias = "inner")]
    Inner,
    #[serde(alias = "left")]
    Left,
    #[serde(alias = "right")]
    Right,
    #[serde(alias = "full")]
    Full,
    #[serde(alias = "cross")]
    Cross,
    /// Qualifiers did not map to a known join kind
    #[serde(alias = "unspecified")]
    Unspecified,
}

impl JoinKind {
    /// Canonical SQL spelling of the join keyword sequence
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL OUTER JOIN",
            Self::Cross => "CROSS JOIN",
            Self::Unspecified => "JOIN",
        }
    }

    /// Whether a join of this kind is expected to carry a condition
    pub fn expects_condition(&self) -> bool {
        !matches!(self, Self::Cross)
    }
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

impl std::str::FromStr for JoinKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inner" => Ok(Self::Inner),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "full" => Ok(Self::Full),
            "cross" => Ok(Self::Cross),
            "unspecified" => Ok(Self::Unspecified),
            other => Err(format!("Invalid join kind: {}", other)),
        }
    }
}

/// A table designator found in a FROM or JOIN clause
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableReference {
    /// Schema qualifier, quoting stripped
    pub schema: Option<String>,

    /// Table name, quoting stripped (never empty)
    pub name: String,

    /// Alias, case preserved
    pub alias: Option<String>,

    /// 0-based position among all table references in the statement
    pub appearance_order: usize,
}

impl TableReference {
    pub fn new(schema: Option<String>, name: impl Into<String>, alias: Option<String>, appearance_order: usize) -> Self {
        Self {
            schema,
            name: name.into(),
            alias,
            appearance_order,
        }
    }

    /// `schema.name`, or just `name` when unqualified
    pub fn full_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    /// Alias if present, otherwise the table name
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Identity key: two references are the same entry iff these match
    pub fn identity_key(&self) -> (Option<&str>, &str, Option<&str>) {
        (self.schema.as_deref(), self.name.as_str(), self.alias.as_deref())
    }

    /// Whether `qualifier` (a column prefix such as `c` or `dbo.Categories`) names this reference
    pub fn answers_to(&self, qualifier: &str) -> bool {
        if let Some(alias) = &self.alias {
            return alias.eq_ignore_ascii_case(qualifier);
        }
        self.name.eq_ignore_ascii_case(qualifier) || self.full_name().eq_ignore_ascii_case(qualifier)
    }
}

/// A best-effort `left = right` equality from an ON clause
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionPair {
    pub left: String,
    pub right: String,
}

impl ConditionPair {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// One edge of the join graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinClause {
    /// Appearance order of the left table (always `right - 1`)
    pub left: usize,

    /// Appearance order of the table introduced by this join
    pub right: usize,

    /// Join kind derived from the qualifier words
    pub join_kind: JoinKind,

    /// Raw condition text; absent for comma and cross joins
    pub condition_text: Option<String>,

    /// Simple equalities split out of the condition (may be partial)
    pub condition_pairs: Vec<ConditionPair>,
}

/// One entry of the SELECT list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnProjection {
    /// Raw expression text without the alias
    pub expression: String,

    /// Output alias
    pub alias: Option<String>,

    /// Table alias or name prefix of a `prefix.column` expression
    pub table_hint: Option<String>,

    /// Terminal identifier of a simple column reference
    pub column_name: Option<String>,

    /// 0-based position in the SELECT list
    pub ordinal: usize,
}

impl ColumnProjection {
    /// Alias, else column name, else the raw expression
    pub fn effective_name(&self) -> &str {
        self.alias
            .as_deref()
            .or(self.column_name.as_deref())
            .unwrap_or(&self.expression)
    }

    /// Whether this projection is `*` or `prefix.*`
    pub fn is_wildcard(&self) -> bool {
        self.expression == "*" || self.expression.ends_with(".*")
    }
}

/// Statement classification by leading keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Execute,
    Create,
    Drop,
    Merge,
    #[default]
    Unknown,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Execute => "EXECUTE",
            Self::Create => "CREATE",
            Self::Drop => "DROP",
            Self::Merge => "MERGE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse confidence bucket used to decide whether manual review is warranted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Bucket a numeric confidence score
    pub fn from_score(score: f64, thresholds: &ConfidenceThresholds) -> Self {
        if score >= thresholds.high_threshold {
            Self::High
        } else if score >= thresholds.medium_threshold {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConfidenceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Invalid confidence level: {}", s)),
        }
    }
}

/// Counts consumed by migration code generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub table_count: usize,
    pub join_count: usize,
    pub column_count: usize,
    pub has_aliases: bool,
    pub has_joins: bool,
    /// Distinct join kinds in first-seen order
    pub join_kinds: Vec<JoinKind>,
}

/// Complete extraction result for one statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlSemantics {
    /// Verbatim input
    pub original_query: String,

    /// Leading-keyword classification
    pub statement_kind: StatementKind,

    /// Table references in appearance order, unique by identity key
    pub tables: Vec<TableReference>,

    /// Joins in encounter order
    pub joins: Vec<JoinClause>,

    /// SELECT list entries in ordinal order
    pub columns: Vec<ColumnProjection>,

    /// Whether the projection was `SELECT DISTINCT`
    pub distinct: bool,

    /// Verbatim top-level WHERE clause
    pub where_clause: Option<String>,

    /// Number of `?` placeholders outside quoted spans
    pub parameter_count: usize,

    /// Aggregate confidence in [0.0, 1.0]
    pub confidence: f64,

    /// Non-fatal issues in encounter order
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Serialize)]
struct HashedContent<'a> {
    tables: &'a [TableReference],
    joins: &'a [JoinClause],
    columns: &'a [ColumnProjection],
    where_clause: &'a Option<String>,
}

impl SqlSemantics {
    /// Result for absent or blank input: nothing extracted, no diagnostics
    pub fn empty(original_query: impl Into<String>) -> Self {
        Self {
            original_query: original_query.into(),
            statement_kind: StatementKind::Unknown,
            tables: Vec::new(),
            joins: Vec::new(),
            columns: Vec::new(),
            distinct: false,
            where_clause: None,
            parameter_count: 0,
            confidence: 1.0,
            diagnostics: Vec::new(),
        }
    }

    /// Whether nothing was extracted
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.columns.is_empty() && self.joins.is_empty()
    }

    /// Table at an appearance order
    pub fn table(&self, appearance_order: usize) -> Option<&TableReference> {
        self.tables.iter().find(|t| t.appearance_order == appearance_order)
    }

    /// Left and right tables of a join
    pub fn join_tables(&self, join: &JoinClause) -> Option<(&TableReference, &TableReference)> {
        Some((self.table(join.left)?, self.table(join.right)?))
    }

    /// Resolve a column's table hint to a table reference (alias first, then name)
    pub fn resolve_hint(&self, column: &ColumnProjection) -> Option<&TableReference> {
        let hint = column.table_hint.as_deref()?;
        self.tables
            .iter()
            .find(|t| t.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(hint)))
            .or_else(|| self.tables.iter().find(|t| t.answers_to(hint)))
    }

    /// Bucket the aggregate confidence
    pub fn confidence_level(&self, thresholds: &ConfidenceThresholds) -> ConfidenceLevel {
        ConfidenceLevel::from_score(self.confidence, thresholds)
    }

    /// Diagnostics with a given code
    pub fn diagnostics_with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    pub fn summary(&self) -> MigrationSummary {
        let mut join_kinds = Vec::new();
        for join in &self.joins {
            if !join_kinds.contains(&join.join_kind) {
                join_kinds.push(join.join_kind);
            }
        }

        MigrationSummary {
            table_count: self.tables.len(),
            join_count: self.joins.len(),
            column_count: self.columns.len(),
            has_aliases: self.columns.iter().any(|c| c.alias.is_some()),
            has_joins: !self.joins.is_empty(),
            join_kinds,
        }
    }

    /// Hex SHA-256 over the extracted structure
    ///
    /// Stable across runs for the same input; diagnostics and confidence are
    /// not part of the hash.
    pub fn content_hash(&self) -> String {
        let content = HashedContent {
            tables: &self.tables,
            joins: &self.joins,
            columns: &self.columns,
            where_clause: &self.where_clause,
        };
        // Serializing plain strings, vectors and enums cannot fail
        let bytes = serde_json::to_vec(&content).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}
