//! SQL reference extraction
//!
//! This crate handles:
//! - Normalizing and tokenizing SQL command text
//! - Segmenting a statement into FROM / JOIN / ON / SELECT clauses
//! - Resolving table designators (quoted, schema-qualified, aliased)
//! - Building the join graph and parsing the SELECT list
//! - Scoring confidence and collecting diagnostics
//! - Optional strict validation with datafusion-sqlparser-rs
//! - Metadata graph output for lineage tooling

pub mod normalizer;
pub mod lexer;
pub mod segmenter;
pub mod resolver;
pub mod joins;
pub mod projection;
pub mod confidence;
pub mod statement;
pub mod validator;
pub mod extract;
pub mod lineage;

pub use extract::{extract, Extraction, SqlExtractor};
pub use lineage::{join_edges, JoinEdge, LineageError, MetadataBundle};
pub use resolver::{resolve_table, ResolveError, ResolvedTable};
pub use validator::{StatementValidator, ValidationError};
