//! Metadata graph output
//!
//! Flattens `SqlSemantics` into the property bundle stored on a metadata
//! graph node, plus one `REFERENCES` edge per join.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlsem_core::{ConfidenceLevel, ConfidenceThresholds, Origin, SqlSemantics, TableReference};

/// Derivation method recorded on every bundle
pub const DERIVATION_METHOD: &str = "sql_parsing";

/// Edge type for join edges
pub const JOIN_EDGE_TYPE: &str = "REFERENCES";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub schema: Option<String>,
    pub name: String,
    pub alias: Option<String>,
}

impl From<&TableReference> for TableEntry {
    fn from(table: &TableReference) -> Self {
        Self {
            schema: table.schema.clone(),
            name: table.name.clone(),
            alias: table.alias.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinEntry {
    pub left_table: TableEntry,
    pub right_table: TableEntry,
    pub join_type: String,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub expression: String,
    pub alias: Option<String>,
}

/// Node properties for one extracted statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataBundle {
    pub original_query: String,
    pub tables: Vec<TableEntry>,
    pub joins: Vec<JoinEntry>,
    pub columns: Vec<ColumnEntry>,
    pub derivation_method: String,
    pub confidence_level: ConfidenceLevel,
    pub confidence: f64,
    pub file_path: String,
    pub property_name: String,
    pub xml_location: Option<String>,
}

impl MetadataBundle {
    pub fn new(semantics: &SqlSemantics, origin: &Origin, thresholds: &ConfidenceThresholds) -> Self {
        let joins = semantics
            .joins
            .iter()
            .filter_map(|join| {
                let (left, right) = semantics.join_tables(join)?;
                Some(JoinEntry {
                    left_table: left.into(),
                    right_table: right.into(),
                    join_type: join.join_kind.as_sql().to_string(),
                    condition: join.condition_text.clone(),
                })
            })
            .collect();

        Self {
            original_query: semantics.original_query.clone(),
            tables: semantics.tables.iter().map(TableEntry::from).collect(),
            joins,
            columns: semantics
                .columns
                .iter()
                .map(|c| ColumnEntry {
                    expression: c.expression.clone(),
                    alias: c.alias.clone(),
                })
                .collect(),
            derivation_method: DERIVATION_METHOD.to_string(),
            confidence_level: semantics.confidence_level(thresholds),
            confidence: semantics.confidence,
            file_path: origin.file_path.clone(),
            property_name: origin.property_name.clone(),
            xml_location: origin.xml_location.clone(),
        }
    }

    /// Bundle as a JSON property map
    pub fn to_properties(&self) -> Result<Map<String, Value>, LineageError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(LineageError::NotAnObject(other.to_string())),
        }
    }
}

/// Properties on a join edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinEdgeProperties {
    pub join_type: String,
    pub condition: Option<String>,
    pub left_alias: Option<String>,
    pub right_alias: Option<String>,
    pub relationship_type: String,
}

/// A table-to-table edge derived from one join
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinEdge {
    pub source_id: String,
    pub target_id: String,
    pub edge_type: String,
    pub properties: JoinEdgeProperties,
}

fn table_node_id(table: &TableReference) -> String {
    format!("table:{}", table.full_name())
}

/// One `REFERENCES` edge per join, in join order
pub fn join_edges(semantics: &SqlSemantics) -> Vec<JoinEdge> {
    semantics
        .joins
        .iter()
        .filter_map(|join| {
            let (left, right) = semantics.join_tables(join)?;
            Some(JoinEdge {
                source_id: table_node_id(left),
                target_id: table_node_id(right),
                edge_type: JOIN_EDGE_TYPE.to_string(),
                properties: JoinEdgeProperties {
                    join_type: join.join_kind.as_sql().to_string(),
                    condition: join.condition_text.clone(),
                    left_alias: left.alias.clone(),
                    right_alias: right.alias.clone(),
                    relationship_type: "join_relationship".to_string(),
                },
            })
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum LineageError {
    #[error("Failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Metadata serialized to a non-object value: {0}")]
    NotAnObject(String),
}
