//! Provenance of an extracted statement
//!
//! Attached by the caller and passed through untouched; the engine never
//! interprets it.

use serde::{Deserialize, Serialize};

/// Where a SQL statement came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Origin {
    /// Package file the statement was read from
    pub file_path: String,

    /// Name of the property holding the statement (e.g. `SqlCommand`)
    pub property_name: String,

    /// Structural location of the property inside the package, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml_location: Option<String>,
}

impl Origin {
    /// Create an origin with just a file path and property name
    pub fn new(file_path: impl Into<String>, property_name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            property_name: property_name.into(),
            xml_location: None,
        }
    }

    /// Set the structural location
    pub fn with_xml_location(mut self, xml_location: impl Into<String>) -> Self {
        self.xml_location = Some(xml_location.into());
        self
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.file_path, self.property_name)?;
        if let Some(location) = &self.xml_location {
            write!(f, " ({})", location)?;
        }
        Ok(())
    }
}
