//! Feature schema definitions
//!
//! The authoritative feature schema is the ordered list of tabular column
//! names the scoring model was trained on. It is stored as a JSON array,
//! for example `["activos", "pasivos", "ventas"]`.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordered tabular feature columns, as used at training time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Create a validated schema. Order is significant and kept as given.
    pub fn new(columns: Vec<String>) -> Result<Self, SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::EmptySchema);
        }

        let mut seen = AHashSet::with_capacity(columns.len());
        for (position, name) in columns.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(SchemaError::BlankColumn(position));
            }
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateColumn(name.clone()));
            }
        }

        Ok(Self { columns })
    }

    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let schema: FeatureSchema = serde_json::from_str(json)?;
        Ok(schema)
    }

    /// Read a schema artifact from disk. `Ok(None)` if the file does not exist.
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<Self>, SchemaError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_json_str(&content).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SchemaError::Io(e)),
        }
    }

    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = SchemaError;

    fn try_from(columns: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.columns
    }
}

/// Errors that can occur while loading or validating a feature schema
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Schema cannot be empty")]
    EmptySchema,

    #[error("Column at position {0} has an empty name")]
    BlankColumn(usize),

    #[error("Column '{0}' is declared more than once")]
    DuplicateColumn(String),

    #[error("Schema artifact is not a JSON array of column names: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Cannot read schema artifact: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SchemaError> for pymescore_core::Error {
    fn from(err: SchemaError) -> Self {
        pymescore_core::Error::Schema(err.to_string())
    }
}
