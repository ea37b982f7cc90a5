use serde::{Deserialize, Serialize};

/// How the tabular columns were selected for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaMode {
    /// Columns taken from the training-time feature list
    Authoritative,
    /// Columns inferred from the upload; order and width may drift between requests
    Degraded,
}

impl SchemaMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaMode::Authoritative => "authoritative",
            SchemaMode::Degraded => "degraded",
        }
    }
}

/// The per-entity outcome returned to callers. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub ruc: String,
    /// Bounded score in [0, 100]
    pub score: u8,
    /// Rows that went into the score
    pub n_registros: usize,
    /// Leading row-level model outputs
    pub probabilidades: Vec<f64>,
    pub schema_mode: SchemaMode,
}
