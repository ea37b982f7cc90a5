//! # pymescore
//!
//! Credit scoring for small and medium businesses. One request carries three
//! uploads (balances, commercial references, digital footprint) and a target
//! RUC; the answer is a 0-100 score with its row-level probabilities.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! pymescore --model-path modelo_lgb_finanzas.json --features-path feature_columns.json
//! curl -F ruc_objetivo=0912345678 -F balances_file=@balances.tsv \
//!      -F referencias_file=@referencias.csv -F datos_digitales_file=@digital.csv \
//!      http://localhost:8000/predict
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use pymescore::prelude::*;
//! use std::sync::Arc;
//!
//! let schema = FeatureSchema::load_optional("feature_columns.json").unwrap();
//! let pipeline = ScoringPipeline::new(
//!     ModelSlot::load_logistic("modelo_lgb_finanzas.json"),
//!     Arc::new(BertTokenEncoder::from_pretrained(DEFAULT_BERT_MODEL).unwrap()),
//!     schema,
//!     PipelineConfig::default(),
//! );
//!
//! let request = ScoreRequest {
//!     ruc: "0912345678".to_string(),
//!     balances: std::fs::read("balances.tsv").unwrap(),
//!     references: std::fs::read("referencias.csv").unwrap(),
//!     digital_data: std::fs::read("digital.csv").unwrap(),
//! };
//! let result = pipeline.run(&request).unwrap();
//! println!("{} -> {}", result.ruc, result.score);
//! ```
//!
//! ## Crate Structure
//!
//! - `pymescore-core` - cell values, tables, vectors, matrices, results, errors
//! - `pymescore-schema` - loading, entity filtering, merging, feature schema
//! - `pymescore-engine` - text embedding, feature assembly, scoring, the pipeline
//! - `pymescore-api` - REST API

// Re-export core types
pub use pymescore_core::{
    CellValue, EmbeddingVector, Error, ErrorKind, FeatureMatrix, RawTable, Result, SchemaMode,
    ScoreResult, SourceKind,
};

// Re-export schema handling
pub use pymescore_schema::{
    merge, DuplicatePolicy, EntityFilter, EntityRecordSet, FeatureSchema, LoadOptions,
    ReconciledTable, SchemaError, SchemaResolver, TableLoader, TabularBlock,
};

// Re-export the engine
pub use pymescore_engine::{
    build_feature_matrix, reduce_probabilities, BertTokenEncoder, HashingTokenEncoder,
    LogisticArtifactModel, ModelSlot, PipelineConfig, ScoreRequest, Scorer, ScoringModel,
    ScoringPipeline, TextEmbedder, TokenEncoder, DEFAULT_BERT_MODEL,
};

// Re-export API
pub use pymescore_api::RestApi;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        BertTokenEncoder, DuplicatePolicy, Error, FeatureSchema, HashingTokenEncoder,
        LogisticArtifactModel, ModelSlot, PipelineConfig, Result, ScoreRequest, ScoreResult,
        ScoringModel, ScoringPipeline, TokenEncoder, DEFAULT_BERT_MODEL,
    };
}
