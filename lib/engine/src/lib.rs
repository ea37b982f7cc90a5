//! # pymescore Engine
//!
//! Turns a reconciled entity table into a credit score.
//!
//! ## Features
//!
//! - **Text Embedding**: mean-pooled BERT hidden states (FinBERT by default, via candle)
//! - **Feature Assembly**: tabular block and embedding block concatenated row by row
//! - **Score Reduction**: mean probability scaled to 0-100 with round-half-to-even
//! - **Pipeline**: one call per request, from raw uploads to [`ScoreResult`]
//!
//! ## Example
//!
//! ```rust
//! use pymescore_engine::{
//!     HashingTokenEncoder, LogisticArtifactModel, ModelSlot, PipelineConfig, ScoreRequest,
//!     ScoringPipeline,
//! };
//! use std::sync::Arc;
//!
//! // ventas, referencia and seguidores, then 16 embedding dimensions
//! let model = LogisticArtifactModel::new(vec![0.0; 19], 0.0);
//! let pipeline = ScoringPipeline::new(
//!     ModelSlot::Loaded(Arc::new(model)),
//!     Arc::new(HashingTokenEncoder::new(16)),
//!     None,
//!     PipelineConfig::default(),
//! );
//!
//! let request = ScoreRequest {
//!     ruc: "0912345678".to_string(),
//!     balances: b"ruc\tventas\n0912345678\t1200\n".to_vec(),
//!     references: b"ruc,referencia\n".to_vec(),
//!     digital_data: b"ruc,seguidores\n".to_vec(),
//! };
//! let result = pipeline.run(&request).unwrap();
//! assert_eq!(result.score, 50);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Reconciled  │────>│  Resolver   │────>│  Tabular    │──┐
//! │   table     │     │ (schema)    │     │   block     │  │   ┌─────────┐   ┌─────────┐
//! └─────────────┘     └─────────────┘     └─────────────┘  ├──>│ Matrix  │──>│ Scorer  │
//!       │             ┌─────────────┐     ┌─────────────┐  │   └─────────┘   └─────────┘
//!       └────────────>│  Embedder   │────>│ Embedding   │──┘
//!                     │ (encoder)   │     │   block     │
//!                     └─────────────┘     └─────────────┘
//! ```

pub mod bert;
pub mod embedder;
pub mod encoder;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod scorer;

// Re-export main types for convenience
pub use bert::{BertFiles, BertTokenEncoder, DEFAULT_BERT_MODEL};
pub use embedder::{TextEmbedder, TokenEncoder, DEFAULT_MAX_TOKENS};
pub use encoder::{HashingTokenEncoder, DEFAULT_HIDDEN_SIZE};
pub use features::{build_feature_matrix, embedding_column_names, EMBEDDING_COLUMN_PREFIX};
pub use model::{LogisticArtifactModel, ModelSlot};
pub use pipeline::{PipelineConfig, ScoreRequest, ScoringPipeline};
pub use scorer::{reduce_probabilities, Scorer, ScoringModel, DEFAULT_DETAIL_LIMIT};
pub use pymescore_core::{SchemaMode, ScoreResult};
