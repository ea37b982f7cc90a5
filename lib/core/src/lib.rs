//! # pymescore Core
//!
//! Shared types for the pymescore scoring pipeline.
//!
//! - [`RawTable`] - a parsed upload, columns in upload order
//! - [`CellValue`] - one parsed cell (missing, number or text)
//! - [`SourceKind`] - which upload a table came from and how to read it
//! - [`EmbeddingVector`] - pooled text embedding for one row
//! - [`FeatureMatrix`] - `[tabular | embedding]` rows for the scoring model
//! - [`ScoreResult`] - the bounded per-entity score
//! - [`Error`] - the pipeline error taxonomy

pub mod error;
pub mod matrix;
pub mod score;
pub mod source;
pub mod table;
pub mod value;
pub mod vector;

pub use error::{Error, ErrorKind, Result};
pub use matrix::FeatureMatrix;
pub use score::{SchemaMode, ScoreResult};
pub use source::SourceKind;
pub use table::RawTable;
pub use value::CellValue;
pub use vector::EmbeddingVector;
