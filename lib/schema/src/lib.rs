//! # pymescore Schema
//!
//! Turns uploaded tables into the tabular block of a feature matrix.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Loader    │────>│   Filter    │────>│    Merge    │────>│  Resolver   │
//! │ (bytes→rows)│     │ (one RUC)   │     │ (left join) │     │ (columns)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! The resolver uses the authoritative [`FeatureSchema`] when one was shipped
//! with the model. Without it the numeric columns of the merged table are
//! used as-is; that fallback is reported as [`SchemaMode::Degraded`] because
//! its width and order follow whatever columns the upload happened to have.
//!
//! ## Example
//!
//! ```rust
//! use pymescore_schema::{merge, EntityFilter, FeatureSchema, SchemaResolver, TableLoader};
//! use pymescore_core::SourceKind;
//!
//! let loader = TableLoader::default();
//! let balances = loader
//!     .load(b"ruc\tactivos\n0912345678\t100\n", SourceKind::Balances)
//!     .unwrap();
//!
//! let primary = EntityFilter::new(SourceKind::Balances, "0912345678")
//!     .apply(&balances)
//!     .require_rows()
//!     .unwrap();
//! let merged = merge(primary, &[]).unwrap();
//!
//! let schema = FeatureSchema::from_json_str(r#"["activos", "pasivos"]"#).unwrap();
//! let block = SchemaResolver::new(Some(&schema), "texto_financiero").resolve(&merged);
//! assert_eq!(block.rows, vec![vec![100.0, 0.0]]);
//! ```

pub mod filter;
pub mod loader;
pub mod reconcile;
pub mod schema;

pub use filter::{DuplicatePolicy, EntityFilter, EntityRecordSet};
pub use loader::{LoadOptions, TableLoader, DEFAULT_TEXT_COLUMN};
pub use reconcile::{merge, ReconciledTable, SchemaResolver, TabularBlock};
pub use schema::{FeatureSchema, SchemaError};

pub use pymescore_core::SchemaMode;
