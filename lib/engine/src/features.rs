//! Feature Matrix Builder
//!
//! Row `i` of the matrix is the tabular values of reconciled row `i`
//! followed by the embedding of reconciled row `i`. Columns are always
//! `[schema columns in order] ++ [emb_0 .. emb_{d-1}]`.

use pymescore_core::{EmbeddingVector, Error, FeatureMatrix, Result};
use pymescore_schema::TabularBlock;

pub const EMBEDDING_COLUMN_PREFIX: &str = "emb_";

pub fn embedding_column_names(dim: usize) -> impl Iterator<Item = String> {
    (0..dim).map(|i| format!("{}{}", EMBEDDING_COLUMN_PREFIX, i))
}

/// Concatenate the tabular and embedding blocks row by row.
///
/// A row-count mismatch between the two blocks is an internal defect and
/// is reported, never truncated or padded.
pub fn build_feature_matrix(
    tabular: &TabularBlock,
    embeddings: &[EmbeddingVector],
) -> Result<FeatureMatrix> {
    if tabular.len() != embeddings.len() {
        return Err(Error::RowCountMismatch {
            tabular: tabular.len(),
            embedding: embeddings.len(),
        });
    }

    let dim = embeddings.first().map(EmbeddingVector::dim).unwrap_or(0);
    if let Some(bad) = embeddings.iter().find(|e| e.dim() != dim) {
        return Err(Error::Embedding(format!(
            "embedding block is ragged: {} vs {} dimensions",
            dim,
            bad.dim()
        )));
    }

    let mut columns = tabular.columns.clone();
    columns.extend(embedding_column_names(dim));
    let mut matrix = FeatureMatrix::new(columns, tabular.width());

    let mut row = Vec::with_capacity(tabular.width() + dim);
    for (values, embedding) in tabular.rows.iter().zip(embeddings) {
        row.clear();
        row.extend_from_slice(values);
        row.extend(embedding.as_slice().iter().map(|&x| f64::from(x)));
        matrix.push_row(&row)?;
    }
    Ok(matrix)
}
