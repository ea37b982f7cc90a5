//! Scorer
//!
//! Runs the pretrained scoring model over a feature matrix and reduces the
//! row-level outputs to one score: `clip(mean(p) * 100, 0, 100)`, rounded
//! half to even.

use pymescore_core::{Error, FeatureMatrix, Result, SchemaMode, ScoreResult};
use std::sync::Arc;

/// Rows of raw model output returned alongside the score
pub const DEFAULT_DETAIL_LIMIT: usize = 50;

/// A pretrained classifier producing one probability-like value per row.
///
/// The model cannot detect a wrong column order; callers must feed columns
/// in training order.
pub trait ScoringModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Column count the model was trained with, if known
    fn n_features(&self) -> Option<usize>;

    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>>;
}

/// Reduce row probabilities to a bounded integer score
pub fn reduce_probabilities(probabilities: &[f64]) -> Result<u8> {
    if probabilities.is_empty() {
        return Err(Error::Inference("model returned no rows".to_string()));
    }
    let mean = probabilities.iter().sum::<f64>() / probabilities.len() as f64;
    if !mean.is_finite() {
        return Err(Error::Inference(format!(
            "model returned non-finite output (mean {})",
            mean
        )));
    }
    let score = (mean * 100.0).clamp(0.0, 100.0).round_ties_even();
    Ok(score as u8)
}

pub struct Scorer {
    model: Arc<dyn ScoringModel>,
    detail_limit: usize,
}

impl Scorer {
    pub fn new(model: Arc<dyn ScoringModel>, detail_limit: usize) -> Self {
        Self {
            model,
            detail_limit,
        }
    }

    pub fn score(&self, key: &str, matrix: &FeatureMatrix, mode: SchemaMode) -> Result<ScoreResult> {
        let mut probabilities = self.model.predict(matrix)?;
        if probabilities.len() != matrix.n_rows() {
            return Err(Error::RowCountMismatch {
                tabular: matrix.n_rows(),
                embedding: probabilities.len(),
            });
        }

        let score = reduce_probabilities(&probabilities)?;
        probabilities.truncate(self.detail_limit);

        Ok(ScoreResult {
            ruc: key.to_string(),
            score,
            n_registros: matrix.n_rows(),
            probabilidades: probabilities,
            schema_mode: mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel(Vec<f64>);

    impl ScoringModel for FixedModel {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn n_features(&self) -> Option<usize> {
            None
        }

        fn predict(&self, _matrix: &FeatureMatrix) -> Result<Vec<f64>> {
            Ok(self.0.clone())
        }
    }

    fn matrix(rows: usize) -> FeatureMatrix {
        let mut m = FeatureMatrix::new(vec!["a".to_string()], 1);
        for i in 0..rows {
            m.push_row(&[i as f64]).unwrap();
        }
        m
    }

    #[test]
    fn test_reduce_mean() {
        assert_eq!(reduce_probabilities(&[0.2, 0.8, 0.5]).unwrap(), 50);
        assert_eq!(reduce_probabilities(&[0.123]).unwrap(), 12);
        assert_eq!(reduce_probabilities(&[0.996]).unwrap(), 100);
    }

    #[test]
    fn test_reduce_clips() {
        assert_eq!(reduce_probabilities(&[1.3]).unwrap(), 100);
        assert_eq!(reduce_probabilities(&[-5.0]).unwrap(), 0);
        assert_eq!(reduce_probabilities(&[-0.05]).unwrap(), 0);
    }

    #[test]
    fn test_reduce_rounds_half_to_even() {
        assert_eq!(reduce_probabilities(&[0.125]).unwrap(), 12);
        assert_eq!(reduce_probabilities(&[0.375]).unwrap(), 38);
        assert_eq!(reduce_probabilities(&[0.25, 0.25]).unwrap(), 25);
    }

    #[test]
    fn test_reduce_rejects_nan_and_empty() {
        assert!(matches!(reduce_probabilities(&[f64::NAN]), Err(Error::Inference(_))));
        assert!(matches!(reduce_probabilities(&[]), Err(Error::Inference(_))));
    }

    #[test]
    fn test_detail_is_capped() {
        let probs: Vec<f64> = (0..60).map(|i| (i % 2) as f64).collect();
        let scorer = Scorer::new(Arc::new(FixedModel(probs)), DEFAULT_DETAIL_LIMIT);
        let result = scorer.score("0912345678", &matrix(60), SchemaMode::Degraded).unwrap();
        assert_eq!(result.n_registros, 60);
        assert_eq!(result.probabilidades.len(), 50);
        assert_eq!(result.score, 50);
    }

    #[test]
    fn test_model_row_count_must_match() {
        let scorer = Scorer::new(Arc::new(FixedModel(vec![0.5, 0.5])), 50);
        assert!(matches!(
            scorer.score("1", &matrix(3), SchemaMode::Degraded),
            Err(Error::RowCountMismatch { tabular: 3, embedding: 2 })
        ));
    }
}
