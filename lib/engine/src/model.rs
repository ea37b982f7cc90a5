//! Scoring model artifacts and the startup model slot

use crate::scorer::ScoringModel;
use pymescore_core::{Error, FeatureMatrix, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Exported linear classifier: `p = sigmoid(bias + w · x)`.
///
/// Artifact format: `{ "weights": [..], "bias": 0.0 }`, one weight per
/// feature column in training order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogisticArtifactModel {
    weights: Vec<f64>,
    #[serde(default)]
    bias: f64,
}

impl LogisticArtifactModel {
    pub fn new(weights: Vec<f64>, bias: f64) -> Self {
        Self { weights, bias }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)?;
        if model.weights.is_empty() {
            return Err(Error::Inference("model artifact has no weights".to_string()));
        }
        Ok(model)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

impl ScoringModel for LogisticArtifactModel {
    fn name(&self) -> &'static str {
        "logistic"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.weights.len())
    }

    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        if matrix.n_cols() != self.weights.len() {
            return Err(Error::Inference(format!(
                "feature matrix has {} columns, model expects {}",
                matrix.n_cols(),
                self.weights.len()
            )));
        }
        Ok(matrix
            .rows()
            .map(|row| {
                let z = self.bias + row.iter().zip(&self.weights).map(|(x, w)| x * w).sum::<f64>();
                1.0 / (1.0 + (-z).exp())
            })
            .collect())
    }
}

/// The scoring model as resolved at process start.
///
/// A failed load is kept as `Unavailable` so that every request can be
/// rejected up front with a typed error.
#[derive(Clone)]
pub enum ModelSlot {
    Loaded(Arc<dyn ScoringModel>),
    Unavailable(String),
}

impl std::fmt::Debug for ModelSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSlot::Loaded(model) => f.debug_tuple("Loaded").field(&model.name()).finish(),
            ModelSlot::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
        }
    }
}

impl ModelSlot {
    /// Load a [`LogisticArtifactModel`]; a failure yields `Unavailable`
    pub fn load_logistic(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match LogisticArtifactModel::from_path(path) {
            Ok(model) => {
                info!(path = %path.display(), features = model.weights.len(), "scoring model loaded");
                ModelSlot::Loaded(Arc::new(model))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "scoring model not loaded");
                ModelSlot::Unavailable(format!("cannot load {}: {}", path.display(), e))
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelSlot::Loaded(_))
    }

    pub fn require(&self) -> Result<&Arc<dyn ScoringModel>> {
        match self {
            ModelSlot::Loaded(model) => Ok(model),
            ModelSlot::Unavailable(reason) => Err(Error::ModelUnavailable(reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logistic_predict() {
        let model = LogisticArtifactModel::new(vec![1.0, -1.0], 0.0);
        let mut m = FeatureMatrix::new(vec!["a".into(), "b".into()], 2);
        m.push_row(&[2.0, 2.0]).unwrap();
        m.push_row(&[50.0, 0.0]).unwrap();
        let p = model.predict(&m).unwrap();
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!(p[1] > 0.999);
    }

    #[test]
    fn test_logistic_width_mismatch() {
        let model = LogisticArtifactModel::new(vec![1.0], 0.0);
        let mut m = FeatureMatrix::new(vec!["a".into(), "b".into()], 2);
        m.push_row(&[1.0, 1.0]).unwrap();
        assert!(matches!(model.predict(&m), Err(Error::Inference(_))));
    }

    #[test]
    fn test_artifact_parsing() {
        let model = LogisticArtifactModel::from_json_str(r#"{"weights": [0.1, 0.2], "bias": -1}"#).unwrap();
        assert_eq!(model.n_features(), Some(2));
        assert!(LogisticArtifactModel::from_json_str(r#"{"weights": []}"#).is_err());
        assert!(LogisticArtifactModel::from_json_str("not json").is_err());
    }

    #[test]
    fn test_slot_unavailable_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let slot = ModelSlot::load_logistic(dir.path().join("missing.json"));
        assert!(!slot.is_loaded());
        assert!(matches!(slot.require(), Err(Error::ModelUnavailable(_))));
    }

    #[test]
    fn test_slot_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, r#"{"weights": [1.0], "bias": 0.5}"#).unwrap();
        let slot = ModelSlot::load_logistic(&path);
        assert!(slot.is_loaded());
        assert_eq!(slot.require().unwrap().n_features(), Some(1));
    }
}
