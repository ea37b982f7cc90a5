//! Per-request scoring pipeline
//!
//! ```text
//! model gate → load → filter → merge ─┬─> resolve columns ─┬─> matrix → score
//!                                     └─> embed text ──────┘
//! ```
//!
//! The scoring model and the token encoder are injected once at startup and
//! shared read-only by every request.

use crate::embedder::{TextEmbedder, TokenEncoder, DEFAULT_MAX_TOKENS};
use crate::features::build_feature_matrix;
use crate::model::ModelSlot;
use crate::scorer::{Scorer, DEFAULT_DETAIL_LIMIT};
use pymescore_core::{Result, SchemaMode, ScoreResult, SourceKind};
use pymescore_schema::{
    merge, DuplicatePolicy, EntityFilter, FeatureSchema, LoadOptions, SchemaResolver, TableLoader,
    DEFAULT_TEXT_COLUMN,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Tunables of the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Free-text column fed to the embedder
    pub text_column: String,
    /// Token limit passed to the encoder
    pub max_tokens: usize,
    /// Row-level outputs returned with the score
    pub detail_limit: usize,
    /// Handling of repeated auxiliary rows for one entity
    pub duplicate_policy: DuplicatePolicy,
    /// Embed rows on the rayon pool
    pub parallel_embedding: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            text_column: DEFAULT_TEXT_COLUMN.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            detail_limit: DEFAULT_DETAIL_LIMIT,
            duplicate_policy: DuplicatePolicy::default(),
            parallel_embedding: true,
        }
    }
}

/// One scoring request: the entity key and the three uploads
#[derive(Debug, Clone, Default)]
pub struct ScoreRequest {
    pub ruc: String,
    pub balances: Vec<u8>,
    pub references: Vec<u8>,
    pub digital_data: Vec<u8>,
}

pub struct ScoringPipeline {
    model: ModelSlot,
    embedder: TextEmbedder,
    schema: Option<FeatureSchema>,
    loader: TableLoader,
    config: PipelineConfig,
}

impl ScoringPipeline {
    pub fn new(
        model: ModelSlot,
        encoder: Arc<dyn TokenEncoder>,
        schema: Option<FeatureSchema>,
        config: PipelineConfig,
    ) -> Self {
        let embedder = TextEmbedder::new(encoder, config.max_tokens);
        let loader = TableLoader::new(LoadOptions {
            text_column: config.text_column.clone(),
        });
        let pipeline = Self {
            model,
            embedder,
            schema,
            loader,
            config,
        };
        pipeline.check_widths();
        pipeline
    }

    fn check_widths(&self) {
        let Ok(model) = self.model.require() else {
            return;
        };
        if let (Some(expected), Some(width)) = (model.n_features(), self.expected_width()) {
            if expected != width {
                warn!(
                    model_features = expected,
                    pipeline_features = width,
                    "feature schema and embedding width do not add up to the model's feature count"
                );
            }
        }
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.model.is_loaded()
    }

    /// The first gate of every request: fails while no model is loaded
    pub fn ensure_ready(&self) -> Result<()> {
        self.model.require().map(|_| ())
    }

    #[inline]
    pub fn schema_mode(&self) -> SchemaMode {
        SchemaResolver::new(self.schema.as_ref(), &self.config.text_column).mode()
    }

    /// Matrix width when the schema is authoritative
    pub fn expected_width(&self) -> Option<usize> {
        self.schema.as_ref().map(|s| s.len() + self.embedder.dim())
    }

    /// Score one entity. Fails before touching the uploads if no model is loaded.
    pub fn run(&self, request: &ScoreRequest) -> Result<ScoreResult> {
        let model = self.model.require()?;
        let started = Instant::now();
        let ruc = request.ruc.trim();
        info!(ruc, "scoring request");

        let balances = self.loader.load(&request.balances, SourceKind::Balances)?;
        let references = self.loader.load(&request.references, SourceKind::References)?;
        let digital = self.loader.load(&request.digital_data, SourceKind::DigitalData)?;

        let primary = EntityFilter::new(SourceKind::Balances, ruc)
            .apply(&balances)
            .require_rows()?;
        let policy = self.config.duplicate_policy;
        let references = policy.apply(EntityFilter::new(SourceKind::References, ruc).apply(&references))?;
        let digital = policy.apply(EntityFilter::new(SourceKind::DigitalData, ruc).apply(&digital))?;
        debug!(
            balances = primary.len(),
            references = references.len(),
            digital = digital.len(),
            "entity rows selected"
        );

        let mut reconciled = merge(primary, &[references, digital])?;
        reconciled.ensure_column(&self.config.text_column);

        let resolver = SchemaResolver::new(self.schema.as_ref(), &self.config.text_column);
        let texts = reconciled.text_values(&self.config.text_column);
        let (tabular, embeddings) = rayon::join(
            || resolver.resolve(&reconciled),
            || self.embedder.embed_all(&texts, self.config.parallel_embedding),
        );
        let embeddings = embeddings?;

        let matrix = build_feature_matrix(&tabular, &embeddings)?;
        debug!(
            rows = matrix.n_rows(),
            tabular = matrix.tabular_width(),
            embedding = matrix.embedding_width(),
            "feature matrix built"
        );

        let result = Scorer::new(Arc::clone(model), self.config.detail_limit).score(
            ruc,
            &matrix,
            tabular.mode,
        )?;
        info!(
            ruc,
            score = result.score,
            rows = result.n_registros,
            mode = result.schema_mode.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request scored"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::HashingTokenEncoder;
    use crate::scorer::ScoringModel;
    use pymescore_core::{Error, FeatureMatrix};

    /// Returns the first column of every row as the probability
    struct FirstColumnModel;

    impl ScoringModel for FirstColumnModel {
        fn name(&self) -> &'static str {
            "first-column"
        }

        fn n_features(&self) -> Option<usize> {
            None
        }

        fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
            Ok(matrix.rows().map(|r| r[0]).collect())
        }
    }

    fn pipeline(model: ModelSlot, schema: Option<FeatureSchema>) -> ScoringPipeline {
        ScoringPipeline::new(
            model,
            Arc::new(HashingTokenEncoder::new(8)),
            schema,
            PipelineConfig::default(),
        )
    }

    fn request(ruc: &str) -> ScoreRequest {
        ScoreRequest {
            ruc: ruc.to_string(),
            balances: b"ruc\tprob\ttexto_financiero\n0912345678\t0.2\tsube\n0912345678\t0.8\t\n0912345678\t0.5\tbaja\n1790000000\t0.9\tx\n".to_vec(),
            references: b"ruc,referencia\n1790000000,1\n".to_vec(),
            digital_data: b"ruc,seguidores\n".to_vec(),
        }
    }

    #[test]
    fn test_end_to_end_degraded() {
        let p = pipeline(ModelSlot::Loaded(Arc::new(FirstColumnModel)), None);
        let result = p.run(&request("0912345678")).unwrap();
        assert_eq!(result.ruc, "0912345678");
        assert_eq!(result.n_registros, 3);
        assert_eq!(result.probabilidades, vec![0.2, 0.8, 0.5]);
        assert_eq!(result.score, 50);
        assert_eq!(result.schema_mode, SchemaMode::Degraded);
    }

    #[test]
    fn test_end_to_end_authoritative() {
        let schema = FeatureSchema::new(vec!["prob".into(), "ausente".into()]).unwrap();
        let p = pipeline(ModelSlot::Loaded(Arc::new(FirstColumnModel)), Some(schema));
        assert_eq!(p.expected_width(), Some(2 + 8));
        let result = p.run(&request(" 0912345678 ")).unwrap();
        assert_eq!(result.score, 50);
        assert_eq!(result.schema_mode, SchemaMode::Authoritative);
    }

    #[test]
    fn test_model_gate_comes_first() {
        let p = pipeline(ModelSlot::Unavailable("no artifact".into()), None);
        assert!(!p.is_ready());
        assert!(matches!(p.ensure_ready(), Err(Error::ModelUnavailable(_))));
        let garbage = ScoreRequest {
            ruc: "0912345678".into(),
            balances: b"\xff\xff".to_vec(),
            ..Default::default()
        };
        assert!(matches!(p.run(&garbage), Err(Error::ModelUnavailable(_))));
    }

    #[test]
    fn test_unknown_entity_is_client_error() {
        let p = pipeline(ModelSlot::Loaded(Arc::new(FirstColumnModel)), None);
        let err = p.run(&request("0000000000")).unwrap_err();
        assert!(matches!(err, Error::NoDataForEntity { .. }));
    }

    #[test]
    fn test_malformed_auxiliary_names_source() {
        let p = pipeline(ModelSlot::Loaded(Arc::new(FirstColumnModel)), None);
        let mut req = request("0912345678");
        req.digital_data = b"empresa,seguidores\n".to_vec();
        match p.run(&req).unwrap_err() {
            Error::MalformedInput { source_name, .. } => assert_eq!(source_name, "datos_digitales"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_reference_rows() {
        let mut req = request("0912345678");
        req.references = b"ruc,referencia\n0912345678,1\n0912345678,2\n".to_vec();

        let keep = pipeline(ModelSlot::Loaded(Arc::new(FirstColumnModel)), None);
        assert_eq!(keep.run(&req).unwrap().n_registros, 3);

        let reject = ScoringPipeline::new(
            ModelSlot::Loaded(Arc::new(FirstColumnModel)),
            Arc::new(HashingTokenEncoder::new(8)),
            None,
            PipelineConfig {
                duplicate_policy: DuplicatePolicy::Reject,
                ..PipelineConfig::default()
            },
        );
        assert!(matches!(reject.run(&req), Err(Error::DuplicateEntityRows { .. })));
    }
}
