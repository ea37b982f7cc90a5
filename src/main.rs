use anyhow::Context;
use clap::Parser;
use pymescore_api::{RestApi, UploadLimit, DEFAULT_MAX_UPLOAD_BYTES};
use pymescore_engine::{
    BertTokenEncoder, ModelSlot, PipelineConfig, ScoringPipeline, TokenEncoder,
    DEFAULT_BERT_MODEL, DEFAULT_DETAIL_LIMIT, DEFAULT_MAX_TOKENS,
};
use pymescore_schema::{DuplicatePolicy, FeatureSchema, DEFAULT_TEXT_COLUMN};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Credit scoring service for small businesses
#[derive(Parser, Debug)]
#[command(name = "pymescore")]
#[command(about = "Scores a company from its balances, references and digital footprint", long_about = None)]
struct Args {
    /// Scoring model artifact (JSON)
    #[arg(long, env = "PYMESCORE_MODEL_PATH", default_value = "modelo_lgb_finanzas.json")]
    model_path: PathBuf,

    /// Ordered tabular feature columns the model was trained on (JSON array)
    #[arg(long, env = "PYMESCORE_FEATURES_PATH", default_value = "feature_columns.json")]
    features_path: PathBuf,

    /// Text encoder: HuggingFace model id or local directory with
    /// config.json, tokenizer.json and the model weights
    #[arg(long, env = "PYMESCORE_ENCODER", default_value = DEFAULT_BERT_MODEL)]
    encoder: String,

    /// Free-text column fed to the embedder
    #[arg(long, default_value = DEFAULT_TEXT_COLUMN)]
    text_column: String,

    /// Token limit per text
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: usize,

    /// Row-level probabilities returned per response
    #[arg(long, default_value_t = DEFAULT_DETAIL_LIMIT)]
    detail_limit: usize,

    /// Repeated auxiliary rows for one RUC: keep-first or reject
    #[arg(long, default_value = "keep-first")]
    duplicate_policy: DuplicatePolicy,

    /// Embed rows in parallel
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    parallel_embedding: bool,

    /// Largest accepted upload per file, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,

    /// HTTP API port
    #[arg(long, default_value_t = 8000)]
    http_port: u16,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting pymescore v{}", env!("CARGO_PKG_VERSION"));

    let schema = FeatureSchema::load_optional(&args.features_path)
        .with_context(|| format!("invalid feature schema {}", args.features_path.display()))?;
    match &schema {
        Some(schema) => info!("Feature schema: {} columns from {:?}", schema.len(), args.features_path),
        None => warn!("Feature schema {:?} not found, running in degraded mode", args.features_path),
    }

    let encoder = BertTokenEncoder::from_pretrained(&args.encoder)
        .with_context(|| format!("cannot load text encoder {}", args.encoder))?;
    info!("Text encoder: {} ({} dimensions)", encoder.model_id(), encoder.hidden_size());
    let encoder: Arc<dyn TokenEncoder> = Arc::new(encoder);

    let model = ModelSlot::load_logistic(&args.model_path);

    let config = PipelineConfig {
        text_column: args.text_column,
        max_tokens: args.max_tokens,
        detail_limit: args.detail_limit,
        duplicate_policy: args.duplicate_policy,
        parallel_embedding: args.parallel_embedding,
    };
    debug!("Pipeline config: {}", serde_json::to_string(&config)?);

    let pipeline = Arc::new(ScoringPipeline::new(model, encoder, schema, config));
    if !pipeline.is_ready() {
        warn!("No scoring model loaded; /predict will answer 503");
    }

    let http_port = args.http_port;
    let limit = UploadLimit(args.max_upload_bytes);
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(pipeline, http_port, limit).await {
                eprintln!("HTTP server error: {}", e);
            }
        })
    });

    info!("pymescore started successfully");
    info!("HTTP API: http://localhost:{}/", http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}
