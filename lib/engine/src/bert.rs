//! Pretrained BERT token encoder
//!
//! Runs a BERT-class model (FinBERT by default) with candle and returns the
//! last hidden state of every token the attention mask keeps. Model files are
//! read from a local directory or fetched from the HuggingFace Hub cache.
//!
//! Truncation follows the `transformers` tokenizer: the word pieces are cut
//! so that `[CLS] pieces… [SEP]` fits in `max_tokens`.

use crate::embedder::TokenEncoder;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use pymescore_core::{Error, Result};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;
use tracing::{debug, info};

/// Financial-tone BERT the scoring model was trained against
pub const DEFAULT_BERT_MODEL: &str = "yiyanghkust/finbert-tone";

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const SAFETENSORS_FILE: &str = "model.safetensors";
const PYTORCH_FILE: &str = "pytorch_model.bin";

fn embedding_error(context: &str, err: impl std::fmt::Display) -> Error {
    Error::Embedding(format!("{}: {}", context, err))
}

/// Paths of the three artifacts a BERT encoder needs
#[derive(Debug, Clone)]
pub struct BertFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    /// `model.safetensors`, or `pytorch_model.bin` when no safetensors export exists
    pub weights: PathBuf,
}

impl BertFiles {
    /// Resolve files from a local directory
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let weights = [SAFETENSORS_FILE, PYTORCH_FILE]
            .iter()
            .map(|f| dir.join(f))
            .find(|p| p.is_file())
            .ok_or_else(|| {
                Error::Embedding(format!("no model weights in {}", dir.display()))
            })?;
        Ok(Self {
            config: dir.join(CONFIG_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
            weights,
        })
    }

    /// Download (or reuse from cache) the files of a Hub model
    pub fn from_hub(model_id: &str) -> Result<Self> {
        let api = Api::new().map_err(|e| embedding_error("HuggingFace API client", e))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config = repo
            .get(CONFIG_FILE)
            .map_err(|e| embedding_error("download config.json", e))?;
        let tokenizer = repo
            .get(TOKENIZER_FILE)
            .map_err(|e| embedding_error("download tokenizer.json", e))?;
        let weights = match repo.get(SAFETENSORS_FILE) {
            Ok(path) => path,
            Err(e) => {
                debug!(model_id, error = %e, "no safetensors export, trying pytorch weights");
                repo.get(PYTORCH_FILE)
                    .map_err(|e| embedding_error("download model weights", e))?
            }
        };
        Ok(Self {
            config,
            tokenizer,
            weights,
        })
    }
}

/// Contextual token encoder backed by a pretrained BERT model
pub struct BertTokenEncoder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    hidden_size: usize,
    cls_id: u32,
    sep_id: u32,
    model_id: String,
}

impl std::fmt::Debug for BertTokenEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BertTokenEncoder")
            .field("model_id", &self.model_id)
            .field("hidden_size", &self.hidden_size)
            .finish()
    }
}

impl BertTokenEncoder {
    /// Load from a local directory if `model` is one, otherwise from the Hub
    pub fn from_pretrained(model: &str) -> Result<Self> {
        let dir = Path::new(model);
        let files = if dir.is_dir() {
            BertFiles::from_dir(dir)?
        } else {
            BertFiles::from_hub(model)?
        };
        Self::load(model, &files)
    }

    pub fn load(model_id: &str, files: &BertFiles) -> Result<Self> {
        info!("Loading text encoder: {}", model_id);
        let device = Device::Cpu;

        let config: Config = serde_json::from_str(&std::fs::read_to_string(&files.config)?)?;
        debug!("Encoder config: hidden_size={}", config.hidden_size);

        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| embedding_error("load tokenizer", e))?;
        let token_id = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| Error::Embedding(format!("tokenizer has no {} token", token)))
        };
        let cls_id = token_id("[CLS]")?;
        let sep_id = token_id("[SEP]")?;

        let is_pytorch = files
            .weights
            .extension()
            .is_some_and(|ext| ext == "bin");
        let vb = if is_pytorch {
            VarBuilder::from_pth(&files.weights, DTYPE, &device)
                .map_err(|e| embedding_error("load pytorch weights", e))?
        } else {
            // SAFETY: the weights file is not modified while mapped
            unsafe {
                VarBuilder::from_mmaped_safetensors(&[&files.weights], DTYPE, &device)
                    .map_err(|e| embedding_error("load safetensors weights", e))?
            }
        };
        let model = BertModel::load(vb, &config).map_err(|e| embedding_error("build BERT model", e))?;

        info!("Text encoder loaded ({} dimensions)", config.hidden_size);
        Ok(Self {
            model,
            tokenizer,
            device,
            hidden_size: config.hidden_size,
            cls_id,
            sep_id,
            model_id: model_id.to_string(),
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    fn forward(&self, ids: &[u32]) -> candle_core::Result<Vec<Vec<f32>>> {
        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let attention_mask = input_ids.ones_like()?;

        // (1, seq_len, hidden_size)
        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        output.squeeze(0)?.to_dtype(DType::F32)?.to_vec2::<f32>()
    }
}

/// Frame word-piece ids as `[CLS] ids… [SEP]`, cutting the pieces so the
/// sequence holds at most `max_tokens` ids.
pub fn frame_ids(cls_id: u32, sep_id: u32, pieces: &[u32], max_tokens: usize) -> Vec<u32> {
    let keep = pieces.len().min(max_tokens.saturating_sub(2));
    let mut ids = Vec::with_capacity(keep + 2);
    ids.push(cls_id);
    ids.extend_from_slice(&pieces[..keep]);
    ids.push(sep_id);
    ids.truncate(max_tokens);
    ids
}

impl TokenEncoder for BertTokenEncoder {
    fn name(&self) -> &'static str {
        "bert"
    }

    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// One sequence without padding, so every position is kept by the mask
    fn encode(&self, text: &str, max_tokens: usize) -> Result<Vec<Vec<f32>>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| embedding_error("tokenize", e))?;
        let ids = frame_ids(self.cls_id, self.sep_id, encoding.get_ids(), max_tokens);
        self.forward(&ids)
            .map_err(|e| embedding_error("BERT forward pass", e))
    }
}
