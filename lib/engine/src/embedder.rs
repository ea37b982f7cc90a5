//! Text Embedder Adapter
//!
//! Wraps a pretrained token encoder and mean-pools its per-token hidden
//! states into one [`EmbeddingVector`] per row. Rows are independent, so
//! they may be embedded in parallel; results keep input order.

use pymescore_core::{EmbeddingVector, Error, Result};
use rayon::prelude::*;
use std::sync::Arc;

/// BERT-class maximum sequence length
pub const DEFAULT_MAX_TOKENS: usize = 512;

/// A pretrained encoder producing one hidden state per token.
///
/// Implementations must be deterministic for identical input and must not
/// return more than `max_tokens` token states.
pub trait TokenEncoder: Send + Sync {
    fn name(&self) -> &'static str;

    /// Width of every token hidden state
    fn hidden_size(&self) -> usize;

    /// Hidden states `[tokens x hidden_size]` for `text`, truncated to `max_tokens`
    fn encode(&self, text: &str, max_tokens: usize) -> Result<Vec<Vec<f32>>>;
}

/// Turns free text into fixed-length vectors via a shared encoder
#[derive(Clone)]
pub struct TextEmbedder {
    encoder: Arc<dyn TokenEncoder>,
    max_tokens: usize,
}

impl std::fmt::Debug for TextEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextEmbedder")
            .field("encoder", &self.encoder.name())
            .field("dim", &self.dim())
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl TextEmbedder {
    pub fn new(encoder: Arc<dyn TokenEncoder>, max_tokens: usize) -> Self {
        Self {
            encoder,
            max_tokens: max_tokens.max(1),
        }
    }

    /// Length of every vector this embedder produces
    #[inline]
    pub fn dim(&self) -> usize {
        self.encoder.hidden_size()
    }

    #[inline]
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Embed one row's text. Empty text still yields a `dim()`-long vector.
    pub fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let states = self.encoder.encode(text, self.max_tokens)?;
        if states.len() > self.max_tokens {
            return Err(Error::Embedding(format!(
                "{} returned {} token states, limit is {}",
                self.encoder.name(),
                states.len(),
                self.max_tokens
            )));
        }
        EmbeddingVector::mean_pool(&states, self.dim()).ok_or_else(|| {
            Error::Embedding(format!(
                "{} returned token states that are not {} wide",
                self.encoder.name(),
                self.dim()
            ))
        })
    }

    /// Embed every row, in order
    pub fn embed_all(&self, texts: &[String], parallel: bool) -> Result<Vec<EmbeddingVector>> {
        if parallel {
            texts.par_iter().map(|t| self.embed(t)).collect()
        } else {
            texts.iter().map(|t| self.embed(t)).collect()
        }
    }
}
