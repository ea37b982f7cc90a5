//! Hashing token encoder
//!
//! A deterministic stand-in for a pretrained encoder: no weights, no
//! vocabulary download. Each token is hashed into a fixed-width unit vector.
//! Used by tests and benchmarks, where the scoring model does not depend on
//! the embedding block. Production embedding uses
//! [`BertTokenEncoder`](crate::bert::BertTokenEncoder).
//!
//! Input is framed BERT-style as `[CLS] tokens… [SEP]` and truncated to the
//! requested maximum length, framing included.

use crate::embedder::TokenEncoder;
use ahash::RandomState;
use pymescore_core::Result;

pub const CLS_TOKEN: &str = "[CLS]";
pub const SEP_TOKEN: &str = "[SEP]";

/// Hidden size of BERT-base encoders
pub const DEFAULT_HIDDEN_SIZE: usize = 768;

const BUCKET_SEEDS: (u64, u64, u64, u64) = (
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
);

/// Lowercase, split on whitespace, and emit punctuation as separate tokens.
/// The result is framed with `[CLS]`/`[SEP]` and holds at most `max_tokens` items.
pub fn tokenize(text: &str, max_tokens: usize) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            current.push(ch);
            continue;
        }
        if !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        if !ch.is_whitespace() && !ch.is_control() {
            words.push(ch.to_string());
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    words.truncate(max_tokens.saturating_sub(2));
    let mut tokens = Vec::with_capacity(words.len() + 2);
    tokens.push(CLS_TOKEN.to_string());
    tokens.extend(words);
    tokens.push(SEP_TOKEN.to_string());
    tokens.truncate(max_tokens);
    tokens
}

/// Deterministic token encoder based on feature hashing
#[derive(Debug, Clone)]
pub struct HashingTokenEncoder {
    hidden_size: usize,
    hasher: RandomState,
}

impl HashingTokenEncoder {
    pub fn new(hidden_size: usize) -> Self {
        let (a, b, c, d) = BUCKET_SEEDS;
        Self {
            hidden_size: hidden_size.max(1),
            hasher: RandomState::with_seeds(a, b, c, d),
        }
    }

    /// Hash a token to a unit vector: character trigrams of `#token#` add 1.0,
    /// the whole token adds 2.0.
    pub fn hash_token(&self, token: &str) -> Vec<f32> {
        let dim = self.hidden_size;
        let mut vector = vec![0.0f32; dim];

        let padded: Vec<char> = format!("#{}#", token).chars().collect();
        for window in padded.windows(3) {
            let trigram: String = window.iter().collect();
            vector[self.bucket(&trigram)] += 1.0;
        }
        vector[self.bucket(token)] += 2.0;

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for v in &mut vector {
                *v /= magnitude;
            }
        }
        vector
    }

    fn bucket(&self, value: &str) -> usize {
        (self.hasher.hash_one(value) % self.hidden_size as u64) as usize
    }
}

impl Default for HashingTokenEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_HIDDEN_SIZE)
    }
}

impl TokenEncoder for HashingTokenEncoder {
    fn name(&self) -> &'static str {
        "hashing"
    }

    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn encode(&self, text: &str, max_tokens: usize) -> Result<Vec<Vec<f32>>> {
        Ok(tokenize(text, max_tokens)
            .iter()
            .map(|t| self.hash_token(t))
            .collect())
    }
}
