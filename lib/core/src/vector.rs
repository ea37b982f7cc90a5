use serde::{Deserialize, Serialize};

/// A fixed-length text embedding for one row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingVector {
    data: Vec<f32>,
}

impl EmbeddingVector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self {
            data: vec![0.0; dim],
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    /// Mean over the token axis of a `[tokens x dim]` hidden-state block.
    ///
    /// Returns `None` if any token row has a width other than `dim`.
    /// Zero tokens pool to the zero vector.
    pub fn mean_pool(tokens: &[Vec<f32>], dim: usize) -> Option<Self> {
        let mut sum = vec![0.0f32; dim];
        for token in tokens {
            if token.len() != dim {
                return None;
            }
            for (acc, x) in sum.iter_mut().zip(token) {
                *acc += x;
            }
        }
        if !tokens.is_empty() {
            let inv = 1.0 / tokens.len() as f32;
            for x in &mut sum {
                *x *= inv;
            }
        }
        Some(Self::new(sum))
    }
}
