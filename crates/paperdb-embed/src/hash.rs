//! Deterministic hashing embedder.
//!
//! Projects each whitespace token into one of `dim` buckets via xxHash
//! and L2-normalizes the result. Useless for semantics, but deterministic,
//! instant, and shaped exactly like real model output, which is what the
//! test suite and model-less deployments need.

use paperdb_core::traits::Embedder;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (position, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let bucket = (h as usize) % self.dim;
            let weight = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[bucket] += weight + (position as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, texts: &[String], _batch_size: usize) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
