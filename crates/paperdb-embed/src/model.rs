//! Candle-backed XLM-RoBERTa (BGE-M3) embedding model.
//!
//! Loads tokenizer, config and pickled weights from a local model
//! directory and produces mean-pooled, L2-normalized sentence vectors.
//! Loading is slow and memory-heavy; construct once at composition time
//! and share the instance.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use crate::pooling::masked_mean_l2;
use paperdb_core::traits::Embedder;

const MAX_SEQUENCE_LEN: usize = 256;

pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
}

impl EmbeddingModel {
    /// Load the model from `model_dir`, falling back to the
    /// `PAPERDB_MODEL_DIR` env var and then `./models/bge-m3`.
    pub fn load(model_dir: Option<&str>, dim: usize) -> Result<Self> {
        let device = pick_device()?;
        let model_dir = resolve_model_dir(model_dir)?;
        tracing::info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", tokenizer_path.display()))?;

        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig =
            serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, Tensor> =
            weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;

        tracing::info!(dim, "embedding model ready");
        Ok(Self { model, tokenizer, device, dim })
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let started = Instant::now();

        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("tokenization failed: {e}"))?;
        let mut ids = encoding.get_ids().to_vec();
        let mut mask = encoding.get_attention_mask().to_vec();
        if ids.len() > MAX_SEQUENCE_LEN {
            ids.truncate(MAX_SEQUENCE_LEN);
            mask.truncate(MAX_SEQUENCE_LEN);
        }
        if ids.len() < MAX_SEQUENCE_LEN {
            let pad = MAX_SEQUENCE_LEN - ids.len();
            ids.extend(std::iter::repeat(1).take(pad));
            mask.extend(std::iter::repeat(0).take(pad));
        }

        let input_ids = Tensor::from_iter(ids, &self.device)?.reshape((1, MAX_SEQUENCE_LEN))?;
        let attention_mask =
            Tensor::from_iter(mask, &self.device)?.reshape((1, MAX_SEQUENCE_LEN))?;
        let token_type_ids = Tensor::zeros((1, MAX_SEQUENCE_LEN), DType::I64, &self.device)?;

        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;

        let vector: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        anyhow::ensure!(
            vector.len() == self.dim,
            "model produced dimension {} but {} is configured",
            vector.len(),
            self.dim
        );

        let elapsed = started.elapsed();
        if elapsed.as_millis() > 100 {
            tracing::warn!(ms = elapsed.as_millis() as u64, "slow embedding call");
        }
        Ok(vector)
    }
}

impl Embedder for EmbeddingModel {
    fn dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, texts: &[String], batch_size: usize) -> anyhow::Result<Vec<Vec<f32>>> {
        let batch_size = batch_size.max(1);
        let mut vectors = Vec::with_capacity(texts.len());
        for window in texts.chunks(batch_size) {
            tracing::debug!(batch = window.len(), "encoding batch");
            for text in window {
                // Any failure aborts the whole call: no partial lists.
                vectors.push(self.embed_text(text)?);
            }
        }
        Ok(vectors)
    }
}

fn pick_device() -> Result<Device> {
    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            tracing::info!("device: Metal");
            return Ok(device);
        }
    }
    tracing::info!("device: CPU");
    Ok(Device::Cpu)
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = PathBuf::from(dir);
        if p.exists() {
            return Ok(p);
        }
        return Err(anyhow!("configured model_dir does not exist: {dir}"));
    }
    if let Ok(dir) = std::env::var("PAPERDB_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            return Ok(p);
        }
    }
    let fallback = Path::new("models/bge-m3");
    if fallback.exists() {
        return Ok(fallback.to_path_buf());
    }
    Err(anyhow!(
        "could not locate an embedding model directory; set embedding.model_dir or PAPERDB_MODEL_DIR"
    ))
}
