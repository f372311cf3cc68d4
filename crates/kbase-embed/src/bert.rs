//! BERT sentence encoder (e.g. `sentence-transformers/all-MiniLM-L6-v2`):
//! token embeddings from the final hidden layer, mean-pooled over the
//! attention mask, optionally L2-normalized, always f32.

use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokenizers::{Tokenizer, TruncationParams};

use kbase_core::config::EmbeddingSettings;
use kbase_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::pool_sentence;
use crate::tokenize::tokenize_on_device;

enum Weights {
    Safetensors(PathBuf),
    Pickle(PathBuf),
}

struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: Weights,
}

#[derive(Deserialize)]
struct HiddenSize {
    hidden_size: usize,
}

pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
    normalize: bool,
}

impl BertEmbedder {
    pub fn load(settings: &EmbeddingSettings) -> Result<Self> {
        let device = select_device(settings.device)?;
        let files = resolve_model_files(settings)?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", files.tokenizer.display(), e))?;
        tokenizer
            .with_truncation(Some(TruncationParams { max_length: settings.max_len, ..Default::default() }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
        tokenizer.with_padding(None);

        let config_text = std::fs::read_to_string(&files.config)
            .with_context(|| format!("Failed to read model config {}", files.config.display()))?;
        let config: BertConfig = serde_json::from_str(&config_text)
            .with_context(|| format!("Unexpected model config format in {}", files.config.display()))?;
        let dim = serde_json::from_str::<HiddenSize>(&config_text)?.hidden_size;

        let vb = match &files.weights {
            Weights::Safetensors(path) => {
                let data = std::fs::read(path).with_context(|| format!("Failed to read weights {}", path.display()))?;
                VarBuilder::from_buffered_safetensors(data, DType::F32, &device)?
            }
            Weights::Pickle(path) => {
                let weights = candle_core::pickle::read_all(path)?;
                let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
                VarBuilder::from_tensors(weights_map, DType::F32, &device)
            }
        };
        let model = BertModel::load(vb, &config).context("Failed to build BERT model from weights")?;
        tracing::info!(model = %settings.model, dim, "sentence encoder loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            model_id: settings.model.clone(),
            dim,
            max_len: settings.max_len,
            normalize: settings.normalize,
        })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask, token_type_ids) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let emb = pool_sentence(&hidden, &attention_mask, self.normalize)?;
        let out: Vec<f32> = emb.to_dtype(DType::F32)?.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        anyhow::ensure!(out.len() == self.dim, "expected embedding dimension {}, got {}", self.dim, out.len());
        if start.elapsed().as_millis() > 100 {
            tracing::debug!(elapsed = ?start.elapsed(), chars = text.len(), "slow embedding");
        }
        Ok(out)
    }
}

impl Embedder for BertEmbedder {
    fn model_id(&self) -> &str { &self.model_id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}

fn resolve_model_files(settings: &EmbeddingSettings) -> Result<ModelFiles> {
    if let Some(dir) = settings.resolved_model_dir() {
        tracing::info!(dir = %dir.display(), "using local model directory");
        return local_model_files(&dir);
    }
    tracing::info!(model = %settings.model, "fetching model from the Hugging Face hub cache");
    let api = Api::new().context("Failed to initialize Hugging Face hub client")?;
    let repo = api.repo(Repo::new(settings.model.clone(), RepoType::Model));
    let config = repo.get("config.json").with_context(|| format!("Failed to fetch config.json for {}", settings.model))?;
    let tokenizer = repo.get("tokenizer.json").with_context(|| format!("Failed to fetch tokenizer.json for {}", settings.model))?;
    let weights = match repo.get("model.safetensors") {
        Ok(p) => Weights::Safetensors(p),
        Err(_) => Weights::Pickle(
            repo.get("pytorch_model.bin").with_context(|| format!("Failed to fetch weights for {}", settings.model))?,
        ),
    };
    Ok(ModelFiles { config, tokenizer, weights })
}

fn local_model_files(dir: &Path) -> Result<ModelFiles> {
    let config = dir.join("config.json");
    let tokenizer = dir.join("tokenizer.json");
    for required in [&config, &tokenizer] {
        anyhow::ensure!(required.is_file(), "Missing model file {}", required.display());
    }
    let safetensors = dir.join("model.safetensors");
    let pickle = dir.join("pytorch_model.bin");
    let weights = if safetensors.is_file() {
        Weights::Safetensors(safetensors)
    } else if pickle.is_file() {
        Weights::Pickle(pickle)
    } else {
        return Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", dir.display()));
    };
    Ok(ModelFiles { config, tokenizer, weights })
}
