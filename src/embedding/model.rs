use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};
use tracing::info;

use super::fetch::ModelFiles;
use super::Embedder;
use crate::error::{BotError, Result};

/// BERT sentence encoder producing mean-pooled embeddings, the way
/// sentence-transformers models are meant to be used.
pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
    normalize: bool,
}

impl SentenceEmbedder {
    /// Loads the model from local files. Never touches the network.
    ///
    /// # Arguments
    ///
    /// * `files` - Paths of the cached config, tokenizer and weights
    /// * `max_seq_len` - Inputs are truncated to this many tokens
    /// * `normalize` - Whether to L2-normalise the output vectors
    pub fn load(files: &ModelFiles, max_seq_len: usize, normalize: bool) -> Result<Self> {
        let device = Device::Cpu;

        let raw_config = std::fs::read_to_string(&files.config)?;
        let config: Config = serde_json::from_str(&raw_config)?;
        let dimension = serde_json::from_str::<serde_json::Value>(&raw_config)?
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| BotError::Embedding("config.json has no hidden_size".to_string()))?
            as usize;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| BotError::Embedding(format!("failed to load tokenizer: {}", e)))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_seq_len,
                ..Default::default()
            }))
            .map_err(|e| BotError::Embedding(format!("invalid truncation settings: {}", e)))?;
        tokenizer.with_padding(Some(PaddingParams::default()));

        // SAFETY: the weights file lives in the model cache and is not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[&files.weights], DTYPE, &device)? };
        let model = BertModel::load(vb, &config)?;

        info!(
            "Loaded embedding model from {} (dimension {})",
            files.weights.display(),
            dimension
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension,
            normalize,
        })
    }

    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| BotError::Embedding(format!("tokenization failed: {}", e)))?;

        let mut ids = Vec::with_capacity(encodings.len());
        let mut type_ids = Vec::with_capacity(encodings.len());
        let mut masks = Vec::with_capacity(encodings.len());
        for encoding in &encodings {
            ids.push(Tensor::new(encoding.get_ids(), &self.device)?);
            type_ids.push(Tensor::new(encoding.get_type_ids(), &self.device)?);
            masks.push(Tensor::new(encoding.get_attention_mask(), &self.device)?);
        }

        let input_ids = Tensor::stack(&ids, 0)?;
        let token_type_ids = Tensor::stack(&type_ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = mean_pool(&hidden, &attention_mask)?;
        let pooled = if self.normalize { l2_normalize(&pooled)? } else { pooled };

        Ok(pooled.to_vec2::<f32>()?)
    }
}

/// Averages token vectors, ignoring padding positions.
pub(crate) fn mean_pool(hidden: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let counts = mask.sum(1)?.clamp(1e-9f32, f32::MAX)?;
    summed.broadcast_div(&counts)
}

pub(crate) fn l2_normalize(v: &Tensor) -> candle_core::Result<Tensor> {
    let norm = v.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12f32, f32::MAX)?;
    v.broadcast_div(&norm)
}

impl Embedder for SentenceEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.encode(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| BotError::Embedding("model returned no embedding".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.encode(texts)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
