//! Transformer embedding backend.
//!
//! Runs a sentence-embedding model locally with Candle. Model artifacts
//! (tokenizer, config, safetensors weights) are resolved through the
//! Hugging Face hub cache; a missing or unfetchable model surfaces as an
//! [`EmbeddingError`] the caller can recover from by falling back to the
//! hash backend.

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::api::sync::Api;
use tokenizers::Tokenizer;

use super::vector::l2_normalize;
use super::{EmbeddingBackend, EmbeddingError};

/// Maximum sequence length for tokenization. Longer inputs are truncated.
const MAX_SEQ_LENGTH: usize = 256;

/// Sentence embeddings from a BERT-family model.
///
/// Token states are mean-pooled and L2-normalized, so cosine similarity
/// between outputs is directly meaningful.
pub struct TransformerBackend {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
    identifier: String,
}

impl TransformerBackend {
    /// Loads a model by hub repo id, e.g.
    /// `sentence-transformers/all-MiniLM-L6-v2`.
    pub fn load(model_id: &str) -> Result<Self, EmbeddingError> {
        let api = Api::new().map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?;
        let repo = api.model(model_id.to_string());

        let config_path = repo
            .get("config.json")
            .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?;
        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?;

        let config_text = std::fs::read_to_string(&config_path)
            .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?;
        let config: Config = serde_json::from_str(&config_text)
            .map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let device = Device::Cpu;
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)?
        };
        let dimension = config.hidden_size;
        let model = BertModel::load(vb, &config)?;

        tracing::info!(model = %model_id, dimension, "loaded embedding model");

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension,
            identifier: model_id.to_string(),
        })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let mut ids: Vec<u32> = encoding.get_ids().to_vec();
        ids.truncate(MAX_SEQ_LENGTH);

        let token_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = token_ids.zeros_like()?;
        let hidden = self.model.forward(&token_ids, &token_type_ids, None)?;

        // Mean pooling over the token axis.
        let (_batch, n_tokens, _hidden) = hidden.dims3()?;
        let pooled = (hidden.sum(1)? / (n_tokens as f64))?;
        let mut vector = pooled.squeeze(0)?.to_vec1::<f32>()?;
        l2_normalize(&mut vector);
        Ok(vector)
    }
}

impl EmbeddingBackend for TransformerBackend {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|text| self.embed_one(text)).collect()
    }
}
