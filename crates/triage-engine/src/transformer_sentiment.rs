//! Transformer sentiment provider (DistilBERT fine-tuned on SST-2).
//!
//! The model is downloaded from HuggingFace Hub and loaded on the first
//! call, not at construction, so startup never blocks on the network. When
//! loading fails the provider logs a warning once and serves every later
//! call from a [`LexiconSentimentProvider`].
//!
//! Inference runs on the blocking pool. Input is truncated to the model's
//! 512-token window.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use tokenizers::Tokenizer;
use tokio::sync::OnceCell;
use triage_core::{Result, SentimentConfig, SentimentProvider, SentimentVerdict, TriageError};

use crate::sentiment::LexiconSentimentProvider;

/// Longest token sequence the model accepts.
const MAX_SEQUENCE_LEN: usize = 512;

/// Loaded tokenizer, encoder and classification head.
struct LoadedModel {
    tokenizer: Tokenizer,
    encoder: DistilBertModel,
    pre_classifier: Linear,
    classifier: Linear,
    positive_index: usize,
    negative_index: usize,
    device: Device,
}

impl LoadedModel {
    /// Returns `(positive, negative)` probabilities for one text.
    fn score(&self, text: &str) -> Result<(f64, f64)> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| TriageError::Model(format!("Tokenization failed: {e}")))?;
        let mut ids = encoding.get_ids().to_vec();
        ids.truncate(MAX_SEQUENCE_LEN);

        let probs = self
            .forward(&ids)
            .map_err(|e| TriageError::Model(format!("Model inference failed: {e}")))?;

        let prob = |i: usize| f64::from(probs.get(i).copied().unwrap_or(0.0));
        Ok((prob(self.positive_index), prob(self.negative_index)))
    }

    fn forward(&self, ids: &[u32]) -> candle_core::Result<Vec<f32>> {
        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        // Single unpadded sequence: nothing is masked.
        let mask = Tensor::zeros((ids.len(), ids.len()), DType::U8, &self.device)?;

        let hidden = self.encoder.forward(&input_ids, &mask)?;
        let pooled = hidden.i((.., 0))?;
        let pooled = self.pre_classifier.forward(&pooled)?.relu()?;
        let logits = self.classifier.forward(&pooled)?;

        candle_nn::ops::softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_vec1::<f32>()
    }
}

/// DistilBERT SST-2 sentiment provider with lexicon fallback.
///
/// # Example
///
/// ```no_run
/// use triage_core::{SentimentConfig, SentimentProvider};
/// use triage_engine::TransformerSentimentProvider;
///
/// # async fn example() {
/// let provider = TransformerSentimentProvider::new(&SentimentConfig::default());
/// let verdict = provider.analyze("Thanks, that fixed it!").await.unwrap();
/// assert!(verdict.is_positive());
/// # }
/// ```
pub struct TransformerSentimentProvider {
    model_id: String,
    cache_dir: Option<String>,
    model: OnceCell<Option<Arc<LoadedModel>>>,
    fallback: LexiconSentimentProvider,
}

impl TransformerSentimentProvider {
    /// Create a provider for `config.model_id`. Nothing is downloaded yet.
    #[must_use]
    pub fn new(config: &SentimentConfig) -> Self {
        Self {
            model_id: config.model_id.clone(),
            cache_dir: config.cache_dir.clone(),
            model: OnceCell::new(),
            fallback: LexiconSentimentProvider::new(),
        }
    }

    /// Create a provider that never loads a model and always serves from
    /// the lexicon fallback.
    #[must_use]
    pub fn new_fallback_only() -> Self {
        Self {
            model_id: String::new(),
            cache_dir: None,
            model: OnceCell::new_with(Some(None)),
            fallback: LexiconSentimentProvider::new(),
        }
    }

    /// Returns `true` once the model has been loaded successfully.
    #[must_use]
    pub fn is_model_loaded(&self) -> bool {
        matches!(self.model.get(), Some(Some(_)))
    }

    async fn loaded(&self) -> Option<Arc<LoadedModel>> {
        self.model
            .get_or_init(|| async {
                match load_model(&self.model_id, self.cache_dir.as_deref()).await {
                    Ok(model) => {
                        tracing::info!(model_id = %self.model_id, "Sentiment model loaded");
                        Some(Arc::new(model))
                    }
                    Err(e) => {
                        tracing::warn!(
                            model_id = %self.model_id,
                            error = %e,
                            "Failed to load sentiment model, falling back to lexicon"
                        );
                        None
                    }
                }
            })
            .await
            .clone()
    }
}

#[async_trait]
impl SentimentProvider for TransformerSentimentProvider {
    async fn analyze(&self, text: &str) -> Result<SentimentVerdict> {
        if text.trim().is_empty() {
            return Err(TriageError::InvalidInput(
                "Input text cannot be empty".to_string(),
            ));
        }
        let Some(model) = self.loaded().await else {
            return self.fallback.score(text);
        };

        let text = text.to_string();
        let (positive, negative) = tokio::task::spawn_blocking(move || model.score(&text))
            .await
            .map_err(|e| TriageError::ProviderFailure(format!("Inference task failed: {e}")))??;

        let verdict = SentimentVerdict::from_scores(positive, negative);
        tracing::debug!(
            sentiment = %verdict.sentiment,
            confidence = verdict.confidence,
            "Transformer sentiment scored"
        );
        Ok(verdict)
    }

    fn name(&self) -> &'static str {
        "TransformerSentimentProvider"
    }

    async fn health_check(&self) -> Result<()> {
        // Degraded to lexicon still answers every call.
        Ok(())
    }
}

/// Download and load the model, tokenizer and head from HuggingFace Hub.
async fn load_model(model_id: &str, cache_dir: Option<&str>) -> Result<LoadedModel> {
    use hf_hub::api::tokio::{Api, ApiBuilder};

    let api = match cache_dir {
        Some(dir) => ApiBuilder::new().with_cache_dir(PathBuf::from(dir)).build(),
        None => Api::new(),
    }
    .map_err(|e| TriageError::Model(format!("Failed to create HF API client: {e}")))?;

    let repo = api.model(model_id.to_string());
    let config_path = repo
        .get("config.json")
        .await
        .map_err(|e| TriageError::Model(format!("Failed to download config.json: {e}")))?;
    let tokenizer_path = repo
        .get("tokenizer.json")
        .await
        .map_err(|e| TriageError::Model(format!("Failed to download tokenizer.json: {e}")))?;
    let weights_path = repo
        .get("model.safetensors")
        .await
        .map_err(|e| TriageError::Model(format!("Failed to download model.safetensors: {e}")))?;

    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| TriageError::Model(format!("Failed to read config.json: {e}")))?;
    let config_json: serde_json::Value = serde_json::from_str(&config_str)
        .map_err(|e| TriageError::Model(format!("Failed to parse config.json: {e}")))?;
    let config: DistilBertConfig = serde_json::from_value(config_json.clone())
        .map_err(|e| TriageError::Model(format!("Unsupported model config: {e}")))?;
    let dim = config_json
        .get("dim")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| TriageError::Model("config.json has no `dim`".to_string()))?
        as usize;

    let id2label = extract_id2label(&config_json);
    let positive_index = label_index(&id2label, "positive").unwrap_or(1);
    let negative_index = label_index(&id2label, "negative").unwrap_or(0);

    let tokenizer = Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| TriageError::Model(format!("Failed to load tokenizer: {e}")))?;

    let device = Device::Cpu;
    // SAFETY: memory-mapping safetensors is the standard candle pattern.
    // The file is read-only and remains valid for the lifetime of VarBuilder.
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
            .map_err(|e| TriageError::Model(format!("Failed to load weights: {e}")))?
    };

    let encoder = DistilBertModel::load(vb.pp("distilbert"), &config)
        .map_err(|e| TriageError::Model(format!("Failed to build encoder: {e}")))?;
    let pre_classifier = candle_nn::linear(dim, dim, vb.pp("pre_classifier"))
        .map_err(|e| TriageError::Model(format!("Failed to load pre_classifier: {e}")))?;
    let classifier = candle_nn::linear(dim, id2label.len().max(2), vb.pp("classifier"))
        .map_err(|e| TriageError::Model(format!("Failed to load classifier: {e}")))?;

    Ok(LoadedModel {
        tokenizer,
        encoder,
        pre_classifier,
        classifier,
        positive_index,
        negative_index,
        device,
    })
}

/// Extract the `id2label` mapping from a raw JSON config.
fn extract_id2label(config_json: &serde_json::Value) -> HashMap<usize, String> {
    config_json
        .get("id2label")
        .and_then(|v| v.as_object())
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| Some((k.parse::<usize>().ok()?, v.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_else(|| {
            HashMap::from([(0, "NEGATIVE".to_string()), (1, "POSITIVE".to_string())])
        })
}

fn label_index(id2label: &HashMap<usize, String>, wanted: &str) -> Option<usize> {
    id2label
        .iter()
        .find(|(_, label)| label.eq_ignore_ascii_case(wanted))
        .map(|(idx, _)| *idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::Sentiment;

    #[test]
    fn test_new_does_not_load() {
        let provider = TransformerSentimentProvider::new(&SentimentConfig::default());
        assert!(!provider.is_model_loaded());
        assert_eq!(provider.model_id, "distilbert-base-uncased-finetuned-sst-2-english");
    }

    #[tokio::test]
    async fn test_fallback_only_uses_lexicon() {
        let provider = TransformerSentimentProvider::new_fallback_only();
        let verdict = provider.analyze("Thanks, great support!").await.unwrap();
        let expected = LexiconSentimentProvider::new()
            .score("Thanks, great support!")
            .unwrap();
        assert_eq!(verdict, expected);
        assert_eq!(verdict.sentiment, Sentiment::Positive);
        assert!(!provider.is_model_loaded());
        assert!(provider.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_blank_text_rejected_before_loading() {
        let provider = TransformerSentimentProvider::new(&SentimentConfig::default());
        let err = provider.analyze("  ").await.unwrap_err();
        assert!(matches!(err, TriageError::InvalidInput(_)));
        assert!(provider.model.get().is_none());
    }

    #[test]
    fn test_id2label_lookup() {
        let json = serde_json::json!({"id2label": {"0": "NEGATIVE", "1": "POSITIVE"}});
        let map = extract_id2label(&json);
        assert_eq!(label_index(&map, "positive"), Some(1));
        assert_eq!(label_index(&map, "negative"), Some(0));

        let swapped = serde_json::json!({"id2label": {"0": "positive", "1": "negative"}});
        let map = extract_id2label(&swapped);
        assert_eq!(label_index(&map, "positive"), Some(0));
    }

    #[test]
    fn test_id2label_default() {
        let map = extract_id2label(&serde_json::json!({}));
        assert_eq!(map.len(), 2);
        assert_eq!(label_index(&map, "positive"), Some(1));
    }
}
