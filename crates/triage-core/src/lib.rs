//! Core types, traits, and errors for support ticket triage
//!
//! This crate contains the foundational types shared across all triage
//! components: the closed category set, classifier and sentiment outputs, the
//! fused churn/priority verdict, the [`SentimentProvider`] seam, error types,
//! and service configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Category types
// ---------------------------------------------------------------------------

/// Support-ticket topic label.
///
/// The set is closed. [`Category::Other`] is the catch-all for degenerate or
/// low-confidence input and is always part of a classifier's label set, even
/// when no training example carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Billing,
    Technical,
    Account,
    Feature,
    #[serde(rename = "Refund Request")]
    RefundRequest,
    #[serde(rename = "Service Complaint")]
    ServiceComplaint,
    Other,
}

impl Category {
    /// Every category, in the default label order.
    pub const ALL: [Category; 7] = [
        Category::Billing,
        Category::Technical,
        Category::Account,
        Category::Feature,
        Category::RefundRequest,
        Category::ServiceComplaint,
        Category::Other,
    ];

    /// Human-readable label text, e.g. `"Refund Request"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Billing => "Billing",
            Self::Technical => "Technical",
            Self::Account => "Account",
            Self::Feature => "Feature",
            Self::RefundRequest => "Refund Request",
            Self::ServiceComplaint => "Service Complaint",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = TriageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TriageError::InvalidInput(format!("unknown category: {s}")))
    }
}

/// A single labelled training example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    /// Raw ticket text.
    pub text: String,
    /// Target category.
    pub label: Category,
}

impl TrainingExample {
    /// Create a new training example.
    pub fn new(text: impl Into<String>, label: Category) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// Output of the category classifier for one text.
///
/// `probabilities` holds an entry for every known label; labels the model
/// never saw are zero-filled, so entries need not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Predicted (possibly gated) category.
    pub category: Category,
    /// Per-label probability.
    pub probabilities: BTreeMap<Category, f64>,
}

impl ClassificationResult {
    /// Highest probability in the distribution, `0.0` when empty.
    #[must_use]
    pub fn max_probability(&self) -> f64 {
        self.probabilities.values().copied().fold(0.0_f64, f64::max)
    }
}

// ---------------------------------------------------------------------------
// Sentiment types
// ---------------------------------------------------------------------------

/// Binary sentiment polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
        }
    }
}

/// A sentiment provider's verdict for one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentVerdict {
    /// Winning polarity.
    pub sentiment: Sentiment,
    /// Score of the winning polarity (0.0–1.0).
    pub confidence: f64,
    /// Score for the positive class.
    pub positive_score: f64,
    /// Score for the negative class.
    pub negative_score: f64,
}

impl SentimentVerdict {
    /// Build a verdict from per-class scores. Ties resolve to negative.
    #[must_use]
    pub fn from_scores(positive_score: f64, negative_score: f64) -> Self {
        if positive_score > negative_score {
            Self {
                sentiment: Sentiment::Positive,
                confidence: positive_score,
                positive_score,
                negative_score,
            }
        } else {
            Self {
                sentiment: Sentiment::Negative,
                confidence: negative_score,
                positive_score,
                negative_score,
            }
        }
    }

    /// Returns `true` for a negative verdict.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.sentiment == Sentiment::Negative
    }

    /// Returns `true` for a positive verdict.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.sentiment == Sentiment::Positive
    }
}

/// Trait for sentiment providers.
///
/// Providers may be slow or fail; callers on the prediction path treat any
/// error as "no verdict" rather than failing the request.
#[async_trait::async_trait]
pub trait SentimentProvider: Send + Sync {
    /// Analyze one text. Fails with [`TriageError::InvalidInput`] on blank text.
    async fn analyze(&self, text: &str) -> Result<SentimentVerdict>;

    /// Analyze many texts, returning one verdict per input in input order.
    ///
    /// Fails with [`TriageError::InvalidInput`] on an empty list or any blank
    /// entry.
    async fn batch_analyze(&self, texts: &[String]) -> Result<Vec<SentimentVerdict>> {
        if texts.is_empty() {
            return Err(TriageError::InvalidInput(
                "Input texts list cannot be empty".to_string(),
            ));
        }
        let mut verdicts = Vec::with_capacity(texts.len());
        for text in texts {
            verdicts.push(self.analyze(text).await?);
        }
        Ok(verdicts)
    }

    /// Get the provider name.
    fn name(&self) -> &'static str;

    /// Check if the provider is healthy.
    async fn health_check(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Fusion types
// ---------------------------------------------------------------------------

/// Churn-risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChurnLabel {
    High,
    Medium,
    Low,
}

impl ChurnLabel {
    /// Bucket a churn probability: `High` at 0.66, `Medium` at 0.33.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 0.66 {
            Self::High
        } else if score >= 0.33 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for ChurnLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

/// Operator response priority, `P1` most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriorityLabel {
    P1,
    P2,
    P3,
    P4,
}

impl PriorityLabel {
    /// Bucket a priority score: `P1` at 0.75, `P2` at 0.5, `P3` at 0.3.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 0.75 {
            Self::P1
        } else if score >= 0.5 {
            Self::P2
        } else if score >= 0.3 {
            Self::P3
        } else {
            Self::P4
        }
    }
}

impl std::fmt::Display for PriorityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::P1 => write!(f, "P1"),
            Self::P2 => write!(f, "P2"),
            Self::P3 => write!(f, "P3"),
            Self::P4 => write!(f, "P4"),
        }
    }
}

/// Churn and priority assessment produced by the fusion engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    /// Churn risk in `[0, 1]`.
    pub churn_probability: f64,
    /// Churn bucket.
    pub churn_label: ChurnLabel,
    /// Priority score in `[0, 1]`.
    pub priority_score: f64,
    /// Priority bucket.
    pub priority_label: PriorityLabel,
    /// Category after override rules; may differ from the classifier output.
    pub effective_category: Category,
    /// Verdict after the suggestion override, if any verdict was available.
    pub effective_verdict: Option<SentimentVerdict>,
}

/// Scored verdict for one message, as exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Effective category.
    pub category: Category,
    /// Category the classifier produced before override rules.
    pub raw_category: Category,
    /// Classifier probability distribution.
    pub probabilities: BTreeMap<Category, f64>,
    /// Churn risk in `[0, 1]`.
    pub churn_probability: f64,
    /// Churn bucket.
    pub churn_label: ChurnLabel,
    /// Priority score in `[0, 1]`.
    pub priority_score: f64,
    /// Priority bucket.
    pub priority_label: PriorityLabel,
    /// Sentiment polarity, present only when a verdict was available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_label: Option<Sentiment>,
    /// Positive-class score of the verdict, present only with a verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
}

impl Prediction {
    /// Merge classifier output and fusion output into one record.
    #[must_use]
    pub fn assemble(classification: ClassificationResult, fusion: FusionResult) -> Self {
        let sentiment_label = fusion.effective_verdict.as_ref().map(|v| v.sentiment);
        let sentiment_score = fusion.effective_verdict.as_ref().map(|v| v.positive_score);
        Self {
            category: fusion.effective_category,
            raw_category: classification.category,
            probabilities: classification.probabilities,
            churn_probability: fusion.churn_probability,
            churn_label: fusion.churn_label,
            priority_score: fusion.priority_score,
            priority_label: fusion.priority_label,
            sentiment_label,
            sentiment_score,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration types
// ---------------------------------------------------------------------------

/// Top-level service configuration.
///
/// # Example (YAML)
///
/// ```yaml
/// listen_addr: "0.0.0.0:8000"
/// model_path: "models/classifier.json"
/// classifier:
///   confidence_threshold: 0.25
/// sentiment:
///   enabled: true
///   timeout_ms: 2000
///   backend: lexicon
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Address the HTTP service binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Where the trained classifier is persisted. `None` disables persistence.
    #[serde(default = "default_model_path")]
    pub model_path: Option<String>,
    /// Classifier settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Sentiment provider settings.
    #[serde(default)]
    pub sentiment: SentimentConfig,
    /// Circuit breaker guarding the sentiment provider.
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_model_path() -> Option<String> {
    Some("models/classifier.json".to_string())
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            model_path: default_model_path(),
            classifier: ClassifierConfig::default(),
            sentiment: SentimentConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Category classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Minimum top probability below which a prediction is demoted to `Other`.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Full-batch optimizer steps used when fitting the model.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    /// AdamW learning rate.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// AdamW decoupled weight decay.
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f64,
}

/// Constructor-time confidence threshold.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.25;

fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_max_iter() -> usize {
    1000
}

fn default_learning_rate() -> f64 {
    0.01
}

fn default_weight_decay() -> f64 {
    0.01
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            max_iter: default_max_iter(),
            learning_rate: default_learning_rate(),
            weight_decay: default_weight_decay(),
        }
    }
}

/// Sentiment provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    /// Enable sentiment analysis. When disabled every verdict is absent.
    #[serde(default = "default_sentiment_enabled")]
    pub enabled: bool,
    /// Upper bound on a single provider call; exceeding it yields no verdict.
    #[serde(default = "default_sentiment_timeout_ms")]
    pub timeout_ms: u64,
    /// Which provider produces verdicts.
    #[serde(default)]
    pub backend: SentimentBackend,
    /// HuggingFace model ID for [`SentimentBackend::Transformer`].
    #[serde(default = "default_sentiment_model_id")]
    pub model_id: String,
    /// Cache directory for downloaded model files.
    #[serde(default)]
    pub cache_dir: Option<String>,
}

/// Sentiment provider implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentBackend {
    /// Keyword-count scoring; no model download.
    #[default]
    Lexicon,
    /// Sequence classification model, loaded on first use. Needs the `ml`
    /// feature; without it the lexicon provider is used instead.
    Transformer,
}

fn default_sentiment_model_id() -> String {
    "distilbert-base-uncased-finetuned-sst-2-english".to_string()
}

fn default_sentiment_enabled() -> bool {
    true
}

fn default_sentiment_timeout_ms() -> u64 {
    2000
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            enabled: default_sentiment_enabled(),
            timeout_ms: default_sentiment_timeout_ms(),
            backend: SentimentBackend::default(),
            model_id: default_sentiment_model_id(),
            cache_dir: None,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Enable the breaker.
    #[serde(default = "default_breaker_enabled")]
    pub enabled: bool,
    /// Consecutive failures before the circuit opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Time the circuit stays open before trying the provider again.
    #[serde(default = "default_recovery_timeout_ms")]
    pub recovery_timeout_ms: u64,
    /// Trial calls allowed while half-open.
    #[serde(default = "default_half_open_max_calls")]
    pub half_open_max_calls: u32,
}

fn default_breaker_enabled() -> bool {
    true
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_ms() -> u64 {
    30_000
}

fn default_half_open_max_calls() -> u32 {
    1
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: default_breaker_enabled(),
            failure_threshold: default_failure_threshold(),
            recovery_timeout_ms: default_recovery_timeout_ms(),
            half_open_max_calls: default_half_open_max_calls(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: `text` (human-readable) or `json` (structured).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Core error types.
#[derive(thiserror::Error, Debug)]
pub enum TriageError {
    /// Rejected input (empty text, empty or mismatched training data).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Prediction attempted before any model was fitted.
    #[error("Classifier not trained yet")]
    NotTrained,

    /// Sentiment provider failed or timed out.
    #[error("Sentiment provider failure: {0}")]
    ProviderFailure(String),

    /// Saving or loading the classifier failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization / deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tensor or model runtime failure.
    #[error("Model error: {0}")]
    Model(String),
}

/// Convenience alias for `std::result::Result<T, TriageError>`.
pub type Result<T> = std::result::Result<T, TriageError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_display_uses_label_text() {
        assert_eq!(Category::RefundRequest.to_string(), "Refund Request");
        assert_eq!(Category::ServiceComplaint.to_string(), "Service Complaint");
        assert_eq!(Category::Other.to_string(), "Other");
    }

    #[test]
    fn test_category_from_str_case_insensitive() {
        assert_eq!(
            "refund request".parse::<Category>().unwrap(),
            Category::RefundRequest
        );
        assert_eq!("BILLING".parse::<Category>().unwrap(), Category::Billing);
        assert_eq!(" Other ".parse::<Category>().unwrap(), Category::Other);
    }

    #[test]
    fn test_category_from_str_rejects_unknown() {
        let err = "Shipping".parse::<Category>().unwrap_err();
        assert!(matches!(err, TriageError::InvalidInput(_)));
    }

    #[test]
    fn test_category_serde_matches_display() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category));
            let back: Category = serde_json::from_str(&json).unwrap();
            assert_eq!(back, category);
        }
    }

    #[test]
    fn test_probabilities_serialize_as_label_keyed_map() {
        let mut probabilities = BTreeMap::new();
        probabilities.insert(Category::RefundRequest, 0.5);
        let result = ClassificationResult {
            category: Category::RefundRequest,
            probabilities,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["probabilities"]["Refund Request"], 0.5);
        assert_eq!(json["category"], "Refund Request");
    }

    #[test]
    fn test_max_probability() {
        let mut probabilities = BTreeMap::new();
        probabilities.insert(Category::Billing, 0.2);
        probabilities.insert(Category::Account, 0.7);
        let result = ClassificationResult {
            category: Category::Account,
            probabilities,
        };
        assert!((result.max_probability() - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_verdict_from_scores_tie_is_negative() {
        let verdict = SentimentVerdict::from_scores(0.5, 0.5);
        assert!(verdict.is_negative());
        assert!((verdict.confidence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_verdict_from_scores_positive() {
        let verdict = SentimentVerdict::from_scores(0.8, 0.2);
        assert!(verdict.is_positive());
        assert!((verdict.confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sentiment_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Sentiment::Negative).unwrap(),
            "\"negative\""
        );
    }

    #[test]
    fn test_churn_label_boundaries() {
        assert_eq!(ChurnLabel::from_score(0.66), ChurnLabel::High);
        assert_eq!(ChurnLabel::from_score(0.6599), ChurnLabel::Medium);
        assert_eq!(ChurnLabel::from_score(0.33), ChurnLabel::Medium);
        assert_eq!(ChurnLabel::from_score(0.3299), ChurnLabel::Low);
        assert_eq!(ChurnLabel::from_score(0.0), ChurnLabel::Low);
    }

    #[test]
    fn test_priority_label_boundaries() {
        assert_eq!(PriorityLabel::from_score(1.0), PriorityLabel::P1);
        assert_eq!(PriorityLabel::from_score(0.75), PriorityLabel::P1);
        assert_eq!(PriorityLabel::from_score(0.5), PriorityLabel::P2);
        assert_eq!(PriorityLabel::from_score(0.3), PriorityLabel::P3);
        assert_eq!(PriorityLabel::from_score(0.2999), PriorityLabel::P4);
    }

    #[test]
    fn test_prediction_assemble_without_verdict_omits_sentiment() {
        let classification = ClassificationResult {
            category: Category::Billing,
            probabilities: BTreeMap::new(),
        };
        let fusion = FusionResult {
            churn_probability: 0.3,
            churn_label: ChurnLabel::Low,
            priority_score: 0.315,
            priority_label: PriorityLabel::P3,
            effective_category: Category::Billing,
            effective_verdict: None,
        };
        let prediction = Prediction::assemble(classification, fusion);
        let json = serde_json::to_value(&prediction).unwrap();
        assert!(json.get("sentiment_label").is_none());
        assert!(json.get("sentiment_score").is_none());
        assert_eq!(json["churn_label"], "Low");
        assert_eq!(json["priority_label"], "P3");
    }

    #[test]
    fn test_prediction_assemble_reports_positive_score() {
        let classification = ClassificationResult {
            category: Category::Feature,
            probabilities: BTreeMap::new(),
        };
        let fusion = FusionResult {
            churn_probability: 0.06,
            churn_label: ChurnLabel::Low,
            priority_score: 0.0,
            priority_label: PriorityLabel::P4,
            effective_category: Category::Technical,
            effective_verdict: Some(SentimentVerdict::from_scores(0.56, 0.44)),
        };
        let prediction = Prediction::assemble(classification, fusion);
        assert_eq!(prediction.category, Category::Technical);
        assert_eq!(prediction.raw_category, Category::Feature);
        assert_eq!(prediction.sentiment_label, Some(Sentiment::Positive));
        assert_eq!(prediction.sentiment_score, Some(0.56));
    }

    #[test]
    fn test_config_defaults() {
        let config = TriageConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8000");
        assert!((config.classifier.confidence_threshold - 0.25).abs() < f64::EPSILON);
        assert!(config.sentiment.enabled);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_partial_json_fills_defaults() {
        let config: TriageConfig =
            serde_json::from_str(r#"{"sentiment": {"enabled": false}}"#).unwrap();
        assert!(!config.sentiment.enabled);
        assert_eq!(config.sentiment.timeout_ms, 2000);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.model_path.as_deref(), Some("models/classifier.json"));
        assert_eq!(config.sentiment.backend, SentimentBackend::Lexicon);
        assert_eq!(config.classifier.max_iter, 1000);
    }

    #[test]
    fn test_sentiment_backend_parses_lowercase() {
        let config: SentimentConfig =
            serde_json::from_str(r#"{"backend": "transformer", "cache_dir": "/tmp/hf"}"#).unwrap();
        assert_eq!(config.backend, SentimentBackend::Transformer);
        assert_eq!(
            config.model_id,
            "distilbert-base-uncased-finetuned-sst-2-english"
        );
        assert_eq!(config.cache_dir.as_deref(), Some("/tmp/hf"));
        assert!(serde_json::from_str::<SentimentConfig>(r#"{"backend": "bert"}"#).is_err());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            TriageError::NotTrained.to_string(),
            "Classifier not trained yet"
        );
        assert_eq!(
            TriageError::InvalidInput("Empty text provided".into()).to_string(),
            "Invalid input: Empty text provided"
        );
    }
}
