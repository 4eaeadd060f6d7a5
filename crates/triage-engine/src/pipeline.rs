//! End-to-end triage of a single message.
//!
//! [`TriagePipeline`] wires the [`CategoryClassifier`], an optional
//! [`SentimentProvider`] and the [`SignalFusionEngine`] together. Sentiment
//! is best-effort: a missing provider, a provider error or a timeout all
//! degrade to "no verdict" instead of failing the prediction.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use triage_core::{
    Prediction, Result, SentimentProvider, SentimentVerdict, TrainingExample, TriageConfig,
    TriageError,
};

use crate::classifier::CategoryClassifier;
use crate::fusion::SignalFusionEngine;
use crate::sample_data::sample_training_set;

/// Default upper bound on one sentiment call.
pub const DEFAULT_SENTIMENT_TIMEOUT: Duration = Duration::from_millis(2000);

/// How [`TriagePipeline::bootstrap`] obtained its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// A persisted model was loaded.
    Loaded,
    /// The bundled sample data was used to train a fresh model.
    TrainedOnSamples,
}

/// Classifier + sentiment + fusion, in one call.
pub struct TriagePipeline {
    classifier: Arc<CategoryClassifier>,
    sentiment: Option<Arc<dyn SentimentProvider>>,
    engine: SignalFusionEngine,
    sentiment_timeout: Duration,
    model_path: Option<PathBuf>,
}

impl TriagePipeline {
    /// Create a pipeline with no sentiment provider and no persistence.
    #[must_use]
    pub fn new(classifier: Arc<CategoryClassifier>) -> Self {
        Self {
            classifier,
            sentiment: None,
            engine: SignalFusionEngine::new(),
            sentiment_timeout: DEFAULT_SENTIMENT_TIMEOUT,
            model_path: None,
        }
    }

    /// Build a pipeline from service configuration.
    ///
    /// `provider` is ignored when `config.sentiment.enabled` is false.
    #[must_use]
    pub fn from_config(config: &TriageConfig, provider: Option<Arc<dyn SentimentProvider>>) -> Self {
        let classifier = Arc::new(CategoryClassifier::from_config(&config.classifier));
        let mut pipeline = Self::new(classifier)
            .with_sentiment_timeout(Duration::from_millis(config.sentiment.timeout_ms));
        if config.sentiment.enabled {
            pipeline.sentiment = provider;
        }
        pipeline.model_path = config.model_path.as_ref().map(PathBuf::from);
        pipeline
    }

    /// Attach a sentiment provider.
    #[must_use]
    pub fn with_sentiment(mut self, provider: Arc<dyn SentimentProvider>) -> Self {
        self.sentiment = Some(provider);
        self
    }

    /// Set the per-call sentiment timeout.
    #[must_use]
    pub fn with_sentiment_timeout(mut self, timeout: Duration) -> Self {
        self.sentiment_timeout = timeout;
        self
    }

    /// Persist the classifier to `path` after every training run.
    #[must_use]
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// The shared classifier.
    #[must_use]
    pub fn classifier(&self) -> &Arc<CategoryClassifier> {
        &self.classifier
    }

    /// The sentiment provider, if enabled.
    #[must_use]
    pub fn sentiment_provider(&self) -> Option<&Arc<dyn SentimentProvider>> {
        self.sentiment.as_ref()
    }

    /// Returns `true` when a sentiment provider is configured.
    #[must_use]
    pub fn has_sentiment(&self) -> bool {
        self.sentiment.is_some()
    }

    /// Configured persistence path.
    #[must_use]
    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    /// Classify, score and merge one message.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidInput`] for blank text and
    /// [`TriageError::NotTrained`] before the classifier is fitted. Sentiment
    /// failures never surface here.
    pub async fn predict(&self, text: &str) -> Result<Prediction> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TriageError::InvalidInput("Empty text provided".to_string()));
        }

        let classification = self.classifier.predict(text)?;
        let verdict = self.verdict_for(text).await;
        let fusion = self.engine.fuse(text, &classification, verdict.as_ref());

        tracing::info!(
            raw_category = %classification.category,
            category = %fusion.effective_category,
            churn = fusion.churn_probability,
            churn_label = %fusion.churn_label,
            priority = fusion.priority_score,
            priority_label = %fusion.priority_label,
            sentiment = verdict.is_some(),
            "Ticket triaged"
        );

        Ok(Prediction::assemble(classification, fusion))
    }

    /// Run the sentiment provider on one text, bounded by the timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::ProviderFailure`] when no provider is configured
    /// or the call times out, and passes provider errors through.
    pub async fn analyze_sentiment(&self, text: &str) -> Result<SentimentVerdict> {
        let provider = self.provider()?;
        tokio::time::timeout(self.sentiment_timeout, provider.analyze(text))
            .await
            .map_err(|_| self.timeout_error())?
    }

    /// Run the sentiment provider on many texts, bounded by the timeout.
    ///
    /// # Errors
    ///
    /// Same as [`analyze_sentiment`](Self::analyze_sentiment); an empty list or
    /// any blank entry is [`TriageError::InvalidInput`].
    pub async fn analyze_sentiment_batch(&self, texts: &[String]) -> Result<Vec<SentimentVerdict>> {
        let provider = self.provider()?;
        tokio::time::timeout(self.sentiment_timeout, provider.batch_analyze(texts))
            .await
            .map_err(|_| self.timeout_error())?
    }

    /// Train the classifier and persist it when a model path is configured.
    ///
    /// Returns the number of examples trained on. A failed save is logged and
    /// does not fail the call.
    ///
    /// # Errors
    ///
    /// Propagates classifier training errors.
    pub fn train(&self, examples: &[TrainingExample]) -> Result<usize> {
        self.classifier.train_examples(examples)?;
        self.persist();
        Ok(examples.len())
    }

    /// Bring the classifier up at startup.
    ///
    /// Loads the persisted model when the configured file exists and parses;
    /// otherwise trains on the bundled sample data and tries to save it.
    ///
    /// # Errors
    ///
    /// Returns an error only if training on the sample data fails.
    pub fn bootstrap(&self) -> Result<BootstrapOutcome> {
        if let Some(path) = self.model_path.as_deref().filter(|p| p.exists()) {
            match self.classifier.load(path) {
                Ok(()) => return Ok(BootstrapOutcome::Loaded),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load saved classifier, retraining on sample data"
                ),
            }
        }

        let samples = sample_training_set();
        self.classifier.train_examples(&samples)?;
        tracing::info!(examples = samples.len(), "Classifier trained on sample data");
        self.persist();
        Ok(BootstrapOutcome::TrainedOnSamples)
    }

    fn persist(&self) {
        let Some(path) = self.model_path.as_deref() else {
            return;
        };
        if let Err(e) = self.classifier.save(path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to save classifier");
        }
    }

    async fn verdict_for(&self, text: &str) -> Option<SentimentVerdict> {
        if !self.has_sentiment() {
            return None;
        }
        match self.analyze_sentiment(text).await {
            Ok(verdict) => Some(verdict),
            Err(e) => {
                tracing::warn!(error = %e, "Sentiment unavailable, continuing without it");
                None
            }
        }
    }

    fn provider(&self) -> Result<&Arc<dyn SentimentProvider>> {
        self.sentiment
            .as_ref()
            .ok_or_else(|| TriageError::ProviderFailure("Sentiment analysis is disabled".to_string()))
    }

    fn timeout_error(&self) -> TriageError {
        TriageError::ProviderFailure(format!(
            "Sentiment provider timed out after {} ms",
            self.sentiment_timeout.as_millis()
        ))
    }
}
