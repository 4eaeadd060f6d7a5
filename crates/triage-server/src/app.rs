//! Shared application state and router construction.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use triage_core::{SentimentBackend, SentimentConfig, SentimentProvider, TriageConfig};
use triage_engine::{LexiconSentimentProvider, TriagePipeline};

use crate::api;
use crate::circuit_breaker::{CircuitBreaker, GuardedSentimentProvider};

/// State shared by every request handler.
pub struct AppState {
    /// Effective service configuration.
    pub config: TriageConfig,
    /// Classifier, sentiment and fusion.
    pub pipeline: TriagePipeline,
    /// Breaker guarding the sentiment provider, when enabled.
    pub sentiment_breaker: Option<Arc<CircuitBreaker>>,
}

/// Build the [`AppState`] with the sentiment provider named by
/// `sentiment.backend`.
///
/// The classifier starts untrained; call
/// [`TriagePipeline::bootstrap`] before serving predictions.
#[must_use]
pub fn build_app_state(config: TriageConfig) -> Arc<AppState> {
    let provider = sentiment_provider(&config.sentiment);
    build_app_state_with_provider(config, provider)
}

/// Construct the configured sentiment backend.
pub fn sentiment_provider(config: &SentimentConfig) -> Arc<dyn SentimentProvider> {
    match config.backend {
        SentimentBackend::Lexicon => Arc::new(LexiconSentimentProvider::new()),
        #[cfg(feature = "ml")]
        SentimentBackend::Transformer => {
            Arc::new(triage_engine::TransformerSentimentProvider::new(config))
        }
        #[cfg(not(feature = "ml"))]
        SentimentBackend::Transformer => {
            tracing::warn!(
                model_id = %config.model_id,
                "Transformer sentiment requires the `ml` feature, using lexicon"
            );
            Arc::new(LexiconSentimentProvider::new())
        }
    }
}

/// Build the [`AppState`] around a specific sentiment provider.
///
/// The provider is wrapped in a [`CircuitBreaker`] when
/// `circuit_breaker.enabled` is set, and dropped when sentiment is disabled.
/// Guarded calls that overrun `sentiment.timeout_ms` count as breaker
/// failures.
#[must_use]
pub fn build_app_state_with_provider(
    config: TriageConfig,
    provider: Arc<dyn SentimentProvider>,
) -> Arc<AppState> {
    let (provider, sentiment_breaker) = if config.circuit_breaker.enabled {
        let breaker = Arc::new(CircuitBreaker::from_config(&config.circuit_breaker));
        let guarded = GuardedSentimentProvider::new(provider, Arc::clone(&breaker))
            .with_call_timeout(Duration::from_millis(config.sentiment.timeout_ms));
        (Arc::new(guarded) as Arc<dyn SentimentProvider>, Some(breaker))
    } else {
        (provider, None)
    };

    let pipeline = TriagePipeline::from_config(&config, Some(provider));
    let sentiment_breaker = sentiment_breaker.filter(|_| pipeline.has_sentiment());

    Arc::new(AppState {
        config,
        pipeline,
        sentiment_breaker,
    })
}

/// Build the axum [`Router`] with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(api::predict))
        .route("/train", post(api::train))
        .route("/labels", get(api::labels))
        .route("/sentiment", post(api::sentiment))
        .route("/sentiment/batch", post(api::sentiment_batch))
        .route("/health", get(api::health))
        .with_state(state)
}
