//! HTTP handlers.
//!
//! | Method | Path               | Handler            |
//! |--------|--------------------|--------------------|
//! | POST   | `/predict`         | [`predict`]        |
//! | POST   | `/train`           | [`train`]          |
//! | GET    | `/labels`          | [`labels`]         |
//! | POST   | `/sentiment`       | [`sentiment`]      |
//! | POST   | `/sentiment/batch` | [`sentiment_batch`]|
//! | GET    | `/health`          | [`health`]         |
//!
//! Errors are returned as `{"error": {"message": ..., "type": ...}}`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use triage_core::{Category, Sentiment, SentimentVerdict, TrainingExample, TriageError};

use crate::app::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /predict` and `POST /sentiment`.
#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

/// Body of `POST /sentiment/batch`.
#[derive(Debug, Deserialize)]
pub struct BatchTextRequest {
    pub texts: Vec<String>,
}

/// One labelled example in `POST /train`. Labels are matched
/// case-insensitively against the category names.
#[derive(Debug, Deserialize)]
pub struct TrainItem {
    pub text: String,
    pub label: String,
}

/// Body of `POST /train`.
#[derive(Debug, Deserialize)]
pub struct TrainRequest {
    pub examples: Vec<TrainItem>,
}

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub success: bool,
    pub trained_on: usize,
    pub version: u64,
    pub labels: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct LabelsResponse {
    pub labels: Vec<Category>,
}

/// Sentiment verdict echoed with its input text.
#[derive(Debug, Serialize)]
pub struct SentimentResponse {
    pub text: String,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub positive_score: f64,
    pub negative_score: f64,
}

impl SentimentResponse {
    fn new(text: String, verdict: SentimentVerdict) -> Self {
        Self {
            text,
            sentiment: verdict.sentiment,
            confidence: verdict.confidence,
            positive_score: verdict.positive_score,
            negative_score: verdict.negative_score,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchSentimentResponse {
    pub results: Vec<SentimentResponse>,
}

/// Standard API error envelope.
#[derive(Debug, Serialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Serialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

fn api_error(status: StatusCode, message: &str, error_type: &str) -> Response {
    let body = ApiError {
        error: ApiErrorDetail {
            message: message.to_string(),
            error_type: error_type.to_string(),
        },
    };
    (status, Json(body)).into_response()
}

/// Map a [`TriageError`] onto an HTTP status and error envelope.
pub fn error_response(err: &TriageError) -> Response {
    let (status, error_type) = match err {
        TriageError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        TriageError::NotTrained => (StatusCode::SERVICE_UNAVAILABLE, "not_trained"),
        TriageError::ProviderFailure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "provider_error"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    }
    api_error(status, &err.to_string(), error_type)
}

fn sentiment_disabled() -> Response {
    api_error(
        StatusCode::SERVICE_UNAVAILABLE,
        "Sentiment analysis is disabled",
        "sentiment_disabled",
    )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /predict`: classify and score one message.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TextRequest>,
) -> Response {
    match state.pipeline.predict(&request.text).await {
        Ok(prediction) => Json(prediction).into_response(),
        Err(e) => error_response(&e),
    }
}

/// `POST /train`: retrain the classifier from labelled examples.
///
/// Training runs on the blocking pool; predictions keep using the previous
/// model until the new one is swapped in.
pub async fn train(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TrainRequest>,
) -> Response {
    let examples = match request
        .examples
        .into_iter()
        .map(|item| {
            let label = item.label.parse::<Category>()?;
            Ok::<_, TriageError>(TrainingExample::new(item.text, label))
        })
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(examples) => examples,
        Err(e) => return error_response(&e),
    };

    let worker = Arc::clone(&state);
    let outcome = tokio::task::spawn_blocking(move || worker.pipeline.train(&examples)).await;

    match outcome {
        Ok(Ok(trained_on)) => {
            let classifier = state.pipeline.classifier();
            tracing::info!(trained_on, version = classifier.version(), "Classifier retrained");
            Json(TrainResponse {
                success: true,
                trained_on,
                version: classifier.version(),
                labels: classifier.labels(),
            })
            .into_response()
        }
        Ok(Err(e)) => error_response(&e),
        Err(e) => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Training task failed: {e}"),
            "internal_error",
        ),
    }
}

/// `GET /labels`: the classifier's known labels.
pub async fn labels(State(state): State<Arc<AppState>>) -> Response {
    Json(LabelsResponse {
        labels: state.pipeline.classifier().labels(),
    })
    .into_response()
}

/// `POST /sentiment`: sentiment verdict for one text.
pub async fn sentiment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TextRequest>,
) -> Response {
    if !state.pipeline.has_sentiment() {
        return sentiment_disabled();
    }
    match state.pipeline.analyze_sentiment(&request.text).await {
        Ok(verdict) => Json(SentimentResponse::new(request.text, verdict)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// `POST /sentiment/batch`: sentiment verdicts for many texts, in order.
pub async fn sentiment_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchTextRequest>,
) -> Response {
    if !state.pipeline.has_sentiment() {
        return sentiment_disabled();
    }
    match state.pipeline.analyze_sentiment_batch(&request.texts).await {
        Ok(verdicts) => {
            let results = request
                .texts
                .into_iter()
                .zip(verdicts)
                .map(|(text, verdict)| SentimentResponse::new(text, verdict))
                .collect();
            Json(BatchSentimentResponse { results }).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// `GET /health`: classifier and sentiment status.
///
/// Reports `degraded` while the classifier is untrained or the sentiment
/// provider is unhealthy.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let classifier = state.pipeline.classifier();
    let trained = classifier.is_trained();

    let provider = state.pipeline.sentiment_provider();
    let sentiment_healthy = match provider {
        Some(p) => p.health_check().await.is_ok(),
        None => true,
    };
    let circuit = match &state.sentiment_breaker {
        Some(breaker) => breaker.state().to_string(),
        None => "disabled".to_string(),
    };

    let body = serde_json::json!({
        "status": if trained && sentiment_healthy { "healthy" } else { "degraded" },
        "classifier": {
            "trained": trained,
            "version": classifier.version(),
            "threshold": classifier.threshold(),
            "labels": classifier.labels(),
        },
        "sentiment": {
            "enabled": provider.is_some(),
            "provider": provider.map(|p| p.name()),
            "healthy": sentiment_healthy,
            "circuit_breaker": circuit,
        },
    });

    (StatusCode::OK, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_error_response_status_mapping() {
        let cases = [
            (TriageError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (TriageError::NotTrained, StatusCode::SERVICE_UNAVAILABLE),
            (
                TriageError::ProviderFailure("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                TriageError::Persistence("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (TriageError::Config("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (TriageError::Model("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(error_response(&err).status(), status, "{err}");
        }
    }

    #[tokio::test]
    async fn test_error_envelope_shape() {
        let json = body_json(error_response(&TriageError::NotTrained)).await;
        assert_eq!(json["error"]["message"], "Classifier not trained yet");
        assert_eq!(json["error"]["type"], "not_trained");
    }
}
