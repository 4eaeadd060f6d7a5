//! Support ticket triage server
//!
//! Serves category classification, sentiment, and churn/priority scoring
//! over HTTP. On startup the classifier is loaded from `model_path`, or
//! trained on the bundled sample data when no saved model is available.

use std::sync::Arc;

use tracing::info;
use triage_server::{build_app_state, build_router, config, logging, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration: from CLI arg, env var, or default
    let config_path = config::config_path_from_env();
    let config = config::load_or_default(config_path.as_deref())?;

    logging::init_tracing(&config.logging)?;

    match &config_path {
        Some(path) => info!(path = %path.display(), "Loaded configuration from file"),
        None => info!("No config file specified, using defaults"),
    }
    info!(
        listen_addr = %config.listen_addr,
        model_path = ?config.model_path,
        sentiment = config.sentiment.enabled,
        "Starting triage server"
    );

    let listen_addr = config.listen_addr.clone();
    let state = build_app_state(config);
    bootstrap_classifier(&state).await?;

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!(%listen_addr, "Triage server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Triage server stopped");
    Ok(())
}

/// Load or train the classifier on the blocking pool.
async fn bootstrap_classifier(state: &Arc<AppState>) -> anyhow::Result<()> {
    let worker = Arc::clone(state);
    let outcome = tokio::task::spawn_blocking(move || worker.pipeline.bootstrap()).await??;
    let classifier = state.pipeline.classifier();
    info!(
        ?outcome,
        version = classifier.version(),
        labels = classifier.labels().len(),
        "Classifier ready"
    );
    Ok(())
}

/// Resolve when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
