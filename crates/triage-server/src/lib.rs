//! Support ticket triage HTTP service: library interface.
//!
//! Exposes the router and state builders so that integration tests and
//! embedders can construct the service programmatically.

pub mod api;
pub mod app;
pub mod circuit_breaker;
pub mod config;
pub mod logging;

pub use app::{
    build_app_state, build_app_state_with_provider, build_router, sentiment_provider, AppState,
};
pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitState, GuardedSentimentProvider};
