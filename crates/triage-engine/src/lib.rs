//! Triage engine for support tickets
//!
//! Scores an incoming customer message along three axes:
//!
//! - **Category**: a TF-IDF + softmax regression classifier
//!   ([`CategoryClassifier`]) with a confidence gate to `Other`.
//! - **Sentiment**: any [`triage_core::SentimentProvider`]; the bundled
//!   [`LexiconSentimentProvider`] is deterministic and needs no model
//!   download. With the `ml` feature, `TransformerSentimentProvider` runs a
//!   DistilBERT SST-2 model and falls back to the lexicon when it cannot load.
//! - **Churn and priority**: the rule-based [`SignalFusionEngine`] combines
//!   category, sentiment and keyword scans.
//!
//! [`TriagePipeline`] runs all three for one message.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use triage_engine::{sample_data, CategoryClassifier, LexiconSentimentProvider, TriagePipeline};
//!
//! let classifier = Arc::new(CategoryClassifier::new());
//! classifier.train_examples(&sample_data::sample_training_set()).unwrap();
//!
//! let pipeline = TriagePipeline::new(classifier)
//!     .with_sentiment(Arc::new(LexiconSentimentProvider::new()));
//!
//! let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! let prediction = rt.block_on(pipeline.predict("Please add dark mode")).unwrap();
//! assert_eq!(prediction.priority_label.to_string(), "P4");
//! ```

pub mod classifier;
pub mod fusion;
pub mod logistic;
pub mod pipeline;
pub mod sample_data;
pub mod sentiment;
#[cfg(feature = "ml")]
pub mod transformer_sentiment;
pub mod vectorizer;

pub use classifier::CategoryClassifier;
pub use fusion::SignalFusionEngine;
pub use pipeline::{BootstrapOutcome, TriagePipeline};
pub use sentiment::LexiconSentimentProvider;
#[cfg(feature = "ml")]
pub use transformer_sentiment::TransformerSentimentProvider;
