//! Lexicon-based sentiment provider.
//!
//! [`LexiconSentimentProvider`] scores text by counting case-insensitive
//! occurrences of fixed positive and negative cue phrases. It is
//! deterministic and needs no model download, which makes it the default
//! provider and a stable stand-in for heavier backends in tests.
//!
//! Scores are Laplace-smoothed: `positive = (p + 1) / (p + n + 2)` and
//! `negative = 1 - positive`, so text with no cues lands on an exact tie,
//! which resolves to negative.

use async_trait::async_trait;
use triage_core::{Result, SentimentProvider, SentimentVerdict, TriageError};

/// Phrases counted as positive evidence.
pub const POSITIVE_CUES: [&str; 13] = [
    "thank",
    "great",
    "love",
    "awesome",
    "excellent",
    "happy",
    "appreciate",
    "helpful",
    "amazing",
    "perfect",
    "good",
    "resolved",
    "works well",
];

/// Phrases counted as negative evidence.
pub const NEGATIVE_CUES: [&str; 24] = [
    "terrible",
    "awful",
    "horrible",
    "worst",
    "hate",
    "angry",
    "frustrat",
    "disappoint",
    "broken",
    "crash",
    "fail",
    "stuck",
    "slow",
    "unacceptable",
    "useless",
    "ridiculous",
    "charged twice",
    "not working",
    "never",
    "refund",
    "cancel",
    "problem",
    "error",
    "bad",
];

/// Deterministic keyword-count sentiment provider.
#[derive(Debug, Clone)]
pub struct LexiconSentimentProvider {
    positive_cues: Vec<String>,
    negative_cues: Vec<String>,
}

impl LexiconSentimentProvider {
    /// Create a provider with the built-in cue lists.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cues(POSITIVE_CUES, NEGATIVE_CUES)
    }

    /// Create a provider with custom cue lists. Cues are lower-cased.
    pub fn with_cues<P, N>(positive: P, negative: N) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        Self {
            positive_cues: positive
                .into_iter()
                .map(|c| c.as_ref().to_lowercase())
                .collect(),
            negative_cues: negative
                .into_iter()
                .map(|c| c.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Score text synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidInput`] for blank text.
    pub fn score(&self, text: &str) -> Result<SentimentVerdict> {
        if text.trim().is_empty() {
            return Err(TriageError::InvalidInput(
                "Input text cannot be empty".to_string(),
            ));
        }
        let lower = text.to_lowercase();
        let positive = count_cues(&lower, &self.positive_cues);
        let negative = count_cues(&lower, &self.negative_cues);

        let positive_score = (positive as f64 + 1.0) / ((positive + negative) as f64 + 2.0);
        let verdict = SentimentVerdict::from_scores(positive_score, 1.0 - positive_score);
        tracing::debug!(
            positive,
            negative,
            sentiment = %verdict.sentiment,
            confidence = verdict.confidence,
            "Lexicon sentiment scored"
        );
        Ok(verdict)
    }
}

impl Default for LexiconSentimentProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn count_cues(lower: &str, cues: &[String]) -> usize {
    cues.iter().map(|cue| lower.matches(cue.as_str()).count()).sum()
}

#[async_trait]
impl SentimentProvider for LexiconSentimentProvider {
    async fn analyze(&self, text: &str) -> Result<SentimentVerdict> {
        self.score(text)
    }

    fn name(&self) -> &'static str {
        "LexiconSentimentProvider"
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
