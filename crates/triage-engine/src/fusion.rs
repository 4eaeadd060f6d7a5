//! Signal fusion: churn risk and priority from weak signals.
//!
//! [`SignalFusionEngine`] combines the classifier's category, an optional
//! sentiment verdict and literal keyword scans over the ticket text into a
//! [`FusionResult`]. The computation is an ordered list of [`FUSION_STEPS`],
//! each a pure transformation of one [`WorkingRecord`]. Later steps may
//! overwrite values set by earlier ones, so the order is part of the
//! behaviour:
//!
//! | #  | Step                   | Reads                         | Writes                     |
//! |----|------------------------|-------------------------------|----------------------------|
//! | 1  | keyword signal         | text                          | `keyword_signal`           |
//! | 2  | suggestion override    | text, verdict                 | `verdict`                  |
//! | 3  | sentiment signal       | verdict, `keyword_signal`     | `sentiment_signal`         |
//! | 4  | category signal        | raw category                  | `category_signal`          |
//! | 5  | category override      | text, raw category            | effective category, `category_signal` |
//! | 6  | churn risk             | signals                       | `churn_probability`        |
//! | 7  | sentiment severity     | verdict                       | `severity`                 |
//! | 8  | category priority      | effective category            | `category_priority`        |
//! | 9  | urgency                | text                          | `urgency`                  |
//! | 10 | confidence multiplier  | verdict                       | `multiplier`               |
//! | 11 | priority score         | severity, priority, urgency   | `priority_score`           |
//! | 12 | positive override      | verdict                       | `priority_score`           |
//!
//! Every keyword check is case-insensitive substring containment, not word
//! matching: `"add"` matches inside `"address"`.

use triage_core::{
    Category, ChurnLabel, ClassificationResult, FusionResult, PriorityLabel, Sentiment,
    SentimentVerdict,
};

// ---------------------------------------------------------------------------
// Business constants
// ---------------------------------------------------------------------------

/// Phrases signalling intent to leave.
pub const CHURN_KEYWORDS: [&str; 6] = [
    "cancel",
    "refund",
    "unsubscribe",
    "close account",
    "switch",
    "terminate",
];

/// Phrases marking a message as a suggestion rather than a complaint.
pub const SUGGESTION_PHRASES: [&str; 7] = [
    "please add",
    "add",
    "could you",
    "would you",
    "would love",
    "feature request",
    "please implement",
];

/// Phrases that force a non-`Other` ticket into `Technical`.
pub const TECHNICAL_DISTRESS_KEYWORDS: [&str; 15] = [
    "stuck",
    "freeze",
    "freezing",
    "crash",
    "crashes",
    "crashing",
    "not working",
    "keeps getting stuck",
    "keep getting stuck",
    "app",
    "phone",
    "mobile",
    "unresponsive",
    "hang",
    "hangs",
];

/// Phrases marking a message as time-critical.
pub const URGENCY_KEYWORDS: [&str; 8] = [
    "urgent",
    "immediately",
    "asap",
    "not working",
    "down",
    "failed",
    "blocked",
    "cannot access",
];

/// Business churn risk per lower-cased category name.
///
/// Independent of [`PRIORITY_CATEGORY_WEIGHTS`]; some keys here match no
/// [`Category`] and are kept for label compatibility.
pub const CHURN_CATEGORY_RISK: [(&str, f64); 10] = [
    ("billing", 1.0),
    ("account", 0.9),
    ("technical", 0.6),
    ("support delay", 0.5),
    ("feature request", 0.2),
    ("general inquiry", 0.1),
    ("other", 0.2),
    ("refund request", 1.0),
    ("service complaint", 0.6),
    ("feature", 0.2),
];

/// Churn risk for categories missing from [`CHURN_CATEGORY_RISK`].
pub const DEFAULT_CHURN_CATEGORY_RISK: f64 = 0.1;

/// Priority weight per lower-cased category name.
pub const PRIORITY_CATEGORY_WEIGHTS: [(&str, f64); 6] = [
    ("billing", 0.9),
    ("account", 1.0),
    ("refund request", 0.85),
    ("technical", 0.7),
    ("feature", 0.3),
    ("general", 0.2),
];

/// Priority weight for categories missing from [`PRIORITY_CATEGORY_WEIGHTS`].
pub const DEFAULT_PRIORITY_CATEGORY_WEIGHT: f64 = 0.2;

/// Verdicts below this confidence are replaced when a suggestion is detected.
const SUGGESTION_CONFIDENCE_CEILING: f64 = 0.6;

/// Moderate-positive verdict substituted for suggestions.
const SUGGESTION_VERDICT: SentimentVerdict = SentimentVerdict {
    sentiment: Sentiment::Positive,
    confidence: 0.56,
    positive_score: 0.56,
    negative_score: 0.44,
};

const CHURN_SENTIMENT_WEIGHT: f64 = 0.5;
const CHURN_CATEGORY_WEIGHT: f64 = 0.3;
const CHURN_KEYWORD_WEIGHT: f64 = 0.2;

const PRIORITY_SEVERITY_WEIGHT: f64 = 0.4;
const PRIORITY_CATEGORY_WEIGHT: f64 = 0.35;
const PRIORITY_URGENCY_WEIGHT: f64 = 0.25;

/// Positive verdicts count for less severity than negative ones.
const POSITIVE_SEVERITY_DISCOUNT: f64 = 0.9;

/// Verdicts above this confidence boost the priority score.
const HIGH_CONFIDENCE: f64 = 0.8;
const HIGH_CONFIDENCE_MULTIPLIER: f64 = 1.1;

// ---------------------------------------------------------------------------
// Working record
// ---------------------------------------------------------------------------

/// Intermediate state threaded through the fusion steps.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingRecord {
    /// Lower-cased ticket text.
    pub text: String,
    /// Category produced by the classifier.
    pub raw_category: Category,
    /// Category after override rules.
    pub effective_category: Category,
    /// Sentiment verdict, possibly replaced by the suggestion override.
    pub verdict: Option<SentimentVerdict>,
    pub keyword_signal: f64,
    pub sentiment_signal: f64,
    pub category_signal: f64,
    pub churn_probability: f64,
    pub severity: f64,
    pub category_priority: f64,
    pub urgency: f64,
    pub multiplier: f64,
    pub priority_score: f64,
}

impl WorkingRecord {
    /// Start a record with all signals zeroed.
    ///
    /// Verdict scores are clamped into `[0, 1]` (NaN becomes `0.0`) so the
    /// final scores stay in range whatever the provider returns.
    #[must_use]
    pub fn new(text: &str, raw_category: Category, verdict: Option<&SentimentVerdict>) -> Self {
        Self {
            text: text.to_lowercase(),
            raw_category,
            effective_category: raw_category,
            verdict: verdict.map(sanitize_verdict),
            keyword_signal: 0.0,
            sentiment_signal: 0.0,
            category_signal: 0.0,
            churn_probability: 0.0,
            severity: 0.0,
            category_priority: 0.0,
            urgency: 0.0,
            multiplier: 1.0,
            priority_score: 0.0,
        }
    }

    /// Freeze the record into a [`FusionResult`].
    #[must_use]
    pub fn finish(self) -> FusionResult {
        FusionResult {
            churn_probability: self.churn_probability,
            churn_label: ChurnLabel::from_score(self.churn_probability),
            priority_score: self.priority_score,
            priority_label: PriorityLabel::from_score(self.priority_score),
            effective_category: self.effective_category,
            effective_verdict: self.verdict,
        }
    }

    fn contains_any(&self, phrases: &[&str]) -> bool {
        phrases.iter().any(|p| self.text.contains(p))
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn sanitize_verdict(verdict: &SentimentVerdict) -> SentimentVerdict {
    SentimentVerdict {
        sentiment: verdict.sentiment,
        confidence: clamp_unit(verdict.confidence),
        positive_score: clamp_unit(verdict.positive_score),
        negative_score: clamp_unit(verdict.negative_score),
    }
}

fn lookup(table: &[(&str, f64)], category: Category, default: f64) -> f64 {
    let key = category.as_str().to_lowercase();
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map_or(default, |&(_, weight)| weight)
}

/// Churn risk weight for `category`.
#[must_use]
pub fn churn_category_risk(category: Category) -> f64 {
    lookup(&CHURN_CATEGORY_RISK, category, DEFAULT_CHURN_CATEGORY_RISK)
}

/// Priority weight for `category`.
#[must_use]
pub fn priority_category_weight(category: Category) -> f64 {
    lookup(
        &PRIORITY_CATEGORY_WEIGHTS,
        category,
        DEFAULT_PRIORITY_CATEGORY_WEIGHT,
    )
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// A single fusion step.
pub type FusionStep = fn(&mut WorkingRecord);

/// The fusion steps, in execution order.
pub const FUSION_STEPS: [(&str, FusionStep); 12] = [
    ("keyword_signal", keyword_signal),
    ("suggestion_override", suggestion_override),
    ("sentiment_signal", sentiment_signal),
    ("category_signal", category_signal),
    ("category_override", category_override),
    ("churn_risk", churn_risk),
    ("sentiment_severity", sentiment_severity),
    ("category_priority", category_priority),
    ("urgency_signal", urgency_signal),
    ("confidence_multiplier", confidence_multiplier),
    ("priority_score", priority_score),
    ("positive_override", positive_override),
];

/// Step 1: fraction of churn keywords present, `0.0` when none.
pub fn keyword_signal(r: &mut WorkingRecord) {
    let matches = CHURN_KEYWORDS
        .iter()
        .filter(|kw| r.text.contains(*kw))
        .count();
    r.keyword_signal = if matches > 0 {
        matches as f64 / CHURN_KEYWORDS.len() as f64
    } else {
        0.0
    };
}

/// Step 2: suggestions with a negative or unsure verdict become
/// moderate-positive. No-op without a verdict.
pub fn suggestion_override(r: &mut WorkingRecord) {
    let Some(verdict) = &r.verdict else {
        return;
    };
    let doubtful =
        verdict.is_negative() || verdict.confidence < SUGGESTION_CONFIDENCE_CEILING;
    if doubtful && r.contains_any(&SUGGESTION_PHRASES) {
        r.verdict = Some(SUGGESTION_VERDICT);
    }
}

/// Step 3: negative confidence counts toward churn only alongside keyword
/// evidence.
pub fn sentiment_signal(r: &mut WorkingRecord) {
    r.sentiment_signal = match &r.verdict {
        Some(v) if v.is_negative() && r.keyword_signal > 0.0 => v.confidence,
        _ => 0.0,
    };
}

/// Step 4: churn risk of the classifier's category.
pub fn category_signal(r: &mut WorkingRecord) {
    r.category_signal = churn_category_risk(r.raw_category);
}

/// Step 5: technical distress wording forces `Technical`. `Other` is never
/// overridden.
pub fn category_override(r: &mut WorkingRecord) {
    if r.raw_category != Category::Other && r.contains_any(&TECHNICAL_DISTRESS_KEYWORDS) {
        r.effective_category = Category::Technical;
        r.category_signal = churn_category_risk(Category::Technical);
    }
}

/// Step 6: weighted churn risk, clamped to `[0, 1]`.
pub fn churn_risk(r: &mut WorkingRecord) {
    r.churn_probability = clamp_unit(
        CHURN_SENTIMENT_WEIGHT * r.sentiment_signal
            + CHURN_CATEGORY_WEIGHT * r.category_signal
            + CHURN_KEYWORD_WEIGHT * r.keyword_signal,
    );
}

/// Step 7: verdict confidence as severity, discounted for positive verdicts.
pub fn sentiment_severity(r: &mut WorkingRecord) {
    r.severity = match &r.verdict {
        Some(v) if v.is_negative() => v.confidence,
        Some(v) => v.confidence * POSITIVE_SEVERITY_DISCOUNT,
        None => 0.0,
    };
}

/// Step 8: priority weight of the effective category.
pub fn category_priority(r: &mut WorkingRecord) {
    r.category_priority = priority_category_weight(r.effective_category);
}

/// Step 9: binary urgency.
pub fn urgency_signal(r: &mut WorkingRecord) {
    r.urgency = if r.contains_any(&URGENCY_KEYWORDS) {
        1.0
    } else {
        0.0
    };
}

/// Step 10: boost for high-confidence verdicts.
pub fn confidence_multiplier(r: &mut WorkingRecord) {
    r.multiplier = match &r.verdict {
        Some(v) if v.confidence > HIGH_CONFIDENCE => HIGH_CONFIDENCE_MULTIPLIER,
        _ => 1.0,
    };
}

/// Step 11: weighted priority, capped at `1.0`.
pub fn priority_score(r: &mut WorkingRecord) {
    let base = PRIORITY_SEVERITY_WEIGHT * r.severity
        + PRIORITY_CATEGORY_WEIGHT * r.category_priority
        + PRIORITY_URGENCY_WEIGHT * r.urgency;
    r.priority_score = (base * r.multiplier).min(1.0);
}

/// Step 12: positive messages never need an operator urgently.
pub fn positive_override(r: &mut WorkingRecord) {
    if r.verdict.as_ref().is_some_and(SentimentVerdict::is_positive) {
        r.priority_score = 0.0;
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stateless churn/priority scorer.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use triage_core::{Category, ChurnLabel, ClassificationResult, SentimentVerdict};
/// use triage_engine::SignalFusionEngine;
///
/// let classification = ClassificationResult {
///     category: Category::Feature,
///     probabilities: BTreeMap::new(),
/// };
/// let verdict = SentimentVerdict::from_scores(0.1, 0.9);
/// let result = SignalFusionEngine::new().fuse(
///     "I want a refund and this app keeps crashing",
///     &classification,
///     Some(&verdict),
/// );
/// assert_eq!(result.effective_category, Category::Technical);
/// assert_eq!(result.churn_label, ChurnLabel::High);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalFusionEngine;

impl SignalFusionEngine {
    /// Create a new engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Score one message.
    #[must_use]
    pub fn fuse(
        &self,
        text: &str,
        classification: &ClassificationResult,
        verdict: Option<&SentimentVerdict>,
    ) -> FusionResult {
        self.trace(text, classification.category, verdict).finish()
    }

    /// Run every step and return the final working record, for inspection.
    #[must_use]
    pub fn trace(
        &self,
        text: &str,
        raw_category: Category,
        verdict: Option<&SentimentVerdict>,
    ) -> WorkingRecord {
        let mut record = WorkingRecord::new(text, raw_category, verdict);
        for (_, step) in FUSION_STEPS {
            step(&mut record);
        }
        record
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
