//! TF-IDF text vectorizer.
//!
//! Turns ticket text into sparse, L2-normalised TF-IDF vectors over word
//! unigrams and bigrams.
//!
//! # Tokenisation
//!
//! Text is lower-cased and split into runs of two or more word characters
//! (`\b\w\w+\b`). Bigrams join adjacent tokens with a single space.
//!
//! # Weighting
//!
//! | Term            | Formula                                  |
//! |-----------------|------------------------------------------|
//! | term frequency  | raw count in the document                |
//! | inverse doc freq| `ln((1 + n) / (1 + df)) + 1`             |
//! | row norm        | L2                                       |

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use triage_core::{Result, TriageError};

/// Token pattern: two or more consecutive word characters.
const TOKEN_PATTERN: &str = r"\b\w\w+\b";

/// Sparse feature vector as `(feature_index, value)` pairs, sorted by index.
pub type SparseVector = Vec<(usize, f64)>;

fn token_regex() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("token pattern is a valid regex"))
}

/// Fitted TF-IDF vectorizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfIdfVectorizer {
    /// Term -> feature index.
    vocabulary: HashMap<String, usize>,
    /// Inverse document frequency per feature index.
    idf: Vec<f64>,
}

impl TfIdfVectorizer {
    /// Fit the vocabulary and IDF weights on `documents`.
    ///
    /// Feature indices follow the lexical order of the terms, so two fits on
    /// the same corpus produce identical vectorizers.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidInput`] if `documents` is empty or no
    /// document contains a single usable token.
    pub fn fit(documents: &[String]) -> Result<Self> {
        if documents.is_empty() {
            return Err(TriageError::InvalidInput(
                "No training texts provided".to_string(),
            ));
        }

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for doc in documents {
            let unique_terms: HashSet<String> = analyze(doc).into_iter().collect();
            for term in unique_terms {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        if document_frequency.is_empty() {
            return Err(TriageError::InvalidInput(
                "Training texts contain no usable terms".to_string(),
            ));
        }

        let n_documents = documents.len() as f64;
        let mut vocabulary = HashMap::with_capacity(document_frequency.len());
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (idx, (term, df)) in document_frequency.into_iter().enumerate() {
            idf.push(((1.0 + n_documents) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(term, idx);
        }

        Ok(Self { vocabulary, idf })
    }

    /// Transform a document into a sparse TF-IDF vector.
    ///
    /// Terms outside the fitted vocabulary are ignored; a document with no
    /// known terms maps to the empty vector.
    #[must_use]
    pub fn transform(&self, document: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in analyze(document) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();

        let norm = vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    /// Number of features (distinct unigrams and bigrams seen during fit).
    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Lower-case, tokenise and emit unigrams followed by bigrams.
fn analyze(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = token_regex()
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .collect();

    let mut terms: Vec<String> = tokens.iter().map(|t| (*t).to_string()).collect();
    terms.extend(tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    terms
}
