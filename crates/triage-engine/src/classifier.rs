//! Ticket category classifier.
//!
//! Provides [`CategoryClassifier`], a TF-IDF + softmax regression text
//! classifier over the closed [`Category`] set with a confidence gate that
//! demotes uncertain predictions to [`Category::Other`].
//!
//! The fitted state lives in an immutable [`Arc`] snapshot. `train` and `load`
//! build a complete replacement snapshot and swap it in under a short write
//! lock; `predict` clones the current `Arc` and works on it lock-free, so a
//! concurrent reader observes either the old or the new model, never a mix.
//!
//! # Persistence
//!
//! `save` writes a JSON document (vectorizer, classes, labels, threshold)
//! and the regression weights as a safetensors file beside it. The weights
//! file name carries a per-save suffix and is recorded in the document, so
//! renaming the document into place commits both at once.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use triage_core::{
    Category, ClassificationResult, ClassifierConfig, Result, TrainingExample, TriageError,
};

use crate::logistic::{SoftmaxRegression, TrainParams};
use crate::vectorizer::TfIdfVectorizer;

/// Threshold applied when a persisted classifier carries none.
///
/// Differs from the constructor default
/// ([`triage_core::DEFAULT_CONFIDENCE_THRESHOLD`]); both values are kept as-is.
pub const LOAD_DEFAULT_THRESHOLD: f64 = 0.5;

/// Trimmed texts shorter than this (in characters) bypass the model.
const MIN_TEXT_CHARS: usize = 3;

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Fitted text model: vectorizer plus regression head.
#[derive(Debug)]
pub struct TextModel {
    vectorizer: TfIdfVectorizer,
    regression: SoftmaxRegression,
}

impl TextModel {
    /// Fit a fresh model on the full training set.
    pub fn fit(texts: &[String], labels: &[Category], params: &TrainParams) -> Result<Self> {
        let vectorizer = TfIdfVectorizer::fit(texts)?;
        let samples: Vec<_> = texts.iter().map(|t| vectorizer.transform(t)).collect();
        let regression =
            SoftmaxRegression::fit(&samples, labels, vectorizer.vocabulary_size(), params)?;
        Ok(Self {
            vectorizer,
            regression,
        })
    }

    /// Probability for every class the model was trained on, in model order.
    pub fn predict_proba(&self, text: &str) -> Result<Vec<(Category, f64)>> {
        self.regression
            .predict_proba(&self.vectorizer.transform(text))
    }

    /// Classes seen during training.
    #[must_use]
    pub fn classes(&self) -> &[Category] {
        self.regression.classes()
    }
}

// ---------------------------------------------------------------------------
// Persistence format
// ---------------------------------------------------------------------------

/// On-disk classifier document. `labels` and `confidence_threshold` are
/// optional so documents written without them still load.
#[derive(Debug, Deserialize)]
struct PersistedClassifier {
    model: PersistedModel,
    #[serde(default)]
    labels: Option<Vec<Category>>,
    #[serde(default)]
    confidence_threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PersistedModel {
    vectorizer: TfIdfVectorizer,
    classes: Vec<Category>,
    /// Safetensors file name, relative to the document's directory.
    weights: String,
}

/// Reject anything but a bare file name, so a document cannot point the
/// loader outside its own directory.
fn weights_path(document: &Path, name: &str) -> Result<PathBuf> {
    if name.is_empty() || Path::new(name).file_name() != Some(OsStr::new(name)) {
        return Err(TriageError::Persistence(format!(
            "Invalid weights file name {name:?} in {}",
            document.display()
        )));
    }
    Ok(document.with_file_name(name))
}

/// Weights file referenced by the document currently at `path`, if any.
fn current_weights(path: &Path) -> Option<PathBuf> {
    let bytes = std::fs::read(path).ok()?;
    let doc: PersistedClassifier = serde_json::from_slice(&bytes).ok()?;
    weights_path(path, &doc.model.weights).ok()
}

// ---------------------------------------------------------------------------
// CategoryClassifier
// ---------------------------------------------------------------------------

/// Immutable view of the classifier state.
#[derive(Debug)]
struct Snapshot {
    model: Option<TextModel>,
    labels: Vec<Category>,
    threshold: f64,
    version: u64,
}

/// Thread-safe category classifier with atomic retraining.
///
/// # Example
///
/// ```
/// use triage_core::{Category, TrainingExample};
/// use triage_engine::CategoryClassifier;
///
/// let classifier = CategoryClassifier::new();
/// classifier
///     .train_examples(&[
///         TrainingExample::new("I was charged twice", Category::Billing),
///         TrainingExample::new("The app keeps crashing", Category::Technical),
///     ])
///     .unwrap();
/// let result = classifier.predict("ok").unwrap();
/// assert_eq!(result.category, Category::Other);
/// ```
#[derive(Debug)]
pub struct CategoryClassifier {
    state: RwLock<Arc<Snapshot>>,
    params: TrainParams,
}

impl CategoryClassifier {
    /// Untrained classifier over every [`Category`] with the default threshold.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }

    /// Untrained classifier using the given configuration.
    #[must_use]
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            state: RwLock::new(Arc::new(Snapshot {
                model: None,
                labels: Category::ALL.to_vec(),
                threshold: config.confidence_threshold,
                version: 0,
            })),
            params: TrainParams::from_config(config),
        }
    }

    /// Train from labelled examples. See [`CategoryClassifier::train`].
    pub fn train_examples(&self, examples: &[TrainingExample]) -> Result<()> {
        let (texts, labels): (Vec<String>, Vec<Category>) = examples
            .iter()
            .map(|ex| (ex.text.clone(), ex.label))
            .unzip();
        self.train(&texts, &labels)
    }

    /// Fit a fresh model on `texts`/`labels`, replacing any prior model.
    ///
    /// `Other` need not appear among `labels`.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidInput`] when `texts` is empty, the
    /// lengths differ, or the data cannot be fitted, and
    /// [`TriageError::Model`] if the optimizer fails.
    pub fn train(&self, texts: &[String], labels: &[Category]) -> Result<()> {
        if texts.is_empty() {
            return Err(TriageError::InvalidInput(
                "No training texts provided".to_string(),
            ));
        }
        if texts.len() != labels.len() {
            return Err(TriageError::InvalidInput(format!(
                "Got {} texts but {} labels",
                texts.len(),
                labels.len()
            )));
        }

        let model = TextModel::fit(texts, labels, &self.params)?;
        let classes = model.classes().len();
        let version = self.swap(|current| Snapshot {
            model: Some(model),
            labels: current.labels.clone(),
            threshold: current.threshold,
            version: current.version + 1,
        });

        tracing::info!(
            examples = texts.len(),
            classes,
            version,
            "Category classifier trained"
        );
        Ok(())
    }

    /// Classify `text`.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::NotTrained`] if no model has been fitted and
    /// [`TriageError::Model`] if inference fails.
    pub fn predict(&self, text: &str) -> Result<ClassificationResult> {
        let snapshot = self.snapshot();
        let model = snapshot.model.as_ref().ok_or(TriageError::NotTrained)?;

        if text.trim().chars().count() < MIN_TEXT_CHARS {
            return Ok(ClassificationResult {
                category: Category::Other,
                probabilities: snapshot.labels.iter().map(|&l| (l, 0.0)).collect(),
            });
        }

        let scored = model.predict_proba(text)?;
        let predicted = scored
            .iter()
            .fold(None::<(Category, f64)>, |best, &(c, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((c, p)),
            })
            .map_or(Category::Other, |(c, _)| c);

        let mut probabilities: BTreeMap<Category, f64> = scored.into_iter().collect();
        for &label in &snapshot.labels {
            probabilities.entry(label).or_insert(0.0);
        }

        let max_prob = probabilities.values().copied().fold(0.0_f64, f64::max);
        tracing::debug!(
            predicted = %predicted,
            max_prob,
            threshold = snapshot.threshold,
            ?probabilities,
            "Category prediction"
        );

        if max_prob < snapshot.threshold {
            tracing::info!(
                max_prob,
                threshold = snapshot.threshold,
                "Classifying as Other due to low confidence"
            );
            return Ok(ClassificationResult {
                category: Category::Other,
                probabilities,
            });
        }

        Ok(ClassificationResult {
            category: predicted,
            probabilities,
        })
    }

    /// Persist `{model, labels, confidence_threshold}`.
    ///
    /// The weights are written first under a fresh name, then the document
    /// is written to a sibling temp file and renamed into place. The weights
    /// file of the replaced document is removed afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::NotTrained`] without a model and
    /// [`TriageError::Persistence`] on I/O failure.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot();
        let model = snapshot.model.as_ref().ok_or(TriageError::NotTrained)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                TriageError::Persistence(format!(
                    "Failed to create model directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let stem = path
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or("classifier");
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let weights_name = format!("{stem}.{}-{nonce}.safetensors", snapshot.version);
        let weights = path.with_file_name(&weights_name);
        let weights_tmp = path.with_file_name(format!("{weights_name}.tmp"));
        model.regression.save(&weights_tmp)?;
        std::fs::rename(&weights_tmp, &weights).map_err(|e| {
            TriageError::Persistence(format!(
                "Failed to move weights into {}: {e}",
                weights.display()
            ))
        })?;

        #[derive(Serialize)]
        struct BorrowedModel<'a> {
            vectorizer: &'a TfIdfVectorizer,
            classes: &'a [Category],
            weights: &'a str,
        }
        #[derive(Serialize)]
        struct Borrowed<'a> {
            model: BorrowedModel<'a>,
            labels: &'a [Category],
            confidence_threshold: f64,
        }
        let json = serde_json::to_vec(&Borrowed {
            model: BorrowedModel {
                vectorizer: &model.vectorizer,
                classes: model.regression.classes(),
                weights: &weights_name,
            },
            labels: &snapshot.labels,
            confidence_threshold: snapshot.threshold,
        })?;

        let previous = current_weights(path);
        let tmp = path.with_extension("tmp");
        let committed = std::fs::write(&tmp, json)
            .map_err(|e| {
                TriageError::Persistence(format!("Failed to write {}: {e}", tmp.display()))
            })
            .and_then(|()| {
                std::fs::rename(&tmp, path).map_err(|e| {
                    TriageError::Persistence(format!(
                        "Failed to move model into {}: {e}",
                        path.display()
                    ))
                })
            });
        if let Err(e) = committed {
            let _ = std::fs::remove_file(&weights);
            return Err(e);
        }

        if let Some(old) = previous.filter(|old| *old != weights) {
            if let Err(e) = std::fs::remove_file(&old) {
                tracing::debug!(path = %old.display(), error = %e, "Stale weights not removed");
            }
        }

        tracing::info!(
            path = %path.display(),
            weights = %weights.display(),
            version = snapshot.version,
            "Classifier saved"
        );
        Ok(())
    }

    /// Replace the current state with a persisted classifier.
    ///
    /// Missing labels keep the current labels; a missing threshold becomes
    /// [`LOAD_DEFAULT_THRESHOLD`]. `Other` is always kept in the label set.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Persistence`] if the document or its weights
    /// cannot be read, and [`TriageError::Serialization`] if the document is
    /// not a classifier document.
    pub fn load(&self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path).map_err(|e| {
            TriageError::Persistence(format!("Failed to read {}: {e}", path.display()))
        })?;
        let persisted: PersistedClassifier = serde_json::from_slice(&bytes)?;

        let PersistedModel {
            vectorizer,
            classes,
            weights,
        } = persisted.model;
        let weights = weights_path(path, &weights)?;
        let regression =
            SoftmaxRegression::load(&weights, classes, vectorizer.vocabulary_size())?;
        let model = TextModel {
            vectorizer,
            regression,
        };

        let version = self.swap(|current| {
            let mut labels = persisted
                .labels
                .unwrap_or_else(|| current.labels.clone());
            if !labels.contains(&Category::Other) {
                labels.push(Category::Other);
            }
            Snapshot {
                model: Some(model),
                labels,
                threshold: persisted
                    .confidence_threshold
                    .unwrap_or(LOAD_DEFAULT_THRESHOLD),
                version: current.version + 1,
            }
        });

        tracing::info!(path = %path.display(), version, "Classifier loaded");
        Ok(())
    }

    /// Known labels, in label order.
    #[must_use]
    pub fn labels(&self) -> Vec<Category> {
        self.snapshot().labels.clone()
    }

    /// Active confidence threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.snapshot().threshold
    }

    /// Returns `true` once a model has been trained or loaded.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.snapshot().model.is_some()
    }

    /// Monotonic counter bumped on every train/load; `0` before the first.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        // A poisoned lock still holds a complete snapshot: writers only ever
        // assign a fully built Arc.
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn swap(&self, build: impl FnOnce(&Snapshot) -> Snapshot) -> u64 {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let next = build(&guard);
        let version = next.version;
        *guard = Arc::new(next);
        version
    }
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
