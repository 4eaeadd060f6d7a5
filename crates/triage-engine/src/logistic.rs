//! Multinomial logistic regression head on candle.
//!
//! A single `Linear(n_features -> n_classes)` layer with softmax output,
//! trained full-batch with AdamW on cross-entropy. Parameters start at zero,
//! so a fit depends only on the training data and the [`TrainParams`].
//!
//! The parameters are owned by a [`VarMap`] and persisted as safetensors.

use std::fmt;
use std::path::Path;

use candle_core::{DType, Device, Tensor, D};
use candle_nn::{Init, Linear, Module, Optimizer, VarBuilder, VarMap};
use triage_core::{Category, ClassifierConfig, Result, TriageError};

use crate::vectorizer::SparseVector;

/// Variable prefix of the linear head inside the [`VarMap`].
const HEAD_PREFIX: &str = "head";

/// Optimizer settings for [`SoftmaxRegression::fit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainParams {
    /// Full-batch optimizer steps.
    pub max_iter: usize,
    /// AdamW learning rate.
    pub learning_rate: f64,
    /// AdamW decoupled weight decay.
    pub weight_decay: f64,
}

impl TrainParams {
    /// Take the optimizer settings from classifier configuration.
    #[must_use]
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            max_iter: config.max_iter,
            learning_rate: config.learning_rate,
            weight_decay: config.weight_decay,
        }
    }
}

impl Default for TrainParams {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

/// Fitted softmax regression model.
pub struct SoftmaxRegression {
    /// Classes in model order: distinct, sorted by label text.
    classes: Vec<Category>,
    n_features: usize,
    varmap: VarMap,
    head: Linear,
    device: Device,
}

impl fmt::Debug for SoftmaxRegression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftmaxRegression")
            .field("classes", &self.classes)
            .field("n_features", &self.n_features)
            .finish_non_exhaustive()
    }
}

impl SoftmaxRegression {
    /// Fit a model on sparse `samples` with matching `targets`.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidInput`] when the inputs are empty, have
    /// different lengths, or contain fewer than two distinct classes, and
    /// [`TriageError::Model`] if a tensor operation fails.
    pub fn fit(
        samples: &[SparseVector],
        targets: &[Category],
        n_features: usize,
        params: &TrainParams,
    ) -> Result<Self> {
        if samples.is_empty() || samples.len() != targets.len() {
            return Err(TriageError::InvalidInput(format!(
                "expected matching non-empty samples and targets, got {} and {}",
                samples.len(),
                targets.len()
            )));
        }

        let mut classes: Vec<Category> = targets.to_vec();
        classes.sort_by_key(|c| c.as_str());
        classes.dedup();
        if classes.len() < 2 {
            return Err(TriageError::InvalidInput(
                "at least two distinct labels are required to train".to_string(),
            ));
        }

        let target_index: Vec<u32> = targets
            .iter()
            .map(|t| classes.iter().position(|c| c == t).unwrap_or_default() as u32)
            .collect();

        let device = Device::Cpu;
        let varmap = VarMap::new();
        let head = build_head(&varmap, n_features, classes.len(), &device)
            .map_err(|e| TriageError::Model(format!("Failed to create regression head: {e}")))?;

        let inputs = dense_batch(samples, n_features, &device)
            .map_err(|e| TriageError::Model(format!("Failed to build training batch: {e}")))?;
        let labels = Tensor::new(target_index.as_slice(), &device)
            .map_err(|e| TriageError::Model(format!("Failed to build label tensor: {e}")))?;

        let mut optimizer = candle_nn::AdamW::new(
            varmap.all_vars(),
            candle_nn::ParamsAdamW {
                lr: params.learning_rate,
                weight_decay: params.weight_decay,
                ..Default::default()
            },
        )
        .map_err(|e| TriageError::Model(format!("Failed to create optimizer: {e}")))?;

        let mut final_loss = None;
        for step in 0..params.max_iter {
            let logits = head
                .forward(&inputs)
                .map_err(|e| TriageError::Model(format!("Forward pass failed: {e}")))?;
            let loss = candle_nn::loss::cross_entropy(&logits, &labels)
                .map_err(|e| TriageError::Model(format!("Loss computation failed: {e}")))?;
            optimizer
                .backward_step(&loss)
                .map_err(|e| TriageError::Model(format!("Backward step failed: {e}")))?;

            if step + 1 == params.max_iter {
                final_loss = loss.to_scalar::<f32>().ok();
            }
        }

        tracing::debug!(
            steps = params.max_iter,
            classes = classes.len(),
            n_features,
            loss = ?final_loss,
            "Softmax regression fitted"
        );

        Ok(Self {
            classes,
            n_features,
            varmap,
            head,
            device,
        })
    }

    /// Class probabilities for `x`, paired with their class, in model order.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Model`] if inference fails.
    pub fn predict_proba(&self, x: &SparseVector) -> Result<Vec<(Category, f64)>> {
        let probs = self
            .forward_proba(x)
            .map_err(|e| TriageError::Model(format!("Regression inference failed: {e}")))?;
        Ok(self
            .classes
            .iter()
            .copied()
            .zip(probs.into_iter().map(f64::from))
            .collect())
    }

    fn forward_proba(&self, x: &SparseVector) -> candle_core::Result<Vec<f32>> {
        let input = dense_batch(std::slice::from_ref(x), self.n_features, &self.device)?;
        let logits = self.head.forward(&input)?;
        candle_nn::ops::softmax(&logits, D::Minus1)?
            .squeeze(0)?
            .to_vec1()
    }

    /// Classes this model can predict.
    #[must_use]
    pub fn classes(&self) -> &[Category] {
        &self.classes
    }

    /// Width of the input feature space.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Write the head parameters to a safetensors file.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Persistence`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.varmap.save(path).map_err(|e| {
            TriageError::Persistence(format!("Failed to write weights {}: {e}", path.display()))
        })
    }

    /// Restore a model from a safetensors file written by [`save`](Self::save).
    ///
    /// `classes` and `n_features` describe the expected head shape; a file
    /// with a different shape is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidInput`] for fewer than two classes and
    /// [`TriageError::Persistence`] if the file is missing or does not match.
    pub fn load(path: &Path, classes: Vec<Category>, n_features: usize) -> Result<Self> {
        if classes.len() < 2 {
            return Err(TriageError::InvalidInput(
                "a persisted model needs at least two classes".to_string(),
            ));
        }

        let device = Device::Cpu;
        let mut varmap = VarMap::new();
        let head = build_head(&varmap, n_features, classes.len(), &device)
            .map_err(|e| TriageError::Model(format!("Failed to create regression head: {e}")))?;
        varmap.load(path).map_err(|e| {
            TriageError::Persistence(format!("Failed to load weights {}: {e}", path.display()))
        })?;

        Ok(Self {
            classes,
            n_features,
            varmap,
            head,
            device,
        })
    }
}

/// Zero-initialised `Linear` head registered in `varmap`.
fn build_head(
    varmap: &VarMap,
    n_features: usize,
    n_classes: usize,
    device: &Device,
) -> candle_core::Result<Linear> {
    let vb = VarBuilder::from_varmap(varmap, DType::F32, device).pp(HEAD_PREFIX);
    let weight = vb.get_with_hints((n_classes, n_features), "weight", Init::Const(0.0))?;
    let bias = vb.get_with_hints(n_classes, "bias", Init::Const(0.0))?;
    Ok(Linear::new(weight, Some(bias)))
}

/// Densify sparse rows into a `[rows, n_features]` tensor. Indices outside
/// the feature space are dropped.
fn dense_batch(
    rows: &[SparseVector],
    n_features: usize,
    device: &Device,
) -> candle_core::Result<Tensor> {
    let mut data = vec![0.0_f32; rows.len() * n_features];
    for (r, row) in rows.iter().enumerate() {
        for &(j, v) in row {
            if j < n_features {
                data[r * n_features + j] = v as f32;
            }
        }
    }
    Tensor::from_vec(data, (rows.len(), n_features), device)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_hot(idx: usize) -> SparseVector {
        vec![(idx, 1.0)]
    }

    fn fit(samples: &[SparseVector], targets: &[Category], n_features: usize) -> SoftmaxRegression {
        SoftmaxRegression::fit(samples, targets, n_features, &TrainParams::default()).unwrap()
    }

    #[test]
    fn test_fit_rejects_single_class() {
        let samples = vec![one_hot(0), one_hot(1)];
        let targets = vec![Category::Billing, Category::Billing];
        let result = SoftmaxRegression::fit(&samples, &targets, 2, &TrainParams::default());
        assert!(matches!(result, Err(TriageError::InvalidInput(_))));
    }

    #[test]
    fn test_fit_rejects_mismatched_lengths() {
        let samples = vec![one_hot(0)];
        let targets = vec![Category::Billing, Category::Account];
        let result = SoftmaxRegression::fit(&samples, &targets, 1, &TrainParams::default());
        assert!(matches!(result, Err(TriageError::InvalidInput(_))));
    }

    #[test]
    fn test_classes_sorted_by_label_text() {
        let samples = vec![one_hot(0), one_hot(1), one_hot(2), one_hot(3), one_hot(0)];
        let targets = vec![
            Category::Technical,
            Category::ServiceComplaint,
            Category::RefundRequest,
            Category::Account,
            Category::Technical,
        ];
        let params = TrainParams {
            max_iter: 5,
            ..TrainParams::default()
        };
        let model = SoftmaxRegression::fit(&samples, &targets, 4, &params).unwrap();
        assert_eq!(
            model.classes(),
            &[
                Category::Account,
                Category::RefundRequest,
                Category::ServiceComplaint,
                Category::Technical
            ]
        );
    }

    #[test]
    fn test_separable_features_learned() {
        let samples = vec![one_hot(0), one_hot(0), one_hot(1), one_hot(1)];
        let targets = vec![
            Category::Billing,
            Category::Billing,
            Category::Technical,
            Category::Technical,
        ];
        let model = fit(&samples, &targets, 2);

        let billing = model.predict_proba(&one_hot(0)).unwrap();
        assert_eq!(billing[0].0, Category::Billing);
        assert!(billing[0].1 > 0.9);

        let technical = model.predict_proba(&one_hot(1)).unwrap();
        assert_eq!(technical[1].0, Category::Technical);
        assert!(technical[1].1 > 0.9);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let samples = vec![one_hot(0), one_hot(1), one_hot(2)];
        let targets = vec![Category::Billing, Category::Account, Category::Feature];
        let model = fit(&samples, &targets, 3);
        let total: f64 = model
            .predict_proba(&vec![(0, 0.6), (2, 0.8)])
            .unwrap()
            .iter()
            .map(|(_, p)| p)
            .sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_symmetric_data_gives_uniform_prior() {
        let samples = vec![one_hot(0), one_hot(1), one_hot(2)];
        let targets = vec![Category::Billing, Category::Account, Category::Feature];
        let model = fit(&samples, &targets, 3);
        for (_, p) in model.predict_proba(&Vec::new()).unwrap() {
            assert!((p - 1.0 / 3.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let samples = vec![one_hot(0), vec![(0, 0.5), (1, 0.5)], one_hot(1)];
        let targets = vec![Category::Billing, Category::Billing, Category::Account];
        let a = fit(&samples, &targets, 2);
        let b = fit(&samples, &targets, 2);
        let pa = a.predict_proba(&one_hot(1)).unwrap();
        let pb = b.predict_proba(&one_hot(1)).unwrap();
        for ((ca, xa), (cb, xb)) in pa.iter().zip(&pb) {
            assert_eq!(ca, cb);
            assert!((xa - xb).abs() < 1e-6);
        }
    }

    #[test]
    fn test_out_of_range_feature_ignored() {
        let samples = vec![one_hot(0), one_hot(1)];
        let targets = vec![Category::Billing, Category::Account];
        let model = fit(&samples, &targets, 2);
        assert_eq!(
            model.predict_proba(&vec![(7, 1.0)]).unwrap(),
            model.predict_proba(&Vec::new()).unwrap()
        );
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("head.safetensors");

        let samples = vec![one_hot(0), one_hot(1), one_hot(2)];
        let targets = vec![Category::Billing, Category::Account, Category::Technical];
        let model = fit(&samples, &targets, 3);
        model.save(&path).unwrap();

        let restored = SoftmaxRegression::load(&path, model.classes().to_vec(), 3).unwrap();
        assert_eq!(restored.classes(), model.classes());
        assert_eq!(
            restored.predict_proba(&one_hot(2)).unwrap(),
            model.predict_proba(&one_hot(2)).unwrap()
        );
    }

    #[test]
    fn test_load_rejects_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("head.safetensors");

        let samples = vec![one_hot(0), one_hot(1)];
        let targets = vec![Category::Billing, Category::Account];
        let model = fit(&samples, &targets, 2);
        model.save(&path).unwrap();

        let result = SoftmaxRegression::load(&path, model.classes().to_vec(), 5);
        assert!(matches!(result, Err(TriageError::Persistence(_))));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = SoftmaxRegression::load(
            Path::new("/nonexistent/head.safetensors"),
            vec![Category::Account, Category::Billing],
            2,
        );
        assert!(matches!(result, Err(TriageError::Persistence(_))));
    }
}
