use crate::error::{AppError, Result};
use crate::models::{FeatureVector, FEATURE_NAMES, N_FEATURES};
use crate::risk::{label, RiskTier};
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the ensemble
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    /// Maximum tree depth; unbounded when absent
    #[serde(default)]
    pub max_depth: Option<u16>,

    /// Minimum samples required to split a node
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,

    /// Minimum samples required at a leaf
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,

    /// Fit each tree on a bootstrap sample of the training rows
    #[serde(default = "default_bootstrap")]
    pub bootstrap: bool,

    /// Seed for bootstrap sampling
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_n_trees() -> usize {
    100
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_bootstrap() -> bool {
    true
}

fn default_seed() -> u64 {
    42
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            bootstrap: default_bootstrap(),
            seed: default_seed(),
        }
    }
}

impl ForestConfig {
    /// Hyperparameters as reported in model metadata
    pub fn to_hyperparameters(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("n_trees".to_string(), self.n_trees.to_string());
        params.insert(
            "max_depth".to_string(),
            self.max_depth
                .map(|d| d.to_string())
                .unwrap_or_else(|| "none".to_string()),
        );
        params.insert(
            "min_samples_split".to_string(),
            self.min_samples_split.to_string(),
        );
        params.insert(
            "min_samples_leaf".to_string(),
            self.min_samples_leaf.to_string(),
        );
        params.insert("bootstrap".to_string(), self.bootstrap.to_string());
        params.insert("seed".to_string(), self.seed.to_string());
        params
    }
}

/// One labeled row
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrainingSample {
    pub features: FeatureVector,
    pub label: RiskTier,
}

impl TrainingSample {
    pub fn new(features: FeatureVector, label: RiskTier) -> Self {
        Self { features, label }
    }

    /// Label a cleaned record with the point rule
    pub fn labeled(features: FeatureVector) -> Self {
        Self {
            label: label(&features),
            features,
        }
    }
}

/// Training dataset
#[derive(Debug, Clone)]
pub struct TrainingDataset {
    /// Feature matrix (n_samples × n_features)
    pub features: Array2<f64>,

    /// Class labels, one per row
    pub labels: Vec<RiskTier>,

    /// Number of samples
    pub n_samples: usize,

    /// Number of features
    pub n_features: usize,
}

impl TrainingDataset {
    /// Create a new training dataset from samples
    pub fn from_samples(samples: &[TrainingSample]) -> Self {
        let n_samples = samples.len();
        let mut features = Array2::zeros((n_samples, N_FEATURES));
        let mut labels = Vec::with_capacity(n_samples);

        for (i, sample) in samples.iter().enumerate() {
            for (j, val) in sample.features.to_row().iter().enumerate() {
                features[[i, j]] = *val;
            }
            labels.push(sample.label);
        }

        Self {
            features,
            labels,
            n_samples,
            n_features: N_FEATURES,
        }
    }

    /// Label every vector with the point rule and build the dataset
    pub fn from_features(features: &[FeatureVector]) -> Self {
        let samples: Vec<TrainingSample> =
            features.iter().copied().map(TrainingSample::labeled).collect();
        Self::from_samples(&samples)
    }

    /// Labels as class indices
    pub fn label_indices(&self) -> Vec<usize> {
        self.labels.iter().map(RiskTier::index).collect()
    }

    /// Number of rows per class, indexed Low, Medium, High
    pub fn class_counts(&self) -> [usize; RiskTier::COUNT] {
        let mut counts = [0; RiskTier::COUNT];
        for tier in &self.labels {
            counts[tier.index()] += 1;
        }
        counts
    }

    /// Rows at the given indices, in that order
    pub fn subset(&self, indices: &[usize]) -> TrainingDataset {
        let features = self.features.select(ndarray::Axis(0), indices);
        let labels = indices.iter().map(|&i| self.labels[i]).collect();

        TrainingDataset {
            features,
            labels,
            n_samples: indices.len(),
            n_features: self.n_features,
        }
    }

    /// Row indices of each class, shuffled with `seed`
    fn shuffled_class_indices(&self, seed: u64) -> Vec<Vec<usize>> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut by_class = vec![Vec::new(); RiskTier::COUNT];
        for (i, tier) in self.labels.iter().enumerate() {
            by_class[tier.index()].push(i);
        }
        for indices in &mut by_class {
            indices.shuffle(&mut rng);
        }
        by_class
    }

    /// Split into train/test sets, preserving class proportions
    pub fn stratified_split(
        &self,
        test_size: f64,
        seed: u64,
    ) -> Result<(TrainingDataset, TrainingDataset)> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(AppError::Training(format!(
                "test_size must be in (0, 1), got {}",
                test_size
            )));
        }

        let mut train_idx = Vec::new();
        let mut test_idx = Vec::new();

        for indices in self.shuffled_class_indices(seed) {
            if indices.is_empty() {
                continue;
            }
            // Keep at least one row of every class on the training side
            let n_test = ((indices.len() as f64 * test_size).round() as usize)
                .min(indices.len() - 1);
            test_idx.extend_from_slice(&indices[..n_test]);
            train_idx.extend_from_slice(&indices[n_test..]);
        }

        if train_idx.is_empty() || test_idx.is_empty() {
            return Err(AppError::Training(format!(
                "Dataset of {} rows is too small for a {} test split",
                self.n_samples, test_size
            )));
        }

        train_idx.sort_unstable();
        test_idx.sort_unstable();

        Ok((self.subset(&train_idx), self.subset(&test_idx)))
    }

    /// Assign every row to one of `k` folds, dealing each class round-robin
    pub fn stratified_folds(&self, k: usize, seed: u64) -> Result<Vec<Vec<usize>>> {
        if k < 2 {
            return Err(AppError::Training(format!(
                "Cross-validation needs at least 2 folds, got {}",
                k
            )));
        }
        if self.n_samples < k {
            return Err(AppError::Training(format!(
                "Cannot split {} rows into {} folds",
                self.n_samples, k
            )));
        }

        let mut folds = vec![Vec::new(); k];
        let mut next = 0;
        for indices in self.shuffled_class_indices(seed) {
            for i in indices {
                folds[next % k].push(i);
                next += 1;
            }
        }
        for fold in &mut folds {
            fold.sort_unstable();
        }

        Ok(folds)
    }
}

/// Model evaluation metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Accuracy
    pub accuracy: f64,

    /// Macro-averaged precision
    pub precision: f64,

    /// Macro-averaged recall
    pub recall: f64,

    /// Macro-averaged F1 score
    pub f1_score: f64,

    /// Rows are true classes, columns predicted classes
    pub confusion_matrix: Vec<Vec<usize>>,

    /// Per-class metrics keyed by tier name
    pub per_class_metrics: BTreeMap<String, ClassMetrics>,
}

/// Per-class evaluation metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

impl ModelMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare predicted class indices against the truth
    pub fn evaluate(y_true: &[usize], y_pred: &[usize]) -> Self {
        let n_samples = y_true.len();
        if n_samples == 0 {
            return Self::new();
        }

        let n_classes = RiskTier::COUNT;
        let mut confusion = vec![vec![0usize; n_classes]; n_classes];
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            if t < n_classes && p < n_classes {
                confusion[t][p] += 1;
            }
        }

        let correct: usize = (0..n_classes).map(|c| confusion[c][c]).sum();
        let accuracy = correct as f64 / n_samples as f64;

        let mut per_class = BTreeMap::new();
        for tier in RiskTier::ALL {
            let c = tier.index();
            let tp = confusion[c][c];
            let fp: usize = (0..n_classes).filter(|&t| t != c).map(|t| confusion[t][c]).sum();
            let fn_count: usize = (0..n_classes).filter(|&p| p != c).map(|p| confusion[c][p]).sum();

            let precision = if tp + fp > 0 {
                tp as f64 / (tp + fp) as f64
            } else {
                0.0
            };

            let recall = if tp + fn_count > 0 {
                tp as f64 / (tp + fn_count) as f64
            } else {
                0.0
            };

            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            per_class.insert(
                tier.as_str().to_string(),
                ClassMetrics {
                    precision,
                    recall,
                    f1_score: f1,
                    support: tp + fn_count,
                },
            );
        }

        let avg = |f: fn(&ClassMetrics) -> f64| {
            per_class.values().map(f).sum::<f64>() / n_classes as f64
        };

        ModelMetrics {
            accuracy,
            precision: avg(|m: &ClassMetrics| m.precision),
            recall: avg(|m: &ClassMetrics| m.recall),
            f1_score: avg(|m: &ClassMetrics| m.f1_score),
            confusion_matrix: confusion,
            per_class_metrics: per_class,
        }
    }
}

/// k-fold cross-validation accuracy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    pub folds: usize,
    pub scores: Vec<f64>,
    pub mean: f64,
    /// Population standard deviation of `scores`
    pub std: f64,
}

impl CrossValidation {
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n = scores.len().max(1) as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

        Self {
            folds: scores.len(),
            scores,
            mean,
            std: variance.sqrt(),
        }
    }
}

/// Drop in test accuracy when one feature column is shuffled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Model metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name
    pub name: String,

    /// Model version
    pub version: String,

    /// Model type
    pub model_type: ModelType,

    /// Training timestamp
    pub trained_at: chrono::DateTime<chrono::Utc>,

    /// Number of training samples
    pub n_training_samples: usize,

    /// Number of features
    pub n_features: usize,

    /// Feature column order
    pub feature_names: Vec<String>,

    /// Training metrics
    pub training_metrics: ModelMetrics,

    /// Held-out test metrics
    pub validation_metrics: Option<ModelMetrics>,

    /// Cross-validation on the training split
    pub cross_validation: Option<CrossValidation>,

    /// Permutation importances on the test split, most important first
    pub feature_importances: Vec<FeatureImportance>,

    /// Hyperparameters
    pub hyperparameters: BTreeMap<String, String>,
}

impl ModelMetadata {
    pub fn new(name: &str, model_type: ModelType) -> Self {
        Self {
            name: name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            model_type,
            trained_at: chrono::Utc::now(),
            n_training_samples: 0,
            n_features: N_FEATURES,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            training_metrics: ModelMetrics::new(),
            validation_metrics: None,
            cross_validation: None,
            feature_importances: Vec::new(),
            hyperparameters: BTreeMap::new(),
        }
    }
}

/// Model type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Bagged decision trees with vote-fraction probabilities
    RandomForest,
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelType::RandomForest => write!(f, "Random Forest"),
        }
    }
}
