use crate::error::{AppError, Result};
use crate::ml::classifier::{labels_to_targets, ndarray_to_densematrix, Classifier};
use crate::ml::models::{ForestConfig, ModelMetadata, ModelMetrics, ModelType, TrainingDataset};
use crate::risk::RiskTier;
use ndarray::{Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters, SplitCriterion,
};
use tracing::debug;

type Tree = DecisionTreeClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>;

/// Random forest over smartcore decision trees.
///
/// Each tree is fit on its own bootstrap sample. Class probabilities are
/// the fraction of trees voting for each class, and the predicted class is
/// the most-voted one (ties go to the lower class index).
#[derive(Serialize, Deserialize)]
pub struct RandomForestClassifier {
    /// Model metadata
    metadata: ModelMetadata,

    /// Hyperparameters
    config: ForestConfig,

    /// Fitted trees
    trees: Vec<Tree>,

    /// Number of classes
    n_classes: usize,

    /// Is trained
    trained: bool,
}

impl RandomForestClassifier {
    pub fn new(config: ForestConfig) -> Self {
        let mut metadata = ModelMetadata::new("Diabetic Risk Random Forest", ModelType::RandomForest);
        metadata.hyperparameters = config.to_hyperparameters();

        Self {
            metadata,
            config,
            trees: Vec::new(),
            n_classes: RiskTier::COUNT,
            trained: false,
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mutable access for the trainer to attach evaluation results
    pub fn metadata_mut(&mut self) -> &mut ModelMetadata {
        &mut self.metadata
    }

    fn tree_parameters(config: &ForestConfig) -> DecisionTreeClassifierParameters {
        let params = DecisionTreeClassifierParameters::default()
            .with_criterion(SplitCriterion::Gini)
            .with_min_samples_split(config.min_samples_split)
            .with_min_samples_leaf(config.min_samples_leaf);

        match config.max_depth {
            Some(depth) => params.with_max_depth(depth),
            None => params,
        }
    }

    /// Rows used to fit tree `tree_idx`
    fn sample_indices(config: &ForestConfig, n_samples: usize, tree_idx: usize) -> Vec<usize> {
        if !config.bootstrap {
            return (0..n_samples).collect();
        }

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(tree_idx as u64));
        (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
    }

    fn fit_trees(config: &ForestConfig, dataset: &TrainingDataset) -> Result<Vec<Tree>> {
        let labels = dataset.label_indices();

        (0..config.n_trees)
            .into_par_iter()
            .map(|i| {
                let indices = Self::sample_indices(config, dataset.n_samples, i);
                let x = ndarray_to_densematrix(&dataset.features.select(Axis(0), &indices));
                let sampled: Vec<usize> = indices.iter().map(|&j| labels[j]).collect();
                let y = labels_to_targets(&sampled);

                Tree::fit(&x, &y, Self::tree_parameters(config)).map_err(|e| {
                    AppError::Training(format!("Failed to train decision tree {}: {}", i, e))
                })
            })
            .collect()
    }
}

impl Classifier for RandomForestClassifier {
    fn train(&mut self, dataset: &TrainingDataset) -> Result<ModelMetrics> {
        if dataset.n_samples == 0 {
            return Err(AppError::Training("Training set is empty".to_string()));
        }
        if self.config.n_trees == 0 {
            return Err(AppError::Training(
                "Random forest needs at least one tree".to_string(),
            ));
        }

        debug!(
            n_trees = self.config.n_trees,
            n_samples = dataset.n_samples,
            "Fitting random forest"
        );

        self.trees = Self::fit_trees(&self.config, dataset)?;
        self.trained = true;

        let labels = dataset.label_indices();
        let predictions = self.predict(&dataset.features)?;
        let metrics = ModelMetrics::evaluate(&labels, &predictions);

        self.metadata.n_training_samples = dataset.n_samples;
        self.metadata.n_features = dataset.n_features;
        self.metadata.trained_at = chrono::Utc::now();
        self.metadata.training_metrics = metrics.clone();

        Ok(metrics)
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(features)?;

        Ok(proba
            .outer_iter()
            .map(|row| {
                let mut best = 0;
                for class in 1..row.len() {
                    if row[class] > row[best] {
                        best = class;
                    }
                }
                best
            })
            .collect())
    }

    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.trained || self.trees.is_empty() {
            return Err(AppError::ModelUnavailable("Model not trained".to_string()));
        }

        let n_samples = features.nrows();
        let mut proba = Array2::zeros((n_samples, self.n_classes));
        if n_samples == 0 {
            return Ok(proba);
        }

        let x = ndarray_to_densematrix(features);
        let votes: Vec<Vec<i32>> = self
            .trees
            .par_iter()
            .map(|tree| {
                tree.predict(&x)
                    .map_err(|e| AppError::Internal(format!("Prediction failed: {}", e)))
            })
            .collect::<Result<_>>()?;

        for tree_votes in &votes {
            for (row, &class) in tree_votes.iter().enumerate() {
                let class = usize::try_from(class)
                    .ok()
                    .filter(|&c| c < self.n_classes)
                    .ok_or_else(|| {
                        AppError::ClassifierContract(format!("Tree voted for unknown class {}", class))
                    })?;
                proba[[row, class]] += 1.0;
            }
        }

        let n_trees = self.trees.len() as f64;
        proba.mapv_inplace(|v| v / n_trees);

        Ok(proba)
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn model_type(&self) -> ModelType {
        ModelType::RandomForest
    }

    fn is_trained(&self) -> bool {
        self.trained
    }
}
