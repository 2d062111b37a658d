use crate::dataset::{self, CleaningReport};
use crate::error::{AppError, Result};
use crate::ml::classifier::Classifier;
use crate::ml::forest::RandomForestClassifier;
use crate::ml::models::{
    CrossValidation, FeatureImportance, ForestConfig, ModelMetrics, TrainingDataset,
};
use crate::ml::persistence::ModelArtifact;
use crate::models::{FeatureVector, FEATURE_NAMES};
use crate::risk::RiskTier;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Knobs for one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOptions {
    /// Fraction of rows held out for testing
    pub test_size: f64,

    /// Folds for cross-validation on the training split
    pub cv_folds: usize,

    /// Seed for the split, the folds and permutation importance
    pub seed: u64,

    pub forest: ForestConfig,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            cv_folds: 5,
            seed: 42,
            forest: ForestConfig::default(),
        }
    }
}

/// How far training accuracy runs ahead of test accuracy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverfitStatus {
    GeneralizesWell,
    Acceptable,
    Significant,
}

impl OverfitStatus {
    pub fn from_gap(gap: f64) -> Self {
        if gap < 0.05 {
            OverfitStatus::GeneralizesWell
        } else if gap < 0.10 {
            OverfitStatus::Acceptable
        } else {
            OverfitStatus::Significant
        }
    }
}

impl std::fmt::Display for OverfitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverfitStatus::GeneralizesWell => write!(f, "Model generalizes well"),
            OverfitStatus::Acceptable => write!(f, "Acceptable overfitting"),
            OverfitStatus::Significant => write!(f, "Significant overfitting detected"),
        }
    }
}

/// Everything measured during one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub cleaning: CleaningReport,
    /// Label counts keyed by tier name
    pub class_distribution: BTreeMap<String, usize>,
    pub n_train: usize,
    pub n_test: usize,
    pub train_metrics: ModelMetrics,
    pub test_metrics: ModelMetrics,
    pub cross_validation: Option<CrossValidation>,
    /// Train accuracy minus test accuracy
    pub overfit_gap: f64,
    pub overfit_status: OverfitStatus,
    pub feature_importances: Vec<FeatureImportance>,
    pub artifact_path: Option<String>,
    pub artifact_size_bytes: Option<u64>,
}

/// Offline pipeline: clean, label, split, fit, evaluate, persist
pub struct Trainer {
    options: TrainingOptions,
}

impl Trainer {
    pub fn new(options: TrainingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TrainingOptions {
        &self.options
    }

    /// Train from a CSV file and write the artifact to `output`
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        dataset_path: P,
        output: Q,
    ) -> Result<TrainingReport> {
        let cleaned = dataset::load_clean(dataset_path)?;
        let (forest, mut report) = self.train(&cleaned.features, cleaned.report)?;

        let output = output.as_ref();
        let size = ModelArtifact::new(forest).save(output)?;
        report.artifact_path = Some(output.display().to_string());
        report.artifact_size_bytes = Some(size);

        info!(
            path = %output.display(),
            size_kb = %format!("{:.2}", size as f64 / 1024.0),
            "Training complete"
        );
        Ok(report)
    }

    /// Train on already-cleaned feature vectors
    pub fn train(
        &self,
        features: &[FeatureVector],
        cleaning: CleaningReport,
    ) -> Result<(RandomForestClassifier, TrainingReport)> {
        let dataset = TrainingDataset::from_features(features);
        let counts = dataset.class_counts();
        info!(
            low = counts[RiskTier::Low.index()],
            medium = counts[RiskTier::Medium.index()],
            high = counts[RiskTier::High.index()],
            "Labeled dataset with point rule"
        );

        let (train, test) = dataset.stratified_split(self.options.test_size, self.options.seed)?;
        info!(train = train.n_samples, test = test.n_samples, "Split dataset");

        let mut forest = RandomForestClassifier::new(self.options.forest.clone());
        let train_metrics = forest.train(&train)?;

        let test_pred = forest.predict(&test.features)?;
        let test_metrics = ModelMetrics::evaluate(&test.label_indices(), &test_pred);
        info!(
            train_accuracy = %format!("{:.2}%", train_metrics.accuracy * 100.0),
            test_accuracy = %format!("{:.2}%", test_metrics.accuracy * 100.0),
            "Evaluated random forest"
        );

        let cross_validation = match cross_validate(
            &train,
            &self.options.forest,
            self.options.cv_folds,
            self.options.seed,
        ) {
            Ok(cv) => {
                info!(
                    mean = %format!("{:.2}%", cv.mean * 100.0),
                    std = %format!("{:.2}%", cv.std * 100.0),
                    folds = cv.folds,
                    "Cross-validation complete"
                );
                Some(cv)
            }
            Err(e) => {
                warn!(error = %e, "Skipping cross-validation");
                None
            }
        };

        let overfit_gap = train_metrics.accuracy - test_metrics.accuracy;
        let overfit_status = OverfitStatus::from_gap(overfit_gap);
        info!(
            gap = %format!("{:.2}%", overfit_gap * 100.0),
            status = %overfit_status,
            "Overfitting check"
        );

        let feature_importances = permutation_importance(&forest, &test, self.options.seed)?;

        let metadata = forest.metadata_mut();
        metadata.validation_metrics = Some(test_metrics.clone());
        metadata.cross_validation = cross_validation.clone();
        metadata.feature_importances = feature_importances.clone();

        let class_distribution = RiskTier::ALL
            .iter()
            .map(|tier| (tier.as_str().to_string(), counts[tier.index()]))
            .collect();

        let report = TrainingReport {
            cleaning,
            class_distribution,
            n_train: train.n_samples,
            n_test: test.n_samples,
            train_metrics,
            test_metrics,
            cross_validation,
            overfit_gap,
            overfit_status,
            feature_importances,
            artifact_path: None,
            artifact_size_bytes: None,
        };

        Ok((forest, report))
    }
}

/// Mean and spread of accuracy over `k` stratified folds
pub fn cross_validate(
    dataset: &TrainingDataset,
    config: &ForestConfig,
    k: usize,
    seed: u64,
) -> Result<CrossValidation> {
    let folds = dataset.stratified_folds(k, seed)?;
    let mut scores = Vec::with_capacity(k);

    for (i, held_out) in folds.iter().enumerate() {
        let train_idx: Vec<usize> = folds
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .flat_map(|(_, fold)| fold.iter().copied())
            .collect();

        if held_out.is_empty() || train_idx.is_empty() {
            return Err(AppError::Training(format!("Fold {} is empty", i)));
        }

        let fold_train = dataset.subset(&train_idx);
        let fold_test = dataset.subset(held_out);

        let mut forest = RandomForestClassifier::new(config.clone());
        forest.train(&fold_train)?;
        let predictions = forest.predict(&fold_test.features)?;
        scores.push(ModelMetrics::evaluate(&fold_test.label_indices(), &predictions).accuracy);
    }

    Ok(CrossValidation::from_scores(scores))
}

/// Accuracy lost when each feature column is shuffled, most important first
pub fn permutation_importance(
    model: &dyn Classifier,
    dataset: &TrainingDataset,
    seed: u64,
) -> Result<Vec<FeatureImportance>> {
    let labels = dataset.label_indices();
    let baseline = ModelMetrics::evaluate(&labels, &model.predict(&dataset.features)?).accuracy;

    let mut importances = Vec::with_capacity(FEATURE_NAMES.len());
    for (col, name) in FEATURE_NAMES.iter().enumerate() {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(col as u64));
        let mut column: Vec<f64> = dataset.features.column(col).to_vec();
        column.shuffle(&mut rng);

        let mut permuted = dataset.features.clone();
        for (row, value) in column.into_iter().enumerate() {
            permuted[[row, col]] = value;
        }

        let accuracy = ModelMetrics::evaluate(&labels, &model.predict(&permuted)?).accuracy;
        importances.push(FeatureImportance {
            feature: name.to_string(),
            importance: baseline - accuracy,
        });
    }

    importances.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    Ok(importances)
}
