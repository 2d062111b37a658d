/// Machine learning for risk classification
///
/// This module provides:
/// - A random forest over smartcore decision trees with vote-fraction probabilities
/// - Labeled datasets with stratified splitting and k-fold assignment
/// - The offline training pipeline (evaluation, cross-validation, permutation importance)
/// - Model artifact persistence
/// - The prediction service that feeds classifier output to the risk engine

pub mod classifier;
pub mod forest;
pub mod models;
pub mod persistence;
pub mod service;
pub mod training;

pub use classifier::{features_to_array, Classifier, RawPrediction};
pub use forest::RandomForestClassifier;
pub use models::{
    ClassMetrics, CrossValidation, FeatureImportance, ForestConfig, ModelMetadata, ModelMetrics,
    ModelType, TrainingDataset, TrainingSample,
};
pub use persistence::{ModelArtifact, ARTIFACT_FORMAT_VERSION};
pub use service::PredictionService;
pub use training::{
    cross_validate, permutation_importance, OverfitStatus, Trainer, TrainingOptions,
    TrainingReport,
};
