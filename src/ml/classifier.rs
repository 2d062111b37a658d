use crate::error::{AppError, Result};
use crate::ml::models::{ModelMetadata, ModelMetrics, ModelType, TrainingDataset};
use crate::models::{FeatureVector, N_FEATURES};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;

/// Trait for classifiers
pub trait Classifier: Send + Sync {
    /// Train the classifier
    fn train(&mut self, dataset: &TrainingDataset) -> Result<ModelMetrics>;

    /// Predict class indices
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>>;

    /// Predict class probabilities, one row per sample
    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>>;

    /// Get model metadata
    fn metadata(&self) -> &ModelMetadata;

    /// Get model type
    fn model_type(&self) -> ModelType;

    /// Check if model is trained
    fn is_trained(&self) -> bool;

    /// Classify feature vectors, pairing each predicted class with its
    /// probability row. The output is not validated here; the risk engine
    /// checks it against the class/probability contract.
    fn classify(&self, rows: &[FeatureVector]) -> Result<Vec<RawPrediction>> {
        let x = features_to_array(rows)?;
        let classes = self.predict(&x)?;
        let proba = self.predict_proba(&x)?;

        if classes.len() != rows.len() || proba.nrows() != rows.len() {
            return Err(AppError::ClassifierContract(format!(
                "Classifier returned {} classes and {} probability rows for {} inputs",
                classes.len(),
                proba.nrows(),
                rows.len()
            )));
        }

        Ok(classes
            .into_iter()
            .zip(proba.outer_iter())
            .map(|(class_index, row)| RawPrediction {
                class_index,
                probabilities: row.to_vec(),
            })
            .collect())
    }
}

/// Unvalidated classifier output for one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    pub class_index: usize,
    pub probabilities: Vec<f64>,
}

/// Stack feature vectors into a matrix in the canonical column order
pub fn features_to_array(rows: &[FeatureVector]) -> Result<Array2<f64>> {
    let data: Vec<f64> = rows.iter().flat_map(|r| r.to_row()).collect();
    Array2::from_shape_vec((rows.len(), N_FEATURES), data)
        .map_err(|e| AppError::Internal(format!("Failed to create feature array: {}", e)))
}

pub(crate) fn ndarray_to_densematrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
    let shape = arr.shape();
    let data: Vec<f64> = arr.iter().copied().collect();
    DenseMatrix::new(shape[0], shape[1], data, false)
}

pub(crate) fn labels_to_targets(labels: &[usize]) -> Vec<i32> {
    labels.iter().map(|&x| x as i32).collect()
}
