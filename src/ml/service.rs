use crate::error::{AppError, Result};
use crate::metrics::{
    MODEL_LOADED, PREDICTIONS_TOTAL, PREDICTION_DURATION_SECONDS, PREDICTION_ERRORS_TOTAL,
    PRIORITY_SCORE,
};
use crate::ml::classifier::Classifier;
use crate::ml::models::{ModelMetadata, ModelType};
use crate::ml::persistence::ModelArtifact;
use crate::models::{FeatureVector, PatientData};
use crate::risk::{RiskAssessment, RiskAssessmentEngine};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Serves risk assessments from a classifier loaded once at startup.
///
/// The classifier handle is immutable and shared; inference runs on the
/// blocking pool and takes no locks.
pub struct PredictionService {
    /// Trained classifier, absent when no artifact could be loaded
    classifier: Option<Arc<dyn Classifier>>,

    /// Calibration and categorization of classifier output
    engine: RiskAssessmentEngine,

    /// Where the artifact was (or would have been) loaded from
    model_path: String,
}

impl PredictionService {
    pub fn new(classifier: Option<Arc<dyn Classifier>>, model_path: impl Into<String>) -> Self {
        MODEL_LOADED.set(if classifier.is_some() { 1.0 } else { 0.0 });

        Self {
            classifier,
            engine: RiskAssessmentEngine::new(),
            model_path: model_path.into(),
        }
    }

    /// Load the artifact at `path`. A missing or unreadable artifact is not
    /// fatal: the service starts without a model and reports itself unhealthy.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let model_path = path.display().to_string();

        let classifier = match ModelArtifact::load(path) {
            Ok(artifact) if artifact.forest.is_trained() => {
                let metadata = artifact.forest.metadata();
                info!(
                    path = %model_path,
                    model_type = %metadata.model_type,
                    trained_at = %metadata.trained_at,
                    n_training_samples = metadata.n_training_samples,
                    "Model loaded"
                );
                Some(Arc::new(artifact.forest) as Arc<dyn Classifier>)
            }
            Ok(_) => {
                warn!(path = %model_path, "Model artifact contains an untrained classifier");
                None
            }
            Err(e) => {
                error!(path = %model_path, error = %e, "Failed to load model");
                warn!("Service will start without a model; predictions will fail");
                None
            }
        };

        Self::new(classifier, model_path)
    }

    pub fn is_model_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.classifier.as_ref().map(|c| c.metadata())
    }

    pub fn model_type(&self) -> Option<ModelType> {
        self.classifier.as_ref().map(|c| c.model_type())
    }

    fn classifier(&self) -> Result<Arc<dyn Classifier>> {
        self.classifier.clone().ok_or_else(|| {
            AppError::ModelUnavailable(format!("No model loaded from {}", self.model_path))
        })
    }

    /// Assess one patient
    pub async fn predict(&self, patient: &PatientData) -> Result<RiskAssessment> {
        let mut assessments = self.predict_batch(std::slice::from_ref(patient)).await?;
        assessments
            .pop()
            .ok_or_else(|| AppError::Internal("Classifier returned no prediction".to_string()))
    }

    /// Assess several patients in one classifier pass; output order matches input
    pub async fn predict_batch(&self, patients: &[PatientData]) -> Result<Vec<RiskAssessment>> {
        let result = self.predict_batch_inner(patients).await;
        if let Err(e) = &result {
            PREDICTION_ERRORS_TOTAL
                .with_label_values(&[e.error_code()])
                .inc();
        }
        result
    }

    async fn predict_batch_inner(&self, patients: &[PatientData]) -> Result<Vec<RiskAssessment>> {
        let classifier = self.classifier()?;
        let rows = patients
            .iter()
            .map(PatientData::to_features)
            .collect::<Result<Vec<FeatureVector>>>()?;

        let start = Instant::now();
        let engine = self.engine;
        let assessments =
            tokio::task::spawn_blocking(move || assess_rows(&*classifier, engine, &rows))
                .await
                .map_err(|e| AppError::Internal(format!("Inference task failed: {}", e)))??;
        PREDICTION_DURATION_SECONDS.observe(start.elapsed().as_secs_f64());

        for assessment in &assessments {
            PREDICTIONS_TOTAL
                .with_label_values(&[assessment.tier().as_str()])
                .inc();
            PRIORITY_SCORE.observe(assessment.priority_score());
        }
        debug!(count = assessments.len(), "Served risk assessments");

        Ok(assessments)
    }
}

/// Classify and assess feature rows synchronously
pub fn assess_rows(
    classifier: &dyn Classifier,
    engine: RiskAssessmentEngine,
    rows: &[FeatureVector],
) -> Result<Vec<RiskAssessment>> {
    classifier
        .classify(rows)?
        .iter()
        .map(|raw| {
            engine
                .assess_raw(raw.class_index, &raw.probabilities)
                .map_err(|e| {
                    error!(
                        class_index = raw.class_index,
                        probabilities = ?raw.probabilities,
                        error = %e,
                        "Classifier output violates contract"
                    );
                    AppError::from(e)
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::models::{ModelMetrics, TrainingDataset};
    use crate::risk::RiskTier;
    use ndarray::Array2;

    /// Returns the same class and probability row for every input
    struct FixedClassifier {
        metadata: ModelMetadata,
        class_index: usize,
        probabilities: Vec<f64>,
    }

    impl FixedClassifier {
        fn new(class_index: usize, probabilities: Vec<f64>) -> Self {
            Self {
                metadata: ModelMetadata::new("fixed", ModelType::RandomForest),
                class_index,
                probabilities,
            }
        }
    }

    impl Classifier for FixedClassifier {
        fn train(&mut self, _dataset: &TrainingDataset) -> Result<ModelMetrics> {
            Ok(ModelMetrics::new())
        }

        fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>> {
            Ok(vec![self.class_index; features.nrows()])
        }

        fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
            let n = features.nrows();
            let width = self.probabilities.len();
            let data = self.probabilities.repeat(n);
            Ok(Array2::from_shape_vec((n, width), data).unwrap())
        }

        fn metadata(&self) -> &ModelMetadata {
            &self.metadata
        }

        fn model_type(&self) -> ModelType {
            ModelType::RandomForest
        }

        fn is_trained(&self) -> bool {
            true
        }
    }

    fn service(class_index: usize, probabilities: Vec<f64>) -> PredictionService {
        PredictionService::new(
            Some(Arc::new(FixedClassifier::new(class_index, probabilities))),
            "memory",
        )
    }

    fn patient() -> PatientData {
        PatientData {
            age: 58,
            sex: "female".to_string(),
            hba1c: Some(6.2),
            bmi: Some(27.0),
            bp_systolic: None,
            bp_diastolic: None,
            rbs: Some(150.0),
        }
    }

    #[tokio::test]
    async fn test_predict_medium() {
        let service = service(1, vec![0.1, 0.6, 0.3]);
        let assessment = service.predict(&patient()).await.unwrap();

        assert!((assessment.priority_score() - 58.0).abs() < 1e-9);
        assert_eq!(assessment.tier(), RiskTier::Medium);
    }

    #[tokio::test]
    async fn test_predict_without_model() {
        let service = PredictionService::new(None, "missing.bin");
        assert!(!service.is_model_loaded());

        let err = service.predict(&patient()).await.unwrap_err();
        assert_eq!(err.error_code(), "MODEL_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_unknown_class_is_contract_violation() {
        let service = service(5, vec![0.2, 0.3, 0.5]);
        let err = service.predict(&patient()).await.unwrap_err();
        assert_eq!(err.error_code(), "CLASSIFIER_CONTRACT_VIOLATION");
    }

    #[tokio::test]
    async fn test_malformed_distribution_is_contract_violation() {
        let service = service(0, vec![0.5, 0.5]);
        let err = service.predict(&patient()).await.unwrap_err();
        assert_eq!(err.error_code(), "CLASSIFIER_CONTRACT_VIOLATION");
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let service = service(2, vec![0.0, 0.2, 0.8]);
        let assessments = service
            .predict_batch(&[patient(), patient(), patient()])
            .await
            .unwrap();

        assert_eq!(assessments.len(), 3);
        assert!(assessments.iter().all(|a| a.tier() == RiskTier::High));
    }

    #[test]
    fn test_load_missing_artifact_starts_without_model() {
        let service = PredictionService::load("/nonexistent/model.bin");
        assert!(!service.is_model_loaded());
        assert_eq!(service.model_path(), "/nonexistent/model.bin");
        assert!(service.metadata().is_none());
    }
}
