use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::metrics::gather_metrics;
use crate::ml::ModelMetadata;
use crate::models::{
    PatientData, PatientDetails, PatientFilter, PatientRecord, PatientSort, N_FEATURES,
};
use crate::risk::{round2, RiskAssessment, RiskTier};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Service information
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        service: "Diabetic Risk Classification Service".to_string(),
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_loaded: state.predictions.is_model_loaded(),
        model_type: state.predictions.model_type().map(|t| t.to_string()),
        features_used: N_FEATURES,
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub service: String,
    pub status: String,
    pub version: String,
    pub model_loaded: bool,
    pub model_type: Option<String>,
    pub features_used: usize,
}

/// Health check endpoint; unhealthy while no model is loaded
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_loaded = state.predictions.is_model_loaded();

    Json(HealthResponse {
        status: if model_loaded { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        model_loaded,
        model_path: state.predictions.model_path().to_string(),
        model_type: state.predictions.model_type().map(|t| t.to_string()),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub model_loaded: bool,
    pub model_path: String,
    pub model_type: Option<String>,
}

/// Assess one patient
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PatientData>,
) -> Result<Json<RiskPrediction>> {
    request.validate()?;

    let assessment = state.predictions.predict(&request).await?;
    Ok(Json(RiskPrediction::from(&assessment)))
}

/// Risk assessment as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub risk_score: f64,
    pub risk_category: RiskTier,
    pub confidence_low: f64,
    pub confidence_medium: f64,
    pub confidence_high: f64,
}

impl From<&RiskAssessment> for RiskPrediction {
    fn from(assessment: &RiskAssessment) -> Self {
        let confidence = assessment.confidence();
        Self {
            risk_score: round2(assessment.priority_score()),
            risk_category: assessment.tier(),
            confidence_low: confidence.low,
            confidence_medium: confidence.medium,
            confidence_high: confidence.high,
        }
    }
}

/// Assess several patients and rank them, highest risk first
pub async fn predict_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchPredictRequest>,
) -> Result<Json<BatchPredictResponse>> {
    if request.patients.is_empty() {
        return Err(AppError::Validation(
            "patients must contain at least one entry".to_string(),
        ));
    }
    if request.patients.len() > state.max_batch_size {
        return Err(AppError::Validation(format!(
            "Batch of {} patients exceeds the limit of {}",
            request.patients.len(),
            state.max_batch_size
        )));
    }
    for (i, patient) in request.patients.iter().enumerate() {
        patient
            .validate()
            .map_err(|e| AppError::Validation(format!("patients[{}]: {}", i, e)))?;
    }

    let assessments = state.predictions.predict_batch(&request.patients).await?;

    let mut predictions: Vec<RankedPrediction> = assessments
        .iter()
        .enumerate()
        .map(|(index, assessment)| RankedPrediction {
            index,
            prediction: RiskPrediction::from(assessment),
        })
        .collect();
    // Stable sort: equal scores keep request order
    predictions.sort_by(|a, b| {
        b.prediction
            .risk_score
            .total_cmp(&a.prediction.risk_score)
    });

    Ok(Json(BatchPredictResponse {
        count: predictions.len(),
        predictions,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchPredictRequest {
    pub patients: Vec<PatientData>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchPredictResponse {
    pub count: usize,
    pub predictions: Vec<RankedPrediction>,
}

/// One batch entry, tagged with its position in the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPrediction {
    pub index: usize,
    #[serde(flatten)]
    pub prediction: RiskPrediction,
}

/// Metadata of the loaded model
pub async fn model_info(State(state): State<AppState>) -> Result<Json<ModelMetadata>> {
    state
        .predictions
        .metadata()
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::ModelUnavailable("No model loaded".to_string()))
}

/// Register a patient, scoring their risk from the submitted measurements
pub async fn create_patient(
    State(state): State<AppState>,
    Json(request): Json<PatientDetails>,
) -> Result<(StatusCode, Json<PatientRecord>)> {
    request.validate()?;

    let assessment = state.predictions.predict(&request.measurements).await?;
    let created = state.patients.create_patient(request, &assessment).await?;

    tracing::info!(
        patient_id = created.patient_id,
        risk_category = %created.risk_category,
        "Patient registered"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// List a clinician's patients
pub async fn list_patients(
    State(state): State<AppState>,
    Query(params): Query<ListPatientsQuery>,
) -> Result<Json<ListPatientsResponse>> {
    let mut filter = PatientFilter::for_clinician(params.clinician_id)
        .with_sort(PatientSort::from_query(params.sort_by.as_deref()));
    if let Some(level) = params.risk_level.as_deref().filter(|l| !l.is_empty()) {
        filter = filter.with_risk_category(PatientFilter::parse_risk_level(level)?);
    }

    let patients = state.patients.list_patients(&filter).await?;

    Ok(Json(ListPatientsResponse {
        count: patients.len(),
        patients,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListPatientsQuery {
    pub clinician_id: String,
    #[serde(rename = "riskLevel")]
    pub risk_level: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListPatientsResponse {
    pub count: usize,
    pub patients: Vec<PatientRecord>,
}

/// Get a patient by id
pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<PatientRecord>> {
    state
        .patients
        .get_patient(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Patient {} not found", id)))
}

/// Replace a patient's details and recompute their risk
pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<PatientDetails>,
) -> Result<Json<PatientRecord>> {
    if state.patients.get_patient(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Patient {} not found", id)));
    }
    request.validate()?;

    let assessment = state.predictions.predict(&request.measurements).await?;
    let updated = state
        .patients
        .update_patient(id, request, &assessment)
        .await?;

    Ok(Json(updated))
}

/// Remove a patient
pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>> {
    state.patients.delete_patient(id).await?;
    Ok(Json(serde_json::json!({
        "message": "Patient deleted successfully",
        "patient_id": id,
    })))
}

/// Prometheus metrics endpoint
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}
