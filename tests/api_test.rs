/// HTTP API integration tests
///
/// Requests go straight through the router with `oneshot`, no socket involved.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use diabetic_risk_service::{
    api::{build_router, AppState},
    ml::{Classifier, ForestConfig, PredictionService, RandomForestClassifier, TrainingDataset},
    models::FeatureVector,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Three well-separated groups scoring 0, 51 and 100 points
fn profile(i: usize) -> FeatureVector {
    let jitter = i as f64 * 0.001;
    match i % 3 {
        0 => FeatureVector {
            hba1c: 5.0 + jitter,
            age: 30,
            sex_encoded: 0,
            bp_systolic: 115.0,
            bp_diastolic: 75.0,
            bmi: 22.0,
            rbs: 100.0,
        },
        1 => FeatureVector {
            hba1c: 6.0 + jitter,
            age: 50,
            sex_encoded: 1,
            bp_systolic: 132.0,
            bp_diastolic: 86.0,
            bmi: 27.0,
            rbs: 150.0,
        },
        _ => FeatureVector {
            hba1c: 7.5 + jitter,
            age: 70,
            sex_encoded: 1,
            bp_systolic: 150.0,
            bp_diastolic: 95.0,
            bmi: 32.0,
            rbs: 250.0,
        },
    }
}

fn trained_service() -> PredictionService {
    let features: Vec<FeatureVector> = (0..60).map(profile).collect();
    let mut forest = RandomForestClassifier::new(ForestConfig {
        n_trees: 10,
        ..Default::default()
    });
    forest
        .train(&TrainingDataset::from_features(&features))
        .unwrap();

    PredictionService::new(Some(Arc::new(forest)), "memory")
}

fn app(service: PredictionService) -> Router {
    build_router(AppState::new(Arc::new(service)).with_max_batch_size(5))
}

fn app_without_model() -> Router {
    app(PredictionService::new(None, "models/missing.bin"))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn high_risk_patient() -> Value {
    json!({
        "age": 70,
        "sex": "Male",
        "hba1c": 7.5,
        "bmi": 32.0,
        "bp_systolic": 150.0,
        "bp_diastolic": 95.0,
        "rbs": 250.0
    })
}

#[tokio::test]
async fn test_root_reports_service() {
    let (status, body) = get(app(trained_service()), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["features_used"], 7);
}

#[tokio::test]
async fn test_health_without_model_is_unhealthy() {
    let (status, body) = get(app_without_model(), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["model_loaded"], false);
    assert_eq!(body["model_path"], "models/missing.bin");
}

#[tokio::test]
async fn test_health_with_model_is_healthy() {
    let (status, body) = get(app(trained_service()), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_type"], "Random Forest");
}

#[tokio::test]
async fn test_predict_without_model_is_unavailable() {
    let (status, body) = post(app_without_model(), "/predict", high_risk_patient()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "MODEL_UNAVAILABLE");
}

#[tokio::test]
async fn test_predict_rejects_out_of_range_age() {
    let mut patient = high_risk_patient();
    patient["age"] = json!(150);
    let (status, body) = post(app(trained_service()), "/predict", patient).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_predict_rejects_unknown_sex() {
    let mut patient = high_risk_patient();
    patient["sex"] = json!("unknown");
    let (status, _) = post(app(trained_service()), "/predict", patient).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_high_risk_patient() {
    let (status, body) = post(app(trained_service()), "/predict", high_risk_patient()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["risk_category"], "high");

    let score = body["risk_score"].as_f64().unwrap();
    assert!((70.0..=100.0).contains(&score));

    let total = body["confidence_low"].as_f64().unwrap()
        + body["confidence_medium"].as_f64().unwrap()
        + body["confidence_high"].as_f64().unwrap();
    assert!((total - 100.0).abs() <= 0.1);
}

#[tokio::test]
async fn test_predict_fills_missing_measurements() {
    let (status, body) = post(
        app(trained_service()),
        "/predict",
        json!({ "age": 30, "sex": "female" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["risk_score"].is_number());
}

#[tokio::test]
async fn test_batch_is_ranked_by_score() {
    let request = json!({
        "patients": [
            { "age": 30, "sex": "female", "hba1c": 5.0, "bmi": 22.0,
              "bp_systolic": 115.0, "bp_diastolic": 75.0, "rbs": 100.0 },
            high_risk_patient(),
            { "age": 50, "sex": "male", "hba1c": 6.0, "bmi": 27.0,
              "bp_systolic": 132.0, "bp_diastolic": 86.0, "rbs": 150.0 }
        ]
    });
    let (status, body) = post(app(trained_service()), "/predict/batch", request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);

    let predictions = body["predictions"].as_array().unwrap();
    let indices: Vec<u64> = predictions
        .iter()
        .map(|p| p["index"].as_u64().unwrap())
        .collect();
    assert_eq!(indices, vec![1, 2, 0]);

    let scores: Vec<f64> = predictions
        .iter()
        .map(|p| p["risk_score"].as_f64().unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_batch_limits() {
    let (status, _) = post(
        app(trained_service()),
        "/predict/batch",
        json!({ "patients": [] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let patients: Vec<Value> = (0..6).map(|_| high_risk_patient()).collect();
    let (status, body) = post(
        app(trained_service()),
        "/predict/batch",
        json!({ "patients": patients }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_model_info() {
    let (status, body) = get(app(trained_service()), "/model").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["n_training_samples"], 60);

    let (status, _) = get(app_without_model(), "/model").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let response = app_without_model()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn registry_entry(clinician: &str, measurements: Value) -> Value {
    let mut entry = measurements;
    entry["clinician_id"] = json!(clinician);
    entry["social_life"] = json!("city");
    entry["cholesterol"] = json!(210.0);
    entry
}

fn low_risk_patient() -> Value {
    json!({ "age": 30, "sex": "female", "hba1c": 5.0, "bmi": 22.0,
            "bp_systolic": 115.0, "bp_diastolic": 75.0, "rbs": 100.0 })
}

fn medium_risk_patient() -> Value {
    json!({ "age": 50, "sex": "male", "hba1c": 6.0, "bmi": 27.0,
            "bp_systolic": 132.0, "bp_diastolic": 86.0, "rbs": 150.0 })
}

#[tokio::test]
async fn test_create_and_get_patient() {
    let app = app(trained_service());

    let (status, created) = post(
        app.clone(),
        "/patients",
        registry_entry("CLN001", high_risk_patient()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["patient_id"], 1);
    assert_eq!(created["risk_category"], "high");
    assert_eq!(created["cholesterol"], 210.0);
    assert!(created["risk_score"].as_f64().unwrap() >= 70.0);

    let (status, fetched) = get(app.clone(), "/patients/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["clinician_id"], "CLN001");
    assert_eq!(fetched["risk_score"], created["risk_score"]);

    let (status, body) = get(app, "/patients/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_create_patient_validation() {
    let mut entry = registry_entry("CLN001", high_risk_patient());
    entry["social_life"] = json!("suburb");
    let (status, _) = post(app(trained_service()), "/patients", entry).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut entry = registry_entry("CLN001", high_risk_patient());
    entry["ldl"] = json!(400.0);
    let (status, _) = post(app(trained_service()), "/patients", entry).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_patient_without_model_is_unavailable() {
    let (status, body) = post(
        app_without_model(),
        "/patients",
        registry_entry("CLN001", high_risk_patient()),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "MODEL_UNAVAILABLE");
}

#[tokio::test]
async fn test_update_patient_recomputes_risk() {
    let app = app(trained_service());
    let (_, created) = post(
        app.clone(),
        "/patients",
        registry_entry("CLN001", low_risk_patient()),
    )
    .await;
    assert_ne!(created["risk_category"], "high");

    let (status, updated) = send(
        app.clone(),
        Method::PUT,
        "/patients/1",
        Some(registry_entry("CLN001", high_risk_patient())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["patient_id"], 1);
    assert_eq!(updated["age"], 70);
    assert_eq!(updated["risk_category"], "high");
    assert_eq!(updated["created_at"], created["created_at"]);

    let (status, _) = send(
        app,
        Method::PUT,
        "/patients/7",
        Some(registry_entry("CLN001", high_risk_patient())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_patient() {
    let app = app(trained_service());
    post(
        app.clone(),
        "/patients",
        registry_entry("CLN001", medium_risk_patient()),
    )
    .await;

    let (status, _) = send(app.clone(), Method::DELETE, "/patients/1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(app.clone(), "/patients/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(app, Method::DELETE, "/patients/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_patients_per_clinician_filtered_and_ranked() {
    let app = app(trained_service());
    // ids 1..=4
    for (clinician, patient) in [
        ("CLN001", medium_risk_patient()),
        ("CLN001", high_risk_patient()),
        ("CLN001", low_risk_patient()),
        ("CLN002", high_risk_patient()),
    ] {
        let (status, _) = post(app.clone(), "/patients", registry_entry(clinician, patient)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let ids = |body: &Value| -> Vec<u64> {
        body["patients"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["patient_id"].as_u64().unwrap())
            .collect()
    };

    let (status, newest) = get(app.clone(), "/patients?clinician_id=CLN001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(newest["count"], 3);
    assert_eq!(ids(&newest), vec![3, 2, 1]);

    let (_, by_risk) = get(app.clone(), "/patients?clinician_id=CLN001&sortBy=risk").await;
    assert_eq!(ids(&by_risk), vec![2, 1, 3]);
    let scores: Vec<f64> = by_risk["patients"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["risk_score"].as_f64().unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));

    let mut listed = 0;
    for level in ["low", "medium", "high"] {
        let uri = format!("/patients?clinician_id=CLN001&riskLevel={}", level);
        let (status, body) = get(app.clone(), &uri).await;
        assert_eq!(status, StatusCode::OK);
        for patient in body["patients"].as_array().unwrap() {
            assert_eq!(patient["risk_category"], level);
        }
        listed += ids(&body).len();
    }
    assert_eq!(listed, 3);

    let (_, high) = get(app.clone(), "/patients?clinician_id=CLN001&riskLevel=HIGH").await;
    assert!(ids(&high).contains(&2));
    assert!(!ids(&high).contains(&3));

    let (_, other) = get(app.clone(), "/patients?clinician_id=CLN002").await;
    assert_eq!(ids(&other), vec![4]);

    let (status, _) = get(app.clone(), "/patients?clinician_id=CLN001&riskLevel=severe").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app, "/patients").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
