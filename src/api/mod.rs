pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::ml::PredictionService;
use crate::state::{InMemoryStore, PatientStore};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub predictions: Arc<PredictionService>,
    pub patients: Arc<dyn PatientStore>,
    pub started_at: Instant,
    pub max_batch_size: usize,
    pub request_timeout: Duration,
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn new(predictions: Arc<PredictionService>) -> Self {
        Self {
            predictions,
            patients: Arc::new(InMemoryStore::new()),
            started_at: Instant::now(),
            max_batch_size: 1000,
            request_timeout: Duration::from_secs(30),
            metrics_enabled: true,
        }
    }

    pub fn with_patient_store(mut self, patients: Arc<dyn PatientStore>) -> Self {
        self.patients = patients;
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }
}
