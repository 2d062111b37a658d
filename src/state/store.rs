use crate::error::{AppError, Result};
use crate::models::{PatientDetails, PatientFilter, PatientRecord, PatientSort};
use crate::risk::RiskAssessment;
use crate::state::PatientStore;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// In-memory patient registry
#[derive(Clone)]
pub struct InMemoryStore {
    patients: Arc<DashMap<u64, PatientRecord>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            patients: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PatientStore for InMemoryStore {
    async fn create_patient(
        &self,
        details: PatientDetails,
        assessment: &RiskAssessment,
    ) -> Result<PatientRecord> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = PatientRecord::new(id, details, assessment);
        self.patients.insert(id, record.clone());

        tracing::debug!(
            patient_id = id,
            risk_category = %record.risk_category,
            "Patient saved"
        );
        Ok(record)
    }

    async fn get_patient(&self, id: u64) -> Result<Option<PatientRecord>> {
        Ok(self.patients.get(&id).map(|entry| entry.clone()))
    }

    async fn update_patient(
        &self,
        id: u64,
        details: PatientDetails,
        assessment: &RiskAssessment,
    ) -> Result<PatientRecord> {
        match self.patients.get_mut(&id) {
            Some(mut entry) => {
                entry.update(details, assessment);
                tracing::debug!(patient_id = id, "Patient updated");
                Ok(entry.clone())
            }
            None => Err(AppError::NotFound(format!("Patient {} not found", id))),
        }
    }

    async fn delete_patient(&self, id: u64) -> Result<()> {
        if self.patients.remove(&id).is_some() {
            tracing::debug!(patient_id = id, "Patient deleted");
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Patient {} not found", id)))
        }
    }

    async fn list_patients(&self, filter: &PatientFilter) -> Result<Vec<PatientRecord>> {
        let mut patients: Vec<PatientRecord> = self
            .patients
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        // Newest first; the risk sort is stable so equal scores stay newest first
        patients.sort_by(|a, b| b.patient_id.cmp(&a.patient_id));
        if filter.sort == PatientSort::Risk {
            patients.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
        }

        Ok(patients)
    }
}
