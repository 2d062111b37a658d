pub mod store;

pub use store::*;

use crate::error::Result;
use crate::models::{PatientDetails, PatientFilter, PatientRecord};
use crate::risk::RiskAssessment;
use async_trait::async_trait;

/// Trait for patient registry storage
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// Store a new patient, assigning its id
    async fn create_patient(
        &self,
        details: PatientDetails,
        assessment: &RiskAssessment,
    ) -> Result<PatientRecord>;

    /// Get a patient by id
    async fn get_patient(&self, id: u64) -> Result<Option<PatientRecord>>;

    /// Replace a patient's details and risk; `NotFound` if absent
    async fn update_patient(
        &self,
        id: u64,
        details: PatientDetails,
        assessment: &RiskAssessment,
    ) -> Result<PatientRecord>;

    /// Delete a patient; `NotFound` if absent
    async fn delete_patient(&self, id: u64) -> Result<()>;

    /// List one clinician's patients
    async fn list_patients(&self, filter: &PatientFilter) -> Result<Vec<PatientRecord>>;
}
