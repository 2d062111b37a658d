use crate::error::{AppError, Result};
use crate::models::patient::PatientData;
use crate::risk::{round2, RiskAssessment, RiskTier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};
use validator::{Validate, ValidationError};

/// Where the patient lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SocialLife {
    City,
    Village,
}

fn validate_social_life(social_life: &str) -> std::result::Result<(), ValidationError> {
    SocialLife::from_str(social_life.trim())
        .map(|_| ())
        .map_err(|_| {
            let mut err = ValidationError::new("social_life");
            err.message = Some("Social life must be 'city' or 'village'".into());
            err
        })
}

/// Everything a clinician records about a patient.
///
/// Only the seven measurements in `measurements` feed the classifier; the
/// lipid panel and history are stored alongside for the clinician.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PatientDetails {
    #[serde(flatten)]
    #[validate(nested)]
    pub measurements: PatientData,

    /// Owning clinician
    #[validate(length(min = 1))]
    pub clinician_id: String,

    /// "city" or "village", any case
    #[validate(custom(function = "validate_social_life"))]
    pub social_life: String,

    #[serde(default)]
    #[validate(range(min = 0.0, max = 500.0))]
    pub cholesterol: Option<f64>,

    #[serde(default)]
    #[validate(range(min = 0.0, max = 1000.0))]
    pub triglycerides: Option<f64>,

    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub hdl: Option<f64>,

    #[serde(default)]
    #[validate(range(min = 0.0, max = 300.0))]
    pub ldl: Option<f64>,

    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub vldl: Option<f64>,

    #[serde(default)]
    pub genetic_family_history: Option<bool>,
}

/// A stored patient with the risk computed from its latest measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub patient_id: u64,

    #[serde(flatten)]
    pub details: PatientDetails,

    /// Priority score rounded to 2 decimals
    pub risk_score: f64,

    pub risk_category: RiskTier,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientRecord {
    pub fn new(patient_id: u64, details: PatientDetails, assessment: &RiskAssessment) -> Self {
        let now = Utc::now();
        Self {
            patient_id,
            details,
            risk_score: round2(assessment.priority_score()),
            risk_category: assessment.tier(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the details and re-score, keeping id and creation time
    pub fn update(&mut self, details: PatientDetails, assessment: &RiskAssessment) {
        self.details = details;
        self.risk_score = round2(assessment.priority_score());
        self.risk_category = assessment.tier();
        self.updated_at = Utc::now();
    }

    pub fn clinician_id(&self) -> &str {
        &self.details.clinician_id
    }
}

/// Ordering of a patient listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatientSort {
    /// Highest risk score first
    Risk,
    /// Most recently created first
    #[default]
    Newest,
}

impl PatientSort {
    /// `sortBy=risk` ranks by score; any other value lists newest first
    pub fn from_query(sort_by: Option<&str>) -> Self {
        match sort_by {
            Some(s) if s.eq_ignore_ascii_case("risk") => PatientSort::Risk,
            _ => PatientSort::Newest,
        }
    }
}

/// Which patients to list, and in what order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatientFilter {
    pub clinician_id: String,
    pub risk_category: Option<RiskTier>,
    pub sort: PatientSort,
}

impl PatientFilter {
    pub fn for_clinician(clinician_id: impl Into<String>) -> Self {
        Self {
            clinician_id: clinician_id.into(),
            ..Default::default()
        }
    }

    pub fn with_risk_category(mut self, tier: RiskTier) -> Self {
        self.risk_category = Some(tier);
        self
    }

    pub fn with_sort(mut self, sort: PatientSort) -> Self {
        self.sort = sort;
        self
    }

    /// Parse a `riskLevel` query value
    pub fn parse_risk_level(level: &str) -> Result<RiskTier> {
        RiskTier::from_str(level.trim()).map_err(|_| {
            AppError::Validation(format!(
                "riskLevel must be 'low', 'medium' or 'high', got '{}'",
                level
            ))
        })
    }

    pub fn matches(&self, record: &PatientRecord) -> bool {
        record.clinician_id() == self.clinician_id
            && self
                .risk_category
                .map_or(true, |tier| record.risk_category == tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskAssessmentEngine;
    use serde_json::json;

    fn details(clinician: &str) -> PatientDetails {
        serde_json::from_value(json!({
            "age": 61,
            "sex": "female",
            "hba1c": 7.0,
            "clinician_id": clinician,
            "social_life": "City",
            "ldl": 130.0
        }))
        .unwrap()
    }

    #[test]
    fn test_details_deserialize_flat_body() {
        let details = details("CLN001");

        assert_eq!(details.measurements.age, 61);
        assert_eq!(details.measurements.hba1c, Some(7.0));
        assert_eq!(details.measurements.bmi, None);
        assert_eq!(details.ldl, Some(130.0));
        assert!(details.validate().is_ok());
    }

    #[test]
    fn test_details_validation() {
        let mut bad = details("CLN001");
        bad.social_life = "suburb".to_string();
        assert!(bad.validate().is_err());

        let mut bad = details("");
        bad.social_life = "village".to_string();
        assert!(bad.validate().is_err());

        let mut bad = details("CLN001");
        bad.measurements.age = 130;
        assert!(bad.validate().is_err());

        let mut bad = details("CLN001");
        bad.triglycerides = Some(1200.0);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_record_takes_rounded_score_and_tier() {
        let assessment = RiskAssessmentEngine::new()
            .assess_raw(1, &[0.1, 0.6, 0.3])
            .unwrap();
        let record = PatientRecord::new(7, details("CLN001"), &assessment);

        assert_eq!(record.patient_id, 7);
        assert_eq!(record.risk_score, 58.0);
        assert_eq!(record.risk_category, RiskTier::Medium);

        let body = serde_json::to_value(&record).unwrap();
        assert_eq!(body["clinician_id"], "CLN001");
        assert_eq!(body["age"], 61);
        assert_eq!(body["risk_category"], "medium");
    }

    #[test]
    fn test_sort_from_query() {
        assert_eq!(PatientSort::from_query(Some("risk")), PatientSort::Risk);
        assert_eq!(PatientSort::from_query(Some("date")), PatientSort::Newest);
        assert_eq!(PatientSort::from_query(None), PatientSort::Newest);
    }

    #[test]
    fn test_filter_matches_owner_and_tier() {
        let assessment = RiskAssessmentEngine::new()
            .assess_raw(2, &[0.0, 0.2, 0.8])
            .unwrap();
        let record = PatientRecord::new(1, details("CLN001"), &assessment);

        assert!(PatientFilter::for_clinician("CLN001").matches(&record));
        assert!(!PatientFilter::for_clinician("CLN002").matches(&record));
        assert!(PatientFilter::for_clinician("CLN001")
            .with_risk_category(RiskTier::High)
            .matches(&record));
        assert!(!PatientFilter::for_clinician("CLN001")
            .with_risk_category(RiskTier::Low)
            .matches(&record));
        assert!(PatientFilter::parse_risk_level("HIGH").is_ok());
        assert!(PatientFilter::parse_risk_level("severe").is_err());
    }
}
