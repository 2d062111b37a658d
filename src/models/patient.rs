use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};
use validator::{Validate, ValidationError};

/// Number of features the classifier is trained on
pub const N_FEATURES: usize = 7;

/// Column order of the feature matrix. Training and inference both go
/// through [`FeatureVector::to_row`], so this order is the only one in use.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "hba1c",
    "age",
    "sex_encoded",
    "bp_systolic",
    "bp_diastolic",
    "bmi",
    "rbs",
];

/// Population-normal value used when a request omits HbA1c (%)
pub const DEFAULT_HBA1C: f64 = 5.7;
/// Population-normal value used when a request omits BMI
pub const DEFAULT_BMI: f64 = 25.0;
/// Population-normal value used when a request omits systolic BP (mmHg)
pub const DEFAULT_BP_SYSTOLIC: f64 = 120.0;
/// Population-normal value used when a request omits diastolic BP (mmHg)
pub const DEFAULT_BP_DIASTOLIC: f64 = 80.0;
/// Population-normal value used when a request omits random blood sugar (mg/dL)
pub const DEFAULT_RBS: f64 = 120.0;

/// The seven clinical measurements used for labeling and classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Glycated haemoglobin (%)
    pub hba1c: f64,

    /// Age in whole years
    pub age: i32,

    /// Male = 1, female = 0
    pub sex_encoded: u8,

    /// Systolic blood pressure (mmHg)
    pub bp_systolic: f64,

    /// Diastolic blood pressure (mmHg)
    pub bp_diastolic: f64,

    /// Body mass index
    pub bmi: f64,

    /// Random blood sugar (mg/dL)
    pub rbs: f64,
}

impl FeatureVector {
    /// Matrix row in [`FEATURE_NAMES`] order
    pub fn to_row(&self) -> [f64; N_FEATURES] {
        [
            self.hba1c,
            self.age as f64,
            self.sex_encoded as f64,
            self.bp_systolic,
            self.bp_diastolic,
            self.bmi,
            self.rbs,
        ]
    }
}

/// Patient sex as accepted on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Encoding used in the feature matrix
    pub fn encoded(&self) -> u8 {
        match self {
            Sex::Male => 1,
            Sex::Female => 0,
        }
    }
}

/// Prediction request body.
///
/// Age and sex are required; every other measurement is optional and
/// falls back to the population-normal defaults above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PatientData {
    /// Patient age in years
    #[validate(range(min = 0, max = 120))]
    pub age: i32,

    /// "male" or "female", any case
    #[validate(custom(function = "validate_sex"))]
    pub sex: String,

    /// HbA1c percentage
    #[serde(default)]
    #[validate(range(min = 0.0, max = 20.0))]
    pub hba1c: Option<f64>,

    /// Body mass index
    #[serde(default)]
    #[validate(range(min = 10.0, max = 60.0))]
    pub bmi: Option<f64>,

    /// Systolic blood pressure
    #[serde(default)]
    #[validate(range(min = 50.0, max = 250.0))]
    pub bp_systolic: Option<f64>,

    /// Diastolic blood pressure
    #[serde(default)]
    #[validate(range(min = 30.0, max = 150.0))]
    pub bp_diastolic: Option<f64>,

    /// Random blood sugar
    #[serde(default)]
    #[validate(range(min = 0.0, max = 600.0))]
    pub rbs: Option<f64>,
}

fn validate_sex(sex: &str) -> std::result::Result<(), ValidationError> {
    Sex::from_str(sex.trim())
        .map(|_| ())
        .map_err(|_| {
            let mut err = ValidationError::new("sex");
            err.message = Some("Sex must be 'male' or 'female'".into());
            err
        })
}

impl PatientData {
    /// Parse the sex field
    pub fn sex(&self) -> Result<Sex> {
        Sex::from_str(self.sex.trim())
            .map_err(|_| AppError::Validation("Sex must be 'male' or 'female'".to_string()))
    }

    /// Build the classifier input, filling missing measurements with defaults
    pub fn to_features(&self) -> Result<FeatureVector> {
        Ok(FeatureVector {
            hba1c: self.hba1c.unwrap_or(DEFAULT_HBA1C),
            age: self.age,
            sex_encoded: self.sex()?.encoded(),
            bp_systolic: self.bp_systolic.unwrap_or(DEFAULT_BP_SYSTOLIC),
            bp_diastolic: self.bp_diastolic.unwrap_or(DEFAULT_BP_DIASTOLIC),
            bmi: self.bmi.unwrap_or(DEFAULT_BMI),
            rbs: self.rbs.unwrap_or(DEFAULT_RBS),
        })
    }
}
