//! Point-based risk rule used to manufacture training labels.
//!
//! Five independent signals each contribute a fixed number of points:
//! HbA1c (0-40), RBS (0-20), BMI (0-15), blood pressure (0-15) and age
//! (0-10). The total is bucketed into Low (< 34), Medium (34-66) and
//! High (>= 67). Only the training pipeline calls this; serving uses
//! [`crate::risk::categorization`] against the calibrated score instead.

use crate::models::FeatureVector;
use crate::risk::types::RiskTier;
use serde::{Deserialize, Serialize};

/// Lowest point total labeled Medium
pub const MEDIUM_MIN_POINTS: u32 = 34;

/// Lowest point total labeled High
pub const HIGH_MIN_POINTS: u32 = 67;

pub fn hba1c_points(hba1c: f64) -> u32 {
    if hba1c >= 6.5 {
        40
    } else if hba1c >= 5.7 {
        20
    } else {
        0
    }
}

pub fn rbs_points(rbs: f64) -> u32 {
    if rbs >= 200.0 {
        20
    } else if rbs >= 140.0 {
        10
    } else {
        0
    }
}

pub fn bmi_points(bmi: f64) -> u32 {
    if bmi >= 30.0 {
        15
    } else if bmi >= 25.0 {
        8
    } else {
        0
    }
}

/// Stage 2 hypertension on either reading scores 15, elevated scores 8
pub fn bp_points(systolic: f64, diastolic: f64) -> u32 {
    if systolic >= 140.0 || diastolic >= 90.0 {
        15
    } else if systolic >= 130.0 || diastolic >= 85.0 {
        8
    } else {
        0
    }
}

pub fn age_points(age: i32) -> u32 {
    if age >= 65 {
        10
    } else if age >= 45 {
        5
    } else {
        0
    }
}

/// Per-signal contributions for one patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointBreakdown {
    pub hba1c: u32,
    pub rbs: u32,
    pub bmi: u32,
    pub blood_pressure: u32,
    pub age: u32,
}

impl PointBreakdown {
    pub fn from_features(features: &FeatureVector) -> Self {
        Self {
            hba1c: hba1c_points(features.hba1c),
            rbs: rbs_points(features.rbs),
            bmi: bmi_points(features.bmi),
            blood_pressure: bp_points(features.bp_systolic, features.bp_diastolic),
            age: age_points(features.age),
        }
    }

    pub fn total(&self) -> u32 {
        self.hba1c + self.rbs + self.bmi + self.blood_pressure + self.age
    }

    pub fn tier(&self) -> RiskTier {
        tier_for_points(self.total())
    }
}

/// Sum of all five signal contributions, in [0, 100]
pub fn total_points(features: &FeatureVector) -> u32 {
    PointBreakdown::from_features(features).total()
}

/// Bucket a point total into a tier
pub fn tier_for_points(points: u32) -> RiskTier {
    if points < MEDIUM_MIN_POINTS {
        RiskTier::Low
    } else if points < HIGH_MIN_POINTS {
        RiskTier::Medium
    } else {
        RiskTier::High
    }
}

/// Training label for a cleaned record
pub fn label(features: &FeatureVector) -> RiskTier {
    tier_for_points(total_points(features))
}
