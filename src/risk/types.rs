use crate::risk::error::{RiskError, RiskResult};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Allowed deviation of a probability distribution's sum from 1
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-3;

/// Coarse clinical risk category.
///
/// Class indices are fixed by the classifier's label encoding:
/// Low = 0, Medium = 1, High = 2.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// All tiers in class-index order
    pub const ALL: [RiskTier; 3] = [RiskTier::Low, RiskTier::Medium, RiskTier::High];

    /// Number of tiers (classifier classes)
    pub const COUNT: usize = 3;

    /// Class index used in training labels and probability vectors
    pub fn index(&self) -> usize {
        match self {
            RiskTier::Low => 0,
            RiskTier::Medium => 1,
            RiskTier::High => 2,
        }
    }

    /// Inverse of [`RiskTier::index`]
    pub fn from_index(index: usize) -> RiskResult<Self> {
        match index {
            0 => Ok(RiskTier::Low),
            1 => Ok(RiskTier::Medium),
            2 => Ok(RiskTier::High),
            other => Err(RiskError::UnknownClass(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

/// Classifier output over (low, medium, high).
///
/// Only constructed through validation, so every instance has three
/// entries in [0, 1] summing to 1 within [`PROBABILITY_SUM_TOLERANCE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbabilityDistribution {
    low: f64,
    medium: f64,
    high: f64,
}

impl ProbabilityDistribution {
    pub fn new(low: f64, medium: f64, high: f64) -> RiskResult<Self> {
        for (class, value) in [low, medium, high].into_iter().enumerate() {
            if !(0.0..=1.0).contains(&value) {
                return Err(RiskError::OutOfRange { class, value });
            }
        }

        let sum = low + medium + high;
        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(RiskError::BadSum { sum });
        }

        Ok(Self { low, medium, high })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn medium(&self) -> f64 {
        self.medium
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    /// Probability assigned to a tier
    pub fn get(&self, tier: RiskTier) -> f64 {
        match tier {
            RiskTier::Low => self.low,
            RiskTier::Medium => self.medium,
            RiskTier::High => self.high,
        }
    }

    /// Values in class-index order
    pub fn to_array(&self) -> [f64; 3] {
        [self.low, self.medium, self.high]
    }
}

impl TryFrom<&[f64]> for ProbabilityDistribution {
    type Error = RiskError;

    fn try_from(values: &[f64]) -> RiskResult<Self> {
        match values {
            [low, medium, high] => Self::new(*low, *medium, *high),
            _ => Err(RiskError::WrongLength {
                expected: RiskTier::COUNT,
                actual: values.len(),
            }),
        }
    }
}

/// Per-tier classifier confidence as percentages rounded to 2 decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl ConfidenceBreakdown {
    pub fn from_distribution(probs: &ProbabilityDistribution) -> Self {
        Self {
            low: round2(probs.low() * 100.0),
            medium: round2(probs.medium() * 100.0),
            high: round2(probs.high() * 100.0),
        }
    }

    pub fn total(&self) -> f64 {
        self.low + self.medium + self.high
    }
}

/// Result of one inference: calibrated score, its tier, and the confidence
/// breakdown it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskAssessment {
    priority_score: f64,
    tier: RiskTier,
    confidence: ConfidenceBreakdown,
}

impl RiskAssessment {
    pub(crate) fn new(priority_score: f64, tier: RiskTier, confidence: ConfidenceBreakdown) -> Self {
        Self {
            priority_score,
            tier,
            confidence,
        }
    }

    /// Unrounded priority score in [0, 100]
    pub fn priority_score(&self) -> f64 {
        self.priority_score
    }

    pub fn tier(&self) -> RiskTier {
        self.tier
    }

    pub fn confidence(&self) -> &ConfidenceBreakdown {
        &self.confidence
    }
}

/// Round half away from zero to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_index_round_trip() {
        for tier in RiskTier::ALL {
            assert_eq!(RiskTier::from_index(tier.index()).unwrap(), tier);
        }
        assert_eq!(RiskTier::from_index(3), Err(RiskError::UnknownClass(3)));
    }

    #[test]
    fn test_tier_ordering() {
        assert!(RiskTier::Low < RiskTier::Medium);
        assert!(RiskTier::Medium < RiskTier::High);
    }

    #[test]
    fn test_tier_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&RiskTier::Medium).unwrap(), "\"medium\"");
        assert_eq!(RiskTier::High.to_string(), "high");
        assert_eq!("LOW".parse::<RiskTier>().unwrap(), RiskTier::Low);
    }

    #[test]
    fn test_distribution_rejects_wrong_length() {
        let err = ProbabilityDistribution::try_from(&[0.5, 0.5][..]).unwrap_err();
        assert_eq!(
            err,
            RiskError::WrongLength {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_distribution_rejects_out_of_range_and_nan() {
        assert!(matches!(
            ProbabilityDistribution::new(-0.1, 0.6, 0.5),
            Err(RiskError::OutOfRange { class: 0, .. })
        ));
        assert!(matches!(
            ProbabilityDistribution::new(0.2, f64::NAN, 0.8),
            Err(RiskError::OutOfRange { class: 1, .. })
        ));
    }

    #[test]
    fn test_distribution_rejects_bad_sum() {
        assert!(matches!(
            ProbabilityDistribution::new(0.5, 0.5, 0.5),
            Err(RiskError::BadSum { .. })
        ));
        assert!(ProbabilityDistribution::new(0.3333, 0.3333, 0.3334).is_ok());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(58.004), 58.0);
        assert_eq!(round2(33.336), 33.34);
        assert_eq!(round2(100.0), 100.0);
    }
}
