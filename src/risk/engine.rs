use crate::risk::calibration::priority_score;
use crate::risk::categorization::categorize;
use crate::risk::error::RiskResult;
use crate::risk::types::{ConfidenceBreakdown, ProbabilityDistribution, RiskAssessment, RiskTier};

/// Turns classifier output into the user-facing assessment: calibrate,
/// then categorize the calibrated score.
///
/// Holds no state; copies are free and it can be shared across any number
/// of request tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAssessmentEngine;

impl RiskAssessmentEngine {
    pub fn new() -> Self {
        Self
    }

    /// Assess a validated distribution.
    ///
    /// The tier comes from the calibrated score, so for `predicted = Low`
    /// with `p_low = 1.0` the score is exactly 40 and the tier is Medium.
    pub fn assess(&self, predicted: RiskTier, probs: &ProbabilityDistribution) -> RiskAssessment {
        let score = priority_score(predicted, probs);
        let tier = categorize(score);

        RiskAssessment::new(score, tier, ConfidenceBreakdown::from_distribution(probs))
    }

    /// Assess raw classifier output, rejecting anything that breaks the
    /// class/probability contract
    pub fn assess_raw(&self, class_index: usize, probs: &[f64]) -> RiskResult<RiskAssessment> {
        let predicted = RiskTier::from_index(class_index)?;
        let probs = ProbabilityDistribution::try_from(probs)?;
        Ok(self.assess(predicted, &probs))
    }
}
