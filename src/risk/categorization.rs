//! Serving-time tier cutoffs on the calibrated priority score.
//! Independent of the training label rule's point cutoffs.

use crate::risk::types::RiskTier;

/// Lowest score categorized as High
pub const HIGH_MIN_SCORE: f64 = 70.0;

/// Lowest score categorized as Medium
pub const MEDIUM_MIN_SCORE: f64 = 40.0;

pub fn categorize(score: f64) -> RiskTier {
    if score >= HIGH_MIN_SCORE {
        RiskTier::High
    } else if score >= MEDIUM_MIN_SCORE {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}
