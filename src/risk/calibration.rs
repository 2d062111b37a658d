//! Maps a predicted class and its probability distribution to a 0-100
//! priority score.
//!
//! Each branch's output range matches the categorizer band for the same
//! tier: High lands in [70, 100], Medium in [40, 70], Low in [0, 40].

use crate::risk::error::RiskResult;
use crate::risk::types::{ProbabilityDistribution, RiskTier};

/// Floor of the High band
pub const HIGH_BASE: f64 = 70.0;
/// Floor of the Medium band
pub const MEDIUM_BASE: f64 = 40.0;
/// Width of the High and Medium bands
pub const UPPER_BAND_WIDTH: f64 = 30.0;
/// Width of the Low band
pub const LOW_BAND_WIDTH: f64 = 40.0;

/// Priority score for a predicted tier.
///
/// The formula is chosen by `predicted`, never by comparing probabilities,
/// and only the predicted tier's own probability moves the score inside
/// its band.
pub fn priority_score(predicted: RiskTier, probs: &ProbabilityDistribution) -> f64 {
    match predicted {
        RiskTier::High => HIGH_BASE + probs.high() * UPPER_BAND_WIDTH,
        RiskTier::Medium => MEDIUM_BASE + probs.medium() * UPPER_BAND_WIDTH,
        RiskTier::Low => probs.low() * LOW_BAND_WIDTH,
    }
}

/// Same as [`priority_score`] for a raw classifier class index.
/// Indices outside {0, 1, 2} are rejected.
pub fn priority_score_for_index(
    class_index: usize,
    probs: &ProbabilityDistribution,
) -> RiskResult<f64> {
    let predicted = RiskTier::from_index(class_index)?;
    Ok(priority_score(predicted, probs))
}
