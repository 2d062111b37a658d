/// Risk Assessment Engine
///
/// Everything in this module is a pure function of its inputs:
/// - `labeling`: point rule that produces training labels
/// - `calibration`: predicted class + probabilities -> 0-100 priority score
/// - `categorization`: priority score -> tier
/// - `engine`: calibration and categorization composed for one inference
///
/// The label rule (34/67 point cutoffs) and the categorizer (40/70 score
/// cutoffs) share the tier vocabulary but not their thresholds.

pub mod calibration;
pub mod categorization;
pub mod engine;
pub mod error;
pub mod labeling;
pub mod types;

pub use calibration::{priority_score, priority_score_for_index};
pub use categorization::categorize;
pub use engine::RiskAssessmentEngine;
pub use error::{RiskError, RiskResult};
pub use labeling::{label, total_points, PointBreakdown};
pub use types::{
    round2, ConfidenceBreakdown, ProbabilityDistribution, RiskAssessment, RiskTier,
    PROBABILITY_SUM_TOLERANCE,
};
