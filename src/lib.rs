//! Diabetic risk service
//!
//! Assigns a Low/Medium/High diabetes-complication risk tier and a 0-100
//! priority score to a patient from seven clinical measurements.
//!
//! - [`risk`]: point-based training labels, score calibration and tier cutoffs
//! - [`dataset`]: CSV ingestion and cleaning of historical records
//! - [`ml`]: random forest classifier, training pipeline, prediction service
//! - [`state`]: clinician patient registry
//! - [`api`]: axum HTTP surface

pub mod api;
pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod ml;
pub mod models;
pub mod risk;
pub mod state;

pub use error::{AppError, Result};
