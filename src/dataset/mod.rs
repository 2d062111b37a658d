/// Historical patient dataset
///
/// Loads the raw CSV export, parses its free-text cells and imputes
/// missing values so every row becomes a complete [`crate::models::FeatureVector`].

pub mod cleaning;
pub mod loader;
pub mod record;

pub use cleaning::{median, CleanedDataset, CleaningReport, DatasetCleaner};
pub use loader::DatasetLoader;
pub use record::RawPatientRecord;

use crate::error::Result;
use std::path::Path;

/// Load and clean a dataset file in one step
pub fn load_clean<P: AsRef<Path>>(path: P) -> Result<CleanedDataset> {
    let records = DatasetLoader::from_path(path)?;
    DatasetCleaner::new().clean(&records)
}
