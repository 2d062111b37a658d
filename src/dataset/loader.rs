use crate::dataset::record::RawPatientRecord;
use crate::error::{AppError, Result};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Reads historical patient rows from CSV
pub struct DatasetLoader;

impl DatasetLoader {
    /// Load every row of the CSV file at `path`
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RawPatientRecord>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            AppError::Dataset(format!("Failed to open dataset {}: {}", path.display(), e))
        })?;

        let records = Self::from_reader(file)?;
        info!(path = %path.display(), records = records.len(), "Loaded dataset");
        Ok(records)
    }

    /// Load rows from any reader. The first line must be a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<RawPatientRecord>> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut records = Vec::new();
        for (line, result) in reader.deserialize().enumerate() {
            let record: RawPatientRecord = result.map_err(|e| {
                AppError::Dataset(format!("Failed to parse record {}: {}", line + 1, e))
            })?;
            records.push(record);
        }

        debug!(records = records.len(), "Parsed CSV records");
        Ok(records)
    }
}
