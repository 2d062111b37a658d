use crate::dataset::record::{encode_sex, parse_age, parse_blood_pressure, parse_number, RawPatientRecord};
use crate::error::{AppError, Result};
use crate::models::FeatureVector;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// How many values were imputed for each column during cleaning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub total_records: usize,
    pub hba1c_imputed: usize,
    pub age_imputed: usize,
    pub bp_systolic_imputed: usize,
    pub bp_diastolic_imputed: usize,
    pub bmi_imputed: usize,
    /// RBS cells filled from FBS before median imputation
    pub rbs_from_fbs: usize,
    pub rbs_imputed: usize,
}

impl CleaningReport {
    pub fn total_imputed(&self) -> usize {
        self.hba1c_imputed
            + self.age_imputed
            + self.bp_systolic_imputed
            + self.bp_diastolic_imputed
            + self.bmi_imputed
            + self.rbs_imputed
    }
}

/// Output of [`DatasetCleaner::clean`]
#[derive(Debug, Clone)]
pub struct CleanedDataset {
    pub features: Vec<FeatureVector>,
    pub report: CleaningReport,
}

/// Partially parsed record, before imputation
#[derive(Debug, Default)]
struct ParsedRecord {
    hba1c: Option<f64>,
    age: Option<f64>,
    sex_encoded: u8,
    bp_systolic: Option<f64>,
    bp_diastolic: Option<f64>,
    bmi: Option<f64>,
    rbs: Option<f64>,
}

/// Turns raw dataset rows into complete feature vectors.
///
/// Gaps are filled with the median of the values present in the same
/// column; RBS first falls back to the record's own FBS reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetCleaner;

impl DatasetCleaner {
    pub fn new() -> Self {
        Self
    }

    pub fn clean(&self, records: &[RawPatientRecord]) -> Result<CleanedDataset> {
        if records.is_empty() {
            return Err(AppError::Dataset("Dataset contains no records".to_string()));
        }

        let mut report = CleaningReport {
            total_records: records.len(),
            ..Default::default()
        };

        let parsed: Vec<ParsedRecord> = records
            .iter()
            .map(|record| {
                let (bp_systolic, bp_diastolic) = parse_blood_pressure(record.bp.as_deref());
                let mut rbs = parse_number(record.rbs.as_deref());
                if rbs.is_none() {
                    rbs = parse_number(record.fbs.as_deref());
                    if rbs.is_some() {
                        report.rbs_from_fbs += 1;
                    }
                }

                ParsedRecord {
                    hba1c: parse_number(record.hba1c.as_deref()),
                    age: parse_age(record.age.as_deref()),
                    sex_encoded: encode_sex(record.sex.as_deref()),
                    bp_systolic,
                    bp_diastolic,
                    bmi: parse_number(record.bmi.as_deref()),
                    rbs,
                }
            })
            .collect();

        let hba1c = fill_column("HbA1c", parsed.iter().map(|r| r.hba1c))?;
        let age = fill_column("Age", parsed.iter().map(|r| r.age))?;
        let bp_systolic = fill_column("BP systolic", parsed.iter().map(|r| r.bp_systolic))?;
        let bp_diastolic = fill_column("BP diastolic", parsed.iter().map(|r| r.bp_diastolic))?;
        let bmi = fill_column("BMI", parsed.iter().map(|r| r.bmi))?;
        let rbs = fill_column("RBS", parsed.iter().map(|r| r.rbs))?;

        report.hba1c_imputed = hba1c.imputed;
        report.age_imputed = age.imputed;
        report.bp_systolic_imputed = bp_systolic.imputed;
        report.bp_diastolic_imputed = bp_diastolic.imputed;
        report.bmi_imputed = bmi.imputed;
        report.rbs_imputed = rbs.imputed;

        let features = parsed
            .iter()
            .enumerate()
            .map(|(i, record)| FeatureVector {
                hba1c: hba1c.values[i],
                // Imputed before truncation, so a median of 47.5 becomes 47
                age: age.values[i].trunc() as i32,
                sex_encoded: record.sex_encoded,
                bp_systolic: bp_systolic.values[i],
                bp_diastolic: bp_diastolic.values[i],
                bmi: bmi.values[i],
                rbs: rbs.values[i],
            })
            .collect();

        if report.total_imputed() > 0 {
            warn!(
                hba1c = report.hba1c_imputed,
                age = report.age_imputed,
                bp_systolic = report.bp_systolic_imputed,
                bp_diastolic = report.bp_diastolic_imputed,
                bmi = report.bmi_imputed,
                rbs = report.rbs_imputed,
                "Filled missing values with column medians"
            );
        }
        if report.rbs_from_fbs > 0 {
            info!(count = report.rbs_from_fbs, "Filled missing RBS from FBS");
        }
        info!(records = report.total_records, "Dataset cleaned");

        Ok(CleanedDataset { features, report })
    }
}

struct FilledColumn {
    values: Vec<f64>,
    imputed: usize,
}

fn fill_column(name: &str, cells: impl Iterator<Item = Option<f64>>) -> Result<FilledColumn> {
    let cells: Vec<Option<f64>> = cells.collect();
    let present: Vec<f64> = cells.iter().flatten().copied().collect();

    let fill = median(&present).ok_or_else(|| {
        AppError::Dataset(format!("Column '{}' has no usable values", name))
    })?;

    let imputed = cells.len() - present.len();
    let values = cells.into_iter().map(|cell| cell.unwrap_or(fill)).collect();

    Ok(FilledColumn { values, imputed })
}

/// Median of the given values; even counts average the two middle values
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
