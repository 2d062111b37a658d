use serde::{Deserialize, Serialize};

/// One row of the historical patient dataset as it appears on disk.
///
/// Every cell is kept as text: ages carry unit suffixes ("45 YEARS"),
/// blood pressure is a composite "systolic/diastolic" string, and any
/// column may be blank. Columns not listed here are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPatientRecord {
    #[serde(rename = "HbA1c", default)]
    pub hba1c: Option<String>,

    #[serde(rename = "Age", default)]
    pub age: Option<String>,

    #[serde(rename = "Sex", default)]
    pub sex: Option<String>,

    #[serde(rename = "BP", default)]
    pub bp: Option<String>,

    #[serde(rename = "BMI", default)]
    pub bmi: Option<String>,

    #[serde(rename = "RBS", default)]
    pub rbs: Option<String>,

    /// Fasting blood sugar, used when RBS is missing
    #[serde(rename = "FBS", default)]
    pub fbs: Option<String>,
}

/// Parse a numeric cell. Blank, non-numeric and non-finite values are missing.
pub fn parse_number(cell: Option<&str>) -> Option<f64> {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parse an age cell, dropping "YEARS"/"YEAR" unit suffixes in any case
pub fn parse_age(cell: Option<&str>) -> Option<f64> {
    let cleaned = cell?
        .to_uppercase()
        .replace("YEARS", "")
        .replace("YEAR", "");
    parse_number(Some(&cleaned))
}

/// Split a "systolic/diastolic" reading. Either half may be missing.
pub fn parse_blood_pressure(cell: Option<&str>) -> (Option<f64>, Option<f64>) {
    match cell {
        Some(raw) => {
            let mut parts = raw.split('/');
            let systolic = parse_number(parts.next());
            let diastolic = parse_number(parts.next());
            (systolic, diastolic)
        }
        None => (None, None),
    }
}

/// Exactly "MALE" = 1; any other spelling, case or blank = 0
pub fn encode_sex(cell: Option<&str>) -> u8 {
    match cell {
        Some("MALE") => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(Some(" 7.2 ")), Some(7.2));
        assert_eq!(parse_number(Some("")), None);
        assert_eq!(parse_number(Some("n/a")), None);
        assert_eq!(parse_number(Some("nan")), None);
        assert_eq!(parse_number(None), None);
    }

    #[test]
    fn test_parse_age_strips_units() {
        assert_eq!(parse_age(Some("45 YEARS")), Some(45.0));
        assert_eq!(parse_age(Some("1 year")), Some(1.0));
        assert_eq!(parse_age(Some("62")), Some(62.0));
        assert_eq!(parse_age(Some("unknown")), None);
    }

    #[test]
    fn test_parse_blood_pressure() {
        assert_eq!(parse_blood_pressure(Some("150/95")), (Some(150.0), Some(95.0)));
        assert_eq!(parse_blood_pressure(Some("150")), (Some(150.0), None));
        assert_eq!(parse_blood_pressure(Some("/85")), (None, Some(85.0)));
        assert_eq!(parse_blood_pressure(None), (None, None));
    }

    #[test]
    fn test_encode_sex() {
        assert_eq!(encode_sex(Some("MALE")), 1);
        assert_eq!(encode_sex(Some("male")), 0);
        assert_eq!(encode_sex(Some("Male")), 0);
        assert_eq!(encode_sex(Some("FEMALE")), 0);
        assert_eq!(encode_sex(None), 0);
    }
}
