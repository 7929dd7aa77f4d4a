//! Local input checks run before anything is sent.

use shared::{
    domain::{file_extension, StudentId},
    error::ValidationError,
};

pub const MIN_RECORD_COUNT: i64 = 1;
pub const MAX_RECORD_COUNT: i64 = 1_000_000;

pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls"];
pub const SPREADSHEET_EXPECTATION: &str = "an Excel file (.xlsx or .xls)";
pub const CSV_EXTENSIONS: &[&str] = &["csv"];
pub const CSV_EXPECTATION: &str = "a CSV file (.csv)";

pub fn validate_record_count(value: i64) -> Result<(), ValidationError> {
    if (MIN_RECORD_COUNT..=MAX_RECORD_COUNT).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::RecordCountOutOfRange {
            value,
            min: MIN_RECORD_COUNT,
            max: MAX_RECORD_COUNT,
        })
    }
}

pub fn validate_extension(
    file_name: &str,
    allowed: &[&str],
    expected: &'static str,
) -> Result<(), ValidationError> {
    match file_extension(file_name) {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(()),
        _ => Err(ValidationError::UnsupportedFileType {
            file_name: file_name.to_string(),
            expected,
        }),
    }
}

/// Parses the optional student id filter. Blank means "no filter".
pub fn parse_student_id(raw: &str) -> Result<Option<StudentId>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<i64>() {
        Ok(value) if value > 0 => Ok(Some(StudentId(value))),
        _ => Err(ValidationError::InvalidStudentId {
            raw: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_count_bounds_are_inclusive() {
        assert!(validate_record_count(1).is_ok());
        assert!(validate_record_count(1_000_000).is_ok());
        assert_eq!(
            validate_record_count(0),
            Err(ValidationError::RecordCountOutOfRange {
                value: 0,
                min: 1,
                max: 1_000_000
            })
        );
        assert!(validate_record_count(1_000_001).is_err());
        assert!(validate_record_count(-5).is_err());
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(validate_extension("Grades.XLSX", SPREADSHEET_EXTENSIONS, SPREADSHEET_EXPECTATION).is_ok());
        assert!(validate_extension("legacy.xls", SPREADSHEET_EXTENSIONS, SPREADSHEET_EXPECTATION).is_ok());
        let err = validate_extension("rows.csv", SPREADSHEET_EXTENSIONS, SPREADSHEET_EXPECTATION)
            .expect_err("csv is not a spreadsheet");
        assert_eq!(
            err.to_string(),
            "please select an Excel file (.xlsx or .xls); got rows.csv"
        );
        assert!(validate_extension("csv", CSV_EXTENSIONS, CSV_EXPECTATION).is_err());
    }

    #[test]
    fn student_id_filter_accepts_blank_and_positive_numbers() {
        assert_eq!(parse_student_id(""), Ok(None));
        assert_eq!(parse_student_id("   "), Ok(None));
        assert_eq!(parse_student_id(" 42 "), Ok(Some(StudentId(42))));
        assert!(parse_student_id("0").is_err());
        assert!(parse_student_id("-3").is_err());
        assert!(parse_student_id("abc").is_err());
    }
}
