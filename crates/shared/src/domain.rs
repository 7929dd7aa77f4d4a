use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(StudentId);

/// One student row as returned by the listing and report endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub student_id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub dob: NaiveDate,
    pub class_name: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Excel,
    Csv,
    Pdf,
}

impl ExportFormat {
    /// Segment appended to the export endpoint path.
    pub fn path_segment(self) -> &'static str {
        match self {
            ExportFormat::Excel => "excel",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn file_extension(self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_kind(self) -> FileKind {
        match self {
            ExportFormat::Excel => FileKind::Spreadsheet,
            ExportFormat::Csv => FileKind::DelimitedText,
            ExportFormat::Pdf => FileKind::Pdf,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Excel => "EXCEL",
            ExportFormat::Csv => "CSV",
            ExportFormat::Pdf => "PDF",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "excel" | "xlsx" => Some(ExportFormat::Excel),
            "csv" => Some(ExportFormat::Csv),
            "pdf" => Some(ExportFormat::Pdf),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Coarse content classification of a local or downloaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Spreadsheet,
    DelimitedText,
    Pdf,
    Other,
}

impl FileKind {
    pub fn from_file_name(name: &str) -> Self {
        match file_extension(name).as_deref() {
            Some("xlsx") | Some("xls") => FileKind::Spreadsheet,
            Some("csv") => FileKind::DelimitedText,
            Some("pdf") => FileKind::Pdf,
            _ => FileKind::Other,
        }
    }
}

/// Lowercased extension after the last dot, if any.
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_record_uses_camel_case_wire_names() {
        let record: StudentRecord = serde_json::from_str(
            r#"{"studentId":7,"firstName":"Ann","lastName":"Lee","dob":"2001-04-09","className":"Class1","score":88.5}"#,
        )
        .expect("decode");
        assert_eq!(record.student_id, StudentId(7));
        assert_eq!(record.dob, NaiveDate::from_ymd_opt(2001, 4, 9).expect("date"));
        assert_eq!(record.class_name, "Class1");
    }

    #[test]
    fn file_kind_follows_extension_case_insensitively() {
        assert_eq!(FileKind::from_file_name("grades.XLSX"), FileKind::Spreadsheet);
        assert_eq!(FileKind::from_file_name("old.xls"), FileKind::Spreadsheet);
        assert_eq!(FileKind::from_file_name("rows.csv"), FileKind::DelimitedText);
        assert_eq!(FileKind::from_file_name("report.pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_file_name("notes"), FileKind::Other);
        assert_eq!(FileKind::from_file_name(".csv"), FileKind::Other);
    }

    #[test]
    fn export_format_parses_aliases() {
        assert_eq!(ExportFormat::parse("Excel"), Some(ExportFormat::Excel));
        assert_eq!(ExportFormat::parse("xlsx"), Some(ExportFormat::Excel));
        assert_eq!(ExportFormat::parse(" pdf "), Some(ExportFormat::Pdf));
        assert_eq!(ExportFormat::parse("docx"), None);
    }
}
