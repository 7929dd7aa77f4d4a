//! Wire shapes of the student REST API.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{StudentId, StudentRecord};

const PERFORMANCE_RUN_PREFIX: &str = "test_";
const FALLBACK_FAILURE_MESSAGE: &str = "request failed";

#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    Success(T),
    Failure { message: String },
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("response body is not a JSON object")]
    NotAnObject,
    #[error("response body has no boolean success flag")]
    MissingSuccessFlag,
}

impl<T: DeserializeOwned> ApiOutcome<T> {
    pub fn decode(body: &[u8]) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let Value::Object(fields) = &value else {
            return Err(EnvelopeError::NotAnObject);
        };
        let success = fields
            .get("success")
            .and_then(Value::as_bool)
            .ok_or(EnvelopeError::MissingSuccessFlag)?;

        if !success {
            let message = fields
                .get("message")
                .and_then(Value::as_str)
                .filter(|message| !message.trim().is_empty())
                .unwrap_or(FALLBACK_FAILURE_MESSAGE)
                .to_string();
            return Ok(ApiOutcome::Failure { message });
        }

        Ok(ApiOutcome::Success(serde_json::from_value(value)?))
    }
}

impl<T> ApiOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiOutcome<U> {
        match self {
            ApiOutcome::Success(value) => ApiOutcome::Success(f(value)),
            ApiOutcome::Failure { message } => ApiOutcome::Failure { message },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub number_of_records: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub records_generated: Option<u64>,
}

/// One `test_<N>` entry of a quick performance test.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRun {
    pub key: String,
    /// Dataset size parsed from the key suffix.
    pub record_count: Option<u64>,
    pub file_path: Option<String>,
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawPerformanceReport")]
pub struct PerformanceReport {
    pub message: Option<String>,
    pub runs: Vec<PerformanceRun>,
}

#[derive(Deserialize)]
struct RawPerformanceReport {
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl From<RawPerformanceReport> for PerformanceReport {
    fn from(raw: RawPerformanceReport) -> Self {
        let runs = raw
            .rest
            .into_iter()
            .filter_map(|(key, value)| {
                let suffix = key.strip_prefix(PERFORMANCE_RUN_PREFIX)?;
                let record_count = suffix.parse::<u64>().ok();
                let Value::Object(mut details) = value else {
                    return None;
                };
                let file_path = match details.remove("filePath") {
                    Some(Value::String(path)) if !path.is_empty() => Some(path),
                    _ => None,
                };
                Some(PerformanceRun {
                    key,
                    record_count,
                    file_path,
                    details,
                })
            })
            .collect();

        Self {
            message: raw.message,
            runs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReport {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub csv_file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub records_uploaded: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecordCount {
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentListing {
    #[serde(default)]
    pub students: Vec<StudentRecord>,
}

/// Body of an export request; the same fields travel as query params for paged reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub page: u32,
    pub size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<StudentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl ReportRequest {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.to_string()), ("size", self.size.to_string())];
        if let Some(student_id) = self.student_id {
            pairs.push(("studentId", student_id.to_string()));
        }
        if let Some(class_name) = &self.class_name {
            pairs.push(("className", class_name.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportPage {
    #[serde(default)]
    pub students: Vec<StudentRecord>,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub file_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_success_payload() {
        let outcome = ApiOutcome::<GenerationReport>::decode(
            br#"{"success":true,"message":"done","filePath":"out/students.xlsx","recordsGenerated":1000}"#,
        )
        .expect("decode");
        assert_eq!(
            outcome,
            ApiOutcome::Success(GenerationReport {
                message: "done".into(),
                file_path: Some("out/students.xlsx".into()),
                records_generated: Some(1000),
            })
        );
    }

    #[test]
    fn decodes_failure_without_reading_payload_fields() {
        let outcome =
            ApiOutcome::<ReportPage>::decode(br#"{"success":false,"message":"bad page"}"#)
                .expect("decode");
        assert_eq!(
            outcome,
            ApiOutcome::Failure {
                message: "bad page".into()
            }
        );
    }

    #[test]
    fn failure_without_message_gets_fallback() {
        let outcome = ApiOutcome::<RecordCount>::decode(br#"{"success":false}"#).expect("decode");
        assert_eq!(
            outcome,
            ApiOutcome::Failure {
                message: FALLBACK_FAILURE_MESSAGE.into()
            }
        );
    }

    #[test]
    fn rejects_bodies_without_success_flag() {
        let err = ApiOutcome::<RecordCount>::decode(br#"{"totalCount":3}"#).expect_err("must fail");
        assert!(matches!(err, EnvelopeError::MissingSuccessFlag));

        let err = ApiOutcome::<RecordCount>::decode(b"[1,2]").expect_err("must fail");
        assert!(matches!(err, EnvelopeError::NotAnObject));

        let err = ApiOutcome::<RecordCount>::decode(b"<html>").expect_err("must fail");
        assert!(matches!(err, EnvelopeError::Malformed(_)));
    }

    #[test]
    fn performance_report_collects_test_entries() {
        let outcome = ApiOutcome::<PerformanceReport>::decode(
            br#"{
                "success": true,
                "test_100": {"filePath": "a/s_100.xlsx", "durationMs": 12},
                "test_1000": {"filePath": "a\\s_1000.xlsx"},
                "test_500": {"durationMs": 40},
                "summary": {"filePath": "ignored.xlsx"}
            }"#,
        )
        .expect("decode");
        let ApiOutcome::Success(report) = outcome else {
            panic!("expected success");
        };
        assert_eq!(report.runs.len(), 3);
        let run_100 = report
            .runs
            .iter()
            .find(|run| run.key == "test_100")
            .expect("test_100");
        assert_eq!(run_100.record_count, Some(100));
        assert_eq!(run_100.file_path.as_deref(), Some("a/s_100.xlsx"));
        assert_eq!(run_100.details.get("durationMs"), Some(&Value::from(12)));
        let run_500 = report
            .runs
            .iter()
            .find(|run| run.key == "test_500")
            .expect("test_500");
        assert_eq!(run_500.file_path, None);
    }

    #[test]
    fn report_request_omits_absent_filters() {
        let request = ReportRequest {
            page: 1,
            size: 20,
            student_id: None,
            class_name: Some("Class2".into()),
        };
        assert_eq!(
            serde_json::to_value(&request).expect("encode"),
            serde_json::json!({"page": 1, "size": 20, "className": "Class2"})
        );
        assert_eq!(
            request.query_pairs(),
            vec![
                ("page", "1".to_string()),
                ("size", "20".to_string()),
                ("className", "Class2".to_string()),
            ]
        );
    }
}
