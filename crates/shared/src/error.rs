use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a submitted operation ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The server answered with `success: false`.
    ServerReported,
    /// No interpretable response: connectivity, timeout, bad status or malformed body.
    Transport,
    /// Local file access failed while sending or saving bytes.
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct OperationError {
    pub kind: FailureKind,
    pub message: String,
}

impl OperationError {
    pub fn server_reported(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::ServerReported,
            message: message.into(),
        }
    }

    pub fn transport(description: impl std::fmt::Display) -> Self {
        Self {
            kind: FailureKind::Transport,
            message: format!("Network error: {description}"),
        }
    }

    pub fn local(description: impl std::fmt::Display) -> Self {
        Self {
            kind: FailureKind::Local,
            message: format!("File error: {description}"),
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind == FailureKind::Transport
    }
}

/// Local input problems caught before any request leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingInput { field: &'static str },
    #[error("number of records must be between {min} and {max}, got {value}")]
    RecordCountOutOfRange { value: i64, min: i64, max: i64 },
    #[error("please select {expected}; got {file_name}")]
    UnsupportedFileType {
        file_name: String,
        expected: &'static str,
    },
    #[error("student id must be a positive number, got {raw:?}")]
    InvalidStudentId { raw: String },
    #[error("page size must be greater than zero")]
    InvalidPageSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_prefixed() {
        let err = OperationError::transport("connection refused");
        assert!(err.is_transport());
        assert_eq!(err.message, "Network error: connection refused");
    }

    #[test]
    fn server_failures_keep_message_verbatim() {
        let err = OperationError::server_reported("Excel file is empty");
        assert_eq!(err.kind, FailureKind::ServerReported);
        assert_eq!(err.to_string(), "Excel file is empty");
    }
}
