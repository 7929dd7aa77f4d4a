//! Server-generated files and how they are fetched and saved locally.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use shared::{
    domain::{ExportFormat, FileKind},
    error::{OperationError, ValidationError},
    protocol::{ApiOutcome, PerformanceRun},
};
use tracing::info;

use crate::{controller::Operation, ProgressHandle, StudentApi, TransportError};

const GENERATED_FALLBACK_NAME: &str = "data.xlsx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactSource {
    Generation,
    Report,
}

impl ArtifactSource {
    pub fn path_segment(self) -> &'static str {
        match self {
            ArtifactSource::Generation => "data-generation",
            ArtifactSource::Report => "reports",
        }
    }
}

/// Last path component, accepting both `/` and `\` separators.
pub fn file_basename(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(path)
}

/// Picks the performance-test artifact with the most records.
///
/// Ordering comes from the size parsed out of each `test_<N>` key, never from
/// the order the server happened to emit them in. Runs without a file are
/// skipped; on equal sizes the later run wins.
pub fn largest_artifact(runs: &[PerformanceRun]) -> Option<&PerformanceRun> {
    runs.iter()
        .filter(|run| run.file_path.is_some())
        .max_by_key(|run| run.record_count)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRequest {
    pub source: ArtifactSource,
    /// Path as reported by the server; only its basename is used.
    pub server_path: String,
    pub format: Option<ExportFormat>,
    /// Extra context for the success notice, e.g. `5000 records`.
    pub label: Option<String>,
}

impl ArtifactRequest {
    pub fn generated(server_path: impl Into<String>) -> Self {
        Self {
            source: ArtifactSource::Generation,
            server_path: server_path.into(),
            format: None,
            label: None,
        }
    }

    pub fn report(server_path: impl Into<String>, format: ExportFormat) -> Self {
        Self {
            source: ArtifactSource::Report,
            server_path: server_path.into(),
            format: Some(format),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Name requested from the download endpoint.
    pub fn remote_name(&self) -> String {
        let base = file_basename(self.server_path.trim());
        if !base.is_empty() {
            return base.to_string();
        }
        match self.format {
            Some(format) => format!("report.{}", format.file_extension()),
            None => GENERATED_FALLBACK_NAME.to_string(),
        }
    }

    /// Name the bytes are saved under; report exports always carry their extension.
    pub fn save_name(&self) -> String {
        let name = self.remote_name();
        match self.format {
            Some(format) => {
                let suffix = format!(".{}", format.file_extension());
                if name.to_ascii_lowercase().ends_with(&suffix) {
                    name
                } else {
                    format!("{name}{suffix}")
                }
            }
            None => name,
        }
    }

    pub fn content_kind(&self) -> FileKind {
        match self.format {
            Some(format) => format.content_kind(),
            None => FileKind::from_file_name(&self.save_name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub kind: FileKind,
    pub label: Option<String>,
}

/// Downloads an artifact and writes it into the download directory.
pub struct DownloadOperation {
    api: Arc<dyn StudentApi>,
    download_dir: PathBuf,
}

impl DownloadOperation {
    pub fn new(api: Arc<dyn StudentApi>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            download_dir: download_dir.into(),
        }
    }
}

#[async_trait]
impl Operation<ArtifactRequest, SavedArtifact> for DownloadOperation {
    fn name(&self) -> &'static str {
        "download_artifact"
    }

    fn input_label(&self) -> &'static str {
        "file path"
    }

    fn validate(&self, input: &ArtifactRequest) -> Result<(), ValidationError> {
        if input.server_path.trim().is_empty() {
            return Err(ValidationError::MissingInput {
                field: self.input_label(),
            });
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        input: ArtifactRequest,
        _progress: ProgressHandle,
    ) -> Result<ApiOutcome<SavedArtifact>, TransportError> {
        let bytes = self
            .api
            .download_artifact(input.source, &input.remote_name())
            .await?;

        let file_name = input.save_name();
        let path = self.download_dir.join(&file_name);
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|source| TransportError::Io {
                path: self.download_dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| TransportError::Io {
                path: path.clone(),
                source,
            })?;
        info!(file = %path.display(), bytes = bytes.len(), "artifact saved");

        Ok(ApiOutcome::Success(SavedArtifact {
            kind: input.content_kind(),
            file_name,
            size_bytes: bytes.len() as u64,
            path,
            label: input.label,
        }))
    }

    fn success_notice(&self, result: &SavedArtifact) -> Option<String> {
        Some(match &result.label {
            Some(label) => format!(
                "File \"{}\" ({label}) downloaded successfully!",
                result.file_name
            ),
            None => format!("File \"{}\" downloaded successfully!", result.file_name),
        })
    }

    fn failure_notice(&self, error: &OperationError) -> String {
        format!("Error downloading file: {}", error.message)
    }
}
