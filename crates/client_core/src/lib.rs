use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use reqwest::{
    multipart::{Form, Part},
    Body, Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::ExportFormat,
    error::OperationError,
    protocol::{
        ApiOutcome, ConversionReport, EnvelopeError, ExportReport, GenerateRequest,
        GenerationReport, PerformanceReport, RecordCount, ReportPage, ReportRequest,
        StudentListing, UploadReport,
    },
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub mod artifacts;
pub mod controller;
pub mod files;
pub mod notifications;
pub mod pages;
pub mod paging;
pub mod records;
pub mod settings;
pub mod validation;

pub use artifacts::{ArtifactRequest, ArtifactSource, SavedArtifact};
pub use controller::{
    ControllerError, Operation, OperationController, OperationState, Phase, ProgressHandle,
};
pub use files::SelectedFile;
pub use notifications::{BroadcastNotifier, Notification, NotificationLevel, NotificationSink};
pub use settings::ClientSettings;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
const MULTIPART_FILE_FIELD: &str = "file";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded with status {status}")]
    Status { status: u16 },
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error("base url {0} cannot carry a path")]
    InvalidBaseUrl(String),
    #[error("invalid base url: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl TransportError {
    /// Maps a dispatch failure onto the terminal error shown to the user.
    pub fn to_operation_error(&self) -> OperationError {
        match self {
            TransportError::Io { .. } => OperationError::local(self.to_string()),
            _ => OperationError::transport(self),
        }
    }
}

/// One method per endpoint of the student REST API.
#[async_trait]
pub trait StudentApi: Send + Sync {
    async fn generate_dataset(
        &self,
        request: GenerateRequest,
    ) -> Result<ApiOutcome<GenerationReport>, TransportError>;
    async fn quick_performance_test(&self)
        -> Result<ApiOutcome<PerformanceReport>, TransportError>;
    async fn download_artifact(
        &self,
        source: ArtifactSource,
        file_name: &str,
    ) -> Result<Vec<u8>, TransportError>;
    async fn convert_spreadsheet(
        &self,
        file: &SelectedFile,
    ) -> Result<ApiOutcome<ConversionReport>, TransportError>;
    async fn upload_csv(
        &self,
        file: &SelectedFile,
        progress: ProgressHandle,
    ) -> Result<ApiOutcome<UploadReport>, TransportError>;
    async fn record_count(&self) -> Result<ApiOutcome<RecordCount>, TransportError>;
    async fn list_students(&self) -> Result<ApiOutcome<StudentListing>, TransportError>;
    async fn report_page(
        &self,
        request: &ReportRequest,
    ) -> Result<ApiOutcome<ReportPage>, TransportError>;
    async fn export_report(
        &self,
        format: ExportFormat,
        request: &ReportRequest,
    ) -> Result<ApiOutcome<ExportReport>, TransportError>;
    fn download_url(&self, source: ArtifactSource, file_name: &str) -> Result<Url, TransportError>;
}

pub struct HttpStudentApi {
    http: Client,
    base_url: Url,
}

impl HttpStudentApi {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidBaseUrl(base_url.to_string()));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, TransportError> {
        Self::with_timeout(&settings.api_base_url, settings.request_timeout())
    }

    fn endpoint<I>(&self, segments: I) -> Result<Url, TransportError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read_envelope<T: DeserializeOwned>(
        response: Response,
    ) -> Result<ApiOutcome<T>, TransportError> {
        let status = response.status();
        let body = response.bytes().await?;
        let decoded = ApiOutcome::<T>::decode(&body);

        if status.is_success() {
            return Ok(decoded?);
        }

        // Non-2xx still counts as a server-reported failure when the body says so.
        match decoded {
            Ok(ApiOutcome::Failure { message }) => Ok(ApiOutcome::Failure { message }),
            _ => {
                warn!(status = status.as_u16(), "api returned error status without failure envelope");
                Err(TransportError::Status {
                    status: status.as_u16(),
                })
            }
        }
    }

    async fn file_bytes(file: &SelectedFile) -> Result<Vec<u8>, TransportError> {
        tokio::fs::read(&file.path)
            .await
            .map_err(|source| TransportError::Io {
                path: file.path.clone(),
                source,
            })
    }

    fn file_part(file: &SelectedFile, part: Part) -> Result<Part, TransportError> {
        let mime = mime_guess::from_path(&file.name).first_or_octet_stream();
        Ok(part
            .file_name(file.name.clone())
            .mime_str(mime.essence_str())?)
    }
}

#[async_trait]
impl StudentApi for HttpStudentApi {
    async fn generate_dataset(
        &self,
        request: GenerateRequest,
    ) -> Result<ApiOutcome<GenerationReport>, TransportError> {
        let url = self.endpoint(["api", "data-generation", "generate-excel"])?;
        debug!(%url, records = request.number_of_records, "requesting dataset generation");
        let response = self.http.post(url).json(&request).send().await?;
        Self::read_envelope(response).await
    }

    async fn quick_performance_test(
        &self,
    ) -> Result<ApiOutcome<PerformanceReport>, TransportError> {
        let url = self.endpoint(["api", "data-generation", "quick-performance-test"])?;
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Self::read_envelope(response).await
    }

    async fn download_artifact(
        &self,
        source: ArtifactSource,
        file_name: &str,
    ) -> Result<Vec<u8>, TransportError> {
        let url = self.download_url(source, file_name)?;
        debug!(%url, "downloading artifact");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn convert_spreadsheet(
        &self,
        file: &SelectedFile,
    ) -> Result<ApiOutcome<ConversionReport>, TransportError> {
        let url = self.endpoint(["api", "data-processing", "excel-to-csv"])?;
        let bytes = Self::file_bytes(file).await?;
        let part = Self::file_part(file, Part::bytes(bytes))?;
        let form = Form::new().part(MULTIPART_FILE_FIELD, part);
        let response = self.http.post(url).multipart(form).send().await?;
        Self::read_envelope(response).await
    }

    async fn upload_csv(
        &self,
        file: &SelectedFile,
        progress: ProgressHandle,
    ) -> Result<ApiOutcome<UploadReport>, TransportError> {
        let url = self.endpoint(["api", "database", "upload-csv"])?;
        let bytes = Bytes::from(Self::file_bytes(file).await?);
        let len = bytes.len();
        let total = len as u64;
        if total == 0 {
            progress.report(0, 0);
        }

        let chunks = (0..len)
            .step_by(UPLOAD_CHUNK_SIZE)
            .map(move |start| bytes.slice(start..(start + UPLOAD_CHUNK_SIZE).min(len)));
        let mut sent = 0u64;
        let body = Body::wrap_stream(stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            progress.report(sent, total);
            Ok::<_, std::io::Error>(chunk)
        }));

        let part = Self::file_part(file, Part::stream_with_length(body, total))?;
        let form = Form::new().part(MULTIPART_FILE_FIELD, part);
        let response = self.http.post(url).multipart(form).send().await?;
        Self::read_envelope(response).await
    }

    async fn record_count(&self) -> Result<ApiOutcome<RecordCount>, TransportError> {
        let url = self.endpoint(["api", "database", "total-count"])?;
        let response = self.http.get(url).send().await?;
        Self::read_envelope(response).await
    }

    async fn list_students(&self) -> Result<ApiOutcome<StudentListing>, TransportError> {
        let url = self.endpoint(["api", "database", "students"])?;
        let response = self.http.get(url).send().await?;
        Self::read_envelope(response).await
    }

    async fn report_page(
        &self,
        request: &ReportRequest,
    ) -> Result<ApiOutcome<ReportPage>, TransportError> {
        let url = self.endpoint(["api", "reports", "students"])?;
        let response = self
            .http
            .get(url)
            .query(&request.query_pairs())
            .send()
            .await?;
        Self::read_envelope(response).await
    }

    async fn export_report(
        &self,
        format: ExportFormat,
        request: &ReportRequest,
    ) -> Result<ApiOutcome<ExportReport>, TransportError> {
        let url = self.endpoint(["api", "reports", "export", format.path_segment()])?;
        let response = self.http.post(url).json(request).send().await?;
        Self::read_envelope(response).await
    }

    fn download_url(&self, source: ArtifactSource, file_name: &str) -> Result<Url, TransportError> {
        self.endpoint(["api", source.path_segment(), "download", file_name])
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
