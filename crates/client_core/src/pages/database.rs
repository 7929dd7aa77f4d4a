//! CSV upload into the backing store and the student listing.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    domain::StudentRecord,
    error::{FailureKind, OperationError, ValidationError},
    protocol::{ApiOutcome, RecordCount, StudentListing, UploadReport},
};
use tokio::sync::RwLock;
use tracing::warn;

use crate::{
    controller::{ControllerError, Operation, OperationController, OperationState, Phase},
    files::SelectedFile,
    paging::ListingView,
    records::{unique_classes, RecordFilter, RecordStats},
    validation::{validate_extension, CSV_EXPECTATION, CSV_EXTENSIONS},
    ProgressHandle, StudentApi, TransportError,
};

use super::PageContext;

fn prefixed_failure(prefix: &str, error: &OperationError) -> String {
    match error.kind {
        FailureKind::ServerReported => format!("{prefix}: {}", error.message),
        FailureKind::Transport | FailureKind::Local => error.message.clone(),
    }
}

struct UploadOperation {
    api: Arc<dyn StudentApi>,
}

#[async_trait]
impl Operation<SelectedFile, UploadReport> for UploadOperation {
    fn name(&self) -> &'static str {
        "upload_csv"
    }

    fn input_label(&self) -> &'static str {
        "file"
    }

    fn validate(&self, input: &SelectedFile) -> Result<(), ValidationError> {
        validate_extension(&input.name, CSV_EXTENSIONS, CSV_EXPECTATION)
    }

    async fn dispatch(
        &self,
        input: SelectedFile,
        progress: ProgressHandle,
    ) -> Result<ApiOutcome<UploadReport>, TransportError> {
        self.api.upload_csv(&input, progress).await
    }

    fn success_notice(&self, _result: &UploadReport) -> Option<String> {
        Some("File uploaded successfully!".to_string())
    }

    fn failure_notice(&self, error: &OperationError) -> String {
        prefixed_failure("Error uploading file", error)
    }
}

struct CountOperation {
    api: Arc<dyn StudentApi>,
}

#[async_trait]
impl Operation<(), RecordCount> for CountOperation {
    fn name(&self) -> &'static str {
        "record_count"
    }

    fn input_label(&self) -> &'static str {
        "request"
    }

    fn validate(&self, _input: &()) -> Result<(), ValidationError> {
        Ok(())
    }

    async fn dispatch(
        &self,
        _input: (),
        _progress: ProgressHandle,
    ) -> Result<ApiOutcome<RecordCount>, TransportError> {
        self.api.record_count().await
    }

    fn success_notice(&self, _result: &RecordCount) -> Option<String> {
        None
    }

    fn failure_notice(&self, error: &OperationError) -> String {
        prefixed_failure("Error loading database stats", error)
    }
}

struct ListOperation {
    api: Arc<dyn StudentApi>,
}

#[async_trait]
impl Operation<(), StudentListing> for ListOperation {
    fn name(&self) -> &'static str {
        "list_students"
    }

    fn input_label(&self) -> &'static str {
        "request"
    }

    fn validate(&self, _input: &()) -> Result<(), ValidationError> {
        Ok(())
    }

    async fn dispatch(
        &self,
        _input: (),
        _progress: ProgressHandle,
    ) -> Result<ApiOutcome<StudentListing>, TransportError> {
        self.api.list_students().await
    }

    fn success_notice(&self, _result: &StudentListing) -> Option<String> {
        None
    }

    fn failure_notice(&self, error: &OperationError) -> String {
        prefixed_failure("Error loading student data", error)
    }
}

#[derive(Default)]
struct ListingState {
    students: Vec<StudentRecord>,
    filter: RecordFilter,
    filtered: Vec<StudentRecord>,
    classes: Vec<String>,
    total_students: u64,
    last_updated: Option<DateTime<Utc>>,
}

impl ListingState {
    fn refilter(&mut self) {
        self.filtered = self.filter.apply(&self.students);
    }
}

pub struct DatabasePage {
    upload: OperationController<SelectedFile, UploadReport>,
    count: OperationController<(), RecordCount>,
    listing: OperationController<(), StudentListing>,
    view: RwLock<ListingState>,
}

impl DatabasePage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            upload: ctx.controller(Arc::new(UploadOperation {
                api: Arc::clone(&ctx.api),
            })),
            count: ctx.controller(Arc::new(CountOperation {
                api: Arc::clone(&ctx.api),
            })),
            listing: ctx.controller(Arc::new(ListOperation {
                api: Arc::clone(&ctx.api),
            })),
            view: RwLock::new(ListingState::default()),
        }
    }

    pub async fn select_file(&self, file: SelectedFile) -> Result<(), ControllerError> {
        self.upload.select(file).await
    }

    pub async fn remove_file(&self) -> Result<(), ControllerError> {
        self.upload.remove_selection().await
    }

    /// Uploads the selected CSV; on success the count and listing are refreshed.
    pub async fn upload(&self) -> Result<Phase, ControllerError> {
        let phase = self.upload.submit().await?;
        if phase == Phase::Succeeded {
            if let Err(err) = self.refresh_count().await {
                warn!(error = %err, "record count refresh skipped after upload");
            }
            if let Err(err) = self.load_students().await {
                warn!(error = %err, "student listing refresh skipped after upload");
            }
        }
        Ok(phase)
    }

    pub async fn upload_state(&self) -> OperationState<SelectedFile, UploadReport> {
        self.upload.snapshot().await
    }

    pub async fn uploaded_records(&self) -> u64 {
        self.upload
            .result()
            .await
            .and_then(|report| report.records_uploaded)
            .unwrap_or(0)
    }

    /// Clears the upload result and the selected file.
    pub async fn clear_results(&self) -> Result<(), ControllerError> {
        self.upload.reset().await
    }

    pub async fn refresh_count(&self) -> Result<Phase, ControllerError> {
        let phase = self.count.submit_with(()).await?;
        if let Some(count) = self.count.result().await {
            self.view.write().await.total_students = count.total_count;
        }
        Ok(phase)
    }

    pub async fn total_students(&self) -> u64 {
        self.view.read().await.total_students
    }

    pub async fn load_students(&self) -> Result<Phase, ControllerError> {
        let phase = self.listing.submit_with(()).await?;
        if let Some(listing) = self.listing.result().await {
            let mut view = self.view.write().await;
            view.classes = unique_classes(&listing.students);
            view.students = listing.students;
            view.refilter();
            view.last_updated = Some(Utc::now());
        }
        Ok(phase)
    }

    pub async fn set_filter(&self, filter: RecordFilter) {
        let mut view = self.view.write().await;
        view.filter = filter;
        view.refilter();
    }

    pub async fn students(&self) -> Vec<StudentRecord> {
        self.view.read().await.students.clone()
    }

    pub async fn filtered_students(&self) -> Vec<StudentRecord> {
        self.view.read().await.filtered.clone()
    }

    pub async fn unique_classes(&self) -> Vec<String> {
        self.view.read().await.classes.clone()
    }

    pub async fn stats(&self) -> RecordStats {
        RecordStats::from_records(&self.view.read().await.students)
    }

    pub async fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.view.read().await.last_updated
    }

    /// Rendering state of the filtered listing.
    pub async fn listing_view(&self) -> ListingView {
        let state = self.listing.snapshot().await;
        let rows = self.view.read().await.filtered.len();
        ListingView::from_phase(
            state.phase,
            rows,
            state.error.as_ref().map(|err| err.message.as_str()),
        )
    }
}
