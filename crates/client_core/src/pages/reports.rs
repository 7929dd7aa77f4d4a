//! Server-paginated student reports and their export.

use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{ExportFormat, StudentRecord},
    error::{FailureKind, OperationError, ValidationError},
    protocol::{ApiOutcome, ExportReport, ReportPage, ReportRequest},
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    artifacts::{ArtifactRequest, SavedArtifact},
    controller::{ControllerError, Operation, OperationController, OperationState, Phase},
    paging::{validate_request, ListingView, PagedQuery, ReportFilters},
    ProgressHandle, StudentApi, TransportError,
};

use super::PageContext;

struct FetchOperation {
    api: Arc<dyn StudentApi>,
}

#[async_trait]
impl Operation<ReportRequest, ReportPage> for FetchOperation {
    fn name(&self) -> &'static str {
        "report_page"
    }

    fn input_label(&self) -> &'static str {
        "query"
    }

    fn validate(&self, input: &ReportRequest) -> Result<(), ValidationError> {
        validate_request(input)
    }

    async fn dispatch(
        &self,
        input: ReportRequest,
        _progress: ProgressHandle,
    ) -> Result<ApiOutcome<ReportPage>, TransportError> {
        self.api.report_page(&input).await
    }

    fn success_notice(&self, _result: &ReportPage) -> Option<String> {
        None
    }

    fn failure_notice(&self, error: &OperationError) -> String {
        match error.kind {
            FailureKind::ServerReported => format!("Error loading report: {}", error.message),
            FailureKind::Transport | FailureKind::Local => error.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportInput {
    pub format: ExportFormat,
    pub request: ReportRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub format: ExportFormat,
    pub report: ExportReport,
}

struct ExportOperation {
    api: Arc<dyn StudentApi>,
}

#[async_trait]
impl Operation<ExportInput, ExportOutcome> for ExportOperation {
    fn name(&self) -> &'static str {
        "export_report"
    }

    fn input_label(&self) -> &'static str {
        "export format"
    }

    fn validate(&self, input: &ExportInput) -> Result<(), ValidationError> {
        validate_request(&input.request)
    }

    async fn dispatch(
        &self,
        input: ExportInput,
        _progress: ProgressHandle,
    ) -> Result<ApiOutcome<ExportOutcome>, TransportError> {
        let format = input.format;
        Ok(self
            .api
            .export_report(format, &input.request)
            .await?
            .map(|report| ExportOutcome { format, report }))
    }

    fn success_notice(&self, result: &ExportOutcome) -> Option<String> {
        Some(format!(
            "{} report generated successfully!",
            result.format.label()
        ))
    }

    fn failure_notice(&self, error: &OperationError) -> String {
        match error.kind {
            FailureKind::ServerReported => format!("Error generating report: {}", error.message),
            FailureKind::Transport | FailureKind::Local => error.message.clone(),
        }
    }
}

#[derive(Default)]
struct PageRows {
    students: Vec<StudentRecord>,
    total_elements: u64,
}

pub struct ReportsPage {
    ctx: PageContext,
    query: Mutex<PagedQuery>,
    rows: Mutex<PageRows>,
    fetch: OperationController<ReportRequest, ReportPage>,
    export: OperationController<ExportInput, ExportOutcome>,
    download: OperationController<ArtifactRequest, SavedArtifact>,
}

impl ReportsPage {
    pub fn new(ctx: PageContext) -> Self {
        let fetch = ctx.controller(Arc::new(FetchOperation {
            api: Arc::clone(&ctx.api),
        }));
        let export = ctx.controller(Arc::new(ExportOperation {
            api: Arc::clone(&ctx.api),
        }));
        let download = ctx.download_controller();
        Self {
            ctx,
            query: Mutex::new(PagedQuery::default()),
            rows: Mutex::new(PageRows::default()),
            fetch,
            export,
            download,
        }
    }

    /// Fetches the page described by the current query.
    ///
    /// The returned rows replace the previous page entirely, and the query
    /// adopts whatever page and size the server reports having applied.
    pub async fn load(&self) -> Result<Phase, ControllerError> {
        let request = self.query.lock().await.to_request();
        debug!(page = request.page, size = request.size, "loading report page");
        let phase = self.fetch.submit_with(request).await?;

        let mut rows = self.rows.lock().await;
        match self.fetch.result().await {
            Some(page) if phase == Phase::Succeeded => {
                self.query.lock().await.adopt(&page);
                rows.total_elements = page.total_elements;
                rows.students = page.students;
            }
            _ => *rows = PageRows::default(),
        }
        Ok(phase)
    }

    /// Parses the filter form and resets to the first page without fetching.
    /// Refused while a page fetch is in flight so the query keeps matching the rows.
    pub async fn set_filters(
        &self,
        student_id: &str,
        class_name: &str,
    ) -> Result<(), ControllerError> {
        self.ensure_idle().await?;
        let filters = match ReportFilters::parse(student_id, class_name) {
            Ok(filters) => filters,
            Err(err) => {
                self.ctx
                    .error("Please fix the form errors before applying filters");
                return Err(ControllerError::Invalid(err));
            }
        };
        let mut query = self.query.lock().await;
        query.filters = filters;
        query.page_index = 0;
        Ok(())
    }

    pub async fn apply_filters(
        &self,
        student_id: &str,
        class_name: &str,
    ) -> Result<Phase, ControllerError> {
        self.set_filters(student_id, class_name).await?;
        self.load().await
    }

    pub async fn clear_filters(&self) -> Result<Phase, ControllerError> {
        self.apply_filters("", "").await
    }

    pub async fn change_page(
        &self,
        page_index: u32,
        page_size: u32,
    ) -> Result<Phase, ControllerError> {
        if page_size == 0 {
            return Err(ControllerError::Invalid(ValidationError::InvalidPageSize));
        }
        self.ensure_idle().await?;
        {
            let mut query = self.query.lock().await;
            query.page_index = page_index;
            query.page_size = page_size;
        }
        self.load().await
    }

    async fn ensure_idle(&self) -> Result<(), ControllerError> {
        if self.fetch.phase().await.is_busy() {
            debug!("query change refused while a page is loading");
            return Err(ControllerError::Busy);
        }
        Ok(())
    }

    pub async fn query(&self) -> PagedQuery {
        self.query.lock().await.clone()
    }

    pub async fn rows(&self) -> Vec<StudentRecord> {
        self.rows.lock().await.students.clone()
    }

    pub async fn total_elements(&self) -> u64 {
        self.rows.lock().await.total_elements
    }

    pub async fn page_count(&self) -> u64 {
        let total = self.total_elements().await;
        self.query.lock().await.page_count(total)
    }

    pub async fn view(&self) -> ListingView {
        let state = self.fetch.snapshot().await;
        let rows = self.rows.lock().await.students.len();
        ListingView::from_phase(
            state.phase,
            rows,
            state.error.as_ref().map(|err| err.message.as_str()),
        )
    }

    /// Exports the current query server-side, then downloads the result.
    ///
    /// `Ok(None)` when the export failed or named no file to download.
    pub async fn export(&self, format: ExportFormat) -> Result<Option<Phase>, ControllerError> {
        let request = self.query.lock().await.to_request();
        let phase = self
            .export
            .submit_with(ExportInput { format, request })
            .await?;
        if phase != Phase::Succeeded {
            return Ok(None);
        }

        let file_path = self
            .export
            .result()
            .await
            .and_then(|outcome| outcome.report.file_path);
        match file_path {
            Some(path) => self
                .download
                .submit_with(ArtifactRequest::report(path, format))
                .await
                .map(Some),
            None => {
                self.ctx.info("No file path available to download.");
                Ok(None)
            }
        }
    }

    pub async fn export_state(&self) -> OperationState<ExportInput, ExportOutcome> {
        self.export.snapshot().await
    }

    pub async fn download_state(&self) -> OperationState<ArtifactRequest, SavedArtifact> {
        self.download.snapshot().await
    }
}
