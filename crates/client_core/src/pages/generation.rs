//! Spreadsheet generation: dataset generation, quick performance test, download.

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use async_trait::async_trait;
use shared::{
    error::{FailureKind, OperationError, ValidationError},
    protocol::{ApiOutcome, GenerateRequest, GenerationReport, PerformanceReport},
};
use url::Url;

use crate::{
    artifacts::{largest_artifact, ArtifactRequest, SavedArtifact},
    controller::{ControllerError, Operation, OperationController, OperationState, Phase},
    validation::validate_record_count,
    ProgressHandle, StudentApi, TransportError,
};

use super::PageContext;

pub const QUICK_AMOUNTS: [i64; 5] = [100, 500, 1000, 5000, 10000];
pub const DEFAULT_RECORD_COUNT: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationInput {
    Records(i64),
    QuickPerformanceTest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Generated(GenerationReport),
    PerformanceTest(PerformanceReport),
}

struct GenerateOperation {
    api: Arc<dyn StudentApi>,
}

#[async_trait]
impl Operation<GenerationInput, GenerationOutcome> for GenerateOperation {
    fn name(&self) -> &'static str {
        "generate_dataset"
    }

    fn input_label(&self) -> &'static str {
        "number of records"
    }

    fn validate(&self, input: &GenerationInput) -> Result<(), ValidationError> {
        match input {
            GenerationInput::Records(count) => validate_record_count(*count),
            GenerationInput::QuickPerformanceTest => Ok(()),
        }
    }

    async fn dispatch(
        &self,
        input: GenerationInput,
        _progress: ProgressHandle,
    ) -> Result<ApiOutcome<GenerationOutcome>, TransportError> {
        match input {
            GenerationInput::Records(count) => Ok(self
                .api
                .generate_dataset(GenerateRequest {
                    number_of_records: count,
                })
                .await?
                .map(GenerationOutcome::Generated)),
            GenerationInput::QuickPerformanceTest => Ok(self
                .api
                .quick_performance_test()
                .await?
                .map(GenerationOutcome::PerformanceTest)),
        }
    }

    fn success_notice(&self, result: &GenerationOutcome) -> Option<String> {
        Some(match result {
            GenerationOutcome::Generated(_) => "Data generated successfully!".to_string(),
            GenerationOutcome::PerformanceTest(_) => {
                "Quick performance test completed!".to_string()
            }
        })
    }

    fn failure_notice(&self, error: &OperationError) -> String {
        match error.kind {
            FailureKind::ServerReported => format!("Error generating data: {}", error.message),
            FailureKind::Transport | FailureKind::Local => error.message.clone(),
        }
    }
}

pub struct GenerationPage {
    ctx: PageContext,
    record_count: AtomicI64,
    generation: OperationController<GenerationInput, GenerationOutcome>,
    download: OperationController<ArtifactRequest, SavedArtifact>,
}

impl GenerationPage {
    pub fn new(ctx: PageContext) -> Self {
        let generation = ctx.controller(Arc::new(GenerateOperation {
            api: Arc::clone(&ctx.api),
        }));
        let download = ctx.download_controller();
        Self {
            ctx,
            record_count: AtomicI64::new(DEFAULT_RECORD_COUNT),
            generation,
            download,
        }
    }

    /// Stores the record count for the next `generate`. Out-of-range counts keep the old one.
    pub fn select_amount(&self, count: i64) -> Result<(), ControllerError> {
        if let Err(err) = validate_record_count(count) {
            self.ctx.error(err.to_string());
            return Err(ControllerError::Invalid(err));
        }
        self.record_count.store(count, Ordering::Relaxed);
        Ok(())
    }

    pub fn record_count(&self) -> i64 {
        self.record_count.load(Ordering::Relaxed)
    }

    pub async fn generate(&self) -> Result<Phase, ControllerError> {
        self.generation
            .submit_with(GenerationInput::Records(self.record_count()))
            .await
    }

    pub async fn generate_records(&self, count: i64) -> Result<Phase, ControllerError> {
        self.select_amount(count)?;
        self.generate().await
    }

    pub async fn run_quick_performance_test(&self) -> Result<Phase, ControllerError> {
        self.generation
            .submit_with(GenerationInput::QuickPerformanceTest)
            .await
    }

    pub async fn state(&self) -> OperationState<GenerationInput, GenerationOutcome> {
        self.generation.snapshot().await
    }

    pub async fn download_state(&self) -> OperationState<ArtifactRequest, SavedArtifact> {
        self.download.snapshot().await
    }

    pub async fn reset(&self) -> Result<(), ControllerError> {
        self.generation.reset().await
    }

    /// Artifact the download and share actions refer to, if any.
    pub async fn current_artifact(&self) -> Option<ArtifactRequest> {
        match self.generation.result().await? {
            GenerationOutcome::Generated(report) => {
                report.file_path.map(ArtifactRequest::generated)
            }
            GenerationOutcome::PerformanceTest(report) => {
                let run = largest_artifact(&report.runs)?;
                let path = run.file_path.clone()?;
                let request = ArtifactRequest::generated(path);
                Some(match run.record_count {
                    Some(count) => request.with_label(format!("{count} records")),
                    None => request,
                })
            }
        }
    }

    /// Downloads the current artifact. `Ok(None)` when there is nothing to fetch.
    pub async fn download_current(&self) -> Result<Option<Phase>, ControllerError> {
        match self.current_artifact().await {
            Some(request) => self.download.submit_with(request).await.map(Some),
            None => {
                self.ctx.info(self.nothing_available("download").await);
                Ok(None)
            }
        }
    }

    /// Absolute download link for the current artifact.
    pub async fn share_link(&self) -> Option<Url> {
        let Some(request) = self.current_artifact().await else {
            self.ctx.info(self.nothing_available("share").await);
            return None;
        };
        match self
            .ctx
            .api
            .download_url(request.source, &request.remote_name())
        {
            Ok(url) => Some(url),
            Err(err) => {
                self.ctx.error(format!("Error sharing data: {err}"));
                None
            }
        }
    }

    async fn nothing_available(&self, action: &str) -> String {
        match self.generation.result().await {
            Some(GenerationOutcome::PerformanceTest(_)) => {
                format!("No files available to {action} from performance test.")
            }
            _ => format!("No file path available to {action}."),
        }
    }
}
