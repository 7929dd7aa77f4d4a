//! Spreadsheet to CSV conversion.

use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    error::{FailureKind, OperationError, ValidationError},
    protocol::{ApiOutcome, ConversionReport},
};

use crate::{
    controller::{ControllerError, Operation, OperationController, OperationState, Phase},
    files::SelectedFile,
    validation::{validate_extension, SPREADSHEET_EXPECTATION, SPREADSHEET_EXTENSIONS},
    ProgressHandle, StudentApi, TransportError,
};

use super::PageContext;

struct ConvertOperation {
    api: Arc<dyn StudentApi>,
}

#[async_trait]
impl Operation<SelectedFile, ConversionReport> for ConvertOperation {
    fn name(&self) -> &'static str {
        "convert_spreadsheet"
    }

    fn input_label(&self) -> &'static str {
        "file"
    }

    fn validate(&self, input: &SelectedFile) -> Result<(), ValidationError> {
        validate_extension(&input.name, SPREADSHEET_EXTENSIONS, SPREADSHEET_EXPECTATION)
    }

    async fn dispatch(
        &self,
        input: SelectedFile,
        _progress: ProgressHandle,
    ) -> Result<ApiOutcome<ConversionReport>, TransportError> {
        self.api.convert_spreadsheet(&input).await
    }

    fn success_notice(&self, _result: &ConversionReport) -> Option<String> {
        Some("File processed successfully!".to_string())
    }

    fn failure_notice(&self, error: &OperationError) -> String {
        match error.kind {
            FailureKind::ServerReported => format!("Error processing file: {}", error.message),
            FailureKind::Transport | FailureKind::Local => error.message.clone(),
        }
    }
}

pub struct ProcessingPage {
    convert: OperationController<SelectedFile, ConversionReport>,
}

impl ProcessingPage {
    pub fn new(ctx: PageContext) -> Self {
        let convert = ctx.controller(Arc::new(ConvertOperation {
            api: Arc::clone(&ctx.api),
        }));
        Self { convert }
    }

    /// Picks a spreadsheet; anything else is refused with a notice.
    pub async fn select_file(&self, file: SelectedFile) -> Result<(), ControllerError> {
        self.convert.select(file).await
    }

    pub async fn remove_file(&self) -> Result<(), ControllerError> {
        self.convert.remove_selection().await
    }

    pub async fn convert(&self) -> Result<Phase, ControllerError> {
        self.convert.submit().await
    }

    pub async fn reset(&self) -> Result<(), ControllerError> {
        self.convert.reset().await
    }

    pub async fn state(&self) -> OperationState<SelectedFile, ConversionReport> {
        self.convert.snapshot().await
    }
}
