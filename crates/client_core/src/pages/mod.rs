//! One controller bundle per screen of the student data application.

use std::{path::PathBuf, sync::Arc, time::Duration};

use crate::{
    artifacts::{ArtifactRequest, DownloadOperation, SavedArtifact},
    controller::OperationController,
    notifications::{Notification, NotificationSink},
    settings::ClientSettings,
    StudentApi,
};

pub mod database;
pub mod generation;
pub mod processing;
pub mod reports;

pub use database::DatabasePage;
pub use generation::GenerationPage;
pub use processing::ProcessingPage;
pub use reports::ReportsPage;

/// Collaborators every page is built from.
#[derive(Clone)]
pub struct PageContext {
    pub api: Arc<dyn StudentApi>,
    pub notifier: Arc<dyn NotificationSink>,
    pub notice_ttl: Duration,
    pub download_dir: PathBuf,
}

impl PageContext {
    pub fn new(
        api: Arc<dyn StudentApi>,
        notifier: Arc<dyn NotificationSink>,
        settings: &ClientSettings,
    ) -> Self {
        Self {
            api,
            notifier,
            notice_ttl: settings.notification_ttl(),
            download_dir: settings.download_dir.clone(),
        }
    }

    pub(crate) fn controller<I, R>(
        &self,
        operation: Arc<dyn crate::controller::Operation<I, R>>,
    ) -> OperationController<I, R>
    where
        I: Clone + Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        OperationController::new(operation, Arc::clone(&self.notifier), self.notice_ttl)
    }

    pub(crate) fn download_controller(&self) -> OperationController<ArtifactRequest, SavedArtifact> {
        self.controller(Arc::new(DownloadOperation::new(
            Arc::clone(&self.api),
            self.download_dir.clone(),
        )))
    }

    pub(crate) fn info(&self, message: impl Into<String>) {
        self.notifier
            .enqueue(Notification::info(message, self.notice_ttl));
    }

    pub(crate) fn error(&self, message: impl Into<String>) {
        self.notifier
            .enqueue(Notification::error(message, self.notice_ttl));
    }
}

#[cfg(test)]
#[path = "../tests/pages_tests.rs"]
mod tests;
