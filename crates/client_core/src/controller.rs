//! Request lifecycle shared by every page: Idle -> Validating -> Running -> Succeeded | Failed.

use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde::Serialize;
use shared::{
    error::{OperationError, ValidationError},
    protocol::ApiOutcome,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    notifications::{Notification, NotificationSink},
    TransportError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Validating,
    Running,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn is_busy(self) -> bool {
        matches!(self, Phase::Validating | Phase::Running)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("an operation is already running")]
    Busy,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, Default)]
pub struct ProgressHandle {
    percent: Arc<AtomicU8>,
}

impl ProgressHandle {
    /// Records `loaded` of `total` bytes sent. Progress never moves backwards.
    pub fn report(&self, loaded: u64, total: u64) {
        let percent = if total == 0 {
            100
        } else {
            let loaded = u128::from(loaded.min(total));
            let total = u128::from(total);
            ((loaded * 100 + total / 2) / total) as u8
        };
        self.percent.fetch_max(percent, Ordering::Relaxed);
    }

    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationState<I, R> {
    pub phase: Phase,
    pub selected: Option<I>,
    pub progress_percent: u8,
    pub result: Option<R>,
    pub error: Option<OperationError>,
    pub field_error: Option<ValidationError>,
}

#[async_trait]
pub trait Operation<I, R>: Send + Sync {
    fn name(&self) -> &'static str;

    fn input_label(&self) -> &'static str;

    fn validate(&self, input: &I) -> Result<(), ValidationError>;

    async fn dispatch(
        &self,
        input: I,
        progress: ProgressHandle,
    ) -> Result<ApiOutcome<R>, TransportError>;

    /// Notice for a successful response; `None` keeps the success silent.
    fn success_notice(&self, result: &R) -> Option<String>;

    fn failure_notice(&self, error: &OperationError) -> String {
        error.message.clone()
    }
}

struct ControllerState<I, R> {
    phase: Phase,
    selected: Option<I>,
    progress: ProgressHandle,
    result: Option<R>,
    error: Option<OperationError>,
    field_error: Option<ValidationError>,
}

impl<I, R> ControllerState<I, R> {
    fn clear_outcome(&mut self) {
        self.phase = Phase::Idle;
        self.result = None;
        self.error = None;
        self.progress = ProgressHandle::default();
    }
}

pub struct OperationController<I, R> {
    operation: Arc<dyn Operation<I, R>>,
    notifier: Arc<dyn NotificationSink>,
    notice_ttl: Duration,
    inner: Mutex<ControllerState<I, R>>,
}

impl<I, R> OperationController<I, R>
where
    I: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    pub fn new(
        operation: Arc<dyn Operation<I, R>>,
        notifier: Arc<dyn NotificationSink>,
        notice_ttl: Duration,
    ) -> Self {
        Self {
            operation,
            notifier,
            notice_ttl,
            inner: Mutex::new(ControllerState {
                phase: Phase::Idle,
                selected: None,
                progress: ProgressHandle::default(),
                result: None,
                error: None,
                field_error: None,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.operation.name()
    }

    fn state(&self) -> MutexGuard<'_, ControllerState<I, R>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn snapshot(&self) -> OperationState<I, R> {
        let state = self.state();
        OperationState {
            phase: state.phase,
            selected: state.selected.clone(),
            progress_percent: state.progress.percent(),
            result: state.result.clone(),
            error: state.error.clone(),
            field_error: state.field_error.clone(),
        }
    }

    pub async fn phase(&self) -> Phase {
        self.state().phase
    }

    pub async fn result(&self) -> Option<R> {
        self.state().result.clone()
    }

    /// An invalid input keeps the previous selection and sets `field_error`.
    pub async fn select(&self, input: I) -> Result<(), ControllerError> {
        let mut state = self.state();
        if state.phase.is_busy() {
            return Err(ControllerError::Busy);
        }

        if let Err(err) = self.operation.validate(&input) {
            state.field_error = Some(err.clone());
            drop(state);
            self.reject(err.clone());
            return Err(ControllerError::Invalid(err));
        }

        if state.phase.is_terminal() {
            state.clear_outcome();
        }
        state.selected = Some(input);
        state.field_error = None;
        Ok(())
    }

    pub async fn remove_selection(&self) -> Result<(), ControllerError> {
        let mut state = self.state();
        if state.phase.is_busy() {
            return Err(ControllerError::Busy);
        }
        state.selected = None;
        state.field_error = None;
        state.clear_outcome();
        Ok(())
    }

    /// Returns a finished controller to `Idle`. A no-op while already idle.
    pub async fn reset(&self) -> Result<(), ControllerError> {
        let mut state = self.state();
        match state.phase {
            Phase::Idle => Ok(()),
            Phase::Validating | Phase::Running => Err(ControllerError::Busy),
            Phase::Succeeded | Phase::Failed => {
                state.selected = None;
                state.field_error = None;
                state.clear_outcome();
                Ok(())
            }
        }
    }

    pub async fn submit_with(&self, input: I) -> Result<Phase, ControllerError> {
        self.select(input).await?;
        self.submit().await
    }

    /// Validates the selection and dispatches exactly one request.
    pub async fn submit(&self) -> Result<Phase, ControllerError> {
        let name = self.operation.name();
        let (input, progress) = {
            let mut state = self.state();
            if state.phase.is_busy() {
                warn!(operation = name, "submission rejected while request is in flight");
                return Err(ControllerError::Busy);
            }
            if state.phase.is_terminal() {
                state.clear_outcome();
            }

            state.phase = Phase::Validating;
            let checked = match state.selected.as_ref() {
                Some(input) => self.operation.validate(input).map(|()| input.clone()),
                None => Err(ValidationError::MissingInput {
                    field: self.operation.input_label(),
                }),
            };

            match checked {
                Ok(input) => {
                    state.phase = Phase::Running;
                    state.field_error = None;
                    state.progress = ProgressHandle::default();
                    (input, state.progress.clone())
                }
                Err(err) => {
                    state.phase = Phase::Idle;
                    state.field_error = Some(err.clone());
                    drop(state);
                    self.reject(err.clone());
                    return Err(ControllerError::Invalid(err));
                }
            }
        };

        info!(operation = name, "dispatching request");
        let mut in_flight = InFlight {
            inner: &self.inner,
            name,
            armed: true,
        };
        let outcome = self.operation.dispatch(input, progress).await;

        let (phase, notification) = {
            let mut state = self.state();
            in_flight.armed = false;
            match outcome {
                Ok(ApiOutcome::Success(result)) => {
                    info!(operation = name, "request succeeded");
                    let notice = self
                        .operation
                        .success_notice(&result)
                        .map(|message| Notification::success(message, self.notice_ttl));
                    state.phase = Phase::Succeeded;
                    state.result = Some(result);
                    state.error = None;
                    (Phase::Succeeded, notice)
                }
                Ok(ApiOutcome::Failure { message }) => {
                    warn!(operation = name, %message, "server reported failure");
                    self.fail(&mut state, OperationError::server_reported(message))
                }
                Err(err) => {
                    warn!(operation = name, error = %err, "request failed in transport");
                    self.fail(&mut state, err.to_operation_error())
                }
            }
        };

        if let Some(notification) = notification {
            self.notifier.enqueue(notification);
        }
        Ok(phase)
    }

    fn fail(
        &self,
        state: &mut ControllerState<I, R>,
        error: OperationError,
    ) -> (Phase, Option<Notification>) {
        let notice = Notification::error(self.operation.failure_notice(&error), self.notice_ttl);
        state.phase = Phase::Failed;
        state.result = None;
        state.error = Some(error);
        (Phase::Failed, Some(notice))
    }

    fn reject(&self, err: ValidationError) {
        debug!(operation = self.operation.name(), error = %err, "input rejected before dispatch");
        self.notifier
            .enqueue(Notification::error(err.to_string(), self.notice_ttl));
    }
}

/// Puts the controller back to `Idle` if a submission is dropped mid-flight.
struct InFlight<'a, I, R> {
    inner: &'a Mutex<ControllerState<I, R>>,
    name: &'static str,
    armed: bool,
}

impl<I, R> Drop for InFlight<'_, I, R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if state.phase == Phase::Running {
            warn!(operation = self.name, "submission abandoned before a response arrived");
            state.phase = Phase::Idle;
            state.progress = ProgressHandle::default();
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
