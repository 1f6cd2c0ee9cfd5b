//! Submission lifecycle: counters, the submit capability, and single-flight
//! control.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;

use crate::error::{FormError, FormResult, SubmitFailure};
use crate::event::{EVENT_SUBMIT, EventSender};
use crate::state::StateCell;
use crate::store::{ErrorMap, FormData};
use crate::validation::{ValidationOrchestrator, ValidationRequest, ValidationTarget};

/// Submission bookkeeping shown to the rendering layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubmitMeta {
    /// An attempt is in flight.
    pub submitting: bool,
    /// Attempts that reached the submit capability and succeeded.
    pub submit_count: u32,
    /// Every user-initiated attempt, successful or not.
    pub submit_attempts: u32,
}

/// How a finished submit attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The form was valid and the submit capability accepted the value.
    Submitted,
    /// Full validation found errors; nothing was submitted.
    Invalid(ErrorMap),
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

/// Receives the value of a valid form.
///
/// A returned error marks the attempt as failed; the form stays usable.
#[async_trait]
pub trait FormSubmitter: Send + Sync {
    async fn submit(&self, value: Arc<Value>) -> Result<(), SubmitFailure>;
}

#[async_trait]
impl<T: FormSubmitter + ?Sized> FormSubmitter for Arc<T> {
    async fn submit(&self, value: Arc<Value>) -> Result<(), SubmitFailure> {
        (**self).submit(value).await
    }
}

/// Adapts an async closure into a [`FormSubmitter`].
pub struct SubmitFn<F>(pub F);

#[async_trait]
impl<F, Fut> FormSubmitter for SubmitFn<F>
where
    F: Fn(Arc<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), SubmitFailure>> + Send + 'static,
{
    async fn submit(&self, value: Arc<Value>) -> Result<(), SubmitFailure> {
        (self.0)(value).await
    }
}

/// Submitter that accepts every value and does nothing with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSubmitter;

#[async_trait]
impl FormSubmitter for NoopSubmitter {
    async fn submit(&self, _value: Arc<Value>) -> Result<(), SubmitFailure> {
        Ok(())
    }
}

type SharedAttempt = Shared<BoxFuture<'static, FormResult<SubmitOutcome>>>;

/// Runs at most one submit attempt at a time per form.
///
/// The first `submit` call starts an attempt on the runtime and parks a
/// shared handle to it; calls arriving while it runs await the same handle
/// and see the same result.
pub(crate) struct SubmissionController {
    data: StateCell<FormData>,
    orchestrator: Arc<ValidationOrchestrator>,
    submitter: Arc<dyn FormSubmitter>,
    events: EventSender,
    in_flight: Mutex<Option<SharedAttempt>>,
}

impl SubmissionController {
    pub(crate) fn new(
        data: StateCell<FormData>,
        orchestrator: Arc<ValidationOrchestrator>,
        submitter: Arc<dyn FormSubmitter>,
        events: EventSender,
    ) -> Self {
        Self {
            data,
            orchestrator,
            submitter,
            events,
            in_flight: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<SharedAttempt>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn is_attempting(&self) -> bool {
        self.slot().is_some()
    }

    pub(crate) async fn submit(self: &Arc<Self>) -> FormResult<SubmitOutcome> {
        let attempt = {
            let mut slot = self.slot();
            match slot.as_ref() {
                Some(attempt) => {
                    debug!("[{}] submit joins the attempt in flight", self.events.form());
                    attempt.clone()
                }
                None => {
                    let handle = Handle::try_current().map_err(|_| FormError::NoRuntime)?;
                    let epoch = self.begin();
                    let this = Arc::clone(self);
                    let task = handle.spawn(async move { this.attempt(epoch).await });
                    let attempt = async move { task.await.unwrap_or(Err(FormError::Closed)) }
                        .boxed()
                        .shared();
                    *slot = Some(attempt.clone());
                    attempt
                }
            }
        };
        attempt.await
    }

    /// Enter Attempting; returns the data epoch the attempt belongs to.
    fn begin(&self) -> u64 {
        let (meta, epoch) = self.data.update(|d| {
            d.submit.submitting = true;
            d.submit.submit_attempts += 1;
            (d.submit, d.epoch)
        });
        info!(
            "[{}] submit attempt {} started",
            self.events.form(),
            meta.submit_attempts
        );
        self.events.submit_changed(meta);
        epoch
    }

    async fn attempt(&self, epoch: u64) -> FormResult<SubmitOutcome> {
        let form = self.events.form();
        let value = loop {
            let snapshot = self.data.read(|d| Arc::clone(&d.value));
            let request = ValidationRequest::new(ValidationTarget::All, EVENT_SUBMIT);
            if let Err(e) = self.orchestrator.request(request).await {
                warn!("[{}] submit aborted, validation failed: {}", form, e);
                self.settle(epoch, false);
                return Err(e);
            }

            let (errors, current, unchanged) = self.data.read(|d| {
                (d.errors.to_map(), d.epoch, Arc::ptr_eq(&d.value, &snapshot))
            });
            if current != epoch {
                info!("[{}] submit abandoned, form was reset", form);
                self.settle(epoch, false);
                return Err(FormError::Reset);
            }
            // the stored errors only describe `snapshot` if nothing was written since
            if !unchanged {
                debug!("[{}] value changed during submit validation, revalidating", form);
                continue;
            }
            if !errors.is_empty() {
                info!("[{}] submit blocked by {} invalid path(s)", form, errors.len());
                self.settle(epoch, false);
                return Ok(SubmitOutcome::Invalid(errors));
            }
            break snapshot;
        };

        match self.submitter.submit(value).await {
            Ok(()) => {
                info!("[{}] form submitted", form);
                self.settle(epoch, true);
                Ok(SubmitOutcome::Submitted)
            }
            Err(e) => {
                warn!("[{}] submit failed: {}", form, e);
                self.settle(epoch, false);
                Err(FormError::Submit(e))
            }
        }
    }

    /// Return to Ready. Counters only move if the form was not reset while
    /// the attempt ran.
    fn settle(&self, epoch: u64, submitted: bool) {
        let meta = self.data.update(|d| {
            d.submit.submitting = false;
            if submitted && d.epoch == epoch {
                d.submit.submit_count += 1;
            }
            d.submit
        });
        self.slot().take();
        self.events.submit_changed(meta);
    }
}
