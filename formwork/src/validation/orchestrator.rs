//! Batches field-level validation requests and applies results in issue
//! order.
//!
//! Requests raised during one scheduling tick are folded into a single
//! pending batch. The first request of a tick spawns a flush task, which
//! yields once (the tick boundary), takes the batch, and calls the validator
//! exactly once with the union of all requested paths, or with no filter if
//! any request asked for the whole form.
//!
//! Every validator call takes an issue sequence number. A result is only
//! written to a path if no later-issued result was already applied there, so
//! a slow early validation can never overwrite a fast later one.
//!
//! The tick boundary is exact on a current-thread runtime only. On a
//! multi-thread runtime another worker may run the flush task before the
//! caller's next request, splitting what should be one batch; the first
//! request on such a runtime logs a warning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, trace, warn};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::oneshot;

use super::{FormValidator, ValidationRequest, ValidationResult, ValidationTarget};
use crate::error::{FormError, FormResult};
use crate::event::EventSender;
use crate::state::StateCell;
use crate::store::{ErrorMap, FormData, MergeReport};

type BatchReply = FormResult<()>;

/// Where the orchestrator is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorPhase {
    /// Nothing pending or running.
    Idle,
    /// Requests are being collected for the current tick.
    Collecting,
    /// At least one validator call is outstanding.
    Validating,
}

struct PendingBatch {
    target: ValidationTarget,
    events: Vec<String>,
    waiters: Vec<oneshot::Sender<BatchReply>>,
}

struct Scheduler {
    pending: Option<PendingBatch>,
    next_seq: u64,
    in_flight: usize,
}

/// Per-form validation scheduler.
pub struct ValidationOrchestrator {
    data: StateCell<FormData>,
    validator: Arc<dyn FormValidator>,
    events: EventSender,
    scheduler: Mutex<Scheduler>,
    flavor_warned: AtomicBool,
}

impl ValidationOrchestrator {
    pub(crate) fn new(
        data: StateCell<FormData>,
        validator: Arc<dyn FormValidator>,
        events: EventSender,
    ) -> Self {
        Self {
            data,
            validator,
            events,
            scheduler: Mutex::new(Scheduler {
                pending: None,
                next_seq: 1,
                in_flight: 0,
            }),
            flavor_warned: AtomicBool::new(false),
        }
    }

    fn scheduler(&self) -> MutexGuard<'_, Scheduler> {
        self.scheduler.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current phase.
    pub fn phase(&self) -> OrchestratorPhase {
        let scheduler = self.scheduler();
        if scheduler.pending.is_some() {
            OrchestratorPhase::Collecting
        } else if scheduler.in_flight > 0 {
            OrchestratorPhase::Validating
        } else {
            OrchestratorPhase::Idle
        }
    }

    /// The sequence number the next validator call will receive.
    pub(crate) fn next_seq(&self) -> u64 {
        self.scheduler().next_seq
    }

    /// Queue a request without waiting for its result.
    pub fn enqueue(self: &Arc<Self>, request: ValidationRequest) -> FormResult<()> {
        self.push(request, None)
    }

    /// Queue a request and wait for the batch it joins to finish.
    ///
    /// Resolves with the errors inside the request's own scope once the
    /// result has been merged (or discarded as superseded). A validator
    /// failure is returned as [`FormError::Validation`].
    pub async fn request(
        self: &Arc<Self>,
        request: ValidationRequest,
    ) -> FormResult<ValidationResult> {
        let (tx, rx) = oneshot::channel();
        let target = request.target.clone();
        self.push(request, Some(tx))?;
        rx.await.map_err(|_| FormError::Closed)??;
        Ok(self.visible(&target))
    }

    fn push(
        self: &Arc<Self>,
        request: ValidationRequest,
        waiter: Option<oneshot::Sender<BatchReply>>,
    ) -> FormResult<()> {
        let handle = Handle::try_current().map_err(|_| FormError::NoRuntime)?;
        let form = self.events.form();
        if handle.runtime_flavor() != RuntimeFlavor::CurrentThread
            && !self.flavor_warned.swap(true, Ordering::Relaxed)
        {
            warn!(
                "[{}] running on a multi-thread runtime; events from one tick may be split across validator calls",
                form
            );
        }

        let mut scheduler = self.scheduler();
        match scheduler.pending.as_mut() {
            Some(batch) => {
                trace!(
                    "[{}] '{}' joins pending batch: {}",
                    form, request.origin_event, request.target
                );
                batch.target.union(request.target);
                batch.events.push(request.origin_event);
                batch.waiters.extend(waiter);
            }
            None => {
                trace!(
                    "[{}] '{}' opens batch: {}",
                    form, request.origin_event, request.target
                );
                scheduler.pending = Some(PendingBatch {
                    target: request.target,
                    events: vec![request.origin_event],
                    waiters: waiter.into_iter().collect(),
                });
                let this = Arc::clone(self);
                handle.spawn(async move { this.flush().await });
            }
        }
        Ok(())
    }

    async fn flush(self: Arc<Self>) {
        // tick boundary: let every request raised in this turn join the batch
        tokio::task::yield_now().await;

        let form = self.events.form();
        let (batch, seq) = {
            let mut scheduler = self.scheduler();
            let Some(batch) = scheduler.pending.take() else {
                return;
            };
            let seq = scheduler.next_seq;
            scheduler.next_seq += 1;
            scheduler.in_flight += 1;
            (batch, seq)
        };

        let reply = if batch.target.is_empty() {
            Ok(())
        } else {
            let value = self.data.read(|d| Arc::clone(&d.value));
            debug!(
                "[{}] validating #{} {} (events: {})",
                form,
                seq,
                batch.target,
                batch.events.join(", ")
            );
            match self.validator.validate(value, batch.target.clone()).await {
                Ok(result) => {
                    self.apply(seq, &batch.target, result);
                    Ok(())
                }
                Err(e) => {
                    warn!("[{}] validator failed for #{} {}: {}", form, seq, batch.target, e);
                    Err(FormError::Validation(e))
                }
            }
        };

        self.scheduler().in_flight -= 1;
        for waiter in batch.waiters {
            let _ = waiter.send(reply.clone());
        }
    }

    /// Merge a validator result issued at `seq`, honouring issue order.
    fn apply(&self, seq: u64, target: &ValidationTarget, result: ErrorMap) {
        let form = self.events.form();
        let (report, stale) = self.data.update(|d| {
            let FormData { errors, ledger, .. } = d;
            if ledger.is_stale(target, seq) {
                return (MergeReport::default(), true);
            }
            let report =
                errors.merge_validation_result_where(target, result, |p| ledger.allows(p, seq));
            ledger.record(target, seq);
            (report, false)
        });

        if stale {
            debug!("[{}] discarding superseded result #{} for {}", form, seq, target);
        } else {
            if report.skipped > 0 {
                debug!(
                    "[{}] result #{} skipped {} path(s) already covered by newer results",
                    form, seq, report.skipped
                );
            }
            self.events.errors_changed(report.changed);
        }
    }

    /// Errors currently stored inside `target`.
    fn visible(&self, target: &ValidationTarget) -> ValidationResult {
        let errors: ErrorMap = self.data.read(|d| {
            d.errors
                .iter()
                .filter(|(p, _)| target.covers(p))
                .map(|(p, e)| (p.clone(), e.clone()))
                .collect()
        });
        ValidationResult::from_errors(errors)
    }
}
