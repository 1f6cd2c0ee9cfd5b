use tokio::sync::broadcast;

use crate::instance::FormId;
use crate::path::Path;
use crate::submit::SubmitMeta;

/// Event name raised when a field's value changes.
pub const EVENT_CHANGED: &str = "changed";
/// Event name raised when a field loses focus.
pub const EVENT_BLURRED: &str = "blurred";
/// Event name used for the whole-form validation a submit performs.
pub const EVENT_SUBMIT: &str = "submit";
/// Event name used for explicit `validate` calls.
pub const EVENT_VALIDATE: &str = "validate";

/// Change notifications published by a form.
///
/// Delivered to every subscriber, so renderers can re-read the state they
/// display. Slow subscribers may observe `Lagged` from the channel and should
/// simply re-read everything.
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    /// The value tree was replaced; `paths` are the paths that were written.
    ValueChanged { form: FormId, paths: Vec<Path> },
    /// Stored errors changed for `paths`.
    ErrorsChanged { form: FormId, paths: Vec<Path> },
    /// `paths` were touched for the first time.
    Touched { form: FormId, paths: Vec<Path> },
    /// Submission bookkeeping changed.
    SubmitChanged { form: FormId, meta: SubmitMeta },
    /// The form was reset to a new value.
    Reset { form: FormId },
}

/// Publishing half of a form's event channel.
#[derive(Debug, Clone)]
pub(crate) struct EventSender {
    form: FormId,
    tx: broadcast::Sender<FormEvent>,
}

impl EventSender {
    pub(crate) fn new(form: FormId, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { form, tx }
    }

    pub(crate) fn form(&self) -> FormId {
        self.form
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<FormEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Errors are ignored (no subscribers).
    pub(crate) fn send(&self, make: impl FnOnce(FormId) -> FormEvent) {
        if self.tx.receiver_count() > 0 {
            let _ = self.tx.send(make(self.form));
        }
    }

    pub(crate) fn value_changed(&self, paths: Vec<Path>) {
        self.send(|form| FormEvent::ValueChanged { form, paths });
    }

    pub(crate) fn errors_changed(&self, paths: Vec<Path>) {
        if !paths.is_empty() {
            self.send(|form| FormEvent::ErrorsChanged { form, paths });
        }
    }

    pub(crate) fn touched(&self, paths: Vec<Path>) {
        if !paths.is_empty() {
            self.send(|form| FormEvent::Touched { form, paths });
        }
    }

    pub(crate) fn submit_changed(&self, meta: SubmitMeta) {
        self.send(|form| FormEvent::SubmitChanged { form, meta });
    }
}
