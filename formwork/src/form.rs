//! The form handle exposed to a rendering layer.

use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, info, trace};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

use crate::array::{ArrayEdit, FieldArrayManager};
use crate::config::{FieldBinding, FormConfig, TriggerGroup};
use crate::error::{FormError, FormResult};
use crate::event::{EVENT_CHANGED, EVENT_VALIDATE, EventSender, FormEvent};
use crate::instance::FormId;
use crate::path::{IntoPath, Path};
use crate::state::StateCell;
use crate::store::{ErrorMap, ErrorPolicy, ErrorStore, FieldError, FormData};
use crate::submit::{FormSubmitter, NoopSubmitter, SubmissionController, SubmitMeta, SubmitOutcome};
use crate::validation::{
    AcceptAll, FormValidator, IssueLedger, OrchestratorPhase, ValidationOrchestrator,
    ValidationRequest, ValidationResult, ValidationTarget,
};
use crate::value;

/// Everything a renderer needs to draw one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldState {
    pub path: Path,
    /// Current value, `None` when absent.
    pub value: Option<Value>,
    /// Errors visible under the field's policy.
    pub errors: Vec<FieldError>,
    pub touched: bool,
    pub invalid: bool,
    pub valid: bool,
    /// Form-wide submission bookkeeping.
    pub meta: SubmitMeta,
}

impl FieldState {
    /// Distinct error messages, in order.
    pub fn messages(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for error in &self.errors {
            if !out.contains(&error.message) {
                out.push(error.message.clone());
            }
        }
        out
    }
}

/// Builder for [`Form`].
pub struct FormBuilder {
    initial: Value,
    validator: Arc<dyn FormValidator>,
    submitter: Arc<dyn FormSubmitter>,
    config: FormConfig,
    fields: Vec<FieldBinding>,
    default_errors: ErrorMap,
}

impl FormBuilder {
    fn new(initial: Value) -> Self {
        Self {
            initial,
            validator: Arc::new(AcceptAll),
            submitter: Arc::new(NoopSubmitter),
            config: FormConfig::default(),
            fields: Vec::new(),
            default_errors: ErrorMap::new(),
        }
    }

    pub fn validator(mut self, validator: impl FormValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn submitter(mut self, submitter: impl FormSubmitter + 'static) -> Self {
        self.submitter = Arc::new(submitter);
        self
    }

    pub fn config(mut self, config: FormConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a field binding. A later binding for the same name replaces
    /// the earlier one.
    pub fn field(mut self, binding: FieldBinding) -> Self {
        self.fields.push(binding);
        self
    }

    /// Errors present before any validation has run.
    pub fn default_errors(mut self, errors: ErrorMap) -> Self {
        self.default_errors = errors;
        self
    }

    pub fn build(self) -> Form {
        let id = FormId::new();
        let events = EventSender::new(id, self.config.channel_capacity);
        let data = StateCell::new(FormData::new(
            self.initial,
            ErrorStore::from_map(self.default_errors),
        ));
        let orchestrator = Arc::new(ValidationOrchestrator::new(
            data.clone(),
            self.validator,
            events.clone(),
        ));
        let submission = Arc::new(SubmissionController::new(
            data.clone(),
            Arc::clone(&orchestrator),
            self.submitter,
            events.clone(),
        ));
        let arrays = FieldArrayManager::new(data.clone(), events.clone());
        let bindings: IndexMap<Path, FieldBinding> = self
            .fields
            .into_iter()
            .map(|b| (b.name.clone(), b))
            .collect();

        debug!("[{}] form created with {} field binding(s)", id, bindings.len());

        Form {
            core: Arc::new(FormCore {
                id,
                config: self.config,
                bindings,
                data,
                events,
                orchestrator,
                submission,
                arrays,
            }),
        }
    }
}

struct FormCore {
    id: FormId,
    config: FormConfig,
    bindings: IndexMap<Path, FieldBinding>,
    data: StateCell<FormData>,
    events: EventSender,
    orchestrator: Arc<ValidationOrchestrator>,
    submission: Arc<SubmissionController>,
    arrays: FieldArrayManager,
}

/// A form instance: value tree, errors, touched flags and submission state.
///
/// Cheap to clone; clones share the same instance. Reads never block on
/// validation or submission in flight. Operations that schedule work
/// (events, `validate`, `submit`) need a Tokio runtime. Events raised in one
/// tick share a validator call only on a current-thread runtime
/// (`#[tokio::main(flavor = "current_thread")]`); on a multi-thread runtime
/// batching is best effort.
///
/// ```
/// use formwork::{Form, FieldBinding};
/// use serde_json::json;
///
/// let form = Form::builder(json!({"name": {"first": ""}}))
///     .field(FieldBinding::new("name.first")?)
///     .build();
///
/// form.set_value("name.first", json!("Ada"))?;
/// assert_eq!(form.get("name.first")?, Some(json!("Ada")));
/// # Ok::<(), formwork::FormError>(())
/// ```
#[derive(Clone)]
pub struct Form {
    core: Arc<FormCore>,
}

impl Form {
    pub fn builder(initial: Value) -> FormBuilder {
        FormBuilder::new(initial)
    }

    /// A form with no validator, no submitter, and default config.
    pub fn new(initial: Value) -> Self {
        Self::builder(initial).build()
    }

    pub fn id(&self) -> FormId {
        self.core.id
    }

    pub fn config(&self) -> &FormConfig {
        &self.core.config
    }

    /// Snapshot of the current value.
    pub fn value(&self) -> Arc<Value> {
        self.core.data.read(|d| Arc::clone(&d.value))
    }

    pub fn get(&self, path: impl IntoPath) -> FormResult<Option<Value>> {
        let path = path.into_path()?;
        self.core.data.read(|d| Ok(value::get(&d.value, &path)?.cloned()))
    }

    /// The binding registered for `name`, if any.
    pub fn binding(&self, name: &Path) -> Option<&FieldBinding> {
        self.core.bindings.get(name)
    }

    /// State of the field at `name`. Unregistered names read as a field with
    /// default settings.
    pub fn field(&self, name: impl IntoPath) -> FormResult<FieldState> {
        let name = name.into_path()?;
        self.field_state(&name)
    }

    fn field_state(&self, name: &Path) -> FormResult<FieldState> {
        let policy = match self.binding(name) {
            Some(binding) => binding.policy(&self.core.config),
            None => self.core.config.policy,
        };
        self.core.data.read(|d| {
            let value = value::get(&d.value, name)?.cloned();
            let errors = d.errors.read(name, policy);
            let invalid = !errors.is_empty();
            Ok(FieldState {
                path: name.clone(),
                value,
                errors,
                touched: d.touched.is_touched(name),
                invalid,
                valid: !invalid,
                meta: d.submit,
            })
        })
    }

    pub fn errors(&self, path: impl IntoPath, policy: ErrorPolicy) -> FormResult<Vec<FieldError>> {
        let path = path.into_path()?;
        Ok(self.core.data.read(|d| d.errors.read(&path, policy)))
    }

    /// Distinct messages visible at each of `paths` under the form policy,
    /// joined in order.
    pub fn messages<I, P>(&self, paths: I) -> FormResult<Vec<String>>
    where
        I: IntoIterator<Item = P>,
        P: IntoPath,
    {
        let paths = paths
            .into_iter()
            .map(IntoPath::into_path)
            .collect::<FormResult<Vec<_>>>()?;
        let policy = self.core.config.policy;
        Ok(self.core.data.read(|d| {
            let mut out: Vec<String> = Vec::new();
            for path in &paths {
                for message in d.errors.messages(path, policy) {
                    if !out.contains(&message) {
                        out.push(message);
                    }
                }
            }
            out
        }))
    }

    pub fn touched(&self, path: impl IntoPath) -> FormResult<bool> {
        let path = path.into_path()?;
        Ok(self.core.data.read(|d| d.touched.is_touched(&path)))
    }

    /// Every stored error entry.
    pub fn all_errors(&self) -> ErrorMap {
        self.core.data.read(|d| d.errors.to_map())
    }

    pub fn is_valid(&self) -> bool {
        self.core.data.read(|d| d.errors.is_empty())
    }

    pub fn submit_meta(&self) -> SubmitMeta {
        self.core.data.read(|d| d.submit)
    }

    pub fn phase(&self) -> OrchestratorPhase {
        self.core.orchestrator.phase()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FormEvent> {
        self.core.events.subscribe()
    }

    /// Replace the value at `path`.
    pub fn set_value(&self, path: impl IntoPath, value: Value) -> FormResult<()> {
        let path = path.into_path()?;
        self.set_values([(path, value)])?;
        Ok(())
    }

    /// Write several paths in one update, e.g. one input mapping onto
    /// multiple fields. Returns the written paths.
    pub fn set_values<I, P>(&self, writes: I) -> FormResult<Vec<Path>>
    where
        I: IntoIterator<Item = (P, Value)>,
        P: IntoPath,
    {
        let writes = writes
            .into_iter()
            .map(|(p, v)| Ok((p.into_path()?, v)))
            .collect::<FormResult<Vec<(Path, Value)>>>()?;
        let paths: Vec<Path> = writes.iter().map(|(p, _)| p.clone()).collect();

        self.core.data.update(|d| {
            let next = value::set_many(&d.value, writes.iter().map(|(p, v)| (p, v.clone())))?;
            d.value = Arc::new(next);
            Ok::<_, FormError>(())
        })?;

        trace!("[{}] value written at {} path(s)", self.core.id, paths.len());
        self.core.events.value_changed(paths.clone());
        Ok(paths)
    }

    /// Set a field's value and raise `changed` for it.
    ///
    /// Returns whether validation was scheduled.
    pub fn change(&self, name: impl IntoPath, value: Value) -> FormResult<bool> {
        let name = name.into_path()?;
        self.set_value(name.clone(), value)?;
        self.notify(&name, EVENT_CHANGED)
    }

    /// Replace the stored errors for exactly `path`.
    pub fn set_errors(&self, path: impl IntoPath, errors: Vec<FieldError>) -> FormResult<()> {
        let path = path.into_path()?;
        let changed = self
            .core
            .data
            .update(|d| d.errors.set_errors_for_path(path.clone(), errors));
        if changed {
            self.core.events.errors_changed(vec![path]);
        }
        Ok(())
    }

    /// Start over from `value`: errors, touched flags and counters are
    /// cleared, and results of validations issued before now are discarded.
    pub fn reset(&self, value: Value) {
        let attempting = self.core.submission.is_attempting();
        let orchestrator = &self.core.orchestrator;
        self.core.data.update(|d| {
            let epoch = d.epoch + 1;
            *d = FormData::new(value, ErrorStore::new());
            d.ledger = IssueLedger::starting_at(orchestrator.next_seq());
            d.epoch = epoch;
            d.submit.submitting = attempting;
        });
        info!("[{}] form reset", self.core.id);
        self.core.events.send(|form| FormEvent::Reset { form });
    }

    /// Report a field-level event such as `changed` or `blurred`.
    ///
    /// Validation is scheduled only if the field has validation enabled and
    /// `event` is one of its trigger events; returns whether it was.
    pub fn notify_event(&self, name: impl IntoPath, event: &str) -> FormResult<bool> {
        let name = name.into_path()?;
        self.notify(&name, event)
    }

    fn notify(&self, name: &Path, event: &str) -> FormResult<bool> {
        let fallback;
        let binding = match self.binding(name) {
            Some(binding) => binding,
            None => {
                fallback = FieldBinding::at(name.clone());
                &fallback
            }
        };

        let config = &self.core.config;
        if binding.validation_disabled(config) {
            trace!("[{}] '{}' on {} ignored: validation disabled", self.core.id, event, name);
            return Ok(false);
        }
        if !binding.events.triggers(event, config, || self.field_state(name))? {
            trace!("[{}] '{}' on {} ignored: not a trigger", self.core.id, event, name);
            return Ok(false);
        }

        self.request_validation(binding.targets(), event)?;
        Ok(true)
    }

    /// Schedule validation of `paths` as if `event` had fired on them.
    pub fn trigger<I, P>(&self, paths: I, event: &str) -> FormResult<()>
    where
        I: IntoIterator<Item = P>,
        P: IntoPath,
    {
        let paths = paths
            .into_iter()
            .map(IntoPath::into_path)
            .collect::<FormResult<Vec<_>>>()?;
        self.request_validation(paths, event)
    }

    /// Schedule validation for every field in `group`.
    ///
    /// Returns `false` when the group names no fields.
    pub fn trigger_group(&self, group: impl Into<TriggerGroup>, event: &str) -> FormResult<bool> {
        let group = group.into();
        match &group {
            TriggerGroup::All => {
                let request = ValidationRequest::new(ValidationTarget::All, event);
                self.core.orchestrator.enqueue(request)?;
                let targets: Vec<Path> =
                    self.core.bindings.values().flat_map(FieldBinding::targets).collect();
                self.touch(&targets);
                Ok(true)
            }
            TriggerGroup::Named(name) => {
                let targets: Vec<Path> = self
                    .core
                    .bindings
                    .values()
                    .filter(|b| b.in_group(name))
                    .flat_map(FieldBinding::targets)
                    .collect();
                if targets.is_empty() {
                    debug!("[{}] trigger group '{}' has no fields", self.core.id, group);
                    return Ok(false);
                }
                self.request_validation(targets, event)?;
                Ok(true)
            }
        }
    }

    fn request_validation(&self, paths: Vec<Path>, event: &str) -> FormResult<()> {
        let request = ValidationRequest::new(ValidationTarget::paths(paths.iter().cloned()), event);
        self.core.orchestrator.enqueue(request)?;
        self.touch(&paths);
        Ok(())
    }

    fn touch(&self, paths: &[Path]) {
        let newly = self.core.data.update(|d| d.touched.touch(paths));
        self.core.events.touched(newly);
    }

    /// Validate `paths` now and wait for the result.
    ///
    /// Marks `paths` touched and joins any batch collecting in the current
    /// tick. The result holds the
    /// errors stored within the requested paths afterwards.
    pub async fn validate<I, P>(&self, paths: I) -> FormResult<ValidationResult>
    where
        I: IntoIterator<Item = P>,
        P: IntoPath,
    {
        let paths = paths
            .into_iter()
            .map(IntoPath::into_path)
            .collect::<FormResult<Vec<_>>>()?;
        let request =
            ValidationRequest::new(ValidationTarget::paths(paths.iter().cloned()), EVENT_VALIDATE);
        Handle::try_current().map_err(|_| FormError::NoRuntime)?;
        self.touch(&paths);
        self.core.orchestrator.request(request).await
    }

    /// Validate the whole form and wait for the result.
    pub async fn validate_all(&self) -> FormResult<ValidationResult> {
        let request = ValidationRequest::new(ValidationTarget::All, EVENT_VALIDATE);
        self.core.orchestrator.request(request).await
    }

    pub fn insert(&self, array: impl IntoPath, index: usize, item: Value) -> FormResult<ArrayEdit> {
        self.core.arrays.insert(&array.into_path()?, index, item)
    }

    pub fn push(&self, array: impl IntoPath, item: Value) -> FormResult<ArrayEdit> {
        self.core.arrays.push(&array.into_path()?, item)
    }

    pub fn unshift(&self, array: impl IntoPath, item: Value) -> FormResult<ArrayEdit> {
        self.core.arrays.unshift(&array.into_path()?, item)
    }

    pub fn remove(&self, array: impl IntoPath, index: usize) -> FormResult<ArrayEdit> {
        self.core.arrays.remove(&array.into_path()?, index)
    }

    pub fn remove_value(&self, array: impl IntoPath, item: &Value) -> FormResult<Option<ArrayEdit>> {
        self.core.arrays.remove_value(&array.into_path()?, item)
    }

    pub fn move_item(&self, array: impl IntoPath, from: usize, to: usize) -> FormResult<ArrayEdit> {
        self.core.arrays.move_item(&array.into_path()?, from, to)
    }

    pub fn swap(&self, array: impl IntoPath, a: usize, b: usize) -> FormResult<ArrayEdit> {
        self.core.arrays.swap(&array.into_path()?, a, b)
    }

    /// Validate everything and, if valid, hand the value to the submitter.
    ///
    /// Calls made while an attempt is running join it instead of starting
    /// another. The submitter only ever sees a value that validated clean:
    /// edits made while validation runs are validated again, and a
    /// [`reset`](Self::reset) ends the attempt with [`FormError::Reset`].
    pub async fn submit(&self) -> FormResult<SubmitOutcome> {
        self.core.submission.submit().await
    }
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("id", &self.core.id)
            .field("fields", &self.core.bindings.len())
            .finish()
    }
}
