//! Form-state engine
//!
//! Tracks a tree-shaped form value together with per-path validation errors,
//! touched flags and submission state. Validation requests raised by field
//! events are batched per scheduling tick, results are applied in issue order,
//! array edits reindex every path-keyed table, and concurrent submits collapse
//! into one attempt.

pub mod array;
pub mod config;
pub mod error;
pub mod event;
pub mod form;
pub mod instance;
pub mod path;
pub mod schema;
pub mod state;
pub mod store;
pub mod submit;
pub mod validation;
pub mod value;

pub use array::ArrayEdit;
pub use config::{EventPolicy, FieldBinding, FormConfig, TriggerGroup};
pub use error::{FormError, FormResult, SubmitFailure, ValidatorError};
pub use event::FormEvent;
pub use form::{FieldState, Form, FormBuilder};
pub use instance::FormId;
pub use path::{IntoPath, Path, Seg};
pub use schema::RuleSchema;
pub use store::{ErrorMap, ErrorPolicy, ErrorStore, FieldError, TouchedSet};
pub use submit::{FormSubmitter, NoopSubmitter, SubmitFn, SubmitMeta, SubmitOutcome};
pub use validation::{
    FormValidator, OrchestratorPhase, ValidateFn, ValidationResult, ValidationTarget,
};

pub mod prelude {
    pub use crate::config::{EventPolicy, FieldBinding, FormConfig, TriggerGroup};
    pub use crate::error::{FormError, FormResult, SubmitFailure, ValidatorError};
    pub use crate::event::{EVENT_BLURRED, EVENT_CHANGED, FormEvent};
    pub use crate::form::{FieldState, Form};
    pub use crate::path::{IntoPath, Path};
    pub use crate::schema::RuleSchema;
    pub use crate::store::{ErrorMap, ErrorPolicy, FieldError};
    pub use crate::submit::{FormSubmitter, SubmitFn, SubmitMeta, SubmitOutcome};
    pub use crate::validation::{FormValidator, ValidateFn, ValidationResult, ValidationTarget};
    pub use crate::path;
}
