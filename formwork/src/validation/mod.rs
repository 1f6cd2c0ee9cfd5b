//! Validation requests, results, and the per-form orchestrator.

mod ledger;
mod orchestrator;
mod result;
mod target;
mod validator;

pub(crate) use ledger::IssueLedger;
pub use orchestrator::{OrchestratorPhase, ValidationOrchestrator};
pub use result::ValidationResult;
pub use target::{ValidationRequest, ValidationTarget};
pub use validator::{AcceptAll, FormValidator, ValidateFn};
