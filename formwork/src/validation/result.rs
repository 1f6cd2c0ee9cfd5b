use crate::path::Path;
use crate::store::{ErrorMap, FieldError};

/// Result of validating one or more paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ValidationResult {
    /// Everything in scope passed validation.
    #[default]
    Valid,
    /// One or more paths in scope failed validation.
    Invalid(ErrorMap),
}

impl ValidationResult {
    /// Build a result from the errors visible in scope.
    pub fn from_errors(errors: ErrorMap) -> Self {
        if errors.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(errors)
        }
    }

    /// Check if everything passed validation.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Check if anything failed validation.
    pub fn is_invalid(&self) -> bool {
        !self.is_valid()
    }

    /// Errors per path (empty when valid).
    pub fn errors(&self) -> ErrorMap {
        match self {
            Self::Valid => ErrorMap::new(),
            Self::Invalid(errors) => errors.clone(),
        }
    }

    /// The first error in store order, with its path.
    pub fn first_error(&self) -> Option<(&Path, &FieldError)> {
        match self {
            Self::Valid => None,
            Self::Invalid(errors) => errors
                .iter()
                .find_map(|(path, errs)| errs.first().map(|e| (path, e))),
        }
    }

    /// Path of the first invalid field (for focusing).
    pub fn first_invalid_path(&self) -> Option<&Path> {
        self.first_error().map(|(path, _)| path)
    }
}
