//! The validator capability a form consumes.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::ValidationTarget;
use crate::error::ValidatorError;
use crate::store::ErrorMap;

/// Validates a form value, opaque to the form itself.
///
/// Implementations return every failing path inside `target` together with
/// its errors; a path missing from the map is considered valid. Returning
/// `Err` means validation could not run at all; the form then keeps its
/// previous errors.
///
/// The form may have several calls outstanding at once; results are ordered
/// by issue sequence, not completion.
#[async_trait]
pub trait FormValidator: Send + Sync {
    async fn validate(
        &self,
        value: Arc<Value>,
        target: ValidationTarget,
    ) -> Result<ErrorMap, ValidatorError>;
}

#[async_trait]
impl<T: FormValidator + ?Sized> FormValidator for Arc<T> {
    async fn validate(
        &self,
        value: Arc<Value>,
        target: ValidationTarget,
    ) -> Result<ErrorMap, ValidatorError> {
        (**self).validate(value, target).await
    }
}

/// Adapts an async closure into a [`FormValidator`].
///
/// ```ignore
/// let validator = ValidateFn(|value, target| async move {
///     check(&value, &target).await
/// });
/// ```
pub struct ValidateFn<F>(pub F);

#[async_trait]
impl<F, Fut> FormValidator for ValidateFn<F>
where
    F: Fn(Arc<Value>, ValidationTarget) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ErrorMap, ValidatorError>> + Send + 'static,
{
    async fn validate(
        &self,
        value: Arc<Value>,
        target: ValidationTarget,
    ) -> Result<ErrorMap, ValidatorError> {
        (self.0)(value, target).await
    }
}

/// Validator that accepts everything. Used when a form has no schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

#[async_trait]
impl FormValidator for AcceptAll {
    async fn validate(
        &self,
        _value: Arc<Value>,
        _target: ValidationTarget,
    ) -> Result<ErrorMap, ValidatorError> {
        Ok(ErrorMap::new())
    }
}
