//! A small rule-based validator usable as a form's [`FormValidator`].
//!
//! # Example
//!
//! ```
//! use formwork::RuleSchema;
//!
//! let schema = RuleSchema::builder()
//!     .field("name.first")
//!         .required("First name is required")
//!         .min_length(2, "Too short")
//!     .field("email")
//!         .required("Email is required")
//!         .email("Invalid email format")
//!     .field("colors[].name")
//!         .required("Every color needs a name")
//!     .build()?;
//! # Ok::<(), formwork::FormError>(())
//! ```

mod pattern;
mod rules;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

pub use pattern::FieldPattern;
pub use rules::{FieldBuilder, SchemaBuilder};

use crate::error::ValidatorError;
use crate::store::{ErrorMap, FieldError};
use crate::validation::{FormValidator, ValidationTarget};
use rules::{Check, FieldRules, is_present};

/// Validates form values against per-path rules.
///
/// Every failing rule contributes one error, tagged with the rule's code
/// (`required`, `min_length`, ..., `custom` for user rules). Rules other
/// than `required` pass on absent and `null` values.
pub struct RuleSchema {
    fields: Vec<FieldRules>,
}

impl RuleSchema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Patterns with at least one rule, in declaration order.
    pub fn patterns(&self) -> impl Iterator<Item = &FieldPattern> {
        self.fields.iter().map(|f| &f.pattern)
    }
}

#[async_trait]
impl FormValidator for RuleSchema {
    async fn validate(
        &self,
        value: Arc<Value>,
        target: ValidationTarget,
    ) -> Result<ErrorMap, ValidatorError> {
        let mut errors = ErrorMap::new();

        for field in &self.fields {
            let found: Vec<_> = field
                .pattern
                .expand(&value)
                .into_iter()
                .filter(|(path, _)| target.covers(path))
                .map(|(path, node)| (path, node.cloned()))
                .collect();

            for (path, node) in found {
                let mut failed = Vec::new();
                for rule in &field.rules {
                    let ok = match (&rule.check, node.as_ref()) {
                        (Check::Presence, node) => is_present(node),
                        (_, None | Some(Value::Null)) => true,
                        (Check::Sync(f), Some(v)) => f(v, &value),
                        (Check::Async(f), Some(v)) => f(v.clone()).await,
                    };
                    if !ok {
                        failed.push(FieldError::with_code(rule.message.clone(), rule.code));
                    }
                }
                if !failed.is_empty() {
                    errors.entry(path).or_default().extend(failed);
                }
            }
        }

        Ok(errors)
    }
}
