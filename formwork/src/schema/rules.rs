//! Fluent rule builder.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use regex::Regex;
use serde_json::Value;

use super::pattern::FieldPattern;
use super::RuleSchema;
use crate::error::{FormError, FormResult};
use crate::path::{IntoPath, Path};
use crate::value;

/// Synchronous check: `(value, root)`, only called for present values.
type SyncCheck = Box<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// Asynchronous check, only called for present values.
type AsyncCheck = Box<dyn Fn(Value) -> BoxFuture<'static, bool> + Send + Sync>;

pub(super) enum Check {
    Presence,
    Sync(SyncCheck),
    Async(AsyncCheck),
}

pub(super) struct Rule {
    pub(super) code: &'static str,
    pub(super) message: String,
    pub(super) check: Check,
}

pub(super) struct FieldRules {
    pub(super) pattern: FieldPattern,
    pub(super) rules: Vec<Rule>,
}

/// Entry point for building a [`RuleSchema`].
#[derive(Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldRules>,
    error: Option<FormError>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start adding rules for `pattern` (e.g. `name.first`, `colors[].name`).
    pub fn field(self, pattern: &str) -> FieldBuilder {
        let pattern = FieldPattern::parse(pattern);
        FieldBuilder {
            schema: self,
            pattern,
            rules: Vec::new(),
        }
    }

    /// Finish the schema; fails on the first malformed pattern or path.
    pub fn build(self) -> FormResult<RuleSchema> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(RuleSchema {
                fields: self.fields,
            }),
        }
    }
}

/// Builder for the rules of one field pattern.
pub struct FieldBuilder {
    schema: SchemaBuilder,
    pattern: FormResult<FieldPattern>,
    rules: Vec<Rule>,
}

impl FieldBuilder {
    fn push(mut self, code: &'static str, message: impl Into<String>, check: Check) -> Self {
        self.rules.push(Rule {
            code,
            message: message.into(),
            check,
        });
        self
    }

    fn check(
        self,
        code: &'static str,
        message: impl Into<String>,
        f: impl Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.push(code, message, Check::Sync(Box::new(f)))
    }

    fn fail(mut self, error: FormError) -> Self {
        self.schema.error.get_or_insert(error);
        self
    }

    /// Add a custom synchronous rule.
    pub fn rule<F>(self, f: F, msg: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.check("custom", msg, move |v, _| f(v))
    }

    /// Add a custom asynchronous rule.
    pub fn rule_async<F, Fut>(self, f: F, msg: impl Into<String>) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let f = Arc::new(f);
        self.push(
            "custom",
            msg,
            Check::Async(Box::new(move |v| {
                let f = Arc::clone(&f);
                Box::pin(async move { f(v).await })
            })),
        )
    }

    /// Require a value: not absent, not `null`, not a blank string.
    pub fn required(self, msg: impl Into<String>) -> Self {
        self.push("required", msg, Check::Presence)
    }

    /// Minimum length: characters for strings, elements for arrays.
    pub fn min_length(self, min: usize, msg: impl Into<String>) -> Self {
        self.check("min_length", msg, move |v, _| length(v).is_none_or(|n| n >= min))
    }

    /// Maximum length: characters for strings, elements for arrays.
    pub fn max_length(self, max: usize, msg: impl Into<String>) -> Self {
        self.check("max_length", msg, move |v, _| length(v).is_none_or(|n| n <= max))
    }

    /// Require a string matching `re`.
    pub fn pattern(self, re: Regex, msg: impl Into<String>) -> Self {
        self.check("pattern", msg, move |v, _| v.as_str().is_some_and(|s| re.is_match(s)))
    }

    /// Require a valid email address. Empty strings pass; use `required`.
    pub fn email(self, msg: impl Into<String>) -> Self {
        self.check("email", msg, |v, _| match v.as_str() {
            Some("") => true,
            Some(s) => email_address::EmailAddress::is_valid(s),
            None => false,
        })
    }

    /// Require the value to be one of `allowed`.
    pub fn one_of<I>(self, allowed: I, msg: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let allowed: Vec<Value> = allowed.into_iter().collect();
        self.check("one_of", msg, move |v, _| allowed.contains(v))
    }

    /// Require a number no smaller than `min`.
    pub fn min(self, min: f64, msg: impl Into<String>) -> Self {
        self.check("min", msg, move |v, _| v.as_f64().is_some_and(|n| n >= min))
    }

    /// Require a number no larger than `max`.
    pub fn max(self, max: f64, msg: impl Into<String>) -> Self {
        self.check("max", msg, move |v, _| v.as_f64().is_some_and(|n| n <= max))
    }

    /// Require the value to equal the value at `other`, e.g. a password
    /// confirmation.
    pub fn equals_field(self, other: impl IntoPath, msg: impl Into<String>) -> Self {
        let other: Path = match other.into_path() {
            Ok(p) => p,
            Err(e) => return self.fail(e),
        };
        self.check("equals_field", msg, move |v, root| {
            matches!(value::get(root, &other), Ok(Some(o)) if o == v)
        })
    }

    /// Continue with the next field.
    pub fn field(self, pattern: &str) -> FieldBuilder {
        self.finish().field(pattern)
    }

    /// Finish the schema.
    pub fn build(self) -> FormResult<RuleSchema> {
        self.finish().build()
    }

    fn finish(self) -> SchemaBuilder {
        let mut schema = self.schema;
        match self.pattern {
            Ok(pattern) => schema.fields.push(FieldRules {
                pattern,
                rules: self.rules,
            }),
            Err(e) => {
                schema.error.get_or_insert(e);
            }
        }
        schema
    }
}

fn length(v: &Value) -> Option<usize> {
    match v {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

pub(super) fn is_present(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}
