//! Form-wide configuration and per-field bindings.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::FormResult;
use crate::event::{EVENT_BLURRED, EVENT_CHANGED};
use crate::form::FieldState;
use crate::path::{IntoPath, Path};
use crate::store::ErrorPolicy;

/// Form-wide settings.
///
/// Deserializable so it can live in an application's config file; every
/// field has a default.
///
/// ```
/// use formwork::FormConfig;
///
/// let config: FormConfig = serde_json::from_str(r#"{"events": ["blurred"]}"#).unwrap();
/// assert_eq!(config.events, vec!["blurred".to_string()]);
/// assert_eq!(config.channel_capacity, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Events that trigger field validation unless a binding says otherwise.
    pub events: Vec<String>,
    /// Disable event-driven validation for every field.
    pub no_validate: bool,
    /// Error visibility used for field reads.
    pub policy: ErrorPolicy,
    /// Buffer size of the change-notification channel.
    pub channel_capacity: usize,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            events: vec![EVENT_CHANGED.to_string(), EVENT_BLURRED.to_string()],
            no_validate: false,
            policy: ErrorPolicy::Inclusive,
            channel_capacity: 64,
        }
    }
}

impl FormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events = events.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_no_validate(mut self, no_validate: bool) -> Self {
        self.no_validate = no_validate;
        self
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

/// Computes a field's trigger events from its current state.
pub type EventsFn = Arc<dyn Fn(&FieldState) -> Vec<String> + Send + Sync>;

/// Which events make a field validate.
#[derive(Clone, Default)]
pub enum EventPolicy {
    /// Use the form's configured events.
    #[default]
    Inherit,
    /// A fixed list of event names.
    Fixed(Vec<String>),
    /// Decided per event from the field's state, e.g. validate on blur until
    /// the field is invalid, then on every change.
    Dynamic(EventsFn),
}

impl EventPolicy {
    pub fn fixed<I, S>(events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fixed(events.into_iter().map(Into::into).collect())
    }

    pub fn dynamic(f: impl Fn(&FieldState) -> Vec<String> + Send + Sync + 'static) -> Self {
        Self::Dynamic(Arc::new(f))
    }

    /// Returns `true` if `event` triggers validation.
    ///
    /// `state` is only computed for dynamic policies.
    pub(crate) fn triggers(
        &self,
        event: &str,
        config: &FormConfig,
        state: impl FnOnce() -> FormResult<FieldState>,
    ) -> FormResult<bool> {
        Ok(match self {
            Self::Inherit => config.events.iter().any(|e| e == event),
            Self::Fixed(events) => events.iter().any(|e| e == event),
            Self::Dynamic(f) => f(&state()?).iter().any(|e| e == event),
        })
    }
}

impl fmt::Debug for EventPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inherit => write!(f, "Inherit"),
            Self::Fixed(events) => f.debug_tuple("Fixed").field(events).finish(),
            Self::Dynamic(_) => write!(f, "Dynamic(<fn>)"),
        }
    }
}

/// How one named field participates in validation.
///
/// ```
/// use formwork::{EventPolicy, FieldBinding};
///
/// let binding = FieldBinding::new("name.first")?
///     .validates(["name.first", "name.last"])?
///     .events(EventPolicy::fixed(["blurred"]))
///     .group("personal");
/// assert_eq!(binding.targets().len(), 2);
/// # Ok::<(), formwork::FormError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FieldBinding {
    pub name: Path,
    pub events: EventPolicy,
    /// Paths validated instead of `name` when this field triggers.
    pub validates: Option<Vec<Path>>,
    /// Read only the exact path's errors for this field.
    pub exclusive: bool,
    /// Overrides the form's `no_validate` when set.
    pub no_validate: Option<bool>,
    /// Trigger groups this field answers to.
    pub groups: Vec<String>,
}

impl FieldBinding {
    pub fn new(name: impl IntoPath) -> FormResult<Self> {
        Ok(Self::at(name.into_path()?))
    }

    pub(crate) fn at(name: Path) -> Self {
        Self {
            name,
            events: EventPolicy::Inherit,
            validates: None,
            exclusive: false,
            no_validate: None,
            groups: Vec::new(),
        }
    }

    pub fn events(mut self, events: EventPolicy) -> Self {
        self.events = events;
        self
    }

    pub fn validates<I, P>(mut self, paths: I) -> FormResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: IntoPath,
    {
        let paths = paths
            .into_iter()
            .map(IntoPath::into_path)
            .collect::<FormResult<Vec<_>>>()?;
        self.validates = Some(paths);
        Ok(self)
    }

    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    pub fn no_validate(mut self, no_validate: bool) -> Self {
        self.no_validate = Some(no_validate);
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Paths this field asks to validate.
    pub fn targets(&self) -> Vec<Path> {
        match &self.validates {
            Some(paths) => paths.clone(),
            None => vec![self.name.clone()],
        }
    }

    pub(crate) fn validation_disabled(&self, config: &FormConfig) -> bool {
        self.no_validate.unwrap_or(config.no_validate)
    }

    pub(crate) fn policy(&self, config: &FormConfig) -> ErrorPolicy {
        if self.exclusive {
            ErrorPolicy::Exclusive
        } else {
            config.policy
        }
    }

    pub(crate) fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

/// Group name that addresses the whole form.
pub const ALL_GROUP: &str = "@all";

/// A set of fields a non-field control can ask to validate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerGroup {
    /// The whole form.
    All,
    /// Fields registered under this name.
    Named(String),
}

impl From<&str> for TriggerGroup {
    fn from(name: &str) -> Self {
        if name == ALL_GROUP {
            Self::All
        } else {
            Self::Named(name.to_string())
        }
    }
}

impl From<String> for TriggerGroup {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl fmt::Display for TriggerGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "{}", ALL_GROUP),
            Self::Named(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: FormConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, FormConfig::default());
        assert_eq!(config.policy, ErrorPolicy::Inclusive);
    }

    #[test]
    fn test_binding_overrides_form_settings() {
        let config = FormConfig::new().with_no_validate(true);
        let binding = FieldBinding::at(path!("a"));
        assert!(binding.validation_disabled(&config));
        assert!(!binding.clone().no_validate(false).validation_disabled(&config));
        assert_eq!(
            binding.exclusive(true).policy(&config),
            ErrorPolicy::Exclusive
        );
    }

    #[test]
    fn test_trigger_group_names() {
        assert_eq!(TriggerGroup::from("@all"), TriggerGroup::All);
        assert_eq!(
            TriggerGroup::from("billing"),
            TriggerGroup::Named("billing".to_string())
        );
    }
}
