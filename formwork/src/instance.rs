//! Form instance identity.

use uuid::Uuid;

/// Unique identifier for a form instance, used to correlate log lines and
/// change events.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FormId(Uuid);

impl FormId {
    /// Create a new unique form ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for FormId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FormId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
