//! What a validation pass covers.

use std::collections::BTreeSet;
use std::fmt;

use crate::path::Path;

/// The set of paths a validation pass is asked to cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationTarget {
    /// The whole form, with no path filter.
    All,
    /// Specific paths; each covers itself and everything below it.
    Paths(BTreeSet<Path>),
}

impl ValidationTarget {
    /// A target covering the given paths.
    pub fn paths(paths: impl IntoIterator<Item = Path>) -> Self {
        Self::Paths(paths.into_iter().collect())
    }

    /// Returns `true` if this is a whole-form target.
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Returns `true` when nothing would be validated.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::All => false,
            Self::Paths(paths) => paths.is_empty(),
        }
    }

    /// Returns `true` if a result for `path` belongs to this target.
    pub fn covers(&self, path: &Path) -> bool {
        match self {
            Self::All => true,
            Self::Paths(paths) => paths.iter().any(|p| p.is_prefix_of(path)),
        }
    }

    /// Merge another target into this one. `All` absorbs everything.
    pub fn union(&mut self, other: ValidationTarget) {
        match (&mut *self, other) {
            (Self::All, _) => {}
            (_, Self::All) => *self = Self::All,
            (Self::Paths(mine), Self::Paths(theirs)) => mine.extend(theirs),
        }
    }

    /// The requested paths, or `None` for a whole-form target.
    pub fn as_paths(&self) -> Option<&BTreeSet<Path>> {
        match self {
            Self::All => None,
            Self::Paths(paths) => Some(paths),
        }
    }
}

impl fmt::Display for ValidationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "<all>"),
            Self::Paths(paths) => {
                let names: Vec<String> = paths.iter().map(Path::to_string).collect();
                write!(f, "[{}]", names.join(", "))
            }
        }
    }
}

/// One field-level request to (re)validate some paths.
///
/// Requests only live until the end of the tick they were raised in; the
/// orchestrator folds all requests of a tick into one validator call.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub target: ValidationTarget,
    pub origin_event: String,
}

impl ValidationRequest {
    pub fn new(target: ValidationTarget, origin_event: impl Into<String>) -> Self {
        Self {
            target,
            origin_event: origin_event.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    #[test]
    fn test_union_of_paths() {
        let mut t = ValidationTarget::paths([path!("a")]);
        t.union(ValidationTarget::paths([path!("a"), path!("b")]));
        assert_eq!(t, ValidationTarget::paths([path!("a"), path!("b")]));
    }

    #[test]
    fn test_all_absorbs() {
        let mut t = ValidationTarget::paths([path!("a")]);
        t.union(ValidationTarget::All);
        assert!(t.is_all());
        t.union(ValidationTarget::paths([path!("b")]));
        assert!(t.is_all());
    }

    #[test]
    fn test_covers_descendants() {
        let t = ValidationTarget::paths([path!("name")]);
        assert!(t.covers(&path!("name")));
        assert!(t.covers(&path!("name", "first")));
        assert!(!t.covers(&path!("names")));
        assert!(!t.covers(&Path::root()));
    }
}
