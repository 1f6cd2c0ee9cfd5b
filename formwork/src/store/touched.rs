//! Which paths the user has interacted with.

use indexmap::IndexMap;

use super::rekey;
use crate::path::Path;

/// Mapping from path to its touched flag.
///
/// A path becomes touched the first time a validation-triggering event
/// targets it. Flags are only cleared by a reset or when the array element
/// they belong to is removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchedSet {
    flags: IndexMap<Path, bool>,
}

impl TouchedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `paths` touched, returning the ones that were not touched before.
    pub fn touch<'a>(&mut self, paths: impl IntoIterator<Item = &'a Path>) -> Vec<Path> {
        let mut newly = Vec::new();
        for path in paths {
            let flag = self.flags.entry(path.clone()).or_insert(false);
            if !*flag {
                *flag = true;
                newly.push(path.clone());
            }
        }
        newly
    }

    /// Touched flag for exactly `path`.
    pub fn is_touched(&self, path: &Path) -> bool {
        self.flags.get(path).copied().unwrap_or(false)
    }

    /// Returns `true` if `path` or anything below it is touched.
    pub fn any_touched_within(&self, path: &Path) -> bool {
        self.flags.iter().any(|(p, t)| *t && path.is_prefix_of(p))
    }

    pub fn touched_paths(&self) -> impl Iterator<Item = &Path> {
        self.flags.iter().filter(|(_, t)| **t).map(|(p, _)| p)
    }

    pub fn is_empty(&self) -> bool {
        !self.flags.values().any(|t| *t)
    }

    pub fn clear(&mut self) {
        self.flags.clear();
    }

    /// Same shift rule as [`ErrorStore::reindex_under_array`](super::ErrorStore::reindex_under_array).
    pub fn reindex_under_array(&mut self, array_path: &Path, removed: usize) {
        self.remap(|p| p.shift_index(array_path, removed));
    }

    pub(crate) fn remap(&mut self, f: impl FnMut(&Path) -> Option<Path>) {
        let flags = std::mem::take(&mut self.flags);
        self.flags = rekey(flags, f, |into, from| *into |= from);
    }
}
