//! Per-path validation errors.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::rekey;
use crate::path::Path;
use crate::validation::ValidationTarget;

/// A single validation error attached to a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Human-readable message.
    pub message: String,
    /// Optional machine-readable code (e.g. `required`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = &self.code {
            write!(f, "{} ({})", self.message, code)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl From<&str> for FieldError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for FieldError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Insertion-ordered mapping from path to its errors.
pub type ErrorMap = IndexMap<Path, Vec<FieldError>>;

/// Whether descendant errors surface on an ancestor path when read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Only errors stored for the exact path.
    Exclusive,
    /// Errors for the path, then errors of every stored descendant.
    #[default]
    Inclusive,
}

/// What a merge did to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Paths whose entry was written or removed.
    pub changed: Vec<Path>,
    /// In-scope paths left alone because the caller's filter refused them.
    pub skipped: usize,
}

/// Mapping from path to ordered error list.
///
/// A stored path was the exact target of a failed validation; no path is
/// ever stored with an empty list (absence means valid).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorStore {
    entries: ErrorMap,
}

impl ErrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a map, dropping empty entries.
    pub fn from_map(map: ErrorMap) -> Self {
        let entries = map.into_iter().filter(|(_, errs)| !errs.is_empty()).collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Vec<FieldError>)> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys()
    }

    /// Snapshot of every stored entry.
    pub fn to_map(&self) -> ErrorMap {
        self.entries.clone()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Exact entry for `path`.
    pub fn get(&self, path: &Path) -> Option<&[FieldError]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Replace the entry for exactly `path`. An empty list removes it.
    ///
    /// Returns `true` if the store changed.
    pub fn set_errors_for_path(&mut self, path: Path, errors: Vec<FieldError>) -> bool {
        if errors.is_empty() {
            self.entries.shift_remove(&path).is_some()
        } else if self.entries.get(&path) == Some(&errors) {
            false
        } else {
            self.entries.insert(path, errors);
            true
        }
    }

    /// Fold a validator result into the store.
    ///
    /// Every in-scope path present in `result` is replaced; every in-scope
    /// stored path absent from `result` is removed, so a re-validated path is
    /// never left with stale errors. Result entries outside `scope` are
    /// ignored.
    pub fn merge_validation_result(
        &mut self,
        scope: &ValidationTarget,
        result: ErrorMap,
    ) -> MergeReport {
        self.merge_validation_result_where(scope, result, |_| true)
    }

    /// Like [`merge_validation_result`](Self::merge_validation_result), but
    /// only touches paths for which `allow` returns `true`.
    pub fn merge_validation_result_where(
        &mut self,
        scope: &ValidationTarget,
        result: ErrorMap,
        mut allow: impl FnMut(&Path) -> bool,
    ) -> MergeReport {
        let mut report = MergeReport::default();

        let cleared: Vec<Path> = self
            .entries
            .keys()
            .filter(|p| scope.covers(p) && !result.get(*p).is_some_and(|e| !e.is_empty()))
            .cloned()
            .collect();
        for path in cleared {
            if allow(&path) {
                self.entries.shift_remove(&path);
                report.changed.push(path);
            } else {
                report.skipped += 1;
            }
        }

        for (path, errors) in result {
            if errors.is_empty() || !scope.covers(&path) {
                continue;
            }
            if !allow(&path) {
                report.skipped += 1;
                continue;
            }
            if self.set_errors_for_path(path.clone(), errors) {
                report.changed.push(path);
            }
        }

        report
    }

    /// Errors visible at `path` under `policy`.
    ///
    /// Inclusive reads return the exact entry first, then the entries of
    /// every stored strict descendant in insertion order.
    pub fn read(&self, path: &Path, policy: ErrorPolicy) -> Vec<FieldError> {
        let mut out: Vec<FieldError> = self.get(path).map(<[_]>::to_vec).unwrap_or_default();
        if policy == ErrorPolicy::Inclusive {
            for (stored, errors) in &self.entries {
                if path.is_strict_prefix_of(stored) {
                    out.extend(errors.iter().cloned());
                }
            }
        }
        out
    }

    /// Entries visible at `path` under `policy`, keyed by their own path.
    pub fn read_map(&self, path: &Path, policy: ErrorPolicy) -> ErrorMap {
        self.entries
            .iter()
            .filter(|(stored, _)| match policy {
                ErrorPolicy::Exclusive => *stored == path,
                ErrorPolicy::Inclusive => path.is_prefix_of(stored),
            })
            .map(|(p, e)| (p.clone(), e.clone()))
            .collect()
    }

    /// Distinct messages visible at `path`, in first-seen order.
    pub fn messages(&self, path: &Path, policy: ErrorPolicy) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for error in self.read(path, policy) {
            if !seen.contains(&error.message) {
                seen.push(error.message);
            }
        }
        seen
    }

    /// Returns `true` if anything is visible at `path` under `policy`.
    pub fn has_errors(&self, path: &Path, policy: ErrorPolicy) -> bool {
        match policy {
            ErrorPolicy::Exclusive => self.entries.contains_key(path),
            ErrorPolicy::Inclusive => self.entries.keys().any(|p| path.is_prefix_of(p)),
        }
    }

    /// Renumber entries after the element at `removed` was deleted from the
    /// array at `array_path`.
    ///
    /// Entries of the removed element are dropped; later elements move down
    /// one index. Collisions concatenate the lists.
    pub fn reindex_under_array(&mut self, array_path: &Path, removed: usize) {
        self.remap(|p| p.shift_index(array_path, removed));
    }

    /// Rekey every entry with `f`; `None` drops the entry.
    pub(crate) fn remap(&mut self, f: impl FnMut(&Path) -> Option<Path>) {
        let entries = std::mem::take(&mut self.entries);
        self.entries = rekey(entries, f, |into, from| into.extend(from));
    }
}
