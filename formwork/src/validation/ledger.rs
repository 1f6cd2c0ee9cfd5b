//! Issue-order bookkeeping for validation results.

use indexmap::IndexMap;

use super::ValidationTarget;
use crate::path::Path;
use crate::store::rekey;

/// Highest applied issue sequence per path.
///
/// A result issued at sequence `s` may only write a path if no result with a
/// higher sequence has already been applied to that path, one of its
/// ancestors, or the whole form.
#[derive(Debug, Clone, Default)]
pub(crate) struct IssueLedger {
    whole_form: u64,
    paths: IndexMap<Path, u64>,
}

impl IssueLedger {
    /// A ledger that treats every sequence below `floor` as superseded.
    pub(crate) fn starting_at(floor: u64) -> Self {
        Self {
            whole_form: floor,
            paths: IndexMap::new(),
        }
    }

    fn effective(&self, path: &Path) -> u64 {
        self.paths
            .iter()
            .filter(|(p, _)| p.is_prefix_of(path))
            .map(|(_, seq)| *seq)
            .fold(self.whole_form, u64::max)
    }

    /// May a result issued at `seq` write `path`?
    pub(crate) fn allows(&self, path: &Path, seq: u64) -> bool {
        self.effective(path) <= seq
    }

    /// Has every part of `target` already been covered by a later result?
    pub(crate) fn is_stale(&self, target: &ValidationTarget, seq: u64) -> bool {
        match target {
            ValidationTarget::All => self.whole_form > seq,
            ValidationTarget::Paths(paths) => {
                !paths.is_empty() && paths.iter().all(|p| !self.allows(p, seq))
            }
        }
    }

    pub(crate) fn record(&mut self, target: &ValidationTarget, seq: u64) {
        match target {
            ValidationTarget::All => self.whole_form = self.whole_form.max(seq),
            ValidationTarget::Paths(paths) => {
                for path in paths {
                    let entry = self.paths.entry(path.clone()).or_insert(0);
                    *entry = (*entry).max(seq);
                }
            }
        }
    }

    pub(crate) fn remap(&mut self, f: impl FnMut(&Path) -> Option<Path>) {
        let paths = std::mem::take(&mut self.paths);
        self.paths = rekey(paths, f, |into, from| *into = (*into).max(from));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    #[test]
    fn test_later_whole_form_supersedes_field() {
        let mut ledger = IssueLedger::default();
        ledger.record(&ValidationTarget::All, 2);

        let field = ValidationTarget::paths([path!("a")]);
        assert!(ledger.is_stale(&field, 1));
        assert!(!ledger.allows(&path!("a"), 1));
        assert!(ledger.allows(&path!("a"), 3));
    }

    #[test]
    fn test_later_field_only_guards_its_subtree() {
        let mut ledger = IssueLedger::default();
        ledger.record(&ValidationTarget::paths([path!("name")]), 5);

        assert!(!ledger.allows(&path!("name", "first"), 4));
        assert!(ledger.allows(&path!("email"), 4));
        assert!(!ledger.is_stale(&ValidationTarget::All, 4));
    }

    #[test]
    fn test_floor() {
        let ledger = IssueLedger::starting_at(10);
        assert!(ledger.is_stale(&ValidationTarget::All, 9));
        assert!(!ledger.is_stale(&ValidationTarget::All, 10));
    }
}
