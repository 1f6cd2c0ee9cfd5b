//! Side tables keyed by path, and the state bundle a form owns.

mod errors;
mod touched;

use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

pub use errors::{ErrorMap, ErrorPolicy, ErrorStore, FieldError, MergeReport};
pub use touched::TouchedSet;

use crate::path::Path;
use crate::submit::SubmitMeta;
use crate::validation::IssueLedger;

/// Rebuild `map` with every key passed through `f`, keeping relative order.
///
/// Keys mapped to `None` are dropped; keys mapped onto an existing key are
/// folded into it with `merge`.
pub(crate) fn rekey<K: Hash + Eq, V>(
    map: IndexMap<K, V>,
    mut f: impl FnMut(&K) -> Option<K>,
    mut merge: impl FnMut(&mut V, V),
) -> IndexMap<K, V> {
    let mut out = IndexMap::with_capacity(map.len());
    for (key, value) in map {
        let Some(new_key) = f(&key) else {
            continue;
        };
        match out.get_mut(&new_key) {
            Some(existing) => merge(existing, value),
            None => {
                out.insert(new_key, value);
            }
        }
    }
    out
}

/// Everything a form instance owns, replaced as a unit on reset.
///
/// Lives behind a single [`StateCell`](crate::state::StateCell) so every
/// mutation (an error merge, an array splice with its reindex) is applied in
/// one write and readers never observe a half-applied change.
#[derive(Debug, Clone)]
pub struct FormData {
    pub value: Arc<Value>,
    pub errors: ErrorStore,
    pub touched: TouchedSet,
    pub submit: SubmitMeta,
    pub(crate) ledger: IssueLedger,
    /// Bumped on every reset.
    pub(crate) epoch: u64,
}

impl FormData {
    pub fn new(value: Value, errors: ErrorStore) -> Self {
        Self {
            value: Arc::new(value),
            errors,
            touched: TouchedSet::new(),
            submit: SubmitMeta::default(),
            ledger: IssueLedger::default(),
            epoch: 0,
        }
    }

    /// Apply `f` to every path-keyed side table.
    pub(crate) fn remap_paths(&mut self, f: impl Fn(&Path) -> Option<Path>) {
        self.errors.remap(&f);
        self.touched.remap(&f);
        self.ledger.remap(&f);
    }
}
