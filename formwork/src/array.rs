//! Structural edits on array-valued paths.
//!
//! Side tables (errors, touched flags, the issue ledger) are keyed by
//! positional index, so every splice is followed by an explicit reindex pass
//! in the same write as the value change.

use std::ops::RangeInclusive;
use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::error::{FormError, FormResult};
use crate::event::EventSender;
use crate::path::Path;
use crate::state::StateCell;
use crate::store::FormData;
use crate::value;

/// Result of an array edit.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayEdit {
    /// The new form value.
    pub value: Arc<Value>,
    /// Element paths whose position identity changed, for optional
    /// revalidation by the caller.
    pub affected_paths: Vec<Path>,
}

/// Where the element at `index` ends up after moving `from` to `to`.
fn moved_index(index: usize, from: usize, to: usize) -> usize {
    if index == from {
        return to;
    }
    let shifted = if index > from { index - 1 } else { index };
    if shifted >= to { shifted + 1 } else { shifted }
}

fn element_paths(array: &Path, span: impl Iterator<Item = usize>) -> Vec<Path> {
    span.map(|i| array.child(i)).collect()
}

fn span(a: usize, b: usize) -> RangeInclusive<usize> {
    a.min(b)..=a.max(b)
}

pub(crate) struct FieldArrayManager {
    data: StateCell<FormData>,
    events: EventSender,
}

impl FieldArrayManager {
    pub(crate) fn new(data: StateCell<FormData>, events: EventSender) -> Self {
        Self { data, events }
    }

    /// Splice `item` in before `index`. Existing side-table entries are left
    /// where they are.
    pub(crate) fn insert(&self, array: &Path, index: usize, item: Value) -> FormResult<ArrayEdit> {
        self.commit(array, "insert", |d| {
            let next = value::insert_at(&d.value, array, index, item)?;
            let len = value::array_len(&next, array)?;
            d.value = Arc::new(next);
            Ok(element_paths(array, index..len))
        })
    }

    pub(crate) fn push(&self, array: &Path, item: Value) -> FormResult<ArrayEdit> {
        let len = self.data.read(|d| value::array_len(&d.value, array))?;
        self.insert(array, len, item)
    }

    pub(crate) fn unshift(&self, array: &Path, item: Value) -> FormResult<ArrayEdit> {
        self.insert(array, 0, item)
    }

    /// Delete exactly one element; later entries move down one index and the
    /// removed element's entries are dropped.
    pub(crate) fn remove(&self, array: &Path, index: usize) -> FormResult<ArrayEdit> {
        self.commit(array, "remove", |d| {
            let old_len = value::array_len(&d.value, array)?;
            let (next, _removed) = value::remove_at(&d.value, array, index)?;
            d.value = Arc::new(next);
            d.remap_paths(|p| p.shift_index(array, index));
            Ok(element_paths(array, index..old_len))
        })
    }

    /// Remove the first element equal to `item`. `None` if there is none.
    pub(crate) fn remove_value(&self, array: &Path, item: &Value) -> FormResult<Option<ArrayEdit>> {
        let position = self.data.read(|d| value::position_of(&d.value, array, item))?;
        position.map(|index| self.remove(array, index)).transpose()
    }

    /// Move the element at `from` to `to`; its entries travel with it and
    /// every other element's entries follow their element.
    pub(crate) fn move_item(&self, array: &Path, from: usize, to: usize) -> FormResult<ArrayEdit> {
        self.commit(array, "move", |d| {
            let next = value::move_item(&d.value, array, from, to)?;
            d.value = Arc::new(next);
            if from != to {
                d.remap_paths(|p| p.remap_index(array, |i| Some(moved_index(i, from, to))));
            }
            Ok(element_paths(array, span(from, to)))
        })
    }

    /// Exchange two elements along with their entries.
    pub(crate) fn swap(&self, array: &Path, a: usize, b: usize) -> FormResult<ArrayEdit> {
        self.commit(array, "swap", |d| {
            let next = value::swap_items(&d.value, array, a, b)?;
            d.value = Arc::new(next);
            if a != b {
                d.remap_paths(|p| {
                    p.remap_index(array, |i| {
                        Some(match i {
                            i if i == a => b,
                            i if i == b => a,
                            i => i,
                        })
                    })
                });
            }
            Ok(element_paths(array, span(a, b)))
        })
    }

    /// Apply `edit` in one write; on error nothing is changed.
    fn commit(
        &self,
        array: &Path,
        op: &str,
        edit: impl FnOnce(&mut FormData) -> FormResult<Vec<Path>>,
    ) -> FormResult<ArrayEdit> {
        let (result, errors_moved) = self.data.update(|d| {
            let mut staged = d.clone();
            let affected = edit(&mut staged)?;
            let errors_moved = staged.errors != d.errors;
            *d = staged;
            Ok::<_, FormError>((
                ArrayEdit {
                    value: Arc::clone(&d.value),
                    affected_paths: affected,
                },
                errors_moved,
            ))
        })?;

        debug!(
            "[{}] array {} on {}: {} affected path(s)",
            self.events.form(),
            op,
            array,
            result.affected_paths.len()
        );
        self.events.value_changed(vec![array.clone()]);
        if errors_moved {
            self.events.errors_changed(vec![array.clone()]);
        }
        Ok(result)
    }
}
