//! Immutable reads and writes into a form value by path.
//!
//! Every write takes the current tree by reference and returns a new tree;
//! the input is never modified, so earlier snapshots stay valid.

use serde_json::{Map, Value};

use crate::error::{FormError, FormResult};
use crate::path::{Path, Seg};

/// Name of a JSON value's type, for error messages.
pub fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(path: &Path, seg: &Seg, found: &Value) -> FormError {
    let reason = match seg {
        Seg::Key(k) => format!("field '{}' addressed on {}", k, value_type_name(found)),
        Seg::Index(i) => format!("index {} addressed on {}", i, value_type_name(found)),
    };
    FormError::invalid_path(path.to_string(), reason)
}

/// Read the value at `path`.
///
/// Missing keys, out-of-range indices, `null` and scalars along the way all
/// yield `Ok(None)`. A `null` leaf also reads as `None`: JSON has no holes, so
/// the `null` padding [`set`] leaves in arrays must read the same as a slot
/// that was never there. Addressing an array by field name, or an object by
/// index, is an `InvalidPath` error.
///
/// ```
/// use formwork::{path, value};
/// use serde_json::json;
///
/// let tree = json!({"colors": [{"name": "red"}]});
/// assert_eq!(value::get(&tree, &path!("colors", 0usize, "name")).unwrap(), Some(&json!("red")));
/// assert_eq!(value::get(&tree, &path!("missing", "deeper")).unwrap(), None);
/// ```
pub fn get<'a>(tree: &'a Value, path: &Path) -> FormResult<Option<&'a Value>> {
    let mut current = tree;
    for seg in path {
        current = match (seg, current) {
            (Seg::Key(k), Value::Object(obj)) => match obj.get(k) {
                Some(v) => v,
                None => return Ok(None),
            },
            (Seg::Index(i), Value::Array(arr)) => match arr.get(*i) {
                Some(v) => v,
                None => return Ok(None),
            },
            (Seg::Key(_), Value::Array(_)) | (Seg::Index(_), Value::Object(_)) => {
                return Err(mismatch(path, seg, current));
            }
            _ => return Ok(None),
        };
    }
    if current.is_null() {
        return Ok(None);
    }
    Ok(Some(current))
}

/// Return a new tree with the value at `path` replaced.
///
/// Missing or `null` intermediates are created: objects for field segments,
/// arrays for index segments (padded with `null`, which [`get`] reads as
/// absent). Writing through a scalar,
/// or with a mismatched container, is an `InvalidPath` error.
pub fn set(tree: &Value, path: &Path, value: Value) -> FormResult<Value> {
    let mut result = tree.clone();
    set_in_place(&mut result, path, value)?;
    Ok(result)
}

/// Apply several writes at once; either all succeed or the input is returned
/// untouched through the error.
pub fn set_many<'p>(
    tree: &Value,
    writes: impl IntoIterator<Item = (&'p Path, Value)>,
) -> FormResult<Value> {
    let mut result = tree.clone();
    for (path, value) in writes {
        set_in_place(&mut result, path, value)?;
    }
    Ok(result)
}

fn set_in_place(doc: &mut Value, path: &Path, value: Value) -> FormResult<()> {
    set_at(doc, path.segments(), value, path)
}

fn set_at(current: &mut Value, segments: &[Seg], value: Value, full_path: &Path) -> FormResult<()> {
    let Some((seg, rest)) = segments.split_first() else {
        *current = value;
        return Ok(());
    };

    match seg {
        Seg::Key(key) => {
            if current.is_null() {
                *current = Value::Object(Map::new());
            }
            let Value::Object(obj) = current else {
                return Err(mismatch(full_path, seg, current));
            };
            let entry = obj.entry(key.clone()).or_insert(Value::Null);
            set_at(entry, rest, value, full_path)
        }
        Seg::Index(idx) => {
            if current.is_null() {
                *current = Value::Array(Vec::new());
            }
            let Value::Array(arr) = current else {
                return Err(mismatch(full_path, seg, current));
            };
            if *idx >= arr.len() {
                arr.resize(*idx + 1, Value::Null);
            }
            set_at(&mut arr[*idx], rest, value, full_path)
        }
    }
}

/// Read the array at `path`, treating a missing value as an empty array.
fn array_at(tree: &Value, path: &Path) -> FormResult<Vec<Value>> {
    match get(tree, path)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(other) => Err(FormError::invalid_path(
            path.to_string(),
            format!("expected array, found {}", value_type_name(other)),
        )),
    }
}

fn out_of_range(path: &Path, index: usize, len: usize) -> FormError {
    FormError::invalid_path(
        path.to_string(),
        format!("index {} out of bounds (len: {})", index, len),
    )
}

/// Return a new tree with `item` spliced into the array at `path` before
/// `index`. `index == len` appends.
pub fn insert_at(tree: &Value, path: &Path, index: usize, item: Value) -> FormResult<Value> {
    let mut items = array_at(tree, path)?;
    if index > items.len() {
        return Err(out_of_range(path, index, items.len()));
    }
    items.insert(index, item);
    set(tree, path, Value::Array(items))
}

/// Return a new tree with exactly one element removed from the array at
/// `path`, along with the removed element.
pub fn remove_at(tree: &Value, path: &Path, index: usize) -> FormResult<(Value, Value)> {
    let mut items = array_at(tree, path)?;
    if index >= items.len() {
        return Err(out_of_range(path, index, items.len()));
    }
    let removed = items.remove(index);
    Ok((set(tree, path, Value::Array(items))?, removed))
}

/// Return a new tree with the element at `from` moved to `to`.
pub fn move_item(tree: &Value, path: &Path, from: usize, to: usize) -> FormResult<Value> {
    let mut items = array_at(tree, path)?;
    let len = items.len();
    if from >= len {
        return Err(out_of_range(path, from, len));
    }
    if to >= len {
        return Err(out_of_range(path, to, len));
    }
    let item = items.remove(from);
    items.insert(to, item);
    set(tree, path, Value::Array(items))
}

/// Return a new tree with the elements at `a` and `b` exchanged.
pub fn swap_items(tree: &Value, path: &Path, a: usize, b: usize) -> FormResult<Value> {
    let mut items = array_at(tree, path)?;
    let len = items.len();
    for idx in [a, b] {
        if idx >= len {
            return Err(out_of_range(path, idx, len));
        }
    }
    items.swap(a, b);
    set(tree, path, Value::Array(items))
}

/// Length of the array at `path` (0 when missing).
pub fn array_len(tree: &Value, path: &Path) -> FormResult<usize> {
    Ok(array_at(tree, path)?.len())
}

/// Position of the first element of the array at `path` equal to `item`.
pub fn position_of(tree: &Value, path: &Path, item: &Value) -> FormResult<Option<usize>> {
    Ok(array_at(tree, path)?.iter().position(|v| v == item))
}
