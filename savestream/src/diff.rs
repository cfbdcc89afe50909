//! Structural JSON diff between two info objects.
//!
//! Computes and applies a compact, order-stable patch describing how to
//! transform one JSON value into another, using three operation kinds:
//! add a key/index, remove a key/index, or change an existing value.
//! Unlike RFC 6902 `json-patch`, there is no `move`/`copy`/`test` — those
//! are never produced, which keeps `apply` a straightforward structural
//! walk rather than a general patch interpreter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SavestreamError};

/// A single path segment: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

pub type Path = Vec<PathSegment>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum DiffOp {
    Add { path: Path, value: Value },
    Remove { path: Path },
    Change { path: Path, old: Value, new: Value },
}

/// An ordered sequence of [`DiffOp`]s transforming one info object into
/// another. Serializes as a compact JSON array, UTF-8 encoded for use as
/// a frame's `info_patch` field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfoPatch(pub Vec<DiffOp>);

impl InfoPatch {
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("InfoPatch always serializes")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| SavestreamError::MalformedStream {
            reason: "info_patch is not a valid diff",
            detail: e.to_string(),
        })
    }
}

/// Compute a structural diff transforming `before` into `after`.
///
/// Both values are expected to be JSON objects or arrays at the root for
/// any nontrivial recursion to occur; scalars at the root produce a
/// single `Change` (or `Add`/`Remove` if one side is absent, which never
/// happens at the root since both arguments are always present here).
pub fn diff(before: &Value, after: &Value) -> InfoPatch {
    let mut ops = Vec::new();
    diff_into(&mut Vec::new(), before, after, &mut ops);
    InfoPatch(ops)
}

fn diff_into(path: &mut Path, before: &Value, after: &Value, ops: &mut Vec<DiffOp>) {
    match (before, after) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, before_value) in a {
                path.push(PathSegment::Key(key.clone()));
                match b.get(key) {
                    Some(after_value) => diff_into(path, before_value, after_value, ops),
                    None => ops.push(DiffOp::Remove { path: path.clone() }),
                }
                path.pop();
            }
            for (key, after_value) in b {
                if !a.contains_key(key) {
                    path.push(PathSegment::Key(key.clone()));
                    ops.push(DiffOp::Add {
                        path: path.clone(),
                        value: after_value.clone(),
                    });
                    path.pop();
                }
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            let common = a.len().min(b.len());
            for i in 0..common {
                path.push(PathSegment::Index(i));
                diff_into(path, &a[i], &b[i], ops);
                path.pop();
            }
            for i in common..a.len() {
                // Remove from the end first so indices stay valid on apply.
                path.push(PathSegment::Index(a.len() - 1 - (i - common)));
                ops.push(DiffOp::Remove { path: path.clone() });
                path.pop();
            }
            for (offset, item) in b[common..].iter().enumerate() {
                path.push(PathSegment::Index(common + offset));
                ops.push(DiffOp::Add {
                    path: path.clone(),
                    value: item.clone(),
                });
                path.pop();
            }
        }
        _ if before != after => ops.push(DiffOp::Change {
            path: path.clone(),
            old: before.clone(),
            new: after.clone(),
        }),
        _ => {}
    }
}

/// Apply `patch` to `before`, returning the resulting value.
///
/// Ops are applied in order; each must find its path already present
/// (for `Remove`/`Change`) or its parent present (for `Add`).
pub fn apply(patch: &InfoPatch, before: &Value) -> Result<Value> {
    let mut current = before.clone();
    for op in &patch.0 {
        apply_op(&mut current, op)?;
    }
    Ok(current)
}

fn apply_op(root: &mut Value, op: &DiffOp) -> Result<()> {
    match op {
        DiffOp::Add { path, value } => set_at(root, path, value.clone(), true),
        DiffOp::Change { path, new, .. } => set_at(root, path, new.clone(), false),
        DiffOp::Remove { path } => remove_at(root, path),
    }
}

fn bad_patch(detail: impl Into<String>) -> SavestreamError {
    SavestreamError::MalformedStream {
        reason: "info_patch not applicable to prior info",
        detail: detail.into(),
    }
}

fn navigate<'a>(root: &'a mut Value, path: &[PathSegment]) -> Result<&'a mut Value> {
    let mut current = root;
    for segment in path {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map
                .get_mut(key)
                .ok_or_else(|| bad_patch(format!("missing key {key:?}")))?,
            (PathSegment::Index(idx), Value::Array(arr)) => arr
                .get_mut(*idx)
                .ok_or_else(|| bad_patch(format!("missing index {idx}")))?,
            _ => return Err(bad_patch("path type mismatch")),
        };
    }
    Ok(current)
}

fn set_at(root: &mut Value, path: &[PathSegment], value: Value, is_add: bool) -> Result<()> {
    let Some((last, parent_path)) = path.split_last() else {
        *root = value;
        return Ok(());
    };
    let parent = navigate(root, parent_path)?;
    match (last, parent) {
        (PathSegment::Key(key), Value::Object(map)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (PathSegment::Index(idx), Value::Array(arr)) => {
            if is_add {
                if *idx > arr.len() {
                    return Err(bad_patch(format!("add index {idx} out of range")));
                }
                arr.insert(*idx, value);
            } else {
                let slot = arr
                    .get_mut(*idx)
                    .ok_or_else(|| bad_patch(format!("missing index {idx}")))?;
                *slot = value;
            }
            Ok(())
        }
        _ => Err(bad_patch("path type mismatch")),
    }
}

fn remove_at(root: &mut Value, path: &[PathSegment]) -> Result<()> {
    let Some((last, parent_path)) = path.split_last() else {
        *root = Value::Null;
        return Ok(());
    };
    let parent = navigate(root, parent_path)?;
    match (last, parent) {
        (PathSegment::Key(key), Value::Object(map)) => {
            map.remove(key)
                .ok_or_else(|| bad_patch(format!("missing key {key:?}")))?;
            Ok(())
        }
        (PathSegment::Index(idx), Value::Array(arr)) => {
            if *idx >= arr.len() {
                return Err(bad_patch(format!("remove index {idx} out of range")));
            }
            arr.remove(*idx);
            Ok(())
        }
        _ => Err(bad_patch("path type mismatch")),
    }
}

/// Equality for JSON values modulo key ordering, used by tests and callers
/// verifying `apply(diff(a, b), a) == b` without relying on serialized
/// text (object key order is insignificant per spec).
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|bv| json_eq(v, bv)))
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| json_eq(x, y))
        }
        _ => a == b,
    }
}
