//! Shape classification for raw and typed streams.
//!
//! The classification decides which normalization walk applies: streams with
//! compound elements need the budgeted, weight-by-weight walk.

use serde::Serialize;
use serde_json::Value;

use crate::{value::Events, LilyweaveError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dimension {
    Atomic,
    FlatSequence,
    /// A sequence with at least one compound element at the top level.
    CompoundSequence,
}

/// Nesting depth of a raw value: 0 for a scalar, 1 for an empty or flat
/// sequence, one more for each level of nested sequences below that.
///
/// `null`, booleans and objects have no depth and are rejected.
pub fn depth(value: &Value) -> Result<usize> {
    match value {
        Value::Number(_) | Value::String(_) => Ok(0),
        Value::Array(items) => {
            let mut deepest = 0;
            for item in items {
                deepest = deepest.max(depth(item)?);
            }
            Ok(1 + deepest)
        }
        other => Err(LilyweaveError::shape(format!(
            "expected a number, a string or a sequence, found {other}"
        ))),
    }
}

/// Classifies a raw value, validating every nested element on the way.
pub fn classify(value: &Value) -> Result<Dimension> {
    depth(value)?;
    match value {
        Value::Array(items) if items.iter().any(is_compound_shape) => {
            Ok(Dimension::CompoundSequence)
        }
        Value::Array(_) => Ok(Dimension::FlatSequence),
        _ => Ok(Dimension::Atomic),
    }
}

/// Classifies an already typed stream.
pub fn classify_values<T: Events>(values: &[T]) -> Dimension {
    if values.iter().any(Events::is_compound) {
        Dimension::CompoundSequence
    } else {
        Dimension::FlatSequence
    }
}

/// `[unit, [w1, w2, ...]]` with numeric unit and numeric weights.
fn is_compound_shape(value: &Value) -> bool {
    match value.as_array().map(Vec::as_slice) {
        Some([unit, Value::Array(weights)]) => {
            unit.is_number() && weights.iter().all(Value::is_number)
        }
        _ => false,
    }
}
