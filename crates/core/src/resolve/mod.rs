//! Default and mode resolution for raw input streams.
//!
//! Accepted forms:
//! - absent or `null`: one neutral element, `pad`
//! - a scalar: wrapped into a one-element stream, `pad`
//! - a sequence, optionally ending in the literal `"cyclic"` or `"pad"`
//! - an explicit `{"values": [...], "mode": "cyclic"}` object
//!
//! An empty sequence resolves like an absent input so that `[]` means "no
//! values given" rather than an unusable zero-length stream.

use serde_json::Value;

use crate::{
    value::{AlignmentMode, Stream, StreamElement},
    Result,
};

/// A raw stream split into its values and alignment mode.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStream {
    pub values: Vec<Value>,
    pub mode: AlignmentMode,
}

impl RawStream {
    /// Parses every raw element into a typed stream element.
    pub fn parse<T: StreamElement>(&self) -> Result<Stream<T>> {
        let values = self
            .values
            .iter()
            .map(T::parse)
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(
            stream = T::KIND,
            mode = self.mode.as_str(),
            len = values.len(),
            "resolved stream"
        );
        Ok(Stream::new(values, self.mode))
    }
}

/// Resolves a raw input into values and mode. Never fails.
pub fn resolve(raw: Option<&Value>) -> RawStream {
    match raw {
        None | Some(Value::Null) => neutral(AlignmentMode::Pad),
        Some(Value::Array(items)) => resolve_sequence(items, None),
        Some(Value::Object(fields)) => match explicit(fields) {
            Some((items, mode)) => resolve_sequence(items, Some(mode)),
            None => wrap(Value::Object(fields.clone())),
        },
        Some(scalar) => wrap(scalar.clone()),
    }
}

/// Resolves and parses in one step.
pub fn resolve_as<T: StreamElement>(raw: Option<&Value>) -> Result<Stream<T>> {
    resolve(raw).parse()
}

fn resolve_sequence(items: &[Value], mode: Option<AlignmentMode>) -> RawStream {
    let marker = items
        .last()
        .and_then(Value::as_str)
        .and_then(AlignmentMode::from_marker);

    let (values, mode) = match (mode, marker) {
        (Some(mode), _) => (items, mode),
        (None, Some(marker)) => (&items[..items.len() - 1], marker),
        (None, None) => (items, AlignmentMode::Pad),
    };

    if values.is_empty() {
        return neutral(mode);
    }
    RawStream {
        values: values.to_vec(),
        mode,
    }
}

fn explicit(fields: &serde_json::Map<String, Value>) -> Option<(&[Value], AlignmentMode)> {
    let values = fields.get("values")?.as_array()?;
    let mode = match fields.get("mode") {
        None | Some(Value::Null) => AlignmentMode::Pad,
        Some(mode) => AlignmentMode::from_marker(mode.as_str()?)?,
    };
    Some((values.as_slice(), mode))
}

fn wrap(value: Value) -> RawStream {
    RawStream {
        values: vec![value],
        mode: AlignmentMode::Pad,
    }
}

// `0` is the neutral element of every raw stream.
fn neutral(mode: AlignmentMode) -> RawStream {
    RawStream {
        values: vec![Value::from(0)],
        mode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{DurationValue, PitchValue};
    use serde_json::json;

    #[test]
    fn absent_input_is_neutral_pad() {
        for raw in [None, Some(&Value::Null)] {
            let stream = resolve(raw);
            assert_eq!(stream.values, vec![json!(0)]);
            assert_eq!(stream.mode, AlignmentMode::Pad);
        }
    }

    #[test]
    fn scalar_is_wrapped() {
        let stream = resolve(Some(&json!(60)));
        assert_eq!(stream.values, vec![json!(60)]);
        assert_eq!(stream.mode, AlignmentMode::Pad);
    }

    #[test]
    fn trailing_marker_sets_mode() {
        let stream = resolve(Some(&json!([4, 8, "cyclic"])));
        assert_eq!(stream.values, vec![json!(4), json!(8)]);
        assert_eq!(stream.mode, AlignmentMode::Cyclic);

        let stream = resolve(Some(&json!([4, "pad"])));
        assert_eq!(stream.values, vec![json!(4)]);
        assert_eq!(stream.mode, AlignmentMode::Pad);
    }

    #[test]
    fn unmarked_sequence_defaults_to_pad() {
        let stream = resolve(Some(&json!([">", "."])));
        assert_eq!(stream.values, vec![json!(">"), json!(".")]);
        assert_eq!(stream.mode, AlignmentMode::Pad);
    }

    #[test]
    fn only_the_exact_marker_is_consumed() {
        let stream = resolve(Some(&json!([">", "Cyclic"])));
        assert_eq!(stream.values.len(), 2);
        assert_eq!(stream.mode, AlignmentMode::Pad);
    }

    #[test]
    fn empty_sequences_resolve_to_neutral() {
        assert_eq!(resolve(Some(&json!([]))).values, vec![json!(0)]);
        let stream = resolve(Some(&json!(["cyclic"])));
        assert_eq!(stream.values, vec![json!(0)]);
        assert_eq!(stream.mode, AlignmentMode::Cyclic);
    }

    #[test]
    fn explicit_object_form() {
        let stream = resolve(Some(&json!({"values": [60, 64], "mode": "cyclic"})));
        assert_eq!(stream.values, vec![json!(60), json!(64)]);
        assert_eq!(stream.mode, AlignmentMode::Cyclic);

        let stream = resolve(Some(&json!({"values": [60]})));
        assert_eq!(stream.mode, AlignmentMode::Pad);
    }

    #[test]
    fn malformed_object_fails_at_parse_time() {
        let raw = json!({"notes": [60]});
        let stream = resolve(Some(&raw));
        assert_eq!(stream.values, vec![raw.clone()]);
        assert!(stream.parse::<PitchValue>().is_err());
    }

    #[test]
    fn parses_typed_stream() {
        let raw = json!([4, [4, [1, 1, 1]], "cyclic"]);
        let stream = resolve_as::<DurationValue>(Some(&raw)).unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream.mode, AlignmentMode::Cyclic);
        assert_eq!(stream.event_contribution(), 4);
    }
}
