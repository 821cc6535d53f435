//! Stream normalization to a target event count.

use crate::{
    dimension::{classify_values, Dimension},
    value::{event_contribution, AlignmentMode, Events, Neutral, Stream},
    LilyweaveError, Result,
};

/// Brings `stream` to `target` events using the stream's own mode.
pub fn normalize<T>(stream: &Stream<T>, target: usize) -> Result<Vec<T>>
where
    T: Events + Neutral,
{
    match stream.mode {
        AlignmentMode::Cyclic => cyclic(&stream.values, target),
        AlignmentMode::Pad => pad(&stream.values, target),
    }
}

/// Repeats `values` with a wrapping index until exactly `target` events have
/// been emitted.
///
/// Compound elements are spent one subdivision at a time; when the budget
/// runs out inside a compound only the subdivisions that fit are kept.
pub fn cyclic<T: Events>(values: &[T], target: usize) -> Result<Vec<T>> {
    ensure_source(values, target)?;

    if classify_values(values) != Dimension::CompoundSequence {
        return Ok(values.iter().cycle().take(target).cloned().collect());
    }

    let mut out = Vec::new();
    let mut emitted = 0;
    for value in values.iter().cycle() {
        if emitted >= target {
            break;
        }
        let remaining = target - emitted;
        let count = value.event_count();
        if count > remaining {
            out.push(value.take_events(remaining));
            emitted += remaining;
        } else if count == 0 {
            // An empty compound would never advance the budget; skip it
            // unless it is all there is to repeat.
            if values.iter().all(|value| value.event_count() == 0) {
                return Err(LilyweaveError::EmptySourceStream { target });
            }
        } else {
            out.push(value.clone());
            emitted += count;
        }
    }
    Ok(out)
}

/// Emits `values` once as-is and fills the remaining events with neutral
/// placeholders. Never truncates.
pub fn pad<T: Events + Neutral>(values: &[T], target: usize) -> Result<Vec<T>> {
    ensure_source(values, target)?;

    let contribution = event_contribution(values);
    let mut out = values.to_vec();
    out.extend((contribution..target).map(|_| T::neutral()));
    Ok(out)
}

fn ensure_source<T>(values: &[T], target: usize) -> Result<()> {
    if values.is_empty() && target > 0 {
        return Err(LilyweaveError::EmptySourceStream { target });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Compound, DurationValue, Velocity};

    fn triplet() -> DurationValue {
        DurationValue::Compound(Compound::new(4, vec![1, 1, 1]))
    }

    #[test]
    fn cyclic_repeats_flat_streams() {
        let values = [DurationValue::Simple(4), DurationValue::Simple(8)];
        let out = cyclic(&values, 5).unwrap();
        assert_eq!(
            out,
            vec![
                DurationValue::Simple(4),
                DurationValue::Simple(8),
                DurationValue::Simple(4),
                DurationValue::Simple(8),
                DurationValue::Simple(4),
            ]
        );
    }

    #[test]
    fn cyclic_truncates_longer_streams() {
        let values = [Velocity::Level(10), Velocity::Level(20), Velocity::Level(30)];
        assert_eq!(cyclic(&values, 2).unwrap(), values[..2].to_vec());
    }

    #[test]
    fn cyclic_splits_compound_at_budget() {
        let out = cyclic(&[triplet()], 5).unwrap();
        assert_eq!(
            out,
            vec![
                triplet(),
                DurationValue::Compound(Compound::new(4, vec![1, 1])),
            ]
        );
        assert_eq!(event_contribution(&out), 5);
    }

    #[test]
    fn cyclic_mixes_simple_and_compound() {
        let values = [DurationValue::Simple(4), triplet()];
        let out = cyclic(&values, 6).unwrap();
        assert_eq!(
            out,
            vec![
                DurationValue::Simple(4),
                triplet(),
                DurationValue::Simple(4),
                DurationValue::Compound(Compound::new(4, vec![1])),
            ]
        );
        assert_eq!(event_contribution(&out), 6);
    }

    #[test]
    fn cyclic_to_zero_is_empty() {
        assert!(cyclic(&[triplet()], 0).unwrap().is_empty());
        assert!(cyclic::<DurationValue>(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn pad_appends_placeholders() {
        let values = [DurationValue::Simple(4), triplet()];
        let out = pad(&values, 6).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(&out[..2], &values);
        assert_eq!(&out[2..], &[DurationValue::Placeholder, DurationValue::Placeholder]);
        assert_eq!(event_contribution(&out), 6);
    }

    #[test]
    fn pad_never_truncates() {
        let values = [Velocity::Level(1), Velocity::Level(2), Velocity::Level(3)];
        assert_eq!(pad(&values, 2).unwrap(), values.to_vec());
        assert_eq!(pad(&values, 3).unwrap(), values.to_vec());
    }

    #[test]
    fn empty_source_is_rejected_in_both_modes() {
        for mode in [AlignmentMode::Cyclic, AlignmentMode::Pad] {
            let stream: Stream<Velocity> = Stream::new(Vec::new(), mode);
            let err = normalize(&stream, 3).unwrap_err();
            assert!(matches!(err, LilyweaveError::EmptySourceStream { target: 3 }));
        }
    }

    #[test]
    fn dispatches_on_mode() {
        let cyclic_stream = Stream::cyclic(vec![Velocity::Level(64)]);
        assert_eq!(normalize(&cyclic_stream, 2).unwrap(), vec![Velocity::Level(64); 2]);
        let pad_stream = Stream::pad(vec![Velocity::Level(64)]);
        assert_eq!(
            normalize(&pad_stream, 2).unwrap(),
            vec![Velocity::Level(64), Velocity::Placeholder]
        );
    }
}
