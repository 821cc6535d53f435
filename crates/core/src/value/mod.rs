//! Typed parameter values and the stream container they travel in.
//!
//! Raw input arrives as JSON where `0` doubles as "same as the previous
//! event". Parsing turns every element into a tagged value with an explicit
//! `Placeholder` variant so nothing past this module has to guess whether a
//! zero is data or a sentinel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{LilyweaveError, Result};

/// Per-stream policy used to reach the shared event count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentMode {
    /// Repeat the source with a wrapping index.
    Cyclic,
    /// Emit the source once, then fill with neutral placeholders.
    #[default]
    Pad,
}

impl AlignmentMode {
    /// Parses the literal trailing marker of a raw sequence.
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "cyclic" => Some(Self::Cyclic),
            "pad" => Some(Self::Pad),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cyclic => "cyclic",
            Self::Pad => "pad",
        }
    }
}

/// Ordered values for one musical attribute together with their alignment mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream<T> {
    pub values: Vec<T>,
    pub mode: AlignmentMode,
}

impl<T> Stream<T> {
    pub fn new(values: Vec<T>, mode: AlignmentMode) -> Self {
        Self { values, mode }
    }

    pub fn pad(values: Vec<T>) -> Self {
        Self::new(values, AlignmentMode::Pad)
    }

    pub fn cyclic(values: Vec<T>) -> Self {
        Self::new(values, AlignmentMode::Cyclic)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Maps every value through a fallible function, keeping the mode.
    pub fn try_map<U, F>(&self, f: F) -> Result<Stream<U>>
    where
        F: Fn(&T) -> Result<U>,
    {
        let values = self.values.iter().map(f).collect::<Result<Vec<_>>>()?;
        Ok(Stream::new(values, self.mode))
    }
}

impl<T: Events> Stream<T> {
    /// Number of musical events the stream resolves to.
    pub fn event_contribution(&self) -> usize {
        event_contribution(&self.values)
    }
}

/// Sum of the event contributions of `values`.
pub fn event_contribution<T: Events>(values: &[T]) -> usize {
    values.iter().map(Events::event_count).sum()
}

/// How many musical events a stream element stands for.
///
/// Everything is one event except compound durations, which expand into one
/// event per subdivision.
pub trait Events: Clone {
    fn event_count(&self) -> usize {
        1
    }

    fn is_compound(&self) -> bool {
        false
    }

    /// Keeps the first `count` subdivisions of a compound value.
    fn take_events(&self, _count: usize) -> Self {
        self.clone()
    }
}

/// The no-op value appended by pad normalization.
pub trait Neutral {
    fn neutral() -> Self;
}

/// An element type that can be parsed out of a raw JSON stream.
pub trait StreamElement: Events + Neutral + Sized {
    /// Stream name used in error messages and logs.
    const KIND: &'static str;

    fn parse(raw: &Value) -> Result<Self>;
}

/// A pitch slot: a MIDI note, a chord, a rest, a spacer or "same as before".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PitchValue {
    Note(u8),
    Chord(Vec<PitchValue>),
    Rest,
    /// Invisible rest.
    Spacer,
    Placeholder,
}

impl Events for PitchValue {}

impl Neutral for PitchValue {
    fn neutral() -> Self {
        Self::Placeholder
    }
}

impl StreamElement for PitchValue {
    const KIND: &'static str = "pitch";

    fn parse(raw: &Value) -> Result<Self> {
        if let Value::Array(members) = raw {
            if members.is_empty() {
                return Err(LilyweaveError::shape("a chord needs at least one pitch"));
            }
            let members = members
                .iter()
                .map(parse_chord_member)
                .collect::<Result<Vec<_>>>()?;
            return Ok(Self::Chord(members));
        }

        match integer(raw, Self::KIND)? {
            0 => Ok(Self::Placeholder),
            -1 => Ok(Self::Rest),
            -2 => Ok(Self::Spacer),
            midi => note(midi),
        }
    }
}

fn parse_chord_member(raw: &Value) -> Result<PitchValue> {
    match integer(raw, "chord")? {
        -1 => Ok(PitchValue::Rest),
        -2 => Ok(PitchValue::Spacer),
        midi => note(midi),
    }
}

fn note(midi: i64) -> Result<PitchValue> {
    u8::try_from(midi)
        .ok()
        .filter(|midi| *midi <= 127)
        .map(PitchValue::Note)
        .ok_or(LilyweaveError::PitchOutOfRange(midi))
}

/// A tuplet or dotted group: one unit value split by integer weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compound {
    /// Denominator of the value being subdivided (4 = a quarter note).
    pub unit: u32,
    pub weights: Vec<u32>,
}

impl Compound {
    pub fn new(unit: u32, weights: Vec<u32>) -> Self {
        Self { unit, weights }
    }

    /// Sum of the weights, widened so that no input can overflow it.
    pub fn total(&self) -> u64 {
        self.weights.iter().map(|weight| u64::from(*weight)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurationValue {
    /// `1/d` of a whole note.
    Simple(u32),
    Compound(Compound),
    Placeholder,
}

impl Events for DurationValue {
    fn event_count(&self) -> usize {
        match self {
            Self::Compound(compound) => compound.weights.len(),
            _ => 1,
        }
    }

    fn is_compound(&self) -> bool {
        matches!(self, Self::Compound(_))
    }

    fn take_events(&self, count: usize) -> Self {
        match self {
            Self::Compound(compound) => Self::Compound(Compound {
                unit: compound.unit,
                weights: compound.weights.iter().take(count).copied().collect(),
            }),
            other => other.clone(),
        }
    }
}

impl Neutral for DurationValue {
    fn neutral() -> Self {
        Self::Placeholder
    }
}

impl StreamElement for DurationValue {
    const KIND: &'static str = "duration";

    fn parse(raw: &Value) -> Result<Self> {
        match raw {
            Value::Array(pair) => {
                let [unit, weights] = pair.as_slice() else {
                    return Err(LilyweaveError::shape(format!(
                        "a compound duration is `[unit, [weights...]]`, found {raw}"
                    )));
                };
                let unit = positive(unit, "compound unit")?;
                let Value::Array(weights) = weights else {
                    return Err(LilyweaveError::shape(format!(
                        "compound weights must be a sequence, found {weights}"
                    )));
                };
                let weights = weights
                    .iter()
                    .map(|weight| positive(weight, "compound weight"))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::Compound(Compound::new(unit, weights)))
            }
            _ => match integer(raw, Self::KIND)? {
                0 => Ok(Self::Placeholder),
                _ => positive(raw, Self::KIND).map(Self::Simple),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Velocity {
    /// MIDI-style intensity, saturated to 127.
    Level(u8),
    Placeholder,
}

impl Events for Velocity {}

impl Neutral for Velocity {
    fn neutral() -> Self {
        Self::Placeholder
    }
}

impl StreamElement for Velocity {
    const KIND: &'static str = "velocity";

    fn parse(raw: &Value) -> Result<Self> {
        let level = integer(raw, Self::KIND)?;
        if level <= 0 {
            Ok(Self::Placeholder)
        } else {
            Ok(Self::Level(level.min(127) as u8))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Articulation {
    /// Key into the articulation table, e.g. `">"` or `"tr"`.
    Mark(String),
    Placeholder,
}

impl Events for Articulation {}

impl Neutral for Articulation {
    fn neutral() -> Self {
        Self::Placeholder
    }
}

impl StreamElement for Articulation {
    const KIND: &'static str = "articulation";

    fn parse(raw: &Value) -> Result<Self> {
        match raw {
            Value::String(key) if key.is_empty() => Ok(Self::Placeholder),
            Value::String(key) => Ok(Self::Mark(key.clone())),
            _ => match integer(raw, Self::KIND)? {
                0 => Ok(Self::Placeholder),
                other => Err(LilyweaveError::shape(format!(
                    "articulation must be a string key or 0, found {other}"
                ))),
            },
        }
    }
}

fn integer(raw: &Value, what: &str) -> Result<i64> {
    raw.as_i64().ok_or_else(|| {
        LilyweaveError::shape(format!("{what} value must be an integer, found {raw}"))
    })
}

fn positive(raw: &Value, what: &str) -> Result<u32> {
    let value = integer(raw, what)?;
    u32::try_from(value)
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| {
            LilyweaveError::shape(format!("{what} must be a positive integer, found {value}"))
        })
}
