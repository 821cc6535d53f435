//! Multi-stream alignment: four independently authored parameter streams in,
//! four index-paired streams of one shared event count out.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    duration::{decode_stream, DecodedDuration, DurationToken, TupletRatio},
    mapping::{articulation_symbol, pitch_symbol, velocity_symbol, Symbol},
    normalize::normalize,
    resolve::resolve_as,
    value::{Articulation, DurationValue, PitchValue, Stream, Velocity},
    Result,
};

/// The four raw streams of one voice, as read from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceInput {
    pub pitch: Option<Value>,
    pub duration: Option<Value>,
    pub velocity: Option<Value>,
    pub articulation: Option<Value>,
}

impl VoiceInput {
    pub fn align(&self) -> Result<AlignedEvents> {
        align(
            self.pitch.as_ref(),
            self.duration.as_ref(),
            self.velocity.as_ref(),
            self.articulation.as_ref(),
        )
    }
}

/// Aligned streams of one voice.
///
/// `pitch`, `velocity` and `articulation` hold exactly `event_count` symbols.
/// `duration` may hold fewer elements because a group stands for several
/// consecutive events; flattened, it also covers exactly `event_count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedEvents {
    pub event_count: usize,
    pub pitch: Vec<Symbol>,
    pub duration: Vec<DecodedDuration>,
    pub velocity: Vec<Symbol>,
    pub articulation: Vec<Symbol>,
}

/// One musical event in the flattened view of [`AlignedEvents`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event<'a> {
    pub pitch: &'a Symbol,
    /// `None` keeps the previous event's duration.
    pub duration: Option<DurationToken>,
    pub tuplet: Option<TupletRatio>,
    pub velocity: &'a Symbol,
    pub articulation: &'a Symbol,
}

impl AlignedEvents {
    /// Walks the streams event by event, expanding duration groups.
    pub fn events(&self) -> Vec<Event<'_>> {
        self.duration
            .iter()
            .flat_map(|duration| {
                let tuplet = duration.tuplet();
                duration.tokens().into_iter().map(move |token| (token, tuplet))
            })
            .zip(&self.pitch)
            .zip(&self.velocity)
            .zip(&self.articulation)
            .map(|((((duration, tuplet), pitch), velocity), articulation)| Event {
                pitch,
                duration,
                tuplet,
                velocity,
                articulation,
            })
            .collect()
    }
}

/// Resolves, decodes, maps and normalizes four raw streams.
pub fn align(
    pitch: Option<&Value>,
    duration: Option<&Value>,
    velocity: Option<&Value>,
    articulation: Option<&Value>,
) -> Result<AlignedEvents> {
    let pitch = resolve_as::<PitchValue>(pitch)?;
    let duration = resolve_as::<DurationValue>(duration)?;
    let velocity = resolve_as::<Velocity>(velocity)?;
    let articulation = resolve_as::<Articulation>(articulation)?;
    align_streams(&pitch, &duration, &velocity, &articulation)
}

/// Aligns already typed streams.
pub fn align_streams(
    pitch: &Stream<PitchValue>,
    duration: &Stream<DurationValue>,
    velocity: &Stream<Velocity>,
    articulation: &Stream<Articulation>,
) -> Result<AlignedEvents> {
    let durations = Stream::new(decode_stream(&duration.values)?, duration.mode);
    let pitches = pitch.try_map(pitch_symbol)?;
    let velocities = velocity.try_map(|velocity| Ok(velocity_symbol(velocity)))?;
    let articulations = articulation.try_map(articulation_symbol)?;

    let event_count = [
        pitches.event_contribution(),
        durations.event_contribution(),
        velocities.event_contribution(),
        articulations.event_contribution(),
    ]
    .into_iter()
    .max()
    .unwrap_or(0);

    tracing::debug!(
        event_count,
        pitch = pitches.len(),
        duration = durations.event_contribution(),
        velocity = velocities.len(),
        articulation = articulations.len(),
        "aligning voice"
    );

    let aligned = AlignedEvents {
        event_count,
        pitch: normalize(&pitches, event_count)?,
        duration: normalize(&durations, event_count)?,
        velocity: normalize(&velocities, event_count)?,
        articulation: normalize(&articulations, event_count)?,
    };
    debug_assert_eq!(aligned.events().len(), event_count);
    Ok(aligned)
}
