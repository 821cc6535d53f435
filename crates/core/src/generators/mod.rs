//! Generators for raw parameter streams: rhythmic patterns, pitch walks,
//! dynamics envelopes and hairpin placement.
//!
//! Everything here produces plain raw values (durations, pitches, velocities,
//! articulation keys) that feed straight into [`crate::align`].

use std::f64::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{
    mapping::DYNAMICS,
    value::{event_contribution, DurationValue},
    LilyweaveError, Result,
};

/// Maximally even distribution of `pulses` onsets over `steps` slots, as 1/0,
/// rotated right by `rotation`.
pub fn euclidean(pulses: usize, steps: usize, rotation: usize) -> Vec<u8> {
    if steps == 0 {
        return Vec::new();
    }
    let pulses = pulses.min(steps);
    let mut pattern: Vec<u8> = (0..steps)
        .map(|step| u8::from((step * pulses) % steps < pulses))
        .collect();
    pattern.rotate_right(rotation % steps);
    pattern
}

/// Runs of onsets with Fibonacci lengths, each followed by one silent slot.
pub fn fibonacci(count: usize, start: usize) -> Vec<u8> {
    let mut pattern = Vec::new();
    let (mut current, mut next) = (start, start);
    for _ in 0..count {
        pattern.extend(std::iter::repeat(1).take(current));
        pattern.push(0);
        (current, next) = (next, current + next);
    }
    pattern
}

/// Maps a binary pattern to simple durations: `on` for onsets, `off` for
/// silent slots.
pub fn pattern_to_durations(pattern: &[u8], on: u32, off: u32) -> Vec<u32> {
    pattern
        .iter()
        .map(|slot| if *slot != 0 { on } else { off })
        .collect()
}

/// The reversed sequence, or the sequence followed by its reverse.
pub fn mirror<T: Clone>(values: &[T], with_original: bool) -> Vec<T> {
    let reversed = values.iter().rev().cloned();
    if with_original {
        values.iter().cloned().chain(reversed).collect()
    } else {
        reversed.collect()
    }
}

/// Parameters of a bounded random pitch walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomWalk {
    /// Pitch the walk steps away from; it is not emitted itself.
    pub start: u8,
    /// Intervals in semitones, drawn uniformly for every event.
    pub steps: Vec<i32>,
    pub low: u8,
    pub high: u8,
    pub seed: u64,
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self {
            start: 60,
            steps: vec![-2, 0, 2],
            low: 36,
            high: 96,
            seed: 0,
        }
    }
}

/// One MIDI pitch per event of `durations`, each a random step from the
/// previous pitch, clamped to `low..=high`. The same seed gives the same walk.
pub fn random_walk(durations: &[DurationValue], walk: &RandomWalk) -> Result<Vec<u8>> {
    if walk.steps.is_empty() {
        return Err(LilyweaveError::shape("a random walk needs at least one step"));
    }
    if walk.high > 127 {
        return Err(LilyweaveError::PitchOutOfRange(i64::from(walk.high)));
    }
    if walk.low > walk.high {
        return Err(LilyweaveError::shape(format!(
            "random walk bounds {}..={} are empty",
            walk.low, walk.high
        )));
    }

    let mut rng = Pcg32::seed_from_u64(walk.seed);
    let (low, high) = (i32::from(walk.low), i32::from(walk.high));
    let mut current = i32::from(walk.start);
    let pitches = (0..event_contribution(durations))
        .map(|_| {
            let step = walk.steps[rng.gen_range(0..walk.steps.len())];
            current = current.saturating_add(step).clamp(low, high);
            current as u8
        })
        .collect();
    Ok(pitches)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeShape {
    Sine,
    Triangle,
    Saw,
    Square,
    /// Breakpoints in `0..=1`, spread evenly and linearly interpolated.
    Custom(Vec<f64>),
}

/// Samples `shape` at `length` evenly spaced points over `cycles` periods and
/// scales the result into `min..=max`.
pub fn envelope(
    length: usize,
    shape: &EnvelopeShape,
    cycles: f64,
    min: f64,
    max: f64,
) -> Result<Vec<f64>> {
    if let EnvelopeShape::Custom(points) = shape {
        if points.is_empty() {
            return Err(LilyweaveError::shape("a custom envelope needs at least one point"));
        }
    }

    let values = (0..length)
        .map(|index| {
            let position = fraction(index, length);
            let phase = (position * cycles).fract();
            let unit = match shape {
                EnvelopeShape::Sine => ((position * cycles * TAU).sin() + 1.0) / 2.0,
                EnvelopeShape::Triangle => (2.0 * phase - 1.0).abs(),
                EnvelopeShape::Saw => phase,
                EnvelopeShape::Square => {
                    if phase < 0.5 {
                        1.0
                    } else {
                        0.0
                    }
                }
                EnvelopeShape::Custom(points) => interpolate(points, position),
            };
            unit * (max - min) + min
        })
        .collect();
    Ok(values)
}

// Position of `index` in 0..=1 with both ends included.
fn fraction(index: usize, length: usize) -> f64 {
    if length <= 1 {
        0.0
    } else {
        index as f64 / (length - 1) as f64
    }
}

fn interpolate(points: &[f64], position: f64) -> f64 {
    if points.len() == 1 {
        return points[0];
    }
    let scaled = position * (points.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(points.len() - 2);
    let weight = scaled - lower as f64;
    points[lower] * (1.0 - weight) + points[lower + 1] * weight
}

/// Maps velocity-range values (0..=127) onto the dynamic ladder.
pub fn envelope_to_dynamics(values: &[f64]) -> Vec<&'static str> {
    let top = (DYNAMICS.len() - 1) as f64;
    values
        .iter()
        .map(|value| {
            let index = (value / 127.0 * top).round().clamp(0.0, top) as usize;
            DYNAMICS[index]
        })
        .collect()
}

/// Velocities and articulation keys that express a velocity curve as
/// hairpins between its local extrema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hairpins {
    /// Velocity at each turning point, 0 (no dynamic) elsewhere.
    pub velocities: Vec<i64>,
    /// `"cresc"`, `"dim"`, `"end"` or empty.
    pub articulations: Vec<&'static str>,
}

/// Keeps dynamics only at local minima and maxima and starts a crescendo or
/// diminuendo from each turning point to the next.
pub fn hairpins(velocities: &[i64]) -> Hairpins {
    let len = velocities.len();
    if len < 2 {
        return Hairpins {
            velocities: velocities.to_vec(),
            articulations: vec![""; len],
        };
    }

    let slopes: Vec<i64> = velocities
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).signum())
        .collect();

    let mut extrema: Vec<(usize, Turn)> = slopes
        .windows(2)
        .enumerate()
        .filter_map(|(index, pair)| match pair[0].cmp(&pair[1]) {
            std::cmp::Ordering::Less => Some((index + 1, Turn::Min)),
            std::cmp::Ordering::Greater => Some((index + 1, Turn::Max)),
            std::cmp::Ordering::Equal => None,
        })
        .collect();

    if extrema.first().map_or(true, |(_, turn)| *turn == Turn::Max) {
        extrema.insert(0, (0, Turn::Min));
    }
    if extrema.last().map_or(false, |(_, turn)| *turn == Turn::Min) {
        extrema.push((len - 1, Turn::Max));
    }

    let mut out = Hairpins {
        velocities: vec![0; len],
        articulations: vec![""; len],
    };
    for pair in extrema.windows(2) {
        let ((start, turn), (end, _)) = (pair[0], pair[1]);
        out.velocities[start] = velocities[start];
        out.articulations[start] = match turn {
            Turn::Min => "cresc",
            Turn::Max => "dim",
        };
        out.velocities[end] = velocities[end];
        out.articulations[end] = "end";
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Turn {
    Min,
    Max,
}
