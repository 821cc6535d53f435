//! Core library for Lilyweave.
//!
//! A voice is authored as four independent parameter streams (pitch,
//! duration, velocity, articulation) whose lengths and nesting disagree.
//! The modules here resolve those raw streams, decode durations into
//! LilyPond tokens and tuplet groups, map the remaining values to symbols,
//! and stretch every stream to one shared event count so that the notation
//! assembler can walk them index by index.

pub mod align;
pub mod config;
pub mod dimension;
pub mod duration;
pub mod error;
pub mod generators;
pub mod mapping;
pub mod normalize;
pub mod notation;
pub mod resolve;
pub mod value;

pub use align::{align, align_streams, AlignedEvents, Event, VoiceInput};
pub use config::{AppConfig, PaperConfig, RenderConfig};
pub use dimension::{classify, Dimension};
pub use duration::{decode, DecodedDuration, DurationToken, TupletRatio};
pub use error::{LilyweaveError, Result};
pub use generators::RandomWalk;
pub use mapping::Symbol;
pub use normalize::normalize;
pub use notation::{
    render_score, render_staff, render_voice, render_voice_in, Meter, ScoreDocument,
    StaffDocument,
};
pub use resolve::{resolve, RawStream};
pub use value::{AlignmentMode, Articulation, DurationValue, PitchValue, Stream, Velocity};
