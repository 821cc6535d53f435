//! Symbol tables mapping pitch, velocity and articulation values to LilyPond
//! text.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    value::{Articulation, Events, Neutral, PitchValue, Velocity},
    LilyweaveError, Result,
};

/// Pitch class names in LilyPond's english note language.
const PITCH_NAMES: [&str; 12] = [
    "c", "cs", "d", "ds", "e", "f", "fs", "g", "gs", "a", "as", "b",
];

/// Dynamics from softest to loudest, one per ten velocity steps.
pub const DYNAMICS: [&str; 12] = [
    "\\ppppp", "\\pppp", "\\ppp", "\\pp", "\\p", "\\mp", "\\mf", "\\f", "\\ff", "\\fff",
    "\\ffff", "\\fffff",
];

/// One mapped symbol; empty means "nothing to emit for this event".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Events for Symbol {}

impl Neutral for Symbol {
    fn neutral() -> Self {
        Self::empty()
    }
}

/// LilyPond absolute pitch for a MIDI note; MIDI 48 is `c`.
pub fn note_name(midi: u8) -> Result<String> {
    if midi > 127 {
        return Err(LilyweaveError::PitchOutOfRange(i64::from(midi)));
    }
    let octave = i32::from(midi / 12) - 4;
    let mut name = PITCH_NAMES[usize::from(midi % 12)].to_string();
    let mark = if octave > 0 { '\'' } else { ',' };
    name.extend(std::iter::repeat(mark).take(octave.unsigned_abs() as usize));
    Ok(name)
}

pub fn pitch_symbol(pitch: &PitchValue) -> Result<Symbol> {
    let text = match pitch {
        PitchValue::Placeholder => String::new(),
        PitchValue::Chord(members) => {
            let members = members
                .iter()
                .map(chord_member)
                .collect::<Result<Vec<_>>>()?;
            format!("<{}>", members.join(" "))
        }
        single => chord_member(single)?,
    };
    Ok(Symbol(text))
}

fn chord_member(pitch: &PitchValue) -> Result<String> {
    match pitch {
        PitchValue::Note(midi) => note_name(*midi),
        PitchValue::Rest => Ok("r".to_string()),
        PitchValue::Spacer => Ok("s".to_string()),
        _ => Err(LilyweaveError::shape("chords may only hold notes, rests and spacers")),
    }
}

/// Dynamic for a velocity: 1-9 is `\ppppp`, each further ten steps one
/// level louder, 110 and above `\fffff`.
pub fn velocity_symbol(velocity: &Velocity) -> Symbol {
    match velocity {
        Velocity::Placeholder | Velocity::Level(0) => Symbol::empty(),
        Velocity::Level(level) => {
            let index = usize::from(*level / 10).min(DYNAMICS.len() - 1);
            Symbol::new(DYNAMICS[index])
        }
    }
}

/// LilyPond text for an articulation key, if the key is known.
pub fn articulation_text(key: &str) -> Option<&'static str> {
    let text = match key {
        // articulations
        ">" => "->",
        "^" => "-^",
        "!" => "-!",
        "." => "-.",
        "_" => "-_",
        "-" => "--",
        "tie" => "~",
        "expr" => "\\espressivo",
        // ornaments
        "tr" => "\\trill",
        "m" => "\\mordent",
        "cor" => "\\fermata",
        "turn" => "\\turn",
        "arpeggio" => "\\arpeggio",
        // lines and hairpins
        "glissando" => "\\glissando",
        "cresc" => "\\<",
        "dim" => "\\>",
        "end" => "\\!",
        // breathing and bowing
        "breathe" => "\\breathe",
        "upbow" => "\\upbow",
        "downbow" => "\\downbow",
        "harmonic" => "\\harmonic",
        "flageolet" => "\\flageolet",
        "pizzicato" => "^\\markup { \"pizz.\" }",
        "bartokPizz" => "^\\snappizzicato",
        "" => "",
        _ => return None,
    };
    Some(text)
}

pub fn articulation_symbol(articulation: &Articulation) -> Result<Symbol> {
    match articulation {
        Articulation::Placeholder => Ok(Symbol::empty()),
        Articulation::Mark(key) => articulation_text(key)
            .map(Symbol::new)
            .ok_or_else(|| LilyweaveError::UnknownArticulation(key.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_pitches_around_middle_c() {
        assert_eq!(note_name(60).unwrap(), "c'");
        assert_eq!(note_name(61).unwrap(), "cs'");
        assert_eq!(note_name(48).unwrap(), "c");
        assert_eq!(note_name(47).unwrap(), "b,");
        assert_eq!(note_name(0).unwrap(), "c,,,,");
        assert_eq!(note_name(127).unwrap(), "g''''''");
        assert!(matches!(note_name(128), Err(LilyweaveError::PitchOutOfRange(128))));
    }

    #[test]
    fn maps_rests_chords_and_placeholders() {
        assert_eq!(pitch_symbol(&PitchValue::Rest).unwrap().as_str(), "r");
        assert_eq!(pitch_symbol(&PitchValue::Spacer).unwrap().as_str(), "s");
        assert!(pitch_symbol(&PitchValue::Placeholder).unwrap().is_empty());
        let chord = PitchValue::Chord(vec![
            PitchValue::Note(60),
            PitchValue::Note(64),
            PitchValue::Note(67),
        ]);
        assert_eq!(pitch_symbol(&chord).unwrap().as_str(), "<c' e' g'>");
    }

    #[test]
    fn maps_velocity_by_decade() {
        let cases = [
            (1, "\\ppppp"),
            (9, "\\ppppp"),
            (10, "\\pppp"),
            (64, "\\mf"),
            (90, "\\fff"),
            (109, "\\ffff"),
            (110, "\\fffff"),
            (127, "\\fffff"),
        ];
        for (level, expected) in cases {
            assert_eq!(velocity_symbol(&Velocity::Level(level)).as_str(), expected, "{level}");
        }
        assert!(velocity_symbol(&Velocity::Placeholder).is_empty());
    }

    #[test]
    fn maps_articulations() {
        let accent = Articulation::Mark(">".to_string());
        assert_eq!(articulation_symbol(&accent).unwrap().as_str(), "->");
        assert_eq!(articulation_text("end"), Some("\\!"));
        assert!(articulation_symbol(&Articulation::Placeholder).unwrap().is_empty());
        let err = articulation_symbol(&Articulation::Mark("wobble".to_string())).unwrap_err();
        assert!(matches!(err, LilyweaveError::UnknownArticulation(key) if key == "wobble"));
    }
}
