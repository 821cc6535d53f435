//! LilyPond text assembly from aligned voices.
//!
//! A voice is a single music expression: each event concatenates its pitch,
//! duration token, dynamic and articulation (`c'4\mf->`). Duration groups
//! with a tuplet marker are wrapped in `\tuplet p/q { ... }`; plain groups
//! are written inline. Empty symbols emit nothing, so an event with an empty
//! pitch or duration inherits the previous one the way LilyPond does.
//!
//! With `bars_per_line` set, a voice counts elapsed time in the staff's meter
//! and writes `\break` after every that many complete bars. A bar that ends
//! inside a tuplet breaks after the closing brace.
//!
//! Staves stack one or more voices, and a score wraps staves in a
//! `StaffGroup` with header, paper, layout and midi blocks. Output is always
//! an in-memory string.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::{
    align::{AlignedEvents, VoiceInput},
    config::{AppConfig, PaperConfig, PaperSize, RenderConfig},
    duration::{DecodedDuration, DurationToken},
    mapping::Symbol,
    LilyweaveError, Result,
};

/// Key signature, e.g. tonic `"d"` and mode `"minor"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySignature {
    pub tonic: String,
    pub mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffDocument {
    pub voices: Vec<VoiceInput>,
    pub key: Option<KeySignature>,
    /// Numeric time signature such as `"3/4"`.
    pub time_signature: Option<String>,
    pub clef: Option<String>,
    pub instrument_name: Option<String>,
    pub short_name: Option<String>,
    /// Overrides the configured default MIDI instrument.
    pub midi_instrument: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreDocument {
    pub title: Option<String>,
    pub composer: Option<String>,
    pub staves: Vec<StaffDocument>,
}

/// A numeric time signature such as `3/4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meter {
    pub beats: u32,
    pub unit: u32,
}

impl Meter {
    pub fn parse(text: &str) -> Result<Self> {
        let parsed = text.split_once('/').and_then(|(beats, unit)| {
            let beats = beats.trim().parse::<u32>().ok()?;
            let unit = unit.trim().parse::<u32>().ok()?;
            (beats > 0 && unit > 0).then_some(Self { beats, unit })
        });
        parsed.ok_or_else(|| LilyweaveError::shape(format!("invalid time signature `{text}`")))
    }

    /// Length of one bar as a fraction of a whole note.
    pub fn bar_length(&self) -> f64 {
        f64::from(self.beats) / f64::from(self.unit)
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self { beats: 4, unit: 4 }
    }
}

/// Renders one aligned voice as `{ ... }` in 4/4.
pub fn render_voice(events: &AlignedEvents, render: &RenderConfig) -> String {
    render_voice_in(events, render, Meter::default())
}

/// Renders one aligned voice, counting bars in `meter` for line breaks.
pub fn render_voice_in(events: &AlignedEvents, render: &RenderConfig, meter: Meter) -> String {
    let breaks = render
        .bars_per_line
        .filter(|bars| *bars > 0)
        .map(|bars_per_line| BarBreaks {
            bars_per_line,
            bar_length: meter.bar_length(),
        });
    let mut writer = VoiceWriter::new(events, render.suppress_repeated_dynamics, breaks);
    for duration in &events.duration {
        writer.duration(duration);
    }
    writer.finish()
}

const BAR_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
struct BarBreaks {
    bars_per_line: u32,
    bar_length: f64,
}

struct VoiceWriter<'a> {
    events: &'a AlignedEvents,
    suppress_repeated_dynamics: bool,
    breaks: Option<BarBreaks>,
    index: usize,
    last_dynamic: Option<&'a str>,
    // Unscaled length of the last written duration; LilyPond starts at a quarter.
    last_length: f64,
    elapsed: f64,
    pending_break: bool,
    parts: Vec<String>,
}

impl<'a> VoiceWriter<'a> {
    fn new(
        events: &'a AlignedEvents,
        suppress_repeated_dynamics: bool,
        breaks: Option<BarBreaks>,
    ) -> Self {
        Self {
            events,
            suppress_repeated_dynamics,
            breaks,
            index: 0,
            last_dynamic: None,
            last_length: 0.25,
            elapsed: 0.0,
            pending_break: false,
            parts: Vec::new(),
        }
    }

    fn duration(&mut self, duration: &DecodedDuration) {
        match duration {
            DecodedDuration::Token(token) => self.event(Some(*token), 1.0),
            DecodedDuration::Placeholder => self.event(None, 1.0),
            DecodedDuration::Group(group) => {
                let scale = group.tuplet.map_or(1.0, |ratio| 1.0 / ratio.value());
                if let Some(ratio) = group.tuplet {
                    self.parts.push(format!("\\tuplet {ratio} {{"));
                }
                for token in &group.tokens {
                    self.event(Some(*token), scale);
                }
                if group.tuplet.is_some() {
                    self.parts.push("}".to_string());
                }
            }
        }
        if std::mem::take(&mut self.pending_break) {
            self.parts.push("\\break".to_string());
        }
    }

    fn event(&mut self, token: Option<DurationToken>, scale: f64) {
        let events = self.events;
        let index = self.index;
        self.index += 1;

        let pitch = symbol_at(&events.pitch, index);
        let duration = token.map(|token| token.as_str()).unwrap_or_default();
        let dynamic = self.dynamic(index);
        let articulation = symbol_at(&events.articulation, index);

        let text = format!("{pitch}{duration}{dynamic}{articulation}");
        if !text.is_empty() {
            self.parts.push(text);
        }
        if !pitch.is_empty() || !duration.is_empty() {
            self.advance(token, scale);
        }
    }

    fn advance(&mut self, token: Option<DurationToken>, scale: f64) {
        if let Some(token) = token {
            self.last_length = token.whole_fraction();
        }
        self.elapsed += self.last_length * scale;

        let Some(breaks) = self.breaks else {
            return;
        };
        let bars = self.elapsed / breaks.bar_length;
        let whole = bars.round();
        if whole >= 1.0
            && (bars - whole).abs() < BAR_TOLERANCE
            && (whole as u64) % u64::from(breaks.bars_per_line) == 0
        {
            self.pending_break = true;
        }
    }

    fn dynamic(&mut self, index: usize) -> &'a str {
        let events = self.events;
        let dynamic = symbol_at(&events.velocity, index);
        if dynamic.is_empty() {
            return dynamic;
        }
        if self.suppress_repeated_dynamics && self.last_dynamic == Some(dynamic) {
            return "";
        }
        self.last_dynamic = Some(dynamic);
        dynamic
    }

    fn finish(self) -> String {
        if self.parts.is_empty() {
            "{ }".to_string()
        } else {
            format!("{{ {} }}", self.parts.join(" "))
        }
    }
}

fn symbol_at(symbols: &[Symbol], index: usize) -> &str {
    symbols.get(index).map(Symbol::as_str).unwrap_or_default()
}

/// Renders a staff with all its voices.
pub fn render_staff(staff: &StaffDocument, render: &RenderConfig) -> Result<String> {
    let meter = staff
        .time_signature
        .as_deref()
        .map(Meter::parse)
        .transpose()?
        .unwrap_or_default();
    let voices = staff
        .voices
        .iter()
        .map(|voice| voice.align().map(|events| render_voice_in(&events, render, meter)))
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(voices = voices.len(), "rendering staff");

    let mut ly = String::from("\\new Staff \\with {\n");
    if let Some(name) = &staff.instrument_name {
        let _ = writeln!(ly, "  instrumentName = \"{}\"", escape(name));
    }
    if let Some(name) = &staff.short_name {
        let _ = writeln!(ly, "  shortInstrumentName = \"{}\"", escape(name));
    }
    let midi = staff.midi_instrument.as_deref().unwrap_or(&render.midi_instrument);
    let _ = writeln!(ly, "  midiInstrument = \"{}\"", escape(midi));
    ly.push_str("} {\n");

    if let Some(clef) = &staff.clef {
        let _ = writeln!(ly, "  \\clef {clef}");
    }
    if let Some(key) = &staff.key {
        let _ = writeln!(ly, "  \\key {} \\{}", key.tonic, key.mode);
    }
    if let Some(time) = &staff.time_signature {
        ly.push_str("  \\numericTimeSignature\n");
        let _ = writeln!(ly, "  \\time {time}");
    }

    match voices.as_slice() {
        [] => {}
        [single] => {
            let _ = writeln!(ly, "  {single}");
        }
        many => {
            let _ = writeln!(ly, "  <<\n    {}\n  >>", many.join("\n    \\\\\n    "));
        }
    }
    ly.push('}');
    Ok(ly)
}

/// Renders a complete `.ly` source for a score.
pub fn render_score(score: &ScoreDocument, config: &AppConfig) -> Result<String> {
    let staves = score
        .staves
        .iter()
        .map(|staff| render_staff(staff, &config.render))
        .collect::<Result<Vec<_>>>()?;

    let mut ly = preamble(&config.render);

    ly.push_str("\\header {\n");
    if let Some(title) = &score.title {
        let _ = writeln!(ly, "  title = \"{}\"", escape(title));
    }
    if let Some(composer) = &score.composer {
        let _ = writeln!(ly, "  composer = \"{}\"", escape(composer));
    }
    ly.push_str("  tagline = \"\"\n}\n\n");

    write_paper(&mut ly, &config.paper);

    ly.push_str("\\score {\n  \\new StaffGroup <<\n");
    for staff in &staves {
        for line in staff.lines() {
            let _ = writeln!(ly, "    {line}");
        }
    }
    ly.push_str("  >>\n");
    write_layout(&mut ly, &config.paper);
    ly.push_str("  \\midi { }\n}\n");

    tracing::info!(staves = staves.len(), "rendered score");
    Ok(ly)
}

/// Wraps a bare music expression into a compilable file.
pub fn render_standalone(music: &str, render: &RenderConfig) -> String {
    let mut ly = preamble(render);
    ly.push_str(music);
    ly.push('\n');
    ly
}

fn preamble(render: &RenderConfig) -> String {
    format!(
        "\\version \"{}\"\n\\language \"{}\"\n\n",
        render.version, render.language
    )
}

fn write_paper(ly: &mut String, paper: &PaperConfig) {
    let name = match &paper.size {
        PaperSize::Named(name) => name.as_str(),
        PaperSize::Custom([width, height]) => {
            let _ = writeln!(
                ly,
                "#(set! paper-alist (cons '(\"custom\" . \
                 (cons (* {width} mm) (* {height} mm))) paper-alist))\n"
            );
            "custom"
        }
    };
    let margins = &paper.margins;
    ly.push_str("\\paper {\n");
    let _ = writeln!(ly, "  #(set-paper-size \"{name}\")");
    let _ = writeln!(ly, "  top-margin = {}", margins.top);
    let _ = writeln!(ly, "  bottom-margin = {}", margins.bottom);
    let _ = writeln!(ly, "  left-margin = {}", margins.left);
    let _ = writeln!(ly, "  right-margin = {}", margins.right);
    ly.push_str("}\n\n");
}

fn write_layout(ly: &mut String, paper: &PaperConfig) {
    let mut settings = Vec::new();
    if let Some(size) = paper.staff_size {
        settings.push(format!("#(layout-set-staff-size {size})"));
    }
    if let Some(indent) = paper.indent {
        settings.push(format!("indent = {indent}"));
    }
    if let Some(indent) = paper.short_indent {
        settings.push(format!("short-indent = {indent}"));
    }

    if settings.is_empty() {
        ly.push_str("  \\layout { }\n");
    } else {
        ly.push_str("  \\layout {\n");
        for setting in settings {
            let _ = writeln!(ly, "    {setting}");
        }
        ly.push_str("  }\n");
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
