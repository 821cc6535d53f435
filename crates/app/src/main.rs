use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use lilyweave_core::{
    generators::{euclidean, fibonacci, pattern_to_durations, random_walk},
    notation::render_score,
    resolve::resolve_as,
    AppConfig, DurationValue, RandomWalk, ScoreDocument, VoiceInput,
};
use tracing_subscriber::EnvFilter;

fn main() -> lilyweave_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Align { input } => run_align(&input),
        Commands::Render { input, config } => run_render(&input, config.as_deref()),
        Commands::Rhythm { pattern } => run_rhythm(pattern),
        Commands::Walk {
            durations,
            start,
            seed,
        } => run_walk(&durations, start, seed),
    }
}

fn run_align(input: &Path) -> lilyweave_core::Result<()> {
    tracing::info!(?input, "aligning voice");

    let voice: VoiceInput = read_json(input)?;
    let aligned = voice.align()?;
    println!("{}", serde_json::to_string_pretty(&aligned)?);
    Ok(())
}

fn run_render(input: &Path, config: Option<&Path>) -> lilyweave_core::Result<()> {
    tracing::info!(?input, ?config, "rendering score");

    let config = match config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let score: ScoreDocument = read_json(input)?;
    print!("{}", render_score(&score, &config)?);
    Ok(())
}

fn run_rhythm(pattern: Pattern) -> lilyweave_core::Result<()> {
    let (slots, on, off) = match pattern {
        Pattern::Euclid {
            pulses,
            steps,
            rotation,
            on,
            off,
        } => (euclidean(pulses, steps, rotation), on, off),
        Pattern::Fibonacci { n, start, on, off } => (fibonacci(n, start), on, off),
    };
    tracing::debug!(slots = slots.len(), "generated rhythm");

    let durations = pattern_to_durations(&slots, on, off);
    println!("{}", serde_json::to_string_pretty(&durations)?);
    Ok(())
}

fn run_walk(durations: &Path, start: u8, seed: u64) -> lilyweave_core::Result<()> {
    tracing::info!(?durations, start, seed, "generating pitch walk");

    let raw: serde_json::Value = read_json(durations)?;
    let durations = resolve_as::<DurationValue>(Some(&raw))?;
    let walk = RandomWalk {
        start,
        seed,
        ..RandomWalk::default()
    };
    let pitches = random_walk(&durations.values, &walk)?;
    println!("{}", serde_json::to_string_pretty(&pitches)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> lilyweave_core::Result<T> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Aligns musical parameter streams into LilyPond notation",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Align the four parameter streams of one voice and print them as JSON.
    Align {
        /// JSON file with `pitch`, `duration`, `velocity` and `articulation`.
        input: PathBuf,
    },
    /// Assemble a score document into LilyPond source on stdout.
    Render {
        /// JSON score document.
        input: PathBuf,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print a generated duration stream.
    Rhythm {
        #[command(subcommand)]
        pattern: Pattern,
    },
    /// Print a seeded random pitch walk with one pitch per duration event.
    Walk {
        /// JSON file holding a duration stream.
        durations: PathBuf,
        #[arg(long, default_value_t = 60)]
        start: u8,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

#[derive(Subcommand, Debug)]
enum Pattern {
    /// Euclidean distribution of onsets.
    Euclid {
        pulses: usize,
        steps: usize,
        #[arg(short, long, default_value_t = 0)]
        rotation: usize,
        /// Duration for onsets.
        #[arg(long, default_value_t = 4)]
        on: u32,
        /// Duration for silent slots.
        #[arg(long, default_value_t = 8)]
        off: u32,
    },
    /// Runs of onsets with Fibonacci lengths.
    Fibonacci {
        n: usize,
        #[arg(short, long, default_value_t = 1)]
        start: usize,
        #[arg(long, default_value_t = 4)]
        on: u32,
        #[arg(long, default_value_t = 8)]
        off: u32,
    },
}
