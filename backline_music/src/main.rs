// Backline CLI entry point.
//
// Generates a jazz back pattern for a chord progression and prints the grid
// plus the per-beat voicings, or the whole `Backing` as JSON.
//
// Usage:
//   cargo run -p backline_music -- --chords "D:-7@2,G:7@2,C:M7@4"
//     [--seed N] [--syncopation P] [--kick-crash P] [--steps N]
//     [--octave -1|0|1] [--config JSON] [--voicings JSON]
//     [--key NAME] [--tempo BPM] [--strict] [--json]
//
// Progression entries are `root:type@beats`; entries without `@beats` get
// the default harmonic rhythm for their chord type: four beats for `M7` and
// for a minor chord not followed by a dominant, two beats otherwise.

use backline_music::backing::{BackingError, BackingRequest, generate_backing};
use backline_music::config::BackingConfig;
use backline_music::leadsheet::{parse_progression, parse_progression_strict};
use backline_music::voicing::VoicingLibrary;
use backline_prng::BandRng;
use clap::Parser;
use log::{error, info};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser)]
#[command(name = "backline")]
#[command(about = "Probabilistic jazz back-pattern generator")]
struct Cli {
    /// Chord progression, e.g. "D:-7@2,G:7@2,C:M7@4"
    #[arg(long)]
    chords: String,

    /// RNG seed. Taken from the clock when absent.
    #[arg(long)]
    seed: Option<u64>,

    /// Probability that the syncopation rule fires at a beat
    #[arg(long)]
    syncopation: Option<f64>,

    /// Width of the kick band and of the crash band
    #[arg(long)]
    kick_crash: Option<f64>,

    /// Generations to step the pattern engine
    #[arg(long)]
    steps: Option<u32>,

    /// Melody octave shift (-1, 0 or 1)
    #[arg(long, allow_hyphen_values = true)]
    octave: Option<i8>,

    /// Base config as a JSON string; flags override its fields
    #[arg(long)]
    config: Option<String>,

    /// Voicing library as a JSON string, keyed by chord type
    #[arg(long)]
    voicings: Option<String>,

    /// Key name passed through to the output
    #[arg(long)]
    key: Option<String>,

    /// Tempo in BPM passed through to the output
    #[arg(long)]
    tempo: Option<u16>,

    /// Reject malformed chord labels instead of substituting a major seventh
    #[arg(long)]
    strict: bool,

    /// Print the backing as JSON instead of the text summary
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), BackingError> {
    let mut config = match &cli.config {
        Some(json) => BackingConfig::from_json(json)?,
        None => BackingConfig::default(),
    };
    if let Some(p) = cli.syncopation {
        config.syncopation_probability = p;
    }
    if let Some(p) = cli.kick_crash {
        config.kick_or_crash_probability = p;
    }
    if let Some(steps) = cli.steps {
        config.steps = steps;
    }
    if let Some(octave) = cli.octave {
        config.octave_shift = octave;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    config.validate()?;

    let seed = config.seed.unwrap_or_else(clock_seed);
    info!("seed: {seed}");

    let request = BackingRequest {
        progression: if cli.strict {
            parse_progression_strict(&cli.chords)?
        } else {
            parse_progression(&cli.chords)?
        },
        key: cli.key,
        tempo_bpm: cli.tempo,
        ..Default::default()
    };
    let library = match &cli.voicings {
        Some(json) => VoicingLibrary::from_json(json)?,
        None => VoicingLibrary::default_library(),
    };
    let mut rng = BandRng::new(seed);
    let backing = generate_backing(request, &config, &library, &mut rng)?;

    if cli.json {
        println!("{}", backing.to_json()?);
    } else {
        print!("{}", backing.summary());
    }
    Ok(())
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
