// End-to-end back-pattern generation.
//
// request (melody + progression + key/tempo) -> PatternEngine stepped
// `config.steps` times -> per-beat chord sequence as one-beat entries ->
// VoiceLeadingSelector -> `Backing`.
//
// `Backing` is everything the notation side needs: the state grid, the
// per-beat chord labels, the comp chords and bass line, and the metadata
// passed through untouched.

use crate::config::{BackingConfig, ConfigError};
use crate::engine::PatternEngine;
use crate::grid::PatternGrid;
use crate::leadsheet::{ChordEntry, Melody, ProgressionError};
use crate::voice_leading::{BassNote, CompChord, VoiceLeadingSelector};
use crate::voicing::{VoicingError, VoicingLibrary, pitch_name};
use backline_prng::RandomSource;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Any error a caller can hit before generation starts or while writing the
/// result out. Generation itself does not fail.
#[derive(Debug, Error)]
pub enum BackingError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Progression(#[from] ProgressionError),
    #[error(transparent)]
    Voicing(#[from] VoicingError),
    #[error("backing JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// What the lead-sheet side hands over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackingRequest {
    pub melody: Melody,
    pub progression: Vec<ChordEntry>,
    /// Key name, e.g. `"F major"`. Not interpreted.
    pub key: Option<String>,
    pub tempo_bpm: Option<u16>,
}

/// A generated accompaniment, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backing {
    pub grid: PatternGrid,
    pub beat_chords: Vec<String>,
    pub chords: Vec<CompChord>,
    pub bass_line: Vec<BassNote>,
    pub melody: Melody,
    pub key: Option<String>,
    pub tempo_bpm: Option<u16>,
    pub octave_shift: i8,
    pub generations: u64,
}

impl Backing {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, BackingError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Text view: the grid rows, then one line per beat with the chord
    /// annotation, bass note and comp voicing.
    pub fn summary(&self) -> String {
        let mut out = self.grid.summary();
        out.push('\n');
        for (beat, (chord, bass)) in self.chords.iter().zip(&self.bass_line).enumerate() {
            let upper: Vec<String> = chord.upper.iter().map(|&p| pitch_name(p)).collect();
            out.push_str(&format!(
                "{beat:>4}  {:<8} {:<4} [{}]\n",
                chord.annotation,
                pitch_name(bass.pitch),
                upper.join(" ")
            ));
        }
        out
    }
}

/// Generate an accompaniment for `request`.
pub fn generate_backing(
    request: BackingRequest,
    config: &BackingConfig,
    library: &VoicingLibrary,
    rng: &mut dyn RandomSource,
) -> Result<Backing, BackingError> {
    config.validate()?;
    let BackingRequest {
        melody,
        progression,
        key,
        tempo_bpm,
    } = request;

    let mut engine = PatternEngine::new(melody, progression, &config.pattern_params());
    engine.run(config.steps, rng);
    let stats = engine.grid().stats();
    info!(
        "{} beats, {} generation(s), {} syncopated, melody {} notes / {} quarters",
        stats.total_beats,
        engine.generation(),
        stats.syncopated,
        engine.melody().note_count(),
        engine.melody().total_quarters()
    );

    let selector = VoiceLeadingSelector::new(library);
    let voiced = selector.select(&engine.beat_progression(), rng);
    let beat_chords = engine.beat_chord_labels();
    let generations = engine.generation();
    let melody = engine.melody().clone();

    Ok(Backing {
        grid: engine.into_grid(),
        beat_chords,
        chords: voiced.chords,
        bass_line: voiced.bass_line,
        melody,
        key,
        tempo_bpm,
        octave_shift: config.octave_shift,
        generations,
    })
}
