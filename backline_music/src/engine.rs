// The pattern engine: a cellular-automaton style back-pattern generator.
//
// Construction expands the chord progression into one chord symbol per beat
// (and a parallel bass-root sequence), allocates an all-`Off` grid of that
// many beats, and seeds the chord and bass rows to one hit per beat. Each
// `step` copies the grid, runs every rule of the pipeline at every beat in
// order (beat-major, rule order within a beat), and swaps the copy in.
//
// The engine owns its grid exclusively. Randomness is supplied by the caller
// on every step, so a seeded `BandRng` reproduces a run and a `ScriptedRng`
// forces specific branches.

use crate::chord::{ChordSymbol, NoteName};
use crate::grid::{BeatState, PatternGrid, Voice};
use crate::leadsheet::{ChordEntry, Melody, total_beats};
use crate::rules::{PatternParams, RuleContext, RuleSet};
use backline_prng::RandomSource;
use log::debug;

#[derive(Debug)]
pub struct PatternEngine {
    melody: Melody,
    progression: Vec<ChordEntry>,
    beat_chords: Vec<ChordSymbol>,
    grid: PatternGrid,
    rules: RuleSet,
    generation: u64,
}

impl PatternEngine {
    /// Engine with the default jazz pipeline (drums, then syncopation).
    pub fn new(melody: Melody, progression: Vec<ChordEntry>, params: &PatternParams) -> Self {
        PatternEngine::with_rules(melody, progression, RuleSet::jazz(params))
    }

    /// Engine with a caller-built pipeline.
    pub fn with_rules(melody: Melody, progression: Vec<ChordEntry>, rules: RuleSet) -> Self {
        let pattern_length = total_beats(&progression);
        let mut grid = PatternGrid::new(pattern_length);
        let mut beat_chords = Vec::with_capacity(pattern_length);

        for entry in &progression {
            for _ in 0..entry.beats {
                let position = beat_chords.len();
                grid.set(Voice::Chord, position, BeatState::Fill);
                grid.set(Voice::Bass, position, BeatState::Fill);
                beat_chords.push(entry.symbol.clone());
            }
        }

        PatternEngine {
            melody,
            progression,
            beat_chords,
            grid,
            rules,
            generation: 0,
        }
    }

    /// Advance one generation.
    pub fn step(&mut self, rng: &mut dyn RandomSource) {
        let mut next = self.grid.clone();
        for position in 0..self.pattern_length() {
            for rule in self.rules.iter() {
                let update = {
                    let ctx = RuleContext {
                        grid: &next,
                        beat_chords: &self.beat_chords,
                    };
                    rule.apply(&ctx, position, rng)
                };
                update.apply_to(&mut next, position);
            }
        }
        self.grid = next;
        self.generation += 1;
        debug!(
            "generation {}: {:?} over {} beats",
            self.generation,
            self.rules.names(),
            self.pattern_length()
        );
    }

    /// Advance `steps` generations.
    pub fn run(&mut self, steps: u32, rng: &mut dyn RandomSource) {
        for _ in 0..steps {
            self.step(rng);
        }
    }

    pub fn pattern_length(&self) -> usize {
        self.grid.num_beats
    }

    pub fn grid(&self) -> &PatternGrid {
        &self.grid
    }

    pub fn into_grid(self) -> PatternGrid {
        self.grid
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn melody(&self) -> &Melody {
        &self.melody
    }

    pub fn progression(&self) -> &[ChordEntry] {
        &self.progression
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.names()
    }

    /// One chord symbol per beat.
    pub fn beat_chords(&self) -> &[ChordSymbol] {
        &self.beat_chords
    }

    /// One `root:type` label per beat.
    pub fn beat_chord_labels(&self) -> Vec<String> {
        self.beat_chords.iter().map(ChordSymbol::label).collect()
    }

    /// One bass root per beat.
    pub fn beat_roots(&self) -> Vec<&NoteName> {
        self.beat_chords.iter().map(|c| &c.root).collect()
    }

    /// The per-beat chords as one-beat progression entries, the form the
    /// voice-leading selector is fed with.
    pub fn beat_progression(&self) -> Vec<ChordEntry> {
        self.beat_chords
            .iter()
            .map(|symbol| ChordEntry::new(symbol.clone(), 1))
            .collect()
    }
}
