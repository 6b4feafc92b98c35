// The pattern grid: the central representation for back-pattern generation.
//
// Rows are voices (two pitched, six percussion) and columns are beats. Each
// cell holds a `BeatState` describing how that voice fills the beat: silent,
// one whole-beat hit, two swung eighths, an off-beat anticipation, or a
// whole-beat hit tied into the next beat.
//
// The grid says nothing about pitch. Pitched content (which chord, which bass
// note) comes from the per-beat chord sequence and the voice-leading selector;
// the notation renderer combines the two.
//
// Cells are only written by the engine's rule pipeline (engine.rs, rules.rs).

use serde::{Deserialize, Serialize};

/// Beats per 4/4 measure, used for bar lines in the text summary.
pub const BEATS_PER_MEASURE: usize = 4;

/// Voice row in the grid. Discriminants are the row indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Voice {
    Chord = 0,
    Bass = 1,
    Ride = 2,
    FootHihat = 3,
    Hihat = 4,
    Snare = 5,
    Kick = 6,
    Crash = 7,
}

impl Voice {
    pub const COUNT: usize = 8;

    pub const ALL: [Voice; Voice::COUNT] = [
        Voice::Chord,
        Voice::Bass,
        Voice::Ride,
        Voice::FootHihat,
        Voice::Hihat,
        Voice::Snare,
        Voice::Kick,
        Voice::Crash,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Voice::Chord => "chord",
            Voice::Bass => "bass",
            Voice::Ride => "ride",
            Voice::FootHihat => "foot-hh",
            Voice::Hihat => "hihat",
            Voice::Snare => "snare",
            Voice::Kick => "kick",
            Voice::Crash => "crash",
        }
    }
}

/// How a voice fills one beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BeatState {
    /// Silent.
    #[default]
    #[serde(rename = "OFF")]
    Off,
    /// One note, chord or hit lasting the whole beat.
    #[serde(rename = "FILL_1")]
    Fill,
    /// Two swung subdivisions.
    #[serde(rename = "FILL_2_1")]
    Swing,
    /// Rest, then a hit on the back half of the beat. Tied forward when the
    /// next beat repeats the same event.
    #[serde(rename = "FILL_0_1")]
    Syncopated,
    /// Whole beat, tied into the same voice on the next beat.
    #[serde(rename = "FILL_1_T")]
    TiedFill,
}

impl BeatState {
    pub const ALL: [BeatState; 5] = [
        BeatState::Off,
        BeatState::Fill,
        BeatState::Swing,
        BeatState::Syncopated,
        BeatState::TiedFill,
    ];

    /// True for states that carry into the following beat (an anticipation
    /// or an explicit tie).
    pub fn carries_forward(self) -> bool {
        matches!(self, BeatState::Syncopated | BeatState::TiedFill)
    }

    /// One-character glyph for the text summary.
    pub fn glyph(self) -> char {
        match self {
            BeatState::Off => '.',
            BeatState::Fill => 'x',
            BeatState::Swing => 's',
            BeatState::Syncopated => '>',
            BeatState::TiedFill => 't',
        }
    }
}

/// The voice-by-beat state array.
///
/// Indexed as `rows[voice.index()][beat]`. Every row has exactly
/// `num_beats` cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternGrid {
    pub num_beats: usize,
    pub rows: [Vec<BeatState>; Voice::COUNT],
}

impl PatternGrid {
    /// A grid of `num_beats` beats with every cell `Off`.
    pub fn new(num_beats: usize) -> Self {
        PatternGrid {
            num_beats,
            rows: std::array::from_fn(|_| vec![BeatState::Off; num_beats]),
        }
    }

    pub fn get(&self, voice: Voice, beat: usize) -> BeatState {
        self.rows[voice.index()][beat]
    }

    pub fn set(&mut self, voice: Voice, beat: usize, state: BeatState) {
        self.rows[voice.index()][beat] = state;
    }

    pub fn row(&self, voice: Voice) -> &[BeatState] {
        &self.rows[voice.index()]
    }

    /// Compact text rendering, one line per voice, with a bar line every
    /// measure.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for voice in Voice::ALL {
            out.push_str(&format!("{:>8}: ", voice.label()));
            for beat in 0..self.num_beats {
                if beat > 0 && beat % BEATS_PER_MEASURE == 0 {
                    out.push('|');
                }
                out.push(self.get(voice, beat).glyph());
            }
            out.push('\n');
        }
        out
    }

    pub fn stats(&self) -> GridStats {
        let mut stats = GridStats {
            total_beats: self.num_beats,
            off: 0,
            fill: 0,
            swing: 0,
            syncopated: 0,
            tied: 0,
        };
        for state in self.rows.iter().flatten() {
            match state {
                BeatState::Off => stats.off += 1,
                BeatState::Fill => stats.fill += 1,
                BeatState::Swing => stats.swing += 1,
                BeatState::Syncopated => stats.syncopated += 1,
                BeatState::TiedFill => stats.tied += 1,
            }
        }
        stats
    }
}

/// Cell counts per state across the whole grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridStats {
    pub total_beats: usize,
    pub off: usize,
    pub fill: usize,
    pub swing: usize,
    pub syncopated: usize,
    pub tied: usize,
}
