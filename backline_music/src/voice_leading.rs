// Voice-leading selector: one concrete voicing per chord.
//
// For each chord the C-rooted library variants are transposed to the chord's
// root (interval folded into [-6, 6]). The first chord takes a random variant.
// Every later chord builds a candidate list (each variant at the folded
// interval, plus an octave lower when the interval is above a third) and,
// with a probability that depends on the previous chord's type, takes the
// candidate whose upper-structure mean height is closest to the previous
// chord's; otherwise it takes a random candidate.
//
// The chosen voicing is split: its lowest note becomes the bass note (kept in
// its octave) and the rest is the comp chord the piano plays.

use crate::chord::{ChordKind, ChordSymbol};
use crate::leadsheet::ChordEntry;
use crate::voicing::{Voicing, VoicingLibrary, fold_interval, mean_pitch, transpose};
use backline_prng::RandomSource;
use log::{debug, error, trace};
use serde::{Deserialize, Serialize};

/// Chance of the closest voicing after a dominant-family chord.
pub const V7_SMOOTH_VOICE_LEAD_PROBABILITY: f64 = 0.9;
/// Chance of the closest voicing after any other chord.
pub const NON_V7_SMOOTH_VOICE_LEAD_PROBABILITY: f64 = 0.5;

/// Folded intervals above this also try the voicing an octave lower.
const OCTAVE_DROP_THRESHOLD: i8 = 3;

/// Upper-structure chord for the comping voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompChord {
    pub symbol: ChordSymbol,
    /// Pitches above the root, in voicing order.
    pub upper: Vec<u8>,
    pub beats: u32,
    /// Display text, e.g. `"Bb-7"`.
    pub annotation: String,
}

impl CompChord {
    pub fn upper_mean(&self) -> f64 {
        mean_pitch(&self.upper)
    }

    /// The full voicing again, root first.
    pub fn with_root(&self, bass: &BassNote) -> Vec<u8> {
        std::iter::once(bass.pitch)
            .chain(self.upper.iter().copied())
            .collect()
    }
}

/// Root of a chosen voicing, in the octave the voicing put it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BassNote {
    pub pitch: u8,
    pub beats: u32,
}

/// Parallel comp-chord and bass-note sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoicedProgression {
    pub chords: Vec<CompChord>,
    pub bass_line: Vec<BassNote>,
}

/// Probability of taking the closest candidate, given the previous chord.
pub fn smooth_probability(previous: ChordKind) -> f64 {
    if previous.resolves_smoothly() {
        V7_SMOOTH_VOICE_LEAD_PROBABILITY
    } else {
        NON_V7_SMOOTH_VOICE_LEAD_PROBABILITY
    }
}

/// Index of the candidate whose upper mean is closest to `target`. Ties go
/// to the earliest candidate.
pub fn closest_candidate(candidates: &[Voicing], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let distance = (candidate.upper_mean() - target).abs();
        trace!("candidate {i}: distance {distance:.2}");
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((i, distance));
        }
    }
    best.map(|(i, _)| i)
}

#[derive(Debug, Clone, Copy)]
pub struct VoiceLeadingSelector<'a> {
    library: &'a VoicingLibrary,
}

impl<'a> VoiceLeadingSelector<'a> {
    pub fn new(library: &'a VoicingLibrary) -> Self {
        VoiceLeadingSelector { library }
    }

    /// Every voicing considered for `symbol` after the first chord.
    pub fn candidates(&self, symbol: &ChordSymbol) -> Vec<Voicing> {
        let interval = fold_interval(symbol.root.semitones_from_c());
        let mut candidates = Vec::new();
        for variant in self.library.variants(symbol.kind) {
            candidates.push(transpose(variant, interval));
            if interval > OCTAVE_DROP_THRESHOLD {
                candidates.push(transpose(variant, interval - 12));
            }
        }
        candidates
    }

    /// Voice a whole progression: one comp chord and one bass note per
    /// entry, in order.
    pub fn select(
        &self,
        progression: &[ChordEntry],
        rng: &mut dyn RandomSource,
    ) -> VoicedProgression {
        let mut voiced = VoicedProgression::default();
        let mut previous: Option<(ChordKind, f64)> = None;

        for entry in progression {
            let symbol = &entry.symbol;
            let chosen = match previous {
                None => self.first_voicing(symbol, rng),
                Some((prev_kind, prev_mean)) => {
                    self.next_voicing(symbol, prev_kind, prev_mean, rng)
                }
            };
            // Every library carries M7 variants of a root plus at least one
            // upper note, so a voicing always exists and the output stays one
            // entry per input chord.
            let voicing = chosen.and_then(|v| v.root().map(|root| (root, v)));
            debug_assert!(voicing.is_some(), "no usable voicing for {symbol}");
            let Some((root, chosen)) = voicing else {
                error!("no usable voicing for {symbol}; skipping");
                continue;
            };
            let chord = CompChord {
                symbol: symbol.clone(),
                upper: chosen.upper().to_vec(),
                beats: entry.beats,
                annotation: symbol.annotation(),
            };
            previous = Some((symbol.kind, chord.upper_mean()));
            voiced.bass_line.push(BassNote {
                pitch: root,
                beats: entry.beats,
            });
            voiced.chords.push(chord);
        }
        voiced
    }

    fn first_voicing(&self, symbol: &ChordSymbol, rng: &mut dyn RandomSource) -> Option<Voicing> {
        let variants = self.library.variants(symbol.kind);
        if variants.is_empty() {
            return None;
        }
        let index = rng.range_usize(0, variants.len());
        let interval = fold_interval(symbol.root.semitones_from_c());
        debug!("{symbol}: opening with variant {index} at {interval:+}");
        Some(transpose(&variants[index], interval))
    }

    fn next_voicing(
        &self,
        symbol: &ChordSymbol,
        prev_kind: ChordKind,
        prev_mean: f64,
        rng: &mut dyn RandomSource,
    ) -> Option<Voicing> {
        let mut candidates = self.candidates(symbol);
        if candidates.is_empty() {
            return None;
        }
        let index = if rng.random_bool(smooth_probability(prev_kind)) {
            let index = closest_candidate(&candidates, prev_mean)?;
            debug!("{symbol}: closest candidate {index} to mean {prev_mean:.2}");
            index
        } else {
            let index = rng.range_usize(0, candidates.len());
            debug!("{symbol}: random candidate {index}");
            index
        };
        Some(candidates.swap_remove(index))
    }
}
