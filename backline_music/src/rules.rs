// Rewrite rules for the pattern engine.
//
// A rule looks at one beat position (plus the working grid and the per-beat
// chord sequence) and returns the cell writes it wants at that position. The
// engine applies the writes immediately, so a rule later in the pipeline sees
// what earlier rules wrote at the same beat, and every rule sees what it
// wrote itself at earlier beats. The syncopation rule depends on the latter
// (it refuses to anticipate twice in a row on the same harmony).
//
// Default pipeline, in order: `JazzDrumRule`, `JazzSyncopationRule`.
// `CompEveryBeatRule` and `WalkEveryBeatRule` reset the pitched rows to one
// hit per beat; they are not in the default pipeline but can be pushed onto a
// `RuleSet`.
//
// Every probability band has an action or an explicit no-op, so rules are
// total and never fail.

use crate::chord::ChordSymbol;
use crate::grid::{BeatState, PatternGrid, Voice};
use backline_prng::RandomSource;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chance of a swung ride figure on even (0-based) beats.
pub const EVEN_BEAT_SWING_PROBABILITY: f64 = 0.2;
/// Chance of a swung ride figure on odd beats.
pub const ODD_BEAT_SWING_PROBABILITY: f64 = 0.8;

/// Voices that take the off-beat accent on a held dominant-family chord.
const ACCENT_VOICES: [Voice; 5] = [
    Voice::Chord,
    Voice::Bass,
    Voice::Snare,
    Voice::Kick,
    Voice::Hihat,
];

/// Caller-tunable rule probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternParams {
    /// Chance that the syncopation rule fires at a beat.
    pub syncopation_probability: f64,
    /// Width of both the kick band (bottom) and the crash band (top) of the
    /// second syncopation draw.
    pub kick_or_crash_probability: f64,
}

impl Default for PatternParams {
    fn default() -> Self {
        PatternParams {
            syncopation_probability: 0.5,
            kick_or_crash_probability: 0.2,
        }
    }
}

/// What a rule can see while it decides one beat.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// The grid being built this step.
    pub grid: &'a PatternGrid,
    /// One chord symbol per beat.
    pub beat_chords: &'a [ChordSymbol],
}

impl RuleContext<'_> {
    pub fn pattern_length(&self) -> usize {
        self.beat_chords.len()
    }
}

/// Cell writes a rule requests at one beat, applied in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeatUpdate {
    writes: Vec<(Voice, BeatState)>,
}

impl BeatUpdate {
    pub fn none() -> Self {
        BeatUpdate::default()
    }

    pub fn set(&mut self, voice: Voice, state: BeatState) {
        self.writes.push((voice, state));
    }

    pub fn writes(&self) -> &[(Voice, BeatState)] {
        &self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn apply_to(&self, grid: &mut PatternGrid, position: usize) {
        for &(voice, state) in &self.writes {
            grid.set(voice, position, state);
        }
    }
}

/// A rewrite rule applied at every beat of every step.
pub trait Rule: fmt::Debug {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        ctx: &RuleContext<'_>,
        position: usize,
        rng: &mut dyn RandomSource,
    ) -> BeatUpdate;
}

/// Swing ride and foot hi-hat.
///
/// Even beats: foot hi-hat off, ride swung with `EVEN_BEAT_SWING_PROBABILITY`
/// else a single hit. Odd beats: foot hi-hat on, ride swung with
/// `ODD_BEAT_SWING_PROBABILITY` else silent.
#[derive(Debug, Clone, Copy, Default)]
pub struct JazzDrumRule;

impl Rule for JazzDrumRule {
    fn name(&self) -> &'static str {
        "jazz_drum"
    }

    fn apply(
        &self,
        _ctx: &RuleContext<'_>,
        position: usize,
        rng: &mut dyn RandomSource,
    ) -> BeatUpdate {
        let (foot_hihat, ride) = if position % 2 == 0 {
            let ride = if rng.random_bool(EVEN_BEAT_SWING_PROBABILITY) {
                BeatState::Swing
            } else {
                BeatState::Fill
            };
            (BeatState::Off, ride)
        } else {
            let ride = if rng.random_bool(ODD_BEAT_SWING_PROBABILITY) {
                BeatState::Swing
            } else {
                BeatState::Off
            };
            (BeatState::Fill, ride)
        };

        let mut update = BeatUpdate::none();
        update.set(Voice::FootHihat, foot_hihat);
        update.set(Voice::Ride, ride);
        update
    }
}

/// Anticipations, kick and crash.
///
/// Gated by one `syncopation_probability` draw per beat. When the chord holds
/// into the next beat, dominant-family chords get an off-beat hit across
/// chord, bass, snare, kick and hi-hat; other chords anticipate in the comp
/// only, and not right after an anticipation or tie on the same chord. Then,
/// whenever the gate fired, a second draw places a kick (below
/// `kick_or_crash_probability`) or a crash (above its complement), clearing
/// the other drum at that beat.
#[derive(Debug, Clone, Copy)]
pub struct JazzSyncopationRule {
    pub syncopation_probability: f64,
    pub kick_or_crash_probability: f64,
}

impl JazzSyncopationRule {
    pub fn new(params: &PatternParams) -> Self {
        JazzSyncopationRule {
            syncopation_probability: params.syncopation_probability,
            kick_or_crash_probability: params.kick_or_crash_probability,
        }
    }
}

impl Rule for JazzSyncopationRule {
    fn name(&self) -> &'static str {
        "jazz_syncopation"
    }

    fn apply(
        &self,
        ctx: &RuleContext<'_>,
        position: usize,
        rng: &mut dyn RandomSource,
    ) -> BeatUpdate {
        let mut update = BeatUpdate::none();
        if !rng.random_bool(self.syncopation_probability) {
            return update;
        }

        let chords = ctx.beat_chords;
        let next = position + 1;
        if next < ctx.pattern_length() && chords[next] == chords[position] {
            let chord = &chords[position];
            if chord.kind.accents_syncopation() {
                for voice in ACCENT_VOICES {
                    update.set(voice, BeatState::Syncopated);
                }
            } else if position > 0 {
                let prev = position - 1;
                let chains = chords[prev] == *chord
                    && ctx.grid.get(Voice::Chord, prev).carries_forward();
                if !chains {
                    update.set(Voice::Chord, BeatState::Syncopated);
                }
            }
        }

        // Placing one clears the other, so a hit left by an earlier
        // generation never coincides with this one.
        let draw = rng.next_f64();
        if draw < self.kick_or_crash_probability {
            update.set(Voice::Kick, BeatState::Fill);
            update.set(Voice::Crash, BeatState::Off);
        } else if draw > 1.0 - self.kick_or_crash_probability {
            update.set(Voice::Crash, BeatState::Fill);
            update.set(Voice::Kick, BeatState::Off);
        }
        update
    }
}

/// Comp every beat with one whole-beat chord.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompEveryBeatRule;

impl Rule for CompEveryBeatRule {
    fn name(&self) -> &'static str {
        "jazz_chord"
    }

    fn apply(
        &self,
        _ctx: &RuleContext<'_>,
        _position: usize,
        _rng: &mut dyn RandomSource,
    ) -> BeatUpdate {
        let mut update = BeatUpdate::none();
        update.set(Voice::Chord, BeatState::Fill);
        update
    }
}

/// Walk one bass note per beat.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkEveryBeatRule;

impl Rule for WalkEveryBeatRule {
    fn name(&self) -> &'static str {
        "jazz_bass"
    }

    fn apply(
        &self,
        _ctx: &RuleContext<'_>,
        _position: usize,
        _rng: &mut dyn RandomSource,
    ) -> BeatUpdate {
        let mut update = BeatUpdate::none();
        update.set(Voice::Bass, BeatState::Fill);
        update
    }
}

/// An ordered rule pipeline.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    pub fn empty() -> Self {
        RuleSet::default()
    }

    /// Drums, then syncopation.
    pub fn jazz(params: &PatternParams) -> Self {
        RuleSet::empty()
            .with(JazzDrumRule)
            .with(JazzSyncopationRule::new(params))
    }

    /// Append a rule at the end of the pipeline.
    pub fn with(mut self, rule: impl Rule + 'static) -> Self {
        self.push(rule);
        self
    }

    pub fn push(&mut self, rule: impl Rule + 'static) {
        self.rules.push(Box::new(rule));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backline_prng::{BandRng, ScriptedRng};

    fn chords(labels: &[&str]) -> Vec<ChordSymbol> {
        labels.iter().map(|l| ChordSymbol::parse(l).unwrap()).collect()
    }

    fn syncopation(gate: f64, kick_or_crash: f64) -> JazzSyncopationRule {
        JazzSyncopationRule::new(&PatternParams {
            syncopation_probability: gate,
            kick_or_crash_probability: kick_or_crash,
        })
    }

    fn state_of(update: &BeatUpdate, voice: Voice) -> Option<BeatState> {
        update
            .writes()
            .iter()
            .rev()
            .find(|(v, _)| *v == voice)
            .map(|&(_, s)| s)
    }

    #[test]
    fn drum_rule_foot_hihat_follows_parity() {
        let beat_chords = chords(&["C:M7"; 8]);
        let grid = PatternGrid::new(8);
        let ctx = RuleContext {
            grid: &grid,
            beat_chords: &beat_chords,
        };
        let mut rng = BandRng::new(3);
        for position in 0..8 {
            let update = JazzDrumRule.apply(&ctx, position, &mut rng);
            let foot = state_of(&update, Voice::FootHihat).unwrap();
            let ride = state_of(&update, Voice::Ride).unwrap();
            if position % 2 == 0 {
                assert_eq!(foot, BeatState::Off);
                assert!(matches!(ride, BeatState::Swing | BeatState::Fill));
            } else {
                assert_eq!(foot, BeatState::Fill);
                assert!(matches!(ride, BeatState::Swing | BeatState::Off));
            }
        }
    }

    #[test]
    fn drum_rule_ride_bands() {
        let beat_chords = chords(&["C:M7"; 2]);
        let grid = PatternGrid::new(2);
        let ctx = RuleContext {
            grid: &grid,
            beat_chords: &beat_chords,
        };
        let ride = |update: BeatUpdate| state_of(&update, Voice::Ride);
        // 0.1 is under both swing thresholds, 0.9 over both.
        let mut low = ScriptedRng::constant(0.1);
        assert_eq!(
            ride(JazzDrumRule.apply(&ctx, 0, &mut low)),
            Some(BeatState::Swing)
        );
        assert_eq!(
            ride(JazzDrumRule.apply(&ctx, 1, &mut low)),
            Some(BeatState::Swing)
        );
        let mut high = ScriptedRng::constant(0.9);
        assert_eq!(
            ride(JazzDrumRule.apply(&ctx, 0, &mut high)),
            Some(BeatState::Fill)
        );
        assert_eq!(
            ride(JazzDrumRule.apply(&ctx, 1, &mut high)),
            Some(BeatState::Off)
        );
    }

    #[test]
    fn closed_gate_writes_nothing() {
        let beat_chords = chords(&["G:7"; 4]);
        let grid = PatternGrid::new(4);
        let ctx = RuleContext {
            grid: &grid,
            beat_chords: &beat_chords,
        };
        let mut rng = ScriptedRng::constant(0.0);
        assert!(syncopation(0.0, 0.5).apply(&ctx, 0, &mut rng).is_empty());
        assert_eq!(rng.consumed(), 1);
    }

    #[test]
    fn held_dominant_accents_five_voices() {
        let beat_chords = chords(&["G:7", "G:7", "G:7", "G:7"]);
        let grid = PatternGrid::new(4);
        let ctx = RuleContext {
            grid: &grid,
            beat_chords: &beat_chords,
        };
        // Gate draw, then a kick/crash draw in the dead zone.
        let mut rng = ScriptedRng::new(vec![0.0, 0.5]);
        let update = syncopation(1.0, 0.2).apply(&ctx, 0, &mut rng);
        for voice in ACCENT_VOICES {
            assert_eq!(
                state_of(&update, voice),
                Some(BeatState::Syncopated),
                "{voice:?}"
            );
        }
        assert_eq!(state_of(&update, Voice::Crash), None);
    }

    #[test]
    fn chord_change_blocks_anticipation() {
        let beat_chords = chords(&["G:7", "C:M7"]);
        let grid = PatternGrid::new(2);
        let ctx = RuleContext {
            grid: &grid,
            beat_chords: &beat_chords,
        };
        let mut rng = ScriptedRng::new(vec![0.0, 0.5]);
        assert!(syncopation(1.0, 0.0).apply(&ctx, 0, &mut rng).is_empty());
    }

    #[test]
    fn non_dominant_anticipates_comp_only() {
        let beat_chords = chords(&["D:-7", "D:-7", "D:-7"]);
        let grid = PatternGrid::new(3);
        let ctx = RuleContext {
            grid: &grid,
            beat_chords: &beat_chords,
        };
        let rule = syncopation(1.0, 0.0);
        let mut rng = ScriptedRng::new(vec![0.0, 0.5]);
        // Beat 0 has no previous beat to check, so it is skipped.
        assert_eq!(state_of(&rule.apply(&ctx, 0, &mut rng), Voice::Chord), None);
        let update = rule.apply(&ctx, 1, &mut rng);
        assert_eq!(update.writes(), &[(Voice::Chord, BeatState::Syncopated)]);
    }

    #[test]
    fn no_back_to_back_anticipation_on_same_chord() {
        let beat_chords = chords(&["D:-7", "D:-7", "D:-7"]);
        let mut grid = PatternGrid::new(3);
        let rule = syncopation(1.0, 0.0);
        let mut rng = ScriptedRng::new(vec![0.0, 0.5]);
        for state in [BeatState::Syncopated, BeatState::TiedFill] {
            grid.set(Voice::Chord, 0, state);
            let ctx = RuleContext {
                grid: &grid,
                beat_chords: &beat_chords,
            };
            assert!(rule.apply(&ctx, 1, &mut rng).is_empty(), "{state:?}");
        }
        grid.set(Voice::Chord, 0, BeatState::Fill);
        let ctx = RuleContext {
            grid: &grid,
            beat_chords: &beat_chords,
        };
        assert!(!rule.apply(&ctx, 1, &mut rng).is_empty());
    }

    #[test]
    fn kick_and_crash_bands() {
        let beat_chords = chords(&["C:M7"]);
        let grid = PatternGrid::new(1);
        let ctx = RuleContext {
            grid: &grid,
            beat_chords: &beat_chords,
        };
        let rule = syncopation(1.0, 0.2);

        // Last beat: no neighbour, but the kick/crash draw still happens.
        let kick = rule.apply(&ctx, 0, &mut ScriptedRng::new(vec![0.0, 0.1]));
        assert_eq!(
            kick.writes(),
            &[
                (Voice::Kick, BeatState::Fill),
                (Voice::Crash, BeatState::Off),
            ]
        );
        let crash = rule.apply(&ctx, 0, &mut ScriptedRng::new(vec![0.0, 0.95]));
        assert_eq!(
            crash.writes(),
            &[
                (Voice::Crash, BeatState::Fill),
                (Voice::Kick, BeatState::Off),
            ]
        );
        let neither = rule.apply(&ctx, 0, &mut ScriptedRng::new(vec![0.0, 0.5]));
        assert!(neither.is_empty());
    }

    #[test]
    fn new_hit_clears_the_other_drum() {
        let beat_chords = chords(&["C:M7"]);
        let mut grid = PatternGrid::new(1);
        grid.set(Voice::Kick, 0, BeatState::Fill);
        let ctx = RuleContext {
            grid: &grid,
            beat_chords: &beat_chords,
        };
        let mut rng = ScriptedRng::new(vec![0.0, 0.95]);
        let update = syncopation(1.0, 0.2).apply(&ctx, 0, &mut rng);
        update.apply_to(&mut grid, 0);
        assert_eq!(grid.get(Voice::Crash, 0), BeatState::Fill);
        assert_eq!(grid.get(Voice::Kick, 0), BeatState::Off);
    }

    #[test]
    fn reset_rules_fill_pitched_rows() {
        let beat_chords = chords(&["C:M7"]);
        let grid = PatternGrid::new(1);
        let ctx = RuleContext {
            grid: &grid,
            beat_chords: &beat_chords,
        };
        let mut rng = ScriptedRng::constant(0.0);
        assert_eq!(
            CompEveryBeatRule.apply(&ctx, 0, &mut rng).writes(),
            &[(Voice::Chord, BeatState::Fill)]
        );
        assert_eq!(
            WalkEveryBeatRule.apply(&ctx, 0, &mut rng).writes(),
            &[(Voice::Bass, BeatState::Fill)]
        );
        assert_eq!(rng.consumed(), 0);
    }

    #[test]
    fn jazz_pipeline_order() {
        let rules = RuleSet::jazz(&PatternParams::default());
        assert_eq!(rules.names(), ["jazz_drum", "jazz_syncopation"]);
        let extended = RuleSet::jazz(&PatternParams::default()).with(CompEveryBeatRule);
        assert_eq!(extended.len(), 3);
        assert!(RuleSet::empty().is_empty());
    }
}
