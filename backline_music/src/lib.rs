// Backline: a probabilistic jazz back-pattern generator.
//
// Given a lead sheet's chord progression (and melody, passed through for the
// notation side), produces a rhythm grid for eight accompaniment voices plus
// a voice-led sequence of chord voicings and a bass line, one per beat.
//
// Architecture:
// - grid.rs: The voice-by-beat state grid (8 voices, one column per beat)
// - chord.rs: Chord symbols (`root:type`), note names, chord kinds
// - leadsheet.rs: Progression entries, duration inference, melody events
// - voicing.rs: The voicing library (MIDI note sets per chord kind) + JSON load
// - rules.rs: Pattern rules (jazz drum, jazz syncopation, comp/walk) and the
//   ordered rule pipeline
// - engine.rs: The cellular-automaton engine that steps the grid
// - voice_leading.rs: Voicing selection with smooth voice leading
// - config.rs: Caller-tunable probabilities, steps and seed
// - backing.rs: End-to-end pipeline producing a `Backing`
//
// All randomness flows through `backline_prng::RandomSource`, so a seed
// reproduces a run exactly.

pub mod backing;
pub mod chord;
pub mod config;
pub mod engine;
pub mod grid;
pub mod leadsheet;
pub mod rules;
pub mod voice_leading;
pub mod voicing;
