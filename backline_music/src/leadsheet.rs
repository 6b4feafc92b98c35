// Lead-sheet side inputs: chord progressions and melodies.
//
// The engine consumes an ordered list of `ChordEntry`s (chord symbol plus a
// duration in beats) and a melody it treats as opaque. This module holds
// those types and the small conversions that turn lead-sheet data into them:
// - `normalize_kind`: lead-sheet chord figures (`maj7`, `min7b5`, `dim`, ...)
//   onto the voicing library's type names.
// - `progression_from_offsets`: chord onsets in beats into durations.
// - `infer_durations`: a default harmonic rhythm when no durations are given.
// - `parse_progression`: the `"D:-7@2,G:7@2,C:M7"` text form used by the CLI,
//   lenient about chord labels (`parse_progression_strict` is not).
//
// Reading MusicXML and extracting chord onsets is left to the caller.

use crate::chord::{CHORD_SPLIT, ChordError, ChordSymbol};
use crate::grid::BEATS_PER_MEASURE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressionError {
    #[error("progression entry {entry:?} has an invalid beat count")]
    InvalidBeats { entry: String },
    #[error(transparent)]
    Chord(#[from] ChordError),
}

/// One chord of the input progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordEntry {
    pub symbol: ChordSymbol,
    pub beats: u32,
}

impl ChordEntry {
    pub fn new(symbol: ChordSymbol, beats: u32) -> Self {
        ChordEntry { symbol, beats }
    }

    /// Build entries from `(label, beats)` pairs. Malformed labels are
    /// recovered (and logged) by `ChordSymbol::parse_lenient`.
    pub fn from_labels<S: AsRef<str>>(pairs: &[(S, u32)]) -> Vec<ChordEntry> {
        pairs
            .iter()
            .map(|(label, beats)| {
                ChordEntry::new(ChordSymbol::parse_lenient(label.as_ref()), *beats)
            })
            .collect()
    }
}

/// Total length of a progression in beats.
pub fn total_beats(progression: &[ChordEntry]) -> usize {
    progression.iter().map(|e| e.beats as usize).sum()
}

/// Map a lead-sheet chord figure onto a library type name. Figures the
/// table does not know are returned unchanged.
pub fn normalize_kind(figure: &str) -> &str {
    match figure {
        "min7b5" => "ø7",
        "min9" | "min7" | "m" => "-7",
        "13" => "7",
        "maj7" | "" => "M7",
        "7#9" => "7(#9)",
        "dim" => "o7",
        other => other,
    }
}

/// A chord as found on a lead sheet: root name, raw figure, onset in beats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadSheetChord {
    pub root: String,
    pub figure: String,
    pub offset: u32,
}

/// Turn chord onsets into a progression. Each chord lasts until the next
/// onset; the last one lasts a full measure.
pub fn progression_from_offsets(chords: &[LeadSheetChord]) -> Vec<ChordEntry> {
    chords
        .iter()
        .enumerate()
        .map(|(i, chord)| {
            let beats = match chords.get(i + 1) {
                Some(next) => next.offset.saturating_sub(chord.offset),
                None => BEATS_PER_MEASURE as u32,
            };
            let label = format!(
                "{}{}{}",
                chord.root,
                CHORD_SPLIT,
                normalize_kind(&chord.figure)
            );
            ChordEntry::new(ChordSymbol::parse_lenient(&label), beats)
        })
        .collect()
}

/// Default harmonic rhythm: major sevenths hold a full measure, minor-family
/// chords take half a measure when a dominant follows them (the ii of a
/// ii-V) and a full one otherwise, everything else takes half a measure.
pub fn infer_durations(symbols: &[ChordSymbol]) -> Vec<u32> {
    let full = BEATS_PER_MEASURE as u32;
    let half = full / 2;
    symbols
        .iter()
        .enumerate()
        .map(|(i, symbol)| {
            if symbol.kind == crate::chord::ChordKind::Major7 {
                full
            } else if symbol.kind.is_minor_family() {
                match symbols.get(i + 1) {
                    Some(next) if next.kind.accents_syncopation() => half,
                    _ => full,
                }
            } else {
                half
            }
        })
        .collect()
}

/// Parse a comma-separated progression such as `"D:-7@2, G:7@2, C:M7"`.
///
/// Entries with an `@beats` suffix use it; the rest take the duration
/// `infer_durations` gives them in context. An empty string is an empty
/// progression. Unreadable chord labels are recovered as in
/// `ChordSymbol::parse_lenient`.
pub fn parse_progression(text: &str) -> Result<Vec<ChordEntry>, ProgressionError> {
    parse_entries(text, |label| Ok(ChordSymbol::parse_lenient(label)))
}

/// Like `parse_progression`, but an unreadable chord label is an error.
pub fn parse_progression_strict(text: &str) -> Result<Vec<ChordEntry>, ProgressionError> {
    parse_entries(text, ChordSymbol::parse)
}

fn parse_entries(
    text: &str,
    parse_label: impl Fn(&str) -> Result<ChordSymbol, ChordError>,
) -> Result<Vec<ChordEntry>, ProgressionError> {
    let mut symbols = Vec::new();
    let mut explicit = Vec::new();
    for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (label, beats) = match entry.split_once('@') {
            Some((label, beats)) => {
                let beats = beats
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|&b| b > 0)
                    .ok_or_else(|| ProgressionError::InvalidBeats {
                        entry: entry.to_string(),
                    })?;
                (label.trim(), Some(beats))
            }
            None => (entry, None),
        };
        symbols.push(parse_label(label)?);
        explicit.push(beats);
    }
    let inferred = infer_durations(&symbols);
    Ok(symbols
        .into_iter()
        .zip(explicit)
        .zip(inferred)
        .map(|((symbol, given), default)| {
            ChordEntry::new(symbol, given.unwrap_or(default))
        })
        .collect())
}

/// One melody event. The engine never looks inside beyond counting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MelodyEvent {
    Note { pitch: u8, quarters: f64 },
    Rest { quarters: f64 },
}

impl MelodyEvent {
    pub fn quarters(&self) -> f64 {
        match self {
            MelodyEvent::Note { quarters, .. } | MelodyEvent::Rest { quarters } => *quarters,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, MelodyEvent::Rest { .. })
    }
}

/// The melody line, passed through to the renderer untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Melody(pub Vec<MelodyEvent>);

impl Melody {
    pub fn note_count(&self) -> usize {
        self.0.iter().filter(|e| !e.is_rest()).count()
    }

    pub fn total_quarters(&self) -> f64 {
        self.0.iter().map(MelodyEvent::quarters).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::ChordKind;

    fn symbols(labels: &[&str]) -> Vec<ChordSymbol> {
        labels.iter().map(|l| ChordSymbol::parse(l).unwrap()).collect()
    }

    fn lead_sheet_chord(root: &str, figure: &str, offset: u32) -> LeadSheetChord {
        LeadSheetChord {
            root: root.to_string(),
            figure: figure.to_string(),
            offset,
        }
    }

    #[test]
    fn figure_normalization() {
        assert_eq!(normalize_kind("min7b5"), "ø7");
        assert_eq!(normalize_kind("maj7"), "M7");
        assert_eq!(normalize_kind(""), "M7");
        assert_eq!(normalize_kind("m"), "-7");
        assert_eq!(normalize_kind("dim"), "o7");
        assert_eq!(normalize_kind("7(b9)"), "7(b9)");
    }

    #[test]
    fn offsets_become_durations() {
        let chords = [
            lead_sheet_chord("D", "min7", 0),
            lead_sheet_chord("G", "13", 2),
            lead_sheet_chord("C", "maj7", 4),
        ];
        let progression = progression_from_offsets(&chords);
        let labels: Vec<String> = progression.iter().map(|e| e.symbol.label()).collect();
        assert_eq!(labels, ["D:-7", "G:7", "C:M7"]);
        let beats: Vec<u32> = progression.iter().map(|e| e.beats).collect();
        assert_eq!(beats, [2, 2, 4]);
        assert_eq!(total_beats(&progression), 8);
    }

    #[test]
    fn unknown_figure_recovers() {
        let chords = [lead_sheet_chord("F", "sus2", 0)];
        let progression = progression_from_offsets(&chords);
        assert_eq!(progression[0].symbol.kind, ChordKind::Major7);
        assert_eq!(progression[0].beats, 4);
    }

    #[test]
    fn inferred_harmonic_rhythm() {
        let seq = symbols(&[
            "D:-7", "G:7", "C:M7", "A:-7", "D:-7", "E:ø7", "A:7(b9)", "F:6",
        ]);
        assert_eq!(infer_durations(&seq), [2, 2, 4, 4, 4, 2, 2, 2]);
        // Trailing minor chord holds a full measure.
        assert_eq!(infer_durations(&symbols(&["E:-6"])), [4]);
        assert!(infer_durations(&[]).is_empty());
    }

    #[test]
    fn progression_text() {
        let progression = parse_progression("D:-7, G:7@3 ,C:M7@4").unwrap();
        let beats: Vec<u32> = progression.iter().map(|e| e.beats).collect();
        assert_eq!(beats, [2, 3, 4]);
        assert!(parse_progression("").unwrap().is_empty());
        assert!(matches!(
            parse_progression("C:M7@zero"),
            Err(ProgressionError::InvalidBeats { .. })
        ));
        assert!(parse_progression("C:M7@0").is_err());
    }

    #[test]
    fn strict_progression_rejects_bad_labels() {
        let lenient = parse_progression("Dm7@2,G:7@2").unwrap();
        assert_eq!(lenient[0].symbol.label(), "C:M7");
        assert!(matches!(
            parse_progression_strict("Dm7@2,G:7@2"),
            Err(ProgressionError::Chord(ChordError::MissingSeparator { .. }))
        ));
        assert!(matches!(
            parse_progression_strict("G:sus4"),
            Err(ProgressionError::Chord(ChordError::UnknownKind { .. }))
        ));
        let strict = parse_progression_strict("B-:7@2,E-:M7@2").unwrap();
        assert_eq!(strict.len(), 2);
    }

    #[test]
    fn from_labels_is_lenient() {
        let entries = ChordEntry::from_labels(&[("C:M7", 4), ("G:weird", 2)]);
        assert_eq!(entries[1].symbol.label(), "G:M7");
        assert_eq!(entries[1].beats, 2);
    }

    #[test]
    fn melody_counts() {
        let melody = Melody(vec![
            MelodyEvent::Note {
                pitch: 67,
                quarters: 1.5,
            },
            MelodyEvent::Rest { quarters: 0.5 },
            MelodyEvent::Note {
                pitch: 69,
                quarters: 2.0,
            },
        ]);
        assert_eq!(melody.note_count(), 2);
        assert!((melody.total_quarters() - 4.0).abs() < 1e-9);
    }
}
