// Chord voicing library and transposition.
//
// Every voicing is written once, rooted on C3, as a list of MIDI pitches
// whose first (lowest) note is the root and whose remaining notes are the
// upper structure a pianist would comp with. Any other root is reached by
// `transpose`, which knows nothing about chord types.
//
// The built-in table has two or three variants per type so the voice-leading
// selector (voice_leading.rs) has registers to choose between. A custom table
// can be loaded from JSON with pitch names (`"Bb3"`, `"D#4"`), following the
// same JSON-string-in, typed-struct-out pattern as `BackingConfig`.

use crate::chord::ChordKind;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoicingError {
    #[error("voicing library JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{kind} variant {index}: unreadable pitch name {name:?}")]
    BadPitch {
        kind: ChordKind,
        index: usize,
        name: String,
    },
    #[error("{kind} variant {index}: needs a root and at least one upper note")]
    TooFewNotes { kind: ChordKind, index: usize },
    #[error("{kind} variant {index}: first note must be the lowest")]
    RootNotLowest { kind: ChordKind, index: usize },
    #[error("voicing library has no M7 entry to fall back on")]
    MissingFallback,
}

/// One chord voicing as MIDI pitches, lowest (root) first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voicing(Vec<u8>);

impl Voicing {
    pub fn new(pitches: Vec<u8>) -> Self {
        Voicing(pitches)
    }

    pub fn pitches(&self) -> &[u8] {
        &self.0
    }

    /// The lowest pitch, which carries the chord root.
    pub fn root(&self) -> Option<u8> {
        self.0.first().copied()
    }

    /// Every pitch above the root.
    pub fn upper(&self) -> &[u8] {
        self.0.get(1..).unwrap_or(&[])
    }

    /// Mean MIDI height of the upper structure. Falls back to the whole
    /// voicing when there is no upper structure.
    pub fn upper_mean(&self) -> f64 {
        let notes = if self.upper().is_empty() {
            self.pitches()
        } else {
            self.upper()
        };
        mean_pitch(notes)
    }
}

/// Mean MIDI height of a set of pitches (0.0 for an empty set).
pub fn mean_pitch(pitches: &[u8]) -> f64 {
    if pitches.is_empty() {
        return 0.0;
    }
    pitches.iter().map(|&p| p as f64).sum::<f64>() / pitches.len() as f64
}

/// Shift every pitch of a voicing by `semitones`, clamped to the MIDI range.
pub fn transpose(voicing: &Voicing, semitones: i8) -> Voicing {
    Voicing(
        voicing
            .0
            .iter()
            .map(|&p| (p as i16 + semitones as i16).clamp(0, 127) as u8)
            .collect(),
    )
}

/// Signed interval from C to a root, folded into `[-6, 6]` so transposed
/// voicings stay near their written register.
pub fn fold_interval(semitones_from_c: i8) -> i8 {
    let mut interval = semitones_from_c;
    if interval > 6 {
        interval -= 12;
    } else if interval < -6 {
        interval += 12;
    }
    interval
}

/// Voicing variants per chord type, all rooted on C.
#[derive(Debug, Clone)]
pub struct VoicingLibrary {
    entries: BTreeMap<ChordKind, Vec<Voicing>>,
}

impl VoicingLibrary {
    /// The built-in jazz voicings.
    ///
    /// Names, for reference: C3=48, A3=57, Bb3=58, B3=59, Db4=61, D4=62,
    /// D#4/Eb4=63, E4=64, F4=65, Gb4=66, G4=67, Ab4=68, A4=69, Bb4=70,
    /// B4=71, Db5=73, D5=74, D#5/Eb5=75.
    pub fn default_library() -> Self {
        let table: [(ChordKind, &[&[u8]]); 11] = [
            (ChordKind::Major7, &[&[48, 59, 62, 64, 67], &[48, 64, 67, 71, 74]]),
            (ChordKind::Major6, &[&[48, 57, 62, 64, 67], &[48, 64, 67, 69, 74]]),
            (ChordKind::Dominant7, &[&[48, 58, 62, 64, 69], &[48, 64, 69, 70, 74]]),
            (ChordKind::Dominant11, &[&[48, 58, 62, 65, 69], &[48, 65, 69, 70, 74]]),
            (
                ChordKind::Dominant7Flat9,
                &[&[48, 58, 61, 64, 69], &[48, 64, 69, 70, 73]],
            ),
            (
                ChordKind::Dominant7Sharp9,
                &[&[48, 58, 63, 64, 69], &[48, 64, 69, 70, 75]],
            ),
            (
                ChordKind::Diminished7,
                &[&[48, 57, 63, 66], &[48, 63, 66, 69], &[48, 66, 69, 75]],
            ),
            (ChordKind::Augmented7, &[&[48, 58, 63, 64, 68], &[48, 64, 68, 70, 75]]),
            (ChordKind::Minor7, &[&[48, 58, 62, 63, 67], &[48, 63, 67, 70, 74]]),
            (ChordKind::Minor6, &[&[48, 57, 62, 63, 67], &[48, 63, 67, 69, 74]]),
            (
                ChordKind::HalfDiminished7,
                &[&[48, 58, 63, 66], &[48, 63, 66, 70], &[48, 66, 70, 75]],
            ),
        ];
        let entries = table
            .into_iter()
            .map(|(kind, variants)| {
                let voicings = variants.iter().map(|v| Voicing(v.to_vec())).collect();
                (kind, voicings)
            })
            .collect();
        VoicingLibrary { entries }
    }

    /// Load a library from JSON: an object keyed by chord type, each value a
    /// list of variants, each variant a list of pitch names rooted on C.
    pub fn from_json(json: &str) -> Result<Self, VoicingError> {
        let raw: BTreeMap<ChordKind, Vec<Vec<String>>> = serde_json::from_str(json)?;
        let mut entries = BTreeMap::new();
        for (kind, variants) in raw {
            let mut voicings = Vec::with_capacity(variants.len());
            for (index, names) in variants.into_iter().enumerate() {
                let pitches = names
                    .iter()
                    .map(|name| {
                        parse_pitch_name(name).ok_or_else(|| VoicingError::BadPitch {
                            kind,
                            index,
                            name: name.clone(),
                        })
                    })
                    .collect::<Result<Vec<u8>, _>>()?;
                if pitches.len() < 2 {
                    return Err(VoicingError::TooFewNotes { kind, index });
                }
                if pitches[1..].iter().any(|&p| p < pitches[0]) {
                    return Err(VoicingError::RootNotLowest { kind, index });
                }
                voicings.push(Voicing(pitches));
            }
            if !voicings.is_empty() {
                entries.insert(kind, voicings);
            }
        }
        if !entries.contains_key(&ChordKind::Major7) {
            return Err(VoicingError::MissingFallback);
        }
        Ok(VoicingLibrary { entries })
    }

    /// The C-rooted variants for `kind`.
    ///
    /// A type the library does not define falls back to the major-seventh
    /// variants (always present), with a warning.
    pub fn variants(&self, kind: ChordKind) -> &[Voicing] {
        if let Some(variants) = self.entries.get(&kind) {
            return variants;
        }
        warn!("no voicing for chord type {kind}; using M7");
        self.entries
            .get(&ChordKind::Major7)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, kind: ChordKind) -> bool {
        self.entries.contains_key(&kind)
    }
}

impl Default for VoicingLibrary {
    fn default() -> Self {
        VoicingLibrary::default_library()
    }
}

/// Parse a scientific pitch name (`"C4"` = 60, `"Bb3"`, `"D#4"`, `"E-4"`).
///
/// `-` is always a flat, as in music21 spellings, and the octave is a
/// non-negative number: `"C-1"` is C-flat in octave 1, not C in octave -1.
/// Pitches below C0 cannot be named.
pub fn parse_pitch_name(name: &str) -> Option<u8> {
    let split = name.find(|c: char| c.is_ascii_digit())?;
    let (note, octave) = name.split_at(split);
    let note = crate::chord::NoteName::parse(note)?;
    let octave: i16 = octave.parse().ok()?;
    let midi = (octave + 1) * 12 + note.semitones_from_c() as i16;
    u8::try_from(midi).ok().filter(|&m| m <= 127)
}

/// Compact note name for a MIDI pitch, flats preferred (`58` -> `"Bb3"`).
pub fn pitch_name(pitch: u8) -> String {
    const NAMES: [&str; 12] = [
        "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
    ];
    let octave = (pitch / 12) as i16 - 1;
    format!("{}{}", NAMES[(pitch % 12) as usize], octave)
}
