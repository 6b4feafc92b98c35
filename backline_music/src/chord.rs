// Chord symbols: `root:type` labels and the closed set of chord types.
//
// Labels arrive from the lead-sheet side as strings like `"Bb:-7"` or
// `"G:7(b9)"`. The root keeps its original spelling (sharps `#`, flats `b` or
// music21-style `-`) because label equality is what the syncopation rule
// compares; the type is one of the `ChordKind`s the voicing library knows.
//
// Two type families matter downstream and they are not the same set:
// - `accents_syncopation`: {7, 7(b9), o7} get the five-voice off-beat accent
//   in rules.rs.
// - `resolves_smoothly`: {7, 7(b9), o7, ø7} raise the smooth voice-leading
//   probability for the chord that follows them (voice_leading.rs).

use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between root and type in a chord label.
pub const CHORD_SPLIT: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChordError {
    #[error("chord label {label:?} has no ':' between root and type")]
    MissingSeparator { label: String },
    #[error("chord label {label:?} has an unreadable root {root:?}")]
    InvalidRoot { label: String, root: String },
    #[error("chord label {label:?} has unknown type {kind:?}")]
    UnknownKind { label: String, kind: String },
}

/// Chord types with a voicing in the default library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChordKind {
    #[serde(rename = "M7")]
    Major7,
    #[serde(rename = "6")]
    Major6,
    #[serde(rename = "7")]
    Dominant7,
    #[serde(rename = "11")]
    Dominant11,
    #[serde(rename = "7(b9)")]
    Dominant7Flat9,
    #[serde(rename = "7(#9)")]
    Dominant7Sharp9,
    #[serde(rename = "o7")]
    Diminished7,
    #[serde(rename = "7#5")]
    Augmented7,
    #[serde(rename = "-7")]
    Minor7,
    #[serde(rename = "-6")]
    Minor6,
    #[serde(rename = "ø7")]
    HalfDiminished7,
}

impl ChordKind {
    pub const ALL: [ChordKind; 11] = [
        ChordKind::Major7,
        ChordKind::Major6,
        ChordKind::Dominant7,
        ChordKind::Dominant11,
        ChordKind::Dominant7Flat9,
        ChordKind::Dominant7Sharp9,
        ChordKind::Diminished7,
        ChordKind::Augmented7,
        ChordKind::Minor7,
        ChordKind::Minor6,
        ChordKind::HalfDiminished7,
    ];

    /// The type text used in labels.
    pub fn label(self) -> &'static str {
        match self {
            ChordKind::Major7 => "M7",
            ChordKind::Major6 => "6",
            ChordKind::Dominant7 => "7",
            ChordKind::Dominant11 => "11",
            ChordKind::Dominant7Flat9 => "7(b9)",
            ChordKind::Dominant7Sharp9 => "7(#9)",
            ChordKind::Diminished7 => "o7",
            ChordKind::Augmented7 => "7#5",
            ChordKind::Minor7 => "-7",
            ChordKind::Minor6 => "-6",
            ChordKind::HalfDiminished7 => "ø7",
        }
    }

    /// Types that get the five-voice off-beat accent when the harmony holds.
    pub fn accents_syncopation(self) -> bool {
        matches!(
            self,
            ChordKind::Dominant7 | ChordKind::Dominant7Flat9 | ChordKind::Diminished7
        )
    }

    /// Types whose successor is voiced with the higher smooth-voice-leading
    /// probability.
    pub fn resolves_smoothly(self) -> bool {
        matches!(
            self,
            ChordKind::Dominant7
                | ChordKind::Dominant7Flat9
                | ChordKind::Diminished7
                | ChordKind::HalfDiminished7
        )
    }

    /// Minor-family types that shorten to two beats ahead of a dominant.
    pub fn is_minor_family(self) -> bool {
        matches!(
            self,
            ChordKind::Minor7 | ChordKind::Minor6 | ChordKind::HalfDiminished7
        )
    }
}

impl FromStr for ChordKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChordKind::ALL
            .into_iter()
            .find(|kind| kind.label() == s)
            .ok_or(())
    }
}

impl fmt::Display for ChordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A root note name as spelled in the label (`"C"`, `"F#"`, `"Bb"`, `"E-"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoteName {
    spelling: String,
    semitones: i8,
}

impl NoteName {
    /// Parse a letter A–G followed by up to two accidentals (`#`, `b`, `-`).
    pub fn parse(text: &str) -> Option<NoteName> {
        let mut chars = text.chars();
        let letter = chars.next()?;
        let base: i8 = match letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return None,
        };
        let mut shift: i8 = 0;
        let mut count = 0;
        for c in chars {
            shift += match c {
                '#' => 1,
                'b' | '-' => -1,
                _ => return None,
            };
            count += 1;
        }
        if count > 2 {
            return None;
        }
        Some(NoteName {
            spelling: text.to_string(),
            semitones: base + shift,
        })
    }

    pub fn c() -> NoteName {
        NoteName {
            spelling: "C".to_string(),
            semitones: 0,
        }
    }

    /// Signed distance up from C in the same octave (`Cb` = -1, `B#` = 12).
    pub fn semitones_from_c(&self) -> i8 {
        self.semitones
    }

    /// Spelling as given in the label.
    pub fn spelling(&self) -> &str {
        &self.spelling
    }

    /// Spelling with music21 `-` flats shown as `b`.
    pub fn display(&self) -> String {
        self.spelling.replace('-', "b")
    }
}

/// A parsed `root:type` chord label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ChordSymbol {
    pub root: NoteName,
    pub kind: ChordKind,
}

impl ChordSymbol {
    pub fn new(root: NoteName, kind: ChordKind) -> Self {
        ChordSymbol { root, kind }
    }

    pub fn parse(label: &str) -> Result<ChordSymbol, ChordError> {
        let (root_text, kind_text) =
            label
                .split_once(CHORD_SPLIT)
                .ok_or_else(|| ChordError::MissingSeparator {
                    label: label.to_string(),
                })?;
        let root = NoteName::parse(root_text).ok_or_else(|| ChordError::InvalidRoot {
            label: label.to_string(),
            root: root_text.to_string(),
        })?;
        let kind = kind_text
            .parse::<ChordKind>()
            .map_err(|()| ChordError::UnknownKind {
                label: label.to_string(),
                kind: kind_text.to_string(),
            })?;
        Ok(ChordSymbol { root, kind })
    }

    /// Parse a label, recovering from any error with a major-seventh chord.
    ///
    /// The root is kept when it can be read (a bare `"G"` becomes `G:M7`),
    /// otherwise it becomes C. The recovery is logged.
    pub fn parse_lenient(label: &str) -> ChordSymbol {
        match ChordSymbol::parse(label) {
            Ok(symbol) => symbol,
            Err(err) => {
                let root_text = label.split(CHORD_SPLIT).next().unwrap_or_default();
                let root = NoteName::parse(root_text).unwrap_or_else(NoteName::c);
                let symbol = ChordSymbol::new(root, ChordKind::Major7);
                warn!("{err}; substituting {}", symbol.label());
                symbol
            }
        }
    }

    /// Canonical `root:type` label.
    pub fn label(&self) -> String {
        format!(
            "{}{}{}",
            self.root.spelling(),
            CHORD_SPLIT,
            self.kind.label()
        )
    }

    /// Display text for the score, e.g. `"Bb-7"`.
    pub fn annotation(&self) -> String {
        format!("{}{}", self.root.display(), self.kind.label())
    }
}

impl fmt::Display for ChordSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<ChordSymbol> for String {
    fn from(symbol: ChordSymbol) -> String {
        symbol.label()
    }
}

impl TryFrom<String> for ChordSymbol {
    type Error = ChordError;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        ChordSymbol::parse(&label)
    }
}

impl FromStr for ChordSymbol {
    type Err = ChordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChordSymbol::parse(s)
    }
}
