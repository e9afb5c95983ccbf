//! Canonical identity of an ordered chord list.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Separator placed between chords in a signature.
pub const CHORD_SEPARATOR: char = ',';

/// Character reserved for the storage key escape marker. Chord names may not
/// contain it, which keeps the key encoding collision-free.
pub const RESERVED_CHAR: char = '_';

/// A chord may contain it anywhere except in first position.
pub const SHARP: char = '#';

/// Longest chord name accepted, in characters.
pub const MAX_CHORD_NAME_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("progression must contain at least one chord")]
    Empty,

    #[error("chord #{index} is blank")]
    BlankChord { index: usize },

    #[error("chord #{index} ({chord:?}) contains reserved character {ch:?}")]
    ReservedCharacter { index: usize, chord: String, ch: char },

    #[error("chord #{index} ({chord:?}) is too long")]
    TooLong { index: usize, chord: String },

    #[error("chord #{index} ({chord:?}) starts with a sharp instead of a root")]
    LeadingSharp { index: usize, chord: String },
}

/// Validates a single chord name at position `index` of a progression.
pub fn validate_chord(index: usize, chord: &str) -> Result<(), SignatureError> {
    if chord.trim().is_empty() {
        return Err(SignatureError::BlankChord { index });
    }
    if chord.starts_with(SHARP) {
        return Err(SignatureError::LeadingSharp {
            index,
            chord: chord.to_string(),
        });
    }
    if let Some(ch) = chord
        .chars()
        .find(|c| *c == CHORD_SEPARATOR || *c == RESERVED_CHAR)
    {
        return Err(SignatureError::ReservedCharacter {
            index,
            chord: chord.to_string(),
            ch,
        });
    }
    if chord.chars().count() > MAX_CHORD_NAME_LEN {
        return Err(SignatureError::TooLong {
            index,
            chord: chord.to_string(),
        });
    }
    Ok(())
}

/// The chords of a progression joined in order by [`CHORD_SEPARATOR`].
///
/// Two records with the same signature are the same progression, whatever
/// their other fields say.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProgressionSignature(String);

impl ProgressionSignature {
    pub fn from_chords<S: AsRef<str>>(chords: &[S]) -> Result<Self, SignatureError> {
        if chords.is_empty() {
            return Err(SignatureError::Empty);
        }
        for (index, chord) in chords.iter().enumerate() {
            validate_chord(index, chord.as_ref())?;
        }
        let joined = chords
            .iter()
            .map(|c| c.as_ref())
            .collect::<Vec<_>>()
            .join(&CHORD_SEPARATOR.to_string());
        Ok(Self(joined))
    }

    /// Parses an already-joined signature string.
    pub fn parse(s: &str) -> Result<Self, SignatureError> {
        let chords: Vec<&str> = s.split(CHORD_SEPARATOR).collect();
        if s.is_empty() {
            return Err(SignatureError::Empty);
        }
        Self::from_chords(&chords)
    }

    pub fn chords(&self) -> impl Iterator<Item = &str> {
        self.0.split(CHORD_SEPARATOR)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgressionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProgressionSignature {
    type Error = SignatureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProgressionSignature> for String {
    fn from(value: ProgressionSignature) -> Self {
        value.0
    }
}
