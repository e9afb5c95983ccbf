//! Reversible mapping between a progression signature and a token that is safe
//! to use as a storage key and as a URL path segment.
//!
//! Every `#` becomes [`SHARP_MARKER`]; nothing else changes. Signatures never
//! contain `_` (see [`RESERVED_CHAR`]), so every `_` in a key belongs to a
//! marker and decoding is unambiguous.

use super::signature::{ProgressionSignature, CHORD_SEPARATOR, RESERVED_CHAR, SHARP};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub const SHARP_MARKER: &str = "_sharp_";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("key contains an unescaped '#' at byte {0}")]
    UnescapedSharp(usize),

    #[error("key contains a stray '_' at byte {0}")]
    StrayMarker(usize),

    #[error("sharp marker at byte {0} does not follow a chord root")]
    MisplacedMarker(usize),

    #[error("key does not decode to a valid progression: {0}")]
    InvalidSignature(String),
}

/// A signature after escaping, ready for storage or a URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    /// Encodes a signature. Never fails.
    pub fn encode(signature: &ProgressionSignature) -> Self {
        Self(signature.as_str().replace(SHARP, SHARP_MARKER))
    }

    /// Validates an externally supplied key and returns the signature it encodes.
    pub fn decode(key: &str) -> Result<ProgressionSignature, KeyError> {
        let mut decoded = String::with_capacity(key.len());
        let mut at_chord_start = true;
        let mut i = 0;

        while i < key.len() {
            let rest = &key[i..];
            if rest.starts_with(SHARP_MARKER) {
                if at_chord_start {
                    return Err(KeyError::MisplacedMarker(i));
                }
                decoded.push(SHARP);
                i += SHARP_MARKER.len();
                continue;
            }

            let Some(ch) = rest.chars().next() else {
                break;
            };
            if ch == SHARP {
                return Err(KeyError::UnescapedSharp(i));
            }
            if ch == RESERVED_CHAR {
                return Err(KeyError::StrayMarker(i));
            }
            at_chord_start = ch == CHORD_SEPARATOR;
            decoded.push(ch);
            i += ch.len_utf8();
        }

        ProgressionSignature::parse(&decoded)
            .map_err(|e| KeyError::InvalidSignature(e.to_string()))
    }

    /// Accepts either a raw signature (anything containing `#`) or an encoded
    /// key, and returns the canonical encoded key.
    pub fn normalize(input: &str) -> Result<Self, KeyError> {
        if input.contains(SHARP) {
            let signature = ProgressionSignature::parse(input)
                .map_err(|e| KeyError::InvalidSignature(e.to_string()))?;
            return Ok(Self::encode(&signature));
        }
        let signature = Self::decode(input)?;
        Ok(Self::encode(&signature))
    }

    pub fn to_signature(&self) -> Result<ProgressionSignature, KeyError> {
        Self::decode(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&ProgressionSignature> for NormalizedKey {
    fn from(signature: &ProgressionSignature) -> Self {
        Self::encode(signature)
    }
}
