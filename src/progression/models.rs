//! Records produced by the generation pipeline and kept in the content store.

use super::signature::{ProgressionSignature, SignatureError};
use serde::{Deserialize, Serialize};

/// Fret diagram for one chord, written as "X-X-X-X-X-X" (low string first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordFingering {
    pub chord: String,
    pub tab: String,
}

/// A validated progression, identified by `id` and grouped by its signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionRecord {
    pub id: String,
    pub progression: Vec<String>,
    pub context: String,
    pub key: String,
    pub scale: String,
    pub tempo: String,
    pub style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingering: Option<Vec<ChordFingering>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strumming_pattern: Option<String>,
}

impl ProgressionRecord {
    pub fn signature(&self) -> Result<ProgressionSignature, SignatureError> {
        ProgressionSignature::from_chords(&self.progression)
    }
}

/// A progression that passed validation but has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressionDraft {
    pub progression: Vec<String>,
    pub context: String,
    pub key: String,
    pub scale: String,
    pub tempo: String,
    pub style: String,
    pub fingering: Option<Vec<ChordFingering>>,
    pub strumming_pattern: Option<String>,
}

impl ProgressionDraft {
    pub fn into_record(self, id: String) -> ProgressionRecord {
        ProgressionRecord {
            id,
            progression: self.progression,
            context: self.context,
            key: self.key,
            scale: self.scale,
            tempo: self.tempo,
            style: self.style,
            fingering: self.fingering,
            strumming_pattern: self.strumming_pattern,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationEntry {
    pub topic: String,
    pub explanation: String,
}

/// A set of theory topics about one progression. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationRecord {
    pub id: String,
    pub result: Vec<ExplanationEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationDraft {
    pub result: Vec<ExplanationEntry>,
}

impl ExplanationDraft {
    pub fn into_record(self, id: String) -> ExplanationRecord {
        ExplanationRecord {
            id,
            result: self.result,
        }
    }
}

/// Who authored a turn of an explanation conversation.
///
/// System turns belong to the prompt compiler and are never accepted from
/// callers, so they have no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}
