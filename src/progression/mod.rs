//! Progression identity and the records built around it.

mod key;
mod models;
mod signature;

pub use key::{KeyError, NormalizedKey, SHARP_MARKER};
pub use models::{
    ChordFingering, ConversationTurn, ExplanationDraft, ExplanationEntry, ExplanationRecord,
    ProgressionDraft, ProgressionRecord, TurnRole,
};
pub use signature::{validate_chord, ProgressionSignature, SignatureError, MAX_CHORD_NAME_LEN};
