//! Shared constants for end-to-end tests
//!
//! Canned completion replies and the values derived from them.
//! When a reply changes, update the derived constants next to it.

#![allow(dead_code)]

// ============================================================================
// Timeouts
// ============================================================================

pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Completion replies
// ============================================================================

/// A progression reply using the `result` field, wrapped in prose.
pub const JAZZ_PROGRESSION_REPLY: &str = r#"Sure! Here is your progression:
{"result": ["Cmaj7", "Am7", "Dm7", "G7"], "context": "A warm ii-V turnaround", "key": "C", "scale": "major", "tempo": "120", "style": "Jazz", "fingering": [{"chord": "Cmaj7", "tab": "X-3-2-0-0-0"}], "strumming_pattern": "D-DU-UD"}
Enjoy!"#;

pub const JAZZ_SIGNATURE: &str = "Cmaj7,Am7,Dm7,G7";
pub const JAZZ_KEY: &str = "Cmaj7,Am7,Dm7,G7";

/// A progression with sharps, so its key carries markers.
pub const ROCK_PROGRESSION_REPLY: &str = r#"{"progression": ["C#m", "A", "E", "B"], "context": "Driving", "key": "E", "scale": "major", "tempo": "140", "style": "Rock"}"#;

pub const ROCK_SIGNATURE: &str = "C#m,A,E,B";
pub const ROCK_KEY: &str = "C_sharp_m,A,E,B";

pub const EXPLANATION_REPLY: &str = r#"{"result": [
  {"topic": "Relative minor", "explanation": "C#m is the relative minor of E major."},
  {"topic": "Plagal motion", "explanation": "A to E is a IV to I movement."},
  {"topic": "Dominant pull", "explanation": "B is the V chord and pulls back to C#m's relative major."}
]}"#;

pub const TABLATURE_REPLY: &str = r#"{"result": [
  {"chord": "C#m", "tab": "X-4-6-6-5-4"},
  {"chord": "A", "tab": "X-0-2-2-2-0"}
]}"#;

pub const PROSE_REPLY: &str = "I'm sorry, I can't help with that.";
