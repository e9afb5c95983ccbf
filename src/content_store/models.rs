//! Data models for the content database.

use serde::{Deserialize, Serialize};

/// Row counts of the content database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentStats {
    pub progressions: usize,
    pub explanations: usize,
    /// Entries in the library index, duplicates from concurrent writers included.
    pub library_entries: usize,
}
