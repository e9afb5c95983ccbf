//! ContentStore trait definition.

use super::models::ContentStats;
use crate::progression::{
    ExplanationRecord, NormalizedKey, ProgressionRecord, ProgressionSignature,
};
use anyhow::Result;

/// Append-only storage for generated records and the library index.
///
/// Records are grouped by the [`NormalizedKey`] of their progression. Each
/// group is an ordered collection that only ever grows; progressions and
/// explanations live in separate namespaces.
pub trait ContentStore: Send + Sync {
    // =========================================================================
    // Records
    // =========================================================================

    /// Appends a progression under the key derived from its chords and
    /// returns that key.
    fn append_progression(&self, record: &ProgressionRecord) -> Result<NormalizedKey>;

    /// Appends an explanation under the key of `signature`.
    fn append_explanation(
        &self,
        signature: &ProgressionSignature,
        record: &ExplanationRecord,
    ) -> Result<()>;

    /// All progressions stored under `key`, oldest first.
    fn get_progressions(&self, key: &NormalizedKey) -> Result<Vec<ProgressionRecord>>;

    /// All explanations stored under `key`, oldest first.
    fn get_explanations(&self, key: &NormalizedKey) -> Result<Vec<ExplanationRecord>>;

    // =========================================================================
    // Library index
    // =========================================================================

    /// Adds `signature` to the index unless it is already there.
    ///
    /// Returns whether it was added. The presence check and the append are
    /// separate steps: two writers racing on a new signature may both add it.
    fn register_signature(&self, signature: &ProgressionSignature) -> Result<bool>;

    /// Indexed signatures in registration order.
    fn list_signatures(&self) -> Result<Vec<ProgressionSignature>>;

    // =========================================================================
    // Statistics
    // =========================================================================

    fn get_stats(&self) -> Result<ContentStats>;
}
