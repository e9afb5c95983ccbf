//! Read side of the content store: the browsable library of progressions.

use crate::content_store::ContentStore;
use crate::error::PipelineError;
use crate::progression::{
    ExplanationRecord, NormalizedKey, ProgressionRecord, ProgressionSignature,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// One indexed progression, with the key to fetch its records by.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryEntry {
    pub signature: ProgressionSignature,
    pub key: NormalizedKey,
    pub chords: Vec<String>,
}

impl From<ProgressionSignature> for LibraryEntry {
    fn from(signature: ProgressionSignature) -> Self {
        Self {
            key: NormalizedKey::encode(&signature),
            chords: signature.chords().map(str::to_string).collect(),
            signature,
        }
    }
}

/// Everything stored for one progression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryItem {
    pub signature: ProgressionSignature,
    pub key: NormalizedKey,
    #[serde(rename = "progression")]
    pub progressions: Vec<ProgressionRecord>,
    #[serde(rename = "explanation")]
    pub explanations: Vec<ExplanationRecord>,
}

#[derive(Clone)]
pub struct LibraryService {
    store: Arc<dyn ContentStore>,
}

impl LibraryService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Resolves a key, in raw or encoded form, to its stored records.
    ///
    /// An unknown key yields empty collections, not an error.
    pub fn fetch(&self, raw_key: &str) -> Result<LibraryItem, PipelineError> {
        let key = NormalizedKey::normalize(raw_key)?;
        let signature = key.to_signature()?;

        let progressions = self
            .store
            .get_progressions(&key)
            .map_err(PipelineError::store)?;
        let explanations = self
            .store
            .get_explanations(&key)
            .map_err(PipelineError::store)?;

        debug!(
            key = %key,
            progressions = progressions.len(),
            explanations = explanations.len(),
            "Fetched library item"
        );

        Ok(LibraryItem {
            signature,
            key,
            progressions,
            explanations,
        })
    }

    pub fn list(&self) -> Result<Vec<LibraryEntry>, PipelineError> {
        let signatures = self.store.list_signatures().map_err(PipelineError::store)?;
        Ok(signatures.into_iter().map(LibraryEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_store::SqliteContentStore;
    use crate::progression::ExplanationEntry;
    use tempfile::TempDir;

    fn create_test_service() -> (LibraryService, Arc<SqliteContentStore>, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(SqliteContentStore::new(tmp.path().join("content.db")).unwrap());
        (LibraryService::new(store.clone()), store, tmp)
    }

    fn record(id: &str, chords: &[&str]) -> ProgressionRecord {
        ProgressionRecord {
            id: id.into(),
            progression: chords.iter().map(|c| c.to_string()).collect(),
            context: String::new(),
            key: "C# minor".into(),
            scale: "minor".into(),
            tempo: "90".into(),
            style: "Rock".into(),
            fingering: None,
            strumming_pattern: None,
        }
    }

    #[test]
    fn fetch_accepts_raw_and_encoded_keys() {
        let (service, store, _tmp) = create_test_service();
        store.append_progression(&record("p1", &["C#m", "A"])).unwrap();
        let signature = ProgressionSignature::parse("C#m,A").unwrap();
        store
            .append_explanation(
                &signature,
                &ExplanationRecord {
                    id: "e1".into(),
                    result: vec![ExplanationEntry {
                        topic: "Relative major".into(),
                        explanation: "A is the relative major of F#m.".into(),
                    }],
                },
            )
            .unwrap();

        let by_key = service.fetch("C_sharp_m,A").unwrap();
        let by_raw = service.fetch("C#m,A").unwrap();
        assert_eq!(by_key, by_raw);
        assert_eq!(by_key.signature, signature);
        assert_eq!(by_key.progressions.len(), 1);
        assert_eq!(by_key.explanations[0].id, "e1");
    }

    #[test]
    fn fetch_of_unknown_key_is_empty() {
        let (service, _store, _tmp) = create_test_service();
        let item = service.fetch("E,B").unwrap();
        assert!(item.progressions.is_empty());
        assert!(item.explanations.is_empty());
    }

    #[test]
    fn fetch_rejects_invalid_key() {
        let (service, _store, _tmp) = create_test_service();
        assert!(matches!(
            service.fetch("_sharp_C"),
            Err(PipelineError::InvalidKey(_))
        ));
        assert!(matches!(service.fetch(""), Err(PipelineError::InvalidKey(_))));
    }

    #[test]
    fn list_exposes_keys() {
        let (service, store, _tmp) = create_test_service();
        store
            .register_signature(&ProgressionSignature::parse("F#,B").unwrap())
            .unwrap();

        let entries = service.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key.as_str(), "F_sharp_,B");
        assert_eq!(entries[0].chords, vec!["F#", "B"]);

        let json = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(json["signature"], "F#,B");
        assert_eq!(json["key"], "F_sharp_,B");
    }
}
