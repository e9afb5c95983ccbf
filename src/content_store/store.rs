//! SQLite-backed content store implementation.

use super::models::ContentStats;
use super::schema::CONTENT_SCHEMA;
use super::trait_def::ContentStore;
use crate::progression::{
    ExplanationRecord, NormalizedKey, ProgressionRecord, ProgressionSignature,
};
use crate::sqlite_persistence::ensure_schema;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// SQLite-backed content store.
#[derive(Clone)]
pub struct SqliteContentStore {
    read_conn: Arc<Mutex<Connection>>,
    write_conn: Arc<Mutex<Connection>>,
}

impl SqliteContentStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open content database")?;

        ensure_schema(&write_conn, &CONTENT_SCHEMA, "content")?;

        write_conn
            .pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on content write connection")?;

        let read_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open content database for reading")?;

        read_conn
            .pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on content read connection")?;

        let stats = Self::count_rows(&read_conn)?;
        info!(
            "Content store ready: {} progressions, {} explanations, {} library entries",
            stats.progressions, stats.explanations, stats.library_entries
        );

        Ok(Self {
            read_conn: Arc::new(Mutex::new(read_conn)),
            write_conn: Arc::new(Mutex::new(write_conn)),
        })
    }

    fn count_rows(conn: &Connection) -> Result<ContentStats> {
        let progressions: usize =
            conn.query_row("SELECT COUNT(*) FROM progression_records", [], |r| r.get(0))?;
        let explanations: usize =
            conn.query_row("SELECT COUNT(*) FROM explanation_records", [], |r| r.get(0))?;
        let library_entries: usize =
            conn.query_row("SELECT COUNT(*) FROM library_index", [], |r| r.get(0))?;
        Ok(ContentStats {
            progressions,
            explanations,
            library_entries,
        })
    }

    fn append_payload(
        &self,
        table: &str,
        key: &NormalizedKey,
        record_id: &str,
        payload: &str,
    ) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (storage_key, record_id, payload) VALUES (?1, ?2, ?3)",
                table
            ),
            params![key.as_str(), record_id, payload],
        )
        .with_context(|| format!("Failed to append to {} under {}", table, key))?;
        Ok(())
    }

    /// Payloads under `key` in insertion order. Rows that no longer parse are
    /// skipped with a warning rather than failing the whole lookup.
    fn read_payloads<T: DeserializeOwned>(&self, table: &str, key: &NormalizedKey) -> Result<Vec<T>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT record_id, payload FROM {} WHERE storage_key = ?1 ORDER BY seq ASC",
            table
        ))?;
        let rows = stmt
            .query_map(params![key.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to read {} under {}", table, key))?;

        Ok(rows
            .into_iter()
            .filter_map(|(record_id, payload)| {
                serde_json::from_str(&payload)
                    .map_err(|e| {
                        warn!("Malformed payload in {} for record {}: {}", table, record_id, e);
                    })
                    .ok()
            })
            .collect())
    }
}

impl ContentStore for SqliteContentStore {
    fn append_progression(&self, record: &ProgressionRecord) -> Result<NormalizedKey> {
        let signature = record
            .signature()
            .context("Progression record has an invalid chord list")?;
        let key = NormalizedKey::encode(&signature);
        let payload = serde_json::to_string(record)?;
        self.append_payload("progression_records", &key, &record.id, &payload)?;
        debug!(key = %key, id = %record.id, "Stored progression");
        Ok(key)
    }

    fn append_explanation(
        &self,
        signature: &ProgressionSignature,
        record: &ExplanationRecord,
    ) -> Result<()> {
        let key = NormalizedKey::encode(signature);
        let payload = serde_json::to_string(record)?;
        self.append_payload("explanation_records", &key, &record.id, &payload)?;
        debug!(key = %key, id = %record.id, "Stored explanation");
        Ok(())
    }

    fn get_progressions(&self, key: &NormalizedKey) -> Result<Vec<ProgressionRecord>> {
        self.read_payloads("progression_records", key)
    }

    fn get_explanations(&self, key: &NormalizedKey) -> Result<Vec<ExplanationRecord>> {
        self.read_payloads("explanation_records", key)
    }

    fn register_signature(&self, signature: &ProgressionSignature) -> Result<bool> {
        let already_indexed = {
            let conn = self.read_conn.lock().unwrap();
            conn.query_row(
                "SELECT 1 FROM library_index WHERE signature = ?1 LIMIT 1",
                params![signature.as_str()],
                |_| Ok(()),
            )
            .optional()
            .context("Failed to look up library index")?
            .is_some()
        };
        if already_indexed {
            return Ok(false);
        }

        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO library_index (signature) VALUES (?1)",
            params![signature.as_str()],
        )
        .context("Failed to append to library index")?;
        Ok(true)
    }

    fn list_signatures(&self) -> Result<Vec<ProgressionSignature>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached("SELECT signature FROM library_index ORDER BY position ASC")?;
        let raw = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read library index")?;

        Ok(raw
            .into_iter()
            .filter_map(|s| match ProgressionSignature::parse(&s) {
                Ok(signature) => Some(signature),
                Err(e) => {
                    warn!("Skipping invalid signature {:?} in library index: {}", s, e);
                    None
                }
            })
            .collect())
    }

    fn get_stats(&self) -> Result<ContentStats> {
        let conn = self.read_conn.lock().unwrap();
        Self::count_rows(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::{ChordFingering, ExplanationEntry};
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteContentStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("content.db");
        let store = SqliteContentStore::new(&db_path).unwrap();
        (store, tmp)
    }

    fn make_progression(id: &str, chords: &[&str]) -> ProgressionRecord {
        ProgressionRecord {
            id: id.to_string(),
            progression: chords.iter().map(|c| c.to_string()).collect(),
            context: "test".to_string(),
            key: "C".to_string(),
            scale: "major".to_string(),
            tempo: "120".to_string(),
            style: "Pop".to_string(),
            fingering: Some(vec![ChordFingering {
                chord: chords[0].to_string(),
                tab: "X-3-2-0-1-0".to_string(),
            }]),
            strumming_pattern: None,
        }
    }

    fn make_explanation(id: &str, topic: &str) -> ExplanationRecord {
        ExplanationRecord {
            id: id.to_string(),
            result: vec![ExplanationEntry {
                topic: topic.to_string(),
                explanation: "Some words.".to_string(),
            }],
        }
    }

    fn sig(s: &str) -> ProgressionSignature {
        ProgressionSignature::parse(s).unwrap()
    }

    #[test]
    fn test_append_and_get_progressions_in_order() {
        let (store, _tmp) = create_test_store();

        let key = store
            .append_progression(&make_progression("p1", &["C#m", "A", "E", "B"]))
            .unwrap();
        assert_eq!(key.as_str(), "C_sharp_m,A,E,B");
        store
            .append_progression(&make_progression("p2", &["C#m", "A", "E", "B"]))
            .unwrap();
        store
            .append_progression(&make_progression("other", &["C", "G"]))
            .unwrap();

        let records = store.get_progressions(&key).unwrap();
        assert_eq!(
            records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["p1", "p2"]
        );
        assert_eq!(records[0], make_progression("p1", &["C#m", "A", "E", "B"]));
    }

    #[test]
    fn test_namespaces_are_independent() {
        let (store, _tmp) = create_test_store();
        let signature = sig("Am,F,C,G");
        let key = NormalizedKey::encode(&signature);

        store
            .append_explanation(&signature, &make_explanation("e1", "Cadences"))
            .unwrap();

        assert!(store.get_progressions(&key).unwrap().is_empty());
        let explanations = store.get_explanations(&key).unwrap();
        assert_eq!(explanations.len(), 1);
        assert_eq!(explanations[0].result[0].topic, "Cadences");
    }

    #[test]
    fn test_unknown_key_is_empty() {
        let (store, _tmp) = create_test_store();
        let key = NormalizedKey::normalize("D,A").unwrap();
        assert!(store.get_progressions(&key).unwrap().is_empty());
        assert!(store.get_explanations(&key).unwrap().is_empty());
    }

    #[test]
    fn test_register_signature_deduplicates() {
        let (store, _tmp) = create_test_store();

        assert!(store.register_signature(&sig("Am,F,C,G")).unwrap());
        assert!(store.register_signature(&sig("C#,F#")).unwrap());
        assert!(!store.register_signature(&sig("Am,F,C,G")).unwrap());

        assert_eq!(
            store.list_signatures().unwrap(),
            vec![sig("Am,F,C,G"), sig("C#,F#")]
        );
    }

    #[test]
    fn test_duplicate_record_id_is_rejected() {
        let (store, _tmp) = create_test_store();
        store
            .append_progression(&make_progression("same", &["C"]))
            .unwrap();
        assert!(store
            .append_progression(&make_progression("same", &["C"]))
            .is_err());
    }

    #[test]
    fn test_stats_and_reopen() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("content.db");
        {
            let store = SqliteContentStore::new(&db_path).unwrap();
            store
                .append_progression(&make_progression("p1", &["C", "G"]))
                .unwrap();
            store
                .append_explanation(&sig("C,G"), &make_explanation("e1", "t"))
                .unwrap();
            store.register_signature(&sig("C,G")).unwrap();
        }

        let store = SqliteContentStore::new(&db_path).unwrap();
        assert_eq!(
            store.get_stats().unwrap(),
            ContentStats {
                progressions: 1,
                explanations: 1,
                library_entries: 1,
            }
        );
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let (store, _tmp) = create_test_store();
        let key = store
            .append_progression(&make_progression("good", &["C"]))
            .unwrap();
        {
            let conn = store.write_conn.lock().unwrap();
            conn.execute(
                "INSERT INTO progression_records (storage_key, record_id, payload) VALUES (?1, 'bad', '{')",
                params![key.as_str()],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO library_index (signature) VALUES ('C__')",
                [],
            )
            .unwrap();
        }

        let records = store.get_progressions(&key).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "good");
        assert!(store.list_signatures().unwrap().is_empty());
    }
}
