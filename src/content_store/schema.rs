//! SQLite schema definitions for the content database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

/// Generated progressions, one JSON payload per row, grouped by storage key.
const PROGRESSION_RECORDS_TABLE: Table = Table {
    name: "progression_records",
    columns: &[
        sqlite_column!("seq", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("storage_key", &SqlType::Text, non_null = true),
        sqlite_column!("record_id", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("payload", &SqlType::Text, non_null = true), // JSON
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_progression_records_key", "storage_key")],
};

const EXPLANATION_RECORDS_TABLE: Table = Table {
    name: "explanation_records",
    columns: &[
        sqlite_column!("seq", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("storage_key", &SqlType::Text, non_null = true),
        sqlite_column!("record_id", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("payload", &SqlType::Text, non_null = true), // JSON
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_explanation_records_key", "storage_key")],
};

/// Distinct signatures in registration order. Not UNIQUE: concurrent writers
/// may register the same signature twice.
const LIBRARY_INDEX_TABLE: Table = Table {
    name: "library_index",
    columns: &[
        sqlite_column!("position", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("signature", &SqlType::Text, non_null = true),
        sqlite_column!(
            "registered_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_library_index_signature", "signature")],
};

pub const CONTENT_SCHEMA: VersionedSchema = VersionedSchema {
    version: 0,
    tables: &[
        PROGRESSION_RECORDS_TABLE,
        EXPLANATION_RECORDS_TABLE,
        LIBRARY_INDEX_TABLE,
    ],
};
