//! Read-only SQLite index store.
//!
//! Layout:
//! - `meta(key TEXT PRIMARY KEY, value TEXT)` with `metric`, `dimensions`
//!   and optionally `embedding_model`
//! - `chunks(id INTEGER PRIMARY KEY, text TEXT, metadata TEXT, embedding BLOB)`
//!   where `embedding` is little-endian f32 and `metadata` a JSON object or NULL
//!
//! The whole store is loaded into a [`FlatIndex`] at startup.

use crate::vector_index::{DistanceMetric, FlatIndex, IndexEntry, VectorIndex};
use lexchat_core::{AppError, AppResult};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

/// A loaded index plus what the store says about itself.
#[derive(Debug, Clone)]
pub struct StoredIndex {
    pub path: PathBuf,
    pub index: FlatIndex,
    pub embedding_model: Option<String>,
}

impl StoredIndex {
    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }
}

fn store_error(path: &Path, what: &str, e: impl std::fmt::Display) -> AppError {
    AppError::Index(format!("{} ({:?}): {}", what, path, e))
}

fn read_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
        row.get::<_, Option<String>>(0)
    })
    .optional()
    .map(Option::flatten)
}

/// Decode a little-endian f32 blob.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index(format!(
            "Invalid embedding blob length: {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn parse_metadata(raw: Option<String>) -> AppResult<serde_json::Map<String, serde_json::Value>> {
    let Some(raw) = raw else {
        return Ok(serde_json::Map::new());
    };

    match serde_json::from_str::<serde_json::Value>(&raw)? {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Null => Ok(serde_json::Map::new()),
        other => Err(AppError::Index(format!(
            "Chunk metadata must be a JSON object, got: {}",
            other
        ))),
    }
}

/// Load the store at `path` into memory.
///
/// Any malformed row fails the whole load.
pub fn load_index(path: &Path) -> AppResult<StoredIndex> {
    if !path.exists() {
        return Err(AppError::Index(format!("Index not found at {:?}", path)));
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| store_error(path, "Failed to open index", e))?;

    let metric = read_meta(&conn, "metric")
        .map_err(|e| store_error(path, "Failed to read index metadata", e))?
        .map(|m| m.parse::<DistanceMetric>())
        .transpose()?
        .unwrap_or_default();

    let dimensions: usize = read_meta(&conn, "dimensions")
        .map_err(|e| store_error(path, "Failed to read index metadata", e))?
        .ok_or_else(|| store_error(path, "Index metadata incomplete", "missing 'dimensions'"))?
        .trim()
        .parse()
        .map_err(|e| store_error(path, "Invalid 'dimensions'", e))?;

    if dimensions == 0 {
        return Err(store_error(path, "Invalid 'dimensions'", "must be at least 1"));
    }

    let embedding_model = read_meta(&conn, "embedding_model")
        .map_err(|e| store_error(path, "Failed to read index metadata", e))?;

    let mut stmt = conn
        .prepare("SELECT id, text, metadata, embedding FROM chunks ORDER BY id")
        .map_err(|e| store_error(path, "Failed to prepare query", e))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })
        .map_err(|e| store_error(path, "Failed to query chunks", e))?;

    let mut index = FlatIndex::new(dimensions, metric);

    for row in rows {
        let (id, text, metadata, blob) =
            row.map_err(|e| store_error(path, "Failed to read chunk", e))?;

        let entry = IndexEntry {
            text,
            metadata: parse_metadata(metadata)
                .map_err(|e| store_error(path, &format!("Chunk {}", id), e))?,
            embedding: bytes_to_embedding(&blob)
                .map_err(|e| store_error(path, &format!("Chunk {}", id), e))?,
        };

        index
            .push(entry)
            .map_err(|e| store_error(path, &format!("Chunk {}", id), e))?;
    }

    tracing::info!(
        "Loaded index {:?}: {} chunks, {} dimensions, {} metric",
        path,
        index.len(),
        dimensions,
        metric
    );

    Ok(StoredIndex {
        path: path.to_path_buf(),
        index,
        embedding_model,
    })
}

#[cfg(test)]
pub(crate) mod fixture {
    use super::*;
    use rusqlite::params;

    pub(crate) fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Write a store with the given meta rows and chunks.
    pub(crate) fn write_store(
        path: &Path,
        meta: &[(&str, &str)],
        chunks: &[(&str, Option<&str>, Vec<u8>)],
    ) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE meta (key TEXT PRIMARY KEY, value TEXT);
             CREATE TABLE chunks (id INTEGER PRIMARY KEY, text TEXT NOT NULL, metadata TEXT, embedding BLOB NOT NULL);",
        )
        .unwrap();

        for (key, value) in meta {
            conn.execute("INSERT INTO meta (key, value) VALUES (?1, ?2)", params![key, value])
                .unwrap();
        }
        for (text, metadata, blob) in chunks {
            conn.execute(
                "INSERT INTO chunks (text, metadata, embedding) VALUES (?1, ?2, ?3)",
                params![text, metadata, blob],
            )
            .unwrap();
        }
    }
}
