// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use chrono::{DateTime, Utc};
use memebot_config::model::StorageConfig;
use memebot_core::MemebotError;
use tracing::{debug, info};

use crate::migrations;

/// Text format for every timestamp column. Lexicographic order matches time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Handle to the memebot SQLite database.
///
/// Cloning is cheap and shares the same background connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, MemebotError> {
        Self::open_with(path, true).await
    }

    /// Open the database described by the `[storage]` config section.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, MemebotError> {
        Self::open_with(&config.database_path, config.wal_mode).await
    }

    async fn open_with(path: &str, wal_mode: bool) -> Result<Self, MemebotError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| MemebotError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| MemebotError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| -> Result<(), MemebotError> {
            let journal = if wal_mode { "WAL" } else { "DELETE" };
            conn.pragma_update(None, "journal_mode", journal)
                .and_then(|_| conn.pragma_update(None, "synchronous", "NORMAL"))
                .and_then(|_| conn.pragma_update(None, "foreign_keys", "ON"))
                .and_then(|_| conn.pragma_update(None, "busy_timeout", 5000))
                .map_err(|e| MemebotError::Storage {
                    source: Box::new(e),
                })?;
            migrations::run_migrations(conn)
        })
        .await
        .map_err(|e: tokio_rusqlite::Error<MemebotError>| MemebotError::Storage {
            source: Box::new(e),
        })?;

        info!(path, wal_mode, "database opened");
        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Cheap liveness query used by health probes.
    pub async fn ping(&self) -> Result<(), MemebotError> {
        self.conn
            .call(|conn| conn.query_row("SELECT 1", [], |_| Ok(())))
            .await
            .map_err(map_tr_err)
    }

    /// Flush the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), MemebotError> {
        self.conn
            .call(|conn| {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            })
            .await
            .map_err(map_tr_err)?;
        debug!(path = %self.path, "wal checkpoint complete");
        Ok(())
    }

    /// Checkpoint and close the connection.
    pub async fn close(self) -> Result<(), MemebotError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(|e| MemebotError::Storage {
            source: Box::new(e),
        })?;
        info!(path = %self.path, "database closed");
        Ok(())
    }
}

/// Convert a tokio-rusqlite error into `MemebotError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> MemebotError {
    MemebotError::Storage {
        source: Box::new(e),
    }
}

/// Format a timestamp for storage.
pub fn to_db_time(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp, reporting failures against column `idx`.
pub fn parse_db_time(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

/// Read a timestamp column from a row.
pub(crate) fn time_col(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_db_time(idx, &text)
}

/// Wrap a JSON error as a row conversion failure.
pub(crate) fn json_err(idx: usize, e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_parent_dirs_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/memebot.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();
        for table in ["cache_entries", "jobs", "user_contexts"] {
            assert!(tables.iter().any(|t| t == table), "missing {table}: {tables:?}");
        }
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memebot.db");
        let path = path.to_str().unwrap();
        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();
        db.ping().await.unwrap();
        db.close().await.unwrap();
    }

    #[test]
    fn timestamps_round_trip_at_millisecond_precision() {
        let at = DateTime::parse_from_rfc3339("2026-03-01T12:30:45.123Z")
            .unwrap()
            .with_timezone(&Utc);
        let text = to_db_time(at);
        assert_eq!(text, "2026-03-01T12:30:45.123Z");
        assert_eq!(parse_db_time(0, &text).unwrap(), at);
    }

    #[test]
    fn timestamp_text_sorts_chronologically() {
        let a = to_db_time(Utc::now());
        let b = to_db_time(Utc::now() + chrono::Duration::milliseconds(5));
        assert!(a < b);
    }
}
