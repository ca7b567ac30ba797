// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable tier of the result cache.

use chrono::{DateTime, Utc};
use memebot_core::{CacheEntry, ImageItem, MemebotError};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, json_err, map_tr_err, time_col, to_db_time};

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<CacheEntry> {
    let images: Option<String> = row.get(4)?;
    let images = images
        .map(|text| serde_json::from_str::<Vec<ImageItem>>(&text))
        .transpose()
        .map_err(|e| json_err(4, e))?;
    Ok(CacheEntry {
        key: row.get(0)?,
        name: row.get(1)?,
        page_url: row.get(2)?,
        template_url: row.get(3)?,
        images,
        description: row.get(5)?,
        created_at: time_col(row, 6)?,
        refreshed_at: time_col(row, 7)?,
        accessed_at: time_col(row, 8)?,
    })
}

/// Fetch an entry by normalized key, expired or not.
pub async fn get_entry(db: &Database, key: &str) -> Result<Option<CacheEntry>, MemebotError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT key, name, page_url, template_url, images, description,
                        created_at, refreshed_at, accessed_at
                 FROM cache_entries WHERE key = ?1",
                params![key],
                row_to_entry,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace an entry, keeping the stored `created_at` if one exists.
pub async fn upsert_entry(db: &Database, entry: &CacheEntry) -> Result<(), MemebotError> {
    let images = entry
        .images
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| MemebotError::Storage {
            source: Box::new(e),
        })?;
    let entry = entry.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO cache_entries (key, name, page_url, template_url, images, description,
                                            created_at, refreshed_at, accessed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(key) DO UPDATE SET
                    name = excluded.name,
                    page_url = excluded.page_url,
                    template_url = excluded.template_url,
                    images = excluded.images,
                    description = excluded.description,
                    refreshed_at = excluded.refreshed_at,
                    accessed_at = excluded.accessed_at",
                params![
                    entry.key,
                    entry.name,
                    entry.page_url,
                    entry.template_url,
                    images,
                    entry.description,
                    to_db_time(entry.created_at),
                    to_db_time(entry.refreshed_at),
                    to_db_time(entry.accessed_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Bump `accessed_at` for a key.
pub async fn touch_entry(
    db: &Database,
    key: &str,
    at: DateTime<Utc>,
) -> Result<(), MemebotError> {
    let key = key.to_string();
    let at = to_db_time(at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE cache_entries SET accessed_at = ?1 WHERE key = ?2",
                params![at, key],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_entries(db: &Database) -> Result<u64, MemebotError> {
    db.connection()
        .call(|conn| {
            conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| {
                row.get::<_, i64>(0)
            })
        })
        .await
        .map(|n| u64::try_from(n).unwrap_or_default())
        .map_err(map_tr_err)
}
