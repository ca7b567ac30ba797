// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-chat user contexts, capped with oldest-first eviction.

use memebot_core::{ChatId, MemebotError, UserContext};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err, time_col, to_db_time};

pub async fn get_context(
    db: &Database,
    chat_id: ChatId,
) -> Result<Option<UserContext>, MemebotError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT chat_id, name, page_url, template_url, page, updated_at
                 FROM user_contexts WHERE chat_id = ?1",
                params![chat_id.0],
                |row| {
                    Ok(UserContext {
                        chat_id: ChatId(row.get(0)?),
                        name: row.get(1)?,
                        page_url: row.get(2)?,
                        template_url: row.get(3)?,
                        page: row.get(4)?,
                        updated_at: time_col(row, 5)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the chat's context, then evict the oldest rows beyond `cap`.
///
/// Returns the number of evicted contexts.
pub async fn upsert_context(
    db: &Database,
    ctx: &UserContext,
    cap: usize,
) -> Result<usize, MemebotError> {
    let ctx = ctx.clone();
    let cap = i64::try_from(cap).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO user_contexts (chat_id, name, page_url, template_url, page, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(chat_id) DO UPDATE SET
                    name = excluded.name,
                    page_url = excluded.page_url,
                    template_url = excluded.template_url,
                    page = excluded.page,
                    updated_at = excluded.updated_at",
                params![
                    ctx.chat_id.0,
                    ctx.name,
                    ctx.page_url,
                    ctx.template_url,
                    ctx.page,
                    to_db_time(ctx.updated_at),
                ],
            )?;
            let evicted = tx.execute(
                "DELETE FROM user_contexts WHERE chat_id IN (
                    SELECT chat_id FROM user_contexts
                    ORDER BY updated_at DESC, rowid DESC
                    LIMIT -1 OFFSET ?1
                 )",
                params![cap],
            )?;
            tx.commit()?;
            Ok(evicted)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_contexts(db: &Database) -> Result<u64, MemebotError> {
    db.connection()
        .call(|conn| {
            conn.query_row("SELECT COUNT(*) FROM user_contexts", [], |row| {
                row.get::<_, i64>(0)
            })
        })
        .await
        .map(|n| u64::try_from(n).unwrap_or_default())
        .map_err(map_tr_err)
}
