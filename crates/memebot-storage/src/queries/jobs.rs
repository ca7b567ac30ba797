// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue operations for crash-safe job processing.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use memebot_core::{ChatId, Job, JobKind, MemebotError, MessageRef, PriorContext};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, json_err, map_tr_err, time_col, to_db_time};
use crate::models::{JobStatus, QueueCounts, StoredJob};

const JOB_COLUMNS: &str = "id, chat_id, name, canonical_id, kind, status_message, prior, \
                           attempts, last_error, created_at, status, run_at, locked_until";

fn row_to_stored(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredJob> {
    let kind: String = row.get(4)?;
    let kind = JobKind::from_str(&kind).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let prior: Option<String> = row.get(6)?;
    let prior = prior
        .map(|text| serde_json::from_str::<PriorContext>(&text))
        .transpose()
        .map_err(|e| json_err(6, e))?;
    let status: String = row.get(10)?;
    let status = JobStatus::from_str(&status).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let locked_until = match row.get::<_, Option<String>>(12)? {
        Some(_) => Some(time_col(row, 12)?),
        None => None,
    };

    Ok(StoredJob {
        job: Job {
            id: row.get(0)?,
            chat_id: ChatId(row.get(1)?),
            name: row.get(2)?,
            canonical_id: row.get(3)?,
            kind,
            status_message: MessageRef(row.get(5)?),
            prior,
            attempts: row.get(7)?,
            last_error: row.get(8)?,
            created_at: time_col(row, 9)?,
        },
        status,
        run_at: time_col(row, 11)?,
        locked_until,
    })
}

/// Insert a new pending job, claimable immediately.
pub async fn insert_job(db: &Database, job: &Job) -> Result<(), MemebotError> {
    let prior = job
        .prior
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| MemebotError::Storage {
            source: Box::new(e),
        })?;
    let job = job.clone();
    db.connection()
        .call(move |conn| {
            let created = to_db_time(job.created_at);
            conn.execute(
                "INSERT INTO jobs (id, chat_id, name, canonical_id, kind, status_message, prior,
                                   status, attempts, last_error, run_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8, ?9, ?10, ?10, ?10)",
                params![
                    job.id,
                    job.chat_id.0,
                    job.name,
                    job.canonical_id,
                    job.kind.to_string(),
                    job.status_message.0,
                    prior,
                    job.attempts,
                    job.last_error,
                    created,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Claim the oldest pending job whose `run_at` has passed.
///
/// Atomically selects the job and marks it `processing` with a lease ending
/// at `locked_until`. Returns `None` if nothing is ready.
pub async fn claim_next(
    db: &Database,
    now: DateTime<Utc>,
    locked_until: DateTime<Utc>,
) -> Result<Option<Job>, MemebotError> {
    let now = to_db_time(now);
    let locked_until = to_db_time(locked_until);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let claimed = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {JOB_COLUMNS} FROM jobs
                     WHERE status = 'pending' AND run_at <= ?1
                     ORDER BY created_at ASC, rowid ASC
                     LIMIT 1"
                ))?;
                stmt.query_row(params![now], row_to_stored).optional()?
            };

            if let Some(stored) = &claimed {
                tx.execute(
                    "UPDATE jobs SET status = 'processing', locked_until = ?1, updated_at = ?2
                     WHERE id = ?3",
                    params![locked_until, now, stored.job.id],
                )?;
            }
            tx.commit()?;
            Ok(claimed.map(|stored| stored.job))
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a job row. Returns whether a row existed.
pub async fn delete_job(db: &Database, id: &str) -> Result<bool, MemebotError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Return a job to `pending` after a failed attempt.
///
/// Increments `attempts`, records the error, and delays the next claim
/// until `run_at`. Returns the new attempt count, or `None` if the job
/// no longer exists.
pub async fn reschedule(
    db: &Database,
    id: &str,
    error: &str,
    run_at: DateTime<Utc>,
) -> Result<Option<u32>, MemebotError> {
    let id = id.to_string();
    let error = error.to_string();
    let run_at = to_db_time(run_at);
    let now = to_db_time(Utc::now());
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "UPDATE jobs SET status = 'pending', attempts = attempts + 1, last_error = ?1,
                                 run_at = ?2, locked_until = NULL, updated_at = ?3
                 WHERE id = ?4
                 RETURNING attempts",
                params![error, run_at, now, id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Return `processing` jobs to `pending`.
///
/// With `expired_before = None` every processing row is released, which is
/// what startup recovery wants. Otherwise only leases ending before the
/// given instant are released.
pub async fn release_processing(
    db: &Database,
    expired_before: Option<DateTime<Utc>>,
) -> Result<usize, MemebotError> {
    let cutoff = expired_before.map(to_db_time);
    let now = to_db_time(Utc::now());
    db.connection()
        .call(move |conn| {
            let n = match cutoff {
                Some(cutoff) => conn.execute(
                    "UPDATE jobs SET status = 'pending', locked_until = NULL, updated_at = ?1
                     WHERE status = 'processing' AND locked_until < ?2",
                    params![now, cutoff],
                )?,
                None => conn.execute(
                    "UPDATE jobs SET status = 'pending', locked_until = NULL, updated_at = ?1
                     WHERE status = 'processing'",
                    params![now],
                )?,
            };
            Ok(n)
        })
        .await
        .map_err(map_tr_err)
}

/// Count live jobs per status.
pub async fn count_jobs(db: &Database) -> Result<QueueCounts, MemebotError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut counts = QueueCounts::default();
            for row in rows {
                let (status, n) = row?;
                let n = u64::try_from(n).unwrap_or_default();
                match status.as_str() {
                    "pending" => counts.pending = n,
                    "processing" => counts.processing = n,
                    _ => {}
                }
            }
            Ok(counts)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a job with its bookkeeping columns.
pub async fn get_job(db: &Database, id: &str) -> Result<Option<StoredJob>, MemebotError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
                params![id],
                row_to_stored,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn job(id: &str, created_at: DateTime<Utc>) -> Job {
        Job {
            id: id.to_string(),
            chat_id: ChatId(7),
            name: "drake".to_string(),
            canonical_id: None,
            kind: JobKind::FullLookup,
            status_message: MessageRef(99),
            prior: Some(PriorContext {
                page_url: "https://imgflip.com/memegenerator/181913649".into(),
                template_url: "https://i.imgflip.com/30b1gx.jpg".into(),
                page: 2,
            }),
            attempts: 0,
            last_error: None,
            created_at,
        }
    }

    #[tokio::test]
    async fn claim_marks_processing_and_preserves_fields() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        let original = job("a", now);
        insert_job(&db, &original).await.unwrap();

        let claimed = claim_next(&db, now, now + Duration::minutes(5))
            .await
            .unwrap()
            .expect("job should be claimable");
        assert_eq!(claimed.id, "a");
        assert_eq!(claimed.prior, original.prior);
        assert_eq!(claimed.kind, JobKind::FullLookup);

        let stored = get_job(&db, "a").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Processing);
        assert!(stored.locked_until.is_some());

        assert!(claim_next(&db, now, now).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claims_oldest_first() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        insert_job(&db, &job("newer", now)).await.unwrap();
        insert_job(&db, &job("older", now - Duration::seconds(10)))
            .await
            .unwrap();

        let first = claim_next(&db, now, now).await.unwrap().unwrap();
        assert_eq!(first.id, "older");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn rescheduled_job_waits_for_run_at() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        insert_job(&db, &job("a", now)).await.unwrap();
        claim_next(&db, now, now).await.unwrap().unwrap();

        let attempts = reschedule(&db, "a", "timeout", now + Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(attempts, Some(1));

        assert!(claim_next(&db, now, now).await.unwrap().is_none());
        let later = now + Duration::seconds(31);
        let again = claim_next(&db, later, later).await.unwrap().unwrap();
        assert_eq!(again.attempts, 1);
        assert_eq!(again.last_error.as_deref(), Some("timeout"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let (db, _dir) = setup_db().await;
        insert_job(&db, &job("a", Utc::now())).await.unwrap();
        assert!(delete_job(&db, "a").await.unwrap());
        assert!(!delete_job(&db, "a").await.unwrap());
        assert_eq!(count_jobs(&db).await.unwrap().total(), 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_processing_respects_cutoff() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        insert_job(&db, &job("a", now)).await.unwrap();
        claim_next(&db, now, now + Duration::minutes(5)).await.unwrap();

        assert_eq!(release_processing(&db, Some(now)).await.unwrap(), 0);
        let counts = count_jobs(&db).await.unwrap();
        assert_eq!(counts.processing, 1);

        assert_eq!(release_processing(&db, None).await.unwrap(), 1);
        let counts = count_jobs(&db).await.unwrap();
        assert_eq!((counts.pending, counts.processing), (1, 0));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reschedule_missing_job_returns_none() {
        let (db, _dir) = setup_db().await;
        let attempts = reschedule(&db, "ghost", "x", Utc::now()).await.unwrap();
        assert_eq!(attempts, None);
        db.close().await.unwrap();
    }
}
