// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixtures shared by integration tests.

use memebot_config::MemebotConfig;
use memebot_storage::Database;
use tempfile::TempDir;

/// Open a migrated database in a fresh temp dir.
///
/// Keep the returned `TempDir` alive for as long as the database is used.
pub async fn temp_database() -> (Database, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("memebot-test.db");
    let db = Database::open(path.to_str().expect("utf-8 temp path"))
        .await
        .expect("open temp database");
    (db, dir)
}

/// Default configuration shrunk to test-friendly intervals.
pub fn test_config() -> MemebotConfig {
    let mut config = MemebotConfig::default();
    config.queue.concurrency = 2;
    config.queue.backoff_base_ms = 10;
    config.queue.backoff_max_ms = 40;
    config.queue.poll_interval_ms = 10;
    config.progress.tick_secs = 3600;
    config.scraper.session_acquire_timeout_secs = 1;
    config.gateway.enabled = false;
    config.prometheus.enabled = false;
    config
}
