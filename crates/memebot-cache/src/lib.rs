// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Result cache for completed meme lookups.
//!
//! A bounded memory tier sits in front of the SQLite tier. Lookups normalize
//! the name, fall back to a substring match against the popular-names list,
//! and treat entries older than the TTL as absent without deleting them.

pub mod backend;
pub mod cache;
pub mod popular;
pub mod sqlite;

pub use backend::{CacheBackend, MemoryBackend};
pub use cache::{LookupKind, ResultCache};
pub use popular::PopularNames;
pub use sqlite::SqliteBackend;
