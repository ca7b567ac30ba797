// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for memebot.
//!
//! This crate provides the error taxonomy, domain types, and the narrow
//! collaborator traits the processing core is written against.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{JobError, MemebotError};
pub use types::{
    CacheEntry, ChatId, HealthStatus, ImageItem, Job, JobKind, MessageRef, NewJob,
    PriorContext, SearchHit, UserContext, normalize_name,
};

pub use traits::{
    Describer, HealthProbe, PluginAdapter, PopularNamesSource, Scraper, Transport,
};
