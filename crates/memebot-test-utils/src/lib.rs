// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for memebot.
//!
//! Provides mock collaborators and fixtures for fast, deterministic,
//! CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockTransport`] - captures sends, edits, deletes, and photos
//! - [`MockScraper`] - canned search hits and images with scripted failures
//! - [`MockDescriber`] - canned descriptions with scripted failures
//! - [`MockPopularNames`] - popular-names source with failure toggle
//! - [`StaticProbe`] - health probe with a fixed behavior
//! - [`harness`] - temp databases and test-sized configuration

pub mod harness;
pub mod mock_probe;
pub mod mock_remote;
pub mod mock_transport;

pub use harness::{temp_database, test_config};
pub use mock_probe::{ProbeBehavior, StaticProbe};
pub use mock_remote::{Failure, MockDescriber, MockPopularNames, MockScraper};
pub use mock_transport::{MockTransport, TransportEvent};
