// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! The processing core only talks to the outside world through these
//! traits. All collaborators extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod describer;
pub mod health;
pub mod popular;
pub mod scraper;
pub mod transport;

pub use adapter::PluginAdapter;
pub use describer::Describer;
pub use health::HealthProbe;
pub use popular::PopularNamesSource;
pub use scraper::Scraper;
pub use transport::Transport;
