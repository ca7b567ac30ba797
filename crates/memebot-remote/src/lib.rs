// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote collaborators for memebot.
//!
//! [`ImgflipClient`] resolves meme names against the Imgflip catalog and
//! scrapes example images from meme pages; it also serves as the
//! popular-names source. [`AnthropicDescriber`] writes meme descriptions
//! through the Anthropic Messages API.

pub mod anthropic;
mod http;
pub mod imgflip;

pub use anthropic::{AnthropicDescriber, UnavailableDescriber};
pub use imgflip::{CatalogMeme, ImgflipClient, extract_images};
