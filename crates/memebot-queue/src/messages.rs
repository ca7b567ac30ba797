// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing texts.

use memebot_core::{JobError, JobKind};

/// Minimum Jaro-Winkler score for a popular name to be suggested.
const SUGGESTION_THRESHOLD: f64 = 0.7;

/// Suggestions offered with a not-found failure.
pub const MAX_SUGGESTIONS: usize = 3;

pub fn lookup_started(name: &str, kind: JobKind) -> String {
    match kind {
        JobKind::BlankTemplate => format!("Looking up the \"{name}\" template..."),
        JobKind::FullLookup => format!("Looking up \"{name}\"..."),
    }
}

pub fn rate_limited(retry_after_secs: u64) -> String {
    format!(
        "You're sending requests too quickly. Try again in {}s.",
        retry_after_secs.max(1)
    )
}

pub fn usage(command: &str) -> String {
    format!("Tell me which meme to look up, e.g. /{command} drake hotline bling")
}

pub fn nothing_to_continue() -> String {
    "There is no previous lookup to continue. Ask for a meme first.".to_string()
}

pub fn no_more_examples(name: &str) -> String {
    format!("No more examples for \"{name}\".")
}

pub fn more_available() -> String {
    "Send /more for more examples.".to_string()
}

pub fn missing_description(name: &str) -> String {
    format!("No description available for \"{name}\".")
}

pub fn internal_error() -> String {
    "Something went wrong on my side. Please try again later.".to_string()
}

/// Explanation and next step for a terminal job failure.
pub fn failure(error: &JobError, suggestions: &[String]) -> String {
    match error {
        JobError::NotFound { name } => {
            let mut text = format!("I couldn't find a meme called \"{name}\".");
            if suggestions.is_empty() {
                text.push_str(" Check the spelling or try a shorter name.");
            } else {
                text.push_str(&format!(" Did you mean: {}?", suggestions.join(", ")));
            }
            text
        }
        JobError::Transient { .. } => {
            "The meme sites are not responding right now. Please try again in a few minutes."
                .to_string()
        }
        JobError::ResourceUnavailable(_) => {
            "The lookup service is temporarily unavailable. Please try again later.".to_string()
        }
        JobError::InvalidInput(detail) => {
            format!("That request could not be processed ({detail}). Try a different name.")
        }
    }
}

/// Up to `limit` candidates most similar to `name`, best first.
pub fn suggest_similar(name: &str, candidates: &[String], limit: usize) -> Vec<String> {
    let query = name.trim().to_lowercase();
    let mut scored: Vec<(f64, &String)> = candidates
        .iter()
        .map(|c| (strsim::jaro_winkler(&query, &c.to_lowercase()), c))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.dedup_by(|a, b| a.1.eq_ignore_ascii_case(b.1));
    scored.into_iter().take(limit).map(|(_, c)| c.clone()).collect()
}
