// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot command parsing.

use memebot_core::JobKind;

/// A parsed bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Look up a meme. `command` is the name the user typed it under.
    Lookup {
        kind: JobKind,
        name: String,
        command: &'static str,
    },
    More,
    Help,
    Unknown(String),
}

/// Parse `text` as a bot command.
///
/// Returns `None` for plain text and for commands addressed to another bot
/// (`/meme@OtherBot ...`). The name argument is passed through trimmed but
/// otherwise untouched; empty names are handled by intake.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let text = text.trim_start();
    let body = text.strip_prefix('/')?;
    let (head, rest) = match body.find(char::is_whitespace) {
        Some(idx) => (&body[..idx], body[idx..].trim()),
        None => (body, ""),
    };

    let (name, target) = match head.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (head, None),
    };
    if let (Some(target), Some(me)) = (target, bot_username)
        && !target.eq_ignore_ascii_case(me.trim_start_matches('@'))
    {
        return None;
    }
    if name.is_empty() {
        return None;
    }

    let lookup = |kind, command| Command::Lookup {
        kind,
        name: rest.to_string(),
        command,
    };
    let command = match name.to_ascii_lowercase().as_str() {
        "meme" => lookup(JobKind::FullLookup, "meme"),
        "explain" => lookup(JobKind::FullLookup, "explain"),
        "template" => lookup(JobKind::BlankTemplate, "template"),
        "blank" => lookup(JobKind::BlankTemplate, "blank"),
        "more" => Command::More,
        "help" | "start" => Command::Help,
        other => Command::Unknown(other.to_string()),
    };
    Some(command)
}

/// Reply to `/help` and `/start`.
pub fn help_text(bot_name: &str) -> String {
    let intro = format!("I'm {bot_name}. I look up memes and explain them.");
    [
        intro.as_str(),
        "",
        "/meme <name> - explanation and example images",
        "/template <name> - the blank template",
        "/more - more examples for your last lookup",
        "/help - this message",
    ]
    .join("\n")
}

pub fn unknown_command(command: &str) -> String {
    format!("I don't know /{command}. Send /help to see what I can do.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(kind: JobKind, name: &str, command: &'static str) -> Command {
        Command::Lookup {
            kind,
            name: name.to_string(),
            command,
        }
    }

    #[test]
    fn parses_lookup_commands() {
        assert_eq!(
            parse_command("/meme drake hotline bling", None),
            Some(lookup(JobKind::FullLookup, "drake hotline bling", "meme"))
        );
        assert_eq!(
            parse_command("/template   Two Buttons  ", None),
            Some(lookup(JobKind::BlankTemplate, "Two Buttons", "template"))
        );
        assert_eq!(
            parse_command("/explain stonks", None),
            Some(lookup(JobKind::FullLookup, "stonks", "explain"))
        );
    }

    #[test]
    fn command_without_argument_has_empty_name() {
        assert_eq!(
            parse_command("/meme", None),
            Some(lookup(JobKind::FullLookup, "", "meme"))
        );
    }

    #[test]
    fn name_keeps_inner_newlines_trimmed_at_edges() {
        assert_eq!(
            parse_command("/meme\ndistracted boyfriend\n", None),
            Some(lookup(JobKind::FullLookup, "distracted boyfriend", "meme"))
        );
    }

    #[test]
    fn command_name_is_case_insensitive() {
        assert_eq!(parse_command("/MORE", None), Some(Command::More));
        assert_eq!(parse_command("/Start", None), Some(Command::Help));
    }

    #[test]
    fn addressed_commands() {
        assert_eq!(
            parse_command("/more@MemeBot", Some("memebot")),
            Some(Command::More)
        );
        assert_eq!(
            parse_command("/more@memebot", Some("@MemeBot")),
            Some(Command::More)
        );
        assert_eq!(parse_command("/more@OtherBot", Some("memebot")), None);
        // Without a known username every addressed command is accepted.
        assert_eq!(parse_command("/more@OtherBot", None), Some(Command::More));
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_command("drake hotline bling", None), None);
        assert_eq!(parse_command("/", None), None);
        assert_eq!(parse_command("", None), None);
    }

    #[test]
    fn unknown_command_is_reported() {
        assert_eq!(
            parse_command("/frobnicate now", None),
            Some(Command::Unknown("frobnicate".to_string()))
        );
    }

    #[test]
    fn help_lists_every_lookup_command() {
        let help = help_text("Memebot");
        assert!(help.starts_with("I'm Memebot."));
        for cmd in ["/meme", "/template", "/more", "/help"] {
            assert!(help.contains(cmd), "missing {cmd}");
        }
    }
}
