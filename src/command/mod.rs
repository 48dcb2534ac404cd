//! Parsing of raw chat input into commands.
//!
//! | Input            | Command                                   |
//! |------------------|-------------------------------------------|
//! | `exit`, `quit`   | `Exit`                                    |
//! | `log`            | `ShowLog`                                 |
//! | `memory`         | `ShowMemory`                              |
//! | `compress [arg]` | `Compress`                                |
//! | `!text`          | `Rewrite` the last reply                  |
//! | `?`              | `Regenerate` the last reply               |
//! | `:`              | `Inspire` a line for the user             |
//! | `~`              | `Skip` (let the character continue)       |
//! | `/text`          | `Narrate`                                 |
//! | anything else    | `Say`                                     |

use crate::errors::{ChatError, ChatResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    ShowLog,
    ShowMemory,
    /// Raw argument text after `compress`, if any.
    Compress(Option<String>),
    Rewrite(String),
    Regenerate,
    Inspire,
    Skip,
    Narrate(String),
    Say(String),
}

impl Command {
    /// Whether the command only reads the session.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Command::Exit | Command::ShowLog | Command::ShowMemory)
    }
}

/// Parse one line of user input.
///
/// Empty input, and prefixes with nothing after them, are `ValidationFailure`.
pub fn parse(raw: &str) -> ChatResult<Command> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(ChatError::ValidationFailure("input is empty".to_string()));
    }

    match input {
        "exit" | "quit" => return Ok(Command::Exit),
        "log" => return Ok(Command::ShowLog),
        "memory" => return Ok(Command::ShowMemory),
        "?" => return Ok(Command::Regenerate),
        ":" => return Ok(Command::Inspire),
        "~" => return Ok(Command::Skip),
        _ => {}
    }

    if let Some(rest) = input.strip_prefix("compress")
        && (rest.is_empty() || rest.starts_with(char::is_whitespace))
    {
        let arg = rest.trim();
        return Ok(Command::Compress(
            (!arg.is_empty()).then(|| arg.to_string()),
        ));
    }

    if let Some(text) = input.strip_prefix('!') {
        return required_text(text, "!").map(Command::Rewrite);
    }

    if let Some(text) = input.strip_prefix('/') {
        return required_text(text, "/").map(Command::Narrate);
    }

    Ok(Command::Say(input.to_string()))
}

fn required_text(text: &str, prefix: &str) -> ChatResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ChatError::ValidationFailure(format!(
            "'{}' must be followed by text",
            prefix
        )));
    }
    Ok(text.to_string())
}
