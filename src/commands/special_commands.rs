//! Special commands parser for the interactive chat
//!
//! Anything starting with `/` is a command rather than a message for the
//! character. Commands are case-insensitive; arguments keep their case.

use crate::emotion::Feeling;
use colored::Colorize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Commands available during a chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Pick the feeling for the next message (`/feel happy`)
    Feel(Feeling),

    /// Upload a recording for transcription (`/voice path/to/file.webm`)
    Voice(PathBuf),

    /// Send a transcript from an external speech recognizer (`/say ...`)
    Say(String),

    /// Answer the re-engagement prompt
    Continue,
    Shift,
    Break,

    /// Show XP, session and timer status
    Status,

    /// Show help information
    Help,

    /// End the session and leave the chat
    Exit,

    /// Not a special command; send as a message
    None,
}

/// Parse a line of chat input
///
/// # Errors
///
/// Returns `CommandError` for unknown commands and bad arguments
///
/// # Examples
///
/// ```
/// use neuronarrative::commands::special_commands::{parse_special_command, SpecialCommand};
/// use neuronarrative::emotion::Feeling;
///
/// assert_eq!(parse_special_command("/feel Calm").unwrap(), SpecialCommand::Feel(Feeling::Calm));
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/fly").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    match command.as_str() {
        "/feel" | "/emotion" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "/feel".to_string(),
                    usage: format!(
                        "/feel <{}>",
                        Feeling::ALL.map(|f| f.as_str()).join("|")
                    ),
                });
            }
            rest.parse::<Feeling>()
                .map(SpecialCommand::Feel)
                .map_err(|_| CommandError::UnsupportedArgument {
                    command: "/feel".to_string(),
                    arg: rest.to_string(),
                })
        }
        "/voice" | "/record" => {
            if rest.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/voice".to_string(),
                    usage: "/voice <audio file>".to_string(),
                })
            } else {
                Ok(SpecialCommand::Voice(PathBuf::from(rest)))
            }
        }
        "/say" => {
            // An empty transcript is passed on so it can be answered with a
            // clarification.
            Ok(SpecialCommand::Say(rest.to_string()))
        }
        "/continue" => Ok(SpecialCommand::Continue),
        "/shift" | "/topic" => Ok(SpecialCommand::Shift),
        "/break" => Ok(SpecialCommand::Break),
        "/status" => Ok(SpecialCommand::Status),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/end" | "/exit" | "/quit" | "exit" | "quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Print the chat help screen
pub fn print_help() {
    println!("\n{}", "Chat commands".bold());
    println!("  {}   pick how you feel for your next message", "/feel <feeling>".cyan());
    println!(
        "                    ({})",
        Feeling::ALL.map(|f| f.as_str()).join(", ")
    );
    println!("  {}    send a voice recording", "/voice <file>".cyan());
    println!("  {}      send what a speech recognizer heard", "/say <text>".cyan());
    println!("  {}         keep talking", "/continue".cyan());
    println!("  {}            talk about something else", "/shift".cyan());
    println!("  {}            take a break and end the session", "/break".cyan());
    println!("  {}           show XP and session info", "/status".cyan());
    println!("  {}              end the session", "/end".cyan());
    println!("  {}             show this help\n", "/help".cyan());
}
