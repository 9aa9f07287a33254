//! Command-line interface definition for NeuroNarrative
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for chatting, profile management, themes and
//! the parent dashboard.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// NeuroNarrative - conversational companions for children
///
/// Talk with a character, manage child profiles, and review progress
/// through the remote NeuroNarrative service.
#[derive(Parser, Debug, Clone)]
#[command(name = "neuronarrative")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the service base URL
    #[arg(long, env = "NEURONARRATIVE_BASE_URL")]
    pub base_url: Option<String>,

    /// Override the local session store directory
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for NeuroNarrative
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat with a character
    Chat {
        /// Child profile id
        #[arg(long)]
        child: i64,

        /// Character id (nandhini, samyuktha, naveen, ramanujan, rita)
        #[arg(long, default_value = "nandhini")]
        character: String,

        /// Theme for this session (defaults to the saved preference)
        #[arg(long)]
        theme: Option<String>,

        /// Speak responses aloud through the voice output
        #[arg(long)]
        voice: bool,
    },

    /// Manage child profiles
    Children {
        /// Profile subcommand
        #[command(subcommand)]
        command: ChildCommand,
    },

    /// List the available characters
    Characters,

    /// List or apply themes
    Themes {
        /// Theme subcommand
        #[command(subcommand)]
        command: ThemeCommand,
    },

    /// Show the parent dashboard for a child
    Dashboard {
        /// Child profile id
        #[arg(long)]
        child: i64,
    },

    /// Check that the service is reachable
    Health,

    /// Show locally cached conversations for a child
    History {
        /// Child profile id
        #[arg(long)]
        child: i64,
    },

    /// Show recorded safety alerts for a child
    Alerts {
        /// Child profile id
        #[arg(long)]
        child: i64,
    },

    /// Show or change display preferences for a child
    Prefs {
        /// Child profile id
        #[arg(long)]
        child: i64,

        /// Reduce decorative motion (on/off)
        #[arg(long)]
        reduced_motion: Option<String>,

        /// Enable sounds (on/off)
        #[arg(long)]
        sound: Option<String>,
    },
}

/// Child profile subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ChildCommand {
    /// List all profiles
    List,

    /// Create a profile
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Avatar emoji
        #[arg(short, long, default_value = "👦")]
        avatar: String,

        /// Age in years
        #[arg(long)]
        age: Option<u8>,
    },

    /// Show a profile with XP, streak and badges
    Show {
        /// Child profile id
        #[arg(long)]
        id: i64,
    },

    /// Delete a profile
    Delete {
        /// Child profile id
        #[arg(long)]
        id: i64,
    },
}

/// Theme subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ThemeCommand {
    /// List available themes
    List,

    /// Apply a theme for a child
    Set {
        /// Child profile id
        #[arg(long)]
        child: i64,

        /// Theme name (ocean, dino, space, ...)
        #[arg(long)]
        theme: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            base_url: None,
            store: None,
            command: Commands::Health,
        }
    }
}

/// Parse an on/off flag value
///
/// # Examples
///
/// ```
/// use neuronarrative::cli::parse_switch;
///
/// assert_eq!(parse_switch("on"), Some(true));
/// assert_eq!(parse_switch("OFF"), Some(false));
/// assert_eq!(parse_switch("maybe"), None);
/// ```
pub fn parse_switch(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
