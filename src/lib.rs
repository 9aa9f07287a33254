//! NeuroNarrative - conversational companions for children
//!
//! This library provides the client side of the NeuroNarrative service:
//! a chat orchestrator that talks to the remote service, a local session
//! cache with rolling summaries and evaluation metrics, an idle-engagement
//! timer, a crisis-language filter, and a terminal front end.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `orchestrator`: Chat session state machine tying everything together
//! - `client`: Remote service API abstraction and HTTP implementation
//! - `session`: Local conversation cache, summaries and evaluation metrics
//! - `engagement`: Idle timer driving the anti-freeze prompt
//! - `safety`: Crisis-language filter and alert log
//! - `emotion`: Reply emotion detection and child-selected feelings
//! - `characters`: Built-in character catalog
//! - `storage`: Embedded key-value store
//! - `view`: Presentation traits implemented by front ends
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use neuronarrative::Config;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

pub mod characters;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod emotion;
pub mod engagement;
pub mod error;
pub mod orchestrator;
pub mod safety;
pub mod session;
pub mod storage;
pub mod view;

// Re-export commonly used types
pub use client::{ChatService, HttpServiceClient, SessionId};
pub use config::Config;
pub use emotion::{EmotionTag, Feeling};
pub use engagement::{EngagementEvent, EngagementTimer};
pub use error::{NarrativeError, Result};
pub use orchestrator::{AppState, ChatOrchestrator, Collaborators, TurnOutcome};
pub use safety::CrisisFilter;
pub use session::{ChatMessage, SessionCache, SessionContext};
pub use storage::LocalStore;
pub use view::{ChatView, Speaker};

#[cfg(test)]
pub mod test_utils;
