//! Presentation seams of the chat screen
//!
//! The orchestrator drives the chat through [`ChatView`] and [`Speaker`] and
//! never touches a terminal directly. The binary renders to the terminal;
//! tests record the calls.

use crate::client::{EngagementPrompts, SessionEndResponse};
use crate::emotion::EmotionTag;
use crate::error::Result;
use crate::session::ChatMessage;
use async_trait::async_trait;

/// Rendering operations of the chat screen
///
/// Calls are short and synchronous; implementations must not block.
pub trait ChatView: Send + Sync {
    /// Opening line of a character
    fn show_greeting(&self, character_id: &str, text: &str);

    /// Append a message to the conversation
    fn show_message(&self, message: &ChatMessage);

    /// Show the "character is typing" indicator
    fn show_typing(&self);

    /// Remove the typing indicator
    fn hide_typing(&self);

    /// Change the character's expression
    fn set_ai_emotion(&self, emotion: EmotionTag);

    /// Update the XP bar
    fn update_xp(&self, xp: u32, xp_for_level: u32, gained: u32);

    /// Announce newly earned badges
    fn show_badges(&self, badges: &[String]);

    /// Offer text to pre-fill the input
    fn suggest_input(&self, text: &str);

    /// Show the continue / change-topic / break choice
    fn show_engagement_prompt(&self, prompts: &EngagementPrompts);

    /// Remove the engagement prompt
    fn hide_engagement_prompt(&self);

    /// Report an ended session
    fn show_session_summary(&self, summary: &SessionEndResponse);

    /// Blocking notice, e.g. an unreadable recording
    fn alert(&self, message: &str);
}

/// Text-to-speech output
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Speak `text`, returning when done
    async fn speak(&self, text: &str, emotion: EmotionTag) -> Result<()>;

    /// Stop any speech in progress
    fn cancel(&self);
}

/// Speaker that stays silent
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSpeaker;

#[async_trait]
impl Speaker for NullSpeaker {
    async fn speak(&self, text: &str, emotion: EmotionTag) -> Result<()> {
        tracing::trace!("Not speaking ({}): {}", emotion, text);
        Ok(())
    }

    fn cancel(&self) {}
}
