//! Terminal rendering of the chat screen

use crate::characters;
use crate::client::{EngagementPrompts, SessionEndResponse};
use crate::emotion::{EmotionTag, Feeling};
use crate::error::Result;
use crate::session::{ChatMessage, Role};
use crate::view::{ChatView, Speaker};
use async_trait::async_trait;
use colored::Colorize;
use std::sync::Mutex;

const XP_BAR_WIDTH: usize = 20;

/// [`ChatView`] that prints to stdout
pub struct TerminalView {
    reduced_motion: bool,
    character_id: Mutex<String>,
}

impl TerminalView {
    /// Create a view; `reduced_motion` drops the typing indicator and
    /// expression changes
    pub fn new(reduced_motion: bool) -> Self {
        Self {
            reduced_motion,
            character_id: Mutex::new(String::new()),
        }
    }

    fn speaker_label(&self) -> String {
        let id = self
            .character_id
            .lock()
            .map(|id| id.clone())
            .unwrap_or_default();
        format!("{} {}", characters::emoji_for(&id), display_name(&id))
    }
}

impl ChatView for TerminalView {
    fn show_greeting(&self, character_id: &str, text: &str) {
        if let Ok(mut id) = self.character_id.lock() {
            *id = character_id.to_string();
        }
        println!("\n{}: {}\n", self.speaker_label().cyan().bold(), text);
    }

    fn show_message(&self, message: &ChatMessage) {
        match message.role {
            Role::User => {
                let badge = message
                    .emotion
                    .as_deref()
                    .and_then(|e| e.parse::<Feeling>().ok())
                    .map(|f| format!(" ({})", f.label()))
                    .unwrap_or_default();
                println!("{}{}: {}", "You".green().bold(), badge, message.text);
            }
            Role::Assistant => {
                println!("{}: {}", self.speaker_label().cyan().bold(), message.text);
            }
        }
    }

    fn show_typing(&self) {
        if !self.reduced_motion {
            println!("{}", "  ...".dimmed());
        }
    }

    fn hide_typing(&self) {}

    fn set_ai_emotion(&self, emotion: EmotionTag) {
        if !self.reduced_motion {
            println!("{}", format!("  [{} {}]", emotion_face(emotion), emotion).dimmed());
        }
    }

    fn update_xp(&self, xp: u32, xp_for_level: u32, gained: u32) {
        println!(
            "{} {}",
            format!("⭐ +{} XP", gained).yellow().bold(),
            format_xp_bar(xp, xp_for_level)
        );
    }

    fn show_badges(&self, badges: &[String]) {
        for badge in badges {
            println!("{}", format!("🏆 New Badge Earned: {}!", badge).yellow().bold());
        }
    }

    fn suggest_input(&self, text: &str) {
        println!("{} {}", "💡 Try starting with:".magenta(), text.italic());
    }

    fn show_engagement_prompt(&self, prompts: &EngagementPrompts) {
        println!("\n{}", "Still there?".bold());
        println!("  {}  {}", "/continue".cyan(), prompts.continue_text);
        println!("  {}     {}", "/shift".cyan(), prompts.shift);
        println!("  {}     {}\n", "/break".cyan(), prompts.break_text);
    }

    fn hide_engagement_prompt(&self) {}

    fn show_session_summary(&self, summary: &SessionEndResponse) {
        println!("\n{}", "Session complete!".green().bold());
        println!("Duration: {:.1} minutes", summary.duration);
        println!("Turns:    {}", summary.turns);
        if !summary.summary.is_empty() {
            println!("\n{}", summary.summary);
        }
        println!();
    }

    fn alert(&self, message: &str) {
        eprintln!("{}", format!("⚠ {}", message).red().bold());
    }
}

/// [`Speaker`] that prints what would be spoken
///
/// Stands in for a text-to-speech engine.
#[derive(Debug, Default)]
pub struct TerminalSpeaker;

#[async_trait]
impl Speaker for TerminalSpeaker {
    async fn speak(&self, text: &str, emotion: EmotionTag) -> Result<()> {
        println!(
            "{}",
            format!("🔊 ({}x) {}", emotion.speech_rate(), text).dimmed()
        );
        Ok(())
    }

    fn cancel(&self) {}
}

/// Character name as shown in the chat
pub fn display_name(character_id: &str) -> String {
    let mut chars = character_id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Friend".to_string(),
    }
}

/// Face shown for a display emotion
pub fn emotion_face(emotion: EmotionTag) -> &'static str {
    match emotion {
        EmotionTag::Neutral => "🙂",
        EmotionTag::Happy => "😊",
        EmotionTag::Sad => "😢",
        EmotionTag::Thinking => "🤔",
        EmotionTag::Excited => "🤩",
        EmotionTag::Concerned => "😟",
        EmotionTag::Encouraging => "💪",
    }
}

/// Progress bar like `[#####---------------] 25 / 100 XP`
pub fn format_xp_bar(xp: u32, xp_for_level: u32) -> String {
    let xp_for_level = xp_for_level.max(1);
    let filled = ((xp.min(xp_for_level) as usize) * XP_BAR_WIDTH) / xp_for_level as usize;
    format!(
        "[{}{}] {} / {} XP",
        "#".repeat(filled),
        "-".repeat(XP_BAR_WIDTH - filled),
        xp,
        xp_for_level
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xp_bar_fill() {
        assert_eq!(
            format_xp_bar(25, 100),
            "[#####---------------] 25 / 100 XP"
        );
        assert_eq!(
            format_xp_bar(0, 100),
            "[--------------------] 0 / 100 XP"
        );
    }

    #[test]
    fn test_xp_bar_caps_when_over_level() {
        assert!(format_xp_bar(250, 200).starts_with("[####################]"));
        assert!(format_xp_bar(5, 0).contains("5 / 1 XP"));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("ramanujan"), "Ramanujan");
        assert_eq!(display_name(""), "Friend");
    }

    #[test]
    fn test_emotion_faces_are_distinct() {
        let faces: std::collections::HashSet<_> = [
            EmotionTag::Neutral,
            EmotionTag::Happy,
            EmotionTag::Sad,
            EmotionTag::Thinking,
            EmotionTag::Excited,
            EmotionTag::Concerned,
            EmotionTag::Encouraging,
        ]
        .into_iter()
        .map(emotion_face)
        .collect();
        assert_eq!(faces.len(), 7);
    }
}
