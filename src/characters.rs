//! Built-in character catalog
//!
//! The service reports each character's name and role; the client adds the
//! things it needs to present them: an emoji, a one-line description and the
//! greeting shown when a chat opens.

/// Presentation details of a character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterInfo {
    /// Character id used on the wire
    pub id: &'static str,
    /// Emoji used in place of artwork
    pub emoji: &'static str,
    /// What the character helps with
    pub description: &'static str,
    /// First message of every chat
    pub greeting: &'static str,
}

/// All characters the client knows how to present
pub const CHARACTERS: &[CharacterInfo] = &[
    CharacterInfo {
        id: "nandhini",
        emoji: "🐡",
        description: "Helps identify and express feelings",
        greeting: "Hi! I'm Nandhini. How are you feeling today?",
    },
    CharacterInfo {
        id: "samyuktha",
        emoji: "🐙",
        description: "Teaches conversation and social skills",
        greeting: "Hi! I'm Samyuktha. Let's chat and have fun!",
    },
    CharacterInfo {
        id: "naveen",
        emoji: "🐢",
        description: "Inspires creative storytelling",
        greeting: "Hi! I'm Naveen. Let's create an amazing story together!",
    },
    CharacterInfo {
        id: "ramanujan",
        emoji: "🦀",
        description: "Teaches problem-solving",
        greeting: "Hi! I'm Ramanujan. I can help you solve puzzles!",
    },
    CharacterInfo {
        id: "rita",
        emoji: "🦭",
        description: "Helps organize daily routines",
        greeting: "Hi! I'm Rita. I can help you plan your day!",
    },
];

const FALLBACK_EMOJI: &str = "🎭";
const FALLBACK_GREETING: &str = "Hi! Let's chat!";

/// Look up a character by id
pub fn find(id: &str) -> Option<&'static CharacterInfo> {
    CHARACTERS.iter().find(|c| c.id.eq_ignore_ascii_case(id))
}

/// Greeting for a character, or a generic one for unknown ids
pub fn greeting_for(id: &str) -> &'static str {
    find(id).map(|c| c.greeting).unwrap_or(FALLBACK_GREETING)
}

/// Emoji for a character, or a generic mask for unknown ids
pub fn emoji_for(id: &str) -> &'static str {
    find(id).map(|c| c.emoji).unwrap_or(FALLBACK_EMOJI)
}
