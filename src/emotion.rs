//! Emotions shown and chosen during a chat
//!
//! [`EmotionTag`] is the expression a character displays; it is picked from
//! the assistant's reply by [`detect`]. [`Feeling`] is what a child selects
//! with the emotion buttons before sending a message.

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Expression displayed by a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmotionTag {
    /// Resting face
    #[default]
    Neutral,
    /// Pleased
    Happy,
    /// Sad
    Sad,
    /// Pondering a question
    Thinking,
    /// Enthusiastic
    Excited,
    /// Worried or apologetic
    Concerned,
    /// Cheering the child on
    Encouraging,
}

impl EmotionTag {
    /// Wire and asset name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Thinking => "thinking",
            Self::Excited => "excited",
            Self::Concerned => "concerned",
            Self::Encouraging => "encouraging",
        }
    }

    /// Speech rate multiplier used when speaking with this expression
    pub fn speech_rate(&self) -> f32 {
        match self {
            Self::Excited => 1.0,
            Self::Concerned | Self::Sad => 0.8,
            _ => 0.9,
        }
    }
}

impl fmt::Display for EmotionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "neutral" => Ok(Self::Neutral),
            "happy" => Ok(Self::Happy),
            "sad" => Ok(Self::Sad),
            "thinking" => Ok(Self::Thinking),
            "excited" => Ok(Self::Excited),
            "concerned" => Ok(Self::Concerned),
            "encouraging" => Ok(Self::Encouraging),
            other => Err(format!("Unknown emotion: {}", other)),
        }
    }
}

/// Pick the display expression for an assistant reply
///
/// Keyword and punctuation heuristic, checked in order: exclamation or
/// superlatives, long questions, apologies, positive adjectives,
/// encouragement, otherwise neutral.
///
/// # Examples
///
/// ```
/// use neuronarrative::emotion::{detect, EmotionTag};
///
/// assert_eq!(detect("What a wonderful surprise!"), EmotionTag::Excited);
/// assert_eq!(detect("I'm sorry, I don't understand?"), EmotionTag::Concerned);
/// assert_eq!(detect("ok"), EmotionTag::Neutral);
/// ```
pub fn detect(text: &str) -> EmotionTag {
    let lower = text.to_lowercase();

    if lower.contains('!') || lower.contains("great") || lower.contains("wonderful") {
        EmotionTag::Excited
    } else if lower.contains('?') && lower.split(' ').count() > 8 {
        EmotionTag::Thinking
    } else if lower.contains("sorry") || lower.contains("understand") {
        EmotionTag::Concerned
    } else if lower.contains("good") || lower.contains("nice") {
        EmotionTag::Happy
    } else if lower.contains("try") || lower.contains("can") {
        EmotionTag::Encouraging
    } else {
        EmotionTag::Neutral
    }
}

/// Feeling a child selects for their next message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feeling {
    /// 😊
    Happy,
    /// 😢
    Sad,
    /// 😠
    Angry,
    /// 😨
    Scared,
    /// 🤩
    Excited,
    /// 😌
    Calm,
}

impl Feeling {
    /// All feelings in button order
    pub const ALL: [Feeling; 6] = [
        Self::Happy,
        Self::Sad,
        Self::Angry,
        Self::Scared,
        Self::Excited,
        Self::Calm,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Scared => "scared",
            Self::Excited => "excited",
            Self::Calm => "calm",
        }
    }

    /// Badge shown next to a message sent with this feeling
    pub fn label(&self) -> String {
        let (emoji, name) = match self {
            Self::Happy => ("😊", "Happy"),
            Self::Sad => ("😢", "Sad"),
            Self::Angry => ("😠", "Angry"),
            Self::Scared => ("😨", "Scared"),
            Self::Excited => ("🤩", "Excited"),
            Self::Calm => ("😌", "Calm"),
        };
        format!("{} {}", emoji, name.italic())
    }
}

impl fmt::Display for Feeling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feeling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| {
                format!(
                    "Unknown feeling: {}. Choose one of: {}",
                    s,
                    Self::ALL.map(|f| f.as_str()).join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_excited_on_exclamation() {
        assert_eq!(detect("What a wonderful surprise!"), EmotionTag::Excited);
        assert_eq!(detect("That's wonderful!"), EmotionTag::Excited);
        assert_eq!(detect("That is great"), EmotionTag::Excited);
    }

    #[test]
    fn test_detect_apology_beats_short_question() {
        assert_eq!(
            detect("I'm sorry, I don't understand?"),
            EmotionTag::Concerned
        );
    }

    #[test]
    fn test_detect_long_question_is_thinking() {
        assert_eq!(
            detect("What do you think would happen if the turtle went to the moon?"),
            EmotionTag::Thinking
        );
    }

    #[test]
    fn test_detect_short_question_is_not_thinking() {
        assert_eq!(detect("How are you?"), EmotionTag::Neutral);
    }

    #[test]
    fn test_detect_counts_every_space_in_question_length() {
        assert_eq!(detect("how  are  you  doing  today?"), EmotionTag::Thinking);
        assert_eq!(detect("how are you doing today?"), EmotionTag::Neutral);
    }

    #[test]
    fn test_detect_positive_and_encouraging() {
        assert_eq!(detect("That sounds nice."), EmotionTag::Happy);
        assert_eq!(detect("Let's try again."), EmotionTag::Encouraging);
        assert_eq!(detect("ok"), EmotionTag::Neutral);
    }

    #[test]
    fn test_detect_is_case_insensitive() {
        assert_eq!(detect("GOOD JOB."), EmotionTag::Happy);
    }

    #[test]
    fn test_emotion_tag_parse_and_display() {
        assert_eq!("Thinking".parse::<EmotionTag>().unwrap(), EmotionTag::Thinking);
        assert!("bored".parse::<EmotionTag>().is_err());
        assert_eq!(EmotionTag::Encouraging.to_string(), "encouraging");
    }

    #[test]
    fn test_feeling_parse() {
        assert_eq!("SCARED".parse::<Feeling>().unwrap(), Feeling::Scared);
        let err = "grumpy".parse::<Feeling>().unwrap_err();
        assert!(err.contains("happy, sad, angry, scared, excited, calm"));
    }

    #[test]
    fn test_feeling_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Feeling::Calm).unwrap(),
            "\"calm\""
        );
    }
}
