use crate::characters;
use crate::client::SessionId;
use crate::emotion::{EmotionTag, Feeling};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The child
    User,
    /// The character
    Assistant,
}

/// One message of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author
    pub role: Role,
    /// Message text
    pub text: String,
    /// Selected feeling for user messages, display emotion for replies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
    /// When the message was shown
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// A message from the child, stamped now
    pub fn user(text: impl Into<String>, feeling: Option<Feeling>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            emotion: feeling.map(|f| f.as_str().to_string()),
            timestamp: Utc::now(),
        }
    }

    /// A reply from the character, stamped now
    pub fn assistant(text: impl Into<String>, emotion: EmotionTag) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            emotion: Some(emotion.as_str().to_string()),
            timestamp: Utc::now(),
        }
    }
}

/// Cached conversation between one child and one character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Child profile id
    pub child_id: i64,
    /// Character id
    pub character_id: String,
    /// Service session, once one has been started
    #[serde(default)]
    pub session_id: Option<SessionId>,
    /// Messages in display order
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Rolling summary produced by the service
    #[serde(default)]
    pub summary: String,
    /// Always equal to `messages.len()`
    #[serde(default)]
    pub message_count: usize,
    /// Shown when the chat opens; not part of `messages`
    #[serde(default)]
    pub greeting: String,
    /// Last local modification
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl SessionContext {
    /// Empty conversation opening with the character's greeting
    ///
    /// # Examples
    ///
    /// ```
    /// use neuronarrative::session::SessionContext;
    ///
    /// let ctx = SessionContext::new(1, "rita");
    /// assert_eq!(ctx.message_count, 0);
    /// assert!(ctx.greeting.contains("Rita"));
    /// ```
    pub fn new(child_id: i64, character_id: impl Into<String>) -> Self {
        let character_id = character_id.into();
        Self {
            child_id,
            greeting: characters::greeting_for(&character_id).to_string(),
            character_id,
            session_id: None,
            messages: Vec::new(),
            summary: String::new(),
            message_count: 0,
            updated_at: Utc::now(),
        }
    }

    /// Completed user/assistant exchanges
    pub fn turns(&self) -> usize {
        self.message_count / 2
    }

    /// The last `n` messages, oldest first
    pub fn recent_messages(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Most recent reply from the character
    pub fn last_assistant(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Key under which this conversation's evaluation metrics are stored
    ///
    /// Falls back to a per-child, per-character key when no service session
    /// was started.
    pub fn metrics_key(&self) -> SessionId {
        self.session_id.clone().unwrap_or_else(|| {
            SessionId::Text(format!("offline-{}-{}", self.child_id, self.character_id))
        })
    }
}

/// Entry of a child's most-recent-first session index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionIndexEntry {
    /// Character the conversation is with
    pub character_id: String,
    /// Service session, if any
    #[serde(default)]
    pub session_id: Option<SessionId>,
    /// Messages in the cached conversation
    #[serde(default)]
    pub message_count: usize,
    /// When the conversation was last saved
    pub updated_at: DateTime<Utc>,
}

impl From<&SessionContext> for SessionIndexEntry {
    fn from(context: &SessionContext) -> Self {
        Self {
            character_id: context.character_id.clone(),
            session_id: context.session_id.clone(),
            message_count: context.message_count,
            updated_at: context.updated_at,
        }
    }
}
