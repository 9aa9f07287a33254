//! Request and response types for the NeuroNarrative service API

use crate::session::{ChatMessage, EvaluationMetrics};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Session identifier handed out by `POST /session/start`
///
/// The service issues numeric ids today; string ids are accepted so a
/// different backend can be dropped in. The original JSON shape is
/// preserved on the way back out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionId {
    /// Numeric id (milliseconds since epoch on the reference service)
    Numeric(i64),
    /// Opaque string id
    Text(String),
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// `GET /health`
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    /// "ok" when the service is up
    pub status: String,
    /// Whether the language model backend is reachable
    #[serde(default, alias = "available")]
    pub ollama_available: bool,
}

/// A badge earned by a child
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Badge {
    /// Badge name, e.g. "First Words"
    pub badge_name: String,
    /// When it was earned
    #[serde(default)]
    pub earned_at: Option<String>,
}

/// Child profile as returned by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildProfile {
    /// Profile id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Avatar emoji
    #[serde(default = "default_avatar")]
    pub avatar: String,
    /// Current level (starts at 1)
    #[serde(default = "default_level")]
    pub level: u32,
    /// Accumulated XP
    #[serde(default)]
    pub xp: u32,
    /// Consecutive days with a conversation
    #[serde(default)]
    pub streak: u32,
    /// Age in years, when known
    #[serde(default)]
    pub age: Option<u8>,
    /// Earned badges (only present on `GET /children/{id}`)
    #[serde(default)]
    pub badges: Vec<Badge>,
}

fn default_avatar() -> String {
    "👦".to_string()
}

fn default_level() -> u32 {
    1
}

impl ChildProfile {
    /// XP needed to complete the current level
    pub fn xp_for_level(&self) -> u32 {
        100 * self.level.max(1)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChildrenEnvelope {
    #[serde(default)]
    pub children: Vec<ChildProfile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChildEnvelope {
    pub child: ChildProfile,
}

/// `POST /children`
#[derive(Debug, Clone, Serialize)]
pub struct CreateChildRequest {
    /// Display name
    pub name: String,
    /// Avatar emoji
    pub avatar: String,
    /// Age in years
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
}

/// Character metadata from `GET /characters`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    /// Display name
    pub name: String,
    /// Role, e.g. "Emotion Coach"
    #[serde(default)]
    pub role: String,
    /// Emoji shown when no artwork is available
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CharactersEnvelope {
    #[serde(default)]
    pub characters: BTreeMap<String, Character>,
}

/// `POST /chat`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Child profile id
    pub child_id: i64,
    /// Character id
    pub character: String,
    /// Message text
    pub message: String,
    /// Feeling selected by the child for this message
    pub emotion: Option<String>,
    /// Active session id
    pub session_id: Option<SessionId>,
    /// Rolling context summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_summary: Option<String>,
    /// Age in years
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
}

/// `POST /chat` response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Assistant reply
    pub response: String,
    /// XP awarded for this turn
    #[serde(default)]
    pub xp_gained: Option<u32>,
    /// Badges earned by this turn
    #[serde(default)]
    pub badges_earned: Vec<String>,
    /// Emotion suggested by the service
    #[serde(default)]
    pub ai_emotion: Option<String>,
}

/// `POST /chat/voice` multipart upload
#[derive(Debug, Clone)]
pub struct VoiceChatRequest {
    /// Recorded audio bytes
    pub audio: Vec<u8>,
    /// File name reported for the upload
    pub file_name: String,
    /// Child profile id
    pub child_id: i64,
    /// Character id
    pub character: String,
    /// Active session id
    pub session_id: Option<SessionId>,
    /// Feeling selected by the child
    pub emotion: Option<String>,
}

/// `POST /chat/voice` response
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceChatResponse {
    /// What the service heard
    #[serde(default)]
    pub transcribed_text: String,
    /// Assistant reply
    #[serde(default)]
    pub response: String,
    /// Emotion suggested by the service
    #[serde(default)]
    pub ai_emotion: Option<String>,
    /// XP awarded for this turn
    #[serde(default)]
    pub xp_gained: Option<u32>,
    /// Badges earned by this turn
    #[serde(default)]
    pub badges_earned: Vec<String>,
}

/// `POST /session/start`
#[derive(Debug, Clone, Serialize)]
pub struct SessionStartRequest {
    /// Child profile id
    pub child_id: i64,
    /// Character id
    pub character: String,
    /// Theme in use
    pub theme: String,
    /// Input mode ("type" or "voice")
    pub mode: String,
}

/// `POST /session/start` response
#[derive(Debug, Clone, Deserialize)]
pub struct SessionStartResponse {
    /// New session id
    pub session_id: SessionId,
    /// Summary carried over from earlier sessions
    #[serde(default)]
    pub context_summary: Option<String>,
}

/// `POST /session/end` response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SessionEndResponse {
    /// Duration in minutes
    #[serde(default)]
    pub duration: f64,
    /// Completed turns
    #[serde(default)]
    pub turns: u32,
    /// Human readable summary
    #[serde(default)]
    pub summary: String,
}

/// Prompt texts offered by the anti-freeze check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngagementPrompts {
    /// Keep talking about the current topic
    #[serde(rename = "continue", default = "default_continue_prompt")]
    pub continue_text: String,
    /// Change the topic
    #[serde(default = "default_shift_prompt")]
    pub shift: String,
    /// Take a break and end the session
    #[serde(rename = "break", default = "default_break_prompt")]
    pub break_text: String,
}

fn default_continue_prompt() -> String {
    "Tell me more about that".to_string()
}

fn default_shift_prompt() -> String {
    "Want to talk about something else?".to_string()
}

fn default_break_prompt() -> String {
    "Take a break".to_string()
}

impl Default for EngagementPrompts {
    fn default() -> Self {
        Self {
            continue_text: default_continue_prompt(),
            shift: default_shift_prompt(),
            break_text: default_break_prompt(),
        }
    }
}

/// `POST /antifreeze/check` response
#[derive(Debug, Clone, Deserialize)]
pub struct EngagementCheck {
    /// Whether the prompt should be shown
    #[serde(default)]
    pub should_activate: bool,
    /// Prompt texts
    #[serde(default)]
    pub prompts: EngagementPrompts,
}

/// Choice made on the anti-freeze prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementOption {
    /// Keep going
    Continue,
    /// Change topic
    Shift,
    /// End the session
    Break,
}

impl EngagementOption {
    /// Wire name of the option
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Shift => "shift",
            Self::Break => "break",
        }
    }
}

/// `POST /emoji/scaffold`
#[derive(Debug, Clone, Serialize)]
pub struct ScaffoldRequest {
    /// Feeling the child picked
    pub emotion: String,
    /// Child profile id
    pub child_id: i64,
    /// Character id
    pub character: String,
    /// Active session id
    pub session_id: Option<SessionId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScaffoldResponse {
    pub completion: String,
}

/// `POST /summary/generate`
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRequest {
    /// Child profile id
    pub child_id: i64,
    /// Session the summary belongs to
    pub session_id: Option<SessionId>,
    /// Most recent messages, oldest first
    pub messages: Vec<ChatMessage>,
    /// Character id
    pub character: String,
    /// Evaluation snapshot for the session
    pub evaluation: Option<EvaluationMetrics>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryResponse {
    #[serde(default)]
    pub summary: String,
}

/// A past session in the parent dashboard
#[derive(Debug, Clone, Deserialize)]
pub struct SessionRecord {
    /// Character id
    pub character: String,
    /// Completed turns
    #[serde(default)]
    pub turn_count: u32,
    /// Duration in minutes
    #[serde(default)]
    pub duration_minutes: Option<f64>,
    /// Start time as reported by the service
    #[serde(default)]
    pub start_time: Option<String>,
}

/// `GET /analytics/parent/{child_id}`
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParentDashboard {
    /// Child display name
    #[serde(default)]
    pub child_name: String,
    /// Current level
    #[serde(default)]
    pub level: u32,
    /// Accumulated XP
    #[serde(default)]
    pub xp: u32,
    /// Current streak in days
    #[serde(default)]
    pub streak: u32,
    /// Number of sessions
    #[serde(default)]
    pub total_sessions: u32,
    /// Number of conversation turns
    #[serde(default)]
    pub total_conversations: u32,
    /// Average turns per session
    #[serde(default)]
    pub avg_turns_per_session: f64,
    /// Share of emoji selections matching the message sentiment (percent)
    #[serde(default)]
    pub emoji_accuracy: f64,
    /// Feelings expressed, by count
    #[serde(default)]
    pub emotion_distribution: HashMap<String, u32>,
    /// Recent sessions, newest first
    #[serde(default)]
    pub recent_sessions: Vec<SessionRecord>,
    /// Earned badges
    #[serde(default)]
    pub badges: Vec<Badge>,
    /// Suggestions for parents
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// A visual theme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    /// Display name
    pub name: String,
    /// Named colors
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
    /// Background asset
    #[serde(default)]
    pub background: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ThemesEnvelope {
    #[serde(default)]
    pub themes: BTreeMap<String, Theme>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetThemeRequest<'a> {
    pub child_id: i64,
    pub theme: &'a str,
}
