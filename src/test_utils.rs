//! Test utilities for NeuroNarrative
//!
//! A scriptable in-memory [`ChatService`], a [`ChatView`] that records every
//! call, and a few fixtures shared by the unit tests.

use crate::client::{
    Character, ChatRequest, ChatResponse, ChatService, ChildProfile, CreateChildRequest,
    EngagementCheck, EngagementOption, EngagementPrompts, HealthStatus, ParentDashboard,
    ScaffoldRequest, SessionEndResponse, SessionId, SessionStartRequest, SessionStartResponse,
    SummaryRequest, Theme, VoiceChatRequest, VoiceChatResponse,
};
use crate::config::Config;
use crate::emotion::EmotionTag;
use crate::error::{NarrativeError, Result};
use crate::session::{ChatMessage, SessionContext};
use crate::view::ChatView;
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Assert that an error contains the expected message
pub fn assert_error_contains<T: std::fmt::Debug>(result: Result<T>, expected: &str) {
    match result {
        Ok(value) => panic!("Expected error containing '{}' but got Ok({:?})", expected, value),
        Err(e) => {
            let error_msg = format!("{:#}", e);
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Configuration with default values
pub fn test_config() -> Config {
    Config::default()
}

/// Configuration YAML exercising every section
pub fn test_config_yaml() -> String {
    r#"
service:
  base_url: http://localhost:5000/api
  timeout_seconds: 15

chat:
  engagement_timeout_seconds: 45
  summary_interval_turns: 4
  summary_window_messages: 8
  session_index_cap: 50
  default_theme: forest
  default_mode: voice
  voice_output: true
"#
    .to_string()
}

/// Profile of child 1, age 7
pub fn test_child() -> ChildProfile {
    ChildProfile {
        id: 1,
        name: "Asha".to_string(),
        avatar: "👧".to_string(),
        level: 1,
        xp: 0,
        streak: 0,
        age: Some(7),
        badges: Vec::new(),
    }
}

#[derive(Default)]
struct MockState {
    chat_replies: VecDeque<std::result::Result<ChatResponse, String>>,
    chat_delays: VecDeque<Duration>,
    chat_requests: Vec<ChatRequest>,
    voice_reply: Option<std::result::Result<VoiceChatResponse, String>>,
    voice_uploads: Vec<(String, usize)>,
    fail_session_start: bool,
    context_summary: Option<String>,
    ended: Vec<SessionId>,
    decline_engagement: bool,
    engagement_checks: usize,
    selections: Vec<EngagementOption>,
    scaffold: String,
    summary: String,
    summary_requests: Vec<SummaryRequest>,
    sync_count: usize,
    fail_sync: bool,
}

/// Scriptable [`ChatService`]
///
/// Chat replies and delays are consumed in call order; once the queue is
/// empty every chat gets "That's nice." with no XP. Sessions always get id 1.
#[derive(Default)]
pub struct MockService {
    state: Mutex<MockState>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn push_chat_reply(&self, reply: std::result::Result<ChatResponse, String>) {
        self.lock().chat_replies.push_back(reply);
    }

    pub fn push_chat_delay(&self, delay: Duration) {
        self.lock().chat_delays.push_back(delay);
    }

    pub fn set_voice_reply(&self, reply: std::result::Result<VoiceChatResponse, String>) {
        self.lock().voice_reply = Some(reply);
    }

    pub fn fail_session_start(&self, fail: bool) {
        self.lock().fail_session_start = fail;
    }

    pub fn set_context_summary(&self, summary: &str) {
        self.lock().context_summary = Some(summary.to_string());
    }

    pub fn decline_engagement(&self, decline: bool) {
        self.lock().decline_engagement = decline;
    }

    pub fn set_scaffold(&self, completion: &str) {
        self.lock().scaffold = completion.to_string();
    }

    pub fn set_summary(&self, summary: &str) {
        self.lock().summary = summary.to_string();
    }

    pub fn fail_sync(&self, fail: bool) {
        self.lock().fail_sync = fail;
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.lock().chat_requests.clone()
    }

    pub fn voice_uploads(&self) -> Vec<(String, usize)> {
        self.lock().voice_uploads.clone()
    }

    pub fn summary_requests(&self) -> Vec<SummaryRequest> {
        self.lock().summary_requests.clone()
    }

    pub fn sync_count(&self) -> usize {
        self.lock().sync_count
    }

    pub fn engagement_checks(&self) -> usize {
        self.lock().engagement_checks
    }

    pub fn selections(&self) -> Vec<EngagementOption> {
        self.lock().selections.clone()
    }

    pub fn ended_sessions(&self) -> Vec<SessionId> {
        self.lock().ended.clone()
    }
}

fn unavailable<T>(message: String) -> Result<T> {
    Err(NarrativeError::Unavailable(message).into())
}

#[async_trait]
impl ChatService for MockService {
    async fn health(&self) -> Result<HealthStatus> {
        Ok(HealthStatus {
            status: "ok".to_string(),
            ollama_available: true,
        })
    }

    async fn list_children(&self) -> Result<Vec<ChildProfile>> {
        Ok(vec![test_child()])
    }

    async fn create_child(&self, request: &CreateChildRequest) -> Result<ChildProfile> {
        Ok(ChildProfile {
            name: request.name.clone(),
            avatar: request.avatar.clone(),
            age: request.age,
            ..test_child()
        })
    }

    async fn get_child(&self, _child_id: i64) -> Result<ChildProfile> {
        Ok(test_child())
    }

    async fn delete_child(&self, _child_id: i64) -> Result<()> {
        Ok(())
    }

    async fn list_characters(&self) -> Result<BTreeMap<String, Character>> {
        Ok(BTreeMap::new())
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let (reply, delay) = {
            let mut state = self.lock();
            state.chat_requests.push(request.clone());
            (state.chat_replies.pop_front(), state.chat_delays.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match reply {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => unavailable(message),
            None => Ok(ChatResponse {
                response: "That's nice.".to_string(),
                xp_gained: None,
                badges_earned: Vec::new(),
                ai_emotion: None,
            }),
        }
    }

    async fn send_voice(&self, request: VoiceChatRequest) -> Result<VoiceChatResponse> {
        let reply = {
            let mut state = self.lock();
            state
                .voice_uploads
                .push((request.file_name.clone(), request.audio.len()));
            state.voice_reply.clone()
        };
        match reply {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => unavailable(message),
            None => unavailable("no voice reply scripted".to_string()),
        }
    }

    async fn start_session(&self, _request: &SessionStartRequest) -> Result<SessionStartResponse> {
        let state = self.lock();
        if state.fail_session_start {
            return unavailable("session start refused".to_string());
        }
        Ok(SessionStartResponse {
            session_id: SessionId::Numeric(1),
            context_summary: state.context_summary.clone(),
        })
    }

    async fn end_session(&self, session_id: &SessionId) -> Result<SessionEndResponse> {
        self.lock().ended.push(session_id.clone());
        Ok(SessionEndResponse::default())
    }

    async fn engagement_check(&self, _session_id: &SessionId) -> Result<EngagementCheck> {
        let mut state = self.lock();
        state.engagement_checks += 1;
        Ok(EngagementCheck {
            should_activate: !state.decline_engagement,
            prompts: EngagementPrompts::default(),
        })
    }

    async fn engagement_select(
        &self,
        _session_id: &SessionId,
        option: EngagementOption,
    ) -> Result<()> {
        self.lock().selections.push(option);
        Ok(())
    }

    async fn emoji_scaffold(&self, _request: &ScaffoldRequest) -> Result<String> {
        Ok(self.lock().scaffold.clone())
    }

    async fn generate_summary(&self, request: &SummaryRequest) -> Result<String> {
        let mut state = self.lock();
        state.summary_requests.push(request.clone());
        Ok(state.summary.clone())
    }

    async fn sync_chat(&self, _context: &SessionContext) -> Result<()> {
        let mut state = self.lock();
        state.sync_count += 1;
        if state.fail_sync {
            return unavailable("sync refused".to_string());
        }
        Ok(())
    }

    async fn parent_dashboard(&self, _child_id: i64) -> Result<ParentDashboard> {
        Ok(ParentDashboard::default())
    }

    async fn list_themes(&self) -> Result<BTreeMap<String, Theme>> {
        Ok(BTreeMap::new())
    }

    async fn set_theme(&self, _child_id: i64, _theme: &str) -> Result<()> {
        Ok(())
    }
}

/// A call made on a [`RecordingView`]
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Greeting(String),
    Message(ChatMessage),
    TypingShown,
    TypingHidden,
    Emotion(EmotionTag),
    Xp { xp: u32, gained: u32 },
    Badges(Vec<String>),
    Suggestion(String),
    EngagementShown,
    EngagementHidden,
    SessionSummary,
    Alert(String),
}

/// [`ChatView`] that records every call
#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    fn push(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Messages shown, in order
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Message(m) => Some(m),
                _ => None,
            })
            .collect()
    }
}

impl ChatView for RecordingView {
    fn show_greeting(&self, _character_id: &str, text: &str) {
        self.push(ViewEvent::Greeting(text.to_string()));
    }

    fn show_message(&self, message: &ChatMessage) {
        self.push(ViewEvent::Message(message.clone()));
    }

    fn show_typing(&self) {
        self.push(ViewEvent::TypingShown);
    }

    fn hide_typing(&self) {
        self.push(ViewEvent::TypingHidden);
    }

    fn set_ai_emotion(&self, emotion: EmotionTag) {
        self.push(ViewEvent::Emotion(emotion));
    }

    fn update_xp(&self, xp: u32, _xp_for_level: u32, gained: u32) {
        self.push(ViewEvent::Xp { xp, gained });
    }

    fn show_badges(&self, badges: &[String]) {
        self.push(ViewEvent::Badges(badges.to_vec()));
    }

    fn suggest_input(&self, text: &str) {
        self.push(ViewEvent::Suggestion(text.to_string()));
    }

    fn show_engagement_prompt(&self, _prompts: &EngagementPrompts) {
        self.push(ViewEvent::EngagementShown);
    }

    fn hide_engagement_prompt(&self) {
        self.push(ViewEvent::EngagementHidden);
    }

    fn show_session_summary(&self, _summary: &SessionEndResponse) {
        self.push(ViewEvent::SessionSummary);
    }

    fn alert(&self, message: &str) {
        self.push(ViewEvent::Alert(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<()> = Err(NarrativeError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        assert_error_contains(Ok(()), "error");
    }

    #[test]
    fn test_test_config_yaml_is_valid() {
        let config: Config = serde_yaml::from_str(&test_config_yaml()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.chat.default_mode, "voice");
        assert!(test_config().validate().is_ok());
    }

    #[tokio::test]
    async fn test_mock_chat_queue_then_default() {
        let service = MockService::new();
        service.push_chat_reply(Err("down".to_string()));
        let request = ChatRequest {
            child_id: 1,
            character: "rita".to_string(),
            message: "hi".to_string(),
            emotion: None,
            session_id: None,
            context_summary: None,
            age: None,
        };
        assert!(service.send_chat(&request).await.is_err());
        assert_eq!(
            service.send_chat(&request).await.unwrap().response,
            "That's nice."
        );
        assert_eq!(service.chat_requests().len(), 2);
    }
}
