//! Chat orchestration
//!
//! [`ChatOrchestrator`] runs the per-turn protocol of the chat screen:
//!
//! 1. re-arm the engagement timer
//! 2. scan the message for crisis language and stop there on a match
//! 3. show the message, update evaluation metrics, show the typing indicator
//! 4. send the message with the session id, context summary and age
//! 5. on success show the reply with its detected emotion, speak it, record
//!    the turn, apply XP and badges, clear the selected feeling
//! 6. on failure show a fixed apology
//!
//! State lives in an [`AppState`] behind a mutex that is never held across an
//! await, so two sends may overlap. Each send takes a new request generation;
//! a reply whose generation is no longer the latest is still shown and
//! recorded but leaves the display emotion, speech and selected feeling
//! alone.

use crate::client::{
    ChatRequest, ChatService, ChildProfile, EngagementOption, EngagementPrompts, ScaffoldRequest,
    SessionEndResponse, SessionId, SessionStartRequest, VoiceChatRequest,
};
use crate::config::ChatConfig;
use crate::emotion::{self, EmotionTag, Feeling};
use crate::engagement::{EngagementEvent, EngagementTimer};
use crate::error::{NarrativeError, Result};
use crate::safety::{CrisisFilter, SUPPORTIVE_MESSAGE};
use crate::session::{ChatMessage, SessionCache, SessionContext};
use crate::view::{ChatView, Speaker};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

/// Shown when the chat request fails
pub const APOLOGY_MESSAGE: &str = "Sorry, something went wrong. Please try again.";

/// Shown when a recording cannot be processed by the service
pub const VOICE_FAILURE_MESSAGE: &str = "Sorry, I could not hear you. Please try again.";

/// Shown for an empty or unintelligible transcript
pub const CLARIFICATION_MESSAGE: &str = "I didn't quite catch that. Can you say it again?";

const DEFAULT_RECORDING_NAME: &str = "recording.webm";

/// Application state of the chat screen
#[derive(Debug, Clone)]
pub struct AppState {
    pub child_id: i64,
    pub age: Option<u8>,
    pub xp: u32,
    pub level: u32,
    pub theme: String,
    pub mode: String,
    pub character_id: Option<String>,
    pub session_id: Option<SessionId>,
    pub selected_feeling: Option<Feeling>,
    pub display_emotion: EmotionTag,
    pub engagement_prompts: Option<EngagementPrompts>,
    context: Option<SessionContext>,
    last_reply: Option<ChatMessage>,
}

impl AppState {
    /// State for a child with no chat open yet
    pub fn for_child(child: &ChildProfile, theme: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            child_id: child.id,
            age: child.age,
            xp: child.xp,
            level: child.level.max(1),
            theme: theme.into(),
            mode: mode.into(),
            character_id: None,
            session_id: None,
            selected_feeling: None,
            display_emotion: EmotionTag::Neutral,
            engagement_prompts: None,
            context: None,
            last_reply: None,
        }
    }

    /// XP needed to fill the current level
    pub fn xp_for_level(&self) -> u32 {
        self.level.max(1).saturating_mul(100)
    }
}

/// Services and presentation the orchestrator drives
pub struct Collaborators {
    pub service: Arc<dyn ChatService>,
    pub cache: Arc<SessionCache>,
    pub crisis: CrisisFilter,
    pub view: Arc<dyn ChatView>,
    pub speaker: Arc<dyn Speaker>,
}

/// Tunables of the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Idle time before the engagement check
    pub engagement_timeout: Duration,
    /// Speak replies through the [`Speaker`]
    pub voice_output: bool,
}

impl From<&ChatConfig> for OrchestratorSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            engagement_timeout: Duration::from_secs(config.engagement_timeout_seconds),
            voice_output: config.voice_output,
        }
    }
}

/// What happened to a message the child sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input; nothing was done
    Ignored,
    /// The character replied
    Replied {
        emotion: EmotionTag,
        xp_gained: u32,
        /// False when a newer message was sent before this reply arrived
        current: bool,
    },
    /// Crisis language was found; the supportive message was shown
    CrisisIntercepted,
    /// The transcript was empty or unintelligible
    Clarification,
    /// The request failed; an apology or alert was shown
    Failed,
}

struct TurnContext {
    child_id: i64,
    character_id: String,
    session_id: Option<SessionId>,
    metrics_key: SessionId,
    feeling: Option<Feeling>,
    age: Option<u8>,
    previous_reply: Option<ChatMessage>,
}

/// Drives one child's chat screen
pub struct ChatOrchestrator {
    service: Arc<dyn ChatService>,
    cache: Arc<SessionCache>,
    crisis: CrisisFilter,
    view: Arc<dyn ChatView>,
    speaker: Arc<dyn Speaker>,
    timer: EngagementTimer,
    voice_output: bool,
    state: Mutex<AppState>,
    generation: AtomicU64,
}

impl ChatOrchestrator {
    /// Create an orchestrator and the receiver for its timer events
    ///
    /// The caller feeds received events back through
    /// [`ChatOrchestrator::handle_engagement_event`].
    pub fn new(
        collaborators: Collaborators,
        settings: OrchestratorSettings,
        state: AppState,
    ) -> (Self, mpsc::UnboundedReceiver<EngagementEvent>) {
        let (timer, events) = EngagementTimer::new(settings.engagement_timeout);
        let orchestrator = Self {
            service: collaborators.service,
            cache: collaborators.cache,
            crisis: collaborators.crisis,
            view: collaborators.view,
            speaker: collaborators.speaker,
            timer,
            voice_output: settings.voice_output,
            state: Mutex::new(state),
            generation: AtomicU64::new(0),
        };
        (orchestrator, events)
    }

    /// Open a chat with a character
    ///
    /// Starts a service session (continuing offline if that fails), merges
    /// any prior summary the service returns, replays the cached
    /// conversation, shows the greeting and arms the timer.
    ///
    /// # Errors
    ///
    /// Returns error if the character id is empty
    pub async fn open_chat(&self, character_id: &str) -> Result<SessionContext> {
        let character_id = character_id.trim().to_lowercase();
        if character_id.is_empty() {
            return Err(NarrativeError::Session("No character selected".to_string()).into());
        }

        let (child_id, theme, mode) = {
            let state = self.lock_state();
            (state.child_id, state.theme.clone(), state.mode.clone())
        };

        let mut context = self.cache.load(child_id, &character_id);
        let request = SessionStartRequest {
            child_id,
            character: character_id.clone(),
            theme,
            mode,
        };
        match self.service.start_session(&request).await {
            Ok(started) => {
                tracing::info!(
                    "Started session {} for child {} with {}",
                    started.session_id,
                    child_id,
                    character_id
                );
                context.session_id = Some(started.session_id);
                if let Some(summary) = started.context_summary.filter(|s| !s.trim().is_empty()) {
                    if let Err(e) = self.cache.apply_summary(child_id, &character_id, &summary) {
                        tracing::warn!("Failed to store prior context summary: {:#}", e);
                    }
                    context.summary = summary;
                }
            }
            Err(e) => {
                tracing::warn!("Could not start a session, continuing offline: {:#}", e);
                context.session_id = None;
            }
        }

        let greeting = ChatMessage::assistant(context.greeting.clone(), EmotionTag::Happy);
        {
            let mut state = self.lock_state();
            state.character_id = Some(character_id.clone());
            state.session_id = context.session_id.clone();
            state.selected_feeling = None;
            state.display_emotion = EmotionTag::Happy;
            state.engagement_prompts = None;
            state.last_reply = Some(greeting);
            state.context = Some(context.clone());
        }
        self.next_generation();

        for message in &context.messages {
            self.view.show_message(message);
        }
        self.view.show_greeting(&character_id, &context.greeting);
        self.view.set_ai_emotion(EmotionTag::Happy);
        self.arm_timer();
        self.speak(&context.greeting, EmotionTag::Happy).await;

        Ok(context)
    }

    /// Send a typed message
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Session` if no chat is open
    pub async fn send_text(&self, text: &str) -> Result<TurnOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }
        let turn = self.turn_context()?;
        self.arm_timer();
        self.submit(turn, text.to_string()).await
    }

    /// Send a transcript produced by local speech-to-text
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Session` if no chat is open
    pub async fn send_transcript(&self, transcript: &str) -> Result<TurnOutcome> {
        let turn = self.turn_context()?;
        self.arm_timer();
        if is_unintelligible(transcript) {
            tracing::debug!("Unintelligible transcript: {:?}", transcript);
            self.show_assistant(CLARIFICATION_MESSAGE, EmotionTag::Encouraging);
            return Ok(TurnOutcome::Clarification);
        }
        self.submit(turn, transcript.trim().to_string()).await
    }

    /// Upload a recording for server-side transcription and reply
    ///
    /// The returned transcript goes through the same crisis scan as typed
    /// text before anything is shown.
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Session` if no chat is open
    pub async fn send_recording(&self, path: &Path) -> Result<TurnOutcome> {
        let turn = self.turn_context()?;

        let audio = match tokio::fs::read(path).await {
            Ok(audio) if !audio.is_empty() => audio,
            Ok(_) => {
                self.view.alert("That recording is empty. Please record again.");
                return Ok(TurnOutcome::Failed);
            }
            Err(e) => {
                let error = NarrativeError::Audio(format!(
                    "Could not read recording {}: {}",
                    path.display(),
                    e
                ));
                tracing::warn!("{}", error);
                self.view.alert(&error.to_string());
                return Ok(TurnOutcome::Failed);
            }
        };

        self.arm_timer();
        self.view.show_typing();
        let generation = self.next_generation();

        let request = VoiceChatRequest {
            audio,
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| DEFAULT_RECORDING_NAME.to_string()),
            child_id: turn.child_id,
            character: turn.character_id.clone(),
            session_id: turn.session_id.clone(),
            emotion: turn.feeling.map(|f| f.as_str().to_string()),
        };

        let response = match self.service.send_voice(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Voice chat failed: {:#}", e);
                self.view.hide_typing();
                self.show_assistant(VOICE_FAILURE_MESSAGE, EmotionTag::Concerned);
                return Ok(TurnOutcome::Failed);
            }
        };

        let transcript = response.transcribed_text.trim();
        if is_unintelligible(transcript) {
            self.view.hide_typing();
            self.show_assistant(CLARIFICATION_MESSAGE, EmotionTag::Encouraging);
            return Ok(TurnOutcome::Clarification);
        }
        if self.crisis.scan(transcript, turn.child_id, &turn.character_id) {
            self.view.hide_typing();
            self.show_crisis_response(transcript, turn.feeling);
            return Ok(TurnOutcome::CrisisIntercepted);
        }

        let user = ChatMessage::user(transcript, turn.feeling);
        self.view.show_message(&user);
        self.observe_turn(&turn, &user);
        self.view.hide_typing();

        let emotion = response
            .ai_emotion
            .as_deref()
            .and_then(|e| e.parse::<EmotionTag>().ok())
            .unwrap_or_else(|| emotion::detect(&response.response));

        Ok(self
            .deliver_reply(
                generation,
                &turn,
                user,
                response.response,
                emotion,
                response.xp_gained.unwrap_or(0),
                &response.badges_earned,
            )
            .await)
    }

    /// Select the feeling for the next message and fetch a sentence starter
    ///
    /// Returns the suggested completion, if the service offered one.
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Session` if no chat is open
    pub async fn select_emotion(&self, feeling: Feeling) -> Result<Option<String>> {
        let turn = self.turn_context()?;
        self.arm_timer();
        self.lock_state().selected_feeling = Some(feeling);

        let request = ScaffoldRequest {
            emotion: feeling.as_str().to_string(),
            child_id: turn.child_id,
            character: turn.character_id,
            session_id: turn.session_id,
        };
        match self.service.emoji_scaffold(&request).await {
            Ok(completion) if !completion.trim().is_empty() => {
                self.view.suggest_input(&completion);
                Ok(Some(completion))
            }
            Ok(_) => Ok(None),
            Err(e) => {
                tracing::warn!("Emoji scaffold failed: {:#}", e);
                Ok(None)
            }
        }
    }

    /// Typing or other activity; restarts the idle countdown
    pub fn note_activity(&self) {
        if self.is_open() {
            self.arm_timer();
        }
    }

    /// React to the engagement timer firing
    ///
    /// Returns whether the re-engagement prompt was shown.
    ///
    /// # Errors
    ///
    /// Currently infallible; service failures are logged
    pub async fn handle_engagement_event(&self, event: EngagementEvent) -> Result<bool> {
        let EngagementEvent::Fired { generation } = event;
        if !self.timer.acknowledge(generation) {
            return Ok(false);
        }

        let session_id = self.lock_state().session_id.clone();
        let Some(session_id) = session_id else {
            tracing::debug!("Engagement timer fired without a session");
            return Ok(false);
        };

        match self.service.engagement_check(&session_id).await {
            Ok(check) if check.should_activate => {
                if self.timer.generation() != generation {
                    tracing::debug!("Activity during engagement check; not prompting");
                    return Ok(false);
                }
                self.timer.mark_prompt_visible();
                self.view.show_engagement_prompt(&check.prompts);
                self.lock_state().engagement_prompts = Some(check.prompts);
                Ok(true)
            }
            Ok(_) => {
                tracing::debug!("Service declined the engagement prompt");
                Ok(false)
            }
            Err(e) => {
                tracing::warn!("Engagement check failed: {:#}", e);
                Ok(false)
            }
        }
    }

    /// Act on the child's answer to the re-engagement prompt
    ///
    /// "break" ends the session and returns its summary; the other options
    /// re-arm the timer.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`ChatOrchestrator::end_session`]
    pub async fn choose_engagement_option(
        &self,
        option: EngagementOption,
    ) -> Result<Option<SessionEndResponse>> {
        if self.timer.disarm() {
            self.view.hide_engagement_prompt();
        }
        let (session_id, prompts) = {
            let mut state = self.lock_state();
            (state.session_id.clone(), state.engagement_prompts.take())
        };

        if let Some(session_id) = &session_id {
            if let Err(e) = self.service.engagement_select(session_id, option).await {
                tracing::warn!("Failed to log engagement choice: {:#}", e);
            }
        }
        tracing::info!("Engagement option chosen: {}", option.as_str());

        match option {
            EngagementOption::Break => self.end_session().await,
            EngagementOption::Shift => {
                let shift = prompts.unwrap_or_default().shift;
                self.show_assistant(&shift, EmotionTag::Encouraging);
                self.arm_timer();
                Ok(None)
            }
            EngagementOption::Continue => {
                self.arm_timer();
                Ok(None)
            }
        }
    }

    /// End the open session
    ///
    /// Reports duration, turns and summary when the service answers, stops
    /// the timer and speech, and waits for background cache work.
    ///
    /// # Errors
    ///
    /// Currently infallible; service failures are logged
    pub async fn end_session(&self) -> Result<Option<SessionEndResponse>> {
        if self.timer.disarm() {
            self.view.hide_engagement_prompt();
        }
        self.speaker.cancel();

        let (session_id, character_id) = {
            let mut state = self.lock_state();
            state.engagement_prompts = None;
            state.selected_feeling = None;
            state.context = None;
            state.last_reply = None;
            (state.session_id.take(), state.character_id.take())
        };
        self.next_generation();

        let summary = match session_id {
            Some(session_id) => match self.service.end_session(&session_id).await {
                Ok(summary) => {
                    tracing::info!(
                        "Session {} ended after {} turns",
                        session_id,
                        summary.turns
                    );
                    self.view.show_session_summary(&summary);
                    Some(summary)
                }
                Err(e) => {
                    tracing::warn!("Failed to end session {}: {:#}", session_id, e);
                    None
                }
            },
            None => None,
        };

        if let Some(character_id) = character_id {
            tracing::debug!("Closed chat with {}", character_id);
        }
        self.cache.drain().await;
        Ok(summary)
    }

    /// Whether a chat is open
    pub fn is_open(&self) -> bool {
        self.lock_state().character_id.is_some()
    }

    /// Snapshot of the application state
    pub fn state(&self) -> AppState {
        self.lock_state().clone()
    }

    /// Expression the character currently shows
    pub fn display_emotion(&self) -> EmotionTag {
        self.lock_state().display_emotion
    }

    /// XP accumulated so far
    pub fn xp(&self) -> u32 {
        self.lock_state().xp
    }

    /// Feeling selected for the next message
    pub fn selected_feeling(&self) -> Option<Feeling> {
        self.lock_state().selected_feeling
    }

    /// Open session, if any
    pub fn session_id(&self) -> Option<SessionId> {
        self.lock_state().session_id.clone()
    }

    /// The engagement timer
    pub fn timer(&self) -> &EngagementTimer {
        &self.timer
    }

    /// Session cache shared with the orchestrator
    pub fn cache(&self) -> &Arc<SessionCache> {
        &self.cache
    }

    async fn submit(&self, turn: TurnContext, text: String) -> Result<TurnOutcome> {
        if self.crisis.scan(&text, turn.child_id, &turn.character_id) {
            self.show_crisis_response(&text, turn.feeling);
            return Ok(TurnOutcome::CrisisIntercepted);
        }

        let user = ChatMessage::user(text.clone(), turn.feeling);
        self.view.show_message(&user);
        self.observe_turn(&turn, &user);
        self.view.show_typing();

        let generation = self.next_generation();
        let summary = self.cache.load(turn.child_id, &turn.character_id).summary;
        let request = ChatRequest {
            child_id: turn.child_id,
            character: turn.character_id.clone(),
            message: text,
            emotion: turn.feeling.map(|f| f.as_str().to_string()),
            session_id: turn.session_id.clone(),
            context_summary: Some(summary).filter(|s| !s.is_empty()),
            age: turn.age,
        };

        let result = self.service.send_chat(&request).await;
        self.view.hide_typing();

        match result {
            Ok(response) => {
                let emotion = emotion::detect(&response.response);
                Ok(self
                    .deliver_reply(
                        generation,
                        &turn,
                        user,
                        response.response,
                        emotion,
                        response.xp_gained.unwrap_or(0),
                        &response.badges_earned,
                    )
                    .await)
            }
            Err(e) => {
                tracing::error!("Chat request failed: {:#}", e);
                self.show_assistant(APOLOGY_MESSAGE, EmotionTag::Concerned);
                Ok(TurnOutcome::Failed)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn deliver_reply(
        &self,
        generation: u64,
        turn: &TurnContext,
        user: ChatMessage,
        reply_text: String,
        emotion: EmotionTag,
        xp_gained: u32,
        badges: &[String],
    ) -> TurnOutcome {
        let current = self.generation.load(Ordering::SeqCst) == generation;
        let reply = ChatMessage::assistant(reply_text.clone(), emotion);
        self.view.show_message(&reply);

        let (xp, xp_for_level) = {
            let mut state = self.lock_state();
            let recorded = match state.context.as_mut() {
                Some(context) if context.character_id == turn.character_id => {
                    self.cache.record_turn(context, user, reply.clone())
                }
                _ => {
                    let mut context = self.cache.load(turn.child_id, &turn.character_id);
                    self.cache.record_turn(&mut context, user, reply.clone())
                }
            };
            if let Err(e) = recorded {
                tracing::warn!("Failed to record turn: {:#}", e);
            }

            state.xp = state.xp.saturating_add(xp_gained);
            if current {
                state.display_emotion = emotion;
                state.selected_feeling = None;
                state.last_reply = Some(reply);
            }
            (state.xp, state.xp_for_level())
        };

        if xp_gained > 0 {
            self.view.update_xp(xp, xp_for_level, xp_gained);
        }
        if !badges.is_empty() {
            tracing::info!("Badges earned: {}", badges.join(", "));
            self.view.show_badges(badges);
        }

        if current {
            self.view.set_ai_emotion(emotion);
            self.arm_timer();
            self.speak(&reply_text, emotion).await;
        } else {
            tracing::debug!("Reply to request {} arrived after a newer message", generation);
        }

        TurnOutcome::Replied {
            emotion,
            xp_gained,
            current,
        }
    }

    fn turn_context(&self) -> Result<TurnContext> {
        let state = self.lock_state();
        let (Some(character_id), Some(context)) = (&state.character_id, &state.context) else {
            return Err(NarrativeError::Session("No chat is open".to_string()).into());
        };
        Ok(TurnContext {
            child_id: state.child_id,
            character_id: character_id.clone(),
            session_id: state.session_id.clone(),
            metrics_key: context.metrics_key(),
            feeling: state.selected_feeling,
            age: state.age,
            previous_reply: state.last_reply.clone(),
        })
    }

    fn observe_turn(&self, turn: &TurnContext, user: &ChatMessage) {
        if let Err(e) = self.cache.record_metrics(
            &turn.metrics_key,
            &user.text,
            turn.previous_reply.as_ref(),
            turn.feeling,
        ) {
            tracing::warn!("Failed to update evaluation metrics: {:#}", e);
        }
    }

    fn show_crisis_response(&self, text: &str, feeling: Option<Feeling>) {
        self.view.show_message(&ChatMessage::user(text, feeling));
        self.show_assistant(SUPPORTIVE_MESSAGE, EmotionTag::Concerned);
        self.view.set_ai_emotion(EmotionTag::Concerned);
        self.lock_state().display_emotion = EmotionTag::Concerned;
    }

    fn show_assistant(&self, text: &str, emotion: EmotionTag) {
        self.view
            .show_message(&ChatMessage::assistant(text, emotion));
    }

    fn arm_timer(&self) {
        if self.timer.arm() {
            self.view.hide_engagement_prompt();
            self.lock_state().engagement_prompts = None;
        }
    }

    async fn speak(&self, text: &str, emotion: EmotionTag) {
        if !self.voice_output {
            return;
        }
        self.speaker.cancel();
        if let Err(e) = self.speaker.speak(text, emotion).await {
            tracing::warn!("Speech output failed: {:#}", e);
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn lock_state(&self) -> MutexGuard<'_, AppState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Whether a transcript carries nothing worth sending
///
/// # Examples
///
/// ```
/// use neuronarrative::orchestrator::is_unintelligible;
///
/// assert!(is_unintelligible("   "));
/// assert!(is_unintelligible("... ?"));
/// assert!(!is_unintelligible("hi"));
/// ```
pub fn is_unintelligible(transcript: &str) -> bool {
    !transcript.chars().any(char::is_alphanumeric)
}
