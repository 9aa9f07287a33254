//! Local session cache
//!
//! Keeps each child's conversations with each character, the rolling context
//! summary, a most-recent-first session index and per-session evaluation
//! metrics in the [`LocalStore`]. Saves are mirrored to the service on a
//! best-effort basis; summary refreshes are requested every few turns.
//!
//! Local writes happen before the method returns. Network work (sync and
//! summary) runs on background tasks tracked by a [`TaskTracker`] and can be
//! awaited with [`SessionCache::drain`].

pub mod metrics;
pub mod types;

pub use metrics::EvaluationMetrics;
pub use types::{ChatMessage, Role, SessionContext, SessionIndexEntry};

use crate::characters;
use crate::client::{ChatService, SessionId, SummaryRequest};
use crate::config::ChatConfig;
use crate::emotion::Feeling;
use crate::error::Result;
use crate::storage::{keys, LocalStore, Preferences};
use chrono::Utc;
use ::metrics::increment_counter;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;

/// Tunables of the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Request a summary every this many turns
    pub summary_interval: usize,
    /// Messages sent with a summary request
    pub summary_window: usize,
    /// Maximum entries kept in a session index
    pub index_cap: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            summary_interval: 4,
            summary_window: 8,
            index_cap: 50,
        }
    }
}

impl From<&ChatConfig> for CacheSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            summary_interval: config.summary_interval_turns,
            summary_window: config.summary_window_messages,
            index_cap: config.session_index_cap,
        }
    }
}

/// Outcome of [`SessionCache::record_turn`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedTurn {
    /// Completed turns after this one
    pub turn: usize,
    /// Whether a summary refresh was requested
    pub summary_requested: bool,
}

/// Cache of conversations, indexes and metrics
pub struct SessionCache {
    store: LocalStore,
    service: Arc<dyn ChatService>,
    tasks: TaskTracker,
    settings: CacheSettings,
}

impl SessionCache {
    /// Create a cache over `store` that syncs through `service`
    pub fn new(store: LocalStore, service: Arc<dyn ChatService>, settings: CacheSettings) -> Self {
        Self {
            store,
            service,
            tasks: TaskTracker::new(),
            settings,
        }
    }

    /// Underlying store
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Cached conversation, or a fresh one opening with the greeting
    ///
    /// Never fails; unreadable records are treated as absent.
    pub fn load(&self, child_id: i64, character_id: &str) -> SessionContext {
        match self.store.read::<SessionContext>(&keys::chat(child_id, character_id)) {
            Some(mut context) => {
                context.message_count = context.messages.len();
                if context.greeting.is_empty() {
                    context.greeting = characters::greeting_for(character_id).to_string();
                }
                tracing::debug!(
                    "Loaded {} cached messages for child {} with {}",
                    context.message_count,
                    child_id,
                    character_id
                );
                context
            }
            None => SessionContext::new(child_id, character_id),
        }
    }

    /// Overwrite the stored conversation and update the session index
    ///
    /// A summary already in the store is kept over the one in `context`.
    /// Also mirrors the conversation to the service in the background;
    /// failures there are logged and dropped.
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Storage` if the local write fails
    pub fn save(&self, context: &SessionContext) -> Result<()> {
        self.persist(context).map(|_| ())
    }

    /// Append one exchange, save, and refresh the summary when due
    ///
    /// The stored summary replaces the in-memory one, since summaries only
    /// arrive through [`SessionCache::apply_summary`].
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Storage` if the local write fails
    pub fn record_turn(
        &self,
        context: &mut SessionContext,
        user: ChatMessage,
        reply: ChatMessage,
    ) -> Result<RecordedTurn> {
        context.messages.push(user);
        context.messages.push(reply);
        context.message_count = context.messages.len();
        context.updated_at = Utc::now();
        context.summary = self.persist(context)?;

        let turn = context.turns();
        let summary_requested =
            self.settings.summary_interval > 0 && turn % self.settings.summary_interval == 0;
        if summary_requested {
            self.spawn_summary(context);
        }

        increment_counter!("chat_turns_total", "character" => context.character_id.clone());
        Ok(RecordedTurn {
            turn,
            summary_requested,
        })
    }

    /// Merge a summary into the stored conversation, leaving messages alone
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Storage` if the local write fails
    pub fn apply_summary(&self, child_id: i64, character_id: &str, summary: &str) -> Result<()> {
        merge_summary(&self.store, child_id, character_id, summary)
    }

    /// Most-recent-first index of a child's conversations
    pub fn session_index(&self, child_id: i64) -> Vec<SessionIndexEntry> {
        self.store.read_or_default(&keys::session_index(child_id))
    }

    /// Every cached conversation of a child, in character order
    pub fn cached_contexts(&self, child_id: i64) -> Vec<SessionContext> {
        self.store
            .keys_with_prefix(&keys::chat_prefix(child_id))
            .iter()
            .filter_map(|key| self.store.read::<SessionContext>(key))
            .collect()
    }

    /// Fold a user turn into the session's evaluation metrics
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Storage` if the local write fails
    pub fn record_metrics(
        &self,
        session_id: &SessionId,
        user_text: &str,
        previous_reply: Option<&ChatMessage>,
        feeling: Option<Feeling>,
    ) -> Result<EvaluationMetrics> {
        let key = keys::metrics(session_id);
        let mut metrics: EvaluationMetrics = self.store.read_or_default(&key);
        metrics.observe_turn(user_text, previous_reply, feeling, Utc::now());
        self.store.write(&key, &metrics)?;
        Ok(metrics)
    }

    /// Evaluation metrics of a session
    pub fn metrics(&self, session_id: &SessionId) -> EvaluationMetrics {
        self.store.read_or_default(&keys::metrics(session_id))
    }

    /// Display preferences of a child
    pub fn preferences(&self, child_id: i64) -> Preferences {
        self.store.read_or_default(&keys::preferences(child_id))
    }

    /// Replace the display preferences of a child
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::Storage` if the local write fails
    pub fn set_preferences(&self, child_id: i64, preferences: &Preferences) -> Result<()> {
        self.store.write(&keys::preferences(child_id), preferences)
    }

    /// Wait for every background sync and summary task to finish
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Write `context` in one step with the stored summary, index and sync it
    ///
    /// Returns the summary that ended up in the store.
    fn persist(&self, context: &SessionContext) -> Result<String> {
        let key = keys::chat(context.child_id, &context.character_id);
        let stored = self
            .store
            .update(&key, |stored: Option<SessionContext>| {
                let mut next = context.clone();
                if let Some(stored) = stored.filter(|s| !s.summary.is_empty()) {
                    next.summary = stored.summary;
                }
                Some(next)
            })?
            .unwrap_or_else(|| context.clone());

        self.update_index(&stored)?;
        let summary = stored.summary.clone();
        self.spawn_sync(stored);
        Ok(summary)
    }

    fn update_index(&self, context: &SessionContext) -> Result<()> {
        let entry = SessionIndexEntry::from(context);
        let cap = self.settings.index_cap;
        let key = keys::session_index(context.child_id);
        self.store
            .update(&key, |index: Option<Vec<SessionIndexEntry>>| {
                let mut index = index.unwrap_or_default();
                index.retain(|e| e.character_id != entry.character_id);
                index.insert(0, entry.clone());
                index.truncate(cap);
                Some(index)
            })?;
        Ok(())
    }

    fn spawn_sync(&self, context: SessionContext) {
        let Ok(handle) = Handle::try_current() else {
            tracing::debug!("No runtime available; skipping chat sync");
            return;
        };

        let service = Arc::clone(&self.service);
        self.tasks.spawn_on(
            async move {
                if let Err(e) = service.sync_chat(&context).await {
                    increment_counter!("chat_sync_failures_total");
                    tracing::warn!(
                        "Chat sync failed for child {} with {}: {:#}",
                        context.child_id,
                        context.character_id,
                        e
                    );
                }
            },
            &handle,
        );
    }

    fn spawn_summary(&self, context: &SessionContext) {
        let Ok(handle) = Handle::try_current() else {
            tracing::debug!("No runtime available; skipping summary refresh");
            return;
        };

        let request = SummaryRequest {
            child_id: context.child_id,
            session_id: context.session_id.clone(),
            messages: context
                .recent_messages(self.settings.summary_window)
                .to_vec(),
            character: context.character_id.clone(),
            evaluation: Some(self.metrics(&context.metrics_key())),
        };

        increment_counter!("summary_requests_total");
        tracing::info!(
            "Requesting context summary for child {} with {} at turn {}",
            context.child_id,
            context.character_id,
            context.turns()
        );

        let service = Arc::clone(&self.service);
        let store = self.store.clone();
        self.tasks.spawn_on(
            async move {
                match service.generate_summary(&request).await {
                    Ok(summary) => {
                        if let Err(e) =
                            merge_summary(&store, request.child_id, &request.character, &summary)
                        {
                            tracing::warn!("Failed to store context summary: {:#}", e);
                        }
                    }
                    Err(e) => tracing::warn!("Context summary request failed: {:#}", e),
                }
            },
            &handle,
        );
    }
}

fn merge_summary(
    store: &LocalStore,
    child_id: i64,
    character_id: &str,
    summary: &str,
) -> Result<()> {
    store.update(&keys::chat(child_id, character_id), |stored: Option<SessionContext>| {
        let mut context = stored.unwrap_or_else(|| SessionContext::new(child_id, character_id));
        context.summary = summary.to_string();
        Some(context)
    })?;
    tracing::debug!("Stored context summary for child {} with {}", child_id, character_id);
    Ok(())
}
