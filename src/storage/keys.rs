//! Key layout of the local store

use crate::client::SessionId;

/// Cached conversation for one child and character
pub fn chat(child_id: i64, character_id: &str) -> String {
    format!("chat:{}:{}", child_id, character_id)
}

/// Prefix of every cached conversation of a child
pub fn chat_prefix(child_id: i64) -> String {
    format!("chat:{}:", child_id)
}

/// Most-recent-first session index of a child
pub fn session_index(child_id: i64) -> String {
    format!("sessions:{}", child_id)
}

/// Evaluation metrics of a session
pub fn metrics(session_id: &SessionId) -> String {
    format!("metrics:{}", session_id)
}

/// Crisis alert log of a child
pub fn crisis(child_id: i64) -> String {
    format!("crisis:{}", child_id)
}

/// Display preferences of a child
pub fn preferences(child_id: i64) -> String {
    format!("prefs:{}", child_id)
}
