//! Crisis keyword filter
//!
//! Every message a child sends is scanned for distress phrases before it
//! leaves the device. A match short-circuits the chat: the child sees a fixed
//! supportive message and an alert is kept locally for parent review.
//!
//! Matching is a case-insensitive substring test and errs toward flagging.

use crate::storage::{keys, LocalStore};
use chrono::{DateTime, Utc};
use metrics::increment_counter;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Shown instead of a reply when a message is flagged
pub const SUPPORTIVE_MESSAGE: &str = "It sounds like you are going through something really hard. \
You are not alone. Please talk to a trusted grown-up right now, like a parent or teacher. \
If you are in danger, call your local emergency number.";

/// Distress phrases in English, Tamil and Marathi/Hindi
const CRISIS_KEYWORDS: &[&str] = &[
    // English
    "kill myself",
    "want to die",
    "wanna die",
    "suicide",
    "hurt myself",
    "end my life",
    "self harm",
    "self-harm",
    "no reason to live",
    "cut myself",
    "better off dead",
    // Tamil
    "தற்கொலை",
    "சாக வேண்டும்",
    "சாகணும்",
    "என்னை காயப்படுத்த",
    // Marathi / Hindi
    "आत्महत्या",
    "मरना चाहता",
    "मरना चाहती",
    "मरायचं आहे",
    "जीव द्यायचा",
];

/// A flagged message kept for parent review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrisisAlert {
    /// Sortable unique id
    pub id: Ulid,
    /// The message as typed
    pub message: String,
    /// When it was flagged
    pub timestamp: DateTime<Utc>,
    /// Child who sent it
    pub child_id: i64,
    /// Character it was sent to
    pub character_id: String,
}

/// Whether `text` contains a distress phrase
///
/// # Examples
///
/// ```
/// use neuronarrative::safety::contains_crisis_language;
///
/// assert!(contains_crisis_language("Sometimes I want to DIE"));
/// assert!(!contains_crisis_language("I died laughing at the crab"));
/// ```
pub fn contains_crisis_language(text: &str) -> bool {
    let lower = text.to_lowercase();
    CRISIS_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Scans outgoing messages and logs matches
#[derive(Clone)]
pub struct CrisisFilter {
    store: LocalStore,
}

impl CrisisFilter {
    /// Create a filter that records alerts in `store`
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Scan a message; on a match record an alert and return true
    ///
    /// A failure to record the alert is logged and does not change the
    /// verdict.
    pub fn scan(&self, text: &str, child_id: i64, character_id: &str) -> bool {
        if !contains_crisis_language(text) {
            return false;
        }

        increment_counter!("crisis_matches_total");
        tracing::warn!(
            "Crisis language detected for child {} talking to {}",
            child_id,
            character_id
        );

        let alert = CrisisAlert {
            id: Ulid::new(),
            message: text.to_string(),
            timestamp: Utc::now(),
            child_id,
            character_id: character_id.to_string(),
        };

        let recorded = self
            .store
            .update(&keys::crisis(child_id), |alerts: Option<Vec<CrisisAlert>>| {
                let mut alerts = alerts.unwrap_or_default();
                alerts.push(alert.clone());
                Some(alerts)
            });
        if let Err(e) = recorded {
            tracing::error!("Failed to record crisis alert: {:#}", e);
        }
        true
    }

    /// Recorded alerts of a child, oldest first
    pub fn alerts(&self, child_id: i64) -> Vec<CrisisAlert> {
        self.store.read_or_default(&keys::crisis(child_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_every_keyword_in_any_case() {
        for keyword in CRISIS_KEYWORDS {
            let text = format!("sometimes {} okay", keyword.to_uppercase());
            assert!(contains_crisis_language(&text), "missed {}", keyword);
        }
    }

    #[test]
    fn test_matches_non_latin_scripts() {
        assert!(contains_crisis_language("எனக்கு தற்கொலை எண்ணம்"));
        assert!(contains_crisis_language("मुझे आत्महत्या करनी है"));
        assert!(contains_crisis_language("मला मरायचं आहे"));
    }

    #[test]
    fn test_ordinary_text_passes() {
        assert!(!contains_crisis_language("I feel happy today"));
        assert!(!contains_crisis_language("The dinosaurs died out long ago"));
    }

    #[test]
    fn test_scan_records_alert() {
        let filter = CrisisFilter::new(LocalStore::temporary().unwrap());
        assert!(filter.scan("I want to die", 5, "nandhini"));
        assert!(!filter.scan("hello", 5, "nandhini"));

        let alerts = filter.alerts(5);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].message, "I want to die");
        assert_eq!(alerts[0].character_id, "nandhini");
        assert!(filter.alerts(6).is_empty());
    }

    #[test]
    fn test_alerts_accumulate_in_order() {
        let filter = CrisisFilter::new(LocalStore::temporary().unwrap());
        filter.scan("suicide", 1, "rita");
        filter.scan("I want to hurt myself", 1, "naveen");
        let alerts = filter.alerts(1);
        assert_eq!(alerts.len(), 2);
        assert!(alerts[0].id < alerts[1].id || alerts[0].timestamp <= alerts[1].timestamp);
        assert_eq!(alerts[1].character_id, "naveen");
    }

    #[test]
    fn test_concurrent_scans_keep_every_alert() {
        let filter = CrisisFilter::new(LocalStore::temporary().unwrap());
        std::thread::scope(|scope| {
            for character in ["rita", "naveen", "nandhini"] {
                let filter = filter.clone();
                scope.spawn(move || {
                    for _ in 0..20 {
                        assert!(filter.scan("I want to die", 3, character));
                    }
                });
            }
        });
        assert_eq!(filter.alerts(3).len(), 60);
    }
}
