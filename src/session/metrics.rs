//! Running evaluation metrics for a conversation
//!
//! Metrics are updated once per user turn and sent along with summary
//! requests. They are never read back into the live chat.
//!
//! Per-turn scores, all in `0.0..=1.0`:
//!
//! - clarity: share of whitespace tokens that are real words
//! - engagement: message length, saturating at 20 words
//! - reciprocity: 1 when the child answers a question or picks up a word
//!   from the previous reply, else 0
//! - topic overlap: word-set Jaccard similarity with the previous reply
//!
//! Clarity, engagement and reciprocity are kept as running sums; overlap,
//! sentence complexity (words per sentence) and vocabulary diversity (unique
//! over total words) as running averages.

use super::types::ChatMessage;
use crate::emotion::Feeling;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

const ENGAGEMENT_SATURATION_WORDS: f64 = 20.0;
const INITIATION_WORDS: &[&str] = &["what", "why", "how", "where", "when", "can", "do", "is"];

/// A feeling the child selected, with when it was sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionObservation {
    /// Selected feeling
    pub emotion: Feeling,
    /// When the message carrying it was sent
    pub observed_at: DateTime<Utc>,
}

/// Running communication scores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicationScores {
    pub clarity: f64,
    pub engagement: f64,
    pub reciprocity: f64,
}

/// Turn-taking statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialMetrics {
    /// User turns observed
    pub turn_count: u32,
    /// Time from the previous reply to each user message
    pub response_latency_ms: Vec<u64>,
    /// Running average of topic overlap with the previous reply
    pub topic_overlap_avg: f64,
    /// Turns that open with a question word or end with `!`
    pub initiations: u32,
}

/// Language maturity indicators
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaturityIndicators {
    pub sentence_complexity_avg: f64,
    pub vocabulary_diversity_avg: f64,
}

/// Evaluation metrics of one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationMetrics {
    pub emotions: Vec<EmotionObservation>,
    pub communication: CommunicationScores,
    pub social: SocialMetrics,
    pub maturity: MaturityIndicators,
}

impl EvaluationMetrics {
    /// Fold one user message into the metrics
    ///
    /// `previous_reply` is what the child was answering: the last reply of
    /// the character, or the greeting on the first turn.
    ///
    /// # Examples
    ///
    /// ```
    /// use neuronarrative::session::EvaluationMetrics;
    /// use chrono::Utc;
    ///
    /// let mut metrics = EvaluationMetrics::default();
    /// metrics.observe_turn("Why is the sea blue?", None, None, Utc::now());
    /// assert_eq!(metrics.social.turn_count, 1);
    /// assert_eq!(metrics.social.initiations, 1);
    /// ```
    pub fn observe_turn(
        &mut self,
        user_text: &str,
        previous_reply: Option<&ChatMessage>,
        feeling: Option<Feeling>,
        now: DateTime<Utc>,
    ) {
        let words = tokenize(user_text);
        let token_count = user_text.split_whitespace().count();

        self.social.turn_count += 1;
        let n = f64::from(self.social.turn_count);

        if let Some(emotion) = feeling {
            self.emotions.push(EmotionObservation {
                emotion,
                observed_at: now,
            });
        }

        let clarity = if token_count == 0 {
            0.0
        } else {
            (words.len() as f64 / token_count as f64).min(1.0)
        };
        let engagement = (words.len() as f64 / ENGAGEMENT_SATURATION_WORDS).min(1.0);

        let overlap = previous_reply
            .map(|reply| jaccard(&words, &tokenize(&reply.text)))
            .unwrap_or(0.0);
        let answered_question = previous_reply
            .map(|reply| reply.text.trim_end().ends_with('?'))
            .unwrap_or(false);
        let reciprocity = if !words.is_empty() && (answered_question || overlap > 0.0) {
            1.0
        } else {
            0.0
        };

        self.communication.clarity += clarity;
        self.communication.engagement += engagement;
        self.communication.reciprocity += reciprocity;

        if let Some(reply) = previous_reply {
            let latency = (now - reply.timestamp).num_milliseconds().max(0);
            self.social.response_latency_ms.push(latency as u64);
        }
        self.social.topic_overlap_avg = running_average(self.social.topic_overlap_avg, overlap, n);
        if is_initiation(user_text) {
            self.social.initiations += 1;
        }

        self.maturity.sentence_complexity_avg = running_average(
            self.maturity.sentence_complexity_avg,
            sentence_complexity(user_text, words.len()),
            n,
        );
        self.maturity.vocabulary_diversity_avg = running_average(
            self.maturity.vocabulary_diversity_avg,
            vocabulary_diversity(&words),
            n,
        );
    }
}

fn word_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\w+\b").ok()).as_ref()
}

/// Lowercased words of `text`
fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    match word_pattern() {
        Some(re) => re.find_iter(&lower).map(|m| m.as_str().to_string()).collect(),
        None => lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

fn jaccard(a: &[String], b: &[String]) -> f64 {
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

fn running_average(current: f64, sample: f64, n: f64) -> f64 {
    current + (sample - current) / n
}

fn is_initiation(text: &str) -> bool {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();
    INITIATION_WORDS.iter().any(|w| lower.starts_with(w)) || trimmed.ends_with('!')
}

fn sentence_complexity(text: &str, word_count: usize) -> f64 {
    let sentences = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1);
    word_count as f64 / sentences as f64
}

fn vocabulary_diversity(words: &[String]) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    let unique: HashSet<&String> = words.iter().collect();
    unique.len() as f64 / words.len() as f64
}
