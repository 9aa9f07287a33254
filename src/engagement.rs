//! Engagement ("anti-freeze") timer
//!
//! A single-shot, cancellable countdown that notices when a child has gone
//! quiet. Every bit of activity re-arms it. When the countdown completes the
//! timer sends [`EngagementEvent::Fired`] to its owner, which decides whether
//! to show the re-engagement prompt.
//!
//! Each arm gets a new generation number. The owner passes the event's
//! generation to [`EngagementTimer::acknowledge`], which only accepts the
//! latest one, so a single idle period never produces two prompts.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Message sent by the timer task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementEvent {
    /// The countdown armed with `generation` ran out
    Fired { generation: u64 },
}

/// Lifecycle of the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Nothing pending
    Idle,
    /// Counting down
    Armed,
    /// Ran out; waiting for the owner to react
    Fired,
}

#[derive(Debug)]
struct TimerInner {
    handle: Option<JoinHandle<()>>,
    generation: u64,
    state: TimerState,
    prompt_visible: bool,
    armed_at: Option<Instant>,
}

/// Single-shot idle countdown
#[derive(Debug)]
pub struct EngagementTimer {
    timeout: Duration,
    events: mpsc::UnboundedSender<EngagementEvent>,
    inner: Arc<Mutex<TimerInner>>,
}

impl EngagementTimer {
    /// Create an idle timer and the receiver for its events
    pub fn new(timeout: Duration) -> (Self, mpsc::UnboundedReceiver<EngagementEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let timer = Self {
            timeout,
            events,
            inner: Arc::new(Mutex::new(TimerInner {
                handle: None,
                generation: 0,
                state: TimerState::Idle,
                prompt_visible: false,
                armed_at: None,
            })),
        };
        (timer, rx)
    }

    /// Countdown length
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cancel any pending countdown and start a fresh one
    ///
    /// Returns whether a visible prompt was dismissed, so the caller can hide
    /// it.
    pub fn arm(&self) -> bool {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("Engagement timer armed outside a runtime; ignoring");
            return false;
        };

        let mut inner = lock(&self.inner);
        if let Some(pending) = inner.handle.take() {
            pending.abort();
        }
        inner.generation += 1;
        let generation = inner.generation;
        let was_visible = std::mem::take(&mut inner.prompt_visible);

        let timeout = self.timeout;
        let events = self.events.clone();
        let shared = Arc::clone(&self.inner);
        inner.handle = Some(handle.spawn(async move {
            tokio::time::sleep(timeout).await;
            {
                let mut inner = lock(&shared);
                if inner.generation != generation {
                    return;
                }
                inner.state = TimerState::Fired;
                inner.handle = None;
            }
            tracing::debug!("Engagement timer fired (generation {})", generation);
            let _ = events.send(EngagementEvent::Fired { generation });
        }));
        inner.state = TimerState::Armed;
        inner.armed_at = Some(Instant::now());

        tracing::trace!("Engagement timer armed (generation {})", generation);
        was_visible
    }

    /// Cancel any pending countdown and dismiss the prompt
    ///
    /// Returns whether a visible prompt was dismissed.
    pub fn disarm(&self) -> bool {
        let mut inner = lock(&self.inner);
        if let Some(pending) = inner.handle.take() {
            pending.abort();
        }
        // Invalidates events already in flight.
        inner.generation += 1;
        inner.state = TimerState::Idle;
        inner.armed_at = None;
        std::mem::take(&mut inner.prompt_visible)
    }

    /// Accept a fired event if it belongs to the latest arm
    ///
    /// Moves the timer back to idle. Returns false for stale events and for
    /// events already acknowledged.
    pub fn acknowledge(&self, generation: u64) -> bool {
        let mut inner = lock(&self.inner);
        if inner.generation != generation || inner.state != TimerState::Fired {
            tracing::debug!(
                "Ignoring stale engagement event (generation {}, latest {})",
                generation,
                inner.generation
            );
            return false;
        }
        inner.state = TimerState::Idle;
        inner.armed_at = None;
        true
    }

    /// Record that the re-engagement prompt is on screen
    pub fn mark_prompt_visible(&self) {
        lock(&self.inner).prompt_visible = true;
    }

    /// Whether the re-engagement prompt is on screen
    pub fn prompt_visible(&self) -> bool {
        lock(&self.inner).prompt_visible
    }

    /// Current lifecycle state
    pub fn state(&self) -> TimerState {
        lock(&self.inner).state
    }

    /// Generation of the latest arm
    pub fn generation(&self) -> u64 {
        lock(&self.inner).generation
    }

    /// When the pending countdown started
    pub fn armed_at(&self) -> Option<Instant> {
        lock(&self.inner).armed_at
    }
}

impl Drop for EngagementTimer {
    fn drop(&mut self) {
        if let Some(pending) = lock(&self.inner).handle.take() {
            pending.abort();
        }
    }
}

fn lock(inner: &Mutex<TimerInner>) -> MutexGuard<'_, TimerInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
