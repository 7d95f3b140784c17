//! Runtime events emitted by the controller and the cycle runner.
//!
//! [`EventKind`] classifies events across three categories:
//! - **Sequence events**: start, completion, stop of a whole run
//! - **Cycle events**: per-cycle timer lifecycle (started, fired, settled)
//! - **Subscriber events**: fan-out health (overflow, panic)
//!
//! The [`Event`] struct carries metadata such as timestamps, the step name,
//! the target, the cursor position, and failure reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```
//! use batchpilot::{Event, EventKind, StepKind};
//!
//! let ev = Event::new(EventKind::StepFired)
//!     .with_step(StepKind::Send)
//!     .with_target("15550102345");
//!
//! assert_eq!(ev.kind, EventKind::StepFired);
//! assert_eq!(ev.step, Some(StepKind::Send));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::steps::StepKind;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Sequence events ===
    /// A sequence transitioned to Running.
    ///
    /// Sets:
    /// - `position`/`total`: starting cursor and batch size
    SequenceStarted,

    /// The cursor reached the end of the batch; sequence Completed.
    ///
    /// Sets:
    /// - `total`: batch size
    SequenceCompleted,

    /// The sequence stopped before completion (explicit stop or fail-fast).
    ///
    /// Sets:
    /// - `position`/`total`: cursor at the moment of stopping
    /// - `reason`: failure message for fail-fast stops
    SequenceStopped,

    // === Cycle events ===
    /// A cycle's timers were armed for the current target.
    ///
    /// Sets:
    /// - `target`: current target identifier
    /// - `position`/`total`: cursor and batch size
    CycleStarted,

    /// A disabled step was skipped when the cycle was armed.
    ///
    /// Sets:
    /// - `step`: the skipped step
    StepSkipped,

    /// A step's countdown expired and its callback was invoked.
    ///
    /// Sets:
    /// - `step`: the fired step
    /// - `delay_ms`: the configured countdown
    StepFired,

    /// A remote action call failed (the sequence will fail-fast stop).
    ///
    /// Sets:
    /// - `step`: the failing step
    /// - `reason`: dispatcher failure message
    ActionFailed,

    /// All timers of the cycle expired or were skipped.
    CycleSettled,

    /// The cursor moved forward by one.
    ///
    /// Sets:
    /// - `position`/`total`: new cursor and batch size
    /// - `target`: the newly current target, if any
    CursorAdvanced,

    // === Subscriber events ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: subscriber name and drop cause
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: panic info/message
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Step the event refers to, if applicable.
    pub step: Option<StepKind>,
    /// Target identifier, if applicable.
    pub target: Option<Arc<str>>,
    /// Cursor position (0-based), if applicable.
    pub position: Option<usize>,
    /// Batch size, if applicable.
    pub total: Option<usize>,
    /// Configured countdown in milliseconds (compact).
    pub delay_ms: Option<u64>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            step: None,
            target: None,
            position: None,
            total: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a step name.
    #[inline]
    pub fn with_step(mut self, step: StepKind) -> Self {
        self.step = Some(step);
        self
    }

    /// Attaches a target identifier.
    #[inline]
    pub fn with_target(mut self, target: impl Into<Arc<str>>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Attaches cursor position and batch size.
    #[inline]
    pub fn with_progress(mut self, position: usize, total: usize) -> Self {
        self.position = Some(position);
        self.total = Some(total);
        self
    }

    /// Attaches a countdown duration (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, cause: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} cause={cause}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }

    /// True for fan-out health events, which must never be re-reported on
    /// drop (that would amplify an already overloaded subscriber).
    #[inline]
    pub fn is_fanout_health(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::CycleStarted);
        let b = Event::new(EventKind::CycleSettled);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::new(EventKind::ActionFailed)
            .with_step(StepKind::Close)
            .with_delay(Duration::from_millis(250))
            .with_reason("boom");
        assert_eq!(ev.step, Some(StepKind::Close));
        assert_eq!(ev.delay_ms, Some(250));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
        assert!(!ev.is_fanout_health());
        assert!(Event::subscriber_overflow("log", "full").is_fanout_health());
    }
}
