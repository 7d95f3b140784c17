//! Non-blocking event fan-out to multiple subscribers.
//!
//! [`SubscriberSet`] distributes events to multiple subscribers
//! concurrently without blocking the publisher.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     │    (bounded)
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//!          (bounded)
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N
//!   while B processes N+5
//! - **Per-subscriber FIFO**: each subscriber sees events in order
//! - **Overflow**: event dropped for that subscriber only, reported as a
//!   `SubscriberOverflow` event (never for fan-out health events
//!   themselves, which would amplify the overload)
//! - **Isolation**: a slow or panicking subscriber does not affect others

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
///
/// Manages per-subscriber bounded queues and worker tasks. Workers run
/// until their queue closes, which happens when the set is dropped.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Each subscriber gets a bounded mpsc queue (capacity from
    /// [`Subscribe::queue_capacity`], minimum 1) and a dedicated worker
    /// with panic isolation via `catch_unwind`.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let bus_for_worker = bus.clone();

            // Detached worker; it exits once the sender side drops.
            tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let info = {
                            let any = &*panic_err;
                            if let Some(msg) = any.downcast_ref::<&'static str>() {
                                (*msg).to_string()
                            } else if let Some(msg) = any.downcast_ref::<String>() {
                                msg.clone()
                            } else {
                                "unknown panic".to_string()
                            }
                        };
                        bus_for_worker.publish(Event::subscriber_panicked(sub.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
        }
        Self { channels, bus }
    }

    /// Emits an event to all subscribers without blocking.
    ///
    /// The event is wrapped in an `Arc` and `try_send`-delivered to every
    /// queue. A full or closed queue drops the event for that subscriber
    /// and publishes a `SubscriberOverflow` report, except when the dropped
    /// event is itself a fan-out health report.
    pub fn emit(&self, ev: &Event) {
        let shared = Arc::new(ev.clone());
        for ch in &self.channels {
            if let Err(err) = ch.sender.try_send(Arc::clone(&shared)) {
                if shared.is_fanout_health() {
                    continue;
                }
                let cause = match err {
                    mpsc::error::TrySendError::Full(_) => "full",
                    mpsc::error::TrySendError::Closed(_) => "closed",
                };
                self.bus.publish(Event::subscriber_overflow(ch.name, cause));
            }
        }
    }

    /// Number of subscribers in the set.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True when the set holds no subscribers.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
