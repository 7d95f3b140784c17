//! Global sequencer configuration.
//!
//! [`SequencerConfig`] defines the runtime behavior: timer tick granularity,
//! post-settle delay between cycles, event bus capacity, and the endpoints
//! of the two external collaborators (action-execution service, chat-link
//! base).
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use batchpilot::SequencerConfig;
//!
//! let mut cfg = SequencerConfig::default();
//! cfg.tick = Duration::from_millis(100);
//! cfg.settle = Duration::from_secs(1);
//! cfg.service_url = "http://localhost:5000".into();
//!
//! assert_eq!(cfg.tick, Duration::from_millis(100));
//! ```

use std::time::Duration;

/// Global configuration for the sequencer runtime.
///
/// Controls timer granularity, inter-cycle settling, event bus sizing, and
/// collaborator endpoints.
#[derive(Clone, Debug)]
pub struct SequencerConfig {
    /// Tick period by which all active countdown timers are decremented.
    pub tick: Duration,
    /// Delay between a cycle's settlement and the start of the next cycle,
    /// covering in-flight callback side effects.
    pub settle: Duration,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
    /// Base URL of the action-execution service.
    pub service_url: String,
    /// Base URL used to build chat-open links.
    pub chat_link_base: String,
    /// Per-request timeout for calls against the action-execution service.
    pub request_timeout: Duration,
}

impl Default for SequencerConfig {
    /// Provides a default configuration:
    /// - `tick = 100ms`
    /// - `settle = 1s`
    /// - `bus_capacity = 1024`
    /// - `service_url = http://localhost:5000`
    /// - `chat_link_base = https://web.whatsapp.com/send`
    /// - `request_timeout = 5s`
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            settle: Duration::from_secs(1),
            bus_capacity: 1024,
            service_url: "http://localhost:5000".to_string(),
            chat_link_base: "https://web.whatsapp.com/send".to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl SequencerConfig {
    /// Returns the bus capacity clamped to a minimum of 1.
    pub(crate) fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}
