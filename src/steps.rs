//! Step configuration: the four timed actions of one cycle.
//!
//! A cycle runs up to four independently configured countdown timers:
//! [`StepKind::Advance`] (move to the next target and open its chat),
//! [`StepKind::Paste`], [`StepKind::Send`], and [`StepKind::Close`]
//! (remote input-injection actions). Each step has an enabled flag and a
//! non-negative delay.
//!
//! [`StepSet`] is read **once** at the start of each cycle; reconfiguring
//! steps mid-cycle never affects the running cycle.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use batchpilot::{StepKind, StepSet};
//!
//! let steps = StepSet::default()
//!     .enable(StepKind::Paste, Duration::from_millis(500))
//!     .enable(StepKind::Send, Duration::from_millis(300));
//!
//! assert!(steps.get(StepKind::Paste).enabled);
//! assert!(!steps.get(StepKind::Close).enabled);
//! ```

use std::fmt;
use std::time::Duration;

/// The four fixed step names of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Move the cursor forward and open the chat link for the new target.
    Advance,
    /// Remote paste action (clipboard content into the chat input).
    Paste,
    /// Remote send action (dispatch the message).
    Send,
    /// Remote close action (close the chat tab).
    Close,
}

impl StepKind {
    /// All steps, in the fixed iteration order used by the cycle runner.
    pub const ALL: [StepKind; 4] = [
        StepKind::Advance,
        StepKind::Paste,
        StepKind::Send,
        StepKind::Close,
    ];

    /// Returns the stable lowercase step name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Advance => "advance",
            StepKind::Paste => "paste",
            StepKind::Send => "send",
            StepKind::Close => "close",
        }
    }

    /// Whether this step translates into a remote input-injection call
    /// (everything but `Advance`).
    pub fn is_remote(&self) -> bool {
        !matches!(self, StepKind::Advance)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration of a single step: enabled flag plus countdown delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepConfig {
    /// Whether the step participates in the cycle at all.
    pub enabled: bool,
    /// Countdown before the step fires (non-negative).
    pub delay: Duration,
}

impl Default for StepConfig {
    /// Disabled, zero delay.
    fn default() -> Self {
        Self {
            enabled: false,
            delay: Duration::ZERO,
        }
    }
}

impl StepConfig {
    /// An enabled step with the given delay.
    pub fn enabled(delay: Duration) -> Self {
        Self {
            enabled: true,
            delay,
        }
    }
}

/// Per-cycle configuration of all four steps.
///
/// The cycle runner and the controller both work from a by-value snapshot
/// taken at cycle start, which is what makes the advance-exactly-once
/// invariant immune to mid-cycle reconfiguration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepSet {
    advance: StepConfig,
    paste: StepConfig,
    send: StepConfig,
    close: StepConfig,
}

impl StepSet {
    /// Returns the configuration of the given step.
    pub fn get(&self, kind: StepKind) -> StepConfig {
        match kind {
            StepKind::Advance => self.advance,
            StepKind::Paste => self.paste,
            StepKind::Send => self.send,
            StepKind::Close => self.close,
        }
    }

    /// Replaces the configuration of the given step.
    pub fn set(&mut self, kind: StepKind, config: StepConfig) {
        match kind {
            StepKind::Advance => self.advance = config,
            StepKind::Paste => self.paste = config,
            StepKind::Send => self.send = config,
            StepKind::Close => self.close = config,
        }
    }

    /// Builder-style shorthand for enabling a step with a delay.
    #[must_use]
    pub fn enable(mut self, kind: StepKind, delay: Duration) -> Self {
        self.set(kind, StepConfig::enabled(delay));
        self
    }

    /// Builder-style shorthand for disabling a step.
    #[must_use]
    pub fn disable(mut self, kind: StepKind) -> Self {
        self.set(kind, StepConfig::default());
        self
    }

    /// True when no step is enabled (the cycle settles immediately).
    pub fn all_disabled(&self) -> bool {
        StepKind::ALL.iter().all(|k| !self.get(*k).enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_is_all_disabled() {
        let steps = StepSet::default();
        assert!(steps.all_disabled());
        for kind in StepKind::ALL {
            assert!(!steps.get(kind).enabled);
            assert_eq!(steps.get(kind).delay, Duration::ZERO);
        }
    }

    #[test]
    fn test_enable_disable_round_trip() {
        let steps = StepSet::default()
            .enable(StepKind::Send, Duration::from_millis(300))
            .enable(StepKind::Close, Duration::from_secs(1))
            .disable(StepKind::Close);

        assert!(steps.get(StepKind::Send).enabled);
        assert_eq!(steps.get(StepKind::Send).delay, Duration::from_millis(300));
        assert!(!steps.get(StepKind::Close).enabled);
        assert!(!steps.all_disabled());
    }

    #[test]
    fn test_step_names_are_stable() {
        let names: Vec<&str> = StepKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["advance", "paste", "send", "close"]);
        assert!(!StepKind::Advance.is_remote());
        assert!(StepKind::Paste.is_remote());
    }
}
