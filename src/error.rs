//! Error types used by the sequencer and the action dispatcher.
//!
//! This module defines two main error enums:
//!
//! - [`SequenceError`] — errors raised by the sequencing runtime itself
//!   (start validation, connectivity, fail-fast action failures).
//! - [`ActionError`] — errors raised by individual remote action calls.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics.

use thiserror::Error;

/// # Errors produced by a remote action call.
///
/// Every variant carries the logical action name (`advance`, `paste`,
/// `send`, `close`) so the caller can report which step failed. The
/// dispatcher never retries; retry policy belongs to the caller.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ActionError {
    /// The action-execution service could not be reached.
    #[error("action '{action}' unreachable: {reason}")]
    Unreachable {
        /// Logical action name.
        action: &'static str,
        /// Underlying transport message.
        reason: String,
    },

    /// The service answered, but with a non-2xx status or an explicit
    /// failure payload.
    #[error("action '{action}' rejected: {reason}")]
    Rejected {
        /// Logical action name.
        action: &'static str,
        /// Status line or failure message from the payload.
        reason: String,
    },

    /// The action has no remote operation (only `paste`/`send`/`close`
    /// map to endpoints).
    #[error("action '{action}' is not dispatchable")]
    NotDispatchable {
        /// Logical action name.
        action: &'static str,
    },
}

impl ActionError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use batchpilot::ActionError;
    ///
    /// let err = ActionError::Rejected { action: "send", reason: "status 500".into() };
    /// assert_eq!(err.as_label(), "action_rejected");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ActionError::Unreachable { .. } => "action_unreachable",
            ActionError::Rejected { .. } => "action_rejected",
            ActionError::NotDispatchable { .. } => "action_not_dispatchable",
        }
    }

    /// Returns the logical action name this error belongs to.
    pub fn action(&self) -> &'static str {
        match self {
            ActionError::Unreachable { action, .. }
            | ActionError::Rejected { action, .. }
            | ActionError::NotDispatchable { action } => action,
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ActionError::Unreachable { action, reason } => {
                format!("action={action} unreachable: {reason}")
            }
            ActionError::Rejected { action, reason } => {
                format!("action={action} rejected: {reason}")
            }
            ActionError::NotDispatchable { action } => {
                format!("action={action} has no remote operation")
            }
        }
    }
}

/// # Errors produced by the sequencing runtime.
///
/// `EmptyTargets` and `AlreadyRunning` are start-validation failures;
/// `Unreachable` is a start-time connectivity failure. All three abort the
/// start attempt without mutating sequence state. `Action` is a fail-fast
/// failure during a running cycle: the sequence stops and the cursor stays
/// where it was, so the run is resumable.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SequenceError {
    /// Start requested with an empty target list.
    #[error("target list is empty")]
    EmptyTargets,

    /// Start requested while a sequence is already running.
    #[error("a sequence is already running")]
    AlreadyRunning,

    /// Action-execution service unreachable at sequence start.
    #[error("action service unreachable at {url}: {reason}")]
    Unreachable {
        /// Base URL that was probed.
        url: String,
        /// Underlying probe failure.
        reason: String,
    },

    /// A dispatched action failed mid-sequence (fail-fast stop).
    #[error(transparent)]
    Action(#[from] ActionError),
}

impl SequenceError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use batchpilot::SequenceError;
    ///
    /// assert_eq!(SequenceError::EmptyTargets.as_label(), "sequence_empty_targets");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SequenceError::EmptyTargets => "sequence_empty_targets",
            SequenceError::AlreadyRunning => "sequence_already_running",
            SequenceError::Unreachable { .. } => "sequence_unreachable",
            SequenceError::Action(_) => "sequence_action_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SequenceError::EmptyTargets => "target list is empty".to_string(),
            SequenceError::AlreadyRunning => "a sequence is already running".to_string(),
            SequenceError::Unreachable { url, reason } => {
                format!("service at {url} unreachable: {reason}")
            }
            SequenceError::Action(e) => e.as_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_error_keeps_action_name() {
        let err = ActionError::Unreachable {
            action: "paste",
            reason: "connection refused".into(),
        };
        assert_eq!(err.action(), "paste");
        assert!(err.as_message().contains("connection refused"));
    }

    #[test]
    fn test_action_error_converts_into_sequence_error() {
        let err: SequenceError = ActionError::Rejected {
            action: "send",
            reason: "status 500".into(),
        }
        .into();
        assert_eq!(err.as_label(), "sequence_action_failed");
    }
}
