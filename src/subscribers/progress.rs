//! Simple progress-logging subscriber for debugging and demos.
//!
//! [`ProgressLog`] prints events to stdout in a human-readable format —
//! the batch UI's status line and progress bar reduced to their observable
//! core.
//!
//! ## Output format
//! ```text
//! [sequence-started] position=0 total=2
//! [cycle-started] target=15550102345 position=0 total=2
//! [step-skipped] step=advance
//! [step-fired] step=send delay_ms=300
//! [cursor-advanced] position=1 total=2
//! [action-failed] step=send reason="status 500"
//! [cycle-settled]
//! [sequence-completed] total=2
//! [sequence-stopped] position=1 total=2
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Stdout progress subscriber.
///
/// Useful for development and demos; implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
#[derive(Debug, Default)]
pub struct ProgressLog;

#[async_trait]
impl Subscribe for ProgressLog {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::SequenceStarted => {
                println!(
                    "[sequence-started] position={:?} total={:?}",
                    e.position, e.total
                );
            }
            EventKind::CycleStarted => {
                if let (Some(target), Some(pos), Some(total)) = (&e.target, e.position, e.total) {
                    println!("[cycle-started] target={target} position={pos} total={total}");
                }
            }
            EventKind::StepSkipped => {
                if let Some(step) = e.step {
                    println!("[step-skipped] step={step}");
                }
            }
            EventKind::StepFired => {
                if let Some(step) = e.step {
                    println!("[step-fired] step={step} delay_ms={:?}", e.delay_ms);
                }
            }
            EventKind::ActionFailed => {
                println!("[action-failed] step={:?} reason={:?}", e.step, e.reason);
            }
            EventKind::CycleSettled => {
                println!("[cycle-settled]");
            }
            EventKind::CursorAdvanced => {
                println!(
                    "[cursor-advanced] position={:?} total={:?}",
                    e.position, e.total
                );
            }
            EventKind::SequenceCompleted => {
                println!("[sequence-completed] total={:?}", e.total);
            }
            EventKind::SequenceStopped => {
                println!(
                    "[sequence-stopped] position={:?} total={:?} reason={:?}",
                    e.position, e.total, e.reason
                );
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] reason={:?}", e.reason);
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] reason={:?}", e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "progress-log"
    }
}
