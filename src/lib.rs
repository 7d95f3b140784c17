//! # batchpilot
//!
//! **batchpilot** is a semi-automated batch-messaging sequencer: for each
//! target in a list it opens a chat link and, optionally, dispatches a
//! sequence of timed side-effecting actions (paste, send, close) to an
//! external input-injection service, so a human does not have to click
//! through each one.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!    TargetList + StepSet + message
//!               │
//!               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  SequenceController (state machine: Idle/Running/Completed) │
//! │  - SequencerContext (cursor + cancellation token)           │
//! │  - Bus (broadcast events) ──► SubscriberSet ──► ProgressLog │
//! └───────┬─────────────────────────────────────────────────────┘
//!         │ one cycle per target
//!         ▼
//! ┌──────────────────────────────┐    on expiry, exactly once
//! │  CycleRunner                 │ ───────────────┬─────────────┐
//! │  - 100 ms tick, 4 countdown  │                ▼             ▼
//! │    timers (advance/paste/    │        Dispatch::execute  OpenLink::open
//! │    send/close)               │        (HTTP → action     (chat link in
//! │  - settle + 1 s post-settle  │         service)           browser)
//! └──────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! run(message)
//!   ├─► validate: batch non-empty, not already running
//!   ├─► Dispatch::probe()  (GET /health; Unreachable aborts the start)
//!   └─► loop {
//!         ├─► snapshot StepSet (mid-cycle edits never affect this cycle)
//!         ├─► CycleRunner: tick all enabled timers concurrently
//!         │     ├─ advance fires ─► cursor += 1, open next chat
//!         │     └─ paste/send/close fire ─► POST /automation/<action>
//!         ├─► settle + post-settle delay
//!         ├─► fallback advance when the snapshot had advance disabled
//!         └─► cursor == len ─► Completed, exit
//!       }
//!
//! exit conditions:
//!   - batch exhausted               ─► state Completed
//!   - stop() / token cancelled      ─► state Idle, cursor kept (resumable)
//!   - ActionError (fail-fast)       ─► state Idle, cursor kept, Err surfaced
//! ```
//!
//! ## Features
//! | Area            | Description                                             | Key types / traits                    |
//! |-----------------|---------------------------------------------------------|---------------------------------------|
//! | **Sequencing**  | Concurrent per-step countdowns, settle detection.       | [`CycleRunner`], [`StepSet`]          |
//! | **Control**     | State machine, advance invariant, stop/resume.          | [`SequenceController`]                |
//! | **Dispatch**    | Remote input-injection calls with connectivity probing. | [`Dispatch`], [`HttpDispatcher`]      |
//! | **Links**       | Chat-open URIs with escaped pre-filled messages.        | [`OpenLink`], [`ChatLinkOpener`]      |
//! | **Targets**     | Normalization and the batch cursor.                     | [`Target`], [`TargetList`]            |
//! | **Observability** | Event bus with per-subscriber fan-out queues.         | [`Bus`], [`Subscribe`], [`ProgressLog`] |
//! | **Errors**      | Typed validation/connectivity/action failures.          | [`SequenceError`], [`ActionError`]    |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use batchpilot::{
//!     ChatLinkOpener, HttpDispatcher, ProgressLog, SequenceController,
//!     SequencerConfig, StepKind, StepSet, Subscribe, TargetList,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = SequencerConfig::default();
//!     let dispatcher = Arc::new(HttpDispatcher::new(&cfg));
//!     let opener = Arc::new(ChatLinkOpener::new(cfg.chat_link_base.clone()));
//!
//!     let controller = SequenceController::new(
//!         cfg,
//!         dispatcher,
//!         opener,
//!         vec![Arc::new(ProgressLog) as Arc<dyn Subscribe>],
//!     );
//!
//!     controller.load_targets(TargetList::parse("555 010 2345\n555 010 6789", "1"))?;
//!     controller.configure_steps(
//!         StepSet::default()
//!             .enable(StepKind::Paste, Duration::from_secs(2))
//!             .enable(StepKind::Send, Duration::from_secs(4))
//!             .enable(StepKind::Close, Duration::from_secs(6)),
//!     );
//!
//!     controller.run("Hi, here's the info you requested.").await?;
//!     Ok(())
//! }
//! ```

mod config;
mod controller;
mod cycle;
mod dispatch;
mod error;
mod events;
mod link;
mod steps;
mod subscribers;
mod targets;

// ---- Public re-exports ----

pub use config::SequencerConfig;
pub use controller::{SequenceController, SequenceState, SequencerContext};
pub use cycle::{CycleOutcome, CycleRunner, StepHandler, TimerState};
pub use dispatch::{Dispatch, HttpDispatcher, ServiceStatus};
pub use error::{ActionError, SequenceError};
pub use events::{Bus, Event, EventKind};
pub use link::{chat_link, ChatLinkOpener, OpenLink};
pub use steps::{StepConfig, StepKind, StepSet};
pub use subscribers::{ProgressLog, Subscribe, SubscriberSet};
pub use targets::{Target, TargetList};
