//! Sequence controller: the top-level state machine.
//!
//! [`SequenceController`] owns the target batch, the step configuration,
//! the event bus, and the dispatcher/link collaborators. `run()` drives
//! cycle after cycle until the batch is exhausted, a failure occurs, or
//! `stop()` cancels the run.
//!
//! ## State machine
//! ```text
//! Idle ──run()──► Running ──cursor == len──► Completed
//!                    │
//!                    ├─ stop()        ─► Stopping ─► Idle   (cursor kept)
//!                    └─ ActionError   ─► Idle              (cursor kept)
//! ```
//!
//! ## Cycle wiring
//! ```text
//! run()
//!   ├─► validate (empty batch? already running?)
//!   ├─► Dispatch::probe()                  (connectivity gate)
//!   └─► loop {
//!         snapshot StepSet
//!         CycleRunner::run(snapshot, hooks, token)
//!              advance ─► cursor += 1, OpenLink::open(new target)
//!              paste/send/close ─► Dispatch::execute
//!         on settle: fallback advance if the snapshot had Advance disabled
//!         cursor == len ─► Completed
//!       }
//! ```
//!
//! ## Advance invariant
//! The cursor moves forward **exactly once** per completed cycle. When the
//! `advance` step is enabled its own callback performs the move (and opens
//! the next chat); when disabled, the controller moves the cursor itself
//! immediately after the cycle-complete signal. Both paths read the same
//! step-set snapshot taken at cycle start, so mid-cycle reconfiguration
//! can never double- or zero-advance.

use std::sync::{Arc, Mutex, RwLock};

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::SequencerConfig;
use crate::cycle::{CycleOutcome, CycleRunner, StepHandler};
use crate::dispatch::Dispatch;
use crate::error::SequenceError;
use crate::events::{Bus, Event, EventKind};
use crate::link::OpenLink;
use crate::steps::{StepKind, StepSet};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::targets::{Target, TargetList};

/// Lifecycle state of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    /// No sequence running; cursor holds its last position.
    Idle,
    /// A sequence is driving cycles.
    Running,
    /// An in-flight cycle is being cancelled.
    Stopping,
    /// The cursor reached the end of the batch.
    Completed,
}

impl SequenceState {
    /// Returns a short stable label (snake_case) for logs/metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceState::Idle => "idle",
            SequenceState::Running => "running",
            SequenceState::Stopping => "stopping",
            SequenceState::Completed => "completed",
        }
    }
}

/// Shared mutable state of one controller: the batch with its cursor and
/// the cancellation token of the current run.
///
/// An explicit context object instead of module-level globals: mutation is
/// serialized through the cycle loop and the post-cycle handler, and tests
/// can observe it deterministically.
pub struct SequencerContext {
    targets: RwLock<TargetList>,
    token: Mutex<CancellationToken>,
}

impl SequencerContext {
    fn new(targets: TargetList) -> Self {
        Self {
            targets: RwLock::new(targets),
            token: Mutex::new(CancellationToken::new()),
        }
    }

    /// Current cursor position and batch size.
    pub fn progress(&self) -> (usize, usize) {
        let list = self.targets.read().expect("target list lock poisoned");
        (list.cursor(), list.len())
    }

    fn current_token(&self) -> CancellationToken {
        self.token.lock().expect("token lock poisoned").clone()
    }

    fn fresh_token(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.token.lock().expect("token lock poisoned") = token.clone();
        token
    }
}

/// Top-level sequencer: owns the batch, the step configuration, and the
/// collaborators, and drives [`CycleRunner`] cycle after cycle.
pub struct SequenceController {
    cfg: SequencerConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    dispatcher: Arc<dyn Dispatch>,
    opener: Arc<dyn OpenLink>,
    ctx: Arc<SequencerContext>,
    steps: RwLock<StepSet>,
    state: Mutex<SequenceState>,
}

impl SequenceController {
    /// Creates a controller with explicit collaborator seams.
    ///
    /// Spawns the bus listener that fans events out to `subscribers`; must
    /// be called within a tokio runtime.
    pub fn new(
        cfg: SequencerConfig,
        dispatcher: Arc<dyn Dispatch>,
        opener: Arc<dyn OpenLink>,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));
        let controller = Self {
            cfg,
            bus: bus.clone(),
            subs: Arc::clone(&subs),
            dispatcher,
            opener,
            ctx: Arc::new(SequencerContext::new(TargetList::default())),
            steps: RwLock::new(StepSet::default()),
            state: Mutex::new(SequenceState::Idle),
        };
        controller.spawn_bus_listener();
        controller
    }

    /// Subscribes to the bus and forwards events to the subscriber set
    /// (fire-and-forget).
    fn spawn_bus_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                set.emit(&ev);
            }
        });
    }

    /// The controller's event bus, for wiring extra receivers.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// The shared context (cursor observation, mainly for tests and UIs).
    pub fn context(&self) -> &Arc<SequencerContext> {
        &self.ctx
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SequenceState {
        *self.state.lock().expect("state lock poisoned")
    }

    fn set_state(&self, next: SequenceState) {
        *self.state.lock().expect("state lock poisoned") = next;
    }

    /// Replaces the batch. Refused while a sequence is running — list
    /// contents are immutable for the duration of a run.
    pub fn load_targets(&self, targets: TargetList) -> Result<(), SequenceError> {
        match self.state() {
            SequenceState::Running | SequenceState::Stopping => Err(SequenceError::AlreadyRunning),
            _ => {
                *self.ctx.targets.write().expect("target list lock poisoned") = targets;
                self.set_state(SequenceState::Idle);
                Ok(())
            }
        }
    }

    /// Replaces the step configuration. Takes effect at the next cycle
    /// start; the running cycle keeps its snapshot.
    pub fn configure_steps(&self, steps: StepSet) {
        *self.steps.write().expect("step set lock poisoned") = steps;
    }

    /// Runs the sequence from the current cursor until the batch is
    /// exhausted, an action fails, or [`stop`](Self::stop) is called.
    ///
    /// Validation failures (`EmptyTargets`, `AlreadyRunning`) and the
    /// connectivity gate (`Unreachable`) abort without touching sequence
    /// state. Returns `Ok(())` both on completion and on an explicit stop;
    /// inspect [`state`](Self::state) to distinguish.
    pub async fn run(&self, message: &str) -> Result<(), SequenceError> {
        // Claim the Running slot and mint the run token atomically with
        // validation, so a second concurrent start cannot slip past the
        // connectivity probe and a stop() landing during the probe cancels
        // *this* run's token, not a stale one.
        let (prev, position, total, token) = {
            let mut st = self.state.lock().expect("state lock poisoned");
            if matches!(*st, SequenceState::Running | SequenceState::Stopping) {
                return Err(SequenceError::AlreadyRunning);
            }
            let (position, total) = self.ctx.progress();
            if total == 0 {
                return Err(SequenceError::EmptyTargets);
            }
            let prev = *st;
            *st = SequenceState::Running;
            (prev, position, total, self.ctx.fresh_token())
        };

        if let Err(e) = self.dispatcher.probe().await {
            // Failed start attempt leaves sequence state untouched, unless
            // a stop already arrived during the probe.
            self.set_state(if token.is_cancelled() {
                SequenceState::Idle
            } else {
                prev
            });
            return Err(SequenceError::Unreachable {
                url: self.cfg.service_url.clone(),
                reason: e.as_message(),
            });
        }

        // A stop() issued while the probe was in flight must win before
        // any cycle starts.
        if token.is_cancelled() {
            self.set_state(SequenceState::Idle);
            self.bus.publish(
                Event::new(EventKind::SequenceStopped).with_progress(position, total),
            );
            return Ok(());
        }
        self.bus
            .publish(Event::new(EventKind::SequenceStarted).with_progress(position, total));

        let result = self.drive(message, &token).await;
        if let Err(e) = &result {
            let (position, total) = self.ctx.progress();
            self.set_state(SequenceState::Idle);
            self.bus.publish(
                Event::new(EventKind::SequenceStopped)
                    .with_progress(position, total)
                    .with_reason(e.as_message()),
            );
        }
        result
    }

    /// Cycle loop; returns only through completion, cancellation, or error.
    async fn drive(&self, message: &str, token: &CancellationToken) -> Result<(), SequenceError> {
        let runner = CycleRunner::new(&self.cfg, self.bus.clone());

        loop {
            let (position, total) = self.ctx.progress();
            let current = self
                .ctx
                .targets
                .read()
                .expect("target list lock poisoned")
                .current()
                .cloned();
            let Some(target) = current else {
                // Resuming an already-exhausted batch completes at once.
                self.finish_completed(total);
                return Ok(());
            };

            let snapshot = *self.steps.read().expect("step set lock poisoned");
            self.bus.publish(
                Event::new(EventKind::CycleStarted)
                    .with_target(target.as_str())
                    .with_progress(position, total),
            );

            let hooks: Arc<dyn StepHandler> = Arc::new(CycleHooks {
                ctx: Arc::clone(&self.ctx),
                dispatcher: Arc::clone(&self.dispatcher),
                opener: Arc::clone(&self.opener),
                bus: self.bus.clone(),
                message: message.to_string(),
                token: token.clone(),
            });

            match runner.run(&snapshot, hooks, token).await? {
                CycleOutcome::Cancelled => {
                    let (position, total) = self.ctx.progress();
                    self.set_state(SequenceState::Idle);
                    self.bus.publish(
                        Event::new(EventKind::SequenceStopped).with_progress(position, total),
                    );
                    return Ok(());
                }
                CycleOutcome::Settled => {
                    if !snapshot.get(StepKind::Advance).enabled {
                        // Fallback advance: the cycle had no advance step,
                        // so the controller moves the cursor itself (no
                        // chat-open here; that is the advance step's job).
                        let (position, total) = {
                            let mut list =
                                self.ctx.targets.write().expect("target list lock poisoned");
                            (list.advance(), list.len())
                        };
                        self.bus.publish(
                            Event::new(EventKind::CursorAdvanced).with_progress(position, total),
                        );
                    }
                    let (position, total) = self.ctx.progress();
                    if position >= total {
                        self.finish_completed(total);
                        return Ok(());
                    }
                }
            }
        }
    }

    fn finish_completed(&self, total: usize) {
        self.set_state(SequenceState::Completed);
        self.bus
            .publish(Event::new(EventKind::SequenceCompleted).with_progress(total, total));
    }

    /// Stops the running sequence: cancels the in-flight cycle, leaves the
    /// cursor where it is (resumable), transitions to Idle. Idempotent —
    /// safe to call when already Idle.
    pub fn stop(&self) {
        let mut st = self.state.lock().expect("state lock poisoned");
        match *st {
            SequenceState::Running => {
                *st = SequenceState::Stopping;
                drop(st);
                self.ctx.current_token().cancel();
            }
            SequenceState::Stopping => {
                drop(st);
                self.ctx.current_token().cancel();
            }
            SequenceState::Idle | SequenceState::Completed => {}
        }
    }

    // --- Manual batch controls (non-automated flow) ---

    /// Opens the chat for the target under the cursor without advancing.
    /// Refused mid-run, like the other manual controls.
    pub async fn open_current(&self, message: &str) -> Result<(), SequenceError> {
        if matches!(
            self.state(),
            SequenceState::Running | SequenceState::Stopping
        ) {
            return Err(SequenceError::AlreadyRunning);
        }
        let current = self
            .ctx
            .targets
            .read()
            .expect("target list lock poisoned")
            .current()
            .cloned();
        match current {
            Some(target) => self.open_target(&target, message).await,
            None => Err(SequenceError::EmptyTargets),
        }
    }

    /// Advances the cursor by one and opens the chat for the new current
    /// target. At the end of the batch the cursor saturates and the state
    /// becomes Completed.
    pub async fn open_next(&self, message: &str) -> Result<(), SequenceError> {
        if matches!(
            self.state(),
            SequenceState::Running | SequenceState::Stopping
        ) {
            return Err(SequenceError::AlreadyRunning);
        }
        let (next, position, total) = {
            let mut list = self.ctx.targets.write().expect("target list lock poisoned");
            list.advance();
            (list.current().cloned(), list.cursor(), list.len())
        };
        self.bus
            .publish(Event::new(EventKind::CursorAdvanced).with_progress(position, total));
        match next {
            Some(target) => self.open_target(&target, message).await,
            None => {
                self.finish_completed(total);
                Ok(())
            }
        }
    }

    /// Returns the cursor to the start of the batch. Refused mid-run.
    pub fn reset(&self) -> Result<(), SequenceError> {
        match self.state() {
            SequenceState::Running | SequenceState::Stopping => Err(SequenceError::AlreadyRunning),
            _ => {
                self.ctx
                    .targets
                    .write()
                    .expect("target list lock poisoned")
                    .reset();
                self.set_state(SequenceState::Idle);
                Ok(())
            }
        }
    }

    async fn open_target(&self, target: &Target, message: &str) -> Result<(), SequenceError> {
        self.opener
            .open(target, message)
            .await
            .map_err(SequenceError::Action)
    }
}

/// Per-cycle callback bindings handed to [`CycleRunner`].
///
/// Holds the step-set snapshot's collaborators plus the run token; every
/// callback re-checks the token so a stopped sequence performs no further
/// side effects.
struct CycleHooks {
    ctx: Arc<SequencerContext>,
    dispatcher: Arc<dyn Dispatch>,
    opener: Arc<dyn OpenLink>,
    bus: Bus,
    message: String,
    token: CancellationToken,
}

#[async_trait::async_trait]
impl StepHandler for CycleHooks {
    async fn on_fire(&self, step: StepKind) -> Result<(), SequenceError> {
        if self.token.is_cancelled() {
            return Ok(());
        }
        match step {
            StepKind::Advance => {
                let (next, position, total) = {
                    let mut list = self.ctx.targets.write().expect("target list lock poisoned");
                    list.advance();
                    (list.current().cloned(), list.cursor(), list.len())
                };
                let mut ev = Event::new(EventKind::CursorAdvanced).with_progress(position, total);
                if let Some(target) = &next {
                    ev = ev.with_target(target.as_str());
                }
                self.bus.publish(ev);
                // No-op past the end of the batch.
                if let Some(target) = next {
                    self.opener
                        .open(&target, &self.message)
                        .await
                        .map_err(SequenceError::Action)?;
                }
                Ok(())
            }
            StepKind::Paste | StepKind::Send | StepKind::Close => {
                // The countdown already waited; no extra service-side delay.
                match self.dispatcher.execute(step, Duration::ZERO).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        self.bus.publish(
                            Event::new(EventKind::ActionFailed)
                                .with_step(step)
                                .with_reason(e.as_message()),
                        );
                        Err(SequenceError::Action(e))
                    }
                }
            }
        }
    }
}
