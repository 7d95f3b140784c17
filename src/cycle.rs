//! One cycle's concurrent countdown timers.
//!
//! [`CycleRunner`] arms one timer per enabled step, decrements them all on
//! a fixed tick, and fires each step's handler **exactly once** on expiry.
//! Handlers run as spawned tasks, so a slow remote call never blocks the
//! tick loop. The cycle is *settled* when no timer is active; after the
//! post-settle delay the runner reports completion.
//!
//! ## Flow
//! ```text
//! run(steps, handler, token)
//!   ├─► arm timers (enabled → active, disabled → skipped)
//!   └─► loop while any timer active {
//!         select! {
//!           token cancelled  ─► Outcome::Cancelled (no further callbacks)
//!           handler finished ─► Err(e) ─► fail-fast: stop timers, return Err
//!           tick             ─► remaining -= tick
//!                               remaining == 0 ─► fire handler (spawned), exactly once
//!         }
//!       }
//!   ├─► settle delay (still reaping handler results, still cancellable)
//!   ├─► drain in-flight handlers
//!   └─► Outcome::Settled
//! ```
//!
//! ## Rules
//! - Timers are ticked in [`StepKind::ALL`] order on every pass, but expiry
//!   order is determined solely by configured delay; equal delays may fire
//!   within the same tick window in unspecified relative order.
//! - Cancellation is cooperative: checked at every tick boundary, so it
//!   takes effect within one tick (not instantaneously).
//! - An all-disabled step set settles immediately; the settle delay still
//!   applies before completion is reported.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::SequencerConfig;
use crate::error::SequenceError;
use crate::events::{Bus, Event, EventKind};
use crate::steps::{StepKind, StepSet};

/// Per-step countdown state, existing only while a cycle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    /// Time left until the step fires.
    pub remaining: Duration,
    /// Whether the countdown is still running.
    pub active: bool,
    /// Whether the step has fired.
    pub completed: bool,
}

impl TimerState {
    fn armed(delay: Duration) -> Self {
        Self {
            remaining: delay,
            active: true,
            completed: false,
        }
    }

    fn skipped() -> Self {
        Self {
            remaining: Duration::ZERO,
            active: false,
            completed: false,
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// All timers expired or were skipped and the settle delay elapsed.
    Settled,
    /// The sequence was cancelled mid-cycle; timers stopped, no completion
    /// signal.
    Cancelled,
}

/// Callback seam invoked when a step's countdown expires.
///
/// Implementations run on spawned tasks, concurrently with the remaining
/// timers of the same cycle. An error fail-fast stops the cycle.
#[async_trait]
pub trait StepHandler: Send + Sync + 'static {
    /// Fired exactly once per enabled step per cycle.
    async fn on_fire(&self, step: StepKind) -> Result<(), SequenceError>;
}

/// Runs one cycle of concurrent countdown timers.
pub struct CycleRunner {
    tick: Duration,
    settle: Duration,
    bus: Bus,
}

impl CycleRunner {
    /// Creates a runner with the configured tick and settle periods.
    pub fn new(cfg: &SequencerConfig, bus: Bus) -> Self {
        Self {
            tick: cfg.tick,
            settle: cfg.settle,
            bus,
        }
    }

    /// Runs one cycle against a step-set snapshot.
    ///
    /// Returns [`CycleOutcome::Settled`] after all enabled steps have fired
    /// and the settle delay has elapsed, [`CycleOutcome::Cancelled`] when
    /// the token was cancelled mid-cycle, or the first handler error
    /// (fail-fast; remaining timers are stopped).
    pub async fn run(
        &self,
        steps: &StepSet,
        handler: Arc<dyn StepHandler>,
        token: &CancellationToken,
    ) -> Result<CycleOutcome, SequenceError> {
        let mut timers: Vec<(StepKind, TimerState)> = Vec::with_capacity(StepKind::ALL.len());
        for kind in StepKind::ALL {
            let cfg = steps.get(kind);
            if cfg.enabled {
                timers.push((kind, TimerState::armed(cfg.delay)));
            } else {
                timers.push((kind, TimerState::skipped()));
                self.bus
                    .publish(Event::new(EventKind::StepSkipped).with_step(kind));
            }
        }

        let mut fired: JoinSet<Result<(), SequenceError>> = JoinSet::new();
        let mut ticker = time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick completes immediately; consume it so the
        // first decrement lands one full tick after arming.
        ticker.tick().await;

        while timers.iter().any(|(_, t)| t.active) {
            tokio::select! {
                _ = token.cancelled() => {
                    for (_, t) in timers.iter_mut() {
                        t.active = false;
                    }
                    return Ok(CycleOutcome::Cancelled);
                }
                res = fired.join_next(), if !fired.is_empty() => {
                    Self::check_handler_result(res)?;
                }
                _ = ticker.tick() => {
                    for (kind, t) in timers.iter_mut() {
                        if !t.active {
                            continue;
                        }
                        t.remaining = t.remaining.saturating_sub(self.tick);
                        if t.remaining.is_zero() {
                            t.active = false;
                            t.completed = true;
                            self.bus.publish(
                                Event::new(EventKind::StepFired)
                                    .with_step(*kind)
                                    .with_delay(steps.get(*kind).delay),
                            );
                            let h = Arc::clone(&handler);
                            let step = *kind;
                            fired.spawn(async move { h.on_fire(step).await });
                        }
                    }
                }
            }
        }

        // Settled; hold the post-settle delay so in-flight side effects can
        // land before the controller advances and starts the next cycle.
        let settle = time::sleep(self.settle);
        tokio::pin!(settle);
        loop {
            tokio::select! {
                _ = token.cancelled() => return Ok(CycleOutcome::Cancelled),
                res = fired.join_next(), if !fired.is_empty() => {
                    Self::check_handler_result(res)?;
                }
                _ = &mut settle => break,
            }
        }

        // Anything still in flight is part of this cycle; wait it out so a
        // late failure still fail-fasts before the cursor moves.
        while let Some(res) = tokio::select! {
            _ = token.cancelled() => return Ok(CycleOutcome::Cancelled),
            res = fired.join_next() => res,
        } {
            Self::check_handler_result(Some(res))?;
        }

        self.bus.publish(Event::new(EventKind::CycleSettled));
        Ok(CycleOutcome::Settled)
    }

    /// Unwraps one reaped handler task: propagates handler errors and
    /// surfaces panics as action failures.
    fn check_handler_result(
        res: Option<Result<Result<(), SequenceError>, tokio::task::JoinError>>,
    ) -> Result<(), SequenceError> {
        match res {
            None => Ok(()),
            Some(Ok(inner)) => inner,
            Some(Err(join_err)) => Err(SequenceError::Action(crate::error::ActionError::Rejected {
                action: "callback",
                reason: format!("step callback panicked: {join_err}"),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Records fired steps with their firing order.
    struct Recorder {
        fired: Mutex<Vec<StepKind>>,
        fail_on: Option<StepKind>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fired: Mutex::new(Vec::new()),
                fail_on: None,
            })
        }

        fn failing_on(step: StepKind) -> Arc<Self> {
            Arc::new(Self {
                fired: Mutex::new(Vec::new()),
                fail_on: Some(step),
            })
        }

        fn fired(&self) -> Vec<StepKind> {
            self.fired.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StepHandler for Recorder {
        async fn on_fire(&self, step: StepKind) -> Result<(), SequenceError> {
            self.fired.lock().unwrap().push(step);
            if self.fail_on == Some(step) {
                return Err(SequenceError::Action(crate::error::ActionError::Rejected {
                    action: step.as_str(),
                    reason: "mock failure".into(),
                }));
            }
            Ok(())
        }
    }

    fn runner() -> (CycleRunner, Bus) {
        let bus = Bus::new(64);
        (CycleRunner::new(&SequencerConfig::default(), bus.clone()), bus)
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_disabled_settles_after_settle_delay() {
        let (runner, _bus) = runner();
        let rec = Recorder::new();
        let token = CancellationToken::new();

        let start = Instant::now();
        let outcome = runner
            .run(&StepSet::default(), rec.clone(), &token)
            .await
            .unwrap();

        assert_eq!(outcome, CycleOutcome::Settled);
        assert!(rec.fired().is_empty());
        // No timers, but the settle delay still applies.
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabled_steps_fire_exactly_once_in_delay_order() {
        let (runner, _bus) = runner();
        let steps = StepSet::default()
            .enable(StepKind::Paste, Duration::from_millis(500))
            .enable(StepKind::Send, Duration::from_millis(300));
        let rec = Recorder::new();
        let token = CancellationToken::new();

        let start = Instant::now();
        let outcome = runner.run(&steps, rec.clone(), &token).await.unwrap();

        assert_eq!(outcome, CycleOutcome::Settled);
        // Shorter delay fires first, each step exactly once.
        assert_eq!(rec.fired(), vec![StepKind::Send, StepKind::Paste]);
        // max(delays) + settle.
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert!(start.elapsed() < Duration::from_millis(1800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_timers_without_firing() {
        let (runner, _bus) = runner();
        let steps = StepSet::default().enable(StepKind::Paste, Duration::from_secs(1));
        let rec = Recorder::new();
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let outcome = runner.run(&steps, rec.clone(), &token).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Cancelled);
        assert!(rec.fired().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_error_fails_fast() {
        let (runner, _bus) = runner();
        let steps = StepSet::default()
            .enable(StepKind::Send, Duration::from_millis(100))
            .enable(StepKind::Close, Duration::from_secs(30));
        let rec = Recorder::failing_on(StepKind::Send);
        let token = CancellationToken::new();

        let start = Instant::now();
        let err = runner.run(&steps, rec.clone(), &token).await.unwrap_err();

        assert_eq!(err.as_label(), "sequence_action_failed");
        assert_eq!(rec.fired(), vec![StepKind::Send]);
        // Fail-fast: nowhere near the 30s close timer.
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_step_fires_on_first_tick() {
        let (runner, _bus) = runner();
        let steps = StepSet::default().enable(StepKind::Close, Duration::ZERO);
        let rec = Recorder::new();
        let token = CancellationToken::new();

        let outcome = runner.run(&steps, rec.clone(), &token).await.unwrap();
        assert_eq!(outcome, CycleOutcome::Settled);
        assert_eq!(rec.fired(), vec![StepKind::Close]);
    }
}
