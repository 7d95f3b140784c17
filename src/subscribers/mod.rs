//! Subscriber API: trait, fan-out set, and a built-in progress logger.
//!
//! ## Contents
//! - [`Subscribe`] — the extension point for custom event handlers
//! - [`SubscriberSet`] — bounded-queue fan-out with panic isolation
//! - [`ProgressLog`] — human-readable stdout progress lines

mod progress;
mod set;
mod subscribe;

pub use progress::ProgressLog;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
