//! Subscription hub and dynamic per-symbol polling scheduler
//!
//! The pieces with real coordination live here:
//! - The distribution hub: a sequential actor owning the subscriber set,
//!   fanning each quote out to the subscribers of its symbol.
//! - Per-symbol pollers: one repeating fetch task per requested symbol,
//!   stopped cooperatively at tick boundaries.
//! - The scheduler loop: periodically reconciles running pollers against the
//!   set of symbols subscribers currently want.

pub mod hub;
pub mod scheduler;

mod poller;
mod registry;

pub use hub::{Hub, HubHandle};
pub use registry::SubscriberId;
pub use scheduler::{Scheduler, SchedulerStats};
