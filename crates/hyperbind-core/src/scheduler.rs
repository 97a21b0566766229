//! Deferred execution.
//!
//! The lifecycle controller never re-enters itself synchronously from a
//! completion callback. Work that must run "on the next tick" (draining the
//! request queue, the `replace` action, the autoload sequencer) goes through
//! a [`Scheduler`].

/// A task scheduled for a later tick.
pub type Task = Box<dyn FnOnce()>;

/// Runs tasks after the current call stack unwinds.
pub trait Scheduler {
	/// Schedules `task` to run on a later tick, in FIFO order.
	fn defer(&self, task: Task);
}
