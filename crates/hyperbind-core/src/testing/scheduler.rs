//! A scheduler whose ticks are driven by the test.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::scheduler::{Scheduler, Task};

const MAX_ROUNDS: usize = 1_000;

/// Queues deferred tasks until the test runs them.
#[derive(Default)]
pub struct ManualScheduler {
	tasks: RefCell<VecDeque<Task>>,
}

impl ManualScheduler {
	/// Creates an idle scheduler.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of queued tasks.
	pub fn pending(&self) -> usize {
		self.tasks.borrow().len()
	}

	/// Runs the tasks queued right now; tasks they defer wait for the next
	/// call. Returns how many ran.
	pub fn run_pending(&self) -> usize {
		let count = self.pending();
		for _ in 0..count {
			let task = self.tasks.borrow_mut().pop_front();
			if let Some(task) = task {
				task();
			}
		}
		count
	}

	/// Runs tasks until the queue is empty.
	///
	/// # Panics
	///
	/// Panics if tasks keep rescheduling themselves.
	pub fn run_until_idle(&self) {
		for _ in 0..MAX_ROUNDS {
			if self.run_pending() == 0 {
				return;
			}
		}
		panic!("scheduler did not settle after {} rounds", MAX_ROUNDS);
	}
}

impl Scheduler for ManualScheduler {
	fn defer(&self, task: Task) {
		self.tasks.borrow_mut().push_back(task);
	}
}
