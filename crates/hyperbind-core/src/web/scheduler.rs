//! [`Scheduler`] over `setTimeout(.., 0)`.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Window;

use crate::scheduler::{Scheduler, Task};

/// Defers tasks to the browser's timer queue.
#[derive(Debug, Clone)]
pub struct TimeoutScheduler {
	window: Window,
}

impl TimeoutScheduler {
	/// Schedules on `window`.
	pub fn new(window: Window) -> Self {
		Self { window }
	}
}

impl Scheduler for TimeoutScheduler {
	fn defer(&self, task: Task) {
		let callback = Closure::once_into_js(move || task());
		if let Err(err) = self
			.window
			.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), 0)
		{
			tracing::warn!(error = ?err, "setTimeout failed, task dropped");
		}
	}
}
