//! Runtime-wide sequencing of autoloaded requests.
//!
//! With `serial_autoload` enabled, bindings that request on creation are
//! queued instead of firing immediately, and only one autoloaded request is
//! in flight at any time across the whole runtime. The next one starts once
//! the previous request settled. With the setting disabled every autoload
//! fires straight away.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::binding::Binding;
use crate::dom::Dom;
use crate::runtime::Runtime;

/// FIFO of bindings waiting to autoload, plus the in-flight guard.
pub(crate) struct AutoloadSequencer<D: Dom> {
	queue: RefCell<VecDeque<Weak<Binding<D>>>>,
	blocked: Cell<bool>,
}

impl<D: Dom> AutoloadSequencer<D> {
	pub(crate) fn new() -> Self {
		Self {
			queue: RefCell::new(VecDeque::new()),
			blocked: Cell::new(false),
		}
	}

	fn push(&self, binding: &Rc<Binding<D>>) {
		self.queue.borrow_mut().push_back(Rc::downgrade(binding));
	}

	fn pop(&self) -> Option<Rc<Binding<D>>> {
		let mut queue = self.queue.borrow_mut();
		while let Some(next) = queue.pop_front() {
			if let Some(binding) = next.upgrade() {
				return Some(binding);
			}
		}
		None
	}

	pub(crate) fn pending(&self) -> usize {
		self.queue.borrow().len()
	}
}

impl<D: Dom> Runtime<D> {
	/// Requests for `binding` now, or queues it behind other autoloads.
	pub(crate) fn schedule_autoload(&self, binding: &Rc<Binding<D>>) {
		if !self.settings().serial_autoload {
			if let Err(err) = binding.request() {
				tracing::warn!(element = ?binding.element(), error = %err, "autoload request failed");
			}
			return;
		}
		self.autoload.push(binding);
		let weak = self.weak();
		self.scheduler().defer(Box::new(move || {
			if let Some(runtime) = weak.upgrade() {
				runtime.autoload_next();
			}
		}));
	}

	fn autoload_next(&self) {
		while !self.autoload.blocked.get() {
			let Some(binding) = self.autoload.pop() else {
				return;
			};
			self.autoload.blocked.set(true);
			match binding.request() {
				Ok(Some(ticket)) => {
					tracing::debug!(element = ?binding.element(), request = %ticket.id(), "autoload started");
					let weak = self.weak();
					ticket.on_settled(move |_| {
						if let Some(runtime) = weak.upgrade() {
							runtime.autoload.blocked.set(false);
							runtime.autoload_next();
						}
					});
				}
				Ok(None) => self.autoload.blocked.set(false),
				Err(err) => {
					tracing::warn!(element = ?binding.element(), error = %err, "autoload request failed");
					self.autoload.blocked.set(false);
				}
			}
		}
	}

	/// Number of bindings waiting for their autoload turn.
	pub fn pending_autoloads(&self) -> usize {
		self.autoload.pending()
	}
}

#[cfg(test)]
mod tests {
	use crate::settings::Settings;
	use crate::testing::Harness;
	use crate::Options;
	use rstest::rstest;

	const LINKS: &str = r#"<a id="one" href="/one">1</a><a id="two" href="/two">2</a>"#;

	#[rstest]
	fn test_serial_autoload_never_overlaps() {
		let harness = Harness::new(LINKS);
		harness.bind("one", Options::new().autoload(true));
		harness.bind("two", Options::new().autoload(true));

		assert_eq!(harness.transport.sent_count(), 0);
		assert_eq!(harness.runtime.pending_autoloads(), 2);

		harness.settle();
		assert_eq!(harness.transport.sent_count(), 1);
		assert_eq!(harness.transport.request(0).url, "/one");

		harness.transport.respond(0, 200, "<p>1</p>");
		assert_eq!(harness.transport.sent_count(), 2);
		assert_eq!(harness.transport.request(1).url, "/two");
		assert_eq!(harness.runtime.pending_autoloads(), 0);
	}

	#[rstest]
	fn test_parallel_autoload_when_disabled() {
		let settings = Settings {
			serial_autoload: false,
			..Settings::default()
		};
		let harness = Harness::with_settings(LINKS, settings);
		harness.bind("one", Options::new().autoload(true));
		harness.bind("two", Options::new().autoload(true));

		assert_eq!(harness.transport.sent_count(), 2);
	}

	#[rstest]
	fn test_destroyed_binding_does_not_block_queue() {
		let harness = Harness::new(LINKS);
		let one = harness.bind("one", Options::new().autoload(true));
		harness.bind("two", Options::new().autoload(true));
		one.destroy();

		harness.settle();
		assert_eq!(harness.transport.sent_count(), 1);
		assert_eq!(harness.transport.request(0).url, "/two");
	}

	#[rstest]
	fn test_failed_autoload_releases_guard() {
		let harness = Harness::new(LINKS);
		harness.bind("one", Options::new().autoload(true));
		harness.bind("two", Options::new().autoload(true));

		harness.settle();
		harness.transport.fail(0, "offline");
		assert_eq!(harness.transport.sent_count(), 2);
	}
}
