//! Request state machine and handles.
//!
//! Every invocation of a binding produces one [`RequestTicket`]. Its state
//! only moves forward:
//!
//! ```text
//! Pending ──► InFlight ──► Succeeded
//!    │            ├──────► Failed
//!    └────────────┴──────► Aborted
//! ```
//!
//! A followed redirect keeps the same ticket in `InFlight`.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use http::Method;
use serde::{Deserialize, Serialize};

use crate::dom::FormEntry;

/// Identifies a request within a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Lifecycle state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
	/// Waiting in the binding's queue.
	Pending,
	/// Handed to the transport.
	InFlight,
	/// Completed with a 2xx response (or a navigating redirect).
	Succeeded,
	/// Completed with an error status, network error, timeout or
	/// configuration error.
	Failed,
	/// Cancelled before completion.
	Aborted,
}

impl RequestState {
	/// Returns true for the three terminal states.
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Succeeded | Self::Failed | Self::Aborted)
	}

	fn rank(self) -> u8 {
		match self {
			Self::Pending => 0,
			Self::InFlight => 1,
			Self::Succeeded | Self::Failed | Self::Aborted => 2,
		}
	}
}

impl fmt::Display for RequestState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Pending => "pending",
			Self::InFlight => "in_flight",
			Self::Succeeded => "succeeded",
			Self::Failed => "failed",
			Self::Aborted => "aborted",
		};
		f.write_str(name)
	}
}

type SettledCallback = Box<dyn FnOnce(RequestState)>;

struct TicketInner {
	id: RequestId,
	state: Cell<RequestState>,
	callbacks: RefCell<Vec<SettledCallback>>,
}

/// Caller-side handle to one request.
#[derive(Clone)]
pub struct RequestTicket {
	inner: Rc<TicketInner>,
}

impl fmt::Debug for RequestTicket {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RequestTicket")
			.field("id", &self.inner.id)
			.field("state", &self.inner.state.get())
			.finish()
	}
}

impl RequestTicket {
	pub(crate) fn new(id: RequestId) -> Self {
		Self {
			inner: Rc::new(TicketInner {
				id,
				state: Cell::new(RequestState::Pending),
				callbacks: RefCell::new(Vec::new()),
			}),
		}
	}

	/// Request identifier.
	pub fn id(&self) -> RequestId {
		self.inner.id
	}

	/// Current state.
	pub fn state(&self) -> RequestState {
		self.inner.state.get()
	}

	/// Returns true once the request reached a terminal state.
	pub fn is_settled(&self) -> bool {
		self.state().is_terminal()
	}

	/// Runs `callback` with the terminal state, immediately if the request
	/// already settled.
	pub fn on_settled<F>(&self, callback: F)
	where
		F: FnOnce(RequestState) + 'static,
	{
		let state = self.state();
		if state.is_terminal() {
			callback(state);
		} else {
			self.inner.callbacks.borrow_mut().push(Box::new(callback));
		}
	}

	/// Moves the ticket forward. Backward or repeated terminal transitions
	/// are ignored.
	pub(crate) fn advance(&self, next: RequestState) -> bool {
		let current = self.state();
		if current.is_terminal() || next.rank() < current.rank() {
			return false;
		}
		self.inner.state.set(next);
		if next.is_terminal() {
			let callbacks = std::mem::take(&mut *self.inner.callbacks.borrow_mut());
			for callback in callbacks {
				callback(next);
			}
		}
		true
	}
}

/// A request as seen by `before` listeners, which may edit it.
///
/// `data` holds the option data (flattened to bracket keys) followed by the
/// source fields. For GET requests the text entries become the query
/// string; otherwise they form a multipart body.
#[derive(Debug, Clone)]
pub struct PendingRequest<F> {
	/// HTTP method.
	pub method: Method,
	/// Target URL without the generated query string.
	pub url: String,
	/// Extra headers; marker headers are added when the request is sent.
	pub headers: BTreeMap<String, String>,
	/// Payload entries.
	pub data: Vec<FormEntry<F>>,
	/// Timeout; zero disables it.
	pub timeout: Duration,
	/// Whether to ask the server for header-reported redirects.
	pub intercept_redirect: bool,
}

impl<F> PendingRequest<F> {
	/// Appends a text entry.
	pub fn push_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.data.push(FormEntry::text(name, value));
	}

	/// Returns the first text value for `name`.
	pub fn text(&self, name: &str) -> Option<&str> {
		self.data
			.iter()
			.filter(|entry| entry.name == name)
			.find_map(FormEntry::as_text)
	}
}
