//! Observable binding events.
//!
//! Listeners subscribe to one [`EventKind`] on a binding and receive an
//! [`Event`] carrying the request id, the bound element and a kind-specific
//! [`EventDetail`]. `before` listeners get mutable access to the pending
//! request; every other detail is read-only.
//!
//! For every request exactly one `always` event is emitted, after all
//! other events of that request.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::error::HyperbindError;
use crate::request::{PendingRequest, RequestId, RequestState};
use crate::response::ResponseContext;
use crate::transport::{TransportRequest, TransportResponse};

/// Kinds of binding events, in the order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
	/// The request is about to be built; listeners may edit it.
	Before,
	/// The final transport request is about to be sent.
	Presend,
	/// A response arrived, before status classification.
	Load,
	/// The server reported a redirect.
	Redirect,
	/// A 2xx response is about to be applied.
	Success,
	/// The server answered with status 400 or above.
	Failure,
	/// The request failed without a usable response.
	Error,
	/// The timeout elapsed.
	Timeout,
	/// The request was aborted.
	Abort,
	/// Terminal event, emitted once per request.
	Always,
}

impl EventKind {
	/// Lowercase event name.
	pub fn name(self) -> &'static str {
		match self {
			Self::Before => "before",
			Self::Presend => "presend",
			Self::Load => "load",
			Self::Redirect => "redirect",
			Self::Success => "success",
			Self::Failure => "failure",
			Self::Error => "error",
			Self::Timeout => "timeout",
			Self::Abort => "abort",
			Self::Always => "always",
		}
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Why a request ended with an `error` event.
#[derive(Debug, Error)]
pub enum RequestError {
	/// The transport failed before a response arrived.
	#[error("network error: {0}")]
	Network(String),
	/// The request could not be completed as configured.
	#[error(transparent)]
	Config(#[from] HyperbindError),
}

/// Kind-specific event payload.
pub enum EventDetail<'a, E, F> {
	/// Payload of [`EventKind::Before`].
	Before(&'a mut PendingRequest<F>),
	/// Payload of [`EventKind::Presend`].
	Presend(&'a TransportRequest<F>),
	/// Payload of [`EventKind::Load`].
	Load(&'a TransportResponse),
	/// Payload of [`EventKind::Redirect`].
	Redirect(&'a ResponseContext<E>),
	/// Payload of [`EventKind::Success`].
	Success(&'a ResponseContext<E>),
	/// Payload of [`EventKind::Failure`].
	Failure(&'a ResponseContext<E>),
	/// Payload of [`EventKind::Error`].
	Error(&'a RequestError),
	/// Payload of [`EventKind::Timeout`].
	Timeout,
	/// Payload of [`EventKind::Abort`].
	Abort,
	/// Payload of [`EventKind::Always`]: terminal state and the response,
	/// when one arrived.
	Always(RequestState, Option<&'a ResponseContext<E>>),
}

impl<E, F> EventDetail<'_, E, F> {
	/// The event kind this detail belongs to.
	pub fn kind(&self) -> EventKind {
		match self {
			Self::Before(_) => EventKind::Before,
			Self::Presend(_) => EventKind::Presend,
			Self::Load(_) => EventKind::Load,
			Self::Redirect(_) => EventKind::Redirect,
			Self::Success(_) => EventKind::Success,
			Self::Failure(_) => EventKind::Failure,
			Self::Error(_) => EventKind::Error,
			Self::Timeout => EventKind::Timeout,
			Self::Abort => EventKind::Abort,
			Self::Always(..) => EventKind::Always,
		}
	}
}

/// An event delivered to binding listeners.
pub struct Event<'a, E, F> {
	request: RequestId,
	element: &'a E,
	detail: EventDetail<'a, E, F>,
}

impl<'a, E, F> Event<'a, E, F> {
	pub(crate) fn new(request: RequestId, element: &'a E, detail: EventDetail<'a, E, F>) -> Self {
		Self {
			request,
			element,
			detail,
		}
	}

	/// Event kind.
	pub fn kind(&self) -> EventKind {
		self.detail.kind()
	}

	/// Request the event belongs to.
	pub fn request_id(&self) -> RequestId {
		self.request
	}

	/// The bound element.
	pub fn element(&self) -> &E {
		self.element
	}

	/// Kind-specific payload.
	pub fn detail(&self) -> &EventDetail<'a, E, F> {
		&self.detail
	}

	/// Mutable access to the pending request of a `before` event.
	pub fn pending_mut(&mut self) -> Option<&mut PendingRequest<F>> {
		match &mut self.detail {
			EventDetail::Before(pending) => Some(&mut **pending),
			_ => None,
		}
	}

	/// The response context of `redirect`, `success`, `failure` and
	/// `always` events.
	pub fn response(&self) -> Option<&ResponseContext<E>> {
		match &self.detail {
			EventDetail::Redirect(response)
			| EventDetail::Success(response)
			| EventDetail::Failure(response) => Some(*response),
			EventDetail::Always(_, response) => *response,
			_ => None,
		}
	}
}

/// Listener callback.
pub type Listener<E, F> = Rc<dyn Fn(&mut Event<'_, E, F>)>;

/// Identifies a subscription made with [`Listeners::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Per-binding listener table.
pub struct Listeners<E, F> {
	entries: RefCell<Vec<(SubscriptionId, EventKind, Listener<E, F>)>>,
	next_id: Cell<u64>,
}

impl<E, F> Default for Listeners<E, F> {
	fn default() -> Self {
		Self {
			entries: RefCell::new(Vec::new()),
			next_id: Cell::new(1),
		}
	}
}

impl<E, F> fmt::Debug for Listeners<E, F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let kinds: Vec<EventKind> = self.entries.borrow().iter().map(|(_, kind, _)| *kind).collect();
		f.debug_struct("Listeners").field("kinds", &kinds).finish()
	}
}

impl<E, F> Listeners<E, F> {
	/// Subscribes `listener` to events of `kind`.
	pub fn on(&self, kind: EventKind, listener: Listener<E, F>) -> SubscriptionId {
		let id = SubscriptionId(self.next_id.get());
		self.next_id.set(id.0 + 1);
		self.entries.borrow_mut().push((id, kind, listener));
		id
	}

	/// Removes a subscription. Returns false if it was already gone.
	pub fn off(&self, id: SubscriptionId) -> bool {
		let mut entries = self.entries.borrow_mut();
		let before = entries.len();
		entries.retain(|(entry, _, _)| *entry != id);
		entries.len() != before
	}

	/// Delivers `event` to every listener of its kind, in subscription
	/// order. Listeners may subscribe or unsubscribe while being notified;
	/// such changes apply from the next emit.
	pub fn emit(&self, event: &mut Event<'_, E, F>) {
		let kind = event.kind();
		let matching: Vec<Listener<E, F>> = self
			.entries
			.borrow()
			.iter()
			.filter(|(_, entry_kind, _)| *entry_kind == kind)
			.map(|(_, _, listener)| Rc::clone(listener))
			.collect();
		for listener in matching {
			listener(event);
		}
	}
}
