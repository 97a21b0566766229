//! Request lifecycle: serial policy, queueing, dispatch and completion.
//!
//! Each binding keeps a FIFO of requests waiting to be sent and the list of
//! requests currently in flight. Whether a new invocation proceeds depends
//! on the effective serial mode:
//!
//! | Mode    | While a request is in flight                          |
//! |---------|-------------------------------------------------------|
//! | `async` | send immediately                                      |
//! | `lock`  | ignore the invocation                                 |
//! | `force` | abort everything, then send                           |
//! | `queue` | wait until every earlier request has finished         |
//!
//! Followed redirects are continuations of their request: they skip the
//! serial policy and are sent ahead of everything queued.

use std::collections::VecDeque;
use std::rc::Rc;

use http::Method;

use crate::binding::Binding;
use crate::dom::{Dom, FormEntry};
use crate::error::{HyperbindError, Result};
use crate::events::EventDetail;
use crate::options::{Options, ResolvedOptions, SerialMode};
use crate::payload;
use crate::request::{PendingRequest, RequestId, RequestState, RequestTicket};
use crate::response::ResponseContext;
use crate::runtime::Runtime;
use crate::transport::{InFlight, TransportOutcome};

/// A request waiting to be sent.
pub(crate) struct Queued<E, F> {
	pub(crate) ticket: RequestTicket,
	pub(crate) options: Rc<ResolvedOptions<E>>,
	pub(crate) pending: PendingRequest<F>,
	pub(crate) hops: usize,
	pub(crate) continuation: bool,
}

/// A request handed to the transport.
pub(crate) struct Active<E, F> {
	pub(crate) ticket: RequestTicket,
	pub(crate) options: Rc<ResolvedOptions<E>>,
	pub(crate) pending: PendingRequest<F>,
	pub(crate) hops: usize,
	handle: Option<Box<dyn InFlight>>,
}

pub(crate) struct LifecycleState<E, F> {
	queue: VecDeque<Queued<E, F>>,
	in_flight: Vec<Active<E, F>>,
}

impl<E, F> Default for LifecycleState<E, F> {
	fn default() -> Self {
		Self {
			queue: VecDeque::new(),
			in_flight: Vec::new(),
		}
	}
}

impl<D: Dom> Binding<D> {
	/// Issues a request with the binding's options.
	///
	/// Returns `Ok(None)` when nothing was scheduled: the binding is not
	/// active, or `lock` mode ignored the invocation.
	///
	/// # Errors
	///
	/// Fails when the source selector cannot be evaluated.
	pub fn request(&self) -> Result<Option<RequestTicket>> {
		self.request_with(Options::new())
	}

	/// Issues a request with per-call overrides layered over the binding's
	/// options. Resolvers in `overrides` run for this call only.
	///
	/// # Errors
	///
	/// Propagates resolution failures of the overrides and source selector
	/// errors.
	pub fn request_with(&self, overrides: Options<D::Element>) -> Result<Option<RequestTicket>> {
		// A captured button belongs to this invocation, even an ignored one.
		let pressed = self.take_pressed();
		if !self.is_active() {
			tracing::debug!(element = ?self.element(), "request on inactive binding ignored");
			return Ok(None);
		}
		let Some(runtime) = self.runtime() else {
			return Ok(None);
		};

		let options = if overrides.is_empty() {
			self.options()
		} else {
			let overrides = overrides.resolve(self.element())?;
			Rc::new(self.layers().merge(overrides).freeze(self.element())?)
		};

		if self.is_busy() {
			match options.serial_mode {
				SerialMode::Lock => {
					tracing::debug!(element = ?self.element(), "request ignored while locked");
					return Ok(None);
				}
				SerialMode::Force => self.abort(),
				SerialMode::Async | SerialMode::Queue => {}
			}
		}

		let mut pending = self.build_pending(&runtime, &options, pressed)?;
		let ticket = RequestTicket::new(runtime.next_request_id());
		self.emit(ticket.id(), EventDetail::Before(&mut pending));

		if !self.is_active() {
			self.finish_aborted(&ticket);
			return Ok(Some(ticket));
		}

		self.lifecycle.borrow_mut().queue.push_back(Queued {
			ticket: ticket.clone(),
			options,
			pending,
			hops: 0,
			continuation: false,
		});
		self.request_next();
		Ok(Some(ticket))
	}

	/// Aborts every in-flight request and discards every queued one. Each
	/// of them still emits `abort` followed by `always`.
	pub fn abort(&self) {
		let (queued, active) = {
			let mut state = self.lifecycle.borrow_mut();
			(
				std::mem::take(&mut state.queue),
				std::mem::take(&mut state.in_flight),
			)
		};
		if queued.is_empty() && active.is_empty() {
			return;
		}
		tracing::debug!(
			element = ?self.element(),
			in_flight = active.len(),
			queued = queued.len(),
			"aborting requests"
		);

		for request in &active {
			if let Some(handle) = &request.handle {
				handle.abort();
			}
		}
		let tickets = active
			.into_iter()
			.map(|request| request.ticket)
			.chain(queued.into_iter().map(|request| request.ticket));
		for ticket in tickets {
			self.finish_aborted(&ticket);
		}
	}

	/// Returns true while requests are queued or in flight.
	pub fn is_busy(&self) -> bool {
		let state = self.lifecycle.borrow();
		!state.in_flight.is_empty() || !state.queue.is_empty()
	}

	/// Number of requests handed to the transport and not yet finished.
	pub fn in_flight_count(&self) -> usize {
		self.lifecycle.borrow().in_flight.len()
	}

	/// Number of requests waiting to be sent.
	pub fn queued_count(&self) -> usize {
		self.lifecycle.borrow().queue.len()
	}

	fn build_pending(
		&self,
		runtime: &Runtime<D>,
		options: &ResolvedOptions<D::Element>,
		pressed: Option<(String, String)>,
	) -> Result<PendingRequest<D::File>> {
		let dom = runtime.dom();
		let element = self.element();

		let method = match &options.method {
			Some(method) => method.clone(),
			None if dom.is_form(element) => match dom.attribute(element, "method") {
				Some(method) if !method.trim().is_empty() => {
					let upper = method.trim().to_ascii_uppercase();
					Method::from_bytes(upper.as_bytes())
						.map_err(|_| HyperbindError::InvalidMethod(method.clone()))?
				}
				_ => Method::GET,
			},
			None => Method::GET,
		};

		let url = options
			.url
			.clone()
			.or_else(|| dom.attribute(element, "action").filter(|url| !url.is_empty()))
			.or_else(|| dom.attribute(element, "href").filter(|url| !url.is_empty()))
			.unwrap_or_else(|| runtime.history().current_url());

		let sources = options.source.resolve(&**dom, element)?;
		let mut data = payload::entries(payload::flatten(&options.data));
		data.extend(runtime.serializer().serialize(dom, &sources));
		if let Some((name, value)) = pressed {
			data.push(FormEntry::text(name, value));
		}

		Ok(PendingRequest {
			method,
			url,
			headers: options.headers.clone(),
			data,
			timeout: options.timeout,
			intercept_redirect: options.intercept_redirect,
		})
	}

	/// Sends queued requests the serial policy allows.
	pub(crate) fn request_next(&self) {
		loop {
			let next = {
				let mut state = self.lifecycle.borrow_mut();
				let Some(front) = state.queue.front() else {
					break;
				};
				let waits = !front.continuation
					&& front.options.serial_mode == SerialMode::Queue
					&& !state.in_flight.is_empty();
				if waits {
					break;
				}
				state.queue.pop_front()
			};
			match next {
				Some(queued) => self.send(queued),
				None => break,
			}
		}
	}

	pub(crate) fn enqueue_continuation(&self, queued: Queued<D::Element, D::File>) {
		self.lifecycle.borrow_mut().queue.push_front(queued);
		self.schedule_next();
	}

	fn send(&self, queued: Queued<D::Element, D::File>) {
		let Some(runtime) = self.runtime() else {
			return;
		};
		let Queued {
			ticket,
			options,
			pending,
			hops,
			..
		} = queued;
		let id = ticket.id();

		let request = payload::build(pending.clone());
		self.emit(id, EventDetail::Presend(&request));
		ticket.advance(RequestState::InFlight);

		tracing::debug!(
			request = %id,
			method = %request.method,
			url = %request.url,
			hops,
			"sending request"
		);
		self.lifecycle.borrow_mut().in_flight.push(Active {
			ticket,
			options,
			pending,
			hops,
			handle: None,
		});

		let weak = self.weak();
		let handle = runtime.transport().send(
			request,
			Box::new(move |outcome| {
				if let Some(binding) = weak.upgrade() {
					binding.complete(id, outcome);
				}
			}),
		);

		let mut state = self.lifecycle.borrow_mut();
		if let Some(active) = state.in_flight.iter_mut().find(|active| active.ticket.id() == id) {
			active.handle = Some(handle);
		}
	}

	fn complete(&self, id: RequestId, outcome: TransportOutcome) {
		let active = {
			let mut state = self.lifecycle.borrow_mut();
			let position = state.in_flight.iter().position(|active| active.ticket.id() == id);
			position.map(|position| state.in_flight.remove(position))
		};
		let Some(active) = active else {
			tracing::debug!(request = %id, "ignoring completion of untracked request");
			return;
		};
		let Some(runtime) = self.runtime() else {
			return;
		};
		self.dispatch(&runtime, active, outcome);
	}

	/// Emits `always`, settles the ticket and lets the queue move on.
	pub(crate) fn finish(
		&self,
		ticket: &RequestTicket,
		state: RequestState,
		response: Option<&ResponseContext<D::Element>>,
	) {
		tracing::debug!(request = %ticket.id(), state = %state, "request finished");
		self.emit(ticket.id(), EventDetail::Always(state, response));
		ticket.advance(state);
		self.schedule_next();
	}

	fn finish_aborted(&self, ticket: &RequestTicket) {
		self.emit(ticket.id(), EventDetail::Abort);
		self.emit(ticket.id(), EventDetail::Always(RequestState::Aborted, None));
		ticket.advance(RequestState::Aborted);
	}

	fn schedule_next(&self) {
		let Some(runtime) = self.runtime() else {
			return;
		};
		let weak = self.weak();
		runtime.scheduler().defer(Box::new(move || {
			if let Some(binding) = weak.upgrade() {
				binding.request_next();
			}
		}));
	}
}

#[cfg(test)]
mod tests {
	use crate::events::{EventDetail, EventKind};
	use crate::request::RequestState;
	use crate::testing::Harness;
	use crate::{Options, SerialMode};
	use rstest::{fixture, rstest};
	use std::cell::RefCell;
	use std::rc::Rc;

	#[fixture]
	fn harness() -> Harness {
		Harness::new(r#"<a id="link" href="/items">items</a>"#)
	}

	fn record(binding: &crate::testing::MockBinding) -> Rc<RefCell<Vec<String>>> {
		let log = Rc::new(RefCell::new(Vec::new()));
		for kind in [EventKind::Abort, EventKind::Success, EventKind::Always] {
			binding.on(kind, {
				let log = Rc::clone(&log);
				move |event| log.borrow_mut().push(format!("{}{}", event.kind(), event.request_id()))
			});
		}
		log
	}

	#[rstest]
	fn test_async_requests_overlap(harness: Harness) {
		let binding = harness.bind("link", Options::new());

		binding.request().unwrap();
		binding.request().unwrap();

		assert_eq!(harness.transport.sent_count(), 2);
		assert_eq!(binding.in_flight_count(), 2);
	}

	#[rstest]
	fn test_lock_ignores_until_finished(harness: Harness) {
		let binding = harness.bind("link", Options::new().serial_mode(SerialMode::Lock));

		let first = binding.request().unwrap();
		assert!(first.is_some());
		assert!(binding.request().unwrap().is_none());
		assert_eq!(harness.transport.sent_count(), 1);

		harness.transport.respond(0, 200, "<p>a</p>");
		assert_eq!(first.unwrap().state(), RequestState::Succeeded);

		assert!(binding.request().unwrap().is_some());
		assert_eq!(harness.transport.sent_count(), 2);
	}

	#[rstest]
	fn test_force_aborts_previous(harness: Harness) {
		let binding = harness.bind("link", Options::new().serial_mode(SerialMode::Force));
		let log = record(&binding);

		let first = binding.request().unwrap().unwrap();
		let second = binding.request().unwrap().unwrap();

		assert!(harness.transport.was_aborted(0));
		assert_eq!(first.state(), RequestState::Aborted);
		assert_eq!(second.state(), RequestState::InFlight);
		assert_eq!(harness.transport.sent_count(), 2);
		assert_eq!(*log.borrow(), vec!["abort#1".to_string(), "always#1".to_string()]);

		harness.transport.respond(0, 200, "<p>late</p>");
		assert_eq!(log.borrow().len(), 2);
	}

	#[rstest]
	fn test_queue_sends_one_at_a_time(harness: Harness) {
		let binding = harness.bind("link", Options::new().serial_mode(SerialMode::Queue));

		let first = binding.request().unwrap().unwrap();
		let second = binding.request().unwrap().unwrap();
		assert_eq!(harness.transport.sent_count(), 1);
		assert_eq!(second.state(), RequestState::Pending);

		harness.transport.respond(0, 200, "<p>1</p>");
		assert_eq!(first.state(), RequestState::Succeeded);
		assert_eq!(harness.transport.sent_count(), 1);

		harness.settle();
		assert_eq!(harness.transport.sent_count(), 2);
		assert_eq!(second.state(), RequestState::InFlight);
	}

	#[rstest]
	fn test_abort_discards_queue_and_pairs_events(harness: Harness) {
		let binding = harness.bind("link", Options::new().serial_mode(SerialMode::Queue));
		let log = record(&binding);

		binding.request().unwrap();
		binding.request().unwrap();
		binding.abort();

		assert_eq!(
			*log.borrow(),
			vec!["abort#1", "always#1", "abort#2", "always#2"]
				.into_iter()
				.map(String::from)
				.collect::<Vec<_>>()
		);
		assert!(!binding.is_busy());
		harness.settle();
		assert_eq!(harness.transport.sent_count(), 1);
	}

	#[rstest]
	fn test_destroy_then_request_is_noop(harness: Harness) {
		let binding = harness.bind("link", Options::new());
		binding.request().unwrap();
		binding.destroy();

		assert!(harness.transport.was_aborted(0));
		assert!(binding.request().unwrap().is_none());
		assert!(binding.request_with(Options::new().url("/x")).unwrap().is_none());
		assert_eq!(harness.transport.sent_count(), 1);
	}

	#[rstest]
	fn test_overrides_apply_to_one_request(harness: Harness) {
		let binding = harness.bind("link", Options::new().data(serde_json::json!({"a": 1})));

		binding
			.request_with(Options::new().method("post").data(serde_json::json!({"b": 2})))
			.unwrap();
		binding.request().unwrap();

		let first = harness.transport.request(0);
		assert_eq!(first.method, http::Method::POST);
		assert_eq!(first.url, "/items");
		assert_eq!(first.body.entries().len(), 2);

		let second = harness.transport.request(1);
		assert_eq!(second.method, http::Method::GET);
		assert_eq!(second.url, "/items?a=1");
	}

	#[rstest]
	fn test_before_listener_edits_and_presend_sees_result(harness: Harness) {
		let binding = harness.bind("link", Options::new());
		binding.on(EventKind::Before, |event| {
			if let Some(pending) = event.pending_mut() {
				pending.push_text("token", "abc");
				pending.headers.insert("X-Extra".to_string(), "1".to_string());
			}
		});
		let presend_url = Rc::new(RefCell::new(String::new()));
		binding.on(EventKind::Presend, {
			let presend_url = Rc::clone(&presend_url);
			move |event| {
				if let EventDetail::Presend(request) = event.detail() {
					*presend_url.borrow_mut() = request.url.clone();
				}
			}
		});

		binding.request().unwrap();

		let sent = harness.transport.request(0);
		assert_eq!(sent.url, "/items?token=abc");
		assert_eq!(sent.headers.get("x-extra").unwrap(), "1");
		assert_eq!(*presend_url.borrow(), "/items?token=abc");
	}

	#[rstest]
	fn test_url_falls_back_to_current_page() {
		let harness = Harness::new(r#"<div id="panel"></div>"#);
		harness.history.set_url("https://example.test/page");
		let binding = harness.bind("panel", Options::new());

		binding.request().unwrap();
		assert_eq!(harness.transport.request(0).url, "https://example.test/page");
	}
}
