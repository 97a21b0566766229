//! A transport that records calls and completes them on demand.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use http::header::{HeaderName, HeaderValue};
use http::StatusCode;

use crate::transport::{
	Completion, InFlight, Transport, TransportOutcome, TransportRequest, TransportResponse,
};

struct Call {
	request: TransportRequest<String>,
	completion: Option<Completion>,
	aborted: Rc<Cell<bool>>,
}

struct MockInFlight {
	aborted: Rc<Cell<bool>>,
}

impl InFlight for MockInFlight {
	fn abort(&self) {
		self.aborted.set(true);
	}
}

/// Records every request; tests decide how and when each one ends.
///
/// Calls are addressed by send order, starting at zero.
#[derive(Default)]
pub struct MockTransport {
	calls: RefCell<Vec<Call>>,
}

impl MockTransport {
	/// Creates a transport with no recorded calls.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of calls sent so far.
	pub fn sent_count(&self) -> usize {
		self.calls.borrow().len()
	}

	/// Number of calls neither completed nor aborted.
	pub fn open_count(&self) -> usize {
		self.calls
			.borrow()
			.iter()
			.filter(|call| call.completion.is_some() && !call.aborted.get())
			.count()
	}

	/// Returns a copy of the `index`th request.
	///
	/// # Panics
	///
	/// Panics if fewer calls were sent.
	pub fn request(&self, index: usize) -> TransportRequest<String> {
		self.calls.borrow()[index].request.clone()
	}

	/// Returns copies of every request, in send order.
	pub fn requests(&self) -> Vec<TransportRequest<String>> {
		self.calls.borrow().iter().map(|call| call.request.clone()).collect()
	}

	/// Returns true if the caller aborted the `index`th call.
	pub fn was_aborted(&self, index: usize) -> bool {
		self.calls.borrow()[index].aborted.get()
	}

	/// Completes the `index`th call. Does nothing if it already completed.
	pub fn complete(&self, index: usize, outcome: TransportOutcome) {
		let completion = self.calls.borrow_mut()[index].completion.take();
		if let Some(completion) = completion {
			completion(outcome);
		}
	}

	/// Completes the `index`th call with a header-less response.
	pub fn respond(&self, index: usize, status: u16, body: &str) {
		self.respond_with_headers(index, status, &[], body);
	}

	/// Completes the `index`th call with a response carrying `headers`.
	///
	/// # Panics
	///
	/// Panics on an invalid status code or header.
	pub fn respond_with_headers(&self, index: usize, status: u16, headers: &[(&str, &str)], body: &str) {
		let status = StatusCode::from_u16(status).expect("valid status code");
		let mut response = TransportResponse::new(status, body);
		for (name, value) in headers {
			response.headers.insert(
				HeaderName::from_bytes(name.as_bytes()).expect("valid header name"),
				HeaderValue::from_str(value).expect("valid header value"),
			);
		}
		self.complete(index, TransportOutcome::Loaded(response));
	}

	/// Fails the `index`th call with a network error.
	pub fn fail(&self, index: usize, message: &str) {
		self.complete(index, TransportOutcome::NetworkError(message.to_string()));
	}

	/// Times out the `index`th call.
	pub fn time_out(&self, index: usize) {
		self.complete(index, TransportOutcome::TimedOut);
	}
}

impl Transport<String> for MockTransport {
	fn send(&self, request: TransportRequest<String>, completion: Completion) -> Box<dyn InFlight> {
		tracing::trace!(method = %request.method, url = %request.url, "mock transport send");
		let aborted = Rc::new(Cell::new(false));
		self.calls.borrow_mut().push(Call {
			request,
			completion: Some(completion),
			aborted: Rc::clone(&aborted),
		});
		Box::new(MockInFlight { aborted })
	}
}
