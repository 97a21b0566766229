//! HTTP transport abstraction.
//!
//! The transport issues a single call and reports how it ended. Aborts are
//! initiated through [`InFlight::abort`] and finalized by the lifecycle
//! controller itself, so a transport may (but need not) report them.

use std::fmt;
use std::time::Duration;

use http::{HeaderMap, Method, StatusCode};

use crate::dom::FormEntry;

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body<F> {
	/// No body (GET requests carry their data in the query string).
	Empty,
	/// Multipart form data.
	Multipart(Vec<FormEntry<F>>),
}

impl<F> Body<F> {
	/// Returns true for [`Body::Empty`] or an empty multipart list.
	pub fn is_empty(&self) -> bool {
		match self {
			Self::Empty => true,
			Self::Multipart(entries) => entries.is_empty(),
		}
	}

	/// Returns the multipart entries, if any.
	pub fn entries(&self) -> &[FormEntry<F>] {
		match self {
			Self::Empty => &[],
			Self::Multipart(entries) => entries,
		}
	}
}

/// A fully built request handed to the transport.
#[derive(Debug, Clone)]
pub struct TransportRequest<F> {
	/// HTTP method.
	pub method: Method,
	/// Absolute or page-relative URL, query string included.
	pub url: String,
	/// Request headers.
	pub headers: HeaderMap,
	/// Timeout; `None` waits forever.
	pub timeout: Option<Duration>,
	/// Request body.
	pub body: Body<F>,
}

/// A received HTTP response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
	/// Status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body as text.
	pub body: String,
}

impl TransportResponse {
	/// Creates a response without headers.
	pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: body.into(),
		}
	}
}

/// How a transport call ended.
#[derive(Debug, Clone)]
pub enum TransportOutcome {
	/// A response arrived, whatever its status.
	Loaded(TransportResponse),
	/// The call failed before a response arrived.
	NetworkError(String),
	/// The timeout elapsed.
	TimedOut,
}

/// Completion callback passed to [`Transport::send`].
pub type Completion = Box<dyn FnOnce(TransportOutcome)>;

/// Handle to a call in progress.
pub trait InFlight {
	/// Cancels the call. Completions arriving afterwards are ignored.
	fn abort(&self);
}

impl fmt::Debug for dyn InFlight {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("InFlight")
	}
}

/// Issues HTTP calls.
pub trait Transport<F> {
	/// Starts a call. `completion` must be invoked at most once, and never
	/// synchronously from within `send`.
	fn send(&self, request: TransportRequest<F>, completion: Completion) -> Box<dyn InFlight>;
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_body_accessors() {
		let empty: Body<()> = Body::Empty;
		assert!(empty.is_empty());
		assert!(empty.entries().is_empty());

		let body: Body<()> = Body::Multipart(vec![FormEntry::text("a", "1")]);
		assert!(!body.is_empty());
		assert_eq!(body.entries()[0].as_text(), Some("1"));
	}
}
