//! # hyperbind
//!
//! Declarative AJAX behaviour for HTML forms, links and inputs.
//!
//! Bind an element to a set of options and hyperbind takes over its
//! trigger event: it builds the request from the element and its form
//! fields, sends it through the configured transport, follows or
//! surfaces server-signalled redirects, and splices the response into
//! the page with one of the built-in actions (`fill`, `replace`,
//! `prepend`, `append`, `before`, `after`) or a registered custom one.
//!
//! ## Quick start
//!
//! On `wasm32` the browser collaborators are wired up by
//! [`web::start`](crate::core::web::start):
//!
//! ```ignore
//! use hyperbind::prelude::*;
//!
//! let runtime = hyperbind::core::web::start(Settings::default())?;
//! ```
//!
//! Markup then opts in through the marker attribute, whose value is a JSON
//! object of options:
//!
//! ```html
//! <form action="/search" data-hyperbind='{"target": "#results", "serialMode": "force"}'>
//! ```
//!
//! ## Concurrency
//!
//! Each binding applies its [`SerialMode`] when triggered while a request
//! is still in flight: `async` sends anyway, `lock` drops the new trigger,
//! `force` aborts the running request, and `queue` waits for it.
//!
//! ## Testing
//!
//! [`testing::Harness`](crate::core::testing::Harness) runs a runtime
//! against an in-memory document and transport, so binding behaviour can
//! be tested natively without a browser.

pub use hyperbind_core as core;

pub use hyperbind_core::{
	Action, Binding, Dom, EventKind, HyperbindError, Options, RedirectMode, RequestState,
	RequestTicket, Result, Runtime, SerialMode, Settings,
};

/// Common imports for applications.
pub mod prelude {
	pub use hyperbind_core::{
		Action, ActionRegistry, Binding, DefaultsStore, Dom, Event, EventDetail, EventKind,
		HyperbindError, MergeMode, Options, PendingRequest, RedirectMode, RequestError,
		RequestState, RequestTicket, ResponseContext, Result, Runtime, RuntimeBuilder, Selector,
		SerialMode, Settings, TriggerGuesser,
	};
}
