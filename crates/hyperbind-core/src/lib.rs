//! hyperbind core - declarative AJAX behaviour for HTML elements
//!
//! A binding attaches one element (a form, a link, a control) to a
//! configuration describing which request to issue when a trigger event
//! fires, how to read the response, and where to splice it into the page.
//!
//! ## Architecture
//!
//! - [`options`]: layered option model, resolvers and declarative JSON
//! - [`binder`]: trigger guessing and listener bookkeeping
//! - [`lifecycle`]: serial modes, queueing, dispatch and abort
//! - [`dispatch`]: redirects, status classification, actions and history
//! - [`autoload`]: runtime-wide sequencing of autoloaded requests
//! - [`runtime`]: collaborators, binding registry and declarative scanning
//!
//! The page itself is reached only through collaborator traits ([`Dom`],
//! [`Transport`], [`History`], [`Scheduler`], [`FormSerializer`]).
//! [`testing`] provides in-memory implementations; `web` implements them
//! with `web-sys` on `wasm32`.
//!
//! ## Example
//!
//! ```ignore
//! use hyperbind_core::{EventKind, Options, SerialMode};
//!
//! let binding = runtime.bind(
//!     form,
//!     Options::new()
//!         .target("#results")
//!         .serial_mode(SerialMode::Force)
//!         .history(true),
//! )?;
//!
//! binding.on(EventKind::Success, |event| {
//!     let response = event.response().unwrap();
//!     tracing::info!(status = %response.status, "results updated");
//! });
//! ```

#![warn(missing_docs)]

pub mod action;
pub mod autoload;
pub mod binder;
pub mod binding;
pub mod defaults;
pub mod dispatch;
pub mod dom;
pub mod error;
pub mod events;
pub mod form;
pub mod headers;
pub mod history;
pub mod lifecycle;
pub mod options;
pub mod payload;
pub mod request;
pub mod response;
pub mod runtime;
pub mod scheduler;
pub mod selector;
pub mod settings;
pub mod testing;
pub mod transport;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use action::{Action, ActionFn, ActionRegistry};
pub use binder::TriggerGuesser;
pub use binding::Binding;
pub use defaults::{DefaultsStore, MergeMode};
pub use dom::{ControlKind, ControlState, Dom, FormEntry, FormValue, ListenerId, TriggerEvent, TriggerHandler};
pub use error::{HyperbindError, Result};
pub use events::{Event, EventDetail, EventKind, Listener, RequestError, SubscriptionId};
pub use form::{FieldWalker, FormSerializer, NativeFormSerializer};
pub use history::History;
pub use options::{
	DeclarativeOptions, OptionValue, Options, RedirectMode, ResolvedOptions, SerialMode,
};
pub use request::{PendingRequest, RequestId, RequestState, RequestTicket};
pub use response::{Redirect, ResponseContext};
pub use runtime::{Runtime, RuntimeBuilder};
pub use scheduler::{Scheduler, Task};
pub use selector::Selector;
pub use settings::Settings;
pub use transport::{Body, Completion, InFlight, Transport, TransportOutcome, TransportRequest, TransportResponse};
