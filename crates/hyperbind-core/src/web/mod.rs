//! Browser collaborators, available on `wasm32`.
//!
//! [`start`] wires a [`Runtime`] to the live document and scans it for
//! declarative bindings once parsing has finished.

mod dom;
mod history;
mod scheduler;
mod transport;

use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

pub use dom::WebDom;
pub use history::BrowserHistory;
pub use scheduler::TimeoutScheduler;
pub use transport::XhrTransport;

use crate::error::{HyperbindError, Result};
use crate::form::NativeFormSerializer;
use crate::runtime::Runtime;
use crate::settings::Settings;

/// Builds a browser runtime and initializes declarative bindings.
///
/// # Errors
///
/// Fails outside a browser window or when `settings` carry invalid
/// defaults.
pub fn start(settings: Settings) -> Result<Rc<Runtime<WebDom>>> {
	let window =
		web_sys::window().ok_or_else(|| HyperbindError::Platform("no window".to_string()))?;
	let dom = Rc::new(WebDom::new()?);
	let document = dom.document().clone();
	let runtime = Runtime::builder(
		dom,
		Rc::new(XhrTransport),
		Rc::new(BrowserHistory::new(window.clone())),
		Rc::new(TimeoutScheduler::new(window)),
	)
	.settings(settings)
	.serializer(Rc::new(NativeFormSerializer))
	.build()?;

	if document.ready_state() == "loading" {
		let pending = Rc::clone(&runtime);
		let ready = Closure::once_into_js(move || {
			let bound = pending.init_declarative(None);
			tracing::debug!(count = bound.len(), "declarative bindings initialized");
		});
		document
			.add_event_listener_with_callback("DOMContentLoaded", ready.unchecked_ref())
			.map_err(|err| HyperbindError::Platform(format!("{:?}", err)))?;
	} else {
		runtime.init_declarative(None);
	}
	Ok(runtime)
}
