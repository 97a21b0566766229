//! [`Transport`] over `XMLHttpRequest`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{File, FormData, XmlHttpRequest};

use crate::dom::FormValue;
use crate::transport::{
	Body, Completion, InFlight, Transport, TransportOutcome, TransportRequest, TransportResponse,
};

type CompletionSlot = Rc<RefCell<Option<Completion>>>;

fn finish(slot: &CompletionSlot, outcome: TransportOutcome) {
	let completion = slot.borrow_mut().take();
	if let Some(completion) = completion {
		completion(outcome);
	}
}

/// Parses the `getAllResponseHeaders()` block.
fn parse_headers(block: &str) -> HeaderMap {
	let mut headers = HeaderMap::new();
	for line in block.split("\r\n") {
		let Some((name, value)) = line.split_once(':') else {
			continue;
		};
		match (
			HeaderName::from_bytes(name.trim().as_bytes()),
			HeaderValue::from_str(value.trim()),
		) {
			(Ok(name), Ok(value)) => {
				headers.append(name, value);
			}
			_ => tracing::debug!(line, "skipping unparsable response header"),
		}
	}
	headers
}

fn outcome_of(xhr: &XmlHttpRequest) -> TransportOutcome {
	let status = xhr.status().unwrap_or(0);
	if status == 0 {
		return TransportOutcome::NetworkError("request failed".to_string());
	}
	let Ok(status) = StatusCode::from_u16(status) else {
		return TransportOutcome::NetworkError(format!("invalid status {}", status));
	};
	TransportOutcome::Loaded(TransportResponse {
		status,
		headers: parse_headers(&xhr.get_all_response_headers().unwrap_or_default()),
		body: xhr.response_text().ok().flatten().unwrap_or_default(),
	})
}

fn form_data(entries: &[crate::dom::FormEntry<File>]) -> Result<FormData, JsValue> {
	let data = FormData::new()?;
	for entry in entries {
		match &entry.value {
			FormValue::Text(text) => data.append_with_str(&entry.name, text)?,
			FormValue::File(file) => data.append_with_blob_and_filename(&entry.name, file, &file.name())?,
		}
	}
	Ok(data)
}

struct XhrInFlight {
	xhr: Option<XmlHttpRequest>,
	aborted: Rc<Cell<bool>>,
}

impl InFlight for XhrInFlight {
	fn abort(&self) {
		self.aborted.set(true);
		if let Some(xhr) = &self.xhr {
			if let Err(err) = xhr.abort() {
				tracing::debug!(error = ?err, "xhr abort failed");
			}
		}
	}
}

/// Sends requests with `XMLHttpRequest`.
///
/// `timeout` reports timeouts and `loadend` reports everything else; a zero
/// status at `loadend` is a network error. Whichever runs first empties the
/// completion slot.
#[derive(Debug, Default, Clone, Copy)]
pub struct XhrTransport;

impl XhrTransport {
	fn open(
		request: &TransportRequest<File>,
		slot: &CompletionSlot,
		aborted: &Rc<Cell<bool>>,
	) -> Result<XmlHttpRequest, JsValue> {
		let xhr = XmlHttpRequest::new()?;
		xhr.open_with_async(request.method.as_str(), &request.url, true)?;
		for (name, value) in &request.headers {
			match value.to_str() {
				Ok(value) => xhr.set_request_header(name.as_str(), value)?,
				Err(_) => tracing::warn!(header = %name, "skipping non-ASCII header value"),
			}
		}
		if let Some(timeout) = request.timeout {
			xhr.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
			let on_timeout = {
				let slot = Rc::clone(slot);
				let aborted = Rc::clone(aborted);
				move || {
					if !aborted.get() {
						finish(&slot, TransportOutcome::TimedOut);
					}
				}
			};
			xhr.set_ontimeout(Some(Closure::once_into_js(on_timeout).unchecked_ref()));
		}

		// `loadend` also fires after a timeout; the slot is empty by then.
		let on_loadend = {
			let xhr = xhr.clone();
			let slot = Rc::clone(slot);
			let aborted = Rc::clone(aborted);
			move || {
				if !aborted.get() {
					finish(&slot, outcome_of(&xhr));
				}
			}
		};
		xhr.set_onloadend(Some(Closure::once_into_js(on_loadend).unchecked_ref()));

		match &request.body {
			Body::Empty => xhr.send()?,
			Body::Multipart(entries) => xhr.send_with_opt_form_data(Some(&form_data(entries)?))?,
		}
		Ok(xhr)
	}
}

impl Transport<File> for XhrTransport {
	fn send(&self, request: TransportRequest<File>, completion: Completion) -> Box<dyn InFlight> {
		let slot: CompletionSlot = Rc::new(RefCell::new(Some(completion)));
		let aborted = Rc::new(Cell::new(false));
		match Self::open(&request, &slot, &aborted) {
			Ok(xhr) => Box::new(XhrInFlight {
				xhr: Some(xhr),
				aborted,
			}),
			Err(err) => {
				let message = format!("{:?}", err);
				tracing::warn!(url = %request.url, error = %message, "xhr setup failed");
				let report = Rc::new(RefCell::new(Some(message)));
				let deferred = {
					let aborted = Rc::clone(&aborted);
					let slot = Rc::clone(&slot);
					let report = Rc::clone(&report);
					move || {
						let message = report.borrow_mut().take();
						if let (false, Some(message)) = (aborted.get(), message) {
							finish(&slot, TransportOutcome::NetworkError(message));
						}
					}
				};
				let scheduled = web_sys::window()
					.ok_or_else(|| JsValue::from_str("no window"))
					.and_then(|window| {
						let callback = Closure::once_into_js(deferred);
						window.set_timeout_with_callback_and_timeout_and_arguments_0(
							callback.unchecked_ref(),
							0,
						)
					});
				if let Err(err) = scheduled {
					// Nothing else will report the failure, so do it now.
					tracing::warn!(error = ?err, "could not defer xhr failure, reporting synchronously");
					if let Some(message) = report.borrow_mut().take() {
						finish(&slot, TransportOutcome::NetworkError(message));
					}
				}
				Box::new(XhrInFlight { xhr: None, aborted })
			}
		}
	}
}
