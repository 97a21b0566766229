//! [`History`] over `window.history` and `window.location`.

use wasm_bindgen::JsValue;
use web_sys::Window;

use crate::history::History;

/// The browser's session history.
#[derive(Debug, Clone)]
pub struct BrowserHistory {
	window: Window,
}

impl BrowserHistory {
	/// Wraps `window`.
	pub fn new(window: Window) -> Self {
		Self { window }
	}
}

impl History for BrowserHistory {
	fn current_url(&self) -> String {
		self.window.location().href().unwrap_or_default()
	}

	fn push_state(&self, title: &str, url: Option<&str>) {
		if !title.is_empty() {
			if let Some(document) = self.window.document() {
				document.set_title(title);
			}
		}
		let pushed = self
			.window
			.history()
			.and_then(|history| history.push_state_with_url(&JsValue::NULL, title, url));
		if let Err(err) = pushed {
			tracing::warn!(error = ?err, "pushState failed");
		}
	}

	fn assign(&self, url: &str) {
		if let Err(err) = self.window.location().assign(url) {
			tracing::warn!(url, error = ?err, "navigation failed");
		}
	}

	fn replace(&self, url: &str) {
		if let Err(err) = self.window.location().replace(url) {
			tracing::warn!(url, error = ?err, "navigation failed");
		}
	}
}
