//! The frozen option record consumed by the lifecycle controller.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;

use super::{RedirectMode, SerialMode};
use crate::action::Action;
use crate::selector::Selector;

/// Fully resolved options of a binding.
///
/// Produced by [`Options::freeze`](super::Options::freeze). A binding shares
/// its record behind an `Rc`, so a snapshot handed to a request stays valid
/// even if the binding is reconfigured meanwhile.
#[derive(Debug, Clone)]
pub struct ResolvedOptions<E> {
	/// Response action.
	pub action: Action<E>,
	/// Whether the binding requests on creation.
	pub autoload: bool,
	/// Extra request data, always a JSON object.
	pub data: Value,
	/// Parent binding selector.
	pub extend: Selector<E>,
	/// Response fragment filter.
	pub filter: Option<String>,
	/// Extra request headers.
	pub headers: BTreeMap<String, String>,
	/// Whether to push a history entry on success.
	pub history: bool,
	/// Whether to ask the server for header-reported redirects.
	pub intercept_redirect: bool,
	/// Explicit HTTP method; `None` falls back to the element.
	pub method: Option<http::Method>,
	/// Explicit trigger events; `None` falls back to the guessers.
	pub on: Option<String>,
	/// Whether to suppress the trigger event's default action.
	pub prevent_default: bool,
	/// Redirect policy.
	pub redirect_mode: RedirectMode,
	/// Concurrency policy.
	pub serial_mode: SerialMode,
	/// Form data source.
	pub source: Selector<E>,
	/// Response target.
	pub target: Selector<E>,
	/// Request timeout; zero disables it.
	pub timeout: Duration,
	/// Explicit URL; `None` falls back to the element.
	pub url: Option<String>,
}

impl<E> Default for ResolvedOptions<E> {
	fn default() -> Self {
		Self {
			action: Action::Fill,
			autoload: false,
			data: Value::Object(Default::default()),
			extend: Selector::Nothing,
			filter: None,
			headers: BTreeMap::new(),
			history: false,
			intercept_redirect: true,
			method: None,
			on: None,
			prevent_default: true,
			redirect_mode: RedirectMode::Follow,
			serial_mode: SerialMode::Async,
			source: Selector::Bound,
			target: Selector::Bound,
			timeout: Duration::ZERO,
			url: None,
		}
	}
}

impl<E> ResolvedOptions<E> {
	/// Trigger event names from the `on` option, if set.
	pub fn events(&self) -> Vec<&str> {
		self.on
			.as_deref()
			.map(|on| on.split_whitespace().collect())
			.unwrap_or_default()
	}
}
