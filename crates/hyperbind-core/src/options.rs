//! Binding options and their resolution.
//!
//! ## Layers
//!
//! The effective configuration of a request is assembled from up to five
//! layers, later layers winning on collision:
//!
//! ```text
//! built-in defaults < runtime defaults < inherited parent options
//!                   < binding options  < per-call overrides
//! ```
//!
//! Mapping values (`data`, `headers`) merge recursively; everything else
//! replaces. Each layer is an [`Options`] value whose fields are either
//! unset, a literal, or a resolver function of the bound element. A
//! resolution pass ([`Options::resolve`]) turns every resolver into a
//! literal, and [`Options::freeze`] produces the immutable
//! [`ResolvedOptions`] used by the lifecycle controller.
//!
//! ## Example
//!
//! ```ignore
//! use hyperbind_core::{Options, SerialMode};
//! use serde_json::json;
//!
//! let options = Options::new()
//!     .url("/search")
//!     .serial_mode(SerialMode::Force)
//!     .target("#results")
//!     .data(json!({"filter": {"tag": "rust"}}))
//!     .url_with(|element| Ok(format!("/items/{:?}", element)));
//! ```

mod declarative;
mod merge;
mod resolved;
mod value;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::Action;
use crate::error::{HyperbindError, Result};
use crate::selector::Selector;

pub use declarative::DeclarativeOptions;
pub use merge::{deep_merge, merge_headers};
pub use resolved::ResolvedOptions;
pub use value::{OptionValue, ResolverFn};

/// Option keys that are never inherited through `extend`.
pub const NON_INHERITED_OPTIONS: [&str; 4] = ["autoload", "extend", "on", "preventDefault"];

/// Concurrency policy for repeated triggers on one binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialMode {
	/// Every invocation proceeds; requests may overlap.
	#[default]
	Async,
	/// Invocations are ignored while a request is in flight.
	#[serde(alias = "ignore")]
	Lock,
	/// Invocations abort every in-flight request first.
	#[serde(alias = "propel")]
	Force,
	/// Invocations wait in FIFO order for the previous request to finish.
	#[serde(alias = "defer")]
	Queue,
}

impl FromStr for SerialMode {
	type Err = HyperbindError;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"async" => Ok(Self::Async),
			"lock" | "ignore" => Ok(Self::Lock),
			"force" | "propel" => Ok(Self::Force),
			"queue" | "defer" => Ok(Self::Queue),
			other => Err(HyperbindError::invalid_option("serialMode", other)),
		}
	}
}

/// Policy for a server-signalled redirect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectMode {
	/// Re-request the new location through the same binding.
	#[default]
	Follow,
	/// Navigate the browser, adding a history entry.
	Assign,
	/// Navigate the browser, replacing the current history entry.
	Replace,
}

impl FromStr for RedirectMode {
	type Err = HyperbindError;

	fn from_str(s: &str) -> Result<Self> {
		match s {
			"follow" => Ok(Self::Follow),
			"assign" => Ok(Self::Assign),
			"replace" => Ok(Self::Replace),
			other => Err(HyperbindError::invalid_option("redirectMode", other)),
		}
	}
}

type Field<T, E> = Option<OptionValue<T, E>>;

/// One layer of binding configuration.
///
/// Unset fields fall through to earlier layers and finally to the built-in
/// defaults. Empty strings for `url`, `method`, `on` and `filter` mean
/// "not specified".
pub struct Options<E> {
	pub(crate) action: Field<Action<E>, E>,
	pub(crate) autoload: Field<bool, E>,
	pub(crate) data: Field<Value, E>,
	pub(crate) extend: Field<Selector<E>, E>,
	pub(crate) filter: Field<String, E>,
	pub(crate) headers: Field<BTreeMap<String, String>, E>,
	pub(crate) history: Field<bool, E>,
	pub(crate) intercept_redirect: Field<bool, E>,
	pub(crate) method: Field<String, E>,
	pub(crate) on: Field<String, E>,
	pub(crate) prevent_default: Field<bool, E>,
	pub(crate) redirect_mode: Field<RedirectMode, E>,
	pub(crate) serial_mode: Field<SerialMode, E>,
	pub(crate) source: Field<Selector<E>, E>,
	pub(crate) target: Field<Selector<E>, E>,
	pub(crate) timeout: Field<Duration, E>,
	pub(crate) url: Field<String, E>,
}

impl<E> Default for Options<E> {
	fn default() -> Self {
		Self {
			action: None,
			autoload: None,
			data: None,
			extend: None,
			filter: None,
			headers: None,
			history: None,
			intercept_redirect: None,
			method: None,
			on: None,
			prevent_default: None,
			redirect_mode: None,
			serial_mode: None,
			source: None,
			target: None,
			timeout: None,
			url: None,
		}
	}
}

impl<E: Clone> Clone for Options<E> {
	fn clone(&self) -> Self {
		Self {
			action: self.action.clone(),
			autoload: self.autoload.clone(),
			data: self.data.clone(),
			extend: self.extend.clone(),
			filter: self.filter.clone(),
			headers: self.headers.clone(),
			history: self.history.clone(),
			intercept_redirect: self.intercept_redirect.clone(),
			method: self.method.clone(),
			on: self.on.clone(),
			prevent_default: self.prevent_default.clone(),
			redirect_mode: self.redirect_mode.clone(),
			serial_mode: self.serial_mode.clone(),
			source: self.source.clone(),
			target: self.target.clone(),
			timeout: self.timeout.clone(),
			url: self.url.clone(),
		}
	}
}

impl<E: fmt::Debug> fmt::Debug for Options<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Options")
			.field("action", &self.action)
			.field("autoload", &self.autoload)
			.field("data", &self.data)
			.field("extend", &self.extend)
			.field("filter", &self.filter)
			.field("headers", &self.headers)
			.field("history", &self.history)
			.field("intercept_redirect", &self.intercept_redirect)
			.field("method", &self.method)
			.field("on", &self.on)
			.field("prevent_default", &self.prevent_default)
			.field("redirect_mode", &self.redirect_mode)
			.field("serial_mode", &self.serial_mode)
			.field("source", &self.source)
			.field("target", &self.target)
			.field("timeout", &self.timeout)
			.field("url", &self.url)
			.finish()
	}
}

macro_rules! option_setters {
	($( $(#[$doc:meta])* $field:ident / $with:ident : $ty:ty ),* $(,)?) => {
		$(
			$(#[$doc])*
			pub fn $field(mut self, value: impl Into<$ty>) -> Self {
				self.$field = Some(OptionValue::Literal(value.into()));
				self
			}

			#[doc = concat!("Computes `", stringify!($field), "` from the bound element.")]
			pub fn $with<F>(mut self, resolver: F) -> Self
			where
				F: Fn(&E) -> Result<$ty> + 'static,
			{
				self.$field = Some(OptionValue::resolver(resolver));
				self
			}
		)*
	};
}

fn overlay<T, E>(base: &mut Field<T, E>, value: Field<T, E>) {
	if value.is_some() {
		*base = value;
	}
}

fn literal<T: Clone, E>(field: &Field<T, E>, element: &E) -> Result<Field<T, E>> {
	field
		.as_ref()
		.map(|value| value.into_literal(element))
		.transpose()
}

fn evaluate<T: Clone, E>(field: &Field<T, E>, element: &E, default: T) -> Result<T> {
	match field {
		Some(value) => value.evaluate(element),
		None => Ok(default),
	}
}

impl<E: Clone + 'static> Options<E> {
	/// Creates an empty layer.
	pub fn new() -> Self {
		Self::default()
	}

	option_setters! {
		/// Sets the response action.
		action / action_with: Action<E>,
		/// Requests automatically once the binding is created.
		autoload / autoload_with: bool,
		/// Extra request data; nested objects flatten to `a[b]` keys.
		data / data_with: Value,
		/// Parent binding whose options are inherited.
		extend / extend_with: Selector<E>,
		/// Narrows the response fragment to matching nodes.
		filter / filter_with: String,
		/// Replaces the extra request headers.
		headers / headers_with: BTreeMap<String, String>,
		/// Pushes a history entry after a successful response.
		history / history_with: bool,
		/// Asks the server to report redirects through headers.
		intercept_redirect / intercept_redirect_with: bool,
		/// HTTP method (case-insensitive).
		method / method_with: String,
		/// Triggering DOM event(s), space separated.
		on / on_with: String,
		/// Suppresses the trigger event's default action.
		prevent_default / prevent_default_with: bool,
		/// Redirect handling policy.
		redirect_mode / redirect_mode_with: RedirectMode,
		/// Concurrency policy.
		serial_mode / serial_mode_with: SerialMode,
		/// Elements whose form fields are submitted.
		source / source_with: Selector<E>,
		/// Elements the response is applied to.
		target / target_with: Selector<E>,
		/// Request timeout; zero disables it.
		timeout / timeout_with: Duration,
		/// Request URL.
		url / url_with: String,
	}

	/// Sets an inline custom action.
	pub fn custom_action<F>(self, action: F) -> Self
	where
		F: Fn(&[E], &[E]) + 'static,
	{
		self.action(Action::custom(action))
	}

	/// Adds a single request header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		let mut headers = match self.headers.take() {
			Some(OptionValue::Literal(headers)) => headers,
			_ => BTreeMap::new(),
		};
		headers.insert(name.into(), value.into());
		self.headers = Some(OptionValue::Literal(headers));
		self
	}

	/// Returns true if no field is set.
	pub fn is_empty(&self) -> bool {
		self.action.is_none()
			&& self.autoload.is_none()
			&& self.data.is_none()
			&& self.extend.is_none()
			&& self.filter.is_none()
			&& self.headers.is_none()
			&& self.history.is_none()
			&& self.intercept_redirect.is_none()
			&& self.method.is_none()
			&& self.on.is_none()
			&& self.prevent_default.is_none()
			&& self.redirect_mode.is_none()
			&& self.serial_mode.is_none()
			&& self.source.is_none()
			&& self.target.is_none()
			&& self.timeout.is_none()
			&& self.url.is_none()
	}

	/// Returns the `extend` field of this layer.
	pub fn extend_selector(&self) -> Option<&OptionValue<Selector<E>, E>> {
		self.extend.as_ref()
	}

	/// Layers `other` on top of `self`.
	///
	/// `data` and `headers` literals merge recursively; any other set field
	/// of `other` replaces the one in `self`.
	pub fn merge(mut self, other: Self) -> Self {
		match (&mut self.data, other.data) {
			(Some(OptionValue::Literal(base)), Some(OptionValue::Literal(top))) => {
				deep_merge(base, top);
			}
			(base, top) => overlay(base, top),
		}
		match (&mut self.headers, other.headers) {
			(Some(OptionValue::Literal(base)), Some(OptionValue::Literal(top))) => {
				merge_headers(base, top);
			}
			(base, top) => overlay(base, top),
		}
		overlay(&mut self.action, other.action);
		overlay(&mut self.autoload, other.autoload);
		overlay(&mut self.extend, other.extend);
		overlay(&mut self.filter, other.filter);
		overlay(&mut self.history, other.history);
		overlay(&mut self.intercept_redirect, other.intercept_redirect);
		overlay(&mut self.method, other.method);
		overlay(&mut self.on, other.on);
		overlay(&mut self.prevent_default, other.prevent_default);
		overlay(&mut self.redirect_mode, other.redirect_mode);
		overlay(&mut self.serial_mode, other.serial_mode);
		overlay(&mut self.source, other.source);
		overlay(&mut self.target, other.target);
		overlay(&mut self.timeout, other.timeout);
		overlay(&mut self.url, other.url);
		self
	}

	/// Returns a copy without the options listed in
	/// [`NON_INHERITED_OPTIONS`].
	pub fn inheritable(&self) -> Self {
		Self {
			autoload: None,
			extend: None,
			on: None,
			prevent_default: None,
			..self.clone()
		}
	}

	/// Runs every resolver against `element`, returning a literal-only layer.
	///
	/// # Errors
	///
	/// Propagates the first resolver failure.
	pub fn resolve(&self, element: &E) -> Result<Self> {
		Ok(Self {
			action: literal(&self.action, element)?,
			autoload: literal(&self.autoload, element)?,
			data: literal(&self.data, element)?,
			extend: literal(&self.extend, element)?,
			filter: literal(&self.filter, element)?,
			headers: literal(&self.headers, element)?,
			history: literal(&self.history, element)?,
			intercept_redirect: literal(&self.intercept_redirect, element)?,
			method: literal(&self.method, element)?,
			on: literal(&self.on, element)?,
			prevent_default: literal(&self.prevent_default, element)?,
			redirect_mode: literal(&self.redirect_mode, element)?,
			serial_mode: literal(&self.serial_mode, element)?,
			source: literal(&self.source, element)?,
			target: literal(&self.target, element)?,
			timeout: literal(&self.timeout, element)?,
			url: literal(&self.url, element)?,
		})
	}

	/// Produces the frozen configuration, filling unset fields with the
	/// built-in defaults.
	///
	/// # Errors
	///
	/// Fails on resolver errors, an invalid HTTP method, or a `data` value
	/// that is not an object.
	pub fn freeze(&self, element: &E) -> Result<ResolvedOptions<E>> {
		let data = evaluate(&self.data, element, Value::Object(Default::default()))?;
		let data = match data {
			Value::Null => Value::Object(Default::default()),
			Value::Object(_) => data,
			other => return Err(HyperbindError::invalid_option("data", other.to_string())),
		};

		let method = evaluate(&self.method, element, String::new())?;
		let method = if method.trim().is_empty() {
			None
		} else {
			let upper = method.trim().to_ascii_uppercase();
			Some(
				http::Method::from_bytes(upper.as_bytes())
					.map_err(|_| HyperbindError::InvalidMethod(method.clone()))?,
			)
		};

		let non_empty = |value: String| {
			let trimmed = value.trim();
			(!trimmed.is_empty()).then(|| trimmed.to_string())
		};

		let base = ResolvedOptions::default();
		Ok(ResolvedOptions {
			action: evaluate(&self.action, element, base.action)?,
			autoload: evaluate(&self.autoload, element, base.autoload)?,
			data,
			extend: evaluate(&self.extend, element, base.extend)?,
			filter: non_empty(evaluate(&self.filter, element, String::new())?),
			headers: evaluate(&self.headers, element, base.headers)?,
			history: evaluate(&self.history, element, base.history)?,
			intercept_redirect: evaluate(&self.intercept_redirect, element, base.intercept_redirect)?,
			method,
			on: non_empty(evaluate(&self.on, element, String::new())?),
			prevent_default: evaluate(&self.prevent_default, element, base.prevent_default)?,
			redirect_mode: evaluate(&self.redirect_mode, element, base.redirect_mode)?,
			serial_mode: evaluate(&self.serial_mode, element, base.serial_mode)?,
			source: evaluate(&self.source, element, base.source)?,
			target: evaluate(&self.target, element, base.target)?,
			timeout: evaluate(&self.timeout, element, base.timeout)?,
			url: non_empty(evaluate(&self.url, element, String::new())?),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;
	use std::cell::Cell;
	use std::rc::Rc;

	#[rstest]
	fn test_later_layer_wins() {
		let base: Options<u32> = Options::new().url("/a").method("post").history(true);
		let top = Options::new().url("/b");
		let merged = base.merge(top).freeze(&0).unwrap();

		assert_eq!(merged.url.as_deref(), Some("/b"));
		assert_eq!(merged.method, Some(http::Method::POST));
		assert!(merged.history);
	}

	#[rstest]
	fn test_data_and_headers_deep_merge() {
		let base: Options<u32> = Options::new()
			.data(json!({"a": {"b": 1}, "x": 1}))
			.header("X-One", "1");
		let top = Options::new().data(json!({"a": {"c": 2}})).header("X-Two", "2");
		let merged = base.merge(top).freeze(&0).unwrap();

		assert_eq!(merged.data, json!({"a": {"b": 1, "c": 2}, "x": 1}));
		assert_eq!(merged.headers.len(), 2);
	}

	#[rstest]
	fn test_resolver_replaces_literal_data() {
		let base: Options<u32> = Options::new().data(json!({"a": 1}));
		let top = Options::new().data_with(|id: &u32| Ok(json!({"id": id})));
		let merged = base.merge(top).freeze(&9).unwrap();
		assert_eq!(merged.data, json!({"id": 9}));
	}

	#[rstest]
	fn test_builtin_defaults() {
		let resolved = Options::<u32>::new().freeze(&0).unwrap();

		assert!(matches!(resolved.action, Action::Fill));
		assert!(!resolved.autoload);
		assert_eq!(resolved.data, json!({}));
		assert!(resolved.filter.is_none());
		assert!(resolved.intercept_redirect);
		assert!(resolved.method.is_none());
		assert!(resolved.on.is_none());
		assert!(resolved.prevent_default);
		assert_eq!(resolved.redirect_mode, RedirectMode::Follow);
		assert_eq!(resolved.serial_mode, SerialMode::Async);
		assert!(resolved.source.is_bound());
		assert!(resolved.target.is_bound());
		assert_eq!(resolved.timeout, Duration::ZERO);
		assert!(resolved.url.is_none());
	}

	#[rstest]
	fn test_inheritable_strips_non_inherited_keys() {
		let parent: Options<u32> = Options::new()
			.autoload(true)
			.on("click")
			.prevent_default(false)
			.extend("#grandparent")
			.url("/parent");
		let inherited = parent.inheritable();

		assert!(inherited.autoload.is_none());
		assert!(inherited.on.is_none());
		assert!(inherited.prevent_default.is_none());
		assert!(inherited.extend.is_none());
		assert!(inherited.url.is_some());
	}

	#[rstest]
	fn test_resolve_runs_each_resolver_once() {
		let calls = Rc::new(Cell::new(0));
		let options: Options<u32> = Options::new().url_with({
			let calls = Rc::clone(&calls);
			move |id| {
				calls.set(calls.get() + 1);
				Ok(format!("/items/{}", id))
			}
		});

		let literal = options.resolve(&3).unwrap();
		assert_eq!(calls.get(), 1);

		literal.freeze(&3).unwrap();
		literal.freeze(&3).unwrap();
		assert_eq!(calls.get(), 1);
	}

	#[rstest]
	fn test_invalid_method_rejected() {
		let err = Options::<u32>::new().method("GE T").freeze(&0).unwrap_err();
		assert!(matches!(err, HyperbindError::InvalidMethod(_)));
	}

	#[rstest]
	fn test_scalar_data_rejected() {
		let err = Options::<u32>::new().data(json!(5)).freeze(&0).unwrap_err();
		assert!(matches!(err, HyperbindError::InvalidOption { option: "data", .. }));
	}

	#[rstest]
	#[case("async", SerialMode::Async)]
	#[case("lock", SerialMode::Lock)]
	#[case("ignore", SerialMode::Lock)]
	#[case("force", SerialMode::Force)]
	#[case("propel", SerialMode::Force)]
	#[case("queue", SerialMode::Queue)]
	#[case("defer", SerialMode::Queue)]
	fn test_serial_mode_names(#[case] name: &str, #[case] expected: SerialMode) {
		assert_eq!(name.parse::<SerialMode>().unwrap(), expected);
	}
}
