//! JSON form of binding options, as written in the marker attribute or in
//! settings files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Options, RedirectMode, SerialMode};
use crate::action::Action;
use crate::error::{HyperbindError, Result};
use crate::selector::Selector;

/// Serializable binding options.
///
/// Keys use camelCase (`serialMode`, `preventDefault`, ...). The timeout is
/// given in milliseconds. Header values may be any JSON scalar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeclarativeOptions {
	/// Action name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub action: Option<String>,
	/// Autoload flag.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub autoload: Option<bool>,
	/// Extra request data.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	/// Parent selector.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub extend: Option<String>,
	/// Response filter.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub filter: Option<String>,
	/// Extra request headers.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub headers: Option<BTreeMap<String, Value>>,
	/// History flag.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub history: Option<bool>,
	/// Redirect interception flag.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub intercept_redirect: Option<bool>,
	/// HTTP method.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub method: Option<String>,
	/// Trigger events.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub on: Option<String>,
	/// Default-action suppression flag.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub prevent_default: Option<bool>,
	/// Redirect policy.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub redirect_mode: Option<RedirectMode>,
	/// Concurrency policy.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub serial_mode: Option<SerialMode>,
	/// Form data source selector.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub source: Option<String>,
	/// Response target selector.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target: Option<String>,
	/// Timeout in milliseconds.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timeout: Option<u64>,
	/// Request URL.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

fn header_value(name: &str, value: Value) -> Result<Option<String>> {
	match value {
		Value::Null => Ok(None),
		Value::String(text) => Ok(Some(text)),
		Value::Bool(_) | Value::Number(_) => Ok(Some(value.to_string())),
		_ => Err(HyperbindError::InvalidHeader {
			name: name.to_string(),
		}),
	}
}

impl DeclarativeOptions {
	/// Converts into a literal [`Options`] layer.
	///
	/// # Errors
	///
	/// Fails when a header value is an array or object.
	pub fn into_options<E: Clone + 'static>(self) -> Result<Options<E>> {
		let mut options = Options::new();
		if let Some(action) = self.action {
			options = options.action(Action::parse(&action));
		}
		if let Some(autoload) = self.autoload {
			options = options.autoload(autoload);
		}
		if let Some(data) = self.data {
			options = options.data(data);
		}
		if let Some(extend) = self.extend {
			options = options.extend(Selector::parse(&extend));
		}
		if let Some(filter) = self.filter {
			options = options.filter(filter);
		}
		if let Some(headers) = self.headers {
			let mut converted = BTreeMap::new();
			for (name, value) in headers {
				if let Some(value) = header_value(&name, value)? {
					converted.insert(name, value);
				}
			}
			options = options.headers(converted);
		}
		if let Some(history) = self.history {
			options = options.history(history);
		}
		if let Some(intercept) = self.intercept_redirect {
			options = options.intercept_redirect(intercept);
		}
		if let Some(method) = self.method {
			options = options.method(method);
		}
		if let Some(on) = self.on {
			options = options.on(on);
		}
		if let Some(prevent) = self.prevent_default {
			options = options.prevent_default(prevent);
		}
		if let Some(mode) = self.redirect_mode {
			options = options.redirect_mode(mode);
		}
		if let Some(mode) = self.serial_mode {
			options = options.serial_mode(mode);
		}
		if let Some(source) = self.source {
			options = options.source(Selector::parse(&source));
		}
		if let Some(target) = self.target {
			options = options.target(Selector::parse(&target));
		}
		if let Some(timeout) = self.timeout {
			options = options.timeout(Duration::from_millis(timeout));
		}
		if let Some(url) = self.url {
			options = options.url(url);
		}
		Ok(options)
	}
}

impl<E: Clone + 'static> Options<E> {
	/// Builds a layer from declarative JSON.
	///
	/// `true` and `null` mean "bind with defaults"; an object is read as
	/// [`DeclarativeOptions`].
	///
	/// # Errors
	///
	/// Fails on any other JSON type or on an object that does not match
	/// [`DeclarativeOptions`].
	pub fn from_json(value: &Value) -> Result<Self> {
		match value {
			Value::Null | Value::Bool(true) => Ok(Self::new()),
			Value::Object(_) => {
				let declarative: DeclarativeOptions = serde_json::from_value(value.clone())?;
				declarative.into_options()
			}
			other => Err(HyperbindError::invalid_option("options", other.to_string())),
		}
	}

	/// Parses the marker attribute text. Empty text means defaults.
	///
	/// # Errors
	///
	/// See [`Options::from_json`].
	pub fn from_json_str(text: &str) -> Result<Self> {
		if text.trim().is_empty() {
			return Ok(Self::new());
		}
		let value: Value = serde_json::from_str(text)?;
		Self::from_json(&value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_object_maps_every_key() {
		let options: Options<u32> = Options::from_json_str(
			r##"{
				"url": "/save",
				"method": "put",
				"serialMode": "queue",
				"redirectMode": "replace",
				"target": "closest(section)",
				"filter": ".result",
				"timeout": 1500,
				"preventDefault": false,
				"headers": {"X-Page": 3, "X-Flag": true, "X-Name": "a"},
				"data": {"a": {"b": 1}}
			}"##,
		)
		.unwrap();
		let resolved = options.freeze(&0).unwrap();

		assert_eq!(resolved.url.as_deref(), Some("/save"));
		assert_eq!(resolved.method, Some(http::Method::PUT));
		assert_eq!(resolved.serial_mode, SerialMode::Queue);
		assert_eq!(resolved.redirect_mode, RedirectMode::Replace);
		assert!(matches!(resolved.target, Selector::Relative { ref method, .. } if method == "closest"));
		assert_eq!(resolved.filter.as_deref(), Some(".result"));
		assert_eq!(resolved.timeout, Duration::from_millis(1500));
		assert!(!resolved.prevent_default);
		assert_eq!(resolved.headers["X-Page"], "3");
		assert_eq!(resolved.headers["X-Flag"], "true");
		assert_eq!(resolved.data, json!({"a": {"b": 1}}));
	}

	#[rstest]
	#[case("")]
	#[case("true")]
	#[case("null")]
	fn test_defaults_markers(#[case] text: &str) {
		let resolved = Options::<u32>::from_json_str(text).unwrap().freeze(&0).unwrap();
		assert!(resolved.url.is_none());
		assert!(resolved.prevent_default);
	}

	#[rstest]
	#[case("{")]
	#[case("[1, 2]")]
	#[case(r#"{"serialMode": "sometimes"}"#)]
	#[case(r#"{"headers": {"X-A": [1]}}"#)]
	fn test_malformed_rejected(#[case] text: &str) {
		assert!(Options::<u32>::from_json_str(text).is_err());
	}
}
