//! Request payload construction.
//!
//! Option data is a JSON object flattened with bracket notation, the way
//! PHP and Rails style backends expect it:
//!
//! | data                       | pairs                         |
//! |----------------------------|-------------------------------|
//! | `{"a": {"b": 1}}`          | `a[b]=1`                      |
//! | `{"tags": ["x", "y"]}`     | `tags[]=x`, `tags[]=y`        |
//! | `{"rows": [{"id": 1}]}`    | `rows[0][id]=1`               |
//! | `{"empty": null}`          | `empty=`                      |

use serde_json::Value;

use crate::dom::{FormEntry, FormValue};
use crate::headers;
use crate::request::PendingRequest;
use crate::transport::{Body, TransportRequest};

/// Flattens a JSON object into name/value pairs.
pub fn flatten(data: &Value) -> Vec<(String, String)> {
	let mut pairs = Vec::new();
	if let Value::Object(map) = data {
		for (key, value) in map {
			flatten_into(key.clone(), value, &mut pairs);
		}
	}
	pairs
}

fn is_scalar(value: &Value) -> bool {
	!matches!(value, Value::Array(_) | Value::Object(_))
}

fn flatten_into(prefix: String, value: &Value, pairs: &mut Vec<(String, String)>) {
	match value {
		Value::Object(map) => {
			for (key, nested) in map {
				flatten_into(format!("{}[{}]", prefix, key), nested, pairs);
			}
		}
		Value::Array(items) if items.iter().all(is_scalar) => {
			for item in items {
				flatten_into(format!("{}[]", prefix), item, pairs);
			}
		}
		Value::Array(items) => {
			for (index, item) in items.iter().enumerate() {
				flatten_into(format!("{}[{}]", prefix, index), item, pairs);
			}
		}
		Value::Null => pairs.push((prefix, String::new())),
		Value::String(text) => pairs.push((prefix, text.clone())),
		Value::Bool(_) | Value::Number(_) => pairs.push((prefix, value.to_string())),
	}
}

/// Appends url-encoded pairs to a URL, keeping any existing query string
/// and fragment.
pub fn append_query(url: &str, pairs: &[(String, String)]) -> String {
	if pairs.is_empty() {
		return url.to_string();
	}
	let encoded = match serde_urlencoded::to_string(pairs) {
		Ok(encoded) => encoded,
		Err(err) => {
			tracing::warn!(error = %err, "failed to encode query string");
			return url.to_string();
		}
	};
	let (base, fragment) = match url.find('#') {
		Some(index) => url.split_at(index),
		None => (url, ""),
	};
	let separator = if !base.contains('?') {
		"?"
	} else if base.ends_with('?') || base.ends_with('&') {
		""
	} else {
		"&"
	};
	format!("{}{}{}{}", base, separator, encoded, fragment)
}

fn carries_query(method: &http::Method) -> bool {
	*method == http::Method::GET || *method == http::Method::HEAD
}

/// Converts a pending request into the transport request.
///
/// GET and HEAD requests carry text entries in the query string (file
/// entries are dropped with a warning); every other method sends a
/// multipart body.
pub fn build<F>(pending: PendingRequest<F>) -> TransportRequest<F> {
	let headers = headers::request_headers(&pending.headers, pending.intercept_redirect);
	let timeout = (!pending.timeout.is_zero()).then_some(pending.timeout);

	if carries_query(&pending.method) {
		let mut pairs = Vec::with_capacity(pending.data.len());
		for entry in pending.data {
			match entry.value {
				FormValue::Text(text) => pairs.push((entry.name, text)),
				FormValue::File(_) => {
					tracing::warn!(field = %entry.name, method = %pending.method, "file fields cannot be sent in a query string");
				}
			}
		}
		TransportRequest {
			url: append_query(&pending.url, &pairs),
			method: pending.method,
			headers,
			timeout,
			body: Body::Empty,
		}
	} else {
		TransportRequest {
			url: pending.url,
			method: pending.method,
			headers,
			timeout,
			body: Body::Multipart(pending.data),
		}
	}
}

/// Turns flattened pairs into text form entries.
pub fn entries<F>(pairs: Vec<(String, String)>) -> Vec<FormEntry<F>> {
	pairs
		.into_iter()
		.map(|(name, value)| FormEntry::text(name, value))
		.collect()
}
