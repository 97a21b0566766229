//! Conventional header names exchanged with the server.

use std::collections::BTreeMap;

use http::header::{HeaderMap, HeaderName, HeaderValue};

/// Marker header identifying a hyperbind request.
pub const MARKER: &str = "Hyperbind";
/// Legacy AJAX marker header.
pub const REQUESTED_WITH: &str = "X-Requested-With";
/// Asks the server to report redirects through [`REDIRECT`] instead of a 3xx.
pub const INTERCEPT_REDIRECT: &str = "Hyperbind-Intercept-Redirect";
/// Redirect location reported by the server.
pub const REDIRECT: &str = "Hyperbind-Redirect";
/// Status code of the reported redirect (defaults to 302).
pub const REDIRECT_STATUS: &str = "Hyperbind-Redirect-Status";
/// Title used for the pushed history entry.
pub const TITLE: &str = "Hyperbind-Title";
/// URL used for the pushed history entry.
pub const URL: &str = "Hyperbind-Url";

/// Builds the outgoing header map.
///
/// Custom headers come first; the marker headers are always present and
/// override custom headers of the same name. Names or values that are not
/// valid HTTP are skipped with a warning.
pub fn request_headers(custom: &BTreeMap<String, String>, intercept_redirect: bool) -> HeaderMap {
	let mut map = HeaderMap::new();
	for (name, value) in custom {
		match (
			HeaderName::from_bytes(name.as_bytes()),
			HeaderValue::from_str(value),
		) {
			(Ok(name), Ok(value)) => {
				map.insert(name, value);
			}
			_ => tracing::warn!(header = %name, "skipping invalid request header"),
		}
	}
	map.insert(HeaderName::from_static("hyperbind"), HeaderValue::from_static("1"));
	map.insert(
		HeaderName::from_static("x-requested-with"),
		HeaderValue::from_static("XMLHttpRequest"),
	);
	if intercept_redirect {
		map.insert(
			HeaderName::from_static("hyperbind-intercept-redirect"),
			HeaderValue::from_static("1"),
		);
	}
	map
}

/// Reads a header as text; missing, empty or non-UTF-8 values yield `None`.
pub fn text(headers: &HeaderMap, name: &str) -> Option<String> {
	headers
		.get(name)
		.and_then(|value| value.to_str().ok())
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(str::to_string)
}
