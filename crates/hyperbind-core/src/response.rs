//! Response context handed to listeners and actions.

use http::{HeaderMap, StatusCode};

use crate::headers;

/// A redirect reported by the server through response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
	/// New location.
	pub location: String,
	/// Redirect status; 302 when the server did not say.
	pub status: StatusCode,
}

impl Redirect {
	/// Reads the redirect headers. A missing or unparsable status falls back
	/// to 302.
	pub fn from_headers(map: &HeaderMap) -> Option<Self> {
		let location = headers::text(map, headers::REDIRECT)?;
		let status = headers::text(map, headers::REDIRECT_STATUS)
			.and_then(|status| status.parse::<u16>().ok())
			.and_then(|status| StatusCode::from_u16(status).ok())
			.unwrap_or(StatusCode::FOUND);
		Some(Self { location, status })
	}

	/// Returns true when the follow-up request keeps the original method and
	/// payload (307 and 308).
	pub fn preserves_method(&self) -> bool {
		matches!(
			self.status,
			StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
		)
	}
}

/// Everything known about a received response.
#[derive(Debug, Clone)]
pub struct ResponseContext<E> {
	/// HTTP status.
	pub status: StatusCode,
	/// Raw body.
	pub body: String,
	/// Parsed (and filtered) content nodes.
	pub content: Vec<E>,
	/// Resolved target elements.
	pub targets: Vec<E>,
	/// Reported redirect, if any.
	pub redirect: Option<Redirect>,
	/// Title override for history entries.
	pub title: Option<String>,
	/// URL override for history entries.
	pub url: Option<String>,
	headers: HeaderMap,
}

impl<E> ResponseContext<E> {
	pub(crate) fn new(status: StatusCode, headers: HeaderMap, body: String) -> Self {
		Self {
			status,
			redirect: Redirect::from_headers(&headers),
			title: headers::text(&headers, headers::TITLE),
			url: headers::text(&headers, headers::URL),
			body,
			content: Vec::new(),
			targets: Vec::new(),
			headers,
		}
	}

	/// Reads an arbitrary response header.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}

	/// All response headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Returns true for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use http::header::{HeaderName, HeaderValue};
	use rstest::rstest;

	fn with_headers(pairs: &[(&str, &str)]) -> HeaderMap {
		let mut map = HeaderMap::new();
		for (name, value) in pairs {
			map.insert(
				HeaderName::from_bytes(name.as_bytes()).unwrap(),
				HeaderValue::from_str(value).unwrap(),
			);
		}
		map
	}

	#[rstest]
	#[case(&[("Hyperbind-Redirect", "/next")], StatusCode::FOUND, false)]
	#[case(&[("Hyperbind-Redirect", "/next"), ("Hyperbind-Redirect-Status", "303")], StatusCode::SEE_OTHER, false)]
	#[case(&[("Hyperbind-Redirect", "/next"), ("Hyperbind-Redirect-Status", "307")], StatusCode::TEMPORARY_REDIRECT, true)]
	#[case(&[("Hyperbind-Redirect", "/next"), ("Hyperbind-Redirect-Status", "308")], StatusCode::PERMANENT_REDIRECT, true)]
	#[case(&[("Hyperbind-Redirect", "/next"), ("Hyperbind-Redirect-Status", "soon")], StatusCode::FOUND, false)]
	fn test_redirect_status(
		#[case] pairs: &[(&str, &str)],
		#[case] status: StatusCode,
		#[case] preserves: bool,
	) {
		let redirect = Redirect::from_headers(&with_headers(pairs)).unwrap();
		assert_eq!(redirect.location, "/next");
		assert_eq!(redirect.status, status);
		assert_eq!(redirect.preserves_method(), preserves);
	}

	#[rstest]
	fn test_context_reads_history_headers() {
		let map = with_headers(&[("Hyperbind-Title", "Page 2"), ("X-Custom", "yes")]);
		let context: ResponseContext<u32> = ResponseContext::new(StatusCode::OK, map, "<p></p>".into());

		assert!(context.redirect.is_none());
		assert_eq!(context.title.as_deref(), Some("Page 2"));
		assert!(context.url.is_none());
		assert_eq!(context.header("x-custom"), Some("yes"));
		assert!(context.is_success());
	}
}
