//! Error types for hyperbind.
//!
//! Only programming and configuration mistakes are reported through
//! [`HyperbindError`]. Transport failures never surface here; they are
//! delivered to listeners as `error`, `failure` or `timeout` events.

use thiserror::Error;

/// Result type used throughout hyperbind.
pub type Result<T> = std::result::Result<T, HyperbindError>;

/// Errors raised while configuring bindings or building requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HyperbindError {
	/// An option carried a value outside its accepted set.
	#[error("invalid value for option '{option}': {value}")]
	InvalidOption {
		/// Option name as written in declarative configuration.
		option: &'static str,
		/// The rejected value.
		value: String,
	},

	/// A selector string could not be understood.
	#[error("invalid selector '{0}'")]
	InvalidSelector(String),

	/// A dynamic option resolver failed.
	#[error("failed to resolve option '{option}': {message}")]
	Resolve {
		/// Option name.
		option: &'static str,
		/// Resolver-provided reason.
		message: String,
	},

	/// The declarative marker attribute did not contain valid JSON.
	#[error("malformed declarative configuration: {0}")]
	Declarative(#[from] serde_json::Error),

	/// Settings could not be parsed.
	#[error("invalid settings: {0}")]
	Settings(String),

	/// The HTTP method is not a valid token.
	#[error("invalid HTTP method '{0}'")]
	InvalidMethod(String),

	/// A header name or value could not be encoded.
	#[error("invalid header '{name}'")]
	InvalidHeader {
		/// Header name as configured.
		name: String,
	},

	/// A redirect chain exceeded the configured hop limit.
	#[error("redirect limit of {limit} exceeded at '{location}'")]
	RedirectLimit {
		/// Configured maximum number of followed redirects.
		limit: usize,
		/// Location that would have been requested next.
		location: String,
	},

	/// The platform lacks something hyperbind needs (e.g. no `window`).
	#[error("platform unavailable: {0}")]
	Platform(String),
}

impl HyperbindError {
	/// Creates an [`HyperbindError::InvalidOption`] error.
	pub fn invalid_option(option: &'static str, value: impl Into<String>) -> Self {
		Self::InvalidOption {
			option,
			value: value.into(),
		}
	}

	/// Creates a [`HyperbindError::Resolve`] error.
	pub fn resolve(option: &'static str, message: impl Into<String>) -> Self {
		Self::Resolve {
			option,
			message: message.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_error_display() {
		let err = HyperbindError::invalid_option("serialMode", "sometimes");
		assert_eq!(
			err.to_string(),
			"invalid value for option 'serialMode': sometimes"
		);

		let err = HyperbindError::RedirectLimit {
			limit: 3,
			location: "/loop".to_string(),
		};
		assert_eq!(err.to_string(), "redirect limit of 3 exceeded at '/loop'");
	}

	#[rstest]
	fn test_declarative_error_from_json() {
		let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
		let err: HyperbindError = json_err.into();
		assert!(matches!(err, HyperbindError::Declarative(_)));
	}
}
