//! Runtime settings.
//!
//! Settings can be built in code or loaded from JSON or TOML:
//!
//! ```toml
//! serial_autoload = true
//! marker_attribute = "data-hyperbind"
//! max_redirects = 5
//!
//! [defaults]
//! serialMode = "force"
//! timeout = 10000
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{HyperbindError, Result};
use crate::options::DeclarativeOptions;

/// Default marker attribute for declarative bindings.
pub const DEFAULT_MARKER_ATTRIBUTE: &str = "data-hyperbind";

/// Default limit on followed redirects per request.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Dispatch autoloaded requests one at a time across the runtime.
	pub serial_autoload: bool,
	/// Attribute marking elements for declarative binding.
	pub marker_attribute: String,
	/// Maximum number of redirects followed for one request.
	pub max_redirects: usize,
	/// Defaults layered over the built-in option defaults.
	pub defaults: DeclarativeOptions,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			serial_autoload: true,
			marker_attribute: DEFAULT_MARKER_ATTRIBUTE.to_string(),
			max_redirects: DEFAULT_MAX_REDIRECTS,
			defaults: DeclarativeOptions::default(),
		}
	}
}

impl Settings {
	/// Parses settings from JSON.
	pub fn from_json_str(text: &str) -> Result<Self> {
		serde_json::from_str(text).map_err(|err| HyperbindError::Settings(err.to_string()))
	}

	/// Parses settings from TOML.
	pub fn from_toml_str(text: &str) -> Result<Self> {
		toml::from_str(text).map_err(|err| HyperbindError::Settings(err.to_string()))
	}
}
