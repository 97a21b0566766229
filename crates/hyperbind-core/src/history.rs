//! Browser history and navigation.

/// Access to the page location and session history.
pub trait History {
	/// Returns the current page URL.
	fn current_url(&self) -> String;

	/// Pushes a history entry. `url` of `None` keeps the current URL.
	fn push_state(&self, title: &str, url: Option<&str>);

	/// Navigates to `url`, adding a history entry.
	fn assign(&self, url: &str);

	/// Navigates to `url`, replacing the current history entry.
	fn replace(&self, url: &str);
}
