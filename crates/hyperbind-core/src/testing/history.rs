//! Recorded history and navigation.

use std::cell::RefCell;

use crate::history::History;

/// A `push_state` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
	/// Title passed along.
	pub title: String,
	/// URL pushed, if any.
	pub url: Option<String>,
}

/// A full-page navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
	/// `location.assign`.
	Assign(String),
	/// `location.replace`.
	Replace(String),
}

/// Records history entries and navigations instead of performing them.
#[derive(Debug)]
pub struct MockHistory {
	url: RefCell<String>,
	entries: RefCell<Vec<HistoryEntry>>,
	navigations: RefCell<Vec<Navigation>>,
}

impl Default for MockHistory {
	fn default() -> Self {
		Self {
			url: RefCell::new("http://localhost/".to_string()),
			entries: RefCell::new(Vec::new()),
			navigations: RefCell::new(Vec::new()),
		}
	}
}

impl MockHistory {
	/// Starts at `http://localhost/`.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the current URL.
	pub fn set_url(&self, url: &str) {
		*self.url.borrow_mut() = url.to_string();
	}

	/// Entries pushed so far.
	pub fn entries(&self) -> Vec<HistoryEntry> {
		self.entries.borrow().clone()
	}

	/// Navigations performed so far.
	pub fn navigations(&self) -> Vec<Navigation> {
		self.navigations.borrow().clone()
	}
}

impl History for MockHistory {
	fn current_url(&self) -> String {
		self.url.borrow().clone()
	}

	fn push_state(&self, title: &str, url: Option<&str>) {
		if let Some(url) = url {
			self.set_url(url);
		}
		self.entries.borrow_mut().push(HistoryEntry {
			title: title.to_string(),
			url: url.map(str::to_string),
		});
	}

	fn assign(&self, url: &str) {
		self.set_url(url);
		self.navigations.borrow_mut().push(Navigation::Assign(url.to_string()));
	}

	fn replace(&self, url: &str) {
		self.set_url(url);
		self.navigations.borrow_mut().push(Navigation::Replace(url.to_string()));
	}
}
