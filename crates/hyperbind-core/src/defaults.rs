//! Runtime-wide default options.

use std::cell::RefCell;

use crate::options::Options;

/// How [`DefaultsStore::set`] combines new defaults with the current ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeMode {
	/// Layer the new options over the current defaults.
	#[default]
	Deep,
	/// Discard the current defaults.
	Replace,
}

/// Default options applied beneath every binding of a runtime.
///
/// Changes affect bindings configured afterwards, including existing
/// bindings on their next `refresh` or `set_options`.
pub struct DefaultsStore<E> {
	options: RefCell<Options<E>>,
}

impl<E: Clone + 'static> DefaultsStore<E> {
	/// Creates a store holding `options`.
	pub fn new(options: Options<E>) -> Self {
		Self {
			options: RefCell::new(options),
		}
	}

	/// Returns a copy of the current defaults.
	pub fn get(&self) -> Options<E> {
		self.options.borrow().clone()
	}

	/// Updates the defaults.
	pub fn set(&self, options: Options<E>, mode: MergeMode) {
		let mut current = self.options.borrow_mut();
		*current = match mode {
			MergeMode::Deep => current.clone().merge(options),
			MergeMode::Replace => options,
		};
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_deep_set_layers_over_current() {
		let store: DefaultsStore<u32> = DefaultsStore::new(Options::new().data(json!({"a": 1})).history(true));
		store.set(Options::new().data(json!({"b": 2})), MergeMode::Deep);

		let resolved = store.get().freeze(&0).unwrap();
		assert_eq!(resolved.data, json!({"a": 1, "b": 2}));
		assert!(resolved.history);
	}

	#[rstest]
	fn test_replace_set_discards_current() {
		let store: DefaultsStore<u32> = DefaultsStore::new(Options::new().history(true));
		store.set(Options::new().url("/x"), MergeMode::Replace);

		let resolved = store.get().freeze(&0).unwrap();
		assert!(!resolved.history);
		assert_eq!(resolved.url.as_deref(), Some("/x"));
	}
}
