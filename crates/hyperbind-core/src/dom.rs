//! DOM abstraction layer.
//!
//! hyperbind never talks to a document directly. Everything it needs from
//! the page (queries, mutation, form controls and trigger listeners) goes
//! through the [`Dom`] trait, which is implemented by
//! [`WebDom`](crate::web::WebDom) in the browser and by
//! [`MockDom`](crate::testing::MockDom) in tests.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Identifies a listener registered through [`Dom::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// A DOM event delivered to a hyperbind trigger listener.
///
/// Adapters create one per dispatched event and check
/// [`is_default_prevented`](Self::is_default_prevented) once the handler
/// returns.
#[derive(Debug)]
pub struct TriggerEvent<E> {
	name: String,
	target: E,
	default_prevented: Cell<bool>,
}

impl<E> TriggerEvent<E> {
	/// Creates a new trigger event.
	pub fn new(name: impl Into<String>, target: E) -> Self {
		Self {
			name: name.into(),
			target,
			default_prevented: Cell::new(false),
		}
	}

	/// Returns the event name (e.g. `submit`).
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns the element the listener was registered on.
	pub fn target(&self) -> &E {
		&self.target
	}

	/// Suppresses the browser's default action.
	pub fn prevent_default(&self) {
		self.default_prevented.set(true);
	}

	/// Returns true once [`prevent_default`](Self::prevent_default) was called.
	pub fn is_default_prevented(&self) -> bool {
		self.default_prevented.get()
	}
}

/// Handler type for trigger listeners.
pub type TriggerHandler<E> = Rc<dyn Fn(&TriggerEvent<E>)>;

/// Value of a single form entry.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue<F> {
	/// Plain text value.
	Text(String),
	/// Selected file.
	File(F),
}

/// A name/value pair contributed to a request payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FormEntry<F> {
	/// Field name.
	pub name: String,
	/// Field value.
	pub value: FormValue<F>,
}

impl<F> FormEntry<F> {
	/// Creates a text entry.
	pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: FormValue::Text(value.into()),
		}
	}

	/// Creates a file entry.
	pub fn file(name: impl Into<String>, file: F) -> Self {
		Self {
			name: name.into(),
			value: FormValue::File(file),
		}
	}

	/// Returns the text value, if this is a text entry.
	pub fn as_text(&self) -> Option<&str> {
		match &self.value {
			FormValue::Text(text) => Some(text),
			FormValue::File(_) => None,
		}
	}
}

/// Broad classification of form controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
	/// Text-like inputs, hidden inputs and textareas.
	Text,
	/// Checkboxes and radio buttons.
	Checkable,
	/// `<input type="file">`.
	File,
	/// `<select>`, single or multiple.
	Select,
	/// Submit, reset, image and plain buttons.
	Button,
}

/// Snapshot of a form control's state.
#[derive(Debug, Clone)]
pub struct ControlState<F> {
	/// The `name` attribute (may be empty).
	pub name: String,
	/// Control classification.
	pub kind: ControlKind,
	/// Current value(s); selects report every selected option.
	pub values: Vec<String>,
	/// Checked state for checkables.
	pub checked: bool,
	/// Whether the control is disabled.
	pub disabled: bool,
	/// Selected files for file inputs.
	pub files: Vec<F>,
}

/// Page access required by hyperbind.
///
/// `Element` handles compare by identity: two handles are equal when they
/// refer to the same node.
pub trait Dom: 'static {
	/// Node handle.
	type Element: Clone + PartialEq + fmt::Debug + 'static;
	/// Handle to a user-selected file.
	type File: Clone + fmt::Debug + 'static;

	/// Lowercase tag name of an element.
	fn tag_name(&self, element: &Self::Element) -> String;

	/// Reads an attribute.
	fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

	/// Returns the parent element, if any.
	fn parent(&self, element: &Self::Element) -> Option<Self::Element>;

	/// Returns true while the element is part of the document.
	fn is_connected(&self, element: &Self::Element) -> bool;

	/// Returns the element children in document order.
	fn children(&self, element: &Self::Element) -> Vec<Self::Element>;

	/// Tests an element against a CSS selector.
	fn matches(&self, element: &Self::Element, selector: &str) -> bool;

	/// Finds descendants of `scope` (or of the document when `None`)
	/// matching a CSS selector, in document order.
	fn query_all(&self, scope: Option<&Self::Element>, selector: &str) -> Vec<Self::Element>;

	/// Parses an HTML string into detached top-level nodes.
	fn parse_fragment(&self, html: &str) -> Vec<Self::Element>;

	/// Deep-copies a node; the copy is detached.
	fn clone_node(&self, element: &Self::Element) -> Self::Element;

	/// Replaces the target's contents.
	fn fill(&self, target: &Self::Element, content: &[Self::Element]);

	/// Replaces the target node itself.
	fn replace_with(&self, target: &Self::Element, content: &[Self::Element]);

	/// Inserts content as the target's first children.
	fn prepend(&self, target: &Self::Element, content: &[Self::Element]);

	/// Inserts content as the target's last children.
	fn append(&self, target: &Self::Element, content: &[Self::Element]);

	/// Inserts content as preceding siblings of the target.
	fn insert_before(&self, target: &Self::Element, content: &[Self::Element]);

	/// Inserts content as following siblings of the target.
	fn insert_after(&self, target: &Self::Element, content: &[Self::Element]);

	/// Lists the form controls belonging to an element: the `elements` of a
	/// form, the element itself for a control, otherwise descendant controls.
	fn form_controls(&self, element: &Self::Element) -> Vec<Self::Element>;

	/// Returns the state of a form control, or `None` for non-controls.
	fn control_state(&self, element: &Self::Element) -> Option<ControlState<Self::File>>;

	/// Serializes a form with the platform's native form-data support.
	///
	/// Returns `None` when the platform offers no such capability.
	fn native_form_entries(&self, _form: &Self::Element) -> Option<Vec<FormEntry<Self::File>>> {
		None
	}

	/// Registers a listener for `event` on `element`.
	fn add_listener(
		&self,
		element: &Self::Element,
		event: &str,
		handler: TriggerHandler<Self::Element>,
	) -> ListenerId;

	/// Removes a listener previously registered by hyperbind.
	fn remove_listener(&self, id: ListenerId);

	/// Returns true for `<form>` elements.
	fn is_form(&self, element: &Self::Element) -> bool {
		self.tag_name(element) == "form"
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_trigger_event_prevent_default() {
		let event = TriggerEvent::new("submit", 7u32);
		assert_eq!(event.name(), "submit");
		assert_eq!(*event.target(), 7);
		assert!(!event.is_default_prevented());

		event.prevent_default();
		assert!(event.is_default_prevented());
	}

	#[rstest]
	fn test_form_entry_text_accessor() {
		let entry: FormEntry<()> = FormEntry::text("q", "rust");
		assert_eq!(entry.as_text(), Some("rust"));

		let entry = FormEntry::file("upload", ());
		assert_eq!(entry.as_text(), None);
	}
}
