//! Attaching trigger listeners to bound elements.
//!
//! A binding listens for the events named by its `on` option, or, when that
//! is unset, for the event suggested by the first matching
//! [`TriggerGuesser`]. Every listener id is remembered so that unbinding
//! removes exactly the listeners hyperbind added and nothing else.
//!
//! Named submit buttons inside (or being) the bound element get an extra
//! click listener that records which button was pressed; the next request
//! built by the binding carries that button's name and value.

use std::rc::Rc;

use crate::binding::Binding;
use crate::dom::{Dom, TriggerEvent, TriggerHandler};
use crate::runtime::Runtime;

/// Maps elements matching a CSS selector to a trigger event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerGuesser {
	selector: String,
	event: String,
}

impl TriggerGuesser {
	/// Creates a guesser suggesting `event` for elements matching `selector`.
	pub fn new(selector: impl Into<String>, event: impl Into<String>) -> Self {
		Self {
			selector: selector.into(),
			event: event.into(),
		}
	}

	/// Returns the suggested event if `element` matches.
	pub fn guess<D: Dom>(&self, dom: &D, element: &D::Element) -> Option<&str> {
		dom.matches(element, &self.selector)
			.then_some(self.event.as_str())
	}
}

/// Built-in guessers: forms submit, links and buttons click, other
/// controls change.
pub fn default_guessers() -> Vec<TriggerGuesser> {
	vec![
		TriggerGuesser::new("form", "submit"),
		TriggerGuesser::new(
			"a, button, input[type=submit], input[type=button], input[type=reset], input[type=image]",
			"click",
		),
		TriggerGuesser::new("input, select, textarea", "change"),
	]
}

/// Returns true for a named control that submits its form when clicked.
pub(crate) fn is_named_submit<D: Dom>(dom: &D, element: &D::Element) -> bool {
	let named = dom
		.attribute(element, "name")
		.is_some_and(|name| !name.is_empty());
	if !named {
		return false;
	}
	let kind = dom
		.attribute(element, "type")
		.map(|kind| kind.to_ascii_lowercase());
	match dom.tag_name(element).as_str() {
		"button" => matches!(kind.as_deref(), None | Some("submit")),
		"input" => matches!(kind.as_deref(), Some("submit") | Some("image")),
		_ => false,
	}
}

impl<D: Dom> Binding<D> {
	/// Registers the trigger and button-capture listeners.
	pub(crate) fn bind_triggers(&self, runtime: &Runtime<D>) {
		let dom = runtime.dom();
		let element = self.element();
		let options = self.options();

		let events: Vec<String> = match options.events() {
			explicit if !explicit.is_empty() => explicit.into_iter().map(str::to_string).collect(),
			_ => runtime.guess_trigger(element).into_iter().collect(),
		};
		if events.is_empty() {
			tracing::debug!(element = ?element, "no trigger event, binding responds to explicit requests only");
		}

		// Capture listeners go first so a bound button records itself before
		// its own trigger builds the request.
		let mut ids = Vec::new();
		let mut buttons = Vec::new();
		if is_named_submit(&**dom, element) {
			buttons.push(element.clone());
		}
		buttons.extend(
			dom.query_all(Some(element), "button, input")
				.into_iter()
				.filter(|candidate| is_named_submit(&**dom, candidate)),
		);
		for button in buttons {
			let pressed = self.pressed_slot();
			let dom_ref = Rc::downgrade(dom);
			let pressed_button = button.clone();
			let handler: TriggerHandler<D::Element> = Rc::new(move |_: &TriggerEvent<D::Element>| {
				let Some(dom) = dom_ref.upgrade() else {
					return;
				};
				let name = dom.attribute(&pressed_button, "name").unwrap_or_default();
				let value = dom.attribute(&pressed_button, "value").unwrap_or_default();
				*pressed.borrow_mut() = Some((name, value));
			});
			ids.push(dom.add_listener(&button, "click", handler));
		}

		for event in &events {
			let weak = self.weak();
			let handler: TriggerHandler<D::Element> = Rc::new(move |trigger: &TriggerEvent<D::Element>| {
				let Some(binding) = weak.upgrade() else {
					return;
				};
				if binding.options().prevent_default {
					trigger.prevent_default();
				}
				if let Err(err) = binding.request() {
					tracing::warn!(event = %trigger.name(), error = %err, "triggered request failed");
				}
			});
			ids.push(dom.add_listener(element, event, handler));
		}

		tracing::debug!(element = ?element, events = ?events, listeners = ids.len(), "bound triggers");
		self.replace_listener_ids(ids, dom);
	}

	/// Removes every listener registered by [`bind_triggers`](Self::bind_triggers).
	pub(crate) fn unbind_triggers(&self, runtime: &Runtime<D>) {
		self.replace_listener_ids(Vec::new(), runtime.dom());
	}
}
