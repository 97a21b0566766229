//! [`Dom`] over the live browser document.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::Array;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
	Document, Element, File, FormData, HtmlButtonElement, HtmlCollection, HtmlFormElement,
	HtmlInputElement, HtmlOptionElement, HtmlSelectElement, HtmlTextAreaElement, NodeList,
};

use crate::dom::{
	ControlKind, ControlState, Dom, FormEntry, ListenerId, TriggerEvent, TriggerHandler,
};
use crate::error::{HyperbindError, Result};

const CONTROL_SELECTOR: &str = "input, select, textarea, button";

struct Registered {
	element: Element,
	event: String,
	closure: Closure<dyn FnMut(web_sys::Event)>,
}

/// The browser document.
pub struct WebDom {
	document: Document,
	listeners: RefCell<HashMap<ListenerId, Registered>>,
	next_listener: Cell<u64>,
}

impl std::fmt::Debug for WebDom {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WebDom")
			.field("listeners", &self.listeners.borrow().len())
			.finish()
	}
}

fn collection(items: HtmlCollection) -> Vec<Element> {
	(0..items.length()).filter_map(|i| items.item(i)).collect()
}

fn node_list(items: NodeList) -> Vec<Element> {
	(0..items.length())
		.filter_map(|i| items.get(i))
		.filter_map(|node| node.dyn_into::<Element>().ok())
		.collect()
}

fn node_array(nodes: &[Element]) -> Array {
	nodes.iter().collect()
}

fn report(operation: &str, result: std::result::Result<(), JsValue>) {
	if let Err(err) = result {
		tracing::warn!(operation, error = ?err, "DOM operation failed");
	}
}

impl WebDom {
	/// Wraps the current window's document.
	///
	/// # Errors
	///
	/// Fails outside a browser window.
	pub fn new() -> Result<Self> {
		let document = web_sys::window()
			.and_then(|window| window.document())
			.ok_or_else(|| HyperbindError::Platform("no document".to_string()))?;
		Ok(Self::with_document(document))
	}

	/// Wraps a specific document.
	pub fn with_document(document: Document) -> Self {
		Self {
			document,
			listeners: RefCell::new(HashMap::new()),
			next_listener: Cell::new(1),
		}
	}

	/// Returns the wrapped document.
	pub fn document(&self) -> &Document {
		&self.document
	}
}

impl Dom for WebDom {
	type Element = Element;
	type File = File;

	fn tag_name(&self, element: &Element) -> String {
		element.tag_name().to_ascii_lowercase()
	}

	fn attribute(&self, element: &Element, name: &str) -> Option<String> {
		element.get_attribute(name)
	}

	fn parent(&self, element: &Element) -> Option<Element> {
		element.parent_element()
	}

	fn is_connected(&self, element: &Element) -> bool {
		element.is_connected()
	}

	fn children(&self, element: &Element) -> Vec<Element> {
		collection(element.children())
	}

	fn matches(&self, element: &Element, selector: &str) -> bool {
		element.matches(selector).unwrap_or_else(|err| {
			tracing::warn!(selector, error = ?err, "invalid selector");
			false
		})
	}

	fn query_all(&self, scope: Option<&Element>, selector: &str) -> Vec<Element> {
		let found = match scope {
			Some(scope) => scope.query_selector_all(selector),
			None => self.document.query_selector_all(selector),
		};
		match found {
			Ok(list) => node_list(list),
			Err(err) => {
				tracing::warn!(selector, error = ?err, "invalid selector");
				Vec::new()
			}
		}
	}

	fn parse_fragment(&self, html: &str) -> Vec<Element> {
		let holder = match self.document.create_element("template") {
			Ok(holder) => holder,
			Err(err) => {
				tracing::warn!(error = ?err, "cannot create fragment holder");
				return Vec::new();
			}
		};
		holder.set_inner_html(html);
		let content = match holder.dyn_into::<web_sys::HtmlTemplateElement>() {
			Ok(template) => template.content(),
			Err(_) => return Vec::new(),
		};
		let nodes = collection(content.children());
		for node in &nodes {
			node.remove();
		}
		nodes
	}

	fn clone_node(&self, element: &Element) -> Element {
		match element.clone_node_with_deep(true) {
			Ok(copy) => copy.unchecked_into(),
			Err(err) => {
				tracing::warn!(error = ?err, "node clone failed, reusing original");
				element.clone()
			}
		}
	}

	fn fill(&self, target: &Element, content: &[Element]) {
		target.set_inner_html("");
		report("fill", target.append_with_node(&node_array(content)));
	}

	fn replace_with(&self, target: &Element, content: &[Element]) {
		report("replace", target.replace_with_with_node(&node_array(content)));
	}

	fn prepend(&self, target: &Element, content: &[Element]) {
		report("prepend", target.prepend_with_node(&node_array(content)));
	}

	fn append(&self, target: &Element, content: &[Element]) {
		report("append", target.append_with_node(&node_array(content)));
	}

	fn insert_before(&self, target: &Element, content: &[Element]) {
		report("before", target.before_with_node(&node_array(content)));
	}

	fn insert_after(&self, target: &Element, content: &[Element]) {
		report("after", target.after_with_node(&node_array(content)));
	}

	fn form_controls(&self, element: &Element) -> Vec<Element> {
		if let Some(form) = element.dyn_ref::<HtmlFormElement>() {
			return collection(form.elements());
		}
		if self.matches(element, CONTROL_SELECTOR) {
			return vec![element.clone()];
		}
		self.query_all(Some(element), CONTROL_SELECTOR)
	}

	fn control_state(&self, element: &Element) -> Option<ControlState<File>> {
		let state = |name: String, kind, values, checked, disabled, files| ControlState {
			name,
			kind,
			values,
			checked,
			disabled,
			files,
		};
		if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
			let kind = match input.type_().to_ascii_lowercase().as_str() {
				"checkbox" | "radio" => ControlKind::Checkable,
				"file" => ControlKind::File,
				"submit" | "button" | "reset" | "image" => ControlKind::Button,
				_ => ControlKind::Text,
			};
			let files = match (kind, input.files()) {
				(ControlKind::File, Some(list)) => (0..list.length()).filter_map(|i| list.item(i)).collect(),
				_ => Vec::new(),
			};
			let values = match kind {
				ControlKind::File => Vec::new(),
				_ => vec![input.value()],
			};
			return Some(state(input.name(), kind, values, input.checked(), input.disabled(), files));
		}
		if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
			let values = collection(select.selected_options())
				.into_iter()
				.filter_map(|option| option.dyn_into::<HtmlOptionElement>().ok())
				.map(|option| option.value())
				.collect();
			return Some(state(select.name(), ControlKind::Select, values, false, select.disabled(), Vec::new()));
		}
		if let Some(area) = element.dyn_ref::<HtmlTextAreaElement>() {
			return Some(state(area.name(), ControlKind::Text, vec![area.value()], false, area.disabled(), Vec::new()));
		}
		if let Some(button) = element.dyn_ref::<HtmlButtonElement>() {
			return Some(state(button.name(), ControlKind::Button, vec![button.value()], false, button.disabled(), Vec::new()));
		}
		None
	}

	fn native_form_entries(&self, form: &Element) -> Option<Vec<FormEntry<File>>> {
		let form = form.dyn_ref::<HtmlFormElement>()?;
		let data = FormData::new_with_form(form).ok()?;
		let iterator = js_sys::try_iter(&data).ok()??;
		let mut entries = Vec::new();
		for pair in iterator {
			let pair: Array = pair.ok()?.dyn_into().ok()?;
			let Some(name) = pair.get(0).as_string() else {
				continue;
			};
			let value = pair.get(1);
			match value.as_string() {
				Some(text) => entries.push(FormEntry::text(name, text)),
				None => {
					if let Ok(file) = value.dyn_into::<File>() {
						entries.push(FormEntry::file(name, file));
					}
				}
			}
		}
		Some(entries)
	}

	fn add_listener(&self, element: &Element, event: &str, handler: TriggerHandler<Element>) -> ListenerId {
		let id = ListenerId(self.next_listener.get());
		self.next_listener.set(id.0 + 1);

		let target = element.clone();
		let name = event.to_string();
		let closure = Closure::wrap(Box::new(move |dom_event: web_sys::Event| {
			let trigger = TriggerEvent::new(name.clone(), target.clone());
			handler(&trigger);
			if trigger.is_default_prevented() {
				dom_event.prevent_default();
			}
		}) as Box<dyn FnMut(web_sys::Event)>);

		report(
			"add listener",
			element.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()),
		);
		self.listeners.borrow_mut().insert(
			id,
			Registered {
				element: element.clone(),
				event: event.to_string(),
				closure,
			},
		);
		id
	}

	fn remove_listener(&self, id: ListenerId) {
		let removed = self.listeners.borrow_mut().remove(&id);
		if let Some(registered) = removed {
			report(
				"remove listener",
				registered.element.remove_event_listener_with_callback(
					&registered.event,
					registered.closure.as_ref().unchecked_ref(),
				),
			);
		}
	}
}
