//! An in-memory document for tests.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::css::{self, SelectorList};
use super::html::{self, Parsed, VOID_ELEMENTS};
use crate::dom::{
	ControlKind, ControlState, Dom, FormEntry, ListenerId, TriggerEvent, TriggerHandler,
};
use crate::form::FieldWalker;

const CONTROL_SELECTOR: &str = "input, select, textarea, button";

enum NodeKind {
	Element {
		tag: String,
		attributes: RefCell<Vec<(String, String)>>,
		files: RefCell<Vec<String>>,
	},
	Text(RefCell<String>),
}

struct Node {
	kind: NodeKind,
	parent: RefCell<Weak<Node>>,
	children: RefCell<Vec<MockElement>>,
}

/// Handle to a node of a [`MockDom`]; compares by identity.
#[derive(Clone)]
pub struct MockElement(Rc<Node>);

impl PartialEq for MockElement {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for MockElement {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.0.kind {
			NodeKind::Element { tag, .. } => match self.get_attribute("id") {
				Some(id) => write!(f, "<{}#{}>", tag, id),
				None => write!(f, "<{}>", tag),
			},
			NodeKind::Text(text) => write!(f, "#text({:?})", text.borrow()),
		}
	}
}

impl MockElement {
	fn element(tag: &str, attributes: Vec<(String, String)>) -> Self {
		Self(Rc::new(Node {
			kind: NodeKind::Element {
				tag: tag.to_string(),
				attributes: RefCell::new(attributes),
				files: RefCell::new(Vec::new()),
			},
			parent: RefCell::new(Weak::new()),
			children: RefCell::new(Vec::new()),
		}))
	}

	fn text(text: String) -> Self {
		Self(Rc::new(Node {
			kind: NodeKind::Text(RefCell::new(text)),
			parent: RefCell::new(Weak::new()),
			children: RefCell::new(Vec::new()),
		}))
	}

	fn build(parsed: Parsed) -> Self {
		match parsed {
			Parsed::Text(text) => Self::text(text),
			Parsed::Element {
				tag,
				attributes,
				children,
			} => {
				let element = Self::element(&tag, attributes);
				for child in children {
					element.push_child(Self::build(child));
				}
				element
			}
		}
	}

	fn tag(&self) -> Option<&str> {
		match &self.0.kind {
			NodeKind::Element { tag, .. } => Some(tag),
			NodeKind::Text(_) => None,
		}
	}

	fn get_attribute(&self, name: &str) -> Option<String> {
		match &self.0.kind {
			NodeKind::Element { attributes, .. } => attributes
				.borrow()
				.iter()
				.find(|(key, _)| key == name)
				.map(|(_, value)| value.clone()),
			NodeKind::Text(_) => None,
		}
	}

	fn parent_element(&self) -> Option<Self> {
		self.0.parent.borrow().upgrade().map(Self)
	}

	fn push_child(&self, child: Self) {
		*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
		self.0.children.borrow_mut().push(child);
	}

	fn detach(&self) {
		if let Some(parent) = self.parent_element() {
			parent.0.children.borrow_mut().retain(|child| child != self);
		}
		*self.0.parent.borrow_mut() = Weak::new();
	}

	fn index_in_parent(&self) -> Option<(Self, usize)> {
		let parent = self.parent_element()?;
		let index = parent.0.children.borrow().iter().position(|child| child == self)?;
		Some((parent, index))
	}

	/// Inserts `nodes` at `index`, detaching each from its previous parent.
	fn insert_children(&self, index: usize, nodes: &[Self]) {
		let mut index = index;
		for node in nodes {
			node.detach();
			*node.0.parent.borrow_mut() = Rc::downgrade(&self.0);
			let mut children = self.0.children.borrow_mut();
			let at = index.min(children.len());
			children.insert(at, node.clone());
			index = at + 1;
		}
	}

	fn child_nodes(&self) -> Vec<Self> {
		self.0.children.borrow().clone()
	}

	fn descendants(&self, out: &mut Vec<Self>) {
		for child in self.child_nodes() {
			if child.tag().is_some() {
				out.push(child.clone());
				child.descendants(out);
			}
		}
	}

	fn text_content(&self) -> String {
		match &self.0.kind {
			NodeKind::Text(text) => text.borrow().clone(),
			NodeKind::Element { .. } => self
				.child_nodes()
				.iter()
				.map(Self::text_content)
				.collect(),
		}
	}

	fn deep_clone(&self) -> Self {
		let copy = match &self.0.kind {
			NodeKind::Text(text) => Self::text(text.borrow().clone()),
			NodeKind::Element {
				tag,
				attributes,
				files,
			} => {
				let copy = Self::element(tag, attributes.borrow().clone());
				if let NodeKind::Element { files: copied, .. } = &copy.0.kind {
					*copied.borrow_mut() = files.borrow().clone();
				}
				copy
			}
		};
		for child in self.child_nodes() {
			copy.push_child(child.deep_clone());
		}
		copy
	}

	fn write_html(&self, out: &mut String) {
		match &self.0.kind {
			NodeKind::Text(text) => out.push_str(&html::escape_text(&text.borrow())),
			NodeKind::Element {
				tag, attributes, ..
			} => {
				out.push('<');
				out.push_str(tag);
				for (name, value) in attributes.borrow().iter() {
					out.push_str(&format!(" {}=\"{}\"", name, html::escape_attribute(value)));
				}
				out.push('>');
				if VOID_ELEMENTS.contains(&tag.as_str()) {
					return;
				}
				for child in self.child_nodes() {
					child.write_html(out);
				}
				out.push_str(&format!("</{}>", tag));
			}
		}
	}
}

impl css::Node for MockElement {
	fn tag(&self) -> Option<String> {
		MockElement::tag(self).map(str::to_string)
	}

	fn attribute(&self, name: &str) -> Option<String> {
		self.get_attribute(name)
	}

	fn parent_node(&self) -> Option<Self> {
		self.parent_element()
	}
}

struct Registered {
	id: ListenerId,
	element: MockElement,
	event: String,
	handler: TriggerHandler<MockElement>,
}

/// An in-memory [`Dom`] with a `<body>` root.
///
/// Files are represented by their names. Events dispatched with
/// [`fire`](Self::fire) bubble from the target to the body.
pub struct MockDom {
	body: MockElement,
	listeners: RefCell<Vec<Registered>>,
	next_listener: Cell<u64>,
	native_form_data: bool,
}

impl Default for MockDom {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for MockDom {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MockDom")
			.field("body", &self.inner_html(&self.body))
			.field("listeners", &self.listeners.borrow().len())
			.finish()
	}
}

impl MockDom {
	/// Creates an empty document.
	pub fn new() -> Self {
		Self {
			body: MockElement::element("body", Vec::new()),
			listeners: RefCell::new(Vec::new()),
			next_listener: Cell::new(1),
			native_form_data: false,
		}
	}

	/// Enables [`Dom::native_form_entries`].
	pub fn with_native_form_data(mut self) -> Self {
		self.native_form_data = true;
		self
	}

	/// Returns the `<body>` element.
	pub fn body(&self) -> MockElement {
		self.body.clone()
	}

	/// Replaces the body contents with parsed HTML.
	pub fn set_body(&self, markup: &str) {
		for child in self.body.child_nodes() {
			child.detach();
		}
		for parsed in html::parse(markup) {
			self.body.push_child(MockElement::build(parsed));
		}
	}

	/// Finds an attached element by id.
	pub fn by_id(&self, id: &str) -> Option<MockElement> {
		let mut all = vec![self.body.clone()];
		self.body.descendants(&mut all);
		all.into_iter()
			.find(|element| element.get_attribute("id").as_deref() == Some(id))
	}

	/// Serializes an element's children.
	pub fn inner_html(&self, element: &MockElement) -> String {
		let mut out = String::new();
		for child in element.child_nodes() {
			child.write_html(&mut out);
		}
		out
	}

	/// Returns the concatenated text of a node.
	pub fn text(&self, element: &MockElement) -> String {
		element.text_content()
	}

	/// Sets or overwrites an attribute.
	pub fn set_attribute(&self, element: &MockElement, name: &str, value: &str) {
		if let NodeKind::Element { attributes, .. } = &element.0.kind {
			let mut attributes = attributes.borrow_mut();
			match attributes.iter_mut().find(|(key, _)| key == name) {
				Some((_, existing)) => *existing = value.to_string(),
				None => attributes.push((name.to_string(), value.to_string())),
			}
		}
	}

	/// Removes an attribute.
	pub fn remove_attribute(&self, element: &MockElement, name: &str) {
		if let NodeKind::Element { attributes, .. } = &element.0.kind {
			attributes.borrow_mut().retain(|(key, _)| key != name);
		}
	}

	/// Sets the files selected in a file input.
	pub fn set_files(&self, element: &MockElement, names: Vec<String>) {
		if let NodeKind::Element { files, .. } = &element.0.kind {
			*files.borrow_mut() = names;
		}
	}

	/// Counts the listeners registered on an element.
	pub fn listener_count(&self, element: &MockElement) -> usize {
		self.listeners
			.borrow()
			.iter()
			.filter(|registered| registered.element == *element)
			.count()
	}

	/// Dispatches `event` at `target`, bubbling up to the body.
	///
	/// Returns true if a listener prevented the default action.
	pub fn fire(&self, target: &MockElement, event: &str) -> bool {
		let mut prevented = false;
		let mut current = Some(target.clone());
		while let Some(node) = current {
			let handlers: Vec<TriggerHandler<MockElement>> = self
				.listeners
				.borrow()
				.iter()
				.filter(|registered| registered.element == node && registered.event == event)
				.map(|registered| Rc::clone(&registered.handler))
				.collect();
			if !handlers.is_empty() {
				let trigger = TriggerEvent::new(event, node.clone());
				for handler in handlers {
					handler(&trigger);
				}
				prevented |= trigger.is_default_prevented();
			}
			current = node.parent_element();
		}
		prevented
	}

	/// Clicks an element. A click on a submit button that nobody prevented
	/// goes on to submit the enclosing form.
	///
	/// Returns true if the click's default action was prevented.
	pub fn click(&self, target: &MockElement) -> bool {
		if self.fire(target, "click") {
			return true;
		}
		if self.is_submit_button(target) {
			let mut current = target.parent_element();
			while let Some(node) = current {
				if node.tag() == Some("form") {
					self.submit(&node);
					break;
				}
				current = node.parent_element();
			}
		}
		false
	}

	/// Dispatches `submit` at a form.
	pub fn submit(&self, form: &MockElement) -> bool {
		self.fire(form, "submit")
	}

	fn is_submit_button(&self, element: &MockElement) -> bool {
		let kind = element.get_attribute("type").map(|t| t.to_ascii_lowercase());
		match element.tag() {
			Some("button") => matches!(kind.as_deref(), None | Some("submit")),
			Some("input") => matches!(kind.as_deref(), Some("submit" | "image")),
			_ => false,
		}
	}

	fn select_values(&self, select: &MockElement) -> Vec<String> {
		let mut options = Vec::new();
		select.descendants(&mut options);
		options.retain(|option| option.tag() == Some("option"));
		let value_of = |option: &MockElement| {
			option
				.get_attribute("value")
				.unwrap_or_else(|| option.text_content().trim().to_string())
		};
		let selected: Vec<String> = options
			.iter()
			.filter(|option| option.get_attribute("selected").is_some())
			.map(value_of)
			.collect();
		if selected.is_empty() && select.get_attribute("multiple").is_none() {
			return options.first().map(value_of).into_iter().collect();
		}
		selected
	}
}

impl Dom for MockDom {
	type Element = MockElement;
	type File = String;

	fn tag_name(&self, element: &MockElement) -> String {
		element.tag().unwrap_or("#text").to_string()
	}

	fn attribute(&self, element: &MockElement, name: &str) -> Option<String> {
		element.get_attribute(&name.to_ascii_lowercase())
	}

	fn parent(&self, element: &MockElement) -> Option<MockElement> {
		element.parent_element()
	}

	fn is_connected(&self, element: &MockElement) -> bool {
		let mut current = Some(element.clone());
		while let Some(node) = current {
			if node == self.body {
				return true;
			}
			current = node.parent_element();
		}
		false
	}

	fn children(&self, element: &MockElement) -> Vec<MockElement> {
		element
			.child_nodes()
			.into_iter()
			.filter(|child| child.tag().is_some())
			.collect()
	}

	fn matches(&self, element: &MockElement, selector: &str) -> bool {
		SelectorList::parse(selector).is_some_and(|list| list.matches(element))
	}

	fn query_all(&self, scope: Option<&MockElement>, selector: &str) -> Vec<MockElement> {
		let Some(list) = SelectorList::parse(selector) else {
			tracing::debug!(selector, "unsupported selector");
			return Vec::new();
		};
		let mut candidates = Vec::new();
		match scope {
			Some(scope) => scope.descendants(&mut candidates),
			None => {
				candidates.push(self.body.clone());
				self.body.descendants(&mut candidates);
			}
		}
		candidates.retain(|candidate| list.matches(candidate));
		candidates
	}

	fn parse_fragment(&self, markup: &str) -> Vec<MockElement> {
		html::parse(markup).into_iter().map(MockElement::build).collect()
	}

	fn clone_node(&self, element: &MockElement) -> MockElement {
		element.deep_clone()
	}

	fn fill(&self, target: &MockElement, content: &[MockElement]) {
		for child in target.child_nodes() {
			child.detach();
		}
		target.insert_children(0, content);
	}

	fn replace_with(&self, target: &MockElement, content: &[MockElement]) {
		if let Some((parent, index)) = target.index_in_parent() {
			target.detach();
			parent.insert_children(index, content);
		}
	}

	fn prepend(&self, target: &MockElement, content: &[MockElement]) {
		target.insert_children(0, content);
	}

	fn append(&self, target: &MockElement, content: &[MockElement]) {
		target.insert_children(usize::MAX, content);
	}

	fn insert_before(&self, target: &MockElement, content: &[MockElement]) {
		if let Some((parent, index)) = target.index_in_parent() {
			parent.insert_children(index, content);
		}
	}

	fn insert_after(&self, target: &MockElement, content: &[MockElement]) {
		if let Some((parent, index)) = target.index_in_parent() {
			parent.insert_children(index + 1, content);
		}
	}

	fn form_controls(&self, element: &MockElement) -> Vec<MockElement> {
		if self.matches(element, CONTROL_SELECTOR) {
			return vec![element.clone()];
		}
		self.query_all(Some(element), CONTROL_SELECTOR)
	}

	fn control_state(&self, element: &MockElement) -> Option<ControlState<String>> {
		let tag = element.tag()?;
		let input_type = element
			.get_attribute("type")
			.map(|kind| kind.to_ascii_lowercase());
		let value = element.get_attribute("value");
		let (kind, values) = match tag {
			"input" => match input_type.as_deref().unwrap_or("text") {
				"checkbox" | "radio" => (ControlKind::Checkable, value.into_iter().collect()),
				"file" => (ControlKind::File, Vec::new()),
				"submit" | "button" | "reset" | "image" => {
					(ControlKind::Button, value.into_iter().collect())
				}
				_ => (ControlKind::Text, vec![value.unwrap_or_default()]),
			},
			"textarea" => (ControlKind::Text, vec![element.text_content()]),
			"select" => (ControlKind::Select, self.select_values(element)),
			"button" => (ControlKind::Button, value.into_iter().collect()),
			_ => return None,
		};
		let files = match &element.0.kind {
			NodeKind::Element { files, .. } if kind == ControlKind::File => files.borrow().clone(),
			_ => Vec::new(),
		};
		Some(ControlState {
			name: element.get_attribute("name").unwrap_or_default(),
			kind,
			values,
			checked: element.get_attribute("checked").is_some(),
			disabled: element.get_attribute("disabled").is_some(),
			files,
		})
	}

	fn native_form_entries(&self, form: &MockElement) -> Option<Vec<FormEntry<String>>> {
		self.native_form_data.then(|| FieldWalker::entries(self, form))
	}

	fn add_listener(
		&self,
		element: &MockElement,
		event: &str,
		handler: TriggerHandler<MockElement>,
	) -> ListenerId {
		let id = ListenerId(self.next_listener.get());
		self.next_listener.set(id.0 + 1);
		self.listeners.borrow_mut().push(Registered {
			id,
			element: element.clone(),
			event: event.to_string(),
			handler,
		});
		id
	}

	fn remove_listener(&self, id: ListenerId) {
		self.listeners.borrow_mut().retain(|registered| registered.id != id);
	}
}
