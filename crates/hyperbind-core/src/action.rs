//! Response actions: how fetched content is spliced into the page.
//!
//! Built-in actions mirror the jQuery manipulation vocabulary. Custom
//! actions are plain functions of `(targets, content)` and can either be
//! passed inline ([`Action::Custom`]) or registered on the runtime under a
//! name and referenced with [`Action::Named`].

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::Dom;
use crate::scheduler::Scheduler;

/// Custom action signature: receives the resolved targets and the content.
pub type ActionFn<E> = Rc<dyn Fn(&[E], &[E])>;

/// DOM mutation applied to a successful response.
pub enum Action<E> {
	/// Replace each target's contents.
	Fill,
	/// Swap each target node out for the content (deferred one tick).
	Replace,
	/// Insert content before each target's first child.
	Prepend,
	/// Insert content after each target's last child.
	Append,
	/// Insert content before each target.
	Before,
	/// Insert content after each target.
	After,
	/// Look up a custom action registered on the runtime.
	Named(String),
	/// Inline custom action.
	Custom(ActionFn<E>),
}

impl<E> Action<E> {
	/// Wraps a closure as a custom action.
	pub fn custom<F>(action: F) -> Self
	where
		F: Fn(&[E], &[E]) + 'static,
	{
		Self::Custom(Rc::new(action))
	}

	/// Parses an action name; unknown names become [`Action::Named`].
	pub fn parse(name: &str) -> Self {
		match name {
			"fill" => Self::Fill,
			"replace" => Self::Replace,
			"prepend" => Self::Prepend,
			"append" => Self::Append,
			"before" | "insertBefore" => Self::Before,
			"after" | "insertAfter" => Self::After,
			other => Self::Named(other.to_string()),
		}
	}

	/// Returns the canonical name, `None` for inline custom actions.
	pub fn name(&self) -> Option<&str> {
		match self {
			Self::Fill => Some("fill"),
			Self::Replace => Some("replace"),
			Self::Prepend => Some("prepend"),
			Self::Append => Some("append"),
			Self::Before => Some("before"),
			Self::After => Some("after"),
			Self::Named(name) => Some(name),
			Self::Custom(_) => None,
		}
	}
}

impl<E> Clone for Action<E> {
	fn clone(&self) -> Self {
		match self {
			Self::Fill => Self::Fill,
			Self::Replace => Self::Replace,
			Self::Prepend => Self::Prepend,
			Self::Append => Self::Append,
			Self::Before => Self::Before,
			Self::After => Self::After,
			Self::Named(name) => Self::Named(name.clone()),
			Self::Custom(action) => Self::Custom(Rc::clone(action)),
		}
	}
}

impl<E> fmt::Debug for Action<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.name() {
			Some(name) => write!(f, "Action({})", name),
			None => write!(f, "Action(<function>)"),
		}
	}
}

impl<E> From<&str> for Action<E> {
	fn from(name: &str) -> Self {
		Self::parse(name)
	}
}

impl<E> From<String> for Action<E> {
	fn from(name: String) -> Self {
		Self::parse(&name)
	}
}

/// Named custom actions available to every binding of a runtime.
pub struct ActionRegistry<E> {
	actions: HashMap<String, ActionFn<E>>,
}

impl<E> Default for ActionRegistry<E> {
	fn default() -> Self {
		Self {
			actions: HashMap::new(),
		}
	}
}

impl<E> fmt::Debug for ActionRegistry<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActionRegistry")
			.field("actions", &self.actions.keys().collect::<Vec<_>>())
			.finish()
	}
}

impl<E> ActionRegistry<E> {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers (or replaces) a named action.
	pub fn register<F>(&mut self, name: impl Into<String>, action: F)
	where
		F: Fn(&[E], &[E]) + 'static,
	{
		self.actions.insert(name.into(), Rc::new(action));
	}

	/// Looks up a named action.
	pub fn get(&self, name: &str) -> Option<ActionFn<E>> {
		self.actions.get(name).cloned()
	}

	/// Returns true if an action with this name is registered.
	pub fn contains(&self, name: &str) -> bool {
		self.actions.contains_key(name)
	}
}

/// Applies `action` to every target and returns the nodes handed to the
/// DOM.
///
/// Built-in actions insert a deep copy of the content for every target but
/// the last, which receives the original nodes; all of them are returned.
/// Custom actions get the original content, which is returned as is.
/// `lookup` resolves named actions; it returns `None` for unknown names,
/// in which case the DOM is left untouched and `None` is returned.
pub(crate) fn apply<D: Dom>(
	action: &Action<D::Element>,
	dom: &Rc<D>,
	scheduler: &Rc<dyn Scheduler>,
	lookup: &dyn Fn(&str) -> Option<ActionFn<D::Element>>,
	targets: &[D::Element],
	content: &[D::Element],
) -> Option<Vec<D::Element>> {
	let content_for = |index: usize| -> Vec<D::Element> {
		if index + 1 == targets.len() {
			content.to_vec()
		} else {
			content.iter().map(|node| dom.clone_node(node)).collect()
		}
	};
	let splice = |insert: fn(&D, &D::Element, &[D::Element])| -> Vec<D::Element> {
		let mut inserted = Vec::new();
		for (index, target) in targets.iter().enumerate() {
			let nodes = content_for(index);
			insert(dom, target, &nodes);
			inserted.extend(nodes);
		}
		inserted
	};

	let inserted = match action {
		Action::Fill => splice(D::fill),
		Action::Prepend => splice(D::prepend),
		Action::Append => splice(D::append),
		Action::Before => splice(D::insert_before),
		Action::After => splice(D::insert_after),
		Action::Replace => {
			// Swapping the node out while its own event handler is still on
			// the stack breaks in-progress dispatch, so wait a tick.
			let swaps: Vec<(D::Element, Vec<D::Element>)> = targets
				.iter()
				.enumerate()
				.map(|(index, target)| (target.clone(), content_for(index)))
				.collect();
			let inserted = swaps.iter().flat_map(|(_, nodes)| nodes.iter().cloned()).collect();
			let dom = Rc::clone(dom);
			scheduler.defer(Box::new(move || {
				for (target, content) in &swaps {
					dom.replace_with(target, content);
				}
			}));
			inserted
		}
		Action::Named(name) => match lookup(name) {
			Some(custom) => {
				custom(targets, content);
				content.to_vec()
			}
			None => {
				tracing::warn!(action = %name, "unknown action, response not applied");
				return None;
			}
		},
		Action::Custom(custom) => {
			custom(targets, content);
			content.to_vec()
		}
	};
	Some(inserted)
}
