//! The runtime: collaborators, binding registry and shared state.
//!
//! A [`Runtime`] is the single owner of everything bindings share: the
//! platform collaborators, the default options, named actions, trigger
//! guessers and the autoload sequencer. Bindings keep a weak reference back
//! to it.
//!
//! ```ignore
//! let runtime = Runtime::builder(dom, transport, history, scheduler)
//!     .settings(Settings::from_toml_str(CONFIG)?)
//!     .serializer(Rc::new(NativeFormSerializer))
//!     .build()?;
//!
//! runtime.register_action("highlight", |targets, content| { /* ... */ });
//! runtime.init_declarative(None);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::action::{ActionFn, ActionRegistry};
use crate::autoload::AutoloadSequencer;
use crate::binder::{self, TriggerGuesser};
use crate::binding::Binding;
use crate::defaults::{DefaultsStore, MergeMode};
use crate::dom::Dom;
use crate::error::Result;
use crate::form::{FieldWalker, FormSerializer};
use crate::history::History;
use crate::options::Options;
use crate::request::RequestId;
use crate::scheduler::Scheduler;
use crate::settings::Settings;
use crate::transport::Transport;

/// Builder for [`Runtime`].
pub struct RuntimeBuilder<D: Dom> {
	dom: Rc<D>,
	transport: Rc<dyn Transport<D::File>>,
	history: Rc<dyn History>,
	scheduler: Rc<dyn Scheduler>,
	serializer: Option<Rc<dyn FormSerializer<D>>>,
	settings: Settings,
}

impl<D: Dom> RuntimeBuilder<D> {
	/// Sets the runtime settings.
	pub fn settings(mut self, settings: Settings) -> Self {
		self.settings = settings;
		self
	}

	/// Sets the form serializer (default: [`FieldWalker`]).
	pub fn serializer(mut self, serializer: Rc<dyn FormSerializer<D>>) -> Self {
		self.serializer = Some(serializer);
		self
	}

	/// Builds the runtime.
	///
	/// # Errors
	///
	/// Fails when the default options in the settings are invalid.
	pub fn build(self) -> Result<Rc<Runtime<D>>> {
		let defaults = self.settings.defaults.clone().into_options()?;
		let serializer = self
			.serializer
			.unwrap_or_else(|| Rc::new(FieldWalker) as Rc<dyn FormSerializer<D>>);

		Ok(Rc::new_cyclic(|this| Runtime {
			dom: self.dom,
			transport: self.transport,
			history: self.history,
			scheduler: self.scheduler,
			serializer,
			settings: self.settings,
			defaults: DefaultsStore::new(defaults),
			actions: RefCell::new(ActionRegistry::new()),
			guessers: RefCell::new(binder::default_guessers()),
			bindings: RefCell::new(Vec::new()),
			autoload: AutoloadSequencer::new(),
			next_request: Cell::new(1),
			this: this.clone(),
		}))
	}
}

/// Shared state of all bindings on one page.
pub struct Runtime<D: Dom> {
	dom: Rc<D>,
	transport: Rc<dyn Transport<D::File>>,
	history: Rc<dyn History>,
	scheduler: Rc<dyn Scheduler>,
	serializer: Rc<dyn FormSerializer<D>>,
	settings: Settings,
	defaults: DefaultsStore<D::Element>,
	actions: RefCell<ActionRegistry<D::Element>>,
	guessers: RefCell<Vec<TriggerGuesser>>,
	bindings: RefCell<Vec<(D::Element, Rc<Binding<D>>)>>,
	pub(crate) autoload: AutoloadSequencer<D>,
	next_request: Cell<u64>,
	this: Weak<Self>,
}

impl<D: Dom> fmt::Debug for Runtime<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Runtime")
			.field("settings", &self.settings)
			.field("bindings", &self.bindings.borrow().len())
			.field("actions", &*self.actions.borrow())
			.finish()
	}
}

impl<D: Dom> Runtime<D> {
	/// Starts building a runtime from its collaborators.
	pub fn builder(
		dom: Rc<D>,
		transport: Rc<dyn Transport<D::File>>,
		history: Rc<dyn History>,
		scheduler: Rc<dyn Scheduler>,
	) -> RuntimeBuilder<D> {
		RuntimeBuilder {
			dom,
			transport,
			history,
			scheduler,
			serializer: None,
			settings: Settings::default(),
		}
	}

	/// Binds `element`, or returns its existing binding unchanged.
	///
	/// # Errors
	///
	/// Propagates option resolution failures; nothing is registered then.
	pub fn bind(&self, element: D::Element, options: Options<D::Element>) -> Result<Rc<Binding<D>>> {
		if let Some(existing) = self.get(&element) {
			tracing::debug!(element = ?element, "element already bound");
			return Ok(existing);
		}
		let binding = Binding::new(element, self.this.clone(), options);
		binding.init()?;
		Ok(binding)
	}

	/// Returns the binding of `element`.
	pub fn get(&self, element: &D::Element) -> Option<Rc<Binding<D>>> {
		self.bindings
			.borrow()
			.iter()
			.find(|(bound, _)| bound == element)
			.map(|(_, binding)| Rc::clone(binding))
	}

	/// Returns true if `element` has a binding.
	pub fn is_bound(&self, element: &D::Element) -> bool {
		self.get(element).is_some()
	}

	/// Destroys the binding of `element`. Returns false if there was none.
	pub fn destroy(&self, element: &D::Element) -> bool {
		match self.get(element) {
			Some(binding) => {
				binding.destroy();
				true
			}
			None => false,
		}
	}

	/// Number of registered bindings.
	pub fn binding_count(&self) -> usize {
		self.bindings.borrow().len()
	}

	/// Destroys the bindings of elements no longer in the document and
	/// returns how many were dropped. Their in-flight requests are aborted.
	pub fn prune_detached(&self) -> usize {
		let detached: Vec<Rc<Binding<D>>> = self
			.bindings
			.borrow()
			.iter()
			.filter(|(element, _)| !self.dom.is_connected(element))
			.map(|(_, binding)| Rc::clone(binding))
			.collect();
		for binding in &detached {
			binding.destroy();
		}
		if !detached.is_empty() {
			tracing::debug!(count = detached.len(), "dropped bindings of detached elements");
		}
		detached.len()
	}

	/// Binds every element carrying the marker attribute within `scope`
	/// (the scope itself included), or within the whole document when
	/// `scope` is `None`.
	///
	/// The attribute holds JSON: empty or `true` for the defaults, an object
	/// for options. Elements with malformed configuration are skipped with a
	/// warning. Returns the newly created bindings.
	pub fn init_declarative(&self, scope: Option<&D::Element>) -> Vec<Rc<Binding<D>>> {
		let marker = self.settings.marker_attribute.as_str();
		let selector = format!("[{}]", marker);

		let mut elements = Vec::new();
		if let Some(scope) = scope {
			if self.dom.matches(scope, &selector) {
				elements.push(scope.clone());
			}
		}
		elements.extend(self.dom.query_all(scope, &selector));

		let mut created = Vec::new();
		for element in elements {
			if self.is_bound(&element) {
				continue;
			}
			let text = self.dom.attribute(&element, marker).unwrap_or_default();
			let options = match Options::from_json_str(&text) {
				Ok(options) => options,
				Err(err) => {
					tracing::warn!(element = ?element, error = %err, "malformed declarative configuration, element skipped");
					continue;
				}
			};
			match self.bind(element.clone(), options) {
				Ok(binding) => created.push(binding),
				Err(err) => {
					tracing::warn!(element = ?element, error = %err, "declarative binding failed");
				}
			}
		}
		created
	}

	/// Returns a copy of the runtime-wide default options.
	pub fn defaults(&self) -> Options<D::Element> {
		self.defaults.get()
	}

	/// Updates the runtime-wide default options.
	pub fn set_defaults(&self, options: Options<D::Element>, mode: MergeMode) {
		self.defaults.set(options, mode);
	}

	/// Registers a named custom action.
	pub fn register_action<F>(&self, name: impl Into<String>, action: F)
	where
		F: Fn(&[D::Element], &[D::Element]) + 'static,
	{
		self.actions.borrow_mut().register(name, action);
	}

	/// Looks up a named custom action.
	pub fn action(&self, name: &str) -> Option<ActionFn<D::Element>> {
		self.actions.borrow().get(name)
	}

	/// Appends a trigger guesser; earlier guessers take precedence.
	pub fn add_trigger_guesser(&self, guesser: TriggerGuesser) {
		self.guessers.borrow_mut().push(guesser);
	}

	/// Guesses the trigger event of an element without an `on` option.
	pub fn guess_trigger(&self, element: &D::Element) -> Option<String> {
		self.guessers
			.borrow()
			.iter()
			.find_map(|guesser| guesser.guess(&*self.dom, element))
			.map(str::to_string)
	}

	/// The DOM collaborator.
	pub fn dom(&self) -> &Rc<D> {
		&self.dom
	}

	/// The settings this runtime was built with.
	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	pub(crate) fn transport(&self) -> &Rc<dyn Transport<D::File>> {
		&self.transport
	}

	pub(crate) fn history(&self) -> &Rc<dyn History> {
		&self.history
	}

	pub(crate) fn scheduler(&self) -> &Rc<dyn Scheduler> {
		&self.scheduler
	}

	pub(crate) fn serializer(&self) -> &Rc<dyn FormSerializer<D>> {
		&self.serializer
	}

	pub(crate) fn weak(&self) -> Weak<Self> {
		self.this.clone()
	}

	pub(crate) fn next_request_id(&self) -> RequestId {
		let id = self.next_request.get();
		self.next_request.set(id + 1);
		RequestId(id)
	}

	/// Registers `binding` unless another binding owns its element.
	pub(crate) fn register(&self, binding: &Rc<Binding<D>>) -> bool {
		let mut bindings = self.bindings.borrow_mut();
		match bindings.iter().find(|(element, _)| element == binding.element()) {
			Some((_, existing)) => Rc::ptr_eq(existing, binding),
			None => {
				bindings.push((binding.element().clone(), Rc::clone(binding)));
				true
			}
		}
	}

	pub(crate) fn unregister(&self, binding: &Binding<D>) {
		self.bindings
			.borrow_mut()
			.retain(|(_, existing)| !std::ptr::eq(Rc::as_ptr(existing), binding));
	}
}
