//! Bindings: one element, one configuration, one request lifecycle.
//!
//! A [`Binding`] is created through [`Runtime::bind`] and stays registered
//! until it is destroyed. Its public surface mirrors the imperative API of
//! a bound element:
//!
//! | Method                              | Effect                                   |
//! |-------------------------------------|------------------------------------------|
//! | [`request`](Binding::request)       | issue a request with the bound options   |
//! | [`request_with`](Binding::request_with) | issue a request with per-call overrides |
//! | [`abort`](Binding::abort)           | cancel in-flight and queued requests     |
//! | [`options`](Binding::options)       | read the frozen options                  |
//! | [`set_options`](Binding::set_options) | reconfigure                            |
//! | [`destroy`](Binding::destroy)       | abort, unbind and unregister             |
//! | [`init`](Binding::init)             | configure, bind and register             |
//! | [`refresh`](Binding::refresh)       | destroy followed by init                 |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::dom::{Dom, ListenerId};
use crate::error::Result;
use crate::events::{Event, EventDetail, EventKind, Listeners, SubscriptionId};
use crate::lifecycle::LifecycleState;
use crate::options::{Options, OptionValue, ResolvedOptions};
use crate::request::RequestId;
use crate::runtime::Runtime;
use crate::selector::Selector;

pub(crate) type PressedButton = Rc<RefCell<Option<(String, String)>>>;

/// The association of one element with its options and request state.
pub struct Binding<D: Dom> {
	element: D::Element,
	runtime: Weak<Runtime<D>>,
	this: Weak<Self>,
	own: RefCell<Options<D::Element>>,
	layers: RefCell<Options<D::Element>>,
	resolved: RefCell<Rc<ResolvedOptions<D::Element>>>,
	listeners: Listeners<D::Element, D::File>,
	trigger_ids: RefCell<Vec<ListenerId>>,
	pressed: PressedButton,
	pub(crate) lifecycle: RefCell<LifecycleState<D::Element, D::File>>,
	active: Cell<bool>,
}

impl<D: Dom> fmt::Debug for Binding<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Binding")
			.field("element", &self.element)
			.field("active", &self.active.get())
			.field("options", &*self.resolved.borrow())
			.field("listeners", &self.listeners)
			.finish()
	}
}

impl<D: Dom> Binding<D> {
	pub(crate) fn new(
		element: D::Element,
		runtime: Weak<Runtime<D>>,
		options: Options<D::Element>,
	) -> Rc<Self> {
		Rc::new_cyclic(|this| Self {
			element,
			runtime,
			this: this.clone(),
			own: RefCell::new(options),
			layers: RefCell::new(Options::new()),
			resolved: RefCell::new(Rc::new(ResolvedOptions::default())),
			listeners: Listeners::default(),
			trigger_ids: RefCell::new(Vec::new()),
			pressed: Rc::new(RefCell::new(None)),
			lifecycle: RefCell::new(LifecycleState::default()),
			active: Cell::new(false),
		})
	}

	/// The bound element.
	pub fn element(&self) -> &D::Element {
		&self.element
	}

	/// Returns true between [`init`](Self::init) and
	/// [`destroy`](Self::destroy).
	pub fn is_active(&self) -> bool {
		self.active.get()
	}

	/// The frozen options of this binding.
	pub fn options(&self) -> Rc<ResolvedOptions<D::Element>> {
		Rc::clone(&self.resolved.borrow())
	}

	/// Layers `options` over the binding's own options and re-runs
	/// resolution. Triggers are re-bound if the binding is active.
	///
	/// # Errors
	///
	/// Propagates resolution failures; the previous configuration is then
	/// kept.
	pub fn set_options(&self, options: Options<D::Element>) -> Result<()> {
		let previous = self.own.borrow().clone();
		*self.own.borrow_mut() = previous.clone().merge(options);
		if !self.active.get() {
			return Ok(());
		}
		let Some(runtime) = self.runtime.upgrade() else {
			return Ok(());
		};
		if let Err(err) = self.configure(&runtime) {
			*self.own.borrow_mut() = previous;
			return Err(err);
		}
		self.bind_triggers(&runtime);
		Ok(())
	}

	/// Configures the binding, attaches its triggers and registers it.
	/// Does nothing if the binding is already active.
	///
	/// # Errors
	///
	/// Propagates option resolution failures.
	pub fn init(&self) -> Result<()> {
		if self.active.get() {
			return Ok(());
		}
		let (Some(runtime), Some(this)) = (self.runtime.upgrade(), self.this.upgrade()) else {
			return Ok(());
		};
		if runtime.get(&self.element).is_some_and(|other| !Rc::ptr_eq(&other, &this)) {
			tracing::warn!(element = ?self.element, "element is bound by another binding, init skipped");
			return Ok(());
		}

		self.configure(&runtime)?;
		self.bind_triggers(&runtime);
		self.active.set(true);
		runtime.register(&this);
		tracing::debug!(element = ?self.element, "binding initialized");

		if self.options().autoload {
			runtime.schedule_autoload(&this);
		}
		Ok(())
	}

	/// Aborts all requests, removes the trigger listeners and unregisters
	/// the binding. Later requests are no-ops until [`init`](Self::init).
	pub fn destroy(&self) {
		if !self.active.get() {
			return;
		}
		self.abort();
		self.active.set(false);
		self.pressed.borrow_mut().take();
		if let Some(runtime) = self.runtime.upgrade() {
			self.unbind_triggers(&runtime);
			runtime.unregister(self);
		}
		tracing::debug!(element = ?self.element, "binding destroyed");
	}

	/// Destroys and re-initializes the binding, re-running resolution
	/// against the current runtime defaults.
	///
	/// # Errors
	///
	/// Propagates option resolution failures.
	pub fn refresh(&self) -> Result<()> {
		self.destroy();
		self.init()
	}

	/// Subscribes to binding events.
	pub fn on<F>(&self, kind: EventKind, listener: F) -> SubscriptionId
	where
		F: Fn(&mut Event<'_, D::Element, D::File>) + 'static,
	{
		self.listeners.on(kind, Rc::new(listener))
	}

	/// Removes an event subscription.
	pub fn off(&self, id: SubscriptionId) -> bool {
		self.listeners.off(id)
	}

	pub(crate) fn emit(&self, request: RequestId, detail: EventDetail<'_, D::Element, D::File>) {
		self.listeners.emit(&mut Event::new(request, &self.element, detail));
	}

	pub(crate) fn runtime(&self) -> Option<Rc<Runtime<D>>> {
		self.runtime.upgrade()
	}

	pub(crate) fn weak(&self) -> Weak<Self> {
		self.this.clone()
	}

	pub(crate) fn pressed_slot(&self) -> PressedButton {
		Rc::clone(&self.pressed)
	}

	pub(crate) fn take_pressed(&self) -> Option<(String, String)> {
		self.pressed.borrow_mut().take()
	}

	pub(crate) fn layers(&self) -> Options<D::Element> {
		self.layers.borrow().clone()
	}

	pub(crate) fn replace_listener_ids(&self, ids: Vec<ListenerId>, dom: &Rc<D>) {
		let previous = std::mem::replace(&mut *self.trigger_ids.borrow_mut(), ids);
		for id in previous {
			dom.remove_listener(id);
		}
	}

	/// Resolves the own options, merges them over the defaults and the
	/// parent's inheritable options, and freezes the result.
	fn configure(&self, runtime: &Runtime<D>) -> Result<()> {
		let own = self.own.borrow().resolve(&self.element)?;
		let defaults = runtime.defaults().resolve(&self.element)?;

		let extend = own
			.extend_selector()
			.or(defaults.extend_selector())
			.and_then(OptionValue::as_literal)
			.cloned()
			.unwrap_or(Selector::Nothing);
		let parent = extend
			.resolve(&**runtime.dom(), &self.element)?
			.into_iter()
			.next()
			.and_then(|element| runtime.get(&element))
			.filter(|parent| !std::ptr::eq(Rc::as_ptr(parent), self))
			.map(|parent| parent.layers().inheritable())
			.unwrap_or_default();

		let layers = defaults.merge(parent).merge(own);
		let resolved = layers.freeze(&self.element)?;
		*self.layers.borrow_mut() = layers;
		*self.resolved.borrow_mut() = Rc::new(resolved);
		Ok(())
	}
}
