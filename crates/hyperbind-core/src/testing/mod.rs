//! In-memory collaborators for exercising hyperbind without a browser.
//!
//! [`Harness`] wires a [`Runtime`] to a [`MockDom`], a [`MockTransport`],
//! a [`MockHistory`] and a [`ManualScheduler`]. Requests stay open until
//! the test completes them through the transport, and deferred work only
//! runs on [`Harness::settle`].
//!
//! ```
//! use hyperbind_core::testing::Harness;
//! use hyperbind_core::Options;
//!
//! let harness = Harness::new(r#"<a id="more" href="/more"></a><div id="out"></div>"#);
//! harness.bind("more", Options::new().target("#out"));
//!
//! harness.dom.click(&harness.element("more"));
//! harness.transport.respond(0, 200, "<p>loaded</p>");
//! harness.settle();
//!
//! assert_eq!(harness.dom.inner_html(&harness.element("out")), "<p>loaded</p>");
//! ```

mod css;
mod dom;
mod history;
mod html;
mod scheduler;
mod transport;

use std::rc::Rc;

pub use dom::{MockDom, MockElement};
pub use history::{HistoryEntry, MockHistory, Navigation};
pub use scheduler::ManualScheduler;
pub use transport::MockTransport;

use crate::binding::Binding;
use crate::options::Options;
use crate::runtime::{Runtime, RuntimeBuilder};
use crate::settings::Settings;

/// A binding over the mock document.
pub type MockBinding = Binding<MockDom>;

/// A runtime wired to mock collaborators.
pub struct Harness {
	/// The document.
	pub dom: Rc<MockDom>,
	/// The transport.
	pub transport: Rc<MockTransport>,
	/// The scheduler; see [`settle`](Self::settle).
	pub scheduler: Rc<ManualScheduler>,
	/// The history.
	pub history: Rc<MockHistory>,
	/// The runtime under test.
	pub runtime: Rc<Runtime<MockDom>>,
}

impl Harness {
	/// Builds a harness with default settings around `html`.
	pub fn new(html: &str) -> Self {
		Self::with_settings(html, Settings::default())
	}

	/// Builds a harness with custom settings.
	///
	/// # Panics
	///
	/// Panics if the settings carry invalid defaults.
	pub fn with_settings(html: &str, settings: Settings) -> Self {
		Self::with_builder(html, |builder| builder.settings(settings))
	}

	/// Builds a harness, letting `configure` adjust the runtime builder.
	///
	/// # Panics
	///
	/// Panics if the runtime fails to build.
	pub fn with_builder<F>(html: &str, configure: F) -> Self
	where
		F: FnOnce(RuntimeBuilder<MockDom>) -> RuntimeBuilder<MockDom>,
	{
		let dom = Rc::new(MockDom::new());
		dom.set_body(html);
		let transport = Rc::new(MockTransport::new());
		let scheduler = Rc::new(ManualScheduler::new());
		let history = Rc::new(MockHistory::new());
		let builder = Runtime::builder(
			Rc::clone(&dom),
			transport.clone(),
			history.clone(),
			scheduler.clone(),
		);
		let runtime = configure(builder).build().expect("runtime builds");
		Self {
			dom,
			transport,
			scheduler,
			history,
			runtime,
		}
	}

	/// Returns the element with `id`.
	///
	/// # Panics
	///
	/// Panics if no such element is attached.
	pub fn element(&self, id: &str) -> MockElement {
		self.dom
			.by_id(id)
			.unwrap_or_else(|| panic!("no element with id {:?}", id))
	}

	/// Binds the element with `id`.
	///
	/// # Panics
	///
	/// Panics if the element is missing or binding fails.
	pub fn bind(&self, id: &str, options: Options<MockElement>) -> Rc<MockBinding> {
		self.runtime
			.bind(self.element(id), options)
			.expect("binding succeeds")
	}

	/// Runs deferred work until nothing is left.
	pub fn settle(&self) {
		self.scheduler.run_until_idle();
	}
}
