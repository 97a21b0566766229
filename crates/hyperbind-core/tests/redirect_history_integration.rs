//! Redirect and history integration tests
//!
//! Servers signal redirects through response headers instead of 3xx
//! statuses. These tests cover following them (with and without the
//! original payload), the hop limit, browser navigation modes and history
//! entries pushed after successful responses.

use std::cell::RefCell;
use std::rc::Rc;

use hyperbind_core::testing::{Harness, HistoryEntry, Navigation};
use hyperbind_core::{
	EventDetail, EventKind, HyperbindError, Options, RedirectMode, RequestError, RequestState,
	Settings,
};
use http::Method;
use rstest::{fixture, rstest};
use serde_json::json;

const PAGE: &str = r#"<a id="save" href="/save">save</a><div id="out">old</div>"#;

#[fixture]
fn harness() -> Harness {
	Harness::new(PAGE)
}

fn redirect_to(harness: &Harness, index: usize, location: &str, status: &str) {
	harness.transport.respond_with_headers(
		index,
		200,
		&[("Hyperbind-Redirect", location), ("Hyperbind-Redirect-Status", status)],
		"",
	);
}

fn count(binding: &hyperbind_core::testing::MockBinding, kind: EventKind) -> Rc<RefCell<usize>> {
	let counter = Rc::new(RefCell::new(0));
	binding.on(kind, {
		let counter = Rc::clone(&counter);
		move |_| *counter.borrow_mut() += 1
	});
	counter
}

// ============================================================================
// Following redirects
// ============================================================================

/// Tests that 301/302/303 redirects are followed with a bare GET
#[rstest]
#[case("301")]
#[case("302")]
#[case("303")]
fn test_follow_drops_payload(harness: Harness, #[case] status: &str) {
	let binding = harness.bind(
		"save",
		Options::new().method("post").data(json!({"a": 1})).target("#out"),
	);
	let redirects = count(&binding, EventKind::Redirect);
	let befores = count(&binding, EventKind::Before);

	let ticket = binding.request().unwrap().unwrap();
	redirect_to(&harness, 0, "/done", status);

	assert_eq!(*redirects.borrow(), 1);
	assert_eq!(ticket.state(), RequestState::InFlight);
	assert_eq!(harness.transport.sent_count(), 1);

	harness.settle();
	assert_eq!(harness.transport.sent_count(), 2);
	let followed = harness.transport.request(1);
	assert_eq!(followed.method, Method::GET);
	assert_eq!(followed.url, "/done");
	assert!(followed.body.is_empty());
	assert_eq!(*befores.borrow(), 2);

	harness.transport.respond(1, 200, "<p>done</p>");
	assert_eq!(ticket.state(), RequestState::Succeeded);
	assert_eq!(harness.dom.inner_html(&harness.element("out")), "<p>done</p>");
}

/// Tests that 307/308 redirects re-send the original method and payload
#[rstest]
#[case("307")]
#[case("308")]
fn test_follow_preserves_payload(harness: Harness, #[case] status: &str) {
	let binding = harness.bind("save", Options::new().method("put").data(json!({"a": 1})));

	binding.request().unwrap();
	redirect_to(&harness, 0, "/elsewhere", status);
	harness.settle();

	let followed = harness.transport.request(1);
	assert_eq!(followed.method, Method::PUT);
	assert_eq!(followed.url, "/elsewhere");
	assert_eq!(followed.body.entries(), harness.transport.request(0).body.entries());
}

/// Tests that a missing status header is treated as 302
#[rstest]
fn test_redirect_status_defaults_to_found(harness: Harness) {
	let binding = harness.bind("save", Options::new().method("post").data(json!({"a": 1})));

	binding.request().unwrap();
	harness
		.transport
		.respond_with_headers(0, 200, &[("Hyperbind-Redirect", "/next")], "");
	harness.settle();

	assert_eq!(harness.transport.request(1).method, Method::GET);
}

/// Tests that a followed redirect is sent even while a queued request
/// waits, and ahead of it
#[rstest]
fn test_followed_redirect_bypasses_queue(harness: Harness) {
	let binding = harness.bind(
		"save",
		Options::new().serial_mode(hyperbind_core::SerialMode::Queue),
	);

	let first = binding.request().unwrap().unwrap();
	let second = binding.request().unwrap().unwrap();
	redirect_to(&harness, 0, "/moved", "303");
	harness.settle();

	assert_eq!(harness.transport.sent_count(), 2);
	assert_eq!(harness.transport.request(1).url, "/moved");
	assert_eq!(second.state(), RequestState::Pending);

	harness.transport.respond(1, 200, "<p>moved</p>");
	harness.settle();
	assert_eq!(first.state(), RequestState::Succeeded);
	assert_eq!(harness.transport.sent_count(), 3);
	assert_eq!(second.state(), RequestState::InFlight);
}

/// Tests that redirect loops stop at the configured hop limit
#[rstest]
fn test_redirect_limit() {
	let harness = Harness::with_settings(
		PAGE,
		Settings {
			max_redirects: 2,
			..Settings::default()
		},
	);
	let binding = harness.bind("save", Options::new());
	let errors = Rc::new(RefCell::new(Vec::new()));
	binding.on(EventKind::Error, {
		let errors = Rc::clone(&errors);
		move |event| {
			if let EventDetail::Error(RequestError::Config(HyperbindError::RedirectLimit { limit, location })) =
				event.detail()
			{
				errors.borrow_mut().push((*limit, location.clone()));
			}
		}
	});

	let ticket = binding.request().unwrap().unwrap();
	for index in 0..3 {
		redirect_to(&harness, index, &format!("/loop/{}", index), "302");
		harness.settle();
	}

	assert_eq!(harness.transport.sent_count(), 3);
	assert_eq!(*errors.borrow(), vec![(2, "/loop/2".to_string())]);
	assert_eq!(ticket.state(), RequestState::Failed);
}

// ============================================================================
// Navigation modes and interception
// ============================================================================

/// Tests that assign and replace hand the location to the browser
#[rstest]
#[case(RedirectMode::Assign, Navigation::Assign("/login".to_string()))]
#[case(RedirectMode::Replace, Navigation::Replace("/login".to_string()))]
fn test_navigation_modes(harness: Harness, #[case] mode: RedirectMode, #[case] expected: Navigation) {
	let binding = harness.bind("save", Options::new().target("#out").redirect_mode(mode));

	let ticket = binding.request().unwrap().unwrap();
	redirect_to(&harness, 0, "/login", "302");
	harness.settle();

	assert_eq!(harness.history.navigations(), vec![expected]);
	assert_eq!(ticket.state(), RequestState::Succeeded);
	assert_eq!(harness.transport.sent_count(), 1);
	assert_eq!(harness.dom.inner_html(&harness.element("out")), "old");
}

/// Tests that with interception off the redirect headers are ignored
#[rstest]
fn test_interception_disabled(harness: Harness) {
	let binding = harness.bind("save", Options::new().target("#out").intercept_redirect(false));

	binding.request().unwrap();
	assert!(harness.transport.request(0).headers.get("hyperbind-intercept-redirect").is_none());

	harness.transport.respond_with_headers(0, 200, &[("Hyperbind-Redirect", "/login")], "<p>body</p>");
	harness.settle();

	assert_eq!(harness.transport.sent_count(), 1);
	assert!(harness.history.navigations().is_empty());
	assert_eq!(harness.dom.inner_html(&harness.element("out")), "<p>body</p>");
}

// ============================================================================
// History entries
// ============================================================================

/// Tests that history entries use the title and URL headers
#[rstest]
fn test_history_entry_from_headers(harness: Harness) {
	let binding = harness.bind("save", Options::new().target("#out").history(true));

	binding.request().unwrap();
	harness.transport.respond_with_headers(
		0,
		200,
		&[("Hyperbind-Title", "Page 2"), ("Hyperbind-Url", "/items?page=2")],
		"<p>2</p>",
	);

	assert_eq!(
		harness.history.entries(),
		vec![HistoryEntry {
			title: "Page 2".to_string(),
			url: Some("/items?page=2".to_string()),
		}]
	);
	assert_eq!(harness.history.navigations(), vec![]);
	assert_eq!(
		hyperbind_core::History::current_url(&*harness.history),
		"/items?page=2"
	);
}

/// Tests that no entry is pushed unless history is enabled, and that
/// missing headers keep the current URL
#[rstest]
#[case(false, 0)]
#[case(true, 1)]
fn test_history_toggle(harness: Harness, #[case] history: bool, #[case] expected: usize) {
	let binding = harness.bind("save", Options::new().target("#out").history(history));

	binding.request().unwrap();
	harness.transport.respond(0, 200, "<p>x</p>");

	let entries = harness.history.entries();
	assert_eq!(entries.len(), expected);
	assert!(entries.iter().all(|entry| entry.title.is_empty() && entry.url.is_none()));
}

/// Tests that failed responses never touch history
#[rstest]
fn test_history_untouched_on_failure(harness: Harness) {
	let binding = harness.bind("save", Options::new().history(true));

	binding.request().unwrap();
	harness.transport.respond(0, 500, "oops");

	assert!(harness.history.entries().is_empty());
}
