//! Declarative binding and configuration integration tests
//!
//! Covers marker-attribute scanning (including content inserted by
//! responses), settings files, runtime defaults and option inheritance
//! through `extend`.

use hyperbind_core::testing::Harness;
use hyperbind_core::{Dom, MergeMode, Options, RequestState, SerialMode, Settings};
use http::Method;
use rstest::rstest;
use serde_json::json;
use std::time::Duration;

// ============================================================================
// Declarative scanning
// ============================================================================

/// Tests that bindings created from markup behave like coded ones, and
/// that markup inserted by a response is bound as well
#[rstest]
fn test_inserted_content_is_scanned() {
	let harness = Harness::new(
		r##"<div id="out"></div><a id="load" href="/fragment" data-hyperbind='{"target": "#out"}'>load</a>"##,
	);
	assert_eq!(harness.runtime.init_declarative(None).len(), 1);

	harness.dom.click(&harness.element("load"));
	harness.transport.respond(
		0,
		200,
		r##"<a id="more" href="/more" data-hyperbind='{"target": "#more-out", "method": "post"}'>more</a><div id="more-out"></div>"##,
	);
	harness.settle();

	let more = harness.element("more");
	assert!(harness.runtime.is_bound(&more));
	assert_eq!(harness.runtime.binding_count(), 2);

	harness.dom.click(&more);
	let request = harness.transport.request(1);
	assert_eq!(request.url, "/more");
	assert_eq!(request.method, Method::POST);

	harness.transport.respond(1, 200, "<em>deeper</em>");
	assert_eq!(harness.dom.inner_html(&harness.element("more-out")), "<em>deeper</em>");
}

/// Tests declarative values for every option family
#[rstest]
fn test_declarative_options_are_parsed() {
	let harness = Harness::new(
		r##"<form id="f" data-hyperbind='{
			"url": "/api",
			"serialMode": "defer",
			"redirectMode": "replace",
			"timeout": 1500,
			"headers": {"X-Version": 2, "X-Skip": null},
			"data": {"tags": ["a", "b"]},
			"on": "change submit",
			"history": true,
			"filter": "#main",
			"action": "append"
		}'></form>"##,
	);

	harness.runtime.init_declarative(None);

	let options = harness.runtime.get(&harness.element("f")).unwrap().options();
	assert_eq!(options.url.as_deref(), Some("/api"));
	assert_eq!(options.serial_mode, SerialMode::Queue);
	assert_eq!(options.redirect_mode, hyperbind_core::RedirectMode::Replace);
	assert_eq!(options.timeout, Duration::from_millis(1500));
	assert_eq!(options.headers.get("X-Version").map(String::as_str), Some("2"));
	assert!(!options.headers.contains_key("X-Skip"));
	assert_eq!(options.data, json!({"tags": ["a", "b"]}));
	assert_eq!(options.events(), vec!["change", "submit"]);
	assert!(options.history);
	assert_eq!(options.filter.as_deref(), Some("#main"));
	assert_eq!(options.action.name(), Some("append"));
	assert_eq!(harness.dom.listener_count(&harness.element("f")), 2);
}

/// Tests that a custom marker attribute is honoured
#[rstest]
fn test_custom_marker_attribute() {
	let settings = Settings {
		marker_attribute: "data-remote".to_string(),
		..Settings::default()
	};
	let harness = Harness::with_settings(
		r#"<a id="a" href="/a" data-remote></a><a id="b" href="/b" data-hyperbind></a>"#,
		settings,
	);

	harness.runtime.init_declarative(None);

	assert!(harness.runtime.is_bound(&harness.element("a")));
	assert!(!harness.runtime.is_bound(&harness.element("b")));
}

/// Tests that every copy inserted into several targets is scanned
#[rstest]
fn test_inserted_copies_are_scanned() {
	let harness = Harness::new(
		r#"<div class="slot" id="s1"></div><div class="slot" id="s2"></div><a id="load" href="/fragment"></a>"#,
	);
	harness.bind("load", Options::new().target(".slot"));

	harness.runtime.get(&harness.element("load")).unwrap().request().unwrap();
	harness
		.transport
		.respond(0, 200, r#"<a class="more" href="/more" data-hyperbind></a>"#);

	for slot in ["s1", "s2"] {
		let inserted = harness.dom.children(&harness.element(slot));
		assert_eq!(inserted.len(), 1);
		assert!(harness.runtime.is_bound(&inserted[0]));
	}
	assert_eq!(harness.runtime.binding_count(), 3);
}

// ============================================================================
// Registry upkeep
// ============================================================================

/// Tests that refilling a target drops the bindings of the removed markup
#[rstest]
fn test_refill_drops_removed_bindings() {
	let harness = Harness::new(r#"<div id="out"></div><a id="load" href="/fragment"></a>"#);
	let load = harness.bind("load", Options::new().target("#out"));
	let mut previous = Vec::new();

	for index in 0..5 {
		load.request().unwrap();
		harness
			.transport
			.respond(index, 200, r#"<a class="more" href="/more" data-hyperbind></a>"#);
		previous.extend(harness.dom.children(&harness.element("out")));
	}

	assert_eq!(harness.runtime.binding_count(), 2);
	let (current, removed) = previous.split_last().unwrap();
	assert!(harness.runtime.is_bound(current));
	for element in removed {
		assert!(!harness.runtime.is_bound(element));
		assert_eq!(harness.dom.listener_count(element), 0);
	}
}

/// Tests that a removed binding's in-flight request is aborted
#[rstest]
fn test_removed_binding_request_is_aborted() {
	let harness = Harness::new(
		r#"<div id="out"><a id="inner" href="/slow"></a></div><a id="load" href="/fragment"></a>"#,
	);
	let inner = harness.bind("inner", Options::new());
	let load = harness.bind("load", Options::new().target("#out"));

	let slow = inner.request().unwrap().unwrap();
	load.request().unwrap();
	harness.transport.respond(1, 200, "<p>gone</p>");

	assert_eq!(slow.state(), RequestState::Aborted);
	assert!(harness.transport.was_aborted(0));
	assert!(!inner.is_active());
	assert_eq!(harness.runtime.binding_count(), 1);
}

/// Tests that a binding replaced by its own response is dropped once the
/// swap has happened, and the replacement is bound
#[rstest]
fn test_replaced_binding_is_dropped_after_swap() {
	let harness = Harness::new(r#"<div id="box"><a id="self" href="/swap"></a></div>"#);
	let binding = harness.bind("self", Options::new().action("replace"));

	binding.request().unwrap();
	harness
		.transport
		.respond(0, 200, r#"<a id="next" href="/next" data-hyperbind></a>"#);
	assert!(binding.is_active());
	assert!(harness.dom.by_id("next").is_none());

	harness.settle();
	assert!(!binding.is_active());
	assert!(harness.runtime.is_bound(&harness.element("next")));
	assert_eq!(harness.runtime.binding_count(), 1);
}

// ============================================================================
// Settings and defaults
// ============================================================================

/// Tests that TOML settings feed the runtime defaults
#[rstest]
fn test_toml_settings_defaults() {
	let settings = Settings::from_toml_str(
		r#"
		max_redirects = 3

		[defaults]
		serialMode = "lock"
		method = "post"
		timeout = 2000
		"#,
	)
	.unwrap();
	let harness = Harness::with_settings(r#"<a id="a" href="/a"></a>"#, settings);

	let binding = harness.bind("a", Options::new().timeout(Duration::ZERO));

	let options = binding.options();
	assert_eq!(harness.runtime.settings().max_redirects, 3);
	assert_eq!(options.serial_mode, SerialMode::Lock);
	assert_eq!(options.method, Some(Method::POST));
	assert_eq!(options.timeout, Duration::ZERO);
}

/// Tests that JSON settings parse and invalid settings are rejected
#[rstest]
#[case(r#"{"serial_autoload": false, "defaults": {"history": true}}"#, true)]
#[case(r#"{"max_redirects": "many"}"#, false)]
fn test_json_settings(#[case] text: &str, #[case] valid: bool) {
	let parsed = Settings::from_json_str(text);
	assert_eq!(parsed.is_ok(), valid);
	if let Ok(settings) = parsed {
		assert!(!settings.serial_autoload);
		assert_eq!(settings.defaults.history, Some(true));
	}
}

/// Tests that changed runtime defaults apply on refresh but not before
#[rstest]
fn test_defaults_apply_after_refresh() {
	let harness = Harness::new(r#"<a id="a" href="/a"></a>"#);
	let binding = harness.bind("a", Options::new().data(json!({"own": 1})));

	harness
		.runtime
		.set_defaults(Options::new().serial_mode(SerialMode::Force).data(json!({"site": 1})), MergeMode::Deep);
	assert_eq!(binding.options().serial_mode, SerialMode::Async);

	binding.refresh().unwrap();
	assert_eq!(binding.options().serial_mode, SerialMode::Force);
	assert_eq!(binding.options().data, json!({"site": 1, "own": 1}));

	harness.runtime.set_defaults(Options::new(), MergeMode::Replace);
	binding.refresh().unwrap();
	assert_eq!(binding.options().serial_mode, SerialMode::Async);
}

// ============================================================================
// Inheritance
// ============================================================================

/// Tests that `extend` inherits everything except the per-element options
#[rstest]
fn test_extend_inherits_parent_options() {
	let harness = Harness::new(
		r#"<section id="panel"><div id="out"></div><a id="child" href="/c"></a></section>"#,
	);
	harness.bind(
		"panel",
		Options::new()
			.target("#out")
			.header("X-Panel", "1")
			.on("mouseenter")
			.autoload(true)
			.prevent_default(false),
	);

	let child = harness.bind("child", Options::new().extend("closest(section)"));

	let options = child.options();
	assert_eq!(options.target, hyperbind_core::Selector::Css("#out".to_string()));
	assert_eq!(options.headers.get("X-Panel").map(String::as_str), Some("1"));
	assert!(options.on.is_none());
	assert!(!options.autoload);
	assert!(options.prevent_default);
}

/// Tests that an unbound extend target contributes nothing
#[rstest]
fn test_extend_without_parent_binding() {
	let harness = Harness::new(r#"<section id="panel"><a id="child" href="/c"></a></section>"#);

	let child = harness.bind("child", Options::new().extend("#panel"));

	assert!(child.options().target.is_bound());
}
