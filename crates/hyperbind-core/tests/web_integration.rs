//! Browser collaborator integration tests
//!
//! Run with `wasm-pack test --headless --firefox crates/hyperbind-core`.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use http::{HeaderMap, Method};
use hyperbind_core::web::{self, XhrTransport};
use hyperbind_core::{Body, Settings, Transport, TransportOutcome, TransportRequest};
use js_sys::Promise;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn get(url: &str) -> TransportRequest<web_sys::File> {
	TransportRequest {
		method: Method::GET,
		url: url.to_string(),
		headers: HeaderMap::new(),
		timeout: Some(Duration::from_secs(5)),
		body: Body::Empty,
	}
}

async fn send(request: TransportRequest<web_sys::File>) -> TransportOutcome {
	let outcome = Rc::new(RefCell::new(None));
	let mut request = Some(request);
	let promise = Promise::new(&mut |resolve, _reject| {
		let Some(request) = request.take() else {
			return;
		};
		let outcome = Rc::clone(&outcome);
		XhrTransport.send(
			request,
			Box::new(move |result| {
				*outcome.borrow_mut() = Some(result);
				let _ = resolve.call0(&JsValue::NULL);
			}),
		);
	});
	JsFuture::from(promise).await.unwrap();
	let result = outcome.borrow_mut().take();
	result.expect("completion ran")
}

#[wasm_bindgen_test]
async fn test_setup_failure_is_reported() {
	let outcome = send(get("http://[broken")).await;
	assert!(matches!(outcome, TransportOutcome::NetworkError(_)));
}

#[wasm_bindgen_test]
async fn test_missing_resource_is_loaded_with_status() {
	let outcome = send(get("/hyperbind-missing-resource")).await;
	match outcome {
		TransportOutcome::Loaded(response) => assert_eq!(response.status.as_u16(), 404),
		other => panic!("unexpected outcome {:?}", other),
	}
}

#[wasm_bindgen_test]
fn test_start_binds_loaded_document() {
	let document = web_sys::window().unwrap().document().unwrap();
	document
		.body()
		.unwrap()
		.set_inner_html(r#"<a id="declared" href="/x" data-hyperbind></a>"#);

	let runtime = web::start(Settings::default()).unwrap();

	let declared = document.get_element_by_id("declared").unwrap();
	assert_ne!(document.ready_state(), "loading");
	assert!(runtime.is_bound(&declared));
}
