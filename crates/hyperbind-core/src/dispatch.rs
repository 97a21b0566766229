//! Response handling: redirects, status classification and actions.

use std::rc::Rc;

use http::Method;

use crate::action::{self, Action};
use crate::binding::Binding;
use crate::dom::Dom;
use crate::error::HyperbindError;
use crate::events::{EventDetail, RequestError};
use crate::lifecycle::{Active, Queued};
use crate::options::{RedirectMode, ResolvedOptions};
use crate::request::{PendingRequest, RequestState};
use crate::response::{Redirect, ResponseContext};
use crate::runtime::Runtime;
use crate::transport::TransportOutcome;

/// Narrows parsed content to the filter: matching top-level nodes, else the
/// first matching descendant, else nothing.
pub(crate) fn filter_content<D: Dom>(dom: &D, content: Vec<D::Element>, filter: &str) -> Vec<D::Element> {
	let matching: Vec<D::Element> = content
		.iter()
		.filter(|node| dom.matches(node, filter))
		.cloned()
		.collect();
	if !matching.is_empty() {
		return matching;
	}
	content
		.iter()
		.find_map(|node| dom.query_all(Some(node), filter).into_iter().next())
		.into_iter()
		.collect()
}

/// Builds the follow-up request for a redirect. 307 and 308 keep the method
/// and payload; every other status turns into a bare GET.
pub(crate) fn follow_request<F: Clone>(pending: &PendingRequest<F>, redirect: &Redirect) -> PendingRequest<F> {
	let mut next = pending.clone();
	next.url = redirect.location.clone();
	if !redirect.preserves_method() {
		next.method = Method::GET;
		next.data.clear();
	}
	next
}

/// Drops bindings whose elements were removed and binds declarative
/// elements among the inserted nodes.
fn settle_inserted<D: Dom>(runtime: &Runtime<D>, inserted: &[D::Element]) {
	runtime.prune_detached();
	for node in inserted {
		runtime.init_declarative(Some(node));
	}
}

impl<D: Dom> Binding<D> {
	pub(crate) fn dispatch(
		&self,
		runtime: &Rc<Runtime<D>>,
		active: Active<D::Element, D::File>,
		outcome: TransportOutcome,
	) {
		let id = active.ticket.id();
		let response = match outcome {
			TransportOutcome::TimedOut => {
				tracing::debug!(request = %id, "request timed out");
				self.emit(id, EventDetail::Timeout);
				self.finish(&active.ticket, RequestState::Failed, None);
				return;
			}
			TransportOutcome::NetworkError(message) => {
				let error = RequestError::Network(message);
				tracing::debug!(request = %id, error = %error, "request failed");
				self.emit(id, EventDetail::Error(&error));
				self.finish(&active.ticket, RequestState::Failed, None);
				return;
			}
			TransportOutcome::Loaded(response) => response,
		};

		self.emit(id, EventDetail::Load(&response));
		let dom = runtime.dom();
		let mut context = ResponseContext::new(response.status, response.headers, response.body);

		if active.options.intercept_redirect {
			if let Some(redirect) = context.redirect.clone() {
				self.emit(id, EventDetail::Redirect(&context));
				self.redirect(runtime, active, context, redirect);
				return;
			}
		}

		let status = context.status;
		if status.as_u16() >= 400 {
			context.content = dom.parse_fragment(&context.body);
			self.emit(id, EventDetail::Failure(&context));
			self.finish(&active.ticket, RequestState::Failed, Some(&context));
			return;
		}
		if !status.is_success() {
			tracing::warn!(request = %id, status = status.as_u16(), "unexpected response status");
			self.finish(&active.ticket, RequestState::Failed, Some(&context));
			return;
		}

		let content = dom.parse_fragment(&context.body);
		context.content = match &active.options.filter {
			Some(filter) => filter_content(&**dom, content, filter),
			None => content,
		};
		context.targets = match active.options.target.resolve(&**dom, self.element()) {
			Ok(targets) => targets,
			Err(err) => {
				self.fail(&active, Some(&context), err);
				return;
			}
		};

		self.emit(id, EventDetail::Success(&context));
		self.apply(runtime, &active.options, &context);
		self.finish(&active.ticket, RequestState::Succeeded, Some(&context));
	}

	fn apply(
		&self,
		runtime: &Rc<Runtime<D>>,
		options: &ResolvedOptions<D::Element>,
		context: &ResponseContext<D::Element>,
	) {
		let lookup = |name: &str| runtime.action(name);
		let inserted = action::apply(
			&options.action,
			runtime.dom(),
			runtime.scheduler(),
			&lookup,
			&context.targets,
			&context.content,
		)
		.unwrap_or_default();

		// Replaced nodes only leave the document once the deferred swap has
		// run, so settle the registry after it.
		if matches!(options.action, Action::Replace) {
			let weak = runtime.weak();
			runtime.scheduler().defer(Box::new(move || {
				if let Some(runtime) = weak.upgrade() {
					settle_inserted(&runtime, &inserted);
				}
			}));
		} else {
			settle_inserted(runtime, &inserted);
		}
		if options.history {
			runtime
				.history()
				.push_state(context.title.as_deref().unwrap_or(""), context.url.as_deref());
		}
	}

	fn redirect(
		&self,
		runtime: &Rc<Runtime<D>>,
		active: Active<D::Element, D::File>,
		context: ResponseContext<D::Element>,
		redirect: Redirect,
	) {
		match active.options.redirect_mode {
			RedirectMode::Assign => {
				runtime.history().assign(&redirect.location);
				self.finish(&active.ticket, RequestState::Succeeded, Some(&context));
			}
			RedirectMode::Replace => {
				runtime.history().replace(&redirect.location);
				self.finish(&active.ticket, RequestState::Succeeded, Some(&context));
			}
			RedirectMode::Follow => {
				let limit = runtime.settings().max_redirects;
				if active.hops >= limit {
					let err = HyperbindError::RedirectLimit {
						limit,
						location: redirect.location,
					};
					self.fail(&active, Some(&context), err);
					return;
				}
				let mut pending = follow_request(&active.pending, &redirect);
				self.emit(active.ticket.id(), EventDetail::Before(&mut pending));
				tracing::debug!(
					request = %active.ticket.id(),
					location = %pending.url,
					status = redirect.status.as_u16(),
					"following redirect"
				);
				self.enqueue_continuation(Queued {
					ticket: active.ticket,
					options: active.options,
					pending,
					hops: active.hops + 1,
					continuation: true,
				});
			}
		}
	}

	fn fail(
		&self,
		active: &Active<D::Element, D::File>,
		context: Option<&ResponseContext<D::Element>>,
		err: HyperbindError,
	) {
		let error = RequestError::Config(err);
		tracing::warn!(request = %active.ticket.id(), error = %error, "request failed");
		self.emit(active.ticket.id(), EventDetail::Error(&error));
		self.finish(&active.ticket, RequestState::Failed, context);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::FormEntry;
	use crate::testing::MockDom;
	use rstest::rstest;
	use std::collections::BTreeMap;
	use std::time::Duration;

	#[rstest]
	#[case(r#"<p class="x">1</p><p>2</p><p class="x">3</p>"#, ".x", 2)]
	#[case(r#"<div><p class="x">1</p><p class="x">2</p></div>"#, ".x", 1)]
	#[case(r#"<div><p>1</p></div>"#, ".x", 0)]
	fn test_filter_content(#[case] html: &str, #[case] filter: &str, #[case] expected: usize) {
		let dom = MockDom::new();
		let content = dom.parse_fragment(html);
		let filtered = filter_content(&dom, content, filter);
		assert_eq!(filtered.len(), expected);
		assert!(filtered.iter().all(|node| dom.matches(node, filter)));
	}

	#[rstest]
	#[case(303, Method::GET, 0)]
	#[case(302, Method::GET, 0)]
	#[case(307, Method::PUT, 1)]
	#[case(308, Method::PUT, 1)]
	fn test_follow_request(#[case] status: u16, #[case] method: Method, #[case] entries: usize) {
		let pending: PendingRequest<()> = PendingRequest {
			method: Method::PUT,
			url: "/save".to_string(),
			headers: BTreeMap::from([("X-A".to_string(), "1".to_string())]),
			data: vec![FormEntry::text("a", "1")],
			timeout: Duration::from_secs(1),
			intercept_redirect: true,
		};
		let redirect = Redirect {
			location: "/saved".to_string(),
			status: http::StatusCode::from_u16(status).unwrap(),
		};

		let next = follow_request(&pending, &redirect);
		assert_eq!(next.url, "/saved");
		assert_eq!(next.method, method);
		assert_eq!(next.data.len(), entries);
		assert_eq!(next.headers.len(), 1);
	}
}
