//! Element selectors used by the `source`, `target` and `extend` options.
//!
//! ## Grammar
//!
//! | Written as        | Meaning                                        |
//! |-------------------|------------------------------------------------|
//! | `"."` / `"self"`  | the bound element                              |
//! | `""`              | no element                                     |
//! | `method(arg)`     | traversal relative to the bound element        |
//! | anything else     | CSS selector evaluated against the document    |
//!
//! Supported traversal methods are `closest`, `parent`, `parents`, `find`,
//! `children`, `next`, `prev` and `siblings`. The argument is a CSS
//! selector and may be empty where filtering is optional.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::Dom;
use crate::error::{HyperbindError, Result};

static RELATIVE_PATTERN: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^(\w+)\((.*)\)$").expect("relative selector pattern is valid")
});

/// A reference to zero or more elements, evaluated when used.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector<E> {
	/// The bound element itself.
	Bound,
	/// No element at all.
	Nothing,
	/// A CSS selector evaluated against the whole document.
	Css(String),
	/// A traversal starting from the bound element.
	Relative {
		/// Traversal method (e.g. `closest`).
		method: String,
		/// CSS argument passed to the method.
		argument: String,
	},
	/// Explicit element handles.
	Elements(Vec<E>),
}

impl<E> Selector<E> {
	/// Parses the textual selector grammar.
	pub fn parse(selector: &str) -> Self {
		let selector = selector.trim();
		match selector {
			"" => Self::Nothing,
			"." | "self" => Self::Bound,
			_ => match RELATIVE_PATTERN.captures(selector) {
				Some(caps) => Self::Relative {
					method: caps[1].to_string(),
					argument: caps[2].trim().to_string(),
				},
				None => Self::Css(selector.to_string()),
			},
		}
	}

	/// Returns true for [`Selector::Bound`].
	pub fn is_bound(&self) -> bool {
		matches!(self, Self::Bound)
	}
}

impl<E> From<&str> for Selector<E> {
	fn from(selector: &str) -> Self {
		Self::parse(selector)
	}
}

impl<E> From<String> for Selector<E> {
	fn from(selector: String) -> Self {
		Self::parse(&selector)
	}
}

impl<E> From<Vec<E>> for Selector<E> {
	fn from(elements: Vec<E>) -> Self {
		Self::Elements(elements)
	}
}

impl<E: Clone> Selector<E> {
	/// Evaluates the selector relative to `bound`.
	///
	/// # Errors
	///
	/// Returns [`HyperbindError::InvalidSelector`] for unknown traversal
	/// methods.
	pub fn resolve<D>(&self, dom: &D, bound: &E) -> Result<Vec<E>>
	where
		D: Dom<Element = E>,
	{
		match self {
			Self::Bound => Ok(vec![bound.clone()]),
			Self::Nothing => Ok(Vec::new()),
			Self::Css(css) => Ok(dom.query_all(None, css)),
			Self::Elements(elements) => Ok(elements.clone()),
			Self::Relative { method, argument } => traverse(dom, bound, method, argument),
		}
	}
}

fn accepts<D: Dom>(dom: &D, element: &D::Element, filter: &str) -> bool {
	filter.is_empty() || dom.matches(element, filter)
}

fn siblings_of<D: Dom>(dom: &D, element: &D::Element) -> (Vec<D::Element>, Option<usize>) {
	match dom.parent(element) {
		Some(parent) => {
			let children = dom.children(&parent);
			let index = children.iter().position(|child| child == element);
			(children, index)
		}
		None => (Vec::new(), None),
	}
}

fn traverse<D: Dom>(
	dom: &D,
	bound: &D::Element,
	method: &str,
	argument: &str,
) -> Result<Vec<D::Element>> {
	let found = match method {
		"closest" => {
			let mut current = Some(bound.clone());
			let mut found = Vec::new();
			while let Some(element) = current {
				if accepts(dom, &element, argument) {
					found.push(element);
					break;
				}
				current = dom.parent(&element);
			}
			found
		}
		"parent" => dom
			.parent(bound)
			.filter(|parent| accepts(dom, parent, argument))
			.into_iter()
			.collect(),
		"parents" => {
			let mut found = Vec::new();
			let mut current = dom.parent(bound);
			while let Some(element) = current {
				if accepts(dom, &element, argument) {
					found.push(element.clone());
				}
				current = dom.parent(&element);
			}
			found
		}
		"find" => dom.query_all(Some(bound), argument),
		"children" => dom
			.children(bound)
			.into_iter()
			.filter(|child| accepts(dom, child, argument))
			.collect(),
		"next" => {
			let (siblings, index) = siblings_of(dom, bound);
			index
				.and_then(|i| siblings.get(i + 1).cloned())
				.filter(|next| accepts(dom, next, argument))
				.into_iter()
				.collect()
		}
		"prev" => {
			let (siblings, index) = siblings_of(dom, bound);
			index
				.and_then(|i| i.checked_sub(1))
				.and_then(|i| siblings.get(i).cloned())
				.filter(|prev| accepts(dom, prev, argument))
				.into_iter()
				.collect()
		}
		"siblings" => {
			let (siblings, _) = siblings_of(dom, bound);
			siblings
				.into_iter()
				.filter(|sibling| sibling != bound && accepts(dom, sibling, argument))
				.collect()
		}
		_ => {
			return Err(HyperbindError::InvalidSelector(format!(
				"{}({})",
				method, argument
			)));
		}
	};
	Ok(found)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MockDom;
	use rstest::rstest;

	#[rstest]
	#[case(".", Selector::Bound)]
	#[case("self", Selector::Bound)]
	#[case("", Selector::Nothing)]
	#[case("  ", Selector::Nothing)]
	#[case("#result", Selector::Css("#result".to_string()))]
	#[case("closest(section)", Selector::Relative { method: "closest".to_string(), argument: "section".to_string() })]
	#[case("parent()", Selector::Relative { method: "parent".to_string(), argument: String::new() })]
	fn test_parse(#[case] input: &str, #[case] expected: Selector<u32>) {
		assert_eq!(Selector::<u32>::parse(input), expected);
	}

	#[rstest]
	fn test_resolve_relative_traversals() {
		let dom = MockDom::new();
		dom.set_body(
			r#"<section id="outer"><div id="wrap"><a id="first"></a><a id="link"></a><span id="last"></span></div></section>"#,
		);
		let link = dom.by_id("link").unwrap();

		let closest = Selector::parse("closest(section)").resolve(&dom, &link).unwrap();
		assert_eq!(closest, vec![dom.by_id("outer").unwrap()]);

		let next = Selector::parse("next()").resolve(&dom, &link).unwrap();
		assert_eq!(next, vec![dom.by_id("last").unwrap()]);

		let prev = Selector::parse("prev(a)").resolve(&dom, &link).unwrap();
		assert_eq!(prev, vec![dom.by_id("first").unwrap()]);

		let siblings = Selector::parse("siblings(a)").resolve(&dom, &link).unwrap();
		assert_eq!(siblings, vec![dom.by_id("first").unwrap()]);

		let parents = Selector::parse("parents()").resolve(&dom, &link).unwrap();
		assert_eq!(parents.len(), 3);
	}

	#[rstest]
	fn test_resolve_css_and_bound() {
		let dom = MockDom::new();
		dom.set_body(r#"<div id="a" class="x"></div><div id="b" class="x"></div>"#);
		let a = dom.by_id("a").unwrap();

		assert_eq!(Selector::parse(".x").resolve(&dom, &a).unwrap().len(), 2);
		assert_eq!(Selector::parse(".").resolve(&dom, &a).unwrap(), vec![a.clone()]);
		assert!(Selector::parse("").resolve(&dom, &a).unwrap().is_empty());
	}

	#[rstest]
	fn test_resolve_unknown_method_fails() {
		let dom = MockDom::new();
		dom.set_body(r#"<div id="a"></div>"#);
		let a = dom.by_id("a").unwrap();

		let err = Selector::parse("teleport(x)").resolve(&dom, &a).unwrap_err();
		assert!(matches!(err, HyperbindError::InvalidSelector(_)));
	}
}
