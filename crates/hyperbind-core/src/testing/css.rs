//! The CSS subset understood by [`MockDom`](super::MockDom).
//!
//! Supports type, universal, id, class and attribute selectors (`[name]`,
//! `[name=value]`), compound selectors, the descendant and child
//! combinators, and comma-separated selector lists. Anything else never
//! matches.

/// One compound selector such as `input.big[type=submit]`.
#[derive(Debug, Default, PartialEq)]
struct Compound {
	tag: Option<String>,
	id: Option<String>,
	classes: Vec<String>,
	attributes: Vec<(String, Option<String>)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
	Descendant,
	Child,
}

/// A compound chain, stored right to left.
#[derive(Debug, PartialEq)]
struct Complex {
	subject: Compound,
	ancestors: Vec<(Combinator, Compound)>,
}

/// A parsed selector list.
#[derive(Debug, PartialEq)]
pub(crate) struct SelectorList(Vec<Complex>);

/// What the matcher needs to know about a node.
pub(crate) trait Node: Sized {
	fn tag(&self) -> Option<String>;
	fn attribute(&self, name: &str) -> Option<String>;
	fn parent_node(&self) -> Option<Self>;
}

fn is_ident(c: char) -> bool {
	c.is_alphanumeric() || c == '-' || c == '_'
}

fn split_top_level(input: &str, separator: char) -> Vec<&str> {
	let mut parts = Vec::new();
	let mut depth = 0usize;
	let mut quote: Option<char> = None;
	let mut start = 0;
	for (index, c) in input.char_indices() {
		match (quote, c) {
			(Some(q), c) if c == q => quote = None,
			(Some(_), _) => {}
			(None, '"' | '\'') => quote = Some(c),
			(None, '[') => depth += 1,
			(None, ']') => depth = depth.saturating_sub(1),
			(None, c) if c == separator && depth == 0 => {
				parts.push(&input[start..index]);
				start = index + c.len_utf8();
			}
			_ => {}
		}
	}
	parts.push(&input[start..]);
	parts
}

fn parse_compound(input: &str) -> Option<Compound> {
	let mut compound = Compound::default();
	let mut rest = input;

	let tag_len = rest
		.find(|c: char| !(is_ident(c) || c == '*'))
		.unwrap_or(rest.len());
	if tag_len > 0 {
		let tag = &rest[..tag_len];
		if tag != "*" {
			compound.tag = Some(tag.to_ascii_lowercase());
		}
		rest = &rest[tag_len..];
	}

	while let Some(c) = rest.chars().next() {
		match c {
			'#' | '.' => {
				let body = &rest[1..];
				let len = body.find(|c: char| !is_ident(c)).unwrap_or(body.len());
				if len == 0 {
					return None;
				}
				let name = body[..len].to_string();
				if c == '#' {
					compound.id = Some(name);
				} else {
					compound.classes.push(name);
				}
				rest = &body[len..];
			}
			'[' => {
				let end = rest.find(']')?;
				let inner = &rest[1..end];
				let attribute = match inner.split_once('=') {
					Some((name, value)) => {
						let value = value.trim();
						let value = value
							.strip_prefix('"')
							.and_then(|v| v.strip_suffix('"'))
							.or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
							.unwrap_or(value);
						(name.trim().to_ascii_lowercase(), Some(value.to_string()))
					}
					None => (inner.trim().to_ascii_lowercase(), None),
				};
				if attribute.0.is_empty() || !attribute.0.chars().all(is_ident) {
					return None;
				}
				compound.attributes.push(attribute);
				rest = &rest[end + 1..];
			}
			_ => return None,
		}
	}
	Some(compound)
}

fn parse_complex(input: &str) -> Option<Complex> {
	let spaced = input.replace('>', " > ");
	let mut compounds = Vec::new();
	let mut combinators = Vec::new();
	let mut pending = Combinator::Descendant;
	for token in split_top_level(&spaced, ' ') {
		match token {
			"" => {}
			">" => pending = Combinator::Child,
			token => {
				if !compounds.is_empty() {
					combinators.push(pending);
				}
				compounds.push(parse_compound(token)?);
				pending = Combinator::Descendant;
			}
		}
	}
	let subject = compounds.pop()?;
	let ancestors = combinators.into_iter().rev().zip(compounds.into_iter().rev()).collect();
	Some(Complex { subject, ancestors })
}

impl SelectorList {
	/// Parses a selector list; `None` if any part is unsupported.
	pub(crate) fn parse(input: &str) -> Option<Self> {
		split_top_level(input, ',')
			.into_iter()
			.map(|part| parse_complex(part.trim()))
			.collect::<Option<Vec<_>>>()
			.map(Self)
	}

	pub(crate) fn matches<N: Node>(&self, node: &N) -> bool {
		self.0.iter().any(|complex| complex.matches(node))
	}
}

impl Compound {
	fn matches<N: Node>(&self, node: &N) -> bool {
		let Some(tag) = node.tag() else {
			return false;
		};
		if self.tag.as_ref().is_some_and(|expected| *expected != tag) {
			return false;
		}
		if let Some(id) = &self.id {
			if node.attribute("id").as_deref() != Some(id.as_str()) {
				return false;
			}
		}
		if !self.classes.is_empty() {
			let class = node.attribute("class").unwrap_or_default();
			let present: Vec<&str> = class.split_whitespace().collect();
			if !self.classes.iter().all(|wanted| present.contains(&wanted.as_str())) {
				return false;
			}
		}
		self.attributes.iter().all(|(name, expected)| match (node.attribute(name), expected) {
			(None, _) => false,
			(Some(_), None) => true,
			(Some(actual), Some(expected)) => actual == *expected,
		})
	}
}

impl Complex {
	fn matches<N: Node>(&self, node: &N) -> bool {
		self.subject.matches(node) && Self::ancestors_match(node, &self.ancestors)
	}

	fn ancestors_match<N: Node>(node: &N, ancestors: &[(Combinator, Compound)]) -> bool {
		let Some(((combinator, compound), rest)) = ancestors.split_first() else {
			return true;
		};
		let mut current = node.parent_node();
		while let Some(candidate) = current {
			if compound.matches(&candidate) && Self::ancestors_match(&candidate, rest) {
				return true;
			}
			if *combinator == Combinator::Child {
				return false;
			}
			current = candidate.parent_node();
		}
		false
	}
}
