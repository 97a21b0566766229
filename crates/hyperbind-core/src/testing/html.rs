//! A forgiving HTML fragment parser for [`MockDom`](super::MockDom).
//!
//! Handles elements, quoted and bare attributes, void elements,
//! self-closing tags, comments and the common character entities.
//! Whitespace-only text is dropped.

pub(crate) const VOID_ELEMENTS: [&str; 13] = [
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
	"wbr",
];

/// A parsed node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Parsed {
	Element {
		tag: String,
		attributes: Vec<(String, String)>,
		children: Vec<Parsed>,
	},
	Text(String),
}

struct OpenElement {
	tag: String,
	attributes: Vec<(String, String)>,
	children: Vec<Parsed>,
}

struct Parser<'a> {
	input: &'a str,
	pos: usize,
}

impl<'a> Parser<'a> {
	fn rest(&self) -> &'a str {
		&self.input[self.pos..]
	}

	fn peek(&self) -> Option<char> {
		self.rest().chars().next()
	}

	fn bump(&mut self) -> Option<char> {
		let c = self.peek()?;
		self.pos += c.len_utf8();
		Some(c)
	}

	fn skip_whitespace(&mut self) {
		while self.peek().is_some_and(char::is_whitespace) {
			self.bump();
		}
	}

	fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
		let start = self.pos;
		while self.peek().is_some_and(&keep) {
			self.bump();
		}
		&self.input[start..self.pos]
	}

	fn skip_past(&mut self, needle: &str) {
		match self.rest().find(needle) {
			Some(index) => self.pos += index + needle.len(),
			None => self.pos = self.input.len(),
		}
	}

	fn name(&mut self) -> String {
		self.take_while(|c| !c.is_whitespace() && !matches!(c, '>' | '/' | '='))
			.to_ascii_lowercase()
	}

	fn attribute_value(&mut self) -> String {
		match self.peek() {
			Some(quote @ ('"' | '\'')) => {
				self.bump();
				let value = self.take_while(|c| c != quote);
				self.bump();
				decode_entities(value)
			}
			_ => decode_entities(self.take_while(|c| !c.is_whitespace() && c != '>')),
		}
	}

	/// Parses an open tag after `<`. Returns the tag, its attributes and
	/// whether it closes itself.
	fn open_tag(&mut self) -> (String, Vec<(String, String)>, bool) {
		let tag = self.name();
		let mut attributes = Vec::new();
		loop {
			self.skip_whitespace();
			match self.peek() {
				None => return (tag, attributes, true),
				Some('>') => {
					self.bump();
					return (tag, attributes, false);
				}
				Some('/') => {
					self.bump();
					if self.peek() == Some('>') {
						self.bump();
						return (tag, attributes, true);
					}
				}
				Some(_) => {
					let name = self.name();
					if name.is_empty() {
						self.bump();
						continue;
					}
					self.skip_whitespace();
					let value = if self.peek() == Some('=') {
						self.bump();
						self.skip_whitespace();
						self.attribute_value()
					} else {
						String::new()
					};
					attributes.push((name, value));
				}
			}
		}
	}
}

/// Replaces the common named and numeric character references.
pub(crate) fn decode_entities(text: &str) -> String {
	if !text.contains('&') {
		return text.to_string();
	}
	let mut out = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(index) = rest.find('&') {
		out.push_str(&rest[..index]);
		rest = &rest[index..];
		let decoded = rest.find(';').and_then(|end| {
			let entity = &rest[1..end];
			let c = match entity {
				"amp" => Some('&'),
				"lt" => Some('<'),
				"gt" => Some('>'),
				"quot" => Some('"'),
				"apos" | "#39" => Some('\''),
				"nbsp" => Some('\u{a0}'),
				_ => entity
					.strip_prefix('#')
					.and_then(|code| code.parse::<u32>().ok())
					.and_then(char::from_u32),
			};
			c.map(|c| (c, end + 1))
		});
		match decoded {
			Some((c, consumed)) => {
				out.push(c);
				rest = &rest[consumed..];
			}
			None => {
				out.push('&');
				rest = &rest[1..];
			}
		}
	}
	out.push_str(rest);
	out
}

fn attach(stack: &mut [OpenElement], roots: &mut Vec<Parsed>, node: Parsed) {
	match stack.last_mut() {
		Some(open) => open.children.push(node),
		None => roots.push(node),
	}
}

fn close(stack: &mut Vec<OpenElement>, roots: &mut Vec<Parsed>) {
	if let Some(open) = stack.pop() {
		let node = Parsed::Element {
			tag: open.tag,
			attributes: open.attributes,
			children: open.children,
		};
		attach(stack, roots, node);
	}
}

/// Parses an HTML fragment into top-level nodes.
pub(crate) fn parse(html: &str) -> Vec<Parsed> {
	let mut parser = Parser { input: html, pos: 0 };
	let mut stack: Vec<OpenElement> = Vec::new();
	let mut roots = Vec::new();

	while let Some(c) = parser.peek() {
		let rest = parser.rest();
		if rest.starts_with("<!--") {
			parser.skip_past("-->");
		} else if rest.starts_with("</") {
			parser.pos += 2;
			let tag = parser.name();
			parser.skip_past(">");
			if let Some(index) = stack.iter().rposition(|open| open.tag == tag) {
				while stack.len() > index {
					close(&mut stack, &mut roots);
				}
			}
		} else if rest.starts_with("<!") {
			parser.skip_past(">");
		} else if c == '<' && rest[1..].starts_with(|next: char| next.is_ascii_alphabetic()) {
			parser.bump();
			let (tag, attributes, self_closing) = parser.open_tag();
			if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
				let node = Parsed::Element {
					tag,
					attributes,
					children: Vec::new(),
				};
				attach(&mut stack, &mut roots, node);
			} else {
				stack.push(OpenElement {
					tag,
					attributes,
					children: Vec::new(),
				});
			}
		} else {
			parser.bump();
			let tail = parser.take_while(|next| next != '<');
			let raw = format!("{}{}", c, tail);
			if !raw.trim().is_empty() {
				attach(&mut stack, &mut roots, Parsed::Text(decode_entities(&raw)));
			}
		}
	}
	while !stack.is_empty() {
		close(&mut stack, &mut roots);
	}
	roots
}

/// Escapes text content for serialization.
pub(crate) fn escape_text(text: &str) -> String {
	text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Escapes an attribute value for serialization.
pub(crate) fn escape_attribute(value: &str) -> String {
	escape_text(value).replace('"', "&quot;")
}
