//! Form serialization.
//!
//! The request payload includes the fields of the `source` elements. How
//! those fields are collected is pluggable: [`FieldWalker`] walks the
//! controls through the [`Dom`] trait, [`NativeFormSerializer`] defers to
//! the platform's own form-data support for `<form>` elements. The runtime
//! is configured with one of them up front.

use crate::dom::{ControlKind, Dom, FormEntry};

/// Collects name/value entries from source elements.
pub trait FormSerializer<D: Dom> {
	/// Serializes every source in order.
	fn serialize(&self, dom: &D, sources: &[D::Element]) -> Vec<FormEntry<D::File>>;
}

/// Walks form controls the way a browser builds a form data set.
///
/// Disabled and unnamed controls are skipped, as are unchecked checkboxes
/// and radios and every button. Multi-selects contribute one entry per
/// selected option and file inputs one entry per selected file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldWalker;

impl FieldWalker {
	/// Serializes a single source element.
	pub fn entries<D: Dom>(dom: &D, source: &D::Element) -> Vec<FormEntry<D::File>> {
		let mut entries = Vec::new();
		for control in dom.form_controls(source) {
			let Some(state) = dom.control_state(&control) else {
				continue;
			};
			if state.disabled || state.name.is_empty() {
				continue;
			}
			match state.kind {
				ControlKind::Button => {}
				ControlKind::Checkable => {
					if state.checked {
						let value = state.values.into_iter().next().unwrap_or_else(|| "on".to_string());
						entries.push(FormEntry::text(state.name, value));
					}
				}
				ControlKind::File => {
					for file in state.files {
						entries.push(FormEntry::file(state.name.clone(), file));
					}
				}
				ControlKind::Text | ControlKind::Select => {
					for value in state.values {
						entries.push(FormEntry::text(state.name.clone(), value));
					}
				}
			}
		}
		entries
	}
}

impl<D: Dom> FormSerializer<D> for FieldWalker {
	fn serialize(&self, dom: &D, sources: &[D::Element]) -> Vec<FormEntry<D::File>> {
		sources
			.iter()
			.flat_map(|source| Self::entries(dom, source))
			.collect()
	}
}

/// Uses the platform's native form-data support for `<form>` sources.
///
/// Other sources, and forms on platforms without native support, go
/// through [`FieldWalker`]; the latter case is logged as a warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFormSerializer;

impl<D: Dom> FormSerializer<D> for NativeFormSerializer {
	fn serialize(&self, dom: &D, sources: &[D::Element]) -> Vec<FormEntry<D::File>> {
		let mut entries = Vec::new();
		for source in sources {
			if !dom.is_form(source) {
				entries.extend(FieldWalker::entries(dom, source));
				continue;
			}
			match dom.native_form_entries(source) {
				Some(native) => entries.extend(native),
				None => {
					tracing::warn!(
						element = ?source,
						"native form data unavailable, falling back to field walking"
					);
					entries.extend(FieldWalker::entries(dom, source));
				}
			}
		}
		entries
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MockDom;
	use rstest::rstest;

	const FORM: &str = r#"<form id="f">
		<input type="text" name="q" value="rust">
		<input type="text" value="unnamed">
		<input type="text" name="off" value="x" disabled>
		<input type="checkbox" name="agree" checked>
		<input type="checkbox" name="news" value="yes">
		<input type="radio" name="size" value="s">
		<input type="radio" name="size" value="m" checked>
		<select name="tags" multiple><option selected>a</option><option>b</option><option value="c" selected>C</option></select>
		<textarea name="note">hi</textarea>
		<input type="file" name="upload" id="upload">
		<button type="submit" name="go" value="1">Go</button>
	</form>"#;

	fn texts(entries: &[FormEntry<String>]) -> Vec<(String, String)> {
		entries
			.iter()
			.filter_map(|entry| entry.as_text().map(|text| (entry.name.clone(), text.to_string())))
			.collect()
	}

	#[rstest]
	fn test_field_walker_builds_form_data_set() {
		let dom = MockDom::new();
		dom.set_body(FORM);
		dom.set_files(&dom.by_id("upload").unwrap(), vec!["a.png".to_string(), "b.png".to_string()]);
		let form = dom.by_id("f").unwrap();

		let entries = FieldWalker.serialize(&dom, &[form]);

		assert_eq!(
			texts(&entries),
			vec![
				("q".to_string(), "rust".to_string()),
				("agree".to_string(), "on".to_string()),
				("size".to_string(), "m".to_string()),
				("tags".to_string(), "a".to_string()),
				("tags".to_string(), "c".to_string()),
				("note".to_string(), "hi".to_string()),
			]
		);
		let files: Vec<&FormEntry<String>> = entries.iter().filter(|entry| entry.as_text().is_none()).collect();
		assert_eq!(files.len(), 2);
		assert_eq!(*files[1], FormEntry::file("upload", "b.png".to_string()));
	}

	#[rstest]
	fn test_non_form_source_walks_descendants() {
		let dom = MockDom::new();
		dom.set_body(r#"<div id="d"><input name="a" value="1"><span><input name="b" value="2"></span></div>"#);
		let div = dom.by_id("d").unwrap();

		let entries = FieldWalker.serialize(&dom, &[div]);
		assert_eq!(texts(&entries).len(), 2);
	}

	#[rstest]
	#[case(true)]
	#[case(false)]
	fn test_native_serializer_with_and_without_support(#[case] native: bool) {
		let dom = if native {
			MockDom::new().with_native_form_data()
		} else {
			MockDom::new()
		};
		dom.set_body(FORM);
		let form = dom.by_id("f").unwrap();

		let entries = NativeFormSerializer.serialize(&dom, &[form.clone()]);
		assert_eq!(texts(&entries), texts(&FieldWalker.serialize(&dom, &[form])));
	}
}
