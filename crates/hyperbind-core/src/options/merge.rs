//! Deep merge helpers for mapping-valued options.

use std::collections::BTreeMap;

use serde_json::Value;

/// Merges `overlay` into `base`.
///
/// Objects merge key by key, recursively. Any other value in `overlay`
/// replaces the corresponding value in `base`.
pub fn deep_merge(base: &mut Value, overlay: Value) {
	match (base, overlay) {
		(Value::Object(base_map), Value::Object(overlay_map)) => {
			for (key, value) in overlay_map {
				match base_map.get_mut(&key) {
					Some(existing) => deep_merge(existing, value),
					None => {
						base_map.insert(key, value);
					}
				}
			}
		}
		(base, overlay) => *base = overlay,
	}
}

/// Merges header maps; later entries win.
pub fn merge_headers(base: &mut BTreeMap<String, String>, overlay: BTreeMap<String, String>) {
	base.extend(overlay);
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_nested_objects_merge_recursively() {
		let mut base = json!({"a": {"b": 1, "c": 2}, "keep": true});
		deep_merge(&mut base, json!({"a": {"c": 3, "d": 4}}));
		assert_eq!(base, json!({"a": {"b": 1, "c": 3, "d": 4}, "keep": true}));
	}

	#[rstest]
	#[case(json!({"a": [1, 2]}), json!({"a": [3]}), json!({"a": [3]}))]
	#[case(json!({"a": {"b": 1}}), json!({"a": 5}), json!({"a": 5}))]
	#[case(json!({"a": 5}), json!({"a": {"b": 1}}), json!({"a": {"b": 1}}))]
	#[case(json!(1), json!({"x": 1}), json!({"x": 1}))]
	fn test_non_mappings_replace(#[case] base: Value, #[case] overlay: Value, #[case] expected: Value) {
		let mut base = base;
		deep_merge(&mut base, overlay);
		assert_eq!(base, expected);
	}

	#[rstest]
	fn test_headers_later_wins() {
		let mut base = BTreeMap::from([
			("Accept".to_string(), "text/html".to_string()),
			("X-A".to_string(), "1".to_string()),
		]);
		merge_headers(
			&mut base,
			BTreeMap::from([("X-A".to_string(), "2".to_string())]),
		);
		assert_eq!(base["X-A"], "2");
		assert_eq!(base["Accept"], "text/html");
	}
}
