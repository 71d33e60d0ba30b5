//! Structural deep merge of JSON-like trees.

use serde_json::{Map, Value};

/// Deep-merge JSON objects from left to right into a fresh map.
///
/// Later sources win on conflicting keys. When both sides hold an object for
/// the same key, the objects are merged recursively. Non-object sources are
/// skipped. The result never shares structure with any source.
///
/// # Example
///
/// ```
/// use courier_core::deep_merge;
/// use serde_json::json;
///
/// let merged = deep_merge([&json!({ "a": 0, "b": 2 }), &json!({ "a": 1 })]);
/// assert_eq!(serde_json::Value::Object(merged), json!({ "a": 1, "b": 2 }));
/// ```
pub fn deep_merge<'a, I>(sources: I) -> Map<String, Value>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut result = Map::new();
    for source in sources {
        if let Value::Object(map) = source {
            merge_into(&mut result, map);
        }
    }
    result
}

fn merge_into(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming);
            }
            (_, Value::Object(incoming)) => {
                let mut copy = Map::new();
                merge_into(&mut copy, incoming);
                target.insert(key.clone(), Value::Object(copy));
            }
            (_, other) => {
                target.insert(key.clone(), other.clone());
            }
        }
    }
}
