//! JSON value helpers shared by option merging and parameter extraction

use serde_json::{Map, Value};

/// Deep-merge `overlay` into `base`
///
/// Objects merge key by key, recursively. Any other overlay value replaces
/// the base value, except `null`, which leaves the base untouched.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            merge_maps(base_map, overlay_map);
        }
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Map flavor of [`deep_merge`]
pub fn merge_maps(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        match base.get_mut(key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Fill the keys of `target` that are absent with the ones from `defaults`
///
/// Unlike [`merge_maps`] the target always wins, `null` included. Nested
/// objects present on both sides are filled recursively.
pub fn fill_defaults(target: &mut Map<String, Value>, defaults: &Map<String, Value>) {
    for (key, default) in defaults {
        match (target.get_mut(key), default) {
            (None, _) => {
                target.insert(key.clone(), default.clone());
            }
            (Some(Value::Object(nested)), Value::Object(nested_defaults)) => {
                fill_defaults(nested, nested_defaults);
            }
            (Some(_), _) => {}
        }
    }
}

/// Look up a dotted path (`animal.id`) inside a value
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Equality that treats `1` and `"1"` as the same value
///
/// URL parameters and claims are strings more often than not.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::String(s)) | (Value::String(s), Value::Number(_)) => {
            let number = if a.is_number() { a } else { b };
            s.trim().parse::<f64>().ok() == number.as_f64()
        }
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Truthiness in the loose sense used by query parameters
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Coerce a number or numeric string to `f64`
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deep_merge_nested() {
        let mut base = json!({ "criteria": { "blacklist": ["limit"] }, "limit": 30 });
        deep_merge(
            &mut base,
            &json!({ "criteria": { "extra": true }, "limit": 10 }),
        );
        assert_eq!(
            base,
            json!({ "criteria": { "blacklist": ["limit"], "extra": true }, "limit": 10 })
        );
    }

    #[test]
    fn test_deep_merge_null_keeps_base() {
        let mut base = json!({ "limit": 30 });
        deep_merge(&mut base, &json!({ "limit": null }));
        assert_eq!(base, json!({ "limit": 30 }));
    }

    #[test]
    fn test_fill_defaults_keeps_null() {
        let mut target = json!({ "calories": null }).as_object().cloned().unwrap();
        let defaults = json!({ "calories": 100, "name": "Treat" });
        fill_defaults(&mut target, defaults.as_object().unwrap());
        assert_eq!(
            Value::Object(target),
            json!({ "calories": null, "name": "Treat" })
        );
    }

    #[test]
    fn test_get_path() {
        let claims = json!({ "animal": { "id": 1, "tags": ["a", "b"] } });
        assert_eq!(get_path(&claims, "animal.id"), Some(&json!(1)));
        assert_eq!(get_path(&claims, "animal.tags.1"), Some(&json!("b")));
        assert_eq!(get_path(&claims, "animal.name"), None);
    }

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!("2"), &json!(2.0)));
        assert!(!loose_eq(&json!("x"), &json!(1)));
        assert!(loose_eq(&json!("a"), &json!("a")));
    }
}
