//! Run inputs and partial updates.

use serde_json::Value;

/// Shallow-merge `partial` into `current`.
///
/// Top-level keys of `partial` replace those of `current`; nested objects are
/// not merged. Without prior inputs (or when either side is not an object) the
/// partial update becomes the whole value.
pub fn merge_inputs(current: Option<&Value>, partial: &Value) -> Value {
    match (current, partial) {
        (Some(Value::Object(base)), Value::Object(update)) => {
            let mut merged = base.clone();
            for (key, value) in update {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => partial.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_update_overrides_top_level_keys() {
        let merged = merge_inputs(Some(&json!({ "a": 1, "b": 2 })), &json!({ "b": 3 }));
        assert_eq!(merged, json!({ "a": 1, "b": 3 }));
    }

    #[test]
    fn without_prior_inputs_partial_becomes_full() {
        assert_eq!(merge_inputs(None, &json!({ "x": 9 })), json!({ "x": 9 }));
    }

    #[test]
    fn merge_is_shallow() {
        let merged = merge_inputs(
            Some(&json!({ "nested": { "a": 1, "b": 2 } })),
            &json!({ "nested": { "b": 3 } }),
        );
        assert_eq!(merged, json!({ "nested": { "b": 3 } }));
    }

    #[test]
    fn non_object_prior_is_replaced() {
        assert_eq!(merge_inputs(Some(&Value::Null), &json!({ "k": true })), json!({ "k": true }));
    }
}
