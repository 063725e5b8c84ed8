//! Response envelope helpers

use serde::de::DeserializeOwned;
use serde_json::Value;
use wblog_core::{Error, Result};

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Decode(e.to_string()))
}

/// A list that may be bare or wrapped under one of `keys`.
/// Missing or `null` means empty.
pub fn list<T: DeserializeOwned>(value: Value, keys: &[&str]) -> Result<Vec<T>> {
    let items = match value {
        Value::Array(_) => value,
        Value::Null => return Ok(Vec::new()),
        Value::Object(mut map) => match keys.iter().find_map(|k| map.remove(*k)) {
            Some(Value::Null) | None => return Ok(Vec::new()),
            Some(inner) => inner,
        },
        other => return Err(Error::Decode(format!("expected a list, got {}", other))),
    };
    decode(items)
}

/// A single object that may be wrapped under one of `keys`
pub fn one<T: DeserializeOwned>(value: Value, keys: &[&str]) -> Result<T> {
    let inner = match value {
        Value::Object(mut map) => match keys.iter().find_map(|k| map.remove(*k)) {
            Some(inner) if !inner.is_null() => inner,
            _ => Value::Object(map),
        },
        other => other,
    };
    decode(inner)
}

/// A boolean flag field; anything but `true` reads as false
pub fn flag(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// A count given bare or as `{count}`; anything else reads as zero
pub fn count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::Object(map) => map.get("count").and_then(Value::as_u64).unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wblog_core::Post;

    #[test]
    fn test_list_shapes() {
        let bare: Vec<u32> = list(json!([1, 2]), &["res"]).unwrap();
        let wrapped: Vec<u32> = list(json!({"res": [1, 2]}), &["res"]).unwrap();
        let second_key: Vec<u32> = list(json!({"comments": [1, 2]}), &["res", "comments"]).unwrap();
        let missing: Vec<u32> = list(json!({"other": 1}), &["res"]).unwrap();
        let null: Vec<u32> = list(json!({"res": null}), &["res"]).unwrap();

        assert_eq!(bare, vec![1, 2]);
        assert_eq!(wrapped, bare);
        assert_eq!(second_key, bare);
        assert!(missing.is_empty());
        assert!(null.is_empty());
        assert!(list::<u32>(json!("nope"), &["res"]).is_err());
    }

    #[test]
    fn test_one_shapes() {
        let wrapped: Post =
            one(json!({"post": {"id": 1, "title": "a"}}), &["post", "res"]).unwrap();
        let res: Post = one(json!({"res": {"id": 1, "title": "a"}}), &["post", "res"]).unwrap();
        let bare: Post = one(json!({"id": 1, "title": "a"}), &["post", "res"]).unwrap();
        assert_eq!(wrapped, res);
        assert_eq!(res, bare);
    }

    #[test]
    fn test_count_and_flag() {
        assert_eq!(count(&json!(12)), 12);
        assert_eq!(count(&json!({"count": 3})), 3);
        assert_eq!(count(&json!({"total": 3})), 0);
        assert_eq!(count(&json!(-1)), 0);

        assert!(flag(&json!({"liked": true}), "liked"));
        assert!(!flag(&json!({"liked": "yes"}), "liked"));
        assert!(!flag(&json!(null), "liked"));
    }
}
