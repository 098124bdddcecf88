//! Request bodies that accept a single object or an array of objects.
//!
//! Every mutating endpoint takes either one record or a batch of them, so
//! bodies are deserialized from raw JSON and validated item by item before
//! any handler logic runs.

use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

use crate::error::ApiError;

/// Deserializes `value` as either a `T` or a `Vec<T>` and runs each item's
/// validation rules. With `allow_blank` unset, an empty body (null, `{}` or
/// `[]`) is rejected outright.
pub fn parse_one_or_many<T>(value: Value, allow_blank: bool) -> Result<Vec<T>, ApiError>
where
    T: DeserializeOwned + Validate,
{
    if !allow_blank && is_blank(&value) {
        return Err(ApiError::Validation(
            "No object or array of objects exists on target.".to_string(),
        ));
    }

    let items: Vec<Value> = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    let mut parsed = Vec::with_capacity(items.len());
    for item in items {
        let record: T = serde_json::from_value(item)
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        record
            .validate()
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        parsed.push(record);
    }
    Ok(parsed)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, Validate)]
    struct Item {
        #[validate(length(min = 1))]
        name: String,
    }

    #[test]
    fn test_single_object() {
        let items: Vec<Item> = parse_one_or_many(json!({"name": "rice"}), false).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "rice");
    }

    #[test]
    fn test_array_of_objects() {
        let items: Vec<Item> =
            parse_one_or_many(json!([{"name": "a"}, {"name": "b"}]), false).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_blank_rejected() {
        assert!(parse_one_or_many::<Item>(json!({}), false).is_err());
        assert!(parse_one_or_many::<Item>(json!([]), false).is_err());
        assert!(parse_one_or_many::<Item>(Value::Null, false).is_err());
    }

    #[test]
    fn test_blank_allowed_for_empty_records() {
        #[derive(Debug, Deserialize, Validate)]
        struct Blank {
            #[allow(dead_code)]
            note: Option<String>,
        }
        let items: Vec<Blank> = parse_one_or_many(json!({}), true).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_invalid_item_rejected() {
        assert!(parse_one_or_many::<Item>(json!([{"name": "ok"}, {"name": ""}]), false).is_err());
    }
}
