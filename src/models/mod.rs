pub mod pricing;
pub mod room;
pub mod session;
pub mod session_time;

pub use pricing::{normalize_price, PriceTier, PricingPayload, PricingRequest};
pub use room::{CellEditRequest, Room, RoomPayload, RoomRequest};
pub use session::{
    Pagination, PricingLimit, QuotaInput, SeatTotals, SessionDraft, SessionPage, SessionPayload, SessionQuery,
    SessionSummary,
};
pub use session_time::{is_valid_time, SessionTime, SessionTimeRequest};

use serde_json::Value;
use validator::ValidationError;

/// Достаёт список из ответа бэкенда: либо голый массив, либо объект с
/// массивом под ключом ресурса, `data` или `items`.
pub fn list_items(payload: Value, resource_key: &str) -> Vec<Value> {
    match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => [resource_key, "data", "items"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Идентификатор записи (`_id` или `id`), строкой.
pub fn id_of(item: &Value) -> Option<String> {
    let raw = item.get("_id").or_else(|| item.get("id"))?;
    match raw {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn string_field(item: &Value, key: &str) -> String {
    item.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

pub(crate) fn optional_string(item: &Value, key: &str) -> Option<String> {
    item.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_items_accepts_wrapped_and_bare_lists() {
        assert_eq!(list_items(json!([1, 2]), "rooms").len(), 2);
        assert_eq!(list_items(json!({"rooms": [1]}), "rooms").len(), 1);
        assert_eq!(list_items(json!({"data": [1, 2, 3]}), "rooms").len(), 3);
        assert_eq!(list_items(json!({"items": [1]}), "rooms").len(), 1);
        assert!(list_items(json!({"rooms": "nope"}), "rooms").is_empty());
        assert!(list_items(json!("x"), "rooms").is_empty());
    }

    #[test]
    fn id_prefers_mongo_style_key() {
        assert_eq!(id_of(&json!({"_id": "a", "id": "b"})), Some("a".into()));
        assert_eq!(id_of(&json!({"id": 7})), Some("7".into()));
        assert_eq!(id_of(&json!({"_id": ""})), None);
    }
}
