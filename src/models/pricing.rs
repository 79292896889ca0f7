use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::{id_of, not_blank, optional_string, string_field};
use crate::error::AppError;

/// Тариф (ценовая категория) из внешнего API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTier {
    pub id: String,
    pub name: String,
    pub price: Option<f64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl PriceTier {
    pub fn from_value(item: &Value) -> Option<Self> {
        let id = id_of(item)?;
        let name = string_field(item, "name");
        if name.is_empty() {
            return None;
        }

        Some(PriceTier {
            id,
            name,
            price: item.get("price").and_then(normalize_price),
            created_at: optional_string(item, "createdAt"),
            updated_at: optional_string(item, "updatedAt"),
        })
    }
}

/// Цена: конечное число или строка с числом в начале (`"12,5"` -> 12.5).
pub fn normalize_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => leading_number(&s.trim().replacen(',', ".", 1))?,
        _ => return None,
    };

    price.is_finite().then_some(price)
}

fn leading_number(s: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            c if c.is_ascii_digit() => {}
            _ => break,
        }
        end = i + c.len_utf8();
    }

    s[..end].parse().ok()
}

/// Тело создания/изменения тарифа.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PricingRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[serde(default)]
    pub price: Value,
}

/// То, что уходит в бэкенд.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingPayload {
    pub name: String,
    pub price: f64,
}

impl PricingRequest {
    pub fn into_payload(self) -> Result<PricingPayload, AppError> {
        self.validate()
            .map_err(|_| AppError::Validation("pricing name is required".to_string()))?;

        let price = normalize_price(&self.price)
            .ok_or_else(|| AppError::Validation("invalid price".to_string()))?;

        Ok(PricingPayload { name: self.name.trim().to_string(), price })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prices_from_numbers_and_strings() {
        assert_eq!(normalize_price(&json!(9)), Some(9.0));
        assert_eq!(normalize_price(&json!("6")), Some(6.0));
        assert_eq!(normalize_price(&json!(" 12,5 ")), Some(12.5));
        assert_eq!(normalize_price(&json!("7.5 EUR")), Some(7.5));
        assert_eq!(normalize_price(&json!("gratuit")), None);
        assert_eq!(normalize_price(&json!(null)), None);
    }

    #[test]
    fn tier_keeps_string_price() {
        let tier = PriceTier::from_value(&json!({"id": 7, "name": "Enfant", "price": "6"})).unwrap();
        assert_eq!(tier.id, "7");
        assert_eq!(tier.price, Some(6.0));
    }

    #[test]
    fn request_requires_name_and_price() {
        let request: PricingRequest = serde_json::from_value(json!({"name": " Réduit ", "price": "9,90"})).unwrap();
        assert_eq!(
            request.into_payload().unwrap(),
            PricingPayload { name: "Réduit".into(), price: 9.9 }
        );

        let no_name: PricingRequest = serde_json::from_value(json!({"price": 5})).unwrap();
        assert_eq!(no_name.into_payload().unwrap_err().to_string(), "pricing name is required");

        let bad_price: PricingRequest = serde_json::from_value(json!({"name": "VIP", "price": "n/a"})).unwrap();
        assert_eq!(bad_price.into_payload().unwrap_err().to_string(), "invalid price");
    }
}
