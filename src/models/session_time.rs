use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{id_of, optional_string, string_field};
use crate::error::AppError;

/// Время слота в формате `HH:MM` (24 часа).
pub fn is_valid_time(value: &str) -> bool {
    value.len() == 5 && NaiveTime::parse_from_str(value, "%H:%M").is_ok()
}

/// Временной слот сеанса ("20:30"), настраивается в справочнике.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTime {
    pub id: String,
    pub time: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl SessionTime {
    pub fn from_value(item: &Value) -> Option<Self> {
        let id = id_of(item)?;
        let time = string_field(item, "time");
        if time.is_empty() {
            return None;
        }

        Some(SessionTime {
            id,
            time,
            created_at: optional_string(item, "createdAt"),
            updated_at: optional_string(item, "updatedAt"),
        })
    }
}

/// Тело создания/изменения слота; оно же уходит в бэкенд после проверки.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTimeRequest {
    #[serde(default)]
    pub time: String,
}

impl SessionTimeRequest {
    pub fn validated(self) -> Result<Self, AppError> {
        let time = self.time.trim();
        if !is_valid_time(time) {
            return Err(AppError::Validation("invalid session time".to_string()));
        }

        Ok(Self { time: time.to_string() })
    }
}
