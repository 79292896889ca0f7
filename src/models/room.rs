use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::{id_of, not_blank, optional_string, string_field};
use crate::error::AppError;
use crate::layout::{self, CellEdit, CellKey, LayoutPayload, PersistedLayout, PricingId, RoomLayout};

/// Зал в том виде, в котором его отдаёт бэкенд.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    /// Всегда пересчитывается по плану, сохранённое значение не используется.
    pub capacity: u32,
    #[serde(flatten)]
    pub layout: PersistedLayout,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Room {
    /// Записи без id или имени отбрасываются.
    pub fn from_value(item: &Value) -> Option<Self> {
        let id = id_of(item)?;
        let name = string_field(item, "name");
        if name.is_empty() {
            return None;
        }

        let layout: PersistedLayout = serde_json::from_value(item.clone()).unwrap_or_default();
        let capacity = layout::decode(&layout).count_seats();

        Some(Room {
            id,
            name,
            capacity,
            layout,
            created_at: optional_string(item, "createdAt"),
            updated_at: optional_string(item, "updatedAt"),
        })
    }

    pub fn decode_layout(&self) -> RoomLayout {
        layout::decode(&self.layout)
    }
}

/// Тело запроса на создание/изменение зала.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoomRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[serde(flatten)]
    pub layout: PersistedLayout,
}

/// То, что уходит в бэкенд: имя + закодированный план.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomPayload {
    pub name: String,
    #[serde(flatten)]
    pub layout: LayoutPayload,
}

impl RoomRequest {
    /// Проверяет запрос и нормализует план через decode + encode, чтобы
    /// вместимость всегда была производной.
    pub fn into_payload(self) -> Result<RoomPayload, AppError> {
        self.validate()
            .map_err(|_| AppError::Validation("room name is required".to_string()))?;

        let decoded = layout::decode(&self.layout);
        if decoded.is_empty() {
            return Err(AppError::Validation("room layout is missing".to_string()));
        }

        Ok(RoomPayload { name: self.name.trim().to_string(), layout: layout::encode(&decoded) })
    }
}

/// Правка одной ячейки: `{ "cell": "B-2", "cellType": "pricing", "pricingId": "p1" }`.
/// Адрес разбирается в `key()`, чтобы ошибка шла обычным JSON-ответом.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellEditRequest {
    pub cell: String,
    pub cell_type: String,
    #[serde(default)]
    pub pricing_id: Option<PricingId>,
}

impl CellEditRequest {
    pub fn key(&self) -> Result<CellKey, AppError> {
        self.cell
            .parse()
            .map_err(|_| AppError::Validation(format!("invalid cell '{}'", self.cell)))
    }

    /// Пустой `pricingId` равносилен отсутствующему.
    pub fn edit(&self) -> Result<CellEdit, AppError> {
        match self.cell_type.as_str() {
            "seat" | "chaise" => Ok(CellEdit::Seat),
            "aisle" | "couloir" => Ok(CellEdit::Aisle),
            "staff" => Ok(CellEdit::Staff),
            "pricing" => Ok(CellEdit::Pricing(
                self.pricing_id.clone().filter(|id| !id.trim().is_empty()),
            )),
            other => Err(AppError::Validation(format!("unknown cell type '{}'", other))),
        }
    }
}
