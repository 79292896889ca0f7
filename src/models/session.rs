use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{id_of, optional_string, string_field, CellEditRequest};
use crate::layout::{PersistedLayout, PricingId, PricingOverride, StaffOverride};

/// Лимит продаж по тарифу для конкретного сеанса.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingLimit {
    pub pricing_id: PricingId,
    pub max_tickets: u32,
}

/// Квота из формы: `quota` - строка как её ввёл пользователь.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaInput {
    pub pricing_id: PricingId,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub quota: String,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatTotals {
    pub total_seats: u32,
    pub available_seats: u32,
}

/// Запрос на создание (несколько слотов) или изменение (ровно один слот) сеанса.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDraft {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub session_times: Vec<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub room_id: String,
    /// Собственные атрибуты мест сеанса, накладываются поверх плана зала.
    #[serde(flatten)]
    pub overlays: PersistedLayout,
    #[serde(default)]
    pub seat_edits: Vec<CellEditRequest>,
    #[serde(default)]
    pub quotas: Vec<QuotaInput>,
    /// Итоги сеанса до изменения; по ним считаются уже проданные места.
    #[serde(default)]
    pub previous: Option<SeatTotals>,
}

/// Тело POST/PUT `/sessions` во внешнем API. Один объект на один слот.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub event_id: String,
    pub date: String,
    pub session_time: String,
    pub version: String,
    pub room_id: String,
    #[serde(flatten)]
    pub totals: SeatTotals,
    pub overrides: Vec<StaffOverride>,
    pub pricing_overrides: Vec<PricingOverride>,
    pub pricing_limits: Vec<PricingLimit>,
}

/// Параметры списка сеансов.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl SessionQuery {
    pub const DEFAULT_LIMIT: u32 = 20;

    /// Страница с единицы, размер страницы в пределах 1..=100.
    pub fn normalized(&self) -> SessionQuery {
        SessionQuery {
            page: Some(self.page.unwrap_or(1).max(1)),
            limit: Some(self.limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, 100)),
            status: self.status.clone().filter(|s| !s.is_empty()),
            from: self.from.clone().filter(|s| !s.is_empty()),
            to: self.to.clone().filter(|s| !s.is_empty()),
        }
    }
}

/// Сеанс в списке.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub event_id: String,
    pub event_name: String,
    pub date: Option<String>,
    pub session_time: String,
    pub version: String,
    pub room_id: String,
    pub room_name: String,
    pub total_seats: Option<i64>,
    pub available_seats: Option<i64>,
    pub status: String,
    pub pricing_limits: Vec<Value>,
    #[serde(flatten)]
    pub overlays: PersistedLayout,
}

impl SessionSummary {
    pub fn from_value(item: &Value) -> Option<Self> {
        let id = id_of(item)?;
        // eventId / roomId бывают "populated" объектами
        let (event_id, event_name) = reference(item, "event", "eventId", "eventName");
        let (room_id, room_name) = reference(item, "room", "roomId", "roomName");

        let status = ["status", "state"]
            .iter()
            .map(|key| string_field(item, key))
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| "scheduled".to_string());
        let session_time = ["sessionTime", "time", "start"]
            .iter()
            .map(|key| string_field(item, key))
            .find(|s| !s.is_empty())
            .unwrap_or_default();

        Some(SessionSummary {
            id,
            event_id,
            event_name,
            date: optional_string(item, "date").or_else(|| optional_string(item, "sessionDate")),
            session_time,
            version: string_field(item, "version"),
            room_id,
            room_name,
            total_seats: item.get("totalSeats").and_then(Value::as_i64),
            available_seats: item.get("availableSeats").and_then(Value::as_i64),
            status,
            pricing_limits: item.get("pricingLimits").and_then(Value::as_array).cloned().unwrap_or_default(),
            overlays: serde_json::from_value(item.clone()).unwrap_or_default(),
        })
    }
}

fn reference(item: &Value, object_key: &str, id_key: &str, name_key: &str) -> (String, String) {
    let object = item
        .get(object_key)
        .filter(|v| v.is_object())
        .or_else(|| item.get(id_key).filter(|v| v.is_object()));

    match object {
        Some(object) => (id_of(object).unwrap_or_default(), string_field(object, "name")),
        None => {
            let id = match item.get(id_key) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => String::new(),
            };
            (id, string_field(item, name_key))
        }
    }
}

/// Пагинация списка. Поля ищутся в корне ответа и в `pagination`/`meta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: Option<u64>,
    pub total_pages: Option<u64>,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn from_payload(payload: &Value, page: u32, limit: u32, item_count: usize) -> Self {
        let meta = ["pagination", "meta", "pageInfo", "paging"]
            .iter()
            .find_map(|key| payload.get(*key).filter(|v| v.is_object()))
            .cloned()
            .unwrap_or(Value::Null);

        let total = lookup(payload, &meta, &["total", "count"], &["total", "totalItems", "totalCount", "count"])
            .and_then(number_of)
            .filter(|n| *n >= 0.0)
            .map(|n| n as u64);

        let current = positive(lookup(payload, &meta, &["page"], &["page", "currentPage"])).unwrap_or(page as u64) as u32;
        let size = positive(lookup(payload, &meta, &["limit"], &["limit", "perPage", "pageSize"]))
            .unwrap_or(limit as u64)
            .max(1) as u32;

        let pages_from_payload = positive(lookup(payload, &meta, &["pages"], &["pages", "totalPages", "pageCount"]));
        let pages_from_total = total.map(|t| t.div_ceil(size as u64).max(1));
        let total_pages = match (pages_from_payload, pages_from_total) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };

        let flag = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_bool)
                .or_else(|| meta.get(key).and_then(Value::as_bool))
        };
        let has_next = flag("hasNext").unwrap_or(match total_pages {
            Some(pages) => (current as u64) < pages,
            None => item_count >= size as usize,
        });
        let has_prev = flag("hasPrev").unwrap_or(current > 1);

        Pagination { page: current, limit: size, total, total_pages, has_next, has_prev }
    }
}

fn lookup<'a>(payload: &'a Value, meta: &'a Value, keys: &[&str], meta_keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| payload.get(*k))
        .or_else(|| meta_keys.iter().find_map(|k| meta.get(*k)))
}

fn number_of(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn positive(value: Option<&Value>) -> Option<u64> {
    number_of(value?).filter(|n| *n >= 1.0).map(|n| n as u64)
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionPage {
    pub items: Vec<SessionSummary>,
    pub pagination: Pagination,
}
