//! sessions.rs
//!
//! Подготовка и отправка сеансов во внешний API.
//!
//! Ключевые компоненты:
//! 1.  **Проверка черновика**: событие, дата, зал, версия и хотя бы один
//!     корректный временной слот (`HH:MM`).
//! 2.  **SessionPlan**: копия плана зала с собственными атрибутами мест сеанса.
//!     Правки плана сеанса никогда не меняют сохранённый план зала.
//! 3.  **Fan-out**: один логический "создать сеанс" превращается в отдельный
//!     запрос на каждый выбранный слот. Запросы идут последовательно, ошибка
//!     одного слота не останавливает остальные и ничего не откатывает;
//!     результат по каждому слоту возвращается вызывающему.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::backend_client::BackendClient;
use crate::error::{AppError, SessionError};
use crate::layout::{self, Cell, CellEdit, CellKey, RoomLayout};
use crate::middleware::StaffToken;
use crate::models::{id_of, is_valid_time, PricingLimit, QuotaInput, Room, SeatTotals, SessionDraft, SessionPayload};

/// Дата сеанса в RFC 3339 (UTC, миллисекунды). Принимает RFC 3339 или `YYYY-MM-DD`.
pub fn normalize_date(value: &str) -> Option<String> {
    let value = value.trim();
    let parsed = match DateTime::parse_from_rfc3339(value) {
        Ok(datetime) => datetime.with_timezone(&Utc),
        Err(_) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?
            .and_utc(),
    };

    Some(parsed.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Целое в начале строки (запятая как десятичный разделитель допускается).
/// `"12,5"` -> 12, `"abc"` -> None.
pub fn parse_quota(raw: &str) -> Option<i64> {
    let normalized = raw.trim().replacen(',', ".", 1);
    let (sign, rest) = match normalized.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, normalized.strip_prefix('+').unwrap_or(&normalized)),
    };

    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<i64>().ok().map(|n| sign * n)
}

/// Квоты по тарифам. Выключенные тарифы и пустые квоты пропускаются.
pub fn pricing_limits(quotas: &[QuotaInput]) -> Result<Vec<PricingLimit>, SessionError> {
    let mut limits = Vec::new();

    for quota in quotas {
        if !quota.enabled || quota.quota.trim().is_empty() {
            continue;
        }

        let max_tickets = parse_quota(&quota.quota)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| SessionError::InvalidQuota(quota.pricing_id.clone()))?;

        limits.push(PricingLimit { pricing_id: quota.pricing_id.clone(), max_tickets });
    }

    Ok(limits)
}

/// Проверенные поля черновика.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDraft {
    pub event_id: String,
    pub date: String,
    pub times: Vec<String>,
    pub version: String,
    pub room_id: String,
}

pub fn validate_draft(draft: &SessionDraft) -> Result<ValidatedDraft, SessionError> {
    let event_id = draft.event_id.trim();
    if event_id.is_empty() {
        return Err(SessionError::MissingEvent);
    }

    let date = normalize_date(&draft.date).ok_or(SessionError::InvalidDate)?;

    let room_id = draft.room_id.trim();
    if room_id.is_empty() {
        return Err(SessionError::MissingRoom);
    }

    let version = draft.version.trim();
    if version.is_empty() {
        return Err(SessionError::MissingVersion);
    }

    // некорректные слоты молча отбрасываются, повторы тоже
    let mut times: Vec<String> = Vec::new();
    for time in draft.session_times.iter().map(|t| t.trim()) {
        if is_valid_time(time) && !times.iter().any(|t| t == time) {
            times.push(time.to_string());
        }
    }
    if times.is_empty() {
        return Err(SessionError::MissingTime);
    }

    Ok(ValidatedDraft {
        event_id: event_id.to_string(),
        date,
        times,
        version: version.to_string(),
        room_id: room_id.to_string(),
    })
}

/// Всё, что нужно для отправки сеанса по каждому слоту.
#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub fields: ValidatedDraft,
    layout: RoomLayout,
    pricing_limits: Vec<PricingLimit>,
    previous: Option<SeatTotals>,
}

impl SessionPlan {
    /// План зала копируется, поверх накладываются атрибуты мест сеанса и
    /// правки из черновика.
    pub fn prepare(draft: &SessionDraft, room: &Room, fallback_pricing: Option<&str>) -> Result<Self, AppError> {
        let fields = validate_draft(draft)?;
        if room.id != fields.room_id {
            return Err(SessionError::UnknownRoom(fields.room_id).into());
        }

        let mut layout = room.decode_layout();
        layout::merge_overlays(&mut layout, &draft.overlays.overrides, &draft.overlays.pricing_overrides);

        let mut plan = SessionPlan {
            fields,
            layout,
            pricing_limits: pricing_limits(&draft.quotas)?,
            previous: draft.previous,
        };

        for request in &draft.seat_edits {
            let key = request.key()?;
            let edit = request.edit()?;
            if !plan.edit_seat(&key, edit, fallback_pricing) {
                warn!("Ignoring session seat edit on {}", key);
            }
        }

        Ok(plan)
    }

    pub fn layout(&self) -> &RoomLayout {
        &self.layout
    }

    /// Правка места в рамках сеанса. Проходы задаёт зал: их нельзя ни
    /// создать, ни превратить в место.
    pub fn edit_seat(&mut self, key: &CellKey, edit: CellEdit, fallback_pricing: Option<&str>) -> bool {
        if edit == CellEdit::Aisle || !self.layout.cell(key).is_some_and(Cell::is_seat) {
            return false;
        }

        self.layout.set_cell_type(key, edit, fallback_pricing)
    }

    /// Места в продаже = места зала минус места персонала; доступные - минус
    /// уже проданные (при редактировании).
    pub fn totals(&self) -> SeatTotals {
        let total_seats = self.layout.count_seats().saturating_sub(self.layout.staff_seats());
        let sold = self
            .previous
            .map(|p| p.total_seats.saturating_sub(p.available_seats))
            .unwrap_or(0);

        SeatTotals { total_seats, available_seats: total_seats.saturating_sub(sold) }
    }

    pub fn payload(&self, session_time: &str) -> SessionPayload {
        let encoded = layout::encode(&self.layout);

        SessionPayload {
            event_id: self.fields.event_id.clone(),
            date: self.fields.date.clone(),
            session_time: session_time.to_string(),
            version: self.fields.version.clone(),
            room_id: self.fields.room_id.clone(),
            totals: self.totals(),
            overrides: encoded.overrides,
            pricing_overrides: encoded.pricing_overrides,
            pricing_limits: self.pricing_limits.clone(),
        }
    }

    /// При редактировании сеанса допускается ровно один слот.
    pub fn single_time(&self) -> Result<&str, SessionError> {
        match self.fields.times.as_slice() {
            [time] => Ok(time.as_str()),
            _ => Err(SessionError::SingleTimeRequired),
        }
    }
}

/// Результат по одному слоту.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SlotStatus {
    Created { id: Option<String> },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotOutcome {
    pub time: String,
    #[serde(flatten)]
    pub status: SlotStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub created: usize,
    pub failed: usize,
    pub outcomes: Vec<SlotOutcome>,
}

impl BatchReport {
    pub fn new(outcomes: Vec<SlotOutcome>) -> Self {
        let created = outcomes
            .iter()
            .filter(|o| matches!(o.status, SlotStatus::Created { .. }))
            .count();

        Self { created, failed: outcomes.len() - created, outcomes }
    }

    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Создаёт по сеансу на каждый слот. Все слоты пробуются по очереди; уже
/// созданные сеансы при ошибке не удаляются.
pub async fn create_sessions(client: &BackendClient, token: &StaffToken, plan: &SessionPlan) -> BatchReport {
    let mut outcomes = Vec::with_capacity(plan.fields.times.len());

    for time in &plan.fields.times {
        let status = match client.create_session(token, &plan.payload(time)).await {
            Ok(body) => {
                let id = created_id(&body);
                info!("Session created for event {} at {} ({:?})", plan.fields.event_id, time, id);
                SlotStatus::Created { id }
            }
            Err(e) => {
                warn!("Session creation failed for event {} at {}: {}", plan.fields.event_id, time, e);
                SlotStatus::Failed { reason: e.to_string() }
            }
        };

        outcomes.push(SlotOutcome { time: time.clone(), status });
    }

    let report = BatchReport::new(outcomes);
    info!(
        "Session batch for event {}: {} created, {} failed",
        plan.fields.event_id, report.created, report.failed
    );
    report
}

/// Изменение существующего сеанса (ровно один слот).
pub async fn update_session(
    client: &BackendClient,
    token: &StaffToken,
    session_id: &str,
    plan: &SessionPlan,
) -> Result<Value, AppError> {
    let time = plan.single_time()?;
    let body = client.update_session(token, session_id, &plan.payload(time)).await?;
    info!("Session {} updated", session_id);
    Ok(body)
}

fn created_id(body: &Value) -> Option<String> {
    id_of(body).or_else(|| ["session", "data"].iter().find_map(|key| body.get(*key).and_then(id_of)))
}
