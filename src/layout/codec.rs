//! Плоский формат плана зала, в котором его хранит бэкенд.
//!
//! `encode` выдаёт плотный список ячеек (по одной записи на каждую ячейку
//! сетки) и разреженные списки атрибутов мест. `decode` читает то же самое,
//! молча отбрасывая битые записи: испорченные данные не должны ломать редактор.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::grid::{Cell, CellKey, CellType, PricingId, RoomLayout, SeatKind, MAX_COLUMNS, MAX_ROWS};
use super::labels::compare_row_labels;

/// Запись плана: одна ячейка.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRecord {
    pub row: String,
    pub col: u32,
    pub cell_type: CellType,
}

/// Место для персонала. `status` всегда `"staff"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffOverride {
    pub row: String,
    pub col: u32,
    pub status: String,
}

impl StaffOverride {
    pub const STATUS: &'static str = "staff";

    pub fn new(key: &CellKey) -> Self {
        Self { row: key.row.clone(), col: key.col, status: Self::STATUS.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingOverride {
    pub row: String,
    pub col: u32,
    pub pricing_id: PricingId,
}

/// Результат кодирования: то, что уходит в бэкенд.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutPayload {
    pub layout: Vec<LayoutRecord>,
    pub overrides: Vec<StaffOverride>,
    pub pricing_overrides: Vec<PricingOverride>,
    pub capacity: u32,
}

/// Сохранённый план в "сыром" виде. Записи не валидируются при разборе JSON,
/// а проверяются по одной в `decode`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedLayout {
    #[serde(default, deserialize_with = "lenient_list")]
    pub layout: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub overrides: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub pricing_overrides: Vec<Value>,
}

impl From<&LayoutPayload> for PersistedLayout {
    fn from(payload: &LayoutPayload) -> Self {
        fn to_values<T: Serialize>(records: &[T]) -> Vec<Value> {
            records.iter().filter_map(|r| serde_json::to_value(r).ok()).collect()
        }

        Self {
            layout: to_values(&payload.layout),
            overrides: to_values(&payload.overrides),
            pricing_overrides: to_values(&payload.pricing_overrides),
        }
    }
}

/// Не массив (или `null`) читается как пустой список.
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    })
}

/// Кодирует план. Вместимость считается в том же проходе.
pub fn encode(layout: &RoomLayout) -> LayoutPayload {
    let mut payload = LayoutPayload::default();

    for key in layout.keys() {
        let cell = layout.cell(&key).cloned().unwrap_or(Cell::STANDARD);
        let cell_type = if cell.is_seat() { CellType::Seat } else { CellType::Aisle };

        payload.layout.push(LayoutRecord { row: key.row.clone(), col: key.col, cell_type });

        match cell {
            Cell::Aisle => {}
            Cell::Seat(kind) => {
                payload.capacity += 1;
                match kind {
                    SeatKind::Standard => {}
                    SeatKind::Staff => payload.overrides.push(StaffOverride::new(&key)),
                    SeatKind::Priced(pricing_id) => payload.pricing_overrides.push(PricingOverride {
                        row: key.row,
                        col: key.col,
                        pricing_id,
                    }),
                }
            }
        }
    }

    payload
}

/// Восстанавливает план из сохранённых записей.
///
/// Ряды - различные метки в естественном порядке, число мест в ряду -
/// максимальный корректный номер. Недостающие ячейки становятся местами.
pub fn decode(persisted: &PersistedLayout) -> RoomLayout {
    let mut rows = BTreeSet::new();
    let mut columns = 0;
    // последняя запись для ячейки выигрывает
    let mut aisles = BTreeMap::new();
    let mut dropped = 0usize;

    for record in &persisted.layout {
        let Some(key) = record_key(record) else {
            dropped += 1;
            continue;
        };

        columns = columns.max(key.col);
        rows.insert(key.row.clone());
        aisles.insert(key, is_aisle(record.get("cellType")));
    }

    let mut rows: Vec<String> = rows.into_iter().collect();
    rows.sort_by(|a, b| compare_row_labels(a, b));
    if rows.len() > MAX_ROWS {
        // ряды сверх предела отбрасываются вместе со своими записями
        let extra: BTreeSet<String> = rows.split_off(MAX_ROWS).into_iter().collect();
        dropped += aisles.keys().filter(|key| extra.contains(&key.row)).count();
    }

    let mut layout = RoomLayout::with_rows(rows, columns);
    for (key, _) in aisles.iter().filter(|(_, aisle)| **aisle) {
        layout.mark_aisle(key);
    }

    dropped += merge_overlays(&mut layout, &persisted.overrides, &persisted.pricing_overrides);

    if dropped > 0 {
        debug!("Layout decode dropped {} malformed records", dropped);
    }

    layout
}

/// Накладывает атрибуты мест поверх плана. Тариф важнее staff; записи для
/// проходов и ячеек вне сетки игнорируются. Возвращает число битых записей.
pub fn merge_overlays(layout: &mut RoomLayout, overrides: &[Value], pricing_overrides: &[Value]) -> usize {
    let mut dropped = 0;
    let mut priced = BTreeMap::new();

    for record in pricing_overrides {
        match (record_key(record), record.get("pricingId").and_then(pricing_id_of)) {
            (Some(key), Some(pricing_id)) => {
                priced.insert(key, pricing_id);
            }
            _ => dropped += 1,
        }
    }

    for record in overrides {
        let is_staff = record.get("status").and_then(Value::as_str) == Some(StaffOverride::STATUS);
        match record_key(record) {
            Some(key) if is_staff => {
                if !priced.contains_key(&key) {
                    layout.overlay_seat(&key, SeatKind::Staff);
                }
            }
            Some(_) => {}
            None => dropped += 1,
        }
    }

    for (key, pricing_id) in priced {
        layout.overlay_seat(&key, SeatKind::Priced(pricing_id));
    }

    dropped
}

fn record_key(record: &Value) -> Option<CellKey> {
    let row = record.get("row").and_then(row_of)?;
    let col = record.get("col").and_then(col_of)?;
    Some(CellKey::new(row, col))
}

fn row_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// Номер места: целое от 1 до `MAX_COLUMNS` (число или строка).
fn col_of(value: &Value) -> Option<u32> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    if raw.is_finite() && raw > 0.0 && raw.fract() == 0.0 && raw <= MAX_COLUMNS as f64 {
        Some(raw as u32)
    } else {
        None
    }
}

fn is_aisle(value: Option<&Value>) -> bool {
    value
        .cloned()
        .and_then(|v| serde_json::from_value::<CellType>(v).ok())
        == Some(CellType::Aisle)
}

/// Тариф может прийти строкой, числом или "populated" объектом с `_id`.
fn pricing_id_of(value: &Value) -> Option<PricingId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Object(map) => map.get("_id").or_else(|| map.get("id")).and_then(pricing_id_of),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::grid::CellEdit;
    use proptest::prelude::*;
    use serde_json::json;

    fn key(s: &str) -> CellKey {
        s.parse().unwrap()
    }

    fn persisted(value: Value) -> PersistedLayout {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn aisle_scenario_encodes_dense_layout() {
        let mut layout = RoomLayout::generate(2, 2).unwrap();
        layout.set_cell_type(&key("A-1"), CellEdit::Aisle, None);

        let payload = encode(&layout);
        assert_eq!(payload.layout.len(), 4);
        assert_eq!(payload.layout.iter().filter(|r| r.cell_type == CellType::Aisle).count(), 1);
        assert_eq!(payload.layout.iter().filter(|r| r.cell_type == CellType::Seat).count(), 3);
        assert!(payload.overrides.is_empty());
        assert!(payload.pricing_overrides.is_empty());
        assert_eq!(payload.capacity, 3);
    }

    #[test]
    fn wire_format_uses_backend_cell_names() {
        let mut layout = RoomLayout::generate(1, 2).unwrap();
        layout.set_cell_type(&key("A-1"), CellEdit::Aisle, None);
        layout.set_cell_type(&key("A-2"), CellEdit::Staff, None);

        let value = serde_json::to_value(encode(&layout)).unwrap();
        assert_eq!(
            value,
            json!({
                "layout": [
                    {"row": "A", "col": 1, "cellType": "couloir"},
                    {"row": "A", "col": 2, "cellType": "chaise"}
                ],
                "overrides": [{"row": "A", "col": 2, "status": "staff"}],
                "pricingOverrides": [],
                "capacity": 1
            })
        );
    }

    #[test]
    fn decode_drops_invalid_columns() {
        let layout = decode(&persisted(json!({
            "layout": [
                {"row": "A", "col": 1, "cellType": "chaise"},
                {"row": "A", "col": 2, "cellType": "couloir"},
                {"row": "B", "col": -1, "cellType": "chaise"},
                {"row": "B", "col": 1.5, "cellType": "chaise"},
                {"row": "", "col": 7},
                {"col": 9},
                null
            ]
        })));

        assert_eq!(layout.rows(), ["A"]);
        assert_eq!(layout.columns(), 2);
        assert_eq!(layout.count_seats(), 1);
    }

    #[test]
    fn decode_drops_columns_beyond_room_limit() {
        let layout = decode(&persisted(json!({
            "layout": [
                {"row": "A", "col": 1, "cellType": "chaise"},
                {"row": "A", "col": 3_000_000, "cellType": "chaise"},
                {"row": "B", "col": "4000000000", "cellType": "chaise"},
                {"row": "B", "col": MAX_COLUMNS, "cellType": "couloir"}
            ]
        })));

        assert_eq!(layout.rows(), ["A", "B"]);
        assert_eq!(layout.columns(), MAX_COLUMNS);
        assert_eq!(encode(&layout).layout.len(), 2 * MAX_COLUMNS as usize);
        assert_eq!(layout.cell(&CellKey::new("B", MAX_COLUMNS)), Some(&Cell::Aisle));
    }

    #[test]
    fn decode_keeps_only_first_rows_within_limit() {
        let records: Vec<Value> = crate::layout::row_labels(MAX_ROWS as i64 + 5)
            .into_iter()
            .rev()
            .map(|row| json!({"row": row, "col": 1, "cellType": "chaise"}))
            .collect();

        let layout = decode(&persisted(json!({ "layout": records })));
        assert_eq!(layout.rows().len(), MAX_ROWS);
        assert_eq!(layout.rows()[0], "A");
        assert_eq!(layout.count_seats(), MAX_ROWS as u32);
    }

    #[test]
    fn decode_sorts_rows_naturally_and_fills_gaps() {
        let layout = decode(&persisted(json!({
            "layout": [
                {"row": "AA", "col": 1, "cellType": "chaise"},
                {"row": "B", "col": 3, "cellType": "chaise"},
                {"row": "Z", "col": "2", "cellType": "couloir"}
            ]
        })));

        assert_eq!(layout.rows(), ["B", "Z", "AA"]);
        assert_eq!(layout.columns(), 3);
        assert_eq!(layout.cell(&key("AA-3")), Some(&Cell::STANDARD));
        assert_eq!(layout.cell(&key("Z-2")), Some(&Cell::Aisle));
        assert_eq!(layout.count_seats(), 8);
    }

    #[test]
    fn decode_tolerates_overlays_on_aisles_and_conflicts() {
        let layout = decode(&persisted(json!({
            "layout": [
                {"row": "A", "col": 1, "cellType": "couloir"},
                {"row": "A", "col": 2, "cellType": "chaise"},
                {"row": "A", "col": 3, "cellType": "chaise"}
            ],
            "overrides": [
                {"row": "A", "col": 1, "status": "staff"},
                {"row": "A", "col": 2, "status": "staff"},
                {"row": "A", "col": 3, "status": "blocked"},
                {"row": "Q", "col": 1, "status": "staff"}
            ],
            "pricingOverrides": [
                {"row": "A", "col": 1, "pricingId": "p0"},
                {"row": "A", "col": 2, "pricingId": {"_id": "p1", "name": "VIP"}},
                {"row": "A", "col": 3, "pricingId": ""}
            ]
        })));

        assert_eq!(layout.cell(&key("A-1")), Some(&Cell::Aisle));
        assert_eq!(layout.cell(&key("A-2")), Some(&Cell::Seat(SeatKind::Priced("p1".into()))));
        assert_eq!(layout.cell(&key("A-3")), Some(&Cell::STANDARD));
    }

    #[test]
    fn missing_or_malformed_lists_decode_to_empty_grid() {
        let layout = decode(&persisted(json!({"layout": "oops", "overrides": null})));
        assert!(layout.is_empty());
        assert_eq!(layout.count_seats(), 0);
        assert!(encode(&layout).layout.is_empty());
    }

    #[test]
    fn staff_then_pricing_round_trips_as_pricing_only() {
        let mut layout = RoomLayout::generate(2, 2).unwrap();
        layout.set_cell_type(&key("B-2"), CellEdit::Staff, None);
        layout.set_cell_type(&key("B-2"), CellEdit::Pricing(Some("p1".into())), None);

        let payload = encode(&layout);
        assert!(payload.overrides.is_empty());
        assert_eq!(
            payload.pricing_overrides,
            vec![PricingOverride { row: "B".into(), col: 2, pricing_id: "p1".into() }]
        );
        assert_eq!(decode(&PersistedLayout::from(&payload)), layout);
    }

    fn edit_strategy() -> impl Strategy<Value = CellEdit> {
        prop_oneof![
            Just(CellEdit::Seat),
            Just(CellEdit::Aisle),
            Just(CellEdit::Staff),
            "p[0-9]".prop_map(|id| CellEdit::Pricing(Some(id))),
        ]
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            rows in 1i64..30,
            columns in 1i64..12,
            edits in prop::collection::vec((0usize..30, 1u32..12, edit_strategy()), 0..60)
        ) {
            let mut layout = RoomLayout::generate(rows, columns).unwrap();
            for (row, col, edit) in edits {
                if let Some(label) = layout.rows().get(row).cloned() {
                    layout.set_cell_type(&CellKey::new(label, col), edit, None);
                }
            }

            let payload = encode(&layout);
            prop_assert_eq!(payload.capacity, layout.count_seats());

            let json = serde_json::to_value(&payload).unwrap();
            let restored = decode(&serde_json::from_value(json).unwrap());
            prop_assert_eq!(restored, layout);
        }
    }
}
