use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::labels::row_labels;
use crate::error::LayoutError;

/// Идентификатор тарифа во внешнем API (непрозрачная строка).
pub type PricingId = String;

/// Предельный размер зала. Сетка плотная, поэтому больше не строим.
pub const MAX_ROWS: usize = 200;
pub const MAX_COLUMNS: u32 = 200;

/// Адрес ячейки: ряд + номер места. В строковом виде `"{row}-{col}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellKey {
    pub row: String,
    pub col: u32,
}

impl CellKey {
    pub fn new(row: impl Into<String>, col: u32) -> Self {
        Self { row: row.into(), col }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.col)
    }
}

impl FromStr for CellKey {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, col) = s
            .split_once('-')
            .ok_or_else(|| LayoutError::UnknownCell(s.to_string()))?;
        let col: u32 = col
            .parse()
            .map_err(|_| LayoutError::UnknownCell(s.to_string()))?;

        if row.is_empty() || col == 0 {
            return Err(LayoutError::UnknownCell(s.to_string()));
        }

        Ok(CellKey::new(row, col))
    }
}

impl TryFrom<String> for CellKey {
    type Error = LayoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CellKey> for String {
    fn from(key: CellKey) -> Self {
        key.to_string()
    }
}

/// Базовый тип ячейки в том виде, в котором его хранит бэкенд.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellType {
    #[serde(rename = "chaise", alias = "seat")]
    Seat,
    #[serde(rename = "couloir", alias = "aisle")]
    Aisle,
}

/// Разновидность места. Staff и фиксированный тариф взаимоисключающие.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatKind {
    Standard,
    /// Место для персонала, в продажу не идёт.
    Staff,
    /// Место с принудительным тарифом.
    Priced(PricingId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Aisle,
    Seat(SeatKind),
}

impl Cell {
    pub const STANDARD: Cell = Cell::Seat(SeatKind::Standard);

    pub fn classify(&self) -> CellClass<'_> {
        match self {
            Cell::Aisle => CellClass { base: CellType::Aisle, is_staff: false, pricing_id: None },
            Cell::Seat(SeatKind::Standard) => CellClass { base: CellType::Seat, is_staff: false, pricing_id: None },
            Cell::Seat(SeatKind::Staff) => CellClass { base: CellType::Seat, is_staff: true, pricing_id: None },
            Cell::Seat(SeatKind::Priced(id)) => CellClass {
                base: CellType::Seat,
                is_staff: false,
                pricing_id: Some(id.as_str()),
            },
        }
    }

    pub fn is_seat(&self) -> bool {
        matches!(self, Cell::Seat(_))
    }
}

/// Результат классификации ячейки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellClass<'a> {
    pub base: CellType,
    pub is_staff: bool,
    pub pricing_id: Option<&'a str>,
}

/// Целевое состояние ячейки при редактировании плана.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellEdit {
    Seat,
    Aisle,
    Staff,
    /// `None` - оставить текущий тариф ячейки или взять первый доступный.
    Pricing(Option<PricingId>),
}

/// План зала: упорядоченные ряды, число мест в ряду и плотная карта ячеек.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoomLayout {
    rows: Vec<String>,
    columns: u32,
    cells: BTreeMap<CellKey, Cell>,
}

impl RoomLayout {
    /// Генерирует план `row_count` x `columns`, все ячейки - обычные места.
    pub fn generate(row_count: i64, columns: i64) -> Result<Self, LayoutError> {
        if !(1..=MAX_ROWS as i64).contains(&row_count) || !(1..=MAX_COLUMNS as i64).contains(&columns) {
            return Err(LayoutError::InvalidDimensions { rows: row_count, columns });
        }

        Ok(Self::with_rows(row_labels(row_count), columns as u32))
    }

    /// Плотная сетка по готовым меткам рядов.
    pub(crate) fn with_rows(rows: Vec<String>, columns: u32) -> Self {
        let mut cells = BTreeMap::new();
        for row in &rows {
            for col in 1..=columns {
                cells.insert(CellKey::new(row.clone(), col), Cell::STANDARD);
            }
        }

        Self { rows, columns, cells }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns == 0
    }

    /// Все адресуемые ячейки по рядам, слева направо.
    pub fn keys(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.rows
            .iter()
            .flat_map(move |row| (1..=self.columns).map(move |col| CellKey::new(row.clone(), col)))
    }

    pub fn cell(&self, key: &CellKey) -> Option<&Cell> {
        self.cells.get(key)
    }

    pub fn resolve(&self, key: &CellKey) -> Option<CellClass<'_>> {
        self.cell(key).map(Cell::classify)
    }

    /// Единственная точка изменения ячейки. Возвращает `false`, если ключа
    /// нет в сетке (план при этом не меняется).
    pub fn set_cell_type(&mut self, key: &CellKey, edit: CellEdit, fallback_pricing: Option<&str>) -> bool {
        let Some(cell) = self.cells.get_mut(key) else {
            return false;
        };

        *cell = match edit {
            CellEdit::Aisle => Cell::Aisle,
            CellEdit::Seat => Cell::STANDARD,
            CellEdit::Staff => Cell::Seat(SeatKind::Staff),
            CellEdit::Pricing(requested) => {
                let current = match &*cell {
                    Cell::Seat(SeatKind::Priced(id)) => Some(id.clone()),
                    _ => None,
                };
                let pricing_id = requested
                    .filter(|id| !id.is_empty())
                    .or(current)
                    .or_else(|| fallback_pricing.filter(|id| !id.is_empty()).map(str::to_string));

                match pricing_id {
                    Some(id) => Cell::Seat(SeatKind::Priced(id)),
                    None => Cell::STANDARD,
                }
            }
        };

        true
    }

    /// Вместимость: число ячеек-мест по всей сетке.
    pub fn count_seats(&self) -> u32 {
        self.keys()
            .filter(|key| self.cell(key).map_or(true, Cell::is_seat))
            .count() as u32
    }

    /// Число мест для персонала.
    pub fn staff_seats(&self) -> u32 {
        self.cells
            .values()
            .filter(|cell| matches!(cell, Cell::Seat(SeatKind::Staff)))
            .count() as u32
    }

    /// Накладывает атрибут места, не затрагивая проходы и ключи вне сетки.
    pub(crate) fn overlay_seat(&mut self, key: &CellKey, kind: SeatKind) -> bool {
        match self.cells.get_mut(key) {
            Some(cell @ Cell::Seat(_)) => {
                *cell = Cell::Seat(kind);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn mark_aisle(&mut self, key: &CellKey) {
        if let Some(cell) = self.cells.get_mut(key) {
            *cell = Cell::Aisle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(s: &str) -> CellKey {
        s.parse().unwrap()
    }

    #[test]
    fn generate_rejects_non_positive_dimensions() {
        assert!(matches!(
            RoomLayout::generate(0, 5),
            Err(LayoutError::InvalidDimensions { rows: 0, columns: 5 })
        ));
        assert!(RoomLayout::generate(3, 0).is_err());
        assert!(RoomLayout::generate(3, -1).is_err());
    }

    #[test]
    fn generate_rejects_oversized_rooms() {
        assert!(RoomLayout::generate(MAX_ROWS as i64, MAX_COLUMNS as i64).is_ok());
        assert!(matches!(
            RoomLayout::generate(MAX_ROWS as i64 + 1, 10),
            Err(LayoutError::InvalidDimensions { .. })
        ));
        assert!(RoomLayout::generate(2000, 2000).is_err());
        assert!(RoomLayout::generate(10, i64::from(MAX_COLUMNS) + 1).is_err());
        assert!(RoomLayout::generate(1, 4_000_000_000).is_err());
    }

    #[test]
    fn default_grid_is_all_seats() {
        let layout = RoomLayout::generate(2, 2).unwrap();
        assert_eq!(layout.rows(), ["A", "B"]);
        assert_eq!(layout.count_seats(), 4);
        assert_eq!(layout.keys().count(), 4);
    }

    #[test]
    fn aisle_reduces_capacity() {
        let mut layout = RoomLayout::generate(2, 2).unwrap();
        assert!(layout.set_cell_type(&key("A-1"), CellEdit::Aisle, None));
        assert_eq!(layout.count_seats(), 3);
        assert_eq!(layout.resolve(&key("A-1")).unwrap().base, CellType::Aisle);
    }

    #[test]
    fn staff_then_pricing_clears_staff() {
        let mut layout = RoomLayout::generate(2, 2).unwrap();
        layout.set_cell_type(&key("B-2"), CellEdit::Staff, None);
        assert!(layout.resolve(&key("B-2")).unwrap().is_staff);

        layout.set_cell_type(&key("B-2"), CellEdit::Pricing(Some("p1".into())), None);
        let class = layout.resolve(&key("B-2")).unwrap();
        assert!(!class.is_staff);
        assert_eq!(class.pricing_id, Some("p1"));
        assert_eq!(layout.staff_seats(), 0);
    }

    #[test]
    fn pricing_falls_back_to_first_tier_or_plain_seat() {
        let mut layout = RoomLayout::generate(1, 3).unwrap();

        layout.set_cell_type(&key("A-1"), CellEdit::Pricing(None), Some("tier-1"));
        assert_eq!(layout.resolve(&key("A-1")).unwrap().pricing_id, Some("tier-1"));

        // текущий тариф важнее запасного
        layout.set_cell_type(&key("A-1"), CellEdit::Pricing(None), Some("tier-2"));
        assert_eq!(layout.resolve(&key("A-1")).unwrap().pricing_id, Some("tier-1"));

        layout.set_cell_type(&key("A-2"), CellEdit::Staff, None);
        layout.set_cell_type(&key("A-2"), CellEdit::Pricing(None), None);
        assert_eq!(layout.cell(&key("A-2")), Some(&Cell::STANDARD));
    }

    #[test]
    fn staff_promotes_aisle_back_to_seat() {
        let mut layout = RoomLayout::generate(1, 1).unwrap();
        layout.set_cell_type(&key("A-1"), CellEdit::Aisle, None);
        layout.set_cell_type(&key("A-1"), CellEdit::Staff, None);
        assert_eq!(layout.cell(&key("A-1")), Some(&Cell::Seat(SeatKind::Staff)));
        assert_eq!(layout.count_seats(), 1);
    }

    #[test]
    fn unknown_key_is_a_no_op() {
        let mut layout = RoomLayout::generate(2, 2).unwrap();
        let before = layout.clone();
        assert!(!layout.set_cell_type(&key("C-1"), CellEdit::Aisle, None));
        assert!(!layout.set_cell_type(&key("A-9"), CellEdit::Staff, None));
        assert_eq!(layout, before);
    }

    #[test]
    fn cell_key_parsing() {
        assert_eq!(key("AB-12"), CellKey::new("AB", 12));
        assert_eq!(CellKey::new("C", 3).to_string(), "C-3");
        assert!("A".parse::<CellKey>().is_err());
        assert!("A-0".parse::<CellKey>().is_err());
        assert!("-4".parse::<CellKey>().is_err());
    }

    fn edit_strategy() -> impl Strategy<Value = CellEdit> {
        prop_oneof![
            Just(CellEdit::Seat),
            Just(CellEdit::Aisle),
            Just(CellEdit::Staff),
            Just(CellEdit::Pricing(None)),
            "[a-c]".prop_map(|id| CellEdit::Pricing(Some(id))),
        ]
    }

    proptest! {
        #[test]
        fn seat_count_matches_cells(
            edits in prop::collection::vec((0usize..3, 1u32..5, edit_strategy()), 0..40)
        ) {
            let mut layout = RoomLayout::generate(3, 4).unwrap();
            for (row, col, edit) in edits {
                let key = CellKey::new(layout.rows()[row].clone(), col);
                layout.set_cell_type(&key, edit, Some("fallback"));
            }

            let seats = layout
                .keys()
                .filter(|k| layout.resolve(k).unwrap().base == CellType::Seat)
                .count() as u32;
            prop_assert_eq!(layout.count_seats(), seats);

            for k in layout.keys() {
                let class = layout.resolve(&k).unwrap();
                prop_assert!(!(class.is_staff && class.pricing_id.is_some()));
                if class.base == CellType::Aisle {
                    prop_assert!(!class.is_staff && class.pricing_id.is_none());
                }
            }
        }
    }
}
