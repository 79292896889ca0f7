//! Модель плана зала: генерация сетки, классификация ячеек и кодек
//! для формата бэкенда.

pub mod codec;
pub mod grid;
pub mod labels;

pub use codec::{decode, encode, merge_overlays, LayoutPayload, PersistedLayout, PricingOverride, StaffOverride};
pub use grid::{Cell, CellClass, CellEdit, CellKey, CellType, PricingId, RoomLayout, SeatKind, MAX_COLUMNS, MAX_ROWS};
pub use labels::{compare_row_labels, row_label, row_labels};
