use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::AppError;
use crate::layout::{self, CellClass, CellEdit, CellKey, LayoutPayload, PersistedLayout, RoomLayout};
use crate::middleware::StaffToken;
use crate::models::CellEditRequest;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/layouts/generate", post(generate_layout))
        .route("/layouts/cells", post(edit_cell))
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub rows: i64,
    pub columns: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellView<'a> {
    pub key: CellKey,
    #[serde(flatten)]
    pub class: CellClass<'a>,
}

/// План в виде сетки для редактора + то, что уйдёт в бэкенд.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutView<'a> {
    pub rows: &'a [String],
    pub columns: u32,
    pub staff_seats: u32,
    pub cells: Vec<CellView<'a>>,
    pub payload: LayoutPayload,
}

impl<'a> LayoutView<'a> {
    pub fn new(layout: &'a RoomLayout) -> Self {
        let cells = layout
            .keys()
            .filter_map(|key| layout.resolve(&key).map(|class| CellView { key, class }))
            .collect();

        LayoutView {
            rows: layout.rows(),
            columns: layout.columns(),
            staff_seats: layout.staff_seats(),
            cells,
            payload: layout::encode(layout),
        }
    }
}

// POST /api/layouts/generate
async fn generate_layout(
    _token: StaffToken,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<Value>, AppError> {
    let layout = RoomLayout::generate(req.rows, req.columns)?;
    tracing::debug!("Generated layout {}x{}", req.rows, req.columns);

    Ok(Json(json!({ "success": true, "layout": LayoutView::new(&layout) })))
}

#[derive(Debug, Deserialize)]
pub struct CellEditBody {
    #[serde(flatten)]
    pub layout: PersistedLayout,
    #[serde(flatten)]
    pub edit: CellEditRequest,
}

// POST /api/layouts/cells
async fn edit_cell(
    State(state): State<Arc<AppState>>,
    token: StaffToken,
    Json(body): Json<CellEditBody>,
) -> Result<Json<Value>, AppError> {
    let key = body.edit.key()?;
    let edit = body.edit.edit()?;
    let mut layout = layout::decode(&body.layout);

    // первый тариф нужен только если у места ещё нет своего
    let needs_fallback = edit == CellEdit::Pricing(None)
        && layout.resolve(&key).is_some_and(|class| class.pricing_id.is_none());
    let fallback = if needs_fallback {
        state.backend.list_pricing(&token).await?.into_iter().next().map(|tier| tier.id)
    } else {
        None
    };

    let changed = layout.set_cell_type(&key, edit, fallback.as_deref());
    if !changed {
        tracing::debug!("Cell {} is not part of the layout", key);
    }

    Ok(Json(json!({
        "success": true,
        "changed": changed,
        "layout": LayoutView::new(&layout)
    })))
}
