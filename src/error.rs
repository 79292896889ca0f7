use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Ошибки модели плана зала.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid dimensions: {rows} rows x {columns} columns")]
    InvalidDimensions { rows: i64, columns: i64 },
    #[error("unknown cell '{0}'")]
    UnknownCell(String),
}

/// Ошибки обращения к внешнему REST API.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Бэкенд ответил не-2xx; `message` берётся из тела ответа, если есть.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("server configuration missing")]
    MissingConfiguration,
}

/// Ошибки подготовки сеанса до отправки в бэкенд.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("missing event identifier")]
    MissingEvent,
    #[error("invalid date")]
    InvalidDate,
    #[error("missing room")]
    MissingRoom,
    #[error("room '{0}' not found")]
    UnknownRoom(String),
    #[error("missing version")]
    MissingVersion,
    #[error("missing session time")]
    MissingTime,
    #[error("exactly one session time is required when editing")]
    SingleTimeRequired,
    #[error("invalid quota for pricing '{0}'")]
    InvalidQuota(String),
}

/// Общая ошибка HTTP-слоя.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("{0}")]
    Validation(String),
    #[error("not authenticated")]
    Unauthenticated,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Layout(LayoutError::UnknownCell(_)) => StatusCode::NOT_FOUND,
            AppError::Session(SessionError::UnknownRoom(_)) => StatusCode::NOT_FOUND,
            AppError::Layout(_) | AppError::Session(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Backend(BackendError::Rejected { status: 401, .. }) => StatusCode::UNAUTHORIZED,
            AppError::Backend(BackendError::Rejected { status: 404, .. }) => StatusCode::NOT_FOUND,
            AppError::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {:?}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(json!({ "success": false, "error": self.to_string() }))).into_response()
    }
}
