pub mod catalog;
pub mod layouts;
pub mod rooms;
pub mod sessions;

use axum::Router;
use std::sync::Arc;

/// Все маршруты `/api`. Каждый обработчик требует токен сотрудника.
pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(layouts::routes())
        .merge(rooms::routes())
        .merge(sessions::routes())
        .merge(catalog::routes())
}
