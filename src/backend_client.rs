//! Клиент внешнего REST API, который хранит залы, сеансы и справочники.
//!
//! Каждый вызов - независимый запрос/ответ без транзакций и без повторов:
//! ошибка возвращается вызывающему как есть, решение о повторе за пользователем.

use reqwest::{Method, RequestBuilder, Url};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::middleware::StaffToken;
use crate::models::{
    list_items, Pagination, PriceTier, PricingPayload, Room, RoomPayload, SessionPage, SessionPayload,
    SessionQuery, SessionSummary, SessionTime, SessionTimeRequest,
};

const CREATE_FAILED: &str = "creation failed";
const UPDATE_FAILED: &str = "update failed";
const DELETE_FAILED: &str = "deletion failed";
const LOAD_FAILED: &str = "loading failed";

#[derive(Clone)]
pub struct BackendClient {
    /// Базовый URL без завершающего `/`.
    base_url: String,
    http_client: reqwest::Client,
}

impl BackendClient {
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_seconds))
    }

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: crate::config::normalize_base_url(base_url), http_client })
    }

    /// `segments` кодируются как отдельные компоненты пути.
    fn url(&self, resource: &str, segments: &[&str], trailing_slash: bool) -> Result<Url, BackendError> {
        if self.base_url.is_empty() {
            return Err(BackendError::MissingConfiguration);
        }

        let mut url = Url::parse(&format!("{}/{}", self.base_url, resource))
            .map_err(|_| BackendError::MissingConfiguration)?;
        {
            let mut path = url.path_segments_mut().map_err(|_| BackendError::MissingConfiguration)?;
            path.pop_if_empty().extend(segments);
            if trailing_slash {
                path.push("");
            }
        }

        Ok(url)
    }

    fn request(&self, method: Method, url: Url, token: &StaffToken) -> RequestBuilder {
        self.http_client.request(method, url).bearer_auth(token.as_str())
    }

    /// Отправляет запрос. Не-2xx превращается в `Rejected` с сообщением из
    /// тела ответа (`message`) или с `fallback`.
    async fn send(&self, request: RequestBuilder, fallback: &str) -> Result<Value, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        // пустое или не-JSON тело не считается ошибкой
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(fallback)
                .to_string();
            warn!("Backend rejected request with {}: {}", status, message);
            return Err(BackendError::Rejected { status: status.as_u16(), message });
        }

        Ok(body)
    }

    async fn send_json<T: Serialize>(
        &self,
        method: Method,
        url: Url,
        token: &StaffToken,
        body: &T,
        fallback: &str,
    ) -> Result<Value, BackendError> {
        debug!("{} {}", method, url);
        self.send(self.request(method, url, token).json(body), fallback).await
    }

    // === Залы ===

    pub async fn list_rooms(&self, token: &StaffToken) -> Result<Vec<Room>, BackendError> {
        let url = self.url("rooms", &[], true)?;
        let body = self.send(self.request(Method::GET, url, token), LOAD_FAILED).await?;
        Ok(list_items(body, "rooms").iter().filter_map(Room::from_value).collect())
    }

    pub async fn find_room(&self, token: &StaffToken, room_id: &str) -> Result<Option<Room>, BackendError> {
        let rooms = self.list_rooms(token).await?;
        Ok(rooms.into_iter().find(|room| room.id == room_id))
    }

    pub async fn create_room(&self, token: &StaffToken, payload: &RoomPayload) -> Result<Value, BackendError> {
        let url = self.url("rooms", &[], false)?;
        self.send_json(Method::POST, url, token, payload, CREATE_FAILED).await
    }

    pub async fn update_room(&self, token: &StaffToken, id: &str, payload: &RoomPayload) -> Result<Value, BackendError> {
        let url = self.url("rooms", &[id], false)?;
        self.send_json(Method::PUT, url, token, payload, UPDATE_FAILED).await
    }

    pub async fn delete_room(&self, token: &StaffToken, id: &str) -> Result<(), BackendError> {
        let url = self.url("rooms", &[id], false)?;
        self.send(self.request(Method::DELETE, url, token), DELETE_FAILED).await?;
        Ok(())
    }

    // === Сеансы ===

    pub async fn create_session(&self, token: &StaffToken, payload: &SessionPayload) -> Result<Value, BackendError> {
        let url = self.url("sessions", &[], true)?;
        self.send_json(Method::POST, url, token, payload, CREATE_FAILED).await
    }

    pub async fn update_session(
        &self,
        token: &StaffToken,
        id: &str,
        payload: &SessionPayload,
    ) -> Result<Value, BackendError> {
        let url = self.url("sessions", &[id], false)?;
        self.send_json(Method::PUT, url, token, payload, UPDATE_FAILED).await
    }

    pub async fn delete_session(&self, token: &StaffToken, id: &str) -> Result<(), BackendError> {
        let url = self.url("sessions", &[id], false)?;
        self.send(self.request(Method::DELETE, url, token), DELETE_FAILED).await?;
        Ok(())
    }

    pub async fn list_sessions(&self, token: &StaffToken, query: &SessionQuery) -> Result<SessionPage, BackendError> {
        let query = query.normalized();
        let url = self.url("sessions", &["populated"], false)?;
        let body = self
            .send(self.request(Method::GET, url, token).query(&query), LOAD_FAILED)
            .await?;

        let page = query.page.unwrap_or(1);
        let limit = query.limit.unwrap_or(SessionQuery::DEFAULT_LIMIT);
        let items: Vec<SessionSummary> = list_items(body.clone(), "sessions")
            .iter()
            .filter_map(SessionSummary::from_value)
            .collect();
        let pagination = Pagination::from_payload(&body, page, limit, items.len());

        Ok(SessionPage { items, pagination })
    }

    // === Справочники ===

    pub async fn list_pricing(&self, token: &StaffToken) -> Result<Vec<PriceTier>, BackendError> {
        let url = self.url("pricing", &[], true)?;
        let body = self.send(self.request(Method::GET, url, token), LOAD_FAILED).await?;
        Ok(list_items(body, "pricing").iter().filter_map(PriceTier::from_value).collect())
    }

    pub async fn list_session_times(&self, token: &StaffToken) -> Result<Vec<SessionTime>, BackendError> {
        let url = self.url("session-times", &[], true)?;
        let body = self.send(self.request(Method::GET, url, token), LOAD_FAILED).await?;
        Ok(list_items(body, "sessionTimes").iter().filter_map(SessionTime::from_value).collect())
    }

    pub async fn create_pricing(&self, token: &StaffToken, payload: &PricingPayload) -> Result<Value, BackendError> {
        let url = self.url("pricing", &[], false)?;
        self.send_json(Method::POST, url, token, payload, CREATE_FAILED).await
    }

    pub async fn update_pricing(
        &self,
        token: &StaffToken,
        id: &str,
        payload: &PricingPayload,
    ) -> Result<Value, BackendError> {
        let url = self.url("pricing", &[id], false)?;
        self.send_json(Method::PUT, url, token, payload, UPDATE_FAILED).await
    }

    pub async fn delete_pricing(&self, token: &StaffToken, id: &str) -> Result<(), BackendError> {
        let url = self.url("pricing", &[id], false)?;
        self.send(self.request(Method::DELETE, url, token), DELETE_FAILED).await?;
        Ok(())
    }

    pub async fn create_session_time(
        &self,
        token: &StaffToken,
        payload: &SessionTimeRequest,
    ) -> Result<Value, BackendError> {
        let url = self.url("session-times", &[], false)?;
        self.send_json(Method::POST, url, token, payload, CREATE_FAILED).await
    }

    pub async fn update_session_time(
        &self,
        token: &StaffToken,
        id: &str,
        payload: &SessionTimeRequest,
    ) -> Result<Value, BackendError> {
        let url = self.url("session-times", &[id], false)?;
        self.send_json(Method::PUT, url, token, payload, UPDATE_FAILED).await
    }

    pub async fn delete_session_time(&self, token: &StaffToken, id: &str) -> Result<(), BackendError> {
        let url = self.url("session-times", &[id], false)?;
        self.send(self.request(Method::DELETE, url, token), DELETE_FAILED).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token() -> StaffToken {
        StaffToken::new("secret")
    }

    async fn client(server: &MockServer) -> BackendClient {
        BackendClient::new(&format!("{}/", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn lists_rooms_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rooms/"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "rooms": [
                    {"_id": "r1", "name": "Salle 1", "layout": [{"row": "A", "col": 1, "cellType": "chaise"}]},
                    {"_id": "r2"}
                ]
            })))
            .mount(&server)
            .await;

        let rooms = client(&server).await.list_rooms(&token()).await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].capacity, 1);
    }

    #[tokio::test]
    async fn rejected_request_carries_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rooms"))
            .and(body_partial_json(json!({"name": "Salle", "capacity": 0})))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({"message": "name already used"})))
            .mount(&server)
            .await;

        let payload = RoomPayload { name: "Salle".into(), layout: Default::default() };
        let err = client(&server).await.create_room(&token(), &payload).await.unwrap_err();
        match err {
            BackendError::Rejected { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "name already used");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_request_without_body_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rooms/a%20b"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server).await.delete_room(&token(), "a b").await.unwrap_err();
        assert_eq!(err.to_string(), DELETE_FAILED);
    }

    #[tokio::test]
    async fn sessions_listing_passes_query_and_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/populated"))
            .and(query_param("page", "2"))
            .and(query_param("limit", "10"))
            .and(query_param("status", "scheduled"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"_id": "s1", "sessionTime": "20:30"}],
                "total": 11
            })))
            .mount(&server)
            .await;

        let query = SessionQuery {
            page: Some(2),
            limit: Some(10),
            status: Some("scheduled".into()),
            ..Default::default()
        };
        let page = client(&server).await.list_sessions(&token(), &query).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.pagination.total_pages, Some(2));
        assert!(!page.pagination.has_next);
    }

    #[tokio::test]
    async fn missing_base_url_is_reported() {
        let client = BackendClient::new("", Duration::from_secs(1)).unwrap();
        let err = client.list_pricing(&token()).await.unwrap_err();
        assert!(matches!(err, BackendError::MissingConfiguration));
    }
}
