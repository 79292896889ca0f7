use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use std::fmt;
use std::sync::Arc;

use crate::error::AppError;

/// Имя cookie, в которой дашборд хранит токен сотрудника.
pub const AUTH_COOKIE: &str = "auth_token";

/// Токен сотрудника. Сам токен не проверяем: его выдаёт внешний сервис
/// авторизации, а мы только передаём его в бэкенд как Bearer.
#[derive(Clone)]
pub struct StaffToken(String);

impl StaffToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization: Bearer ...`, иначе cookie `auth_token`.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        if let Some(token) = bearer {
            return Some(Self::new(token));
        }

        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == AUTH_COOKIE && !value.is_empty())
            .map(|(_, value)| Self::new(value))
    }
}

// токен не должен попадать в логи
impl fmt::Debug for StaffToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaffToken(***)")
    }
}

impl FromRequestParts<Arc<crate::AppState>> for StaffToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        StaffToken::from_headers(&parts.headers).ok_or(AppError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("auth_token=zzz"));
        assert_eq!(StaffToken::from_headers(&headers).unwrap().as_str(), "abc");
    }

    #[test]
    fn token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; auth_token=xyz"));
        assert_eq!(StaffToken::from_headers(&headers).unwrap().as_str(), "xyz");
    }

    #[test]
    fn missing_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dTpw"));
        headers.insert(header::COOKIE, HeaderValue::from_static("auth_token="));
        assert!(StaffToken::from_headers(&headers).is_none());
    }

    #[test]
    fn debug_hides_token() {
        assert_eq!(format!("{:?}", StaffToken::new("secret")), "StaffToken(***)");
    }
}
