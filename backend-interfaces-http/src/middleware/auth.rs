use axum::http::HeaderMap;

use backend_application::auth::authenticate;
use backend_application::{AppState, Principal};

use crate::error::HttpError;

pub async fn require_principal(state: &AppState, headers: &HeaderMap) -> Result<Principal, HttpError> {
    let token = extract_bearer(headers);
    Ok(authenticate(state, token.as_deref()).await?)
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("Authorization")?.to_str().ok()?.trim();
    let prefix = "Bearer ";
    if !value.starts_with(prefix) {
        return None;
    }
    let token = value[prefix.len()..].trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
