use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::api::response::ApiError;
use crate::AppState;

/// The caller's user id, as asserted by the upstream auth proxy in the
/// configured header. Sessions are not managed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let header = state.config.server.user_id_header.as_str();
        let user_id = parts
            .headers
            .get(header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        // The id becomes the first segment of every storage key
        if !is_valid_user_id(user_id) {
            return Err(ApiError::unauthorized("Invalid user identity"));
        }

        Ok(AuthUser(user_id.to_string()))
    }
}

fn is_valid_user_id(id: &str) -> bool {
    id != "."
        && id != ".."
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
}
