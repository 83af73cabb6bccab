use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::{claims::Claims, errors::AuthError};
use crate::state::AppState;

/// Verified claims of the request's bearer token.
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let claims = state.auth.keys().verify_bearer(header)?;
        Ok(AuthUser(claims))
    }
}
