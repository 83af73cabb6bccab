use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, MessageResponse, PublicUser, RegisterRequest, TokenResponse, UpdateUserRequest},
        errors::AuthError,
        extractors::AuthUser,
    },
    state::AppState,
};

fn invalid_body(rejection: JsonRejection) -> AuthError {
    warn!(error = %rejection.body_text(), "request body rejected");
    AuthError::validation("Invalid request body")
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/user", put(update_user))
        .route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AuthError> {
    let Json(payload) = payload.map_err(invalid_body)?;
    state.auth.register(payload.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully")),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AuthError> {
    let Json(payload) = payload.map_err(invalid_body)?;
    let token = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state, headers, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AuthError> {
    let bearer = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            // credential errors take precedence over body errors
            state.auth.keys().verify_bearer(bearer)?;
            return Err(invalid_body(rejection));
        }
    };
    let (email, fields) = payload.into_parts();
    state.auth.update_profile(bearer, &email, fields).await?;
    Ok(Json(MessageResponse::new("User updated successfully")))
}

#[instrument(skip(state, claims))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    let user = state.auth.profile(&claims).await?;
    Ok(Json(user.into()))
}
