use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    models::{Principal, TokenPair, User},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let (user, tokens) = state
        .auth_service()
        .sign_up(&req.email, &req.password)
        .await?;

    Ok((StatusCode::CREATED, Json(AuthResponse { user, tokens })))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (user, tokens) = state
        .auth_service()
        .sign_in(&req.email, &req.password)
        .await?;

    Ok(Json(AuthResponse { user, tokens }))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub tokens: TokenPair,
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let tokens = state.auth_service().refresh(&req.refresh_token).await?;

    Ok(Json(TokenResponse { tokens }))
}

pub async fn sign_out(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<Json<MessageResponse>> {
    state.auth_service().sign_out(&principal).await?;

    Ok(Json(MessageResponse {
        message: "Signed out successfully".to_string(),
    }))
}

pub async fn sign_out_all(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<Json<MessageResponse>> {
    let removed = state.auth_service().sign_out_all(&principal).await?;

    Ok(Json(MessageResponse {
        message: format!("Signed out of {} session(s)", removed),
    }))
}

pub async fn current_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<Json<User>> {
    let user = state.auth_service().current_user(&principal).await?;
    Ok(Json(user))
}
