use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{ContactInput, ContactWithTags, Principal},
    services::search::ListOptions,
    AppState,
};

pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(options): Query<ListOptions>,
) -> AppResult<Json<Vec<ContactWithTags>>> {
    let contacts = state
        .contacts_service()
        .list_contacts(&principal, options)
        .await?;

    Ok(Json(contacts))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

pub async fn recent_contacts(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<RecentQuery>,
) -> AppResult<Json<Vec<ContactWithTags>>> {
    let contacts = state
        .contacts_service()
        .recent_contacts(&principal, query.limit)
        .await?;

    Ok(Json(contacts))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search_contacts(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<ContactWithTags>>> {
    let contacts = state
        .contacts_service()
        .search_contacts(&principal, &query.q)
        .await?;

    Ok(Json(contacts))
}

pub async fn create_contact(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<ContactInput>,
) -> AppResult<(StatusCode, Json<ContactWithTags>)> {
    let contact = state
        .contacts_service()
        .create_contact(&principal, req)
        .await?;

    Ok((StatusCode::CREATED, Json(contact)))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(contact_id): Path<Uuid>,
) -> AppResult<Json<ContactWithTags>> {
    let contact = state
        .contacts_service()
        .get_contact(&principal, contact_id)
        .await?;

    Ok(Json(contact))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(contact_id): Path<Uuid>,
    Json(req): Json<ContactInput>,
) -> AppResult<Json<ContactWithTags>> {
    let contact = state
        .contacts_service()
        .update_contact(&principal, contact_id, req)
        .await?;

    Ok(Json(contact))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(contact_id): Path<Uuid>,
) -> AppResult<Json<ContactWithTags>> {
    let contact = state
        .contacts_service()
        .toggle_favorite(&principal, contact_id)
        .await?;

    Ok(Json(contact))
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(contact_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state
        .contacts_service()
        .delete_contact(&principal, contact_id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Contact deleted".to_string(),
    }))
}
