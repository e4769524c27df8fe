use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::{
    error::AppResult,
    models::{Principal, TagUsage},
    AppState,
};

pub async fn list_tags(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<Json<Vec<TagUsage>>> {
    let tags = state.contacts_service().list_tags(&principal).await?;
    Ok(Json(tags))
}

#[derive(Debug, Serialize)]
pub struct PruneResponse {
    pub removed: u64,
}

pub async fn prune_unused_tags(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<Json<PruneResponse>> {
    let removed = state.contacts_service().prune_unused_tags(&principal).await?;
    Ok(Json(PruneResponse { removed }))
}
