//! Reading progress handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use chapterhouse_common::{
    auth::AuthContext,
    db::Repository,
    errors::Result,
    progress::ProgressService,
};

/// Request to update the caller's reading progress in a story
#[derive(Debug, Deserialize)]
pub struct UpdateProgressRequest {
    pub chapter_id: Uuid,
}

/// Continue-reading pointer; `chapter_id` is null when the caller has
/// never read the story
#[derive(Serialize)]
pub struct ContinueResponse {
    pub chapter_id: Option<Uuid>,
}

/// Remember the chapter the caller last opened
pub async fn update_progress(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(story_id): Path<Uuid>,
    Json(request): Json<UpdateProgressRequest>,
) -> Result<StatusCode> {
    let service = ProgressService::new(Repository::new(state.db.clone()));
    service
        .update_progress(auth.user_id, story_id, request.chapter_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Where the caller left off in a story
pub async fn continue_chapter(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(story_id): Path<Uuid>,
) -> Result<Json<ContinueResponse>> {
    let service = ProgressService::new(Repository::new(state.db.clone()));
    let chapter_id = service.continue_chapter(auth.user_id, story_id).await?;

    Ok(Json(ContinueResponse { chapter_id }))
}
