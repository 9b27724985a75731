//! Chapter management handlers
//!
//! Chapter numbering is maintained by the chapter service; these handlers
//! only authorize the caller and translate request shapes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use chapterhouse_common::{
    auth::AuthContext,
    chapters::ChapterService,
    db::models::Chapter,
    db::Repository,
    errors::{AppError, Result},
};

/// Request to create a new chapter
#[derive(Debug, Deserialize, Validate)]
pub struct CreateChapterRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    #[validate(length(min = 1))]
    pub content: String,
}

/// One entry of a reorder mapping
#[derive(Debug, Deserialize)]
pub struct ChapterPosition {
    pub chapter_id: Uuid,
    pub number: i32,
}

/// Request to reorder a story's chapters
///
/// Must list every chapter of the story exactly once with a target number
/// in 1..=N.
#[derive(Debug, Deserialize)]
pub struct ReorderChaptersRequest {
    pub order: Vec<ChapterPosition>,
}

#[derive(Serialize)]
pub struct ChapterResponse {
    pub id: Uuid,
    pub story_id: Uuid,
    pub title: String,
    pub content: String,
    pub chapter_number: i32,
    pub is_published: bool,
    pub views: i64,
    pub votes: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Chapter> for ChapterResponse {
    fn from(chapter: Chapter) -> Self {
        Self {
            id: chapter.id,
            story_id: chapter.story_id,
            title: chapter.title,
            content: chapter.content,
            chapter_number: chapter.chapter_number,
            is_published: chapter.is_published,
            views: chapter.views,
            votes: chapter.votes,
            created_at: chapter.created_at.to_rfc3339(),
            updated_at: chapter.updated_at.to_rfc3339(),
        }
    }
}

/// Chapter listing entry (no body content)
#[derive(Serialize)]
pub struct ChapterSummary {
    pub id: Uuid,
    pub title: String,
    pub chapter_number: i32,
    pub is_published: bool,
    pub views: i64,
    pub votes: i64,
}

impl From<Chapter> for ChapterSummary {
    fn from(chapter: Chapter) -> Self {
        Self {
            id: chapter.id,
            title: chapter.title,
            chapter_number: chapter.chapter_number,
            is_published: chapter.is_published,
            views: chapter.views,
            votes: chapter.votes,
        }
    }
}

/// Append a chapter to a story
pub async fn create_chapter(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(story_id): Path<Uuid>,
    Json(request): Json<CreateChapterRequest>,
) -> Result<(StatusCode, Json<ChapterResponse>)> {
    auth.require_user()?;

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());
    let story = repo
        .find_story_by_id(story_id)
        .await?
        .ok_or_else(|| AppError::StoryNotFound {
            id: story_id.to_string(),
        })?;
    auth.require_owner(story.user_id)?;

    let service = ChapterService::new(repo, state.locks.clone());
    let chapter = service
        .create_chapter(story_id, request.title, request.content)
        .await?;

    Ok((StatusCode::CREATED, Json(chapter.into())))
}

/// List a story's chapters in reading order
pub async fn list_chapters(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<Json<Vec<ChapterSummary>>> {
    let repo = Repository::new(state.db.clone());

    repo.find_story_by_id(story_id)
        .await?
        .ok_or_else(|| AppError::StoryNotFound {
            id: story_id.to_string(),
        })?;

    let chapters = repo.list_chapters_by_story(story_id).await?;

    Ok(Json(chapters.into_iter().map(Into::into).collect()))
}

/// Apply a full reordering of a story's chapters
pub async fn reorder_chapters(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(story_id): Path<Uuid>,
    Json(request): Json<ReorderChaptersRequest>,
) -> Result<StatusCode> {
    auth.require_user()?;

    let repo = Repository::new(state.db.clone());
    let story = repo
        .find_story_by_id(story_id)
        .await?
        .ok_or_else(|| AppError::StoryNotFound {
            id: story_id.to_string(),
        })?;
    auth.require_owner(story.user_id)?;

    let mapping: Vec<(Uuid, i32)> = request
        .order
        .iter()
        .map(|position| (position.chapter_id, position.number))
        .collect();

    let service = ChapterService::new(repo, state.locks.clone());
    service.reorder_chapters(story_id, &mapping).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Get a chapter by ID
pub async fn get_chapter(
    State(state): State<AppState>,
    Path(chapter_id): Path<Uuid>,
) -> Result<Json<ChapterResponse>> {
    let repo = Repository::new(state.db.clone());

    let chapter = repo
        .find_chapter_by_id(chapter_id)
        .await?
        .ok_or_else(|| AppError::ChapterNotFound {
            id: chapter_id.to_string(),
        })?;

    Ok(Json(chapter.into()))
}

/// Delete a chapter; the remaining chapters close ranks
pub async fn delete_chapter(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(chapter_id): Path<Uuid>,
) -> Result<StatusCode> {
    auth.require_user()?;

    let repo = Repository::new(state.db.clone());
    let chapter = repo
        .find_chapter_by_id(chapter_id)
        .await?
        .ok_or_else(|| AppError::ChapterNotFound {
            id: chapter_id.to_string(),
        })?;

    let story = repo
        .find_story_by_id(chapter.story_id)
        .await?
        .ok_or_else(|| AppError::StoryNotFound {
            id: chapter.story_id.to_string(),
        })?;
    auth.require_owner(story.user_id)?;

    let service = ChapterService::new(repo, state.locks.clone());
    service.delete_chapter(chapter_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
