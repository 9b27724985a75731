//! Story management handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use chapterhouse_common::{
    db::models::{Story, StoryStatus},
    db::Repository,
    auth::AuthContext,
    engagement::{EngagementService, StoryEngagement},
    errors::{AppError, Result},
    stories::StoryService,
};

/// Request to create a new story
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStoryRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,

    #[validate(length(max = 10000))]
    #[serde(default)]
    pub description: String,

    /// Free-text categories, stored comma-joined
    #[serde(default)]
    pub categories: Vec<String>,

    pub thumbnail: Option<String>,
}

/// Request to update story settings
#[derive(Debug, Deserialize)]
pub struct UpdateStoryRequest {
    pub status: Option<String>,
    pub is_published: Option<bool>,
}

/// Pagination parameters for story listing
#[derive(Debug, Deserialize)]
pub struct ListStoriesParams {
    #[serde(default)]
    pub offset: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    20
}

#[derive(Serialize)]
pub struct StoryResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub categories: Vec<String>,
    pub thumbnail: Option<String>,
    pub is_published: bool,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Story> for StoryResponse {
    fn from(story: Story) -> Self {
        let categories = story.categories();
        Self {
            id: story.id,
            user_id: story.user_id,
            title: story.title,
            description: story.description,
            categories,
            thumbnail: story.thumbnail,
            is_published: story.is_published,
            status: story.status,
            created_at: story.created_at.to_rfc3339(),
            updated_at: story.updated_at.to_rfc3339(),
        }
    }
}

/// Story plus its engagement summary
#[derive(Serialize)]
pub struct StoryDetailResponse {
    #[serde(flatten)]
    pub story: StoryResponse,
    pub engagement: StoryEngagement,
}

#[derive(Serialize)]
pub struct ListStoriesResponse {
    pub stories: Vec<StoryResponse>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Create a new story owned by the caller
pub async fn create_story(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateStoryRequest>,
) -> Result<(StatusCode, Json<StoryResponse>)> {
    let user_id = auth.require_user()?;

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let service = StoryService::new(Repository::new(state.db.clone()), state.locks.clone());
    let story = service
        .create_story(
            user_id,
            request.title,
            request.description,
            request.categories,
            request.thumbnail,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(story.into())))
}

/// Get a story with its engagement summary
pub async fn get_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<Json<StoryDetailResponse>> {
    let repo = Repository::new(state.db.clone());

    let story = StoryService::new(repo.clone(), state.locks.clone())
        .get_story(story_id)
        .await?;
    let engagement = EngagementService::new(repo)
        .story_engagement(story_id)
        .await?;

    Ok(Json(StoryDetailResponse {
        story: story.into(),
        engagement,
    }))
}

/// List the caller's stories, newest first
pub async fn list_stories(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ListStoriesParams>,
) -> Result<Json<ListStoriesResponse>> {
    let user_id = auth.require_user()?;
    let limit = params.limit.clamp(1, 100);

    let service = StoryService::new(Repository::new(state.db.clone()), state.locks.clone());
    let (stories, total) = service.list_stories(user_id, params.offset, limit).await?;

    Ok(Json(ListStoriesResponse {
        stories: stories.into_iter().map(Into::into).collect(),
        total,
        offset: params.offset,
        limit,
    }))
}

/// Update a story's status and/or publish flag
pub async fn update_story(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(story_id): Path<Uuid>,
    Json(request): Json<UpdateStoryRequest>,
) -> Result<Json<StoryResponse>> {
    let repo = Repository::new(state.db.clone());
    let service = StoryService::new(repo, state.locks.clone());

    let story = service.get_story(story_id).await?;
    auth.require_owner(story.user_id)?;

    let status = request
        .status
        .map(|s| {
            StoryStatus::parse(&s).ok_or_else(|| {
                AppError::validation(format!("Unknown story status '{}'", s))
            })
        })
        .transpose()?;

    let updated = service
        .update_settings(story_id, status, request.is_published)
        .await?;

    Ok(Json(updated.into()))
}

/// Delete a story and all of its chapters
pub async fn delete_story(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(story_id): Path<Uuid>,
) -> Result<StatusCode> {
    let service = StoryService::new(Repository::new(state.db.clone()), state.locks.clone());

    let story = service.get_story(story_id).await?;
    auth.require_owner(story.user_id)?;

    service.delete_story(story_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
