//! Story lifecycle
//!
//! Parent-entity operations: create, fetch, list, settings updates, and the
//! cascade delete that removes a story together with its chapters, their
//! engagement events, and any reading progress pointing at it.

use crate::chapters::LockRegistry;
use crate::db::models::{join_categories, Story, StoryStatus};
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::metrics::METRICS_PREFIX;
use metrics::counter;
use std::sync::Arc;
use uuid::Uuid;

/// Service owning the story lifecycle
#[derive(Clone)]
pub struct StoryService {
    repo: Repository,
    locks: Arc<LockRegistry>,
}

impl StoryService {
    pub fn new(repo: Repository, locks: Arc<LockRegistry>) -> Self {
        Self { repo, locks }
    }

    /// Create a story owned by `user_id`, starting as an unpublished draft
    pub async fn create_story(
        &self,
        user_id: Uuid,
        title: String,
        description: String,
        categories: Vec<String>,
        thumbnail: Option<String>,
    ) -> Result<Story> {
        let story = self
            .repo
            .create_story(
                user_id,
                title,
                description,
                join_categories(&categories),
                thumbnail,
            )
            .await?;

        counter!(format!("{}_stories_created_total", METRICS_PREFIX)).increment(1);
        tracing::info!(story_id = %story.id, user_id = %user_id, "Story created");

        Ok(story)
    }

    /// Fetch a story
    pub async fn get_story(&self, id: Uuid) -> Result<Story> {
        self.repo
            .find_story_by_id(id)
            .await?
            .ok_or_else(|| AppError::StoryNotFound { id: id.to_string() })
    }

    /// List a user's stories, newest first
    pub async fn list_stories(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Story>, u64)> {
        self.repo.list_stories_by_owner(user_id, offset, limit).await
    }

    /// Update a story's status and/or publish flag
    pub async fn update_settings(
        &self,
        id: Uuid,
        status: Option<StoryStatus>,
        is_published: Option<bool>,
    ) -> Result<Story> {
        let story = self
            .repo
            .update_story_settings(id, status, is_published)
            .await?;

        tracing::info!(
            story_id = %id,
            status = %story.status,
            is_published = story.is_published,
            "Story settings updated"
        );

        Ok(story)
    }

    /// Delete a story and everything that hangs off it.
    ///
    /// Takes the story's ordering lock so no chapter mutation is in flight
    /// while the cascade runs, then retires the lock entry.
    pub async fn delete_story(&self, id: Uuid) -> Result<()> {
        let lock = self.locks.for_story(id);
        let _guard = lock.lock().await;

        let deleted = self.repo.delete_story_cascade(id).await?;
        if !deleted {
            return Err(AppError::StoryNotFound { id: id.to_string() });
        }

        drop(_guard);
        self.locks.retire(id);

        counter!(format!("{}_stories_deleted_total", METRICS_PREFIX)).increment(1);
        tracing::info!(story_id = %id, "Story deleted with chapter cascade");

        Ok(())
    }
}
