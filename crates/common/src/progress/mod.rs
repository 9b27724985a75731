//! Reading progress tracking
//!
//! One pointer per (user, story): the chapter the user last opened. The
//! pointer is upserted on read events; absence is the valid "never read"
//! state, not an error.

use crate::db::Repository;
use crate::errors::{AppError, Result};
use uuid::Uuid;

/// Service maintaining per-user continue-reading pointers
#[derive(Clone)]
pub struct ProgressService {
    repo: Repository,
}

impl ProgressService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Record that the user last opened `chapter_id` of `story_id`.
    ///
    /// The session layer should never route an anonymous request here, but
    /// a missing user is still rejected defensively.
    pub async fn update_progress(
        &self,
        user: Option<Uuid>,
        story_id: Uuid,
        chapter_id: Uuid,
    ) -> Result<()> {
        let user_id = user.ok_or_else(|| AppError::AuthenticationRequired {
            message: "Reading progress requires a signed-in user".to_string(),
        })?;

        self.repo
            .find_story_by_id(story_id)
            .await?
            .ok_or_else(|| AppError::StoryNotFound {
                id: story_id.to_string(),
            })?;

        let chapter = self
            .repo
            .find_chapter_by_id(chapter_id)
            .await?
            .ok_or_else(|| AppError::ChapterNotFound {
                id: chapter_id.to_string(),
            })?;

        if chapter.story_id != story_id {
            return Err(AppError::validation(format!(
                "Chapter {} does not belong to story {}",
                chapter_id, story_id
            )));
        }

        self.repo.upsert_progress(user_id, story_id, chapter_id).await?;

        tracing::debug!(
            user_id = %user_id,
            story_id = %story_id,
            chapter_id = %chapter_id,
            "Reading progress updated"
        );

        Ok(())
    }

    /// The chapter to continue from, or None if the user never read the story
    pub async fn continue_chapter(
        &self,
        user: Option<Uuid>,
        story_id: Uuid,
    ) -> Result<Option<Uuid>> {
        let user_id = user.ok_or_else(|| AppError::AuthenticationRequired {
            message: "Reading progress requires a signed-in user".to_string(),
        })?;

        Ok(self
            .repo
            .find_progress(user_id, story_id)
            .await?
            .map(|progress| progress.chapter_id))
    }
}
