//! Engagement counters and aggregation
//!
//! Write side: view events and vote toggles. Every view is recorded as its
//! own event row and every vote is a presence-toggled row; the denormalized
//! counters on the chapter are recomputed from those rows inside the same
//! transaction as the write, so a persisted total always equals the event
//! count.
//!
//! Read side: direct counts per chapter, summed counts per story, and
//! published-chapter partitions.

use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::metrics::METRICS_PREFIX;
use metrics::counter;
use serde::Serialize;
use uuid::Uuid;

/// Result of a vote toggle
#[derive(Debug, Clone, Serialize)]
pub struct VoteStatus {
    pub voted: bool,
    pub total_votes: i64,
}

/// Engagement totals for one chapter
#[derive(Debug, Clone, Serialize)]
pub struct ChapterEngagement {
    pub views: i64,
    pub votes: i64,
    pub has_voted: bool,
}

/// Engagement totals for a story
#[derive(Debug, Clone, Serialize)]
pub struct StoryEngagement {
    pub total_views: i64,
    pub total_votes: i64,
    pub published_chapters: u64,
    pub draft_chapters: u64,
    pub total_chapters: u64,
}

/// Service recording engagement events and serving derived totals
#[derive(Clone)]
pub struct EngagementService {
    repo: Repository,
}

impl EngagementService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Record one view event and return the chapter's new total.
    ///
    /// Views are unconditional: repeat reads by the same user all count.
    /// The viewer id is kept when authenticated; the IP always is.
    pub async fn record_view(
        &self,
        chapter_id: Uuid,
        viewer: Option<Uuid>,
        ip_address: &str,
    ) -> Result<i64> {
        self.repo
            .find_chapter_by_id(chapter_id)
            .await?
            .ok_or_else(|| AppError::ChapterNotFound {
                id: chapter_id.to_string(),
            })?;

        let txn = self.repo.begin().await?;
        self.repo
            .insert_view(&txn, chapter_id, viewer, ip_address)
            .await?;
        let total = self.repo.recompute_chapter_views(&txn, chapter_id).await?;
        txn.commit().await?;

        counter!(format!("{}_views_recorded_total", METRICS_PREFIX)).increment(1);
        tracing::debug!(
            chapter_id = %chapter_id,
            total_views = total,
            anonymous = viewer.is_none(),
            "View recorded"
        );

        Ok(total)
    }

    /// Toggle the (user, chapter) vote row and return the new state.
    ///
    /// Strict presence toggle: a row means "voted", no row means "not
    /// voted"; there is no up/down distinction.
    pub async fn toggle_vote(&self, chapter_id: Uuid, user: Option<Uuid>) -> Result<VoteStatus> {
        let user_id = user.ok_or_else(|| AppError::AuthenticationRequired {
            message: "Voting requires a signed-in user".to_string(),
        })?;

        self.repo
            .find_chapter_by_id(chapter_id)
            .await?
            .ok_or_else(|| AppError::ChapterNotFound {
                id: chapter_id.to_string(),
            })?;

        let txn = self.repo.begin().await?;

        let voted = match self.repo.find_vote(&txn, chapter_id, user_id).await? {
            Some(vote) => {
                self.repo.delete_vote(&txn, vote.id).await?;
                false
            }
            None => {
                self.repo.insert_vote(&txn, chapter_id, user_id).await?;
                true
            }
        };

        let total_votes = self.repo.recompute_chapter_votes(&txn, chapter_id).await?;
        txn.commit().await?;

        counter!(format!("{}_votes_toggled_total", METRICS_PREFIX)).increment(1);
        tracing::debug!(
            chapter_id = %chapter_id,
            user_id = %user_id,
            voted = voted,
            total_votes = total_votes,
            "Vote toggled"
        );

        Ok(VoteStatus { voted, total_votes })
    }

    /// Engagement totals for one chapter, with the caller's vote status
    pub async fn chapter_engagement(
        &self,
        chapter_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<ChapterEngagement> {
        self.repo
            .find_chapter_by_id(chapter_id)
            .await?
            .ok_or_else(|| AppError::ChapterNotFound {
                id: chapter_id.to_string(),
            })?;

        let views = self.repo.count_chapter_views(chapter_id).await?;
        let votes = self.repo.count_chapter_votes(chapter_id).await?;
        let has_voted = match viewer {
            Some(user_id) => self.repo.has_voted(chapter_id, user_id).await?,
            None => false,
        };

        Ok(ChapterEngagement {
            views,
            votes,
            has_voted,
        })
    }

    /// Engagement totals for a story: event counts over its chapter set
    /// plus published/draft chapter counts.
    pub async fn story_engagement(&self, story_id: Uuid) -> Result<StoryEngagement> {
        self.repo
            .find_story_by_id(story_id)
            .await?
            .ok_or_else(|| AppError::StoryNotFound {
                id: story_id.to_string(),
            })?;

        let total_views = self.repo.count_story_views(story_id).await?;
        let total_votes = self.repo.count_story_votes(story_id).await?;
        let (published_chapters, draft_chapters) = self.repo.chapter_counts(story_id).await?;

        Ok(StoryEngagement {
            total_views,
            total_votes,
            published_chapters,
            draft_chapters,
            total_chapters: published_chapters + draft_chapters,
        })
    }
}
