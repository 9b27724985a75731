//! Chapter ordinal maintenance
//!
//! Chapters of a story carry a dense, 1-based `chapter_number`: the sibling
//! set is exactly {1..N} between completed operations. This module owns the
//! operations that touch that ordering (insert, reorder, delete) and guards
//! each with the story's lock plus a store transaction.

mod locks;

pub use locks::LockRegistry;

use crate::db::models::Chapter;
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::metrics::METRICS_PREFIX;
use backoff::ExponentialBackoff;
use metrics::counter;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// How long the delete+renumber transaction keeps retrying transient
/// store failures before the operation is declared unrepaired.
const REPAIR_RETRY_WINDOW: Duration = Duration::from_secs(5);

/// Service maintaining the dense chapter ordering of every story
#[derive(Clone)]
pub struct ChapterService {
    repo: Repository,
    locks: Arc<LockRegistry>,
}

impl ChapterService {
    pub fn new(repo: Repository, locks: Arc<LockRegistry>) -> Self {
        Self { repo, locks }
    }

    /// Insert a new chapter at the end of a story.
    ///
    /// The new chapter takes max sibling number + 1 (1 for an empty story).
    /// The story lock serializes concurrent inserts so two requests cannot
    /// both read the same max.
    pub async fn create_chapter(
        &self,
        story_id: Uuid,
        title: String,
        content: String,
    ) -> Result<Chapter> {
        let lock = self.locks.for_story(story_id);
        let _guard = lock.lock().await;

        let story = self
            .repo
            .find_story_by_id(story_id)
            .await?
            .ok_or_else(|| AppError::StoryNotFound {
                id: story_id.to_string(),
            })?;

        if !story.accepts_new_chapters() {
            return Err(AppError::Conflict {
                message: format!(
                    "Story in status '{}' does not accept new chapters",
                    story.status
                ),
            });
        }

        let txn = self.repo.begin().await?;
        let next = self.repo.max_chapter_number(&txn, story_id).await? + 1;
        let chapter = self
            .repo
            .insert_chapter(&txn, story_id, title, content, next)
            .await?;
        txn.commit().await?;

        counter!(format!("{}_chapters_created_total", METRICS_PREFIX)).increment(1);
        tracing::info!(
            story_id = %story_id,
            chapter_id = %chapter.id,
            chapter_number = chapter.chapter_number,
            "Chapter created"
        );

        Ok(chapter)
    }

    /// Apply a caller-supplied total ordering to a story's chapters.
    ///
    /// The mapping must be a bijection onto {1..N} over exactly the story's
    /// chapter set; anything else is rejected before a single row moves.
    pub async fn reorder_chapters(
        &self,
        story_id: Uuid,
        mapping: &[(Uuid, i32)],
    ) -> Result<()> {
        let lock = self.locks.for_story(story_id);
        let _guard = lock.lock().await;

        self.repo
            .find_story_by_id(story_id)
            .await?
            .ok_or_else(|| AppError::StoryNotFound {
                id: story_id.to_string(),
            })?;

        let chapters = self.repo.list_chapters_by_story(story_id).await?;
        let existing: Vec<(Uuid, i32)> = chapters
            .iter()
            .map(|c| (c.id, c.chapter_number))
            .collect();

        validate_reorder(&existing, mapping)?;

        let txn = self.repo.begin().await?;
        self.repo
            .apply_chapter_numbers(&txn, story_id, mapping)
            .await?;
        txn.commit().await?;

        counter!(format!("{}_chapters_reordered_total", METRICS_PREFIX)).increment(1);
        tracing::info!(
            story_id = %story_id,
            chapters = mapping.len(),
            "Chapters reordered"
        );

        Ok(())
    }

    /// Delete a chapter and close the gap it leaves.
    ///
    /// Delete and renumber run as one transaction, retried as a unit on
    /// transient store failures. If the transaction cannot be confirmed
    /// within the retry window the failure is surfaced as fatal: the
    /// story's ordering must be verified by an operator.
    pub async fn delete_chapter(&self, chapter_id: Uuid) -> Result<()> {
        let chapter = self
            .repo
            .find_chapter_by_id(chapter_id)
            .await?
            .ok_or_else(|| AppError::ChapterNotFound {
                id: chapter_id.to_string(),
            })?;
        let story_id = chapter.story_id;

        let lock = self.locks.for_story(story_id);
        let _guard = lock.lock().await;

        let policy = ExponentialBackoff {
            max_elapsed_time: Some(REPAIR_RETRY_WINDOW),
            ..ExponentialBackoff::default()
        };

        let outcome = backoff::future::retry(policy, || async {
            self.delete_and_renumber_once(chapter_id, story_id)
                .await
                .map_err(|err| match err {
                    AppError::Database(_) | AppError::DatabaseConnection { .. } => {
                        tracing::warn!(
                            story_id = %story_id,
                            chapter_id = %chapter_id,
                            error = %err,
                            "Delete+renumber attempt failed, retrying"
                        );
                        backoff::Error::transient(err)
                    }
                    other => backoff::Error::permanent(other),
                })
        })
        .await;

        match outcome {
            Ok(moved) => {
                counter!(format!("{}_chapters_deleted_total", METRICS_PREFIX)).increment(1);
                tracing::info!(
                    story_id = %story_id,
                    chapter_id = %chapter_id,
                    shifted = moved,
                    "Chapter deleted"
                );
                Ok(())
            }
            Err(err) => {
                counter!(format!("{}_ordinal_repair_failures_total", METRICS_PREFIX))
                    .increment(1);
                Err(AppError::OrdinalRepair {
                    story_id: story_id.to_string(),
                    message: format!(
                        "delete of chapter {} could not be confirmed: {}",
                        chapter_id, err
                    ),
                })
            }
        }
    }

    /// One delete+renumber attempt, idempotent under retry.
    ///
    /// The chapter is re-read inside the transaction: if a prior attempt
    /// committed but its result was not observed, the row is already gone
    /// and the survivors must not shift a second time.
    async fn delete_and_renumber_once(&self, chapter_id: Uuid, story_id: Uuid) -> Result<u64> {
        let txn = self.repo.begin().await?;

        if self.repo.find_chapter_on(&txn, chapter_id).await?.is_none() {
            txn.rollback().await?;
            return Ok(0);
        }

        self.repo.delete_chapter_row(&txn, chapter_id).await?;

        let remaining = self.repo.list_chapters_on(&txn, story_id).await?;
        let ordered: Vec<(Uuid, i32)> = remaining
            .iter()
            .map(|c| (c.id, c.chapter_number))
            .collect();
        let plan = renumber_plan(&ordered);

        let moved = plan.len() as u64;
        if !plan.is_empty() {
            self.repo
                .apply_chapter_numbers(&txn, story_id, &plan)
                .await?;
        }

        txn.commit().await?;
        Ok(moved)
    }
}

/// Check that `mapping` is a bijection onto {1..N} over exactly the ids in
/// `existing`. Returns a `Validation` error naming the first violation.
pub fn validate_reorder(existing: &[(Uuid, i32)], mapping: &[(Uuid, i32)]) -> Result<()> {
    let n = existing.len();

    if mapping.len() != n {
        return Err(AppError::validation(format!(
            "Reorder mapping must cover every chapter exactly once: expected {} entries, got {}",
            n,
            mapping.len()
        )));
    }

    let known: HashSet<Uuid> = existing.iter().map(|(id, _)| *id).collect();
    let mut seen_ids = HashSet::with_capacity(n);
    let mut seen_numbers = vec![false; n];

    for (chapter_id, number) in mapping {
        if !known.contains(chapter_id) {
            return Err(AppError::validation(format!(
                "Chapter {} does not belong to this story",
                chapter_id
            )));
        }
        if !seen_ids.insert(*chapter_id) {
            return Err(AppError::validation(format!(
                "Chapter {} appears more than once in the mapping",
                chapter_id
            )));
        }
        if *number < 1 || *number as usize > n {
            return Err(AppError::validation(format!(
                "Chapter number {} is outside 1..={}",
                number, n
            )));
        }
        let slot = (*number - 1) as usize;
        if seen_numbers[slot] {
            return Err(AppError::validation(format!(
                "Chapter number {} is assigned more than once",
                number
            )));
        }
        seen_numbers[slot] = true;
    }

    Ok(())
}

/// Compute the assignments that restore a dense 1..N numbering.
///
/// Input is the surviving chapters as (id, current number) in ascending
/// number order; output contains only the chapters whose number changes.
pub fn renumber_plan(ordered: &[(Uuid, i32)]) -> Vec<(Uuid, i32)> {
    ordered
        .iter()
        .enumerate()
        .filter_map(|(index, (id, number))| {
            let target = index as i32 + 1;
            (*number != target).then_some((*id, target))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapters(numbers: &[i32]) -> Vec<(Uuid, i32)> {
        numbers.iter().map(|n| (Uuid::new_v4(), *n)).collect()
    }

    #[test]
    fn test_validate_reorder_accepts_swap() {
        let existing = chapters(&[1, 2, 3, 4]);
        // Swap positions 1 and 4, keep the middle
        let mapping = vec![
            (existing[0].0, 4),
            (existing[1].0, 2),
            (existing[2].0, 3),
            (existing[3].0, 1),
        ];
        assert!(validate_reorder(&existing, &mapping).is_ok());
    }

    #[test]
    fn test_validate_reorder_rejects_duplicate_number() {
        let existing = chapters(&[1, 2, 3]);
        let mapping = vec![
            (existing[0].0, 2),
            (existing[1].0, 2),
            (existing[2].0, 3),
        ];
        let err = validate_reorder(&existing, &mapping).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_validate_reorder_rejects_duplicate_chapter() {
        let existing = chapters(&[1, 2]);
        let mapping = vec![(existing[0].0, 1), (existing[0].0, 2)];
        assert!(validate_reorder(&existing, &mapping).is_err());
    }

    #[test]
    fn test_validate_reorder_rejects_foreign_chapter() {
        let existing = chapters(&[1, 2]);
        let mapping = vec![(existing[0].0, 1), (Uuid::new_v4(), 2)];
        assert!(validate_reorder(&existing, &mapping).is_err());
    }

    #[test]
    fn test_validate_reorder_rejects_out_of_range() {
        let existing = chapters(&[1, 2]);
        let low = vec![(existing[0].0, 0), (existing[1].0, 2)];
        assert!(validate_reorder(&existing, &low).is_err());

        let high = vec![(existing[0].0, 1), (existing[1].0, 3)];
        assert!(validate_reorder(&existing, &high).is_err());
    }

    #[test]
    fn test_validate_reorder_rejects_wrong_length() {
        let existing = chapters(&[1, 2, 3]);
        let mapping = vec![(existing[0].0, 1), (existing[1].0, 2)];
        assert!(validate_reorder(&existing, &mapping).is_err());
    }

    #[test]
    fn test_validate_reorder_empty_story() {
        assert!(validate_reorder(&[], &[]).is_ok());
    }

    #[test]
    fn test_renumber_plan_closes_gap() {
        // Chapter 3 of 5 was deleted: {1,2,4,5} must become {1,2,3,4}
        let survivors = chapters(&[1, 2, 4, 5]);
        let plan = renumber_plan(&survivors);

        assert_eq!(plan, vec![(survivors[2].0, 3), (survivors[3].0, 4)]);
    }

    #[test]
    fn test_renumber_plan_highest_deleted_is_noop() {
        // Deleting the highest-numbered chapter leaves {1..N-1} dense
        let survivors = chapters(&[1, 2, 3]);
        assert!(renumber_plan(&survivors).is_empty());
    }

    #[test]
    fn test_renumber_plan_last_chapter_deleted() {
        assert!(renumber_plan(&[]).is_empty());
    }

    #[test]
    fn test_renumber_plan_repairs_arbitrary_gaps() {
        let survivors = chapters(&[2, 5, 9]);
        let plan = renumber_plan(&survivors);

        assert_eq!(
            plan,
            vec![
                (survivors[0].0, 1),
                (survivors[1].0, 2),
                (survivors[2].0, 3),
            ]
        );
    }
}
