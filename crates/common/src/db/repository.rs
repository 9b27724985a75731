//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations.
//! Primitives that participate in multi-step operations are generic over
//! [`ConnectionTrait`] so the services can compose them into transactions;
//! the sibling set of a story is the unit of consistency, never a single
//! chapter row.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, Statement,
    TransactionTrait,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Begin a transaction on the write connection
    pub async fn begin(&self) -> Result<DatabaseTransaction> {
        self.write_conn().begin().await.map_err(Into::into)
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Story Operations
    // ========================================================================

    /// Create a new story
    pub async fn create_story(
        &self,
        user_id: Uuid,
        title: String,
        description: String,
        category: String,
        thumbnail: Option<String>,
    ) -> Result<Story> {
        let now = chrono::Utc::now();

        let story = StoryActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            title: Set(title),
            description: Set(description),
            category: Set(category),
            thumbnail: Set(thumbnail),
            is_published: Set(false),
            status: Set(String::from(StoryStatus::Draft)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        story.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find story by ID
    pub async fn find_story_by_id(&self, id: Uuid) -> Result<Option<Story>> {
        StoryEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List stories owned by a user, newest first, with pagination
    pub async fn list_stories_by_owner(
        &self,
        user_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Story>, u64)> {
        let paginator = StoryEntity::find()
            .filter(StoryColumn::UserId.eq(user_id))
            .order_by_desc(StoryColumn::CreatedAt)
            .paginate(self.read_conn(), limit);

        let total = paginator.num_items().await?;
        let stories = paginator.fetch_page(offset / limit).await?;

        Ok((stories, total))
    }

    /// Update a story's status and/or publish flag
    pub async fn update_story_settings(
        &self,
        id: Uuid,
        status: Option<StoryStatus>,
        is_published: Option<bool>,
    ) -> Result<Story> {
        let mut story: StoryActiveModel = StoryEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::StoryNotFound { id: id.to_string() })?
            .into();

        if let Some(status) = status {
            story.status = Set(String::from(status));
        }
        if let Some(published) = is_published {
            story.is_published = Set(published);
        }
        story.updated_at = Set(chrono::Utc::now().into());

        story.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a story and everything that hangs off it, in one transaction:
    /// view events, votes, reading progress, chapters, then the story row.
    pub async fn delete_story_cascade(&self, id: Uuid) -> Result<bool> {
        let txn = self.begin().await?;

        let cascade = [
            "DELETE FROM chapter_views WHERE chapter_id IN (SELECT id FROM chapters WHERE story_id = $1)",
            "DELETE FROM chapter_votes WHERE chapter_id IN (SELECT id FROM chapters WHERE story_id = $1)",
            "DELETE FROM reading_progress WHERE story_id = $1",
            "DELETE FROM chapters WHERE story_id = $1",
        ];

        for sql in cascade {
            let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, vec![id.into()]);
            txn.execute(stmt).await?;
        }

        let result = StoryEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Chapter Operations
    // ========================================================================

    /// Find chapter by ID
    pub async fn find_chapter_by_id(&self, id: Uuid) -> Result<Option<Chapter>> {
        ChapterEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find chapter by ID on a specific connection (for use inside transactions)
    pub async fn find_chapter_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
    ) -> Result<Option<Chapter>> {
        ChapterEntity::find_by_id(id)
            .one(conn)
            .await
            .map_err(Into::into)
    }

    /// Get the chapters of a story ordered by chapter number
    pub async fn list_chapters_by_story(&self, story_id: Uuid) -> Result<Vec<Chapter>> {
        ChapterEntity::find()
            .filter(ChapterColumn::StoryId.eq(story_id))
            .order_by_asc(ChapterColumn::ChapterNumber)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Get the chapters of a story on a specific connection, ordered
    pub async fn list_chapters_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        story_id: Uuid,
    ) -> Result<Vec<Chapter>> {
        ChapterEntity::find()
            .filter(ChapterColumn::StoryId.eq(story_id))
            .order_by_asc(ChapterColumn::ChapterNumber)
            .all(conn)
            .await
            .map_err(Into::into)
    }

    /// Highest chapter number in a story, 0 when the story has no chapters
    pub async fn max_chapter_number<C: ConnectionTrait>(
        &self,
        conn: &C,
        story_id: Uuid,
    ) -> Result<i32> {
        let top = ChapterEntity::find()
            .filter(ChapterColumn::StoryId.eq(story_id))
            .order_by_desc(ChapterColumn::ChapterNumber)
            .one(conn)
            .await?;

        Ok(top.map(|c| c.chapter_number).unwrap_or(0))
    }

    /// Insert a chapter at the given number
    pub async fn insert_chapter<C: ConnectionTrait>(
        &self,
        conn: &C,
        story_id: Uuid,
        title: String,
        content: String,
        number: i32,
    ) -> Result<Chapter> {
        let now = chrono::Utc::now();

        let chapter = ChapterActiveModel {
            id: Set(Uuid::new_v4()),
            story_id: Set(story_id),
            title: Set(title),
            content: Set(content),
            chapter_number: Set(number),
            is_published: Set(false),
            views: Set(0),
            votes: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        chapter.insert(conn).await.map_err(Into::into)
    }

    /// Delete a chapter row, returning whether it existed
    pub async fn delete_chapter_row<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
    ) -> Result<bool> {
        let result = ChapterEntity::delete_by_id(id).exec(conn).await?;
        Ok(result.rows_affected > 0)
    }

    /// Apply a validated number assignment to a story's chapters.
    ///
    /// Two-phase: every row is parked at the negated target first, then the
    /// signs flip in bulk, so a per-story unique index never observes a
    /// transient duplicate while the permutation moves.
    pub async fn apply_chapter_numbers<C: ConnectionTrait>(
        &self,
        conn: &C,
        story_id: Uuid,
        mapping: &[(Uuid, i32)],
    ) -> Result<()> {
        for (chapter_id, number) in mapping {
            let stmt = Statement::from_sql_and_values(
                DbBackend::Postgres,
                "UPDATE chapters SET chapter_number = $1 WHERE id = $2 AND story_id = $3",
                vec![(-*number).into(), (*chapter_id).into(), story_id.into()],
            );
            conn.execute(stmt).await?;
        }

        let flip = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE chapters SET chapter_number = -chapter_number, updated_at = $1 \
             WHERE story_id = $2 AND chapter_number < 0",
            vec![chrono::Utc::now().into(), story_id.into()],
        );
        conn.execute(flip).await?;

        Ok(())
    }

    /// Count a story's chapters partitioned by control flag: (published, draft)
    pub async fn chapter_counts(&self, story_id: Uuid) -> Result<(u64, u64)> {
        let published = ChapterEntity::find()
            .filter(ChapterColumn::StoryId.eq(story_id))
            .filter(ChapterColumn::IsPublished.eq(true))
            .count(self.read_conn())
            .await?;

        let draft = ChapterEntity::find()
            .filter(ChapterColumn::StoryId.eq(story_id))
            .filter(ChapterColumn::IsPublished.eq(false))
            .count(self.read_conn())
            .await?;

        Ok((published, draft))
    }

    // ========================================================================
    // View Events
    // ========================================================================

    /// Append a view event. Events are never updated or deleted individually.
    pub async fn insert_view<C: ConnectionTrait>(
        &self,
        conn: &C,
        chapter_id: Uuid,
        user_id: Option<Uuid>,
        ip_address: &str,
    ) -> Result<ChapterView> {
        let view = ChapterViewActiveModel {
            id: Set(Uuid::new_v4()),
            chapter_id: Set(chapter_id),
            user_id: Set(user_id),
            ip_address: Set(ip_address.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        view.insert(conn).await.map_err(Into::into)
    }

    /// Recompute a chapter's denormalized view counter from the event log
    /// and return the new total. The total always equals the event count.
    pub async fn recompute_chapter_views<C: ConnectionTrait>(
        &self,
        conn: &C,
        chapter_id: Uuid,
    ) -> Result<i64> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE chapters \
             SET views = (SELECT COUNT(*) FROM chapter_views WHERE chapter_id = $1) \
             WHERE id = $1 \
             RETURNING views",
            vec![chapter_id.into()],
        );

        let row = conn
            .query_one(stmt)
            .await?
            .ok_or_else(|| AppError::ChapterNotFound {
                id: chapter_id.to_string(),
            })?;

        row.try_get_by_index::<i64>(0)
            .map_err(|e| AppError::Database(e.into()))
    }

    /// View events recorded for a chapter
    pub async fn count_chapter_views(&self, chapter_id: Uuid) -> Result<i64> {
        let count = ChapterViewEntity::find()
            .filter(ChapterViewColumn::ChapterId.eq(chapter_id))
            .count(self.read_conn())
            .await?;

        Ok(count as i64)
    }

    /// Total view events across all chapters of a story
    pub async fn count_story_views(&self, story_id: Uuid) -> Result<i64> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT COUNT(*) FROM chapter_views v \
             JOIN chapters c ON v.chapter_id = c.id \
             WHERE c.story_id = $1",
            vec![story_id.into()],
        );

        let row = self.read_conn().query_one(stmt).await?;
        match row {
            Some(row) => row
                .try_get_by_index::<i64>(0)
                .map_err(|e| AppError::Database(e.into())),
            None => Ok(0),
        }
    }

    // ========================================================================
    // Vote Operations
    // ========================================================================

    /// Find the vote row for a (user, chapter) pair
    pub async fn find_vote<C: ConnectionTrait>(
        &self,
        conn: &C,
        chapter_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ChapterVote>> {
        ChapterVoteEntity::find()
            .filter(ChapterVoteColumn::ChapterId.eq(chapter_id))
            .filter(ChapterVoteColumn::UserId.eq(user_id))
            .one(conn)
            .await
            .map_err(Into::into)
    }

    /// Whether a user has voted for a chapter
    pub async fn has_voted(&self, chapter_id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(self
            .find_vote(self.read_conn(), chapter_id, user_id)
            .await?
            .is_some())
    }

    /// Insert a vote row for a (user, chapter) pair
    pub async fn insert_vote<C: ConnectionTrait>(
        &self,
        conn: &C,
        chapter_id: Uuid,
        user_id: Uuid,
    ) -> Result<ChapterVote> {
        let vote = ChapterVoteActiveModel {
            id: Set(Uuid::new_v4()),
            chapter_id: Set(chapter_id),
            user_id: Set(user_id),
            created_at: Set(chrono::Utc::now().into()),
        };

        vote.insert(conn).await.map_err(Into::into)
    }

    /// Delete a vote row
    pub async fn delete_vote<C: ConnectionTrait>(&self, conn: &C, id: Uuid) -> Result<()> {
        ChapterVoteEntity::delete_by_id(id).exec(conn).await?;
        Ok(())
    }

    /// Recompute a chapter's denormalized vote counter from the vote rows
    /// and return the new total.
    pub async fn recompute_chapter_votes<C: ConnectionTrait>(
        &self,
        conn: &C,
        chapter_id: Uuid,
    ) -> Result<i64> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE chapters \
             SET votes = (SELECT COUNT(*) FROM chapter_votes WHERE chapter_id = $1) \
             WHERE id = $1 \
             RETURNING votes",
            vec![chapter_id.into()],
        );

        let row = conn
            .query_one(stmt)
            .await?
            .ok_or_else(|| AppError::ChapterNotFound {
                id: chapter_id.to_string(),
            })?;

        row.try_get_by_index::<i64>(0)
            .map_err(|e| AppError::Database(e.into()))
    }

    /// Vote rows present for a chapter
    pub async fn count_chapter_votes(&self, chapter_id: Uuid) -> Result<i64> {
        let count = ChapterVoteEntity::find()
            .filter(ChapterVoteColumn::ChapterId.eq(chapter_id))
            .count(self.read_conn())
            .await?;

        Ok(count as i64)
    }

    /// Total votes across all chapters of a story
    pub async fn count_story_votes(&self, story_id: Uuid) -> Result<i64> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT COUNT(*) FROM chapter_votes v \
             JOIN chapters c ON v.chapter_id = c.id \
             WHERE c.story_id = $1",
            vec![story_id.into()],
        );

        let row = self.read_conn().query_one(stmt).await?;
        match row {
            Some(row) => row
                .try_get_by_index::<i64>(0)
                .map_err(|e| AppError::Database(e.into())),
            None => Ok(0),
        }
    }

    // ========================================================================
    // Reading Progress
    // ========================================================================

    /// Create or update the reading progress for a (user, story) pair
    pub async fn upsert_progress(
        &self,
        user_id: Uuid,
        story_id: Uuid,
        chapter_id: Uuid,
    ) -> Result<()> {
        let now = chrono::Utc::now();

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "INSERT INTO reading_progress (id, user_id, story_id, chapter_id, last_read) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id, story_id) DO UPDATE SET \
                 chapter_id = EXCLUDED.chapter_id, \
                 last_read = EXCLUDED.last_read",
            vec![
                Uuid::new_v4().into(),
                user_id.into(),
                story_id.into(),
                chapter_id.into(),
                now.into(),
            ],
        );

        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    /// Find the reading progress for a (user, story) pair
    pub async fn find_progress(
        &self,
        user_id: Uuid,
        story_id: Uuid,
    ) -> Result<Option<ReadingProgress>> {
        ReadingProgressEntity::find()
            .filter(ReadingProgressColumn::UserId.eq(user_id))
            .filter(ReadingProgressColumn::StoryId.eq(story_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }
}
