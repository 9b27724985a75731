//! Chapter entity with dense per-story ordering

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chapters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub story_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Position within the story: 1-based, dense, unique per story.
    /// Every sibling set is exactly {1..N} between completed operations.
    pub chapter_number: i32,

    /// Control flag: false = draft, true = published
    pub is_published: bool,

    /// Denormalized view count; always recomputed from chapter_views
    pub views: i64,

    /// Denormalized vote count; always recomputed from chapter_votes
    pub votes: i64,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::story::Entity",
        from = "Column::StoryId",
        to = "super::story::Column::Id"
    )]
    Story,

    #[sea_orm(has_many = "super::chapter_view::Entity")]
    Views,

    #[sea_orm(has_many = "super::chapter_vote::Entity")]
    Votes,
}

impl Related<super::story::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Story.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
