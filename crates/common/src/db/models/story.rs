//! Story entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Editorial status of a story
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    Draft,
    Writing,
    Pending,
    Approved,
    Complete,
    Blocked,
}

impl StoryStatus {
    /// Strict parse for caller-supplied input
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(StoryStatus::Draft),
            "writing" => Some(StoryStatus::Writing),
            "pending" => Some(StoryStatus::Pending),
            "approved" => Some(StoryStatus::Approved),
            "complete" => Some(StoryStatus::Complete),
            "blocked" => Some(StoryStatus::Blocked),
            _ => None,
        }
    }

    /// Whether a story in this status accepts new chapters
    pub fn accepts_new_chapters(&self) -> bool {
        !matches!(self, StoryStatus::Complete | StoryStatus::Blocked)
    }
}

impl From<String> for StoryStatus {
    fn from(s: String) -> Self {
        StoryStatus::parse(&s).unwrap_or(StoryStatus::Draft)
    }
}

impl From<StoryStatus> for String {
    fn from(status: StoryStatus) -> Self {
        match status {
            StoryStatus::Draft => "draft".to_string(),
            StoryStatus::Writing => "writing".to_string(),
            StoryStatus::Pending => "pending".to_string(),
            StoryStatus::Approved => "approved".to_string(),
            StoryStatus::Complete => "complete".to_string(),
            StoryStatus::Blocked => "blocked".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning author
    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Free-text categories, comma-joined
    #[sea_orm(column_type = "Text")]
    pub category: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub thumbnail: Option<String>,

    /// Control flag: false = draft, true = published
    pub is_published: bool,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the status as an enum
    pub fn story_status(&self) -> StoryStatus {
        StoryStatus::from(self.status.clone())
    }

    /// Whether new chapters may be added to this story
    pub fn accepts_new_chapters(&self) -> bool {
        self.story_status().accepts_new_chapters()
    }

    /// Split the comma-joined category field into a list
    pub fn categories(&self) -> Vec<String> {
        split_categories(&self.category)
    }
}

/// Join a category list into the stored comma-joined form
pub fn join_categories(categories: &[String]) -> String {
    categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

/// Split the stored comma-joined form back into a list
pub fn split_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::chapter::Entity")]
    Chapters,
}

impl Related<super::chapter::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chapters.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(StoryStatus::parse("writing"), Some(StoryStatus::Writing));
        assert_eq!(StoryStatus::parse("complete"), Some(StoryStatus::Complete));
        assert_eq!(StoryStatus::parse("bogus"), None);
    }

    #[test]
    fn test_status_gating() {
        assert!(StoryStatus::Draft.accepts_new_chapters());
        assert!(StoryStatus::Writing.accepts_new_chapters());
        assert!(StoryStatus::Approved.accepts_new_chapters());
        assert!(!StoryStatus::Complete.accepts_new_chapters());
        assert!(!StoryStatus::Blocked.accepts_new_chapters());
    }

    #[test]
    fn test_category_codec() {
        let joined = join_categories(&[
            "fantasy".to_string(),
            " isekai ".to_string(),
            "".to_string(),
        ]);
        assert_eq!(joined, "fantasy,isekai");
        assert_eq!(split_categories(&joined), vec!["fantasy", "isekai"]);
        assert!(split_categories("").is_empty());
    }
}
