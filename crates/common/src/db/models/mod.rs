//! SeaORM entity models
//!
//! Database entities for Chapterhouse

mod chapter;
mod chapter_view;
mod chapter_vote;
mod reading_progress;
mod story;

pub use story::{
    join_categories, split_categories,
    ActiveModel as StoryActiveModel,
    Column as StoryColumn,
    Entity as StoryEntity,
    Model as Story,
    StoryStatus,
};

pub use chapter::{
    ActiveModel as ChapterActiveModel,
    Column as ChapterColumn,
    Entity as ChapterEntity,
    Model as Chapter,
};

pub use chapter_view::{
    ActiveModel as ChapterViewActiveModel,
    Column as ChapterViewColumn,
    Entity as ChapterViewEntity,
    Model as ChapterView,
};

pub use chapter_vote::{
    ActiveModel as ChapterVoteActiveModel,
    Column as ChapterVoteColumn,
    Entity as ChapterVoteEntity,
    Model as ChapterVote,
};

pub use reading_progress::{
    ActiveModel as ReadingProgressActiveModel,
    Column as ReadingProgressColumn,
    Entity as ReadingProgressEntity,
    Model as ReadingProgress,
};
