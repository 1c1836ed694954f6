use time::OffsetDateTime;

use crate::application::repos::ScoredPost;
use crate::domain::entities::{PostId, PostRecord};

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: PostId,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) datetime: OffsetDateTime,
    pub(crate) draft: bool,
    pub(crate) tags: Vec<String>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) modified_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            datetime: row.datetime,
            created_at: row.created_at,
            modified_at: row.modified_at,
            draft: row.draft,
            tags: row.tags,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ScoredPostRow {
    #[sqlx(flatten)]
    pub(crate) post: PostRow,
    pub(crate) score: f64,
}

impl From<ScoredPostRow> for ScoredPost {
    fn from(row: ScoredPostRow) -> Self {
        Self {
            post: PostRecord::from(row.post),
            score: row.score,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct TagCountRow {
    pub(crate) tag: String,
    pub(crate) count: i64,
}
