//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::pagination::PageRequest;
use crate::domain::entities::{CommentRecord, PostId, PostRecord};
use crate::domain::posts::{Direction, PostWindow};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// Title similarity lookup for related posts.
#[derive(Debug, Clone, Copy)]
pub struct SimilarTitles<'a> {
    pub title: &'a str,
    pub exclude: PostId,
    pub threshold: f64,
    pub page: PageRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPost {
    pub post: PostRecord,
    pub score: f64,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn find_by_id(&self, id: PostId) -> Result<Option<PostRecord>, RepoError>;

    /// Posts in `window` relative to `as_of`, newest first.
    async fn list_window(
        &self,
        window: PostWindow,
        as_of: OffsetDateTime,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError>;

    /// Published posts carrying `tag`, newest first, unpaginated.
    async fn list_by_tag(
        &self,
        tag: &str,
        as_of: OffsetDateTime,
    ) -> Result<Vec<PostRecord>, RepoError>;

    /// Tag usage across all posts, most used first.
    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepoError>;

    /// Published posts matching every term of `query`, most relevant first.
    async fn search(
        &self,
        query: &str,
        as_of: OffsetDateTime,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError>;

    /// Non-draft posts whose titles reach the similarity threshold, best first.
    async fn similar_titles(
        &self,
        query: SimilarTitles<'_>,
    ) -> Result<Vec<ScoredPost>, RepoError>;

    /// Up to `limit` random non-draft posts whose ids are not in `exclude`.
    async fn random_posts(
        &self,
        limit: u32,
        exclude: &[PostId],
    ) -> Result<Vec<PostRecord>, RepoError>;

    /// Closest non-draft post strictly after (`Next`) or before (`Prev`) `datetime`.
    async fn adjacent(
        &self,
        datetime: OffsetDateTime,
        direction: Direction,
    ) -> Result<Option<PostRecord>, RepoError>;

    fn stream_all(&self) -> BoxStream<'_, Result<PostRecord, RepoError>>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    /// Reserve the next id from the store sequence.
    async fn next_post_id(&self) -> Result<PostId, RepoError>;

    /// Insert or update keyed by id. The stored `created_at` survives updates,
    /// and the id sequence is advanced past explicit ids.
    async fn upsert_post(&self, post: &PostRecord) -> Result<PostRecord, RepoError>;

    /// Overwrite derived tags without touching audit timestamps.
    async fn replace_tags(&self, id: PostId, tags: &[String]) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn upsert_comment(&self, comment: &CommentRecord) -> Result<CommentRecord, RepoError>;

    /// Oldest first.
    async fn list_for_post(
        &self,
        post_id: PostId,
        page: PageRequest,
    ) -> Result<Vec<CommentRecord>, RepoError>;
}
