use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::application::context::RequestContext;
use crate::application::error::ContentError;
use crate::application::pagination::PageRequest;
use crate::application::repos::{CommentsRepo, PostsRepo};
use crate::domain::entities::{CommentRecord, PostId};

#[derive(Debug, Clone, Default)]
pub struct SaveComment {
    pub id: Option<Uuid>,
    pub post_id: Option<String>,
    pub author_id: Option<String>,
    pub content: String,
}

#[derive(Clone)]
pub struct CommentService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl CommentService {
    pub fn new(posts: Arc<dyn PostsRepo>, comments: Arc<dyn CommentsRepo>) -> Self {
        Self { posts, comments }
    }

    /// Create or update a comment on an existing post.
    pub async fn save(
        &self,
        ctx: &RequestContext,
        input: SaveComment,
    ) -> Result<CommentRecord, ContentError> {
        let raw_post = input
            .post_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ContentError::validation("comment must reference a post"))?;
        let post_id: PostId = raw_post.parse()?;

        let author_id = input
            .author_id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ContentError::validation("comment must have an author"))?;

        let post = ctx
            .run("load comment post", self.posts.find_by_id(post_id))
            .await?;
        if post.is_none() {
            return Err(ContentError::validation(format!(
                "comment references unknown post `{post_id}`"
            )));
        }

        let now = ctx.now();
        let record = CommentRecord {
            id: input.id.unwrap_or_else(Uuid::new_v4),
            post_id,
            author_id,
            content: input.content,
            created_at: now,
            modified_at: now,
        };

        let stored = ctx
            .run("save comment", self.comments.upsert_comment(&record))
            .await?;
        info!(comment_id = %stored.id, post_id = %stored.post_id, "Saved comment");
        Ok(stored)
    }

    /// Comments on `post_id`, oldest first.
    pub async fn list_for_post(
        &self,
        ctx: &RequestContext,
        post_id: PostId,
        page: PageRequest,
    ) -> Result<Vec<CommentRecord>, ContentError> {
        if page.is_empty() {
            return Ok(Vec::new());
        }
        ctx.run(
            "list comments",
            self.comments.list_for_post(post_id, page),
        )
        .await
    }
}
