use std::sync::Arc;

use crate::application::context::RequestContext;
use crate::application::error::ContentError;
use crate::application::repos::PostsRepo;
use crate::domain::entities::PostRecord;
use crate::domain::posts::Direction;

/// Chronological neighbours among non-draft posts.
#[derive(Clone)]
pub struct Navigator {
    reader: Arc<dyn PostsRepo>,
}

impl Navigator {
    pub fn new(reader: Arc<dyn PostsRepo>) -> Self {
        Self { reader }
    }

    pub async fn next(
        &self,
        ctx: &RequestContext,
        post: &PostRecord,
    ) -> Result<Option<PostRecord>, ContentError> {
        self.adjacent(ctx, post, Direction::Next).await
    }

    pub async fn prev(
        &self,
        ctx: &RequestContext,
        post: &PostRecord,
    ) -> Result<Option<PostRecord>, ContentError> {
        self.adjacent(ctx, post, Direction::Prev).await
    }

    async fn adjacent(
        &self,
        ctx: &RequestContext,
        post: &PostRecord,
        direction: Direction,
    ) -> Result<Option<PostRecord>, ContentError> {
        ctx.run(
            "find adjacent post",
            self.reader.adjacent(post.datetime, direction),
        )
        .await
    }
}
