//! Post persistence and retrieval.

use std::sync::Arc;

use futures::TryStreamExt;
use metrics::counter;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::application::context::RequestContext;
use crate::application::error::ContentError;
use crate::application::pagination::PageRequest;
use crate::application::repos::{PostsRepo, PostsWriteRepo};
use crate::domain::entities::{PostId, PostRecord};
use crate::domain::posts::{PostWindow, SavePost, apply_defaults};
use crate::domain::tags::TagExtractor;

/// Partial update coming from the mutation layer.
///
/// Fields left as `None` keep the stored value, except `draft`, which falls
/// back to `true`.
#[derive(Debug, Clone, Default)]
pub struct EditPost {
    pub id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub datetime: Option<OffsetDateTime>,
    pub draft: Option<bool>,
}

#[derive(Clone)]
pub struct ContentStore {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    extractor: TagExtractor,
}

impl ContentStore {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        extractor: TagExtractor,
    ) -> Self {
        Self {
            reader,
            writer,
            extractor,
        }
    }

    pub fn extractor(&self) -> &TagExtractor {
        &self.extractor
    }

    /// Create or update a post: normalize, derive, default, persist.
    pub async fn save(
        &self,
        ctx: &RequestContext,
        input: SavePost,
    ) -> Result<PostRecord, ContentError> {
        let id = self.normalize(ctx, &input).await?;
        let tags = self.derive(&input.content);
        let record = apply_defaults(input, id, tags, ctx.now());
        let stored = self.persist(ctx, record).await?;

        counter!("plume_posts_saved_total").increment(1);
        info!(
            post_id = %stored.id,
            draft = stored.draft,
            tags = stored.tags.len(),
            "Saved post"
        );
        Ok(stored)
    }

    /// Resolve the id, reserving a fresh one from the store for new posts.
    pub async fn normalize(
        &self,
        ctx: &RequestContext,
        input: &SavePost,
    ) -> Result<PostId, ContentError> {
        match input.id {
            Some(id) => Ok(id),
            None => {
                ctx.run("reserve post id", self.writer.next_post_id())
                    .await
            }
        }
    }

    pub fn derive(&self, content: &str) -> Vec<String> {
        self.extractor.extract(content)
    }

    pub async fn persist(
        &self,
        ctx: &RequestContext,
        record: PostRecord,
    ) -> Result<PostRecord, ContentError> {
        ctx.run("save post", self.writer.upsert_post(&record)).await
    }

    /// Merge a partial update onto the stored post, then save it.
    pub async fn edit(
        &self,
        ctx: &RequestContext,
        edit: EditPost,
    ) -> Result<PostRecord, ContentError> {
        let mut input = match edit.id.as_deref() {
            Some(raw) => SavePost::from(&self.require(ctx, raw).await?),
            None => SavePost::default(),
        };

        if let Some(title) = edit.title {
            input.title = title;
        }
        if let Some(content) = edit.content {
            input.content = content;
        }
        if let Some(datetime) = edit.datetime {
            input.datetime = Some(datetime);
        }
        input.draft = Some(edit.draft.unwrap_or(true));

        self.save(ctx, input).await
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        id: PostId,
    ) -> Result<Option<PostRecord>, ContentError> {
        ctx.run("load post", self.reader.find_by_id(id)).await
    }

    /// Look up a post by its external string id.
    pub async fn get_by_id(
        &self,
        ctx: &RequestContext,
        raw_id: &str,
    ) -> Result<Option<PostRecord>, ContentError> {
        let id: PostId = raw_id.parse()?;
        self.get(ctx, id).await
    }

    /// Like [`Self::get_by_id`], but a missing post is an error.
    pub async fn require(
        &self,
        ctx: &RequestContext,
        raw_id: &str,
    ) -> Result<PostRecord, ContentError> {
        self.get_by_id(ctx, raw_id)
            .await?
            .ok_or_else(|| ContentError::not_found("post", raw_id))
    }

    pub async fn list_published(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, ContentError> {
        self.list_window(ctx, PostWindow::Published, page).await
    }

    pub async fn list_future(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, ContentError> {
        self.list_window(ctx, PostWindow::Future, page).await
    }

    pub async fn list_drafts(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, ContentError> {
        self.list_window(ctx, PostWindow::Drafts, page).await
    }

    pub async fn list_window(
        &self,
        ctx: &RequestContext,
        window: PostWindow,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, ContentError> {
        if page.is_empty() {
            return Ok(Vec::new());
        }
        let posts = ctx
            .run(
                "list posts",
                self.reader.list_window(window, ctx.now(), page),
            )
            .await?;
        debug!(window = window.as_str(), count = posts.len(), "Listed posts");
        Ok(posts)
    }

    /// Published posts carrying `tag`. Not paginated.
    pub async fn list_by_tag(
        &self,
        ctx: &RequestContext,
        tag: &str,
    ) -> Result<Vec<PostRecord>, ContentError> {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            return Ok(Vec::new());
        }
        ctx.run("list posts by tag", self.reader.list_by_tag(&tag, ctx.now()))
            .await
    }

    /// Every tag in use, most used first.
    pub async fn all_tags(&self, ctx: &RequestContext) -> Result<Vec<String>, ContentError> {
        let counts = ctx.run("count tags", self.reader.tag_counts()).await?;
        Ok(counts.into_iter().map(|entry| entry.tag).collect())
    }

    /// Recompute tags for every stored post with the current rules.
    ///
    /// Returns how many posts changed. Audit timestamps are left alone.
    pub async fn retag_all(&self, ctx: &RequestContext) -> Result<u64, ContentError> {
        // Drain the scan before writing so the read cursor never waits on a
        // pooled connection held by the updates.
        let posts: Vec<PostRecord> = ctx
            .run("scan posts", self.reader.stream_all().try_collect())
            .await?;
        let mut changed = 0_u64;

        for post in &posts {
            let tags = self.derive(&post.content);
            if tags == post.tags {
                continue;
            }
            ctx.run("replace tags", self.writer.replace_tags(post.id, &tags))
                .await?;
            changed += 1;
        }

        info!(scanned = posts.len(), changed, "Recomputed post tags");
        Ok(changed)
    }
}
