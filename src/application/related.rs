//! Related-post discovery: title similarity first, random backfill after.

use std::collections::HashSet;
use std::sync::Arc;

use metrics::counter;
use tracing::debug;

use crate::application::context::RequestContext;
use crate::application::error::ContentError;
use crate::application::pagination::PageRequest;
use crate::application::repos::{PostsRepo, SimilarTitles};
use crate::domain::entities::{PostId, PostRecord};
use crate::domain::similarity::DEFAULT_SIMILARITY_THRESHOLD;

#[derive(Clone)]
pub struct RelatedPostFinder {
    reader: Arc<dyn PostsRepo>,
    threshold: f64,
}

impl RelatedPostFinder {
    pub fn new(reader: Arc<dyn PostsRepo>) -> Self {
        Self::with_threshold(reader, DEFAULT_SIMILARITY_THRESHOLD)
    }

    pub fn with_threshold(reader: Arc<dyn PostsRepo>, threshold: f64) -> Self {
        Self { reader, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Up to `page.limit()` posts related to `post`, never including `post`
    /// itself and never repeating an id.
    pub async fn find_related(
        &self,
        ctx: &RequestContext,
        post: &PostRecord,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, ContentError> {
        let limit = page.limit() as usize;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let similar = ctx
            .run(
                "find similar posts",
                self.reader.similar_titles(SimilarTitles {
                    title: &post.title,
                    exclude: post.id,
                    threshold: self.threshold,
                    page,
                }),
            )
            .await?;

        let mut seen: HashSet<PostId> = HashSet::from([post.id]);
        let mut related: Vec<PostRecord> = similar
            .into_iter()
            .map(|scored| scored.post)
            .filter(|candidate| seen.insert(candidate.id))
            .take(limit)
            .collect();
        let similar_count = related.len();

        if related.len() < limit {
            let exclude: Vec<PostId> = seen.iter().copied().collect();
            let room = limit - related.len();
            let fill = ctx
                .run(
                    "pick random posts",
                    self.reader.random_posts(room as u32, &exclude),
                )
                .await?;
            related.extend(
                fill.into_iter()
                    .filter(|candidate| seen.insert(candidate.id))
                    .take(room),
            );
        }

        let backfilled = related.len() - similar_count;
        if backfilled > 0 {
            counter!("plume_related_backfill_total").increment(backfilled as u64);
        }
        debug!(
            post_id = %post.id,
            similar = similar_count,
            backfilled,
            "Resolved related posts"
        );
        Ok(related)
    }
}
