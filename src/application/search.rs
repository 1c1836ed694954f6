use std::sync::Arc;

use metrics::counter;
use tracing::debug;

use crate::application::context::RequestContext;
use crate::application::error::ContentError;
use crate::application::pagination::PageRequest;
use crate::application::repos::PostsRepo;
use crate::domain::entities::PostRecord;
use crate::domain::search::query_terms;

/// Full-text search over published posts.
#[derive(Clone)]
pub struct SearchRanker {
    reader: Arc<dyn PostsRepo>,
}

impl SearchRanker {
    pub fn new(reader: Arc<dyn PostsRepo>) -> Self {
        Self { reader }
    }

    /// Most relevant published posts first. Blank queries match nothing.
    pub async fn search(
        &self,
        ctx: &RequestContext,
        query: &str,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, ContentError> {
        let query = query.trim();
        if query_terms(query).is_empty() || page.is_empty() {
            return Ok(Vec::new());
        }

        counter!("plume_search_queries_total").increment(1);
        let posts = ctx
            .run("search posts", self.reader.search(query, ctx.now(), page))
            .await?;
        debug!(query, hits = posts.len(), "Searched posts");
        Ok(posts)
    }
}
