//! In-process repository adapter.
//!
//! Mirrors the Postgres adapter's observable behavior: full-text search goes
//! through the BM25 ranker in `domain::search`, and related-title lookups use
//! the trigram similarity in `domain::similarity`. Every write happens under a
//! single lock acquisition.

use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use rand::seq::SliceRandom;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::repos::{
    CommentsRepo, PostsRepo, PostsWriteRepo, RepoError, ScoredPost, SimilarTitles, TagCount,
};
use crate::domain::entities::{CommentRecord, PostId, PostRecord};
use crate::domain::posts::{Direction, PostWindow, newest_first};
use crate::domain::search;
use crate::domain::similarity::similarity;

#[derive(Debug, Default)]
struct State {
    posts: BTreeMap<PostId, PostRecord>,
    comments: BTreeMap<Uuid, CommentRecord>,
    last_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryRepositories {
    state: RwLock<State>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post_count(&self) -> usize {
        self.read("post_count").posts.len()
    }

    fn read(&self, op: &'static str) -> RwLockReadGuard<'_, State> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(op, lock_kind = "rwlock.read", "Recovered from poisoned store lock");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self, op: &'static str) -> RwLockWriteGuard<'_, State> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(op, lock_kind = "rwlock.write", "Recovered from poisoned store lock");
                poisoned.into_inner()
            }
        }
    }

    /// Matching posts, newest first.
    fn collect_posts<F>(&self, op: &'static str, keep: F) -> Vec<PostRecord>
    where
        F: Fn(&PostRecord) -> bool,
    {
        let state = self.read(op);
        let mut posts: Vec<PostRecord> = state.posts.values().filter(|p| keep(p)).cloned().collect();
        posts.sort_by(newest_first);
        posts
    }
}

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn find_by_id(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.read("find_by_id").posts.get(&id).cloned())
    }

    async fn list_window(
        &self,
        window: PostWindow,
        as_of: OffsetDateTime,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let posts = self.collect_posts("list_window", |post| window.contains(post, as_of));
        Ok(page.slice(posts))
    }

    async fn list_by_tag(
        &self,
        tag: &str,
        as_of: OffsetDateTime,
    ) -> Result<Vec<PostRecord>, RepoError> {
        Ok(self.collect_posts("list_by_tag", |post| {
            post.is_published_at(as_of) && post.tags.iter().any(|t| t == tag)
        }))
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepoError> {
        let state = self.read("tag_counts");
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for tag in state.posts.values().flat_map(|post| post.tags.iter()) {
            *counts.entry(tag.as_str()).or_default() += 1;
        }

        let mut counts: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount {
                tag: tag.to_string(),
                count,
            })
            .collect();
        // BTreeMap order already sorts tags ascending; the stable sort keeps it for ties.
        counts.sort_by(|left, right| right.count.cmp(&left.count));
        Ok(counts)
    }

    async fn search(
        &self,
        query: &str,
        as_of: OffsetDateTime,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let candidates = self.collect_posts("search", |post| post.is_published_at(as_of));
        let documents: Vec<String> = candidates.iter().map(PostRecord::searchable_text).collect();
        let ranked = search::rank(query, &documents);

        Ok(page.slice(ranked.into_iter().map(|(index, _)| candidates[index].clone())))
    }

    async fn similar_titles(
        &self,
        query: SimilarTitles<'_>,
    ) -> Result<Vec<ScoredPost>, RepoError> {
        let candidates =
            self.collect_posts("similar_titles", |post| !post.draft && post.id != query.exclude);

        let mut scored: Vec<ScoredPost> = candidates
            .into_iter()
            .filter_map(|post| {
                let score = similarity(query.title, &post.title);
                (score >= query.threshold).then_some(ScoredPost { post, score })
            })
            .collect();
        scored.sort_by(|left, right| right.score.total_cmp(&left.score));

        Ok(query.page.slice(scored))
    }

    async fn random_posts(
        &self,
        limit: u32,
        exclude: &[PostId],
    ) -> Result<Vec<PostRecord>, RepoError> {
        let exclude: HashSet<PostId> = exclude.iter().copied().collect();
        let pool = self.collect_posts("random_posts", |post| {
            !post.draft && !exclude.contains(&post.id)
        });

        let mut rng = rand::thread_rng();
        Ok(pool
            .choose_multiple(&mut rng, limit as usize)
            .cloned()
            .collect())
    }

    async fn adjacent(
        &self,
        datetime: OffsetDateTime,
        direction: Direction,
    ) -> Result<Option<PostRecord>, RepoError> {
        let state = self.read("adjacent");
        let candidates = state.posts.values().filter(|post| !post.draft);

        let found = match direction {
            Direction::Next => candidates
                .filter(|post| post.datetime > datetime)
                .min_by_key(|post| (post.datetime, post.id)),
            Direction::Prev => candidates
                .filter(|post| post.datetime < datetime)
                .max_by_key(|post| (post.datetime, post.id)),
        };
        Ok(found.cloned())
    }

    fn stream_all(&self) -> BoxStream<'_, Result<PostRecord, RepoError>> {
        let posts: Vec<PostRecord> = self.read("stream_all").posts.values().cloned().collect();
        stream::iter(posts.into_iter().map(Ok)).boxed()
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepositories {
    async fn next_post_id(&self) -> Result<PostId, RepoError> {
        let mut state = self.write("next_post_id");
        state.last_id += 1;
        Ok(PostId::new(state.last_id))
    }

    async fn upsert_post(&self, post: &PostRecord) -> Result<PostRecord, RepoError> {
        let mut state = self.write("upsert_post");
        let mut stored = post.clone();
        if let Some(existing) = state.posts.get(&post.id) {
            stored.created_at = existing.created_at;
        }
        state.last_id = state.last_id.max(post.id.get());
        state.posts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn replace_tags(&self, id: PostId, tags: &[String]) -> Result<(), RepoError> {
        let mut state = self.write("replace_tags");
        let post = state.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.tags = tags.to_vec();
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn upsert_comment(&self, comment: &CommentRecord) -> Result<CommentRecord, RepoError> {
        let mut state = self.write("upsert_comment");
        if !state.posts.contains_key(&comment.post_id) {
            return Err(RepoError::InvalidInput {
                message: format!("post `{}` does not exist", comment.post_id),
            });
        }

        let mut stored = comment.clone();
        if let Some(existing) = state.comments.get(&comment.id) {
            stored.created_at = existing.created_at;
            stored.post_id = existing.post_id;
        }
        state.comments.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list_for_post(
        &self,
        post_id: PostId,
        page: PageRequest,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        let state = self.read("list_for_post");
        let mut comments: Vec<CommentRecord> = state
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(page.slice(comments))
    }
}
