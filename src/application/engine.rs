use std::sync::Arc;

use crate::application::comments::CommentService;
use crate::application::navigation::Navigator;
use crate::application::posts::ContentStore;
use crate::application::related::RelatedPostFinder;
use crate::application::render::PostRenderer;
use crate::application::repos::{CommentsRepo, PostsRepo, PostsWriteRepo};
use crate::application::search::SearchRanker;
use crate::domain::similarity::DEFAULT_SIMILARITY_THRESHOLD;
use crate::domain::tags::{TagExtractor, TagRules};

/// Tunables shared by the services.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub tag_rules: TagRules,
    pub similarity_threshold: f64,
    pub base_url: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tag_rules: TagRules::default(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            base_url: String::new(),
        }
    }
}

/// Every content service wired to one set of repositories.
pub struct ContentEngine {
    pub store: ContentStore,
    pub search: SearchRanker,
    pub related: RelatedPostFinder,
    pub navigator: Navigator,
    pub comments: CommentService,
    pub renderer: PostRenderer,
}

impl ContentEngine {
    pub fn new<R>(repos: Arc<R>, options: EngineOptions) -> Self
    where
        R: PostsRepo + PostsWriteRepo + CommentsRepo + 'static,
    {
        let reader: Arc<dyn PostsRepo> = repos.clone();
        let writer: Arc<dyn PostsWriteRepo> = repos.clone();
        let comments: Arc<dyn CommentsRepo> = repos;
        let extractor = TagExtractor::new(options.tag_rules);

        Self {
            store: ContentStore::new(reader.clone(), writer, extractor.clone()),
            search: SearchRanker::new(reader.clone()),
            related: RelatedPostFinder::with_threshold(
                reader.clone(),
                options.similarity_threshold,
            ),
            navigator: Navigator::new(reader.clone()),
            comments: CommentService::new(reader, comments),
            renderer: PostRenderer::new(extractor, options.base_url),
        }
    }
}
