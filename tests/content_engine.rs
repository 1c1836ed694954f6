use std::collections::HashSet;
use std::sync::Arc;

use plume::application::comments::SaveComment;
use plume::application::context::RequestContext;
use plume::application::engine::{ContentEngine, EngineOptions};
use plume::application::error::ContentError;
use plume::application::pagination::{PageDefaults, PageRequest};
use plume::application::posts::EditPost;
use plume::domain::entities::{PostId, PostRecord};
use plume::domain::posts::SavePost;
use plume::domain::tags::{DEFAULT_HASHTAG_PATTERN, TagRules};
use plume::infra::memory::MemoryRepositories;
use time::{Duration, OffsetDateTime, macros::datetime};

const NOW: OffsetDateTime = datetime!(2024-06-15 12:00 UTC);

fn engine() -> (Arc<MemoryRepositories>, ContentEngine) {
    let repos = Arc::new(MemoryRepositories::new());
    let engine = ContentEngine::new(repos.clone(), EngineOptions::default());
    (repos, engine)
}

fn ctx() -> RequestContext {
    RequestContext::at(NOW)
}

async fn publish(
    engine: &ContentEngine,
    title: &str,
    content: &str,
    at: OffsetDateTime,
) -> PostRecord {
    engine
        .store
        .save(
            &ctx(),
            SavePost::new(title, content)
                .with_datetime(at)
                .with_draft(false),
        )
        .await
        .expect("save post")
}

async fn draft(engine: &ContentEngine, title: &str, at: OffsetDateTime) -> PostRecord {
    engine
        .store
        .save(&ctx(), SavePost::new(title, "").with_datetime(at))
        .await
        .expect("save draft")
}

fn ids(posts: &[PostRecord]) -> Vec<PostId> {
    posts.iter().map(|post| post.id).collect()
}

#[tokio::test]
async fn new_posts_get_consecutive_ids() {
    let (_, engine) = engine();
    let a = publish(&engine, "A", "", NOW).await;
    let b = publish(&engine, "B", "", NOW).await;
    assert_eq!(b.id.get(), a.id.get() + 1);
}

#[tokio::test]
async fn unspecified_draft_and_title_get_defaults() {
    let (_, engine) = engine();
    let post = engine
        .store
        .save(&ctx(), SavePost::new("", "body"))
        .await
        .unwrap();

    assert!(post.draft);
    assert_eq!(post.title, format!("Untitled #{}", post.id));
    assert_eq!(post.datetime, NOW);
    assert_eq!(post.created_at, NOW);
    assert_eq!(post.modified_at, NOW);
}

#[tokio::test]
async fn tags_follow_content_on_every_save() {
    let (_, engine) = engine();
    let post = publish(
        &engine,
        "Batch",
        "Hello #World #world from #HackerSchool",
        NOW,
    )
    .await;
    assert_eq!(post.tags, vec!["hackerschool", "recursecenter", "world"]);

    let mut input = SavePost::from(&post);
    input.content = "now about #rust".to_string();
    let updated = engine.store.save(&ctx(), input).await.unwrap();
    assert_eq!(updated.id, post.id);
    assert_eq!(updated.tags, vec!["rust"]);
}

#[tokio::test]
async fn updates_keep_created_at_and_refresh_modified_at() {
    let (_, engine) = engine();
    let post = publish(&engine, "Original", "", NOW).await;

    let later = NOW + Duration::days(1);
    let input = SavePost::new("Renamed", "").with_id(post.id).with_draft(false);
    let updated = engine
        .store
        .save(&RequestContext::at(later), input)
        .await
        .unwrap();

    assert_eq!(updated.created_at, NOW);
    assert_eq!(updated.modified_at, later);
    assert_eq!(updated.title, "Renamed");
}

#[tokio::test]
async fn explicit_ids_advance_the_sequence() {
    let (_, engine) = engine();
    engine
        .store
        .save(&ctx(), SavePost::new("Imported", "").with_id(PostId::new(40)))
        .await
        .unwrap();

    let next = publish(&engine, "Fresh", "", NOW).await;
    assert_eq!(next.id, PostId::new(41));
}

#[tokio::test]
async fn windows_partition_posts_by_time_and_draft() {
    let (_, engine) = engine();
    let past = publish(&engine, "Past", "", NOW - Duration::hours(1)).await;
    let future = publish(&engine, "Future", "", NOW + Duration::hours(1)).await;
    let hidden = draft(&engine, "Draft", NOW - Duration::hours(1)).await;
    let page = PageRequest::listing();

    let published = engine.store.list_published(&ctx(), page).await.unwrap();
    let upcoming = engine.store.list_future(&ctx(), page).await.unwrap();
    let drafts = engine.store.list_drafts(&ctx(), page).await.unwrap();

    assert_eq!(ids(&published), vec![past.id]);
    assert_eq!(ids(&upcoming), vec![future.id]);
    assert_eq!(ids(&drafts), vec![hidden.id]);
}

#[tokio::test]
async fn three_day_timeline_scenario() {
    let (_, engine) = engine();
    let day1 = publish(&engine, "Day one", "", NOW - Duration::days(2)).await;
    let day2 = publish(&engine, "Day two", "", NOW - Duration::days(1)).await;
    let _day3 = draft(&engine, "Day three", NOW).await;

    let published = engine
        .store
        .list_published(&ctx(), PageRequest::listing())
        .await
        .unwrap();
    assert_eq!(ids(&published), vec![day2.id, day1.id]);

    let nav = &engine.navigator;
    assert_eq!(nav.next(&ctx(), &day1).await.unwrap().map(|p| p.id), Some(day2.id));
    assert_eq!(nav.prev(&ctx(), &day2).await.unwrap().map(|p| p.id), Some(day1.id));
    assert!(nav.next(&ctx(), &day2).await.unwrap().is_none());
    assert!(nav.prev(&ctx(), &day1).await.unwrap().is_none());
}

#[tokio::test]
async fn navigation_includes_scheduled_posts() {
    let (_, engine) = engine();
    let today = publish(&engine, "Today", "", NOW).await;
    let scheduled = publish(&engine, "Tomorrow", "", NOW + Duration::days(1)).await;

    let next = engine.navigator.next(&ctx(), &today).await.unwrap();
    assert_eq!(next.map(|p| p.id), Some(scheduled.id));
}

#[tokio::test]
async fn listings_paginate_with_shared_defaults() {
    let (_, engine) = engine();
    for minutes in 0..12 {
        publish(&engine, "Post", "", NOW - Duration::minutes(minutes)).await;
    }

    let first = engine
        .store
        .list_published(&ctx(), PageRequest::listing())
        .await
        .unwrap();
    assert_eq!(first.len(), 10);
    assert!(first.windows(2).all(|pair| pair[0].datetime >= pair[1].datetime));

    let rest = engine
        .store
        .list_published(
            &ctx(),
            PageRequest::from_input(None, Some(10), PageDefaults::LISTING).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(rest.len(), 2);

    assert!(PageRequest::from_input(Some(-1), None, PageDefaults::LISTING).is_err());
}

#[tokio::test]
async fn lookups_distinguish_malformed_missing_and_required() {
    let (_, engine) = engine();
    let post = publish(&engine, "Present", "", NOW).await;

    let found = engine
        .store
        .get_by_id(&ctx(), &post.id.to_string())
        .await
        .unwrap();
    assert_eq!(found.map(|p| p.id), Some(post.id));

    let malformed = engine.store.get_by_id(&ctx(), "abc").await.unwrap_err();
    assert!(matches!(malformed, ContentError::Validation(_)));

    assert!(engine.store.get_by_id(&ctx(), "999").await.unwrap().is_none());

    let required = engine.store.require(&ctx(), "999").await.unwrap_err();
    assert!(required.is_not_found());
}

#[tokio::test]
async fn tag_listing_is_case_insensitive_and_published_only() {
    let (_, engine) = engine();
    let older = publish(&engine, "Older", "about #Rust", NOW - Duration::days(2)).await;
    let newer = publish(&engine, "Newer", "more #rust", NOW - Duration::days(1)).await;
    publish(&engine, "Later", "soon #rust", NOW + Duration::days(1)).await;
    engine
        .store
        .save(&ctx(), SavePost::new("Hidden", "secret #rust"))
        .await
        .unwrap();
    publish(&engine, "Other", "about #go", NOW).await;

    let tagged = engine.store.list_by_tag(&ctx(), "RUST").await.unwrap();
    assert_eq!(ids(&tagged), vec![newer.id, older.id]);
    assert!(engine.store.list_by_tag(&ctx(), "  ").await.unwrap().is_empty());
}

#[tokio::test]
async fn all_tags_orders_by_usage_then_name() {
    let (_, engine) = engine();
    publish(&engine, "One", "x #rust #zig", NOW).await;
    publish(&engine, "Two", "x #rust #go", NOW).await;
    publish(&engine, "Three", "x #rust #go #c", NOW).await;

    let tags = engine.store.all_tags(&ctx()).await.unwrap();
    assert_eq!(tags, vec!["rust", "go", "c", "zig"]);
}

#[tokio::test]
async fn search_requires_every_term_and_ranks_by_frequency() {
    let (_, engine) = engine();
    let once = publish(
        &engine,
        "Ownership",
        "borrow checker basics and a long tail of unrelated words here",
        NOW - Duration::days(1),
    )
    .await;
    let often = publish(
        &engine,
        "Borrow checker",
        "borrow borrow checker",
        NOW - Duration::days(2),
    )
    .await;
    publish(&engine, "Checkers", "a board game with no lending", NOW).await;
    engine
        .store
        .save(&ctx(), SavePost::new("Draft", "borrow checker draft"))
        .await
        .unwrap();

    let hits = engine
        .search
        .search(&ctx(), "Borrow checker", PageRequest::listing())
        .await
        .unwrap();
    assert_eq!(ids(&hits), vec![often.id, once.id]);

    let by_tag = publish(&engine, "Tagged", "see #lifetimes", NOW).await;
    let hits = engine
        .search
        .search(&ctx(), "lifetimes", PageRequest::listing())
        .await
        .unwrap();
    assert_eq!(ids(&hits), vec![by_tag.id]);

    let blank = engine
        .search
        .search(&ctx(), "   ", PageRequest::listing())
        .await
        .unwrap();
    assert!(blank.is_empty());
}

#[tokio::test]
async fn related_posts_exclude_source_and_respect_limit() {
    let (_, engine) = engine();
    let source = publish(&engine, "Rust async patterns", "", NOW).await;
    let sibling = publish(&engine, "Rust async patterns part 2", "", NOW).await;
    for title in ["Gardening", "Sourdough", "Cycling", "Chess openings"] {
        publish(&engine, title, "", NOW).await;
    }
    let hidden = draft(&engine, "Rust async patterns draft", NOW).await;

    for _ in 0..20 {
        let related = engine
            .related
            .find_related(&ctx(), &source, PageRequest::related())
            .await
            .unwrap();

        assert_eq!(related.len(), 3);
        assert_eq!(related[0].id, sibling.id);
        let unique: HashSet<PostId> = related.iter().map(|p| p.id).collect();
        assert_eq!(unique.len(), related.len());
        assert!(!unique.contains(&source.id));
        assert!(!unique.contains(&hidden.id));
    }
}

#[tokio::test]
async fn related_backfill_fills_remaining_slots_without_repeats() {
    let (_, engine) = engine();
    let source = publish(&engine, "Rust async patterns", "", NOW).await;
    let part_two = publish(&engine, "Rust async patterns part 2", "", NOW).await;
    let again = publish(&engine, "Rust async patterns again", "", NOW).await;
    for title in ["Gardening", "Sourdough", "Cycling", "Chess openings"] {
        publish(&engine, title, "", NOW).await;
    }
    let similar = HashSet::from([part_two.id, again.id]);

    for _ in 0..50 {
        let related = engine
            .related
            .find_related(&ctx(), &source, PageRequest::new(5, 0))
            .await
            .unwrap();

        assert_eq!(related.len(), 5);
        let leading: HashSet<PostId> = related[..2].iter().map(|p| p.id).collect();
        assert_eq!(leading, similar);
        let unique: HashSet<PostId> = related.iter().map(|p| p.id).collect();
        assert_eq!(unique.len(), 5);
        assert!(!unique.contains(&source.id));
    }
}

#[tokio::test]
async fn related_backfill_stops_when_pool_is_exhausted() {
    let (_, engine) = engine();
    let source = publish(&engine, "Only post", "", NOW).await;
    let other = publish(&engine, "Completely different", "", NOW).await;

    let related = engine
        .related
        .find_related(&ctx(), &source, PageRequest::new(5, 0))
        .await
        .unwrap();
    assert_eq!(ids(&related), vec![other.id]);
}

#[tokio::test]
async fn edit_merges_onto_stored_post() {
    let (_, engine) = engine();
    let post = publish(&engine, "Title", "body #rust", NOW).await;

    let edited = engine
        .store
        .edit(
            &ctx(),
            EditPost {
                id: Some(post.id.to_string()),
                title: Some("New title".to_string()),
                ..EditPost::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(edited.id, post.id);
    assert_eq!(edited.title, "New title");
    assert_eq!(edited.content, "body #rust");
    assert_eq!(edited.tags, vec!["rust"]);
    assert!(edited.draft, "draft falls back to true when not supplied");

    let missing = engine
        .store
        .edit(
            &ctx(),
            EditPost {
                id: Some("404".to_string()),
                ..EditPost::default()
            },
        )
        .await
        .unwrap_err();
    assert!(missing.is_not_found());
}

#[tokio::test]
async fn retag_applies_new_alias_rules() {
    let (repos, engine) = engine();
    let rusty = publish(&engine, "Rusty", "about #rust", NOW).await;
    publish(&engine, "Go", "about #go", NOW).await;

    let rules = TagRules::new(DEFAULT_HASHTAG_PATTERN, [("rust", "rustlang")]).unwrap();
    let retagger = ContentEngine::new(
        repos,
        EngineOptions {
            tag_rules: rules,
            ..EngineOptions::default()
        },
    );

    let changed = retagger.store.retag_all(&ctx()).await.unwrap();
    assert_eq!(changed, 1);

    let stored = retagger.store.get(&ctx(), rusty.id).await.unwrap().unwrap();
    assert_eq!(stored.tags, vec!["rust", "rustlang"]);
    assert_eq!(stored.modified_at, rusty.modified_at);

    assert_eq!(retagger.store.retag_all(&ctx()).await.unwrap(), 0);
}

#[tokio::test]
async fn cancelled_requests_do_not_write() {
    let (repos, engine) = engine();
    let ctx = ctx();
    ctx.cancel();

    let err = engine
        .store
        .save(&ctx, SavePost::new("Never", "stored"))
        .await
        .unwrap_err();
    assert!(matches!(err, ContentError::Cancelled));
    assert_eq!(repos.post_count(), 0);
}

#[tokio::test]
async fn comments_validate_and_list_oldest_first() {
    let (_, engine) = engine();
    let post = publish(&engine, "Commented", "", NOW).await;
    let comments = &engine.comments;

    let no_post = comments
        .save(
            &ctx(),
            SaveComment {
                author_id: Some("ann".into()),
                ..SaveComment::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(no_post, ContentError::Validation(_)));

    let no_author = comments
        .save(
            &ctx(),
            SaveComment {
                post_id: Some(post.id.to_string()),
                ..SaveComment::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(no_author, ContentError::Validation(_)));

    let unknown_post = comments
        .save(
            &ctx(),
            SaveComment {
                post_id: Some("77".into()),
                author_id: Some("ann".into()),
                ..SaveComment::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(unknown_post, ContentError::Validation(_)));

    let second = comments
        .save(
            &RequestContext::at(NOW + Duration::minutes(5)),
            SaveComment {
                post_id: Some(post.id.to_string()),
                author_id: Some("bob".into()),
                content: "second".into(),
                ..SaveComment::default()
            },
        )
        .await
        .unwrap();
    let first = comments
        .save(
            &ctx(),
            SaveComment {
                post_id: Some(post.id.to_string()),
                author_id: Some("ann".into()),
                content: "first".into(),
                ..SaveComment::default()
            },
        )
        .await
        .unwrap();

    let listed = comments
        .list_for_post(&ctx(), post.id, PageRequest::comments())
        .await
        .unwrap();
    let listed: Vec<_> = listed.iter().map(|c| c.id).collect();
    assert_eq!(listed, vec![first.id, second.id]);
}
