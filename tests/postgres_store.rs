use std::collections::HashSet;
use std::sync::Arc;

use plume::application::comments::SaveComment;
use plume::application::context::RequestContext;
use plume::application::engine::{ContentEngine, EngineOptions};
use plume::application::pagination::PageRequest;
use plume::application::repos::{PostsRepo, SimilarTitles};
use plume::domain::entities::{PostId, PostRecord};
use plume::domain::posts::SavePost;
use plume::infra::db::PostgresRepositories;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime, macros::datetime};

const NOW: OffsetDateTime = datetime!(2024-06-15 12:00 UTC);

fn engine(pool: PgPool) -> ContentEngine {
    ContentEngine::new(
        Arc::new(PostgresRepositories::new(pool)),
        EngineOptions::default(),
    )
}

async fn publish(engine: &ContentEngine, title: &str, content: &str, at: OffsetDateTime) -> PostRecord {
    engine
        .store
        .save(
            &RequestContext::at(NOW),
            SavePost::new(title, content)
                .with_datetime(at)
                .with_draft(false),
        )
        .await
        .expect("save post")
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn post_indexes_exist(pool: PgPool) {
    let rows: Vec<String> = sqlx::query_scalar(
        "SELECT indexname FROM pg_indexes WHERE schemaname = 'public' AND tablename = 'posts'",
    )
    .fetch_all(&pool)
    .await
    .expect("fetch post indexes");

    let indexes: HashSet<String> = rows.into_iter().collect();

    for name in ["posts_timeline_idx", "posts_tags_idx", "posts_title_trgm_idx"] {
        assert!(indexes.contains(name), "missing {name}");
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn saves_assign_ids_and_keep_created_at(pool: PgPool) {
    let engine = engine(pool);
    let a = publish(&engine, "A", "notes #rust", NOW).await;
    let b = publish(&engine, "B", "", NOW).await;
    assert_eq!(b.id.get(), a.id.get() + 1);
    assert_eq!(a.tags, vec!["rust"]);

    let later = RequestContext::at(NOW + Duration::days(1));
    let updated = engine
        .store
        .save(&later, SavePost::new("A2", "").with_id(a.id).with_draft(false))
        .await
        .expect("update post");
    assert_eq!(updated.created_at, NOW);
    assert_eq!(updated.modified_at, NOW + Duration::days(1));
    assert!(updated.tags.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn explicit_ids_advance_the_sequence(pool: PgPool) {
    let engine = engine(pool);
    engine
        .store
        .save(&RequestContext::at(NOW), SavePost::new("Imported", "").with_id(PostId::new(40)))
        .await
        .expect("save imported post");

    let next = publish(&engine, "Fresh", "", NOW).await;
    assert_eq!(next.id, PostId::new(41));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn windows_navigation_and_tags(pool: PgPool) {
    let engine = engine(pool);
    let ctx = RequestContext::at(NOW);
    let day1 = publish(&engine, "Day one", "x #rust", NOW - Duration::days(2)).await;
    let day2 = publish(&engine, "Day two", "x #rust #go", NOW - Duration::days(1)).await;
    let future = publish(&engine, "Tomorrow", "x #go", NOW + Duration::days(1)).await;

    let published = engine
        .store
        .list_published(&ctx, PageRequest::listing())
        .await
        .expect("list published");
    assert_eq!(
        published.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![day2.id, day1.id]
    );

    let upcoming = engine
        .store
        .list_future(&ctx, PageRequest::listing())
        .await
        .expect("list future");
    assert_eq!(upcoming.iter().map(|p| p.id).collect::<Vec<_>>(), vec![future.id]);

    let next = engine.navigator.next(&ctx, &day1).await.expect("next");
    assert_eq!(next.map(|p| p.id), Some(day2.id));
    let prev = engine.navigator.prev(&ctx, &day1).await.expect("prev");
    assert!(prev.is_none());

    let tagged = engine.store.list_by_tag(&ctx, "Rust").await.expect("by tag");
    assert_eq!(tagged.len(), 2);

    let tags = engine.store.all_tags(&ctx).await.expect("all tags");
    assert_eq!(tags, vec!["go", "rust"]);

    let unchanged = engine.store.retag_all(&ctx).await.expect("retag scan");
    assert_eq!(unchanged, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn search_and_related(pool: PgPool) {
    let engine = engine(pool);
    let ctx = RequestContext::at(NOW);
    let source = publish(&engine, "Rust async patterns", "tokio executors", NOW).await;
    let sibling = publish(&engine, "Rust async patterns part 2", "more executors", NOW).await;
    publish(&engine, "Gardening", "tomatoes", NOW).await;
    publish(&engine, "Sourdough", "starter", NOW).await;

    let hits = engine
        .search
        .search(&ctx, "executors", PageRequest::listing())
        .await
        .expect("search");
    let hit_ids: HashSet<PostId> = hits.iter().map(|p| p.id).collect();
    assert_eq!(hit_ids, HashSet::from([source.id, sibling.id]));

    let related = engine
        .related
        .find_related(&ctx, &source, PageRequest::related())
        .await
        .expect("related");
    assert_eq!(related.len(), 3);
    assert_eq!(related[0].id, sibling.id);
    let unique: HashSet<PostId> = related.iter().map(|p| p.id).collect();
    assert_eq!(unique.len(), 3);
    assert!(!unique.contains(&source.id));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn similar_titles_honour_threshold_per_call(pool: PgPool) {
    let repos = PostgresRepositories::new(pool.clone());
    let engine = engine(pool.clone());
    let source = publish(&engine, "Rust async patterns", "", NOW).await;
    let sibling = publish(&engine, "Rust async patterns part 2", "", NOW).await;
    publish(&engine, "Gardening", "", NOW).await;

    let lookup = |threshold| SimilarTitles {
        title: &source.title,
        exclude: source.id,
        threshold,
        page: PageRequest::related(),
    };

    let loose = repos.similar_titles(lookup(0.6)).await.expect("loose lookup");
    assert_eq!(loose.iter().map(|s| s.post.id).collect::<Vec<_>>(), vec![sibling.id]);
    assert!(loose[0].score >= 0.6);

    let strict = repos.similar_titles(lookup(0.9)).await.expect("strict lookup");
    assert!(strict.is_empty());

    let setting: Option<String> =
        sqlx::query_scalar("SELECT current_setting('pg_trgm.similarity_threshold', true)")
            .fetch_one(&pool)
            .await
            .expect("read threshold setting");
    assert_ne!(setting.as_deref(), Some("0.9"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn comments_round_trip(pool: PgPool) {
    let engine = engine(pool);
    let post = publish(&engine, "Commented", "", NOW).await;

    let saved = engine
        .comments
        .save(
            &RequestContext::at(NOW),
            SaveComment {
                post_id: Some(post.id.to_string()),
                author_id: Some("ann".to_string()),
                content: "hello".to_string(),
                ..SaveComment::default()
            },
        )
        .await
        .expect("save comment");

    let listed = engine
        .comments
        .list_for_post(&RequestContext::at(NOW), post.id, PageRequest::comments())
        .await
        .expect("list comments");
    assert_eq!(listed, vec![saved]);
}
