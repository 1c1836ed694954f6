use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};
use once_cell::sync::Lazy;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::pagination::PageRequest;
use crate::application::repos::{
    PostsRepo, RepoError, ScoredPost, SimilarTitles, TagCount,
};
use crate::domain::entities::{PostId, PostRecord};
use crate::domain::posts::{Direction, PostWindow};

use super::types::{PostRow, ScoredPostRow, TagCountRow};
use super::{POST_COLUMNS, SEARCH_DOCUMENT};
use crate::infra::db::{PostgresRepositories, map_sqlx_error};

/// Full-table scan for bulk passes; the stream borrows the statement text.
static SCAN_ALL: Lazy<String> =
    Lazy::new(|| format!("SELECT {POST_COLUMNS} FROM posts ORDER BY id"));

impl PostgresRepositories {
    fn select_posts<'q>() -> QueryBuilder<'q, Postgres> {
        QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE 1=1 "))
    }

    fn apply_window<'q>(
        qb: &mut QueryBuilder<'q, Postgres>,
        window: PostWindow,
        as_of: OffsetDateTime,
    ) {
        match window {
            PostWindow::Published => {
                qb.push(" AND draft = FALSE AND datetime <= ");
                qb.push_bind(as_of);
            }
            PostWindow::Future => {
                qb.push(" AND draft = FALSE AND datetime > ");
                qb.push_bind(as_of);
            }
            PostWindow::Drafts => {
                qb.push(" AND draft = TRUE ");
            }
        }
    }

    fn push_page<'q>(qb: &mut QueryBuilder<'q, Postgres>, page: PageRequest) {
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(page.limit()));
        qb.push(" OFFSET ");
        qb.push_bind(i64::from(page.offset()));
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn find_by_id(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn list_window(
        &self,
        window: PostWindow,
        as_of: OffsetDateTime,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = Self::select_posts();
        Self::apply_window(&mut qb, window, as_of);
        qb.push(" ORDER BY datetime DESC, id DESC");
        Self::push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn list_by_tag(
        &self,
        tag: &str,
        as_of: OffsetDateTime,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = Self::select_posts();
        Self::apply_window(&mut qb, PostWindow::Published, as_of);
        qb.push(" AND ");
        qb.push_bind(tag);
        qb.push(" = ANY(tags) ORDER BY datetime DESC, id DESC");

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepoError> {
        let rows = sqlx::query_as::<_, TagCountRow>(
            r#"
            SELECT tag, COUNT(*) AS count
            FROM posts, UNNEST(tags) AS tag
            GROUP BY tag
            ORDER BY count DESC, tag ASC
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(TagCount {
                    tag: row.tag,
                    count: Self::convert_count(row.count)?,
                })
            })
            .collect()
    }

    async fn search(
        &self,
        query: &str,
        as_of: OffsetDateTime,
        page: PageRequest,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {POST_COLUMNS} FROM posts, plainto_tsquery('english', "
        ));
        qb.push_bind(query);
        qb.push(") AS query WHERE ");
        qb.push(SEARCH_DOCUMENT);
        qb.push(" @@ query ");
        Self::apply_window(&mut qb, PostWindow::Published, as_of);
        qb.push(" ORDER BY ts_rank_cd(");
        qb.push(SEARCH_DOCUMENT);
        qb.push(", query) DESC, datetime DESC, id DESC");
        Self::push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn similar_titles(
        &self,
        query: SimilarTitles<'_>,
    ) -> Result<Vec<ScoredPost>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        // `%` reads its floor from this setting; `true` scopes it to the transaction.
        sqlx::query("SELECT set_config('pg_trgm.similarity_threshold', $1, true)")
            .bind(query.threshold.to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {POST_COLUMNS}, similarity(title, "
        ));
        qb.push_bind(query.title);
        qb.push(")::float8 AS score FROM posts WHERE draft = FALSE AND id <> ");
        qb.push_bind(query.exclude);
        qb.push(" AND title % ");
        qb.push_bind(query.title);
        qb.push(" ORDER BY score DESC, datetime DESC, id DESC");
        Self::push_page(&mut qb, query.page);

        let rows = qb
            .build_query_as::<ScoredPostRow>()
            .fetch_all(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ScoredPost::from).collect())
    }

    async fn random_posts(
        &self,
        limit: u32,
        exclude: &[PostId],
    ) -> Result<Vec<PostRecord>, RepoError> {
        let exclude: Vec<i64> = exclude.iter().map(|id| id.get()).collect();
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE draft = FALSE AND NOT (id = ANY($1)) \
             ORDER BY random() LIMIT $2"
        ))
        .bind(&exclude)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn adjacent(
        &self,
        datetime: OffsetDateTime,
        direction: Direction,
    ) -> Result<Option<PostRecord>, RepoError> {
        let (comparison, order) = match direction {
            Direction::Next => (">", "ASC"),
            Direction::Prev => ("<", "DESC"),
        };
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE draft = FALSE AND datetime {comparison} $1 \
             ORDER BY datetime {order}, id {order} LIMIT 1"
        ))
        .bind(datetime)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    fn stream_all(&self) -> BoxStream<'_, Result<PostRecord, RepoError>> {
        let stream = sqlx::query_as::<_, PostRow>(SCAN_ALL.as_str())
            .fetch(self.pool())
            .map(|row| match row {
                Ok(record) => Ok(PostRecord::from(record)),
                Err(err) => Err(map_sqlx_error(err)),
            });

        Box::pin(stream)
    }
}
