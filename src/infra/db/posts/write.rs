use async_trait::async_trait;

use crate::application::repos::{PostsWriteRepo, RepoError};
use crate::domain::entities::{PostId, PostRecord};

use super::POST_COLUMNS;
use super::types::PostRow;
use crate::infra::db::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn next_post_id(&self) -> Result<PostId, RepoError> {
        let id: i64 = sqlx::query_scalar("SELECT nextval('posts_id_seq')")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(PostId::new(id))
    }

    async fn upsert_post(&self, post: &PostRecord) -> Result<PostRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            INSERT INTO posts (id, title, content, datetime, draft, tags, created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                content = EXCLUDED.content,
                datetime = EXCLUDED.datetime,
                draft = EXCLUDED.draft,
                tags = EXCLUDED.tags,
                modified_at = EXCLUDED.modified_at
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.datetime)
        .bind(post.draft)
        .bind(&post.tags)
        .bind(post.created_at)
        .bind(post.modified_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        // Explicit ids above the sequence must not be handed out again.
        sqlx::query(
            r#"
            SELECT setval('posts_id_seq', $1)
            FROM posts_id_seq
            WHERE $1 > CASE WHEN is_called THEN last_value ELSE last_value - 1 END
            "#,
        )
        .bind(post.id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(PostRecord::from(row))
    }

    async fn replace_tags(&self, id: PostId, tags: &[String]) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE posts SET tags = $2 WHERE id = $1")
            .bind(id)
            .bind(tags)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
