use uuid::Uuid;

use super::schema::{now_millis, Database};
use super::types::{NewPost, Post, StoreError};

const POST_COLUMNS: &str =
    "p.id, p.created_at, p.updated_at, p.title, p.url, p.description, p.published_at, p.feed_id";

impl Database {
    // ========================================================================
    // Post Writes
    // ========================================================================

    /// Insert a post unless one with the same URL already exists.
    ///
    /// Returns `true` when a row was written. The URL constraint spans the
    /// whole table, so the first feed to publish a URL owns the post.
    pub(crate) async fn insert_post(&self, post: &NewPost) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO posts (id, created_at, updated_at, title, url, description, published_at, feed_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO NOTHING
        "#,
        )
        .bind(post.id)
        .bind(post.created_at)
        .bind(post.created_at)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(post.published_at)
        .bind(post.feed_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(e, &format!("post {}", post.url)))?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Post Queries
    // ========================================================================

    /// One page of posts from feeds the user follows, newest first by
    /// published time (creation time when the feed gave none).
    pub(crate) async fn select_posts_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Post>, StoreError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            INNER JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY COALESCE(p.published_at, p.created_at) DESC
            LIMIT ? OFFSET ?
        "#
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// Posts from followed feeds whose title or description matches a LIKE
    /// pattern. SQLite's LIKE is case-insensitive for ASCII.
    pub(crate) async fn select_matching_posts(
        &self,
        user_id: Uuid,
        pattern: &str,
    ) -> Result<Vec<Post>, StoreError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            INNER JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?1
              AND (p.title LIKE ?2 OR p.description LIKE ?2)
            ORDER BY COALESCE(p.published_at, p.created_at) DESC
        "#
        ))
        .bind(user_id)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    // ========================================================================
    // Bookmarks
    // ========================================================================

    pub(crate) async fn insert_bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO bookmarks (user_id, post_id, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(post_id)
            .bind(now_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_write(e, &format!("bookmark of post {post_id}")))?;
        Ok(())
    }

    /// Bookmarked posts, most recently bookmarked first
    pub async fn bookmarks_for_user(&self, user_id: Uuid) -> Result<Vec<Post>, StoreError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            INNER JOIN bookmarks b ON b.post_id = p.id
            WHERE b.user_id = ?
            ORDER BY b.created_at DESC
        "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }
}
