use uuid::Uuid;

use super::schema::{now_millis, Database};
use super::types::{Feed, FeedFollowRecord, FeedListing, StoreError, User};

const FEED_COLUMNS: &str = "id, created_at, updated_at, name, url, user_id, last_fetched_at";

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Register a feed owned by `owner` and make the owner follow it.
    ///
    /// Both rows are written in one transaction so a feed never exists
    /// without its creator's follow.
    pub async fn create_feed(&self, owner: &User, name: &str, url: &str) -> Result<Feed, StoreError> {
        let now = now_millis();
        let mut tx = self.pool.begin().await?;

        let feed = sqlx::query_as::<_, Feed>(&format!(
            r#"
            INSERT INTO feeds (id, created_at, updated_at, name, url, user_id)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING {FEED_COLUMNS}
        "#
        ))
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(now)
        .bind(name)
        .bind(url)
        .bind(owner.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::from_write(e, &format!("feed {url}")))?;

        sqlx::query(
            r#"
            INSERT INTO feed_follows (id, created_at, updated_at, user_id, feed_id)
            VALUES (?, ?, ?, ?, ?)
        "#,
        )
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(now)
        .bind(owner.id)
        .bind(feed.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::from_write(e, "feed follow"))?;

        tx.commit().await?;
        Ok(feed)
    }

    /// All feeds with the name of the user who registered each
    pub async fn list_feeds(&self) -> Result<Vec<FeedListing>, StoreError> {
        let feeds = sqlx::query_as::<_, FeedListing>(
            r#"
            SELECT f.name AS feed_name, f.url AS feed_url, u.name AS user_name
            FROM feeds f
            INNER JOIN users u ON u.id = f.user_id
            ORDER BY f.created_at
        "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(feeds)
    }

    pub async fn get_feed_by_url(&self, url: &str) -> Result<Feed, StoreError> {
        sqlx::query_as::<_, Feed>(&format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?"))
            .bind(url)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("feed {url}")))
    }

    /// Feed least recently fetched; feeds never fetched come first, ties go to
    /// the oldest registration.
    pub(crate) async fn select_next_feed(&self) -> Result<Feed, StoreError> {
        sqlx::query_as::<_, Feed>(&format!(
            r#"
            SELECT {FEED_COLUMNS}
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, created_at ASC
            LIMIT 1
        "#
        ))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NoFeeds)
    }

    /// Stamp a feed as fetched now. Repeating the call only moves the stamp.
    pub(crate) async fn update_feed_fetched(&self, feed_id: Uuid) -> Result<(), StoreError> {
        let now = now_millis();
        let result =
            sqlx::query("UPDATE feeds SET last_fetched_at = ?, updated_at = ? WHERE id = ?")
                .bind(now)
                .bind(now)
                .bind(feed_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("feed {feed_id}")));
        }
        Ok(())
    }

    // ========================================================================
    // Follow Operations
    // ========================================================================

    pub async fn create_feed_follow(
        &self,
        user: &User,
        feed: &Feed,
    ) -> Result<FeedFollowRecord, StoreError> {
        let now = now_millis();
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO feed_follows (id, created_at, updated_at, user_id, feed_id)
            VALUES (?, ?, ?, ?, ?)
        "#,
        )
        .bind(id)
        .bind(now)
        .bind(now)
        .bind(user.id)
        .bind(feed.id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_write(e, &format!("follow of {}", feed.url)))?;

        Ok(FeedFollowRecord {
            id,
            created_at: now,
            user_id: user.id,
            feed_id: feed.id,
            user_name: user.name.clone(),
            feed_name: feed.name.clone(),
        })
    }

    pub async fn feed_follows_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FeedFollowRecord>, StoreError> {
        let follows = sqlx::query_as::<_, FeedFollowRecord>(
            r#"
            SELECT ff.id, ff.created_at, ff.user_id, ff.feed_id,
                   u.name AS user_name, f.name AS feed_name
            FROM feed_follows ff
            INNER JOIN users u ON u.id = ff.user_id
            INNER JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.user_id = ?
            ORDER BY ff.created_at
        "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(follows)
    }

    /// Remove a follow, returning how many rows went away (0 or 1)
    pub async fn delete_feed_follow(&self, user_id: Uuid, feed_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = ? AND feed_id = ?")
            .bind(user_id)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
