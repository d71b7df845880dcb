//! The storage seam the aggregation and retrieval engines are written against.
//!
//! Both engines only ever need these six operations. Keeping them behind a
//! trait lets the scheduler tests drive the rotation with an in-memory double
//! while production uses [`Database`].

use async_trait::async_trait;
use uuid::Uuid;

use super::schema::Database;
use super::types::{Feed, NewPost, Post, StoreError};

#[async_trait]
pub trait Store: Send + Sync {
    /// Least recently fetched feed, never-fetched feeds first.
    ///
    /// Fails with [`StoreError::NoFeeds`] when nothing is registered.
    async fn next_feed_to_fetch(&self) -> Result<Feed, StoreError>;

    /// Stamp the feed's `last_fetched_at` with the current time.
    async fn mark_fetched(&self, feed_id: Uuid) -> Result<(), StoreError>;

    /// Idempotent insert keyed on the post URL. `Ok(false)` means the URL was
    /// already stored and nothing changed.
    async fn insert_post_if_absent(&self, post: &NewPost) -> Result<bool, StoreError>;

    /// A page of posts from feeds the user follows, ordered by published time
    /// (creation time when absent), newest first.
    async fn posts_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Post>, StoreError>;

    /// Posts from followed feeds whose title or description matches the LIKE
    /// `pattern`, case-insensitively, newest first. Not paginated.
    async fn search_posts(&self, user_id: Uuid, pattern: &str) -> Result<Vec<Post>, StoreError>;

    /// Record a bookmark. A repeated pair is [`StoreError::Conflict`].
    async fn bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
impl Store for Database {
    async fn next_feed_to_fetch(&self) -> Result<Feed, StoreError> {
        self.select_next_feed().await
    }

    async fn mark_fetched(&self, feed_id: Uuid) -> Result<(), StoreError> {
        self.update_feed_fetched(feed_id).await
    }

    async fn insert_post_if_absent(&self, post: &NewPost) -> Result<bool, StoreError> {
        self.insert_post(post).await
    }

    async fn posts_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Post>, StoreError> {
        self.select_posts_for_user(user_id, limit, offset).await
    }

    async fn search_posts(&self, user_id: Uuid, pattern: &str) -> Result<Vec<Post>, StoreError> {
        self.select_matching_posts(user_id, pattern).await
    }

    async fn bookmark(&self, user_id: Uuid, post_id: Uuid) -> Result<(), StoreError> {
        self.insert_bookmark(user_id, post_id).await
    }
}
