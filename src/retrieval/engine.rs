use std::sync::Arc;
use uuid::Uuid;

use super::request::{RetrievalError, RetrievalRequest, SortField, SortOrder};
use crate::storage::{Post, Store};

/// Read side: paged browsing and search over the posts a user follows.
#[derive(Clone)]
pub struct RetrievalEngine {
    store: Arc<dyn Store>,
}

impl RetrievalEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Search when the request carries a query, browse otherwise.
    pub async fn run(&self, request: &RetrievalRequest) -> Result<Vec<Post>, RetrievalError> {
        match &request.search_query {
            Some(query) => self.search(request.user_id, query).await,
            None => self.browse(request).await,
        }
    }

    /// One page of the user's posts, filtered and re-sorted.
    ///
    /// The page is cut by the store (newest first) before the feed filter and
    /// the requested sort apply, so both only ever see `limit` posts.
    ///
    /// # Errors
    ///
    /// Store failures surface as [`RetrievalError::Store`]; nothing partial
    /// is returned.
    pub async fn browse(&self, request: &RetrievalRequest) -> Result<Vec<Post>, RetrievalError> {
        let page = self
            .store
            .posts_for_user(request.user_id, request.limit, request.offset)
            .await?;

        tracing::debug!(
            user = %request.user_id,
            fetched = page.len(),
            sort = %request.sort,
            order = %request.order,
            "Browse page"
        );
        Ok(arrange(
            page,
            request.feed_filter.as_deref(),
            request.sort,
            request.order,
        ))
    }

    /// Posts whose title or description contains `query`, newest first.
    ///
    /// # Errors
    ///
    /// [`RetrievalError::InvalidArgument`] for a blank query.
    pub async fn search(&self, user_id: Uuid, query: &str) -> Result<Vec<Post>, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::InvalidArgument(
                "search query must not be empty".to_string(),
            ));
        }

        let posts = self
            .store
            .search_posts(user_id, &format!("%{query}%"))
            .await?;
        tracing::debug!(user = %user_id, query = %query, found = posts.len(), "Search");
        Ok(posts)
    }
}

/// Apply the feed filter, then a stable ascending sort, then reverse the whole
/// sequence for descending order.
pub fn arrange(
    mut posts: Vec<Post>,
    feed_filter: Option<&str>,
    sort: SortField,
    order: SortOrder,
) -> Vec<Post> {
    if let Some(feed) = feed_filter {
        posts.retain(|p| p.feed_id.hyphenated().to_string() == feed);
    }

    match sort {
        SortField::Title => posts.sort_by_cached_key(|p| p.title.to_lowercase()),
        SortField::Published => posts.sort_by_key(Post::published_or_created),
    }

    if order == SortOrder::Desc {
        posts.reverse();
    }
    posts
}
