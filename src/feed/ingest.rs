use uuid::Uuid;

use super::dates::parse_published;
use super::parser::{FeedDocument, FeedItem};
use crate::storage::{Feed, NewPost, Store};

/// Per-feed outcome of one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// New posts written
    pub inserted: usize,
    /// Items already stored under the same URL, or with no URL at all
    pub skipped: usize,
    /// Items the store refused
    pub failed: usize,
}

/// Store every item of `document` as a post of `feed`.
///
/// Insertion is idempotent on the post URL, so feeding the same document
/// twice only adds to `skipped`. A store failure on one item is logged and
/// the remaining items are still attempted.
pub async fn ingest(store: &dyn Store, feed: &Feed, document: &FeedDocument) -> IngestStats {
    let mut stats = IngestStats::default();

    for item in &document.items {
        let Some(post) = to_post(feed, item) else {
            tracing::warn!(feed = %feed.url, title = %item.title.trim(), "Skipping item without link");
            stats.skipped += 1;
            continue;
        };

        match store.insert_post_if_absent(&post).await {
            Ok(true) => stats.inserted += 1,
            Ok(false) => stats.skipped += 1,
            Err(e) => {
                tracing::warn!(feed = %feed.url, post = %post.url, error = %e, "Failed to store post");
                stats.failed += 1;
            }
        }
    }

    tracing::info!(
        feed = %feed.url,
        inserted = stats.inserted,
        skipped = stats.skipped,
        failed = stats.failed,
        "Ingested feed"
    );
    stats
}

/// Build the post record for one item, or `None` when it has no link.
fn to_post(feed: &Feed, item: &FeedItem) -> Option<NewPost> {
    let url = item.link.trim();
    if url.is_empty() {
        return None;
    }

    let description = item.description.trim();
    let published_at = parse_published(&item.pub_date).map(|dt| dt.timestamp_millis());
    if published_at.is_none() && !item.pub_date.trim().is_empty() {
        tracing::debug!(post = %url, pub_date = %item.pub_date, "Unrecognized publish date");
    }

    Some(NewPost {
        id: Uuid::new_v4(),
        feed_id: feed.id,
        title: item.title.trim().to_string(),
        url: url.to_string(),
        description: (!description.is_empty()).then(|| description.to_string()),
        published_at,
        created_at: chrono::Utc::now().timestamp_millis(),
    })
}
