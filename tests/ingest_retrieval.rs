//! Integration tests for the read path: fetch a feed over HTTP, ingest it,
//! then browse and search it as a user.
//!
//! Each test creates its own in-memory SQLite database and mock server.

use std::sync::Arc;
use std::time::Duration;

use gator::feed::{ingest, FeedSource, HttpFeedSource};
use gator::retrieval::{RetrievalEngine, RetrievalRequest, SortField, SortOrder};
use gator::storage::{Database, Feed, Store, StoreError, User};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BLOG_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
  <title>Boot.dev Blog</title>
  <link>https://blog.boot.dev/</link>
  <description>Recent content</description>
  <item>
    <title>Learn Rust the hard way</title>
    <link>https://blog.boot.dev/rust/</link>
    <pubDate>Mon, 02 Jan 2006 15:04:05 +0000</pubDate>
    <description>Borrowing &amp;amp; lifetimes</description>
  </item>
  <item>
    <title>Why Go?</title>
    <link>https://blog.boot.dev/go/</link>
    <pubDate>Tue, 03 Jan 2006 15:04:05 +0000</pubDate>
    <description>Goroutines everywhere</description>
  </item>
  <item>
    <title>SQL basics</title>
    <link>https://blog.boot.dev/sql/</link>
    <pubDate>Wed, 04 Jan 2006 15:04:05 +0000</pubDate>
    <description>SELECT all the things</description>
  </item>
</channel>
</rss>"#;

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

async fn serve_blog() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BLOG_RSS))
        .mount(&server)
        .await;
    server
}

/// Register `alice`, add the mock feed, and ingest it once.
async fn ingested(db: &Database, server: &MockServer) -> (User, Feed) {
    let alice = db.create_user("alice").await.unwrap();
    let feed = db
        .create_feed(&alice, "Boot.dev", &format!("{}/index.xml", server.uri()))
        .await
        .unwrap();

    let source = HttpFeedSource::new("gator-test").unwrap();
    let document = source.fetch(&feed.url, Duration::from_secs(5)).await.unwrap();
    assert_eq!(document.title, "Boot.dev Blog");

    let stats = ingest(db, &feed, &document).await;
    assert_eq!(stats.inserted, 3);
    (alice, feed)
}

// ============================================================================
// Ingestion
// ============================================================================

#[tokio::test]
async fn test_reingesting_same_document_adds_nothing() {
    let db = test_db().await;
    let server = serve_blog().await;
    let (alice, feed) = ingested(&db, &server).await;

    let source = HttpFeedSource::new("gator-test").unwrap();
    let document = source.fetch(&feed.url, Duration::from_secs(5)).await.unwrap();
    let stats = ingest(&db, &feed, &document).await;
    assert_eq!(stats.inserted, 0);
    assert_eq!(stats.skipped, 3);

    let mut request = RetrievalRequest::browse(alice.id);
    request.limit = 100;
    let engine = RetrievalEngine::new(Arc::new(db.clone()));
    assert_eq!(engine.browse(&request).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_double_encoded_description_is_decoded_once_stored() {
    let db = test_db().await;
    let server = serve_blog().await;
    let (alice, _) = ingested(&db, &server).await;

    let engine = RetrievalEngine::new(Arc::new(db.clone()));
    let posts = engine.search(alice.id, "lifetimes").await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].description.as_deref(), Some("Borrowing & lifetimes"));
}

// ============================================================================
// Browse
// ============================================================================

#[tokio::test]
async fn test_browse_defaults_to_two_newest() {
    let db = test_db().await;
    let server = serve_blog().await;
    let (alice, _) = ingested(&db, &server).await;

    let engine = RetrievalEngine::new(Arc::new(db.clone()));
    let posts = engine.browse(&RetrievalRequest::browse(alice.id)).await.unwrap();

    let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["SQL basics", "Why Go?"]);
}

#[tokio::test]
async fn test_browse_sort_by_title_ascending_with_offset() {
    let db = test_db().await;
    let server = serve_blog().await;
    let (alice, _) = ingested(&db, &server).await;

    let engine = RetrievalEngine::new(Arc::new(db.clone()));
    let request = RetrievalRequest {
        limit: 2,
        offset: 1,
        sort: SortField::Title,
        order: SortOrder::Asc,
        ..RetrievalRequest::browse(alice.id)
    };
    let posts = engine.browse(&request).await.unwrap();

    // Page is the 2nd and 3rd newest, then sorted by title
    let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["Learn Rust the hard way", "Why Go?"]);
}

#[tokio::test]
async fn test_browse_feed_filter() {
    let db = test_db().await;
    let server = serve_blog().await;
    let (alice, feed) = ingested(&db, &server).await;
    let engine = RetrievalEngine::new(Arc::new(db.clone()));

    let mut request = RetrievalRequest::browse(alice.id);
    request.limit = 10;
    request.feed_filter = Some(feed.id.to_string());
    assert_eq!(engine.browse(&request).await.unwrap().len(), 3);

    request.feed_filter = Some(uuid::Uuid::new_v4().to_string());
    assert!(engine.browse(&request).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_posts_visible_only_to_followers() {
    let db = test_db().await;
    let server = serve_blog().await;
    let (_, feed) = ingested(&db, &server).await;
    let bob = db.create_user("bob").await.unwrap();
    let engine = RetrievalEngine::new(Arc::new(db.clone()));

    let mut request = RetrievalRequest::browse(bob.id);
    request.limit = 10;
    assert!(engine.browse(&request).await.unwrap().is_empty());
    assert!(engine.search(bob.id, "Go").await.unwrap().is_empty());

    db.create_feed_follow(&bob, &feed).await.unwrap();
    assert_eq!(engine.browse(&request).await.unwrap().len(), 3);

    db.delete_feed_follow(bob.id, feed.id).await.unwrap();
    assert!(engine.browse(&request).await.unwrap().is_empty());
}

// ============================================================================
// Search and bookmarks
// ============================================================================

#[tokio::test]
async fn test_search_is_case_insensitive_and_newest_first() {
    let db = test_db().await;
    let server = serve_blog().await;
    let (alice, _) = ingested(&db, &server).await;
    let engine = RetrievalEngine::new(Arc::new(db.clone()));

    // "the" appears in two titles/descriptions, in different case
    let posts = engine.run(&RetrievalRequest::search(alice.id, "THE")).await.unwrap();
    let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["SQL basics", "Learn Rust the hard way"]);
}

#[tokio::test]
async fn test_bookmark_once() {
    let db = test_db().await;
    let server = serve_blog().await;
    let (alice, _) = ingested(&db, &server).await;
    let engine = RetrievalEngine::new(Arc::new(db.clone()));

    let post = engine.search(alice.id, "Rust").await.unwrap().remove(0);
    db.bookmark(alice.id, post.id).await.unwrap();

    let err = db.bookmark(alice.id, post.id).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let bookmarks = db.bookmarks_for_user(alice.id).await.unwrap();
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0].url, "https://blog.boot.dev/rust/");
}
