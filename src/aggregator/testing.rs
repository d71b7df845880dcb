//! In-memory doubles for driving the scheduler under paused tokio time and
//! for injecting store failures into ingestion.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::feed::{FeedDocument, FeedItem, FeedSource, FetchError};
use crate::storage::{Feed, NewPost, Post, Store, StoreError};

/// Store keeping feeds in memory and stamping fetches with a logical clock.
#[derive(Default)]
pub struct MemoryStore {
    feeds: Mutex<Vec<Feed>>,
    posts: Mutex<HashMap<String, NewPost>>,
    clock: AtomicUsize,
    /// Post URLs whose insert fails as if the pool were exhausted
    failing: Vec<String>,
}

impl MemoryStore {
    pub fn with_feeds(urls: &[&str]) -> Self {
        let feeds = urls
            .iter()
            .enumerate()
            .map(|(i, url)| Feed {
                id: Uuid::new_v4(),
                created_at: i as i64,
                updated_at: i as i64,
                name: url.to_string(),
                url: url.to_string(),
                user_id: Uuid::nil(),
                last_fetched_at: None,
            })
            .collect();
        Self {
            feeds: Mutex::new(feeds),
            ..Default::default()
        }
    }

    pub fn failing_on(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());
        self
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub fn stored_urls(&self) -> Vec<String> {
        let mut urls: Vec<_> = self.posts.lock().unwrap().keys().cloned().collect();
        urls.sort();
        urls
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn next_feed_to_fetch(&self) -> Result<Feed, StoreError> {
        let feeds = self.feeds.lock().unwrap();
        feeds
            .iter()
            .min_by_key(|f| (f.last_fetched_at.is_some(), f.last_fetched_at, f.created_at))
            .cloned()
            .ok_or(StoreError::NoFeeds)
    }

    async fn mark_fetched(&self, feed_id: Uuid) -> Result<(), StoreError> {
        let stamp = self.clock.fetch_add(1, Ordering::SeqCst) as i64;
        let mut feeds = self.feeds.lock().unwrap();
        let feed = feeds
            .iter_mut()
            .find(|f| f.id == feed_id)
            .ok_or_else(|| StoreError::NotFound(feed_id.to_string()))?;
        feed.last_fetched_at = Some(stamp);
        Ok(())
    }

    async fn insert_post_if_absent(&self, post: &NewPost) -> Result<bool, StoreError> {
        if self.failing.contains(&post.url) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut posts = self.posts.lock().unwrap();
        if posts.contains_key(&post.url) {
            return Ok(false);
        }
        posts.insert(post.url.clone(), post.clone());
        Ok(true)
    }

    async fn posts_for_user(&self, _: Uuid, _: u32, _: u32) -> Result<Vec<Post>, StoreError> {
        Ok(Vec::new())
    }

    async fn search_posts(&self, _: Uuid, _: &str) -> Result<Vec<Post>, StoreError> {
        Ok(Vec::new())
    }

    async fn bookmark(&self, _: Uuid, _: Uuid) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Source that takes `latency` per fetch and records what it was asked for.
pub struct SlowSource {
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetched: Mutex<Vec<String>>,
}

impl SlowSource {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for SlowSource {
    async fn fetch(&self, url: &str, deadline: Duration) -> Result<FeedDocument, FetchError> {
        self.fetched.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let outcome = tokio::time::timeout(deadline, tokio::time::sleep(self.latency)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome.map_err(|_| FetchError::Timeout)?;

        let n = self.fetched.lock().unwrap().len();
        Ok(FeedDocument {
            title: url.to_string(),
            items: vec![FeedItem {
                title: format!("post {n}"),
                link: format!("{url}/{n}"),
                ..Default::default()
            }],
            ..Default::default()
        })
    }
}
