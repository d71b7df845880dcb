//! Getting posts out of RSS feeds.
//!
//! - [`dates`] normalizes the free-form `<pubDate>` text feeds publish
//! - [`parser`] decodes an RSS body into a [`FeedDocument`]
//! - [`fetcher`] retrieves a document over HTTP behind the [`FeedSource`] trait
//! - [`ingest`] turns a document's items into stored posts
//!
//! ```ignore
//! use gator::feed::{ingest, FeedSource, HttpFeedSource};
//!
//! let source = HttpFeedSource::new("gator")?;
//! let document = source.fetch(&feed.url, Duration::from_secs(30)).await?;
//! let stats = ingest(&db, &feed, &document).await;
//! ```

pub mod dates;
mod fetcher;
mod ingest;
mod parser;

pub use dates::parse_published;
pub use fetcher::{FeedSource, FetchError, HttpFeedSource};
pub use ingest::{ingest, IngestStats};
pub use parser::{parse_feed, DecodeError, FeedDocument, FeedItem};
