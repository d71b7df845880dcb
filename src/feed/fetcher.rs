use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use super::parser::{parse_feed, DecodeError, FeedDocument};

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while retrieving a feed.
///
/// Everything but [`FetchError::Decode`] is a network-class failure.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request plus body transfer ran past the deadline
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body was not a readable RSS document
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl FetchError {
    pub fn is_network(&self) -> bool {
        !matches!(self, FetchError::Decode(_))
    }
}

/// Where the scheduler gets feed documents from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Retrieve and decode the feed at `url`, giving up after `deadline`.
    async fn fetch(&self, url: &str, deadline: Duration) -> Result<FeedDocument, FetchError>;
}

/// [`FeedSource`] that issues a single HTTP GET per fetch. No retries.
#[derive(Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
}

impl HttpFeedSource {
    /// Build a source whose requests carry `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] if the TLS backend fails to initialize.
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await.map_err(classify)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, MAX_FEED_SIZE).await
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str, deadline: Duration) -> Result<FeedDocument, FetchError> {
        let bytes = tokio::time::timeout(deadline, self.download(url))
            .await
            .map_err(|_| FetchError::Timeout)??;

        let document = parse_feed(&bytes)?;
        tracing::debug!(
            feed = %url,
            bytes = bytes.len(),
            items = document.items.len(),
            "Fetched feed"
        );
        Ok(document)
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err)
    }
}

/// Read a response body, failing once it grows past `limit` bytes.
async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(classify)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
