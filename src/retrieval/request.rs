use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Sort name other than `title` or `published`
    #[error("unsupported sort column: {0}")]
    UnsupportedSortField(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Title,
    /// Publish time, falling back to ingestion time
    #[default]
    Published,
}

impl FromStr for SortField {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(SortField::Title),
            "published" | "published_at" => Ok(SortField::Published),
            _ => Err(RetrievalError::UnsupportedSortField(s.to_string())),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortField::Title => write!(f, "title"),
            SortField::Published => write!(f, "published"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(RetrievalError::InvalidArgument(format!(
                "order must be asc or desc, got {s:?}"
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

pub const DEFAULT_LIMIT: u32 = 2;

/// What a user asked to see.
///
/// With `search_query` set the request is a search and only `user_id` is
/// consulted besides the query; otherwise it is a paged browse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    pub user_id: Uuid,
    pub limit: u32,
    pub offset: u32,
    pub sort: SortField,
    pub order: SortOrder,
    /// Keep only posts whose feed id, in hyphenated form, equals this
    pub feed_filter: Option<String>,
    pub search_query: Option<String>,
}

impl RetrievalRequest {
    /// Browse request with the default page: two newest posts.
    pub fn browse(user_id: Uuid) -> Self {
        Self {
            user_id,
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort: SortField::default(),
            order: SortOrder::default(),
            feed_filter: None,
            search_query: None,
        }
    }

    pub fn search(user_id: Uuid, query: impl Into<String>) -> Self {
        Self {
            search_query: Some(query.into()),
            ..Self::browse(user_id)
        }
    }
}
